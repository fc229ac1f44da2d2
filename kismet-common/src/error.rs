// SPDX-License-Identifier: Apache-2.0

//! Error kinds the core distinguishes (spec.md §7). Each subsystem crate
//! defines its own narrow error enum; `KismetError` is the umbrella used at
//! the boundaries that must classify a failure for the propagation policy
//! in spec.md §7 ("errors local to one packet never escape the chain;
//! errors local to one source never escape that source; only the main
//! thread translates fatal errors to process exit").

#[derive(Debug, thiserror::Error)]
pub enum KismetError {
    /// Fatal at startup; surfaced to stderr and exits (spec.md §7).
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-fatal; recorded on the source, triggers retry.
    #[error("datasource error: {0}")]
    Driver(String),

    /// Bad IPC frame from a helper; closes that transport.
    #[error("frame error: {0}")]
    Frame(String),

    /// Malformed packet; recorded on the packet, chain continues.
    #[error("dissector error: {0}")]
    Dissector(String),

    /// Allocation failure in chainbuf or registry; drops the offending
    /// packet only.
    #[error("resource error: {0}")]
    Resource(String),

    /// Surfaced as HTTP 4xx/5xx by the external collaborator.
    #[error("api error: {0}")]
    Api(String),
}

impl KismetError {
    /// The process exit code a fatal instance of this error kind maps to,
    /// per spec.md §6 ("Exit code 0 on clean shutdown, 1 on fatal init
    /// error, 2 on unrecoverable runtime error"). Only `Config` is ever
    /// fatal at startup; everything else is handled in place and never
    /// reaches `main`'s exit-code translation except as a last resort.
    pub fn fatal_exit_code(&self) -> i32 {
        match self {
            KismetError::Config(_) => 1,
            _ => 2,
        }
    }
}
