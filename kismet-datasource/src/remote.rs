// SPDX-License-Identifier: Apache-2.0

//! Remote capture listener (spec.md §4.1, §4.4): accepts TCP connections
//! from out-of-network capture helpers and binds them into the tracker as
//! ordinary (remote) sources once they hand over a `NEWSOURCE` frame.
//!
//! Confined to a narrow `tokio` runtime, matching the teacher's practice of
//! scoping async I/O to the one place it's actually needed rather than
//! spreading it across the whole crate.

use std::sync::Arc;

use kismet_frame::{Field, Frame, ParseOutcome, DEFAULT_MAX_FRAME};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::tracker::SourceTracker;

pub const DEFAULT_REMOTE_PORT: u16 = 3501;
const NEWSOURCE_COMMAND: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection sent {0} before NEWSOURCE")]
    NotNewsourceFirst(u32),
    #[error("NEWSOURCE frame missing required field {0:?}")]
    MissingField(&'static str),
}

/// Runs the accept loop until `listener` is dropped or the process is
/// asked to shut down; each connection is handled on its own task.
pub async fn serve(listener: TcpListener, tracker: Arc<SourceTracker>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "remote listener accept failed");
                continue;
            }
        };
        debug!(%peer, "remote capture connection accepted");
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &tracker).await {
                warn!(%peer, %err, "remote capture connection closed");
            }
        });
    }
}

/// Reads exactly one `NEWSOURCE` handshake frame and opens the source it
/// describes. Any other first frame closes the connection immediately
/// (spec.md §8 scenario 4).
async fn handle_connection(mut stream: TcpStream, tracker: &SourceTracker) -> Result<(), RemoteError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let frame = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(RemoteError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before a complete frame arrived",
            )));
        }
        buf.extend_from_slice(&chunk[..n]);

        match Frame::parse(&buf, DEFAULT_MAX_FRAME) {
            Ok(ParseOutcome::Complete { frame, .. }) => break frame,
            Ok(ParseOutcome::NeedMore(_)) => continue,
            Err(err) => return Err(RemoteError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))),
        }
    };

    if frame.command_id != NEWSOURCE_COMMAND {
        let _ = stream.shutdown().await;
        return Err(RemoteError::NotNewsourceFirst(frame.command_id));
    }

    let driver = frame
        .field("driver")
        .and_then(Field::as_str)
        .ok_or(RemoteError::MissingField("driver"))?;
    let definition = frame
        .field("definition")
        .and_then(Field::as_str)
        .ok_or(RemoteError::MissingField("definition"))?;

    let uuid = tracker
        .open(&format!("{driver}:{definition}"), true)
        .map_err(|err| RemoteError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())))?;

    info!(%uuid, driver, "remote source registered");
    Ok(())
}
