// SPDX-License-Identifier: Apache-2.0

//! One capture source (C3): a single helper process or remote stream's
//! lifecycle, channel state, and error/retry state machine (spec.md §4.3).

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Closed,
    Probing,
    Opening,
    Open,
    Hopping,
    Error,
    Paused,
}

const ERROR_WINDOW_SECS: u64 = 60;
const FATAL_ERROR_THRESHOLD: u32 = 3;
const MAX_BACKOFF_SECS: u64 = 30;
const INITIAL_BACKOFF_SECS: u64 = 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("cannot {action} while source is in state {state:?}")]
    InvalidTransition { action: &'static str, state: SourceState },
    #[error("source is error-fatal and will not auto-retry")]
    ErrorFatal,
}

/// One `(channel-token, dwell-ms)` entry of a hop schedule (spec.md §4.3:
/// "Hop mode is a list of tokens plus per-token dwell in milliseconds").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopEntry {
    pub token: String,
    pub dwell_ms: u64,
}

pub struct Source {
    pub uuid: Uuid,
    pub driver: String,
    pub definition: String,
    pub source_number: u64,
    pub remote: bool,
    state: SourceState,
    pub channel: Option<String>,
    pub hop_schedule: Vec<HopEntry>,
    pub dlt: Option<u32>,
    error_count: u32,
    error_window_start: Option<u64>,
    pub last_error: Option<String>,
    pub last_packet_time: Option<u64>,
    fatal: bool,
    backoff_secs: u64,
}

impl Source {
    pub fn new(uuid: Uuid, driver: &str, definition: &str, source_number: u64, remote: bool) -> Self {
        Source {
            uuid,
            driver: driver.to_string(),
            definition: definition.to_string(),
            source_number,
            remote,
            state: SourceState::Closed,
            channel: None,
            hop_schedule: Vec::new(),
            dlt: None,
            error_count: 0,
            error_window_start: None,
            last_error: None,
            last_packet_time: None,
            fatal: false,
            backoff_secs: INITIAL_BACKOFF_SECS,
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// `closed --open(def)--> opening` (spec.md §4.3 table).
    pub fn begin_open(&mut self) -> Result<(), SourceError> {
        if self.state != SourceState::Closed {
            return Err(SourceError::InvalidTransition { action: "open", state: self.state });
        }
        self.state = SourceState::Opening;
        Ok(())
    }

    /// `opening --OPENRESP ok--> open`.
    pub fn on_open_ack(&mut self, dlt: u32) -> Result<(), SourceError> {
        if self.state != SourceState::Opening {
            return Err(SourceError::InvalidTransition { action: "open_ack", state: self.state });
        }
        self.state = SourceState::Open;
        self.dlt = Some(dlt);
        self.error_count = 0;
        self.backoff_secs = INITIAL_BACKOFF_SECS;
        Ok(())
    }

    /// `opening --OPENRESP fail / timer--> error`, and the generic `open /
    /// hopping --ERROR--> error` / `any --fatal child exit--> error` paths.
    /// Three consecutive errors inside a 60-second window make the source
    /// error-fatal (spec.md §4.3, §8 boundary behavior).
    pub fn on_error(&mut self, now: u64, reason: impl Into<String>) {
        self.state = SourceState::Error;
        self.channel = None;
        self.last_error = Some(reason.into());

        match self.error_window_start {
            Some(start) if now.saturating_sub(start) <= ERROR_WINDOW_SECS => {
                self.error_count += 1;
            }
            _ => {
                self.error_window_start = Some(now);
                self.error_count = 1;
            }
        }

        if self.error_count >= FATAL_ERROR_THRESHOLD {
            self.fatal = true;
        }
    }

    /// `error --retry-timer--> opening`, backing off exponentially, capped.
    /// No-op (and refuses) once the source is error-fatal; a fatal source
    /// only leaves `error` via an explicit [`Source::reopen_after_fatal`].
    pub fn retry(&mut self) -> Result<(), SourceError> {
        if self.fatal {
            return Err(SourceError::ErrorFatal);
        }
        if self.state != SourceState::Error {
            return Err(SourceError::InvalidTransition { action: "retry", state: self.state });
        }
        self.state = SourceState::Opening;
        self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
        Ok(())
    }

    pub fn backoff_secs(&self) -> u64 {
        self.backoff_secs
    }

    /// A manual reopen clears the fatal flag (spec.md §8: "does not retry
    /// until manually reopened").
    pub fn reopen_after_fatal(&mut self) -> Result<(), SourceError> {
        if self.state != SourceState::Error {
            return Err(SourceError::InvalidTransition { action: "reopen", state: self.state });
        }
        self.fatal = false;
        self.error_count = 0;
        self.error_window_start = None;
        self.state = SourceState::Opening;
        Ok(())
    }

    /// Channel may only be set while open or hopping (spec.md §3).
    pub fn configure_channel(&mut self, token: impl Into<String>) -> Result<(), SourceError> {
        if !matches!(self.state, SourceState::Open | SourceState::Hopping) {
            return Err(SourceError::InvalidTransition { action: "configure_channel", state: self.state });
        }
        self.channel = Some(token.into());
        Ok(())
    }

    pub fn configure_hop(&mut self, schedule: Vec<HopEntry>) -> Result<(), SourceError> {
        if !matches!(self.state, SourceState::Open | SourceState::Hopping) {
            return Err(SourceError::InvalidTransition { action: "configure_hop", state: self.state });
        }
        self.state = if schedule.len() > 1 {
            SourceState::Hopping
        } else {
            SourceState::Open
        };
        self.hop_schedule = schedule;
        Ok(())
    }

    pub fn on_data(&mut self, now: u64) -> Result<(), SourceError> {
        if !matches!(self.state, SourceState::Open | SourceState::Hopping) {
            return Err(SourceError::InvalidTransition { action: "data", state: self.state });
        }
        self.last_packet_time = Some(now);
        Ok(())
    }

    /// `open/hopping/opening/error --close--> closed`. Resets channel and
    /// error bookkeeping; a closed source generates no packets (spec.md
    /// invariant 7).
    pub fn close(&mut self) {
        self.state = SourceState::Closed;
        self.channel = None;
        self.hop_schedule.clear();
        self.fatal = false;
        self.error_count = 0;
        self.error_window_start = None;
        self.backoff_secs = INITIAL_BACKOFF_SECS;
    }
}
