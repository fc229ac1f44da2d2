// SPDX-License-Identifier: Apache-2.0

//! Wire framing between the core and each datasource helper process
//! (spec.md §4.1, C1).
//!
//! Header layout (20 bytes, all integers big-endian):
//!
//! ```text
//! magic: u32        = 0xDEC0DE58
//! checksum: u32      = crc32(payload)
//! sequence: u32
//! command_id: u32     (command id, or the transaction id being responded to)
//! data_length: u32
//! ```
//!
//! followed by `data_length` bytes of [`field`] tuples concatenated.

mod field;

pub use field::{Field, FieldError, FieldValue};

use std::convert::TryInto;

pub const MAGIC: u32 = 0xDEC0_DE58;
const HEADER_LEN: usize = 20;
pub const DEFAULT_MAX_FRAME: usize = 8 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("bad magic: {0:#010x}")]
    InvalidMagic(u32),
    #[error("checksum mismatch: header={header:#010x} computed={computed:#010x}")]
    ChecksumMismatch { header: u32, computed: u32 },
    #[error("frame of {0} bytes exceeds the {1} byte limit")]
    FrameTooLarge(usize, usize),
    #[error("field decode error: {0}")]
    Field(#[from] FieldError),
}

/// Result of [`Frame::parse`]: either a complete frame was decoded, or more
/// bytes are needed before one can be.
pub enum ParseOutcome {
    Complete { frame: Frame, consumed: usize },
    NeedMore(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub sequence: u32,
    /// The command id for a request, or the transaction id being responded
    /// to for a reply (spec.md §4.1: "Each command carries a transaction
    /// id; the response references it").
    pub command_id: u32,
    pub fields: Vec<Field>,
}

impl Frame {
    pub fn new(sequence: u32, command_id: u32, fields: Vec<Field>) -> Self {
        Frame {
            sequence,
            command_id,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Encodes the frame to bytes. Always round-trips through [`parse`]
    /// (spec.md §8 invariant 4: `parse(encode(f)) == f`).
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        for field in &self.fields {
            field.encode_into(&mut payload);
        }

        let checksum = crc32fast::hash(&payload);
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&checksum.to_be_bytes());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.command_id.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&payload);
        out
    }

    /// Attempts to decode one frame from the front of `bytes`. Never
    /// blocks and never panics on truncated input (spec.md §8 boundary:
    /// "returns only the bytes available, never blocks" applies equally
    /// here as it does to chainbuf peeks).
    pub fn parse(bytes: &[u8], max_frame: usize) -> Result<ParseOutcome, FrameError> {
        if bytes.len() < HEADER_LEN {
            return Ok(ParseOutcome::NeedMore(HEADER_LEN - bytes.len()));
        }

        let magic = u32::from_be_bytes(bytes[0..4].try_into().expect("slice is 4 bytes"));
        if magic != MAGIC {
            return Err(FrameError::InvalidMagic(magic));
        }
        let checksum = u32::from_be_bytes(bytes[4..8].try_into().expect("slice is 4 bytes"));
        let sequence = u32::from_be_bytes(bytes[8..12].try_into().expect("slice is 4 bytes"));
        let command_id = u32::from_be_bytes(bytes[12..16].try_into().expect("slice is 4 bytes"));
        let data_length =
            u32::from_be_bytes(bytes[16..20].try_into().expect("slice is 4 bytes")) as usize;

        let total = HEADER_LEN + data_length;
        if total > max_frame {
            return Err(FrameError::FrameTooLarge(total, max_frame));
        }
        if bytes.len() < total {
            return Ok(ParseOutcome::NeedMore(total - bytes.len()));
        }

        let payload = &bytes[HEADER_LEN..total];
        let computed = crc32fast::hash(payload);
        if computed != checksum {
            return Err(FrameError::ChecksumMismatch {
                header: checksum,
                computed,
            });
        }

        let fields = field::decode_all(payload)?;
        Ok(ParseOutcome::Complete {
            frame: Frame {
                sequence,
                command_id,
                fields,
            },
            consumed: total,
        })
    }
}
