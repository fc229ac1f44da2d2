// SPDX-License-Identifier: Apache-2.0

//! `ChainBuf`: an ordered sequence of fixed-size chunks with a monotonic
//! write cursor and a monotonic read cursor (spec.md §4.2, C2).
//!
//! Single-producer, single-consumer: `write`/`reserve`/`commit` are meant
//! to be called from one thread, `peek`/`consume` from (at most) one other.
//! The borrow checker enforces the "no chunk freed while an outstanding
//! peek refers to it" invariant for [`ChainBuf::zero_copy_peek`] directly,
//! since its return value borrows `&self` and [`ChainBuf::consume`] takes
//! `&mut self`.

use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 4096;

pub struct ChainBuf {
    chunk_size: usize,
    chunks: VecDeque<Vec<u8>>,
    /// Offset of the read cursor within the front chunk.
    read_offset: usize,
    total_written: u64,
    total_consumed: u64,
    dead: bool,
    on_dead: Option<Box<dyn FnMut() + Send>>,
}

/// A region returned by [`ChainBuf::peek`]. If the logical region was
/// already contiguous in one chunk it borrows; if it spanned chunks a copy
/// was materialized. Dropping (or calling [`Peeked::peek_free`]) releases
/// it — named `peek_free` to keep the spec's vocabulary visible in the API.
pub enum Peeked<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl Peeked<'_> {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Peeked::Borrowed(s) => s,
            Peeked::Owned(v) => v,
        }
    }

    pub fn peek_free(self) {
        drop(self)
    }
}

/// A writable region handed out by [`ChainBuf::reserve`]. `Direct` writes
/// land straight into a chunk; `Temp` is used when the caller asked for
/// more than the current chunk's remaining capacity and must be copied in
/// on [`ReserveBuf::commit`].
pub enum ReserveBuf<'a> {
    Direct(&'a mut [u8]),
    Temp(Vec<u8>),
}

impl ReserveBuf<'_> {
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            ReserveBuf::Direct(s) => s,
            ReserveBuf::Temp(v) => v,
        }
    }
}

impl ChainBuf {
    pub fn new(chunk_size: usize) -> Self {
        ChainBuf {
            chunk_size: chunk_size.max(1),
            chunks: VecDeque::new(),
            read_offset: 0,
            total_written: 0,
            total_consumed: 0,
            dead: false,
            on_dead: None,
        }
    }

    pub fn on_dead(&mut self, cb: impl FnMut() + Send + 'static) {
        self.on_dead = Some(Box::new(cb));
    }

    /// Number of unread bytes currently buffered.
    pub fn used(&self) -> u64 {
        self.total_written - self.total_consumed
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Marks the buffer dead; all pending data is drained and the error
    /// callback (if any) fires (spec.md §4.2).
    pub fn mark_dead(&mut self) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.total_consumed = self.total_written;
        self.chunks.clear();
        self.read_offset = 0;
        if let Some(cb) = self.on_dead.as_mut() {
            cb();
        }
    }

    /// Always succeeds; allocates chunks as needed.
    pub fn write(&mut self, mut bytes: &[u8]) {
        if self.dead {
            return;
        }
        while !bytes.is_empty() {
            if self.chunks.back().map(Vec::len).unwrap_or(self.chunk_size) >= self.chunk_size {
                self.chunks.push_back(Vec::with_capacity(self.chunk_size));
            }
            let chunk = self.chunks.back_mut().expect("just pushed a chunk");
            let room = self.chunk_size - chunk.len();
            let take = room.min(bytes.len());
            chunk.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            self.total_written += take as u64;
        }
    }

    /// Returns a writable region for the producer to fill directly; may be
    /// a temporary heap buffer if `n` exceeds the remaining capacity of the
    /// current chunk.
    pub fn reserve(&mut self, n: usize) -> ReserveBuf<'_> {
        if self.chunks.back().map(Vec::len).unwrap_or(self.chunk_size) >= self.chunk_size {
            self.chunks.push_back(Vec::with_capacity(self.chunk_size));
        }
        let chunk = self.chunks.back_mut().expect("just pushed a chunk");
        let room = self.chunk_size - chunk.len();
        if n <= room {
            let start = chunk.len();
            chunk.resize(start + n, 0);
            ReserveBuf::Direct(&mut chunk[start..])
        } else {
            ReserveBuf::Temp(vec![0u8; n])
        }
    }

    /// Commits `used` bytes of a previously reserved region.
    pub fn commit(&mut self, buf: ReserveBuf<'_>, used: usize) {
        match buf {
            ReserveBuf::Direct(slice) => {
                let unused = slice.len() - used;
                self.total_written += used as u64;
                if unused > 0 {
                    // shrink the chunk we grew in `reserve` back down to what was
                    // actually written.
                    if let Some(chunk) = self.chunks.back_mut() {
                        let new_len = chunk.len() - unused;
                        chunk.truncate(new_len);
                    }
                }
            }
            ReserveBuf::Temp(mut v) => {
                v.truncate(used);
                self.write(&v);
            }
        }
    }

    /// Returns whatever contiguous region is immediately available in the
    /// front chunk without copying — may be shorter than `max` even if more
    /// data is buffered in later chunks.
    pub fn zero_copy_peek(&self, max: usize) -> &[u8] {
        match self.chunks.front() {
            None => &[],
            Some(chunk) => {
                let avail = &chunk[self.read_offset..];
                &avail[..avail.len().min(max)]
            }
        }
    }

    /// Returns a contiguous view of up to `n` bytes, copying across chunk
    /// boundaries if necessary. Never blocks; if `n > used()` only
    /// `used()` bytes are returned (spec.md §8 boundary behavior).
    pub fn peek(&self, n: usize) -> Peeked<'_> {
        let n = n.min(self.used() as usize);
        if n == 0 {
            return Peeked::Borrowed(&[]);
        }
        if let Some(front) = self.chunks.front() {
            let avail_in_front = front.len() - self.read_offset;
            if n <= avail_in_front {
                return Peeked::Borrowed(&front[self.read_offset..self.read_offset + n]);
            }
        }

        let mut out = Vec::with_capacity(n);
        let mut skip = self.read_offset;
        for chunk in &self.chunks {
            if out.len() >= n {
                break;
            }
            let slice = &chunk[skip..];
            let take = slice.len().min(n - out.len());
            out.extend_from_slice(&slice[..take]);
            skip = 0;
        }
        Peeked::Owned(out)
    }

    /// Advances the read cursor, freeing chunks fully behind it in FIFO
    /// order.
    pub fn consume(&mut self, mut n: u64) {
        n = n.min(self.used());
        self.total_consumed += n;
        let mut remaining = n as usize;
        while remaining > 0 {
            let Some(front) = self.chunks.front() else {
                break;
            };
            let avail = front.len() - self.read_offset;
            if remaining < avail {
                self.read_offset += remaining;
                remaining = 0;
            } else {
                remaining -= avail;
                self.chunks.pop_front();
                self.read_offset = 0;
            }
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_matches_written_minus_consumed() {
        let mut buf = ChainBuf::new(16);
        buf.write(b"hello world this is a test");
        let written = buf.used();
        buf.consume(5);
        assert_eq!(buf.used(), written - 5);
    }

    #[test]
    fn scenario_chainbuf_roundtrip() {
        // spec.md §8 scenario 5.
        let mut buf = ChainBuf::new(16);
        let data: Vec<u8> = (0u8..40).collect();
        buf.write(&data);
        let peeked = buf.zero_copy_peek(64);
        assert!(!peeked.is_empty() && peeked.len() <= 16);
        buf.consume(40);
        assert_eq!(buf.used(), 0);
        assert!(buf.chunk_count() <= 1);
    }

    #[test]
    fn peek_beyond_used_returns_only_used() {
        let mut buf = ChainBuf::new(16);
        buf.write(b"abc");
        let peeked = buf.peek(100);
        assert_eq!(peeked.as_slice(), b"abc");
    }

    #[test]
    fn peek_spanning_chunks_materializes_copy() {
        let mut buf = ChainBuf::new(4);
        buf.write(b"abcdefgh");
        let peeked = buf.peek(8);
        assert!(matches!(peeked, Peeked::Owned(_)));
        assert_eq!(peeked.as_slice(), b"abcdefgh");
    }

    #[test]
    fn reserve_commit_roundtrip() {
        let mut buf = ChainBuf::new(16);
        {
            let mut r = buf.reserve(4);
            r.as_mut_slice().copy_from_slice(b"abcd");
            buf.commit(r, 4);
        }
        assert_eq!(buf.used(), 4);
        assert_eq!(buf.peek(4).as_slice(), b"abcd");
    }

    #[test]
    fn reserve_larger_than_chunk_uses_temp_buffer() {
        let mut buf = ChainBuf::new(4);
        let mut r = buf.reserve(10);
        assert!(matches!(r, ReserveBuf::Temp(_)));
        r.as_mut_slice().copy_from_slice(b"0123456789");
        buf.commit(r, 10);
        assert_eq!(buf.used(), 10);
    }

    #[test]
    fn mark_dead_drains_and_fires_callback() {
        let mut buf = ChainBuf::new(16);
        buf.write(b"pending");
        let fired = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let fired2 = fired.clone();
        buf.on_dead(move || fired2.store(true, std::sync::atomic::Ordering::SeqCst));
        buf.mark_dead();
        assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(buf.used(), 0);
        assert!(buf.is_dead());
    }
}
