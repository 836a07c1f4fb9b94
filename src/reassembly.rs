//! # Receiver Reassembly
//!
//! Pure logic — no I/O. Owns the destination buffer for one inbound
//! transfer, tracks which chunks have arrived via a bitmap, validates chunk
//! geometry strictly, and reports completion.
//!
//! ## Responsibilities
//!
//! 1. **Ownership**: hold the one destination buffer for this transfer
//! 2. **Geometry validation**: reject chunk ids and lengths that don't match
//!    the fixed chunk layout, without touching the buffer or the bitmap
//! 3. **Idempotent writes**: re-delivering an already-received chunk is a
//!    no-op for completion purposes (last-writer-wins on the bytes)
//! 4. **Completion tracking**: cache `is_complete` for O(1) queries

use crate::error::ReassemblyError;

/// Maximum chunk size allowed by the wire contract.
pub const MAX_CHUNK_SIZE: u16 = 1024;

/// Receiver-side configuration. Mirrors the shape of this lineage's other
/// `*Config` structs, bundling the constructor parameters callers would
/// otherwise pass positionally. Both fields are mandatory per-transfer
/// values with no sensible default, unlike [`crate::scheduler::SchedulerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ReassemblyConfig {
    pub total_octet_count: u32,
    pub fixed_chunk_size: u16,
}

/// Owns the destination buffer and bitmap for one inbound transfer.
#[derive(Debug)]
pub struct ChunkReassembly {
    total_octet_count: u32,
    fixed_chunk_size: u16,
    chunk_count: u16,
    buffer: Vec<u8>,
    received: Vec<bool>,
    is_complete: bool,
}

impl ChunkReassembly {
    /// Allocate a fresh reassembly buffer.
    ///
    /// Rejects `fixed_chunk_size == 0`, `fixed_chunk_size > 1024`, and
    /// `total_octet_count == 0` — the degenerate empty transfer is not
    /// supported. Also rejects a `(total_octet_count, fixed_chunk_size)` pair
    /// whose chunk count doesn't fit the 16-bit chunk id (e.g. a
    /// `fixed_chunk_size` of 1 against a large `total_octet_count`).
    pub fn new(total_octet_count: u32, fixed_chunk_size: u16) -> Result<Self, ReassemblyError> {
        if fixed_chunk_size == 0 || fixed_chunk_size > MAX_CHUNK_SIZE {
            return Err(ReassemblyError::InvalidChunkSize(fixed_chunk_size as u32));
        }
        if total_octet_count == 0 {
            return Err(ReassemblyError::EmptyTransfer);
        }

        let wide_chunk_count = chunk_count_for(total_octet_count, fixed_chunk_size);
        let chunk_count = u16::try_from(wide_chunk_count).map_err(|_| {
            ReassemblyError::TooManyChunks {
                chunk_count: wide_chunk_count,
            }
        })?;

        Ok(ChunkReassembly {
            total_octet_count,
            fixed_chunk_size,
            chunk_count,
            buffer: vec![0u8; total_octet_count as usize],
            received: vec![false; chunk_count as usize],
            is_complete: false,
        })
    }

    /// Equivalent to [`new`](Self::new), taking the parameters bundled as a
    /// [`ReassemblyConfig`].
    pub fn from_config(config: ReassemblyConfig) -> Result<Self, ReassemblyError> {
        Self::new(config.total_octet_count, config.fixed_chunk_size)
    }

    /// Write one chunk's bytes into the buffer and mark it received.
    ///
    /// On any geometry violation, state is left completely unchanged and the
    /// write is a no-op — the wire layer surfaces the typed error, it does
    /// not fall through and overwrite past the buffer the way the source
    /// this is modeled on does.
    pub fn set_chunk(&mut self, chunk_id: u16, bytes: &[u8]) -> Result<(), ReassemblyError> {
        if chunk_id >= self.chunk_count {
            return Err(ReassemblyError::ChunkOutOfRange {
                chunk_id,
                chunk_count: self.chunk_count,
            });
        }

        let offset = chunk_id as usize * self.fixed_chunk_size as usize;
        let expected_len = self.expected_length(chunk_id);
        if bytes.len() as u32 != expected_len {
            return Err(ReassemblyError::LengthMismatch {
                chunk_id,
                expected: expected_len,
                actual: bytes.len() as u32,
            });
        }
        // Redundant with the above given chunk_count's definition, but
        // checked defensively.
        if offset + bytes.len() > self.total_octet_count as usize {
            return Err(ReassemblyError::LengthMismatch {
                chunk_id,
                expected: expected_len,
                actual: bytes.len() as u32,
            });
        }

        self.buffer[offset..offset + bytes.len()].copy_from_slice(bytes);

        let was_received = self.received[chunk_id as usize];
        self.received[chunk_id as usize] = true;
        if !was_received {
            tracing::trace!(chunk_id, "chunk received");
            self.recompute_complete();
        }

        Ok(())
    }

    /// Whether every chunk has arrived.
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// The completed buffer. Callers should check `is_complete` first — the
    /// contents are meaningless (zero-filled gaps) otherwise.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn chunk_count(&self) -> u16 {
        self.chunk_count
    }

    pub fn fixed_chunk_size(&self) -> u16 {
        self.fixed_chunk_size
    }

    /// Whether `chunk_id` has already been received. `false` for an
    /// out-of-range id.
    pub fn is_received(&self, chunk_id: u16) -> bool {
        self.received.get(chunk_id as usize).copied().unwrap_or(false)
    }

    /// Lowest index of an unset bit, or `chunk_count` if every chunk is set.
    pub fn waiting_for_chunk_id(&self) -> u16 {
        self.received
            .iter()
            .position(|&r| !r)
            .map(|i| i as u16)
            .unwrap_or(self.chunk_count)
    }

    /// The bits of `received` starting at `from + 1`, least-significant bit
    /// first, up to `width` bits.
    pub fn receive_mask_from(&self, from: u16, width: u32) -> u64 {
        let mut mask = 0u64;
        for b in 0..width {
            let idx = from as u64 + 1 + b as u64;
            if idx >= self.chunk_count as u64 {
                break;
            }
            if self.received[idx as usize] {
                mask |= 1u64 << b;
            }
        }
        mask
    }

    fn expected_length(&self, chunk_id: u16) -> u32 {
        if chunk_id == self.chunk_count - 1 {
            self.total_octet_count - chunk_id as u32 * self.fixed_chunk_size as u32
        } else {
            self.fixed_chunk_size as u32
        }
    }

    fn recompute_complete(&mut self) {
        self.is_complete = self.received.iter().all(|&r| r);
    }
}

/// `ceil(total_octet_count / fixed_chunk_size)`, widened: the caller is
/// responsible for checking the result fits a 16-bit chunk id before storing
/// it as a `chunk_count`.
pub fn chunk_count_for(total_octet_count: u32, fixed_chunk_size: u16) -> u32 {
    let size = fixed_chunk_size as u32;
    total_octet_count.div_ceil(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_chunk_size() {
        assert_eq!(
            ChunkReassembly::new(100, 0).unwrap_err(),
            ReassemblyError::InvalidChunkSize(0)
        );
    }

    #[test]
    fn rejects_oversized_chunk_size() {
        assert!(matches!(
            ChunkReassembly::new(100, 1025).unwrap_err(),
            ReassemblyError::InvalidChunkSize(1025)
        ));
    }

    #[test]
    fn rejects_empty_transfer() {
        assert_eq!(
            ChunkReassembly::new(0, 1024).unwrap_err(),
            ReassemblyError::EmptyTransfer
        );
    }

    #[test]
    fn from_config_matches_new() {
        let config = ReassemblyConfig {
            total_octet_count: 2231,
            fixed_chunk_size: 1024,
        };
        let r = ChunkReassembly::from_config(config).unwrap();
        assert_eq!(r.chunk_count(), 3);
        assert_eq!(r.fixed_chunk_size(), 1024);
    }

    #[test]
    fn chunk_count_rounds_up() {
        let r = ChunkReassembly::new(2231, 1024).unwrap();
        assert_eq!(r.chunk_count(), 3);
    }

    #[test]
    fn chunk_count_exact_multiple() {
        let r = ChunkReassembly::new(2048, 1024).unwrap();
        assert_eq!(r.chunk_count(), 2);
    }

    #[test]
    fn rejects_chunk_count_that_overflows_u16() {
        // ceil(70_000 / 1) = 70_000 chunks, which doesn't fit a 16-bit chunk
        // id (max 65_535) even though both inputs are individually legal.
        let err = ChunkReassembly::new(70_000, 1).unwrap_err();
        assert_eq!(
            err,
            ReassemblyError::TooManyChunks {
                chunk_count: 70_000
            }
        );
    }

    #[test]
    fn accepts_chunk_count_at_u16_max() {
        let r = ChunkReassembly::new(65_535, 1).unwrap();
        assert_eq!(r.chunk_count(), 65_535);
    }

    // ─── Scenario A — tail chunk, out-of-order delivery ─────────────────

    #[test]
    fn scenario_a_tail_chunk_out_of_order() {
        let mut r = ChunkReassembly::new(2231, 1024).unwrap();
        assert!(!r.is_complete());

        r.set_chunk(2, &[7u8; 183]).unwrap();
        assert!(!r.is_complete());

        r.set_chunk(0, &[1u8; 1024]).unwrap();
        assert!(!r.is_complete());

        r.set_chunk(1, &[2u8; 1024]).unwrap();
        assert!(r.is_complete());

        assert_eq!(&r.buffer()[0..1024], &[1u8; 1024][..]);
        assert_eq!(&r.buffer()[1024..2048], &[2u8; 1024][..]);
        assert_eq!(&r.buffer()[2048..2231], &[7u8; 183][..]);
    }

    // ─── Scenario E — malformed chunk rejected ───────────────────────────

    #[test]
    fn scenario_e_malformed_chunk_rejected() {
        let mut r = ChunkReassembly::new(2231, 1024).unwrap();
        let err = r.set_chunk(1, &[0u8; 500]).unwrap_err();
        assert_eq!(
            err,
            ReassemblyError::LengthMismatch {
                chunk_id: 1,
                expected: 1024,
                actual: 500,
            }
        );
        assert_eq!(r.waiting_for_chunk_id(), 0);
    }

    #[test]
    fn chunk_id_out_of_range_rejected() {
        let mut r = ChunkReassembly::new(2231, 1024).unwrap();
        let err = r.set_chunk(3, &[0u8; 1]).unwrap_err();
        assert_eq!(
            err,
            ReassemblyError::ChunkOutOfRange {
                chunk_id: 3,
                chunk_count: 3
            }
        );
    }

    #[test]
    fn tail_chunk_requires_exact_tail_length() {
        let mut r = ChunkReassembly::new(2231, 1024).unwrap();
        // Tail chunk (id 2) needs exactly 183 bytes, not 1024.
        let err = r.set_chunk(2, &[0u8; 1024]).unwrap_err();
        assert!(matches!(err, ReassemblyError::LengthMismatch { .. }));
    }

    #[test]
    fn idempotent_redelivery_is_noop_for_completion() {
        let mut r = ChunkReassembly::new(2048, 1024).unwrap();
        r.set_chunk(0, &[9u8; 1024]).unwrap();
        r.set_chunk(1, &[9u8; 1024]).unwrap();
        assert!(r.is_complete());

        // Re-deliver chunk 0 with identical bytes: still complete.
        r.set_chunk(0, &[9u8; 1024]).unwrap();
        assert!(r.is_complete());
    }

    #[test]
    fn redelivery_with_different_bytes_overwrites() {
        let mut r = ChunkReassembly::new(1024, 1024).unwrap();
        r.set_chunk(0, &[1u8; 1024]).unwrap();
        r.set_chunk(0, &[2u8; 1024]).unwrap();
        assert_eq!(&r.buffer()[..], &[2u8; 1024][..]);
    }

    #[test]
    fn waiting_for_chunk_id_reports_chunk_count_when_complete() {
        let mut r = ChunkReassembly::new(1024, 1024).unwrap();
        r.set_chunk(0, &[0u8; 1024]).unwrap();
        assert_eq!(r.waiting_for_chunk_id(), r.chunk_count());
    }

    #[test]
    fn receive_mask_reports_bits_after_waiting_for() {
        let mut r = ChunkReassembly::new(5 * 1024, 1024).unwrap();
        // chunks 0..5, receive 0, 2, 4 — waiting for 1.
        r.set_chunk(0, &[0u8; 1024]).unwrap();
        r.set_chunk(2, &[0u8; 1024]).unwrap();
        r.set_chunk(4, &[0u8; 1024]).unwrap();
        assert_eq!(r.waiting_for_chunk_id(), 1);
        let mask = r.receive_mask_from(1, 64);
        // bit 0 -> chunk 2 (set), bit 1 -> chunk 3 (unset), bit 2 -> chunk 4 (set)
        assert_eq!(mask & 0b111, 0b101);
    }
}
