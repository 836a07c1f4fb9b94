//! # Sender Scheduler
//!
//! Holds one entry per chunk — last-sent timestamp, send count, received
//! flag — and selects which chunks to (re)transmit on each tick under a
//! redundancy timer and a per-call budget. Applies cumulative+selective
//! acknowledgements reported by the receiver.
//!
//! Mirrors the geometry rules of [`crate::reassembly::ChunkReassembly`] since
//! construction validates the same chunk layout.

use bytes::Bytes;

use crate::error::ReassemblyError;
use crate::reassembly::{chunk_count_for, MAX_CHUNK_SIZE};

/// Default per-tick send budget. The protocol's first generation used
/// `K = 3`; the canonical protocol uses `K = 5`. Overridable per
/// [`SchedulerConfig::max_send_budget`] for hosts that want a different
/// per-tick ceiling.
pub const DEFAULT_SEND_BUDGET: usize = 5;

/// Sender-side configuration.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub resend_threshold_ms: u64,
    pub max_send_budget: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            resend_threshold_ms: 50,
            max_send_budget: DEFAULT_SEND_BUDGET,
        }
    }
}

/// One chunk's transmission bookkeeping.
#[derive(Debug, Clone)]
pub struct SenderEntry {
    pub chunk_id: u16,
    pub octets: Bytes,
    pub last_sent_at_ms: u64,
    pub send_count: u32,
    pub is_received: bool,
}

/// Holds the borrowed payload and per-chunk entries for one outbound transfer.
#[derive(Debug)]
pub struct SendScheduler {
    fixed_chunk_size: u16,
    chunk_count: u16,
    entries: Vec<SenderEntry>,
    sent_chunk_entry_count: u32,
    is_complete: bool,
    config: SchedulerConfig,
}

impl SendScheduler {
    pub fn new(
        payload: Bytes,
        total_octet_count: u32,
        fixed_chunk_size: u16,
    ) -> Result<Self, ReassemblyError> {
        Self::with_config(
            payload,
            total_octet_count,
            fixed_chunk_size,
            SchedulerConfig::default(),
        )
    }

    pub fn with_config(
        payload: Bytes,
        total_octet_count: u32,
        fixed_chunk_size: u16,
        config: SchedulerConfig,
    ) -> Result<Self, ReassemblyError> {
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

        let mut entries = Vec::with_capacity(chunk_count as usize);
        for i in 0..chunk_count {
            let offset = i as usize * fixed_chunk_size as usize;
            let end = if i == chunk_count - 1 {
                total_octet_count as usize
            } else {
                offset + fixed_chunk_size as usize
            };
            entries.push(SenderEntry {
                chunk_id: i,
                octets: payload.slice(offset..end),
                last_sent_at_ms: 0,
                send_count: 0,
                is_received: false,
            });
        }

        Ok(SendScheduler {
            fixed_chunk_size,
            chunk_count,
            entries,
            sent_chunk_entry_count: 0,
            is_complete: false,
            config,
        })
    }

    pub fn chunk_count(&self) -> u16 {
        self.chunk_count
    }

    pub fn fixed_chunk_size(&self) -> u16 {
        self.fixed_chunk_size
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn is_all_sent(&self) -> bool {
        self.sent_chunk_entry_count as u16 == self.chunk_count
    }

    pub fn entry(&self, chunk_id: u16) -> &SenderEntry {
        &self.entries[chunk_id as usize]
    }

    /// Apply a cumulative+selective acknowledgement.
    ///
    /// Bit 0 of `mask` refers to chunk `everything_before_this + 1`, not
    /// `everything_before_this` itself — the chunk at that index is covered
    /// by the cumulative part.
    pub fn mark_received(&mut self, everything_before_this: u16, mask: u64) {
        if self.is_complete {
            return;
        }

        for i in 0..everything_before_this.min(self.chunk_count) {
            self.entries[i as usize].is_received = true;
        }

        if everything_before_this >= self.chunk_count {
            self.is_complete = true;
            tracing::debug!("transfer complete via cumulative ack");
            return;
        }

        for b in 0..64u32 {
            if mask & (1u64 << b) == 0 {
                continue;
            }
            let idx = everything_before_this as u32 + 1 + b;
            if idx < self.chunk_count as u32 {
                self.entries[idx as usize].is_received = true;
            }
        }

        self.is_complete = self.entries.iter().all(|e| e.is_received);
    }

    /// Select up to `max_entries.min(config.max_send_budget)` chunks to
    /// (re)transmit this tick.
    pub fn get_chunks_to_send(&mut self, now_ms: u64, max_entries: usize) -> Vec<u16> {
        let cap = max_entries.min(self.config.max_send_budget);
        let mut selected = Vec::with_capacity(cap);

        for entry in &mut self.entries {
            if selected.len() >= cap {
                break;
            }
            if entry.is_received {
                continue;
            }
            let due = entry.send_count == 0
                || now_ms.saturating_sub(entry.last_sent_at_ms) > self.config.resend_threshold_ms;
            if !due {
                continue;
            }

            entry.last_sent_at_ms = now_ms;
            if entry.send_count == 0 {
                self.sent_chunk_entry_count += 1;
            }
            entry.send_count += 1;
            selected.push(entry.chunk_id);
        }

        tracing::trace!(now_ms, selected = selected.len(), "scheduler tick");
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Bytes {
        Bytes::from(vec![0xAB; len])
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(SendScheduler::new(payload(10), 0, 1024).is_err());
        assert!(SendScheduler::new(payload(10), 10, 0).is_err());
        assert!(SendScheduler::new(payload(10), 10, 1025).is_err());
    }

    #[test]
    fn rejects_chunk_count_that_overflows_u16() {
        let err = SendScheduler::new(payload(70_000), 70_000, 1).unwrap_err();
        assert_eq!(
            err,
            ReassemblyError::TooManyChunks {
                chunk_count: 70_000
            }
        );
    }

    // ─── Scenario B — sender completion via cumulative ack ──────────────

    #[test]
    fn scenario_b_cumulative_completion() {
        let mut s = SendScheduler::new(payload(2246), 2246, 1024).unwrap();
        assert!(!s.is_complete());
        assert!(!s.is_all_sent());

        s.mark_received(0, 0);
        assert!(!s.is_complete());

        let first = s.get_chunks_to_send(99, 2);
        assert_eq!(first.len(), 2);
        assert!(!s.is_all_sent());

        let second = s.get_chunks_to_send(99, 1);
        assert_eq!(second.len(), 1);
        assert!(s.is_all_sent());

        s.mark_received(3, 0);
        assert!(s.is_complete());
    }

    // ─── Scenario C — selective ack via mask ─────────────────────────────

    #[test]
    fn scenario_c_selective_ack_mask() {
        let mut s = SendScheduler::new(payload(5 * 1024), 5 * 1024, 1024).unwrap();
        assert_eq!(s.get_chunks_to_send(0, 5), vec![0, 1, 2, 3, 4]);

        s.mark_received(1, 0b00000101);
        assert!(s.entry(0).is_received);
        assert!(!s.entry(1).is_received);
        assert!(s.entry(2).is_received);
        assert!(!s.entry(3).is_received);
        assert!(s.entry(4).is_received);
        assert!(!s.is_complete());
    }

    // ─── Scenario D — retransmit timing ──────────────────────────────────

    #[test]
    fn scenario_d_retransmit_timing() {
        let mut s = SendScheduler::new(payload(2048), 2048, 1024).unwrap();
        let first = s.get_chunks_to_send(100, 5);
        assert_eq!(first, vec![0, 1]);

        let too_soon = s.get_chunks_to_send(140, 5);
        assert!(too_soon.is_empty());

        let retransmit = s.get_chunks_to_send(160, 5);
        assert_eq!(retransmit, vec![0, 1]);
    }

    #[test]
    fn budget_caps_at_default_send_budget() {
        let mut s = SendScheduler::new(payload(20 * 1024), 20 * 1024, 1024).unwrap();
        let sent = s.get_chunks_to_send(0, 100);
        assert_eq!(sent.len(), DEFAULT_SEND_BUDGET);
    }

    #[test]
    fn requested_cap_below_default_budget_is_honored() {
        let mut s = SendScheduler::new(payload(20 * 1024), 20 * 1024, 1024).unwrap();
        let sent = s.get_chunks_to_send(0, 2);
        assert_eq!(sent.len(), 2);
    }

    #[test]
    fn with_config_honors_a_narrower_send_budget() {
        // Mirrors the first-generation protocol's K = 3 per-tick budget.
        let config = SchedulerConfig {
            resend_threshold_ms: 50,
            max_send_budget: 3,
        };
        let mut s =
            SendScheduler::with_config(payload(20 * 1024), 20 * 1024, 1024, config).unwrap();
        let sent = s.get_chunks_to_send(0, 100);
        assert_eq!(sent.len(), 3);
    }

    #[test]
    fn with_config_honors_a_custom_resend_threshold() {
        let config = SchedulerConfig {
            resend_threshold_ms: 10,
            max_send_budget: DEFAULT_SEND_BUDGET,
        };
        let mut s = SendScheduler::with_config(payload(1024), 1024, 1024, config).unwrap();
        assert_eq!(s.get_chunks_to_send(0, 5).len(), 1);
        assert!(s.get_chunks_to_send(5, 5).is_empty());
        assert_eq!(s.get_chunks_to_send(11, 5).len(), 1);
    }

    #[test]
    fn mark_received_is_idempotent() {
        let mut s = SendScheduler::new(payload(5 * 1024), 5 * 1024, 1024).unwrap();
        s.mark_received(1, 0b101);
        let snapshot: Vec<bool> = s.entries.iter().map(|e| e.is_received).collect();
        s.mark_received(1, 0b101);
        let snapshot_again: Vec<bool> = s.entries.iter().map(|e| e.is_received).collect();
        assert_eq!(snapshot, snapshot_again);
    }

    #[test]
    fn complete_sender_ignores_further_marks() {
        let mut s = SendScheduler::new(payload(1024), 1024, 1024).unwrap();
        s.mark_received(1, 0);
        assert!(s.is_complete());
        s.mark_received(0, 0xFF);
        assert!(s.is_complete());
        assert!(s.entry(0).is_received);
    }

    #[test]
    fn received_entries_are_skipped_on_next_tick() {
        let mut s = SendScheduler::new(payload(2048), 2048, 1024).unwrap();
        s.get_chunks_to_send(0, 5);
        s.mark_received(1, 0);
        let next = s.get_chunks_to_send(1000, 5);
        assert_eq!(next, vec![1]);
    }

    #[test]
    fn entries_slice_into_payload_correctly() {
        let mut data = vec![0u8; 2231];
        data[2048..2231].fill(0x42);
        let s = SendScheduler::new(Bytes::from(data), 2231, 1024).unwrap();
        assert_eq!(s.entry(2).octets.len(), 183);
        assert!(s.entry(2).octets.iter().all(|&b| b == 0x42));
    }
}
