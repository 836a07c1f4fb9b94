//! Plain observational counters for one receiver or sender instance.
//!
//! Purely additive bookkeeping with no behavioral effect on the state
//! machines — the same "observe, don't steer" role `strata-transport`'s
//! stats types play for its link/session layer.

use serde::Serialize;

/// Counters a receiver accumulates over the life of one transfer.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReceiverStats {
    pub chunks_delivered: u64,
    pub duplicate_chunks: u64,
    pub geometry_rejections: u64,
}

impl ReceiverStats {
    pub fn record_set_chunk_ok(&mut self, was_already_received: bool) {
        self.chunks_delivered += 1;
        if was_already_received {
            self.duplicate_chunks += 1;
        }
    }

    pub fn record_geometry_rejection(&mut self) {
        self.geometry_rejections += 1;
    }
}

/// Counters a sender accumulates over the life of one transfer.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SenderStats {
    pub chunks_sent: u64,
    pub chunks_retransmitted: u64,
    pub chunks_acked: u64,
}

impl SenderStats {
    pub fn record_send(&mut self, is_retransmit: bool) {
        self.chunks_sent += 1;
        if is_retransmit {
            self.chunks_retransmitted += 1;
        }
    }

    pub fn record_ack(&mut self) {
        self.chunks_acked += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_stats_track_duplicates_and_rejections() {
        let mut s = ReceiverStats::default();
        s.record_set_chunk_ok(false);
        s.record_set_chunk_ok(true);
        s.record_geometry_rejection();
        assert_eq!(s.chunks_delivered, 2);
        assert_eq!(s.duplicate_chunks, 1);
        assert_eq!(s.geometry_rejections, 1);
    }

    #[test]
    fn sender_stats_track_retransmits() {
        let mut s = SenderStats::default();
        s.record_send(false);
        s.record_send(true);
        s.record_ack();
        assert_eq!(s.chunks_sent, 2);
        assert_eq!(s.chunks_retransmitted, 1);
        assert_eq!(s.chunks_acked, 1);
    }

    #[test]
    fn stats_serialize_to_json() {
        let s = SenderStats::default();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("chunks_sent"));
    }
}
