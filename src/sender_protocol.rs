//! # Sender Protocol
//!
//! Wraps a [`SendScheduler`] with the command framing from [`crate::wire`].
//! Emits `START_TRANSFER` and `SET_CHUNK` frames tagged with a transfer id;
//! parses `ACK_START_TRANSFER` and `ACK_CHUNK`; drives the scheduler.

use bytes::{Buf, BytesMut};

use crate::error::ProtocolError;
use crate::scheduler::SendScheduler;
use crate::stats::SenderStats;
use crate::wire::{self, AckChunkFrame, AckStartTransferFrame, SetChunkFrame, StartTransferFrame};

/// Observable outcome of a successfully-dispatched inbound acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckEvent {
    /// `ACK_START_TRANSFER` matched our transfer id.
    TransferStarted,
    /// `ACK_CHUNK` matched our transfer id and was applied to the scheduler.
    /// `newly_complete` is true only on the call that flips `is_complete`
    /// from false to true.
    ChunkAck { newly_complete: bool },
}

/// Driven by an external event loop that calls [`prepare_send`](Self::prepare_send)
/// / [`send_entry`](Self::send_entry) each tick and [`receive`](Self::receive)
/// as acknowledgements arrive.
#[derive(Debug)]
pub struct SenderProtocol {
    scheduler: SendScheduler,
    transfer_id: u16,
    octet_count: u32,
    stats: SenderStats,
}

impl SenderProtocol {
    pub fn new(scheduler: SendScheduler, transfer_id: u16, octet_count: u32) -> Self {
        SenderProtocol {
            scheduler,
            transfer_id,
            octet_count,
            stats: SenderStats::default(),
        }
    }

    pub fn scheduler(&self) -> &SendScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    pub fn is_complete(&self) -> bool {
        self.scheduler.is_complete()
    }

    /// Emit `START_TRANSFER`. The caller is responsible for resending this
    /// until `ACK_START_TRANSFER` is observed — that retransmit policy is
    /// separate from chunk scheduling.
    pub fn start_transfer(&self, buf: &mut BytesMut) {
        StartTransferFrame {
            transfer_id: self.transfer_id,
            octet_count: self.octet_count,
            fixed_chunk_size: self.scheduler.fixed_chunk_size(),
        }
        .encode(buf);
    }

    /// Thin pass-through to the scheduler.
    pub fn prepare_send(&mut self, now_ms: u64, max_entries: usize) -> Vec<u16> {
        self.scheduler.get_chunks_to_send(now_ms, max_entries)
    }

    /// Emit `SET_CHUNK` for `chunk_id`. Rejects with
    /// [`ProtocolError::OutputFull`] before writing anything if the encoded
    /// frame would exceed the per-datagram budget.
    pub fn send_entry(&mut self, buf: &mut BytesMut, chunk_id: u16) -> Result<(), ProtocolError> {
        let entry = self.scheduler.entry(chunk_id);
        let is_retransmit = entry.send_count > 1;
        let frame = SetChunkFrame {
            transfer_id: self.transfer_id,
            chunk_id: entry.chunk_id,
            bytes: entry.octets.clone(),
        };
        if frame.encoded_len() > wire::DATAGRAM_BUDGET {
            return Err(ProtocolError::OutputFull);
        }
        frame.encode(buf);
        self.stats.record_send(is_retransmit);
        Ok(())
    }

    /// Read one command byte and dispatch `ACK_START_TRANSFER` / `ACK_CHUNK`.
    pub fn receive(&mut self, buf: &mut impl Buf) -> Result<AckEvent, ProtocolError> {
        if !buf.has_remaining() {
            return Err(ProtocolError::ShortRead);
        }
        let cmd = buf.get_u8();
        match cmd {
            wire::CMD_ACK_START_TRANSFER => {
                let frame = AckStartTransferFrame::decode_body(buf)?;
                self.check_transfer_id(frame.transfer_id)?;
                Ok(AckEvent::TransferStarted)
            }
            wire::CMD_ACK_CHUNK => {
                let frame = AckChunkFrame::decode_body(buf)?;
                self.check_transfer_id(frame.transfer_id)?;
                let was_complete = self.scheduler.is_complete();
                self.scheduler.mark_received(
                    frame.waiting_for_chunk_id as u16,
                    frame.receive_mask,
                );
                let newly_complete = !was_complete && self.scheduler.is_complete();
                self.stats.record_ack();
                Ok(AckEvent::ChunkAck { newly_complete })
            }
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }

    fn check_transfer_id(&self, actual: u16) -> Result<(), ProtocolError> {
        if actual != self.transfer_id {
            tracing::debug!(expected = self.transfer_id, actual, "transfer id mismatch");
            return Err(ProtocolError::TransferIdMismatch {
                expected: self.transfer_id,
                actual,
            });
        }
        Ok(())
    }
}
