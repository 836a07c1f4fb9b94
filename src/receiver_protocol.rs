//! # Receiver Protocol
//!
//! Wraps a [`ChunkReassembly`] with the command framing from [`crate::wire`].
//! Parses inbound `SET_CHUNK` frames and forwards payloads to the
//! reassembly; emits `ACK_CHUNK` frames reporting the next-needed chunk and
//! a trailing bitmask of subsequently-received chunks.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::reassembly::ChunkReassembly;
use crate::stats::ReceiverStats;
use crate::wire::{self, AckChunkFrame, SetChunkFrame};

/// Driven by an external event loop that calls [`receive`](Self::receive) as
/// datagrams arrive and [`send_ack`](Self::send_ack) on its own cadence.
#[derive(Debug)]
pub struct ReceiverProtocol {
    reassembly: ChunkReassembly,
    transfer_id: u16,
    stats: ReceiverStats,
}

impl ReceiverProtocol {
    pub fn new(reassembly: ChunkReassembly, transfer_id: u16) -> Self {
        ReceiverProtocol {
            reassembly,
            transfer_id,
            stats: ReceiverStats::default(),
        }
    }

    pub fn reassembly(&self) -> &ChunkReassembly {
        &self.reassembly
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    pub fn is_complete(&self) -> bool {
        self.reassembly.is_complete()
    }

    /// Read one command byte and dispatch.
    ///
    /// Only `SET_CHUNK` is valid inbound to a receiver; any other command
    /// byte — known elsewhere on the wire or not — is rejected here with
    /// [`ProtocolError::UnknownCommand`], matching the source's behavior of
    /// falling through its switch on anything but the chunk-data command.
    pub fn receive(&mut self, buf: &mut impl Buf) -> Result<(), ProtocolError> {
        if !buf.has_remaining() {
            return Err(ProtocolError::ShortRead);
        }
        let cmd = buf.get_u8();
        if cmd != wire::CMD_SET_CHUNK {
            return Err(ProtocolError::UnknownCommand(cmd));
        }

        let frame = SetChunkFrame::decode_body(buf, self.reassembly.fixed_chunk_size())?;
        let was_already_received = self.reassembly.is_received(frame.chunk_id);
        match self.reassembly.set_chunk(frame.chunk_id, &frame.bytes) {
            Ok(()) => {
                self.transfer_id = frame.transfer_id;
                self.stats.record_set_chunk_ok(was_already_received);
                tracing::trace!(chunk_id = frame.chunk_id, "SET_CHUNK applied");
                Ok(())
            }
            Err(e) => {
                self.stats.record_geometry_rejection();
                Err(e.into())
            }
        }
    }

    /// Emit `ACK_CHUNK` reflecting current reassembly state. Idempotent,
    /// callable on any cadence.
    pub fn send_ack(&self, buf: &mut BytesMut) {
        let waiting_for_chunk_id = self.reassembly.waiting_for_chunk_id();
        let receive_mask = self.reassembly.receive_mask_from(waiting_for_chunk_id, 64);
        let frame = AckChunkFrame {
            transfer_id: self.transfer_id,
            waiting_for_chunk_id: waiting_for_chunk_id as u32,
            receive_mask,
        };
        frame.encode(buf);
    }
}
