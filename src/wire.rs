//! # Command Framing
//!
//! Binary frames exchanged between the sender and receiver halves of a
//! transfer. Every multi-byte integer is big-endian, matching `bytes`'
//! `Buf`/`BufMut` defaults — there is no VarInt encoding here (unlike some
//! sibling wire formats in this lineage): chunk ids, lengths, and the ack
//! mask are all fixed-width per the wire contract this protocol commits to.
//!
//! ```text
//! START_TRANSFER:      0x02 | transfer_id:u16 | octet_count:u32 | fixed_chunk_size:u16
//! ACK_START_TRANSFER:  0x03 | transfer_id:u16
//! SET_CHUNK:           0x01 | transfer_id:u16 | chunk_id:u32 | length:u16 | bytes:[length]
//! ACK_CHUNK:           0x04 | transfer_id:u16 | waiting_for_chunk_id:u32 | receive_mask:u64
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

// ─── Command codes ──────────────────────────────────────────────────────────

pub const CMD_SET_CHUNK: u8 = 0x01;
pub const CMD_START_TRANSFER: u8 = 0x02;
pub const CMD_ACK_START_TRANSFER: u8 = 0x03;
pub const CMD_ACK_CHUNK: u8 = 0x04;

/// Per-datagram budget this protocol was designed against. A `SET_CHUNK`
/// frame with `length <= 1080` always fits.
pub const DATAGRAM_BUDGET: usize = 1100;

// ─── START_TRANSFER ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTransferFrame {
    pub transfer_id: u16,
    pub octet_count: u32,
    pub fixed_chunk_size: u16,
}

impl StartTransferFrame {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(CMD_START_TRANSFER);
        buf.put_u16(self.transfer_id);
        buf.put_u32(self.octet_count);
        buf.put_u16(self.fixed_chunk_size);
    }

    /// Decode the frame body. The caller has already consumed the command byte.
    pub fn decode_body(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < 8 {
            return Err(ProtocolError::ShortRead);
        }
        Ok(StartTransferFrame {
            transfer_id: buf.get_u16(),
            octet_count: buf.get_u32(),
            fixed_chunk_size: buf.get_u16(),
        })
    }
}

// ─── ACK_START_TRANSFER ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckStartTransferFrame {
    pub transfer_id: u16,
}

impl AckStartTransferFrame {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(CMD_ACK_START_TRANSFER);
        buf.put_u16(self.transfer_id);
    }

    pub fn decode_body(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < 2 {
            return Err(ProtocolError::ShortRead);
        }
        Ok(AckStartTransferFrame {
            transfer_id: buf.get_u16(),
        })
    }
}

// ─── SET_CHUNK ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetChunkFrame {
    pub transfer_id: u16,
    pub chunk_id: u16,
    pub bytes: Bytes,
}

impl SetChunkFrame {
    /// Encode a `SET_CHUNK` frame. Panics (like any other `BufMut` overrun)
    /// only if `buf` has less capacity than the encoded frame — callers are
    /// expected to size their buffer with `encoded_len`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(CMD_SET_CHUNK);
        buf.put_u16(self.transfer_id);
        buf.put_u32(self.chunk_id as u32);
        buf.put_u16(self.bytes.len() as u16);
        buf.extend_from_slice(&self.bytes);
    }

    pub fn encoded_len(&self) -> usize {
        1 + 2 + 4 + 2 + self.bytes.len()
    }

    /// Decode the frame body. The caller has already consumed the command byte.
    /// `max_chunk_size` rejects a `length` that exceeds the configured
    /// `fixed_chunk_size` before the payload bytes are even read.
    pub fn decode_body(buf: &mut impl Buf, max_chunk_size: u16) -> Result<Self, ProtocolError> {
        if buf.remaining() < 8 {
            return Err(ProtocolError::ShortRead);
        }
        let transfer_id = buf.get_u16();
        let chunk_id_wide = buf.get_u32();
        let length = buf.get_u16();
        if length > max_chunk_size {
            return Err(ProtocolError::Geometry(
                crate::error::ReassemblyError::LengthMismatch {
                    chunk_id: chunk_id_wide as u16,
                    expected: max_chunk_size as u32,
                    actual: length as u32,
                },
            ));
        }
        if buf.remaining() < length as usize {
            return Err(ProtocolError::ShortRead);
        }
        let bytes = buf.copy_to_bytes(length as usize);
        Ok(SetChunkFrame {
            transfer_id,
            chunk_id: chunk_id_wide as u16,
            bytes,
        })
    }
}

// ─── ACK_CHUNK ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckChunkFrame {
    pub transfer_id: u16,
    pub waiting_for_chunk_id: u32,
    pub receive_mask: u64,
}

impl AckChunkFrame {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(CMD_ACK_CHUNK);
        buf.put_u16(self.transfer_id);
        buf.put_u32(self.waiting_for_chunk_id);
        buf.put_u64(self.receive_mask);
    }

    pub fn decode_body(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < 14 {
            return Err(ProtocolError::ShortRead);
        }
        Ok(AckChunkFrame {
            transfer_id: buf.get_u16(),
            waiting_for_chunk_id: buf.get_u32(),
            receive_mask: buf.get_u64(),
        })
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Any decoded frame, tagged by the command byte that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    StartTransfer(StartTransferFrame),
    AckStartTransfer(AckStartTransferFrame),
    SetChunk(SetChunkFrame),
    AckChunk(AckChunkFrame),
}

impl Frame {
    /// Read the command byte and decode the matching body.
    ///
    /// `max_chunk_size` is only consulted for `SET_CHUNK` frames; pass the
    /// receiver's configured `fixed_chunk_size`.
    pub fn decode(buf: &mut impl Buf, max_chunk_size: u16) -> Result<Self, ProtocolError> {
        if !buf.has_remaining() {
            return Err(ProtocolError::ShortRead);
        }
        let cmd = buf.get_u8();
        match cmd {
            CMD_SET_CHUNK => SetChunkFrame::decode_body(buf, max_chunk_size).map(Frame::SetChunk),
            CMD_START_TRANSFER => StartTransferFrame::decode_body(buf).map(Frame::StartTransfer),
            CMD_ACK_START_TRANSFER => {
                AckStartTransferFrame::decode_body(buf).map(Frame::AckStartTransfer)
            }
            CMD_ACK_CHUNK => AckChunkFrame::decode_body(buf).map(Frame::AckChunk),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}
