//! Typed error taxonomy for the reassembly bitmap and the command framing
//! that wraps it.
//!
//! The source this protocol is modeled on logs a warning and keeps going on
//! most of these paths (an overlong chunk write, an unknown command byte).
//! Here every fallible operation returns one of these instead, and leaves
//! state untouched on the error path.

use thiserror::Error;

/// Failure to admit a chunk into the reassembly buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReassemblyError {
    /// `fixed_chunk_size` is zero or exceeds the 1024-byte wire limit.
    #[error("fixed chunk size {0} is out of range (must be 1..=1024)")]
    InvalidChunkSize(u32),
    /// `total_octet_count` was zero — the degenerate empty transfer is rejected.
    #[error("total octet count must be nonzero")]
    EmptyTransfer,
    /// `ceil(total_octet_count / fixed_chunk_size)` exceeds `u16::MAX` and so
    /// cannot be addressed by a 16-bit chunk id.
    #[error("chunk count {chunk_count} does not fit a 16-bit chunk id (max {max})", max = u16::MAX)]
    TooManyChunks { chunk_count: u32 },
    /// `chunk_id >= chunk_count`.
    #[error("chunk id {chunk_id} is out of range (chunk count is {chunk_count})")]
    ChunkOutOfRange { chunk_id: u16, chunk_count: u16 },
    /// The supplied length didn't match what this chunk position requires
    /// (`fixed_chunk_size` for all but the last chunk, the exact tail length
    /// for the last one).
    #[error("chunk {chunk_id} length {actual} does not match expected length {expected}")]
    LengthMismatch {
        chunk_id: u16,
        expected: u32,
        actual: u32,
    },
}

/// Failure while parsing or emitting a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The input was exhausted before a complete frame could be read.
    #[error("short read decoding frame")]
    ShortRead,
    /// The first byte of the frame wasn't a recognized command code.
    #[error("unknown command byte 0x{0:02x}")]
    UnknownCommand(u8),
    /// A `SET_CHUNK` or `ACK_CHUNK` frame failed reassembly/scheduler geometry
    /// validation. State is left unchanged.
    #[error(transparent)]
    Geometry(#[from] ReassemblyError),
    /// The frame's `transfer_id` did not match the id this endpoint is
    /// tracking. Soft error — the frame is ignored, no state changes.
    #[error("transfer id mismatch: expected {expected}, got {actual}")]
    TransferIdMismatch { expected: u16, actual: u16 },
    /// The output sink could not accept the frame (e.g. would exceed the
    /// datagram budget). The caller should retry on its next tick.
    #[error("output sink is full")]
    OutputFull,
}
