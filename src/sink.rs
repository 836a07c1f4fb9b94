//! Abstract collaborators for the datagram transport this crate does not own.
//!
//! The reliability engine never touches a socket. `receive`/`send_ack`/
//! `send_entry` already take `impl Buf` and `BytesMut` directly, which covers
//! most callers; these traits exist for hosts that want to queue outbound
//! frames behind their own abstraction rather than handing a `BytesMut` to
//! each call site.

use bytes::Buf;

use crate::error::ProtocolError;

/// A destination that accepts one framed datagram at a time.
///
/// Implementors report [`ProtocolError::OutputFull`] when a frame would not
/// fit (e.g. an outbound queue at capacity) rather than blocking or
/// buffering internally — the scheduler's timer is the only retry
/// mechanism, per the error handling design.
pub trait OutputSink {
    /// Accept one fully-encoded frame. `frame` contains exactly one datagram's
    /// worth of bytes.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), ProtocolError>;
}

impl OutputSink for Vec<Vec<u8>> {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        self.push(frame.to_vec());
        Ok(())
    }
}

/// A source of inbound framed bytes. Blanket-implemented for any
/// [`bytes::Buf`] — callers typically hand in a `BytesMut`/`Bytes` holding
/// exactly one received datagram.
pub trait InputSource: Buf {}

impl<T: Buf> InputSource for T {}
