//! # blobxfer-core
//!
//! Reliability engine for a chunked blob transfer protocol: the receiver's
//! chunk-reassembly bitmap, the sender's per-chunk retransmit scheduler, and
//! the compact binary command framing that couples them.
//!
//! This crate owns none of the surrounding system — no socket, no CLI, no
//! payload acquisition. Callers drive [`ReceiverProtocol`] and
//! [`SenderProtocol`] from their own event loop, handing them inbound frames
//! and pulling outbound ones via the [`sink`] traits.
//!
//! ## Crate structure
//!
//! - [`wire`] — command framing (`START_TRANSFER`, `SET_CHUNK`,
//!   `ACK_START_TRANSFER`, `ACK_CHUNK`), big-endian fixed-width fields
//! - [`reassembly`] — receiver-side chunk bitmap and destination buffer
//! - [`scheduler`] — sender-side per-chunk entries, retransmit timer, budget
//! - [`receiver_protocol`] — wraps [`reassembly`] with [`wire`] framing
//! - [`sender_protocol`] — wraps [`scheduler`] with [`wire`] framing
//! - [`stats`] — per-transfer observational counters
//! - [`sink`] — abstract datagram sink/source traits
//! - [`error`] — typed error taxonomy

pub mod error;
pub mod reassembly;
pub mod receiver_protocol;
pub mod scheduler;
pub mod sender_protocol;
pub mod sink;
pub mod stats;
pub mod wire;

pub use error::{ProtocolError, ReassemblyError};
pub use reassembly::ChunkReassembly;
pub use receiver_protocol::ReceiverProtocol;
pub use scheduler::SendScheduler;
pub use sender_protocol::{AckEvent, SenderProtocol};
