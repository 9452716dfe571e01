//! Transport abstraction between the decoder and the network layer.
//!
//! The decoder never opens sockets or sets headers; it consumes a pull-based
//! source of byte chunks ended by an explicit close (stream exhaustion). The
//! reqwest-backed implementation lives in [`crate::client`]; tests substitute
//! scripted in-memory transports.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use stresswatch_types::{ChatError, ChatRequest};

/// Pull source of raw byte chunks for one streaming turn.
///
/// Yields `Err` for a mid-stream transport failure; ends (returns `None`)
/// when the server closes the connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// A connection to the dashboard backend's chat endpoints.
///
/// Uses RPITIT (return position impl trait in trait) — Rust 2024 native
/// async. Not object-safe by design; compose with generics `<T: ChatTransport>`.
pub trait ChatTransport: Send + Sync {
    /// Issue a streaming chat request.
    ///
    /// Resolves once the connection is established and the response status
    /// accepted; the returned stream then delivers the body in arbitrary
    /// byte fragments. A connection or status failure is an error here, with
    /// no bytes delivered.
    fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChunkStream, ChatError>> + Send;

    /// Issue the same request in blocking mode and return the raw response
    /// body once it has fully arrived.
    fn fetch(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, ChatError>> + Send;
}
