#![doc = include_str!("../README.md")]

pub mod accumulator;
pub mod client;
pub(crate) mod error;
pub(crate) mod mapping;
pub mod session;
pub mod transport;

pub use accumulator::{FlushOutcome, Frame, FrameAccumulator};
pub use client::BackendClient;
pub use session::ChatSession;
pub use transport::{ChatTransport, ChunkStream};

// Re-export the shared types for convenience
pub use stresswatch_types::{ChatError, ChatRequest, Prediction, StreamEvent, TurnOutcome};
