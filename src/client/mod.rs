//! Language-model client subsystem.
//!
//! - **Types**: OpenAI-compatible request and fragment shapes
//! - **Transport**: the [`ModelClient`] seam and its HTTP implementation
//! - **SSE**: decoding of the streamed response body
//! - **Accumulator**: merging fragments into one completion with per-channel
//!   finish events
//! - **Cache**: one client per `(provider, model)` for the life of a run

mod accumulator;
mod cache;
mod model_ref;
mod sse;
mod transport;
mod types;

#[cfg(test)]
pub mod testing;

pub use accumulator::{FinishEvent, collect};
pub use cache::ClientCache;
pub use model_ref::ModelRef;
pub use transport::{ClientOptions, TransportError};
#[cfg(test)]
pub use transport::ModelClient;
pub use types::{ChatMessage, Role};
