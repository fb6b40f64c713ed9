//! # glint: low-latency video decode for a remote game-streaming viewer
//!
//! `glint` sits between a transport delivering compressed access units and a
//! platform decoder that turns them into pictures. It owns the awkward middle:
//!
//! - **Negotiation**: probing candidate decoder configurations against the
//!   host's capability query until one sticks.
//! - **Translation**: when the host wants length-prefixed NAL units but the
//!   wire carries Annex-B, rewriting the byte stream on the fly while
//!   harvesting parameter sets into an out-of-band descriptor.
//! - **Backpressure**: watching the decoder's queue depth and requesting a
//!   fresh keyframe before latency runs away.
//!
//! The transport, the decoder itself and the renderer are all external
//! collaborators; see [`decoder::DecoderHost`] and [`render::RenderSink`].
//!
mod error;

pub mod annexb;
pub mod codec;
pub mod coding;
pub mod decoder;
pub mod model;
pub mod render;
pub mod stats;
pub mod translate;

pub use error::*;
pub use model::*;
