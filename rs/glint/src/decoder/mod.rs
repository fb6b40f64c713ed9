//! The decoder-facing half of the pipeline: the injected host decoder
//! boundary, configuration negotiation and the pipe orchestrating both.

mod negotiate;
mod pipe;

#[cfg(test)]
mod fake;

pub use negotiate::*;
pub use pipe::*;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, hex::Hex};

use crate::Result;
use crate::codec::VideoCodec;
use crate::model::EncodedUnit;

/// Whether negotiation should insist on a hardware decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HardwarePreference {
	#[serde(rename = "prefer-hardware")]
	Prefer,

	#[default]
	#[serde(rename = "no-preference")]
	NoPreference,
}

/// A decoder configuration, shaped like a WebCodecs `VideoDecoderConfig`.
///
/// Owned by the pipe once accepted and replaced wholesale on
/// reconfiguration; never mutated while the host decoder holds it.
#[serde_with::serde_as]
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DecoderConfig {
	// The codec, see the registry for details:
	// https://w3c.github.io/webcodecs/codec_registry.html
	#[serde_as(as = "DisplayFromStr")]
	pub codec: VideoCodec,

	// The out-of-band descriptor (avcC/hvcC) once parameter sets are known.
	#[serde(default)]
	#[serde_as(as = "Option<Hex>")]
	pub description: Option<Bytes>,

	#[serde(default)]
	pub coded_width: Option<u32>,

	#[serde(default)]
	pub coded_height: Option<u32>,

	pub hardware_acceleration: HardwarePreference,

	pub optimize_for_latency: bool,
}

/// Stream parameters handed to [`VideoPipe::setup`] by the transport.
#[serde_with::serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamSetup {
	#[serde_as(as = "DisplayFromStr")]
	pub codec: VideoCodec,

	pub width: u32,
	pub height: u32,
	pub fps: u32,
}

/// The host platform's video decoder.
///
/// Injected as a collaborator so negotiation and the pipe can be exercised
/// against a fake. The capability query is authoritative and
/// side-effect-free; everything else mutates decoder state. Decoded
/// pictures come back through the host's own output callback, which the
/// integration layer routes to [`VideoPipe::on_output`].
#[allow(async_fn_in_trait)]
pub trait DecoderHost {
	/// The host's decoded picture handle.
	type Picture;

	/// Whether the host can decode with this configuration.
	async fn is_config_supported(&self, config: &DecoderConfig) -> Result<bool>;

	fn configure(&mut self, config: &DecoderConfig) -> Result<()>;

	fn decode(&mut self, unit: &EncodedUnit) -> Result<()>;

	/// Drop all queued work, returning to the configured state.
	fn reset(&mut self) -> Result<()>;

	fn close(&mut self);

	/// Number of submitted units not yet output.
	fn queue_depth(&self) -> usize;
}
