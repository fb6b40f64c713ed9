//! Per-codec stream translation.
//!
//! When negotiation lands on an out-of-band configuration, the wire's
//! Annex-B access units have to be rewritten into length-prefixed form and
//! their parameter sets folded into a codec descriptor (avcC or hvcC) before
//! the host decoder will touch them. The translators here do that rewrite,
//! one access unit at a time.

mod h264;
mod h265;

pub use h264::*;
pub use h265::*;

use bytes::Bytes;

use crate::Result;
use crate::codec::VideoCodec;
use crate::model::{DecodeUnit, EncodedUnit};

/// What a translator produced for one decode unit.
#[derive(Debug, Default)]
pub struct Translated {
	/// The host decoder must be reset and reconfigured with the fresh
	/// descriptor before `unit` is fed.
	pub reconfigure: bool,

	/// The reassembled access unit. Absent when the unit was dropped or
	/// contained nothing but parameter sets.
	pub unit: Option<EncodedUnit>,
}

/// Rewrites access units for a decoder that cannot take Annex-B.
///
/// A translator is re-entered once per decode unit and accumulates the
/// parameter sets it has seen across calls. A descriptor is only (re)built
/// once every parameter-set kind the codec requires has been observed since
/// the last build.
pub trait Translate {
	/// The codec this translator understands, out-of-band flavor.
	fn codec(&self) -> VideoCodec;

	/// Translate one access unit. Delta units are dropped without side
	/// effects until a descriptor has been established.
	fn translate(&mut self, unit: &DecodeUnit) -> Result<Translated>;

	/// The most recently built descriptor. Stays available after the
	/// parameter-set cache is consumed so a decoder reconfigure always has
	/// a complete one to hand over.
	fn description(&self) -> Option<Bytes>;
}

/// Select the translator for a codec. AV1 has none; its streams are only
/// ever fed in-band.
pub fn for_codec(codec: VideoCodec) -> Option<Box<dyn Translate>> {
	match codec {
		VideoCodec::H264(codec) => Some(Box::new(H264Translate::new(codec))),
		VideoCodec::H265(codec) => Some(Box::new(H265Translate::new(codec))),
		VideoCodec::AV1(_) => None,
	}
}
