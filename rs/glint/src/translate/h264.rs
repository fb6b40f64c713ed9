use bytes::Bytes;
use num_enum::TryFromPrimitive;
use tracing::warn;

use crate::annexb::NalUnits;
use crate::codec;
use crate::coding::Builder;
use crate::model::{DecodeUnit, EncodedUnit, UnitKind};
use crate::{Error, Result};

use super::{Translate, Translated};

/// ITU-T H.264 Table 7-1, the subset the translator branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum NalType {
	Idr = 5,
	Sps = 7,
	Pps = 8,
}

fn nal_type(nal: &[u8]) -> Option<NalType> {
	let header = *nal.first()?;
	NalType::try_from(header & 0x1F).ok()
}

/// H.264 stream translator producing avcC descriptors.
pub struct H264Translate {
	codec: codec::H264,

	// Parameter sets seen since the last descriptor build.
	sps: Option<Bytes>,
	pps: Option<Bytes>,

	description: Option<Bytes>,

	// Reassembly buffer, reused across units. Only grows.
	buf: Builder,
}

impl H264Translate {
	pub fn new(codec: codec::H264) -> Self {
		Self {
			codec,
			sps: None,
			pps: None,
			description: None,
			buf: Builder::new(),
		}
	}

	/// Fold a complete SPS/PPS pair into a fresh descriptor, clearing the
	/// cache. A later pair replaces the descriptor again; that is how
	/// mid-stream profile or resolution changes flow through.
	fn rebuild_description(&mut self) -> bool {
		let (Some(sps), Some(pps)) = (self.sps.clone(), self.pps.clone()) else {
			return false;
		};

		self.sps = None;
		self.pps = None;

		match build_avcc(&sps, &pps) {
			Ok(description) => {
				self.description = Some(description);
				true
			}
			Err(err) => {
				warn!(%err, "discarding unusable H.264 parameter sets");
				false
			}
		}
	}
}

impl Translate for H264Translate {
	fn codec(&self) -> codec::VideoCodec {
		self.codec.into()
	}

	fn translate(&mut self, unit: &DecodeUnit) -> Result<Translated> {
		if !unit.is_key() && self.description.is_none() {
			// The decoder has no configuration yet; a delta is useless to it.
			return Ok(Translated::default());
		}

		// First pass: harvest parameter sets and size the output exactly,
		// at 4 length bytes per included NAL.
		let mut total = 0;
		let mut saw_idr = false;

		for nal in NalUnits::new(&unit.payload) {
			match nal_type(nal) {
				Some(NalType::Sps) => self.sps = Some(Bytes::copy_from_slice(nal)),
				Some(NalType::Pps) => self.pps = Some(Bytes::copy_from_slice(nal)),
				Some(NalType::Idr) => {
					saw_idr = true;
					total += 4 + nal.len();
				}
				None => total += 4 + nal.len(),
			}
		}

		let reconfigure = self.rebuild_description();

		if self.description.is_none() {
			// A key unit without its parameter sets. The stream heals once a
			// conformant key unit arrives, so keep going.
			warn!("H.264 key unit arrived without SPS/PPS, no descriptor yet");
			return Ok(Translated::default());
		}

		if total == 0 {
			return Ok(Translated { reconfigure, unit: None });
		}

		// Second pass: length-prefix everything that is not a parameter set.
		self.buf.reserve(total);
		for nal in NalUnits::new(&unit.payload) {
			match nal_type(nal) {
				Some(NalType::Sps | NalType::Pps) => {}
				_ => {
					self.buf.put_u32_be(nal.len() as u32);
					self.buf.put_slice(nal);
				}
			}
		}

		let unit = EncodedUnit {
			// An IDR slice marks the unit as key even when the transport
			// mislabeled it.
			kind: if saw_idr { UnitKind::Key } else { unit.kind },
			timestamp: unit.timestamp,
			duration: unit.duration,
			payload: self.buf.split(),
		};

		Ok(Translated {
			reconfigure,
			unit: Some(unit),
		})
	}

	fn description(&self) -> Option<Bytes> {
		self.description.clone()
	}
}

/// avcC with exactly one SPS and one PPS. The profile, compatibility and
/// level bytes are taken verbatim from the SPS; NAL lengths are 4 bytes.
fn build_avcc(sps: &[u8], pps: &[u8]) -> Result<Bytes> {
	if sps.len() < 4 {
		return Err(Error::TruncatedNal);
	}

	let mut builder = Builder::with_capacity(11 + sps.len() + pps.len());
	builder.put_u8(1); // configurationVersion
	builder.put_u8(sps[1]); // AVCProfileIndication
	builder.put_u8(sps[2]); // profile_compatibility
	builder.put_u8(sps[3]); // AVCLevelIndication
	builder.put_u8(0xFF); // reserved | lengthSizeMinusOne = 3
	builder.put_u8(0xE1); // reserved | numOfSequenceParameterSets = 1
	builder.put_u16_be(sps.len() as u16);
	builder.put_slice(sps);
	builder.put_u8(1); // numOfPictureParameterSets
	builder.put_u16_be(pps.len() as u16);
	builder.put_slice(pps);

	Ok(builder.freeze())
}
