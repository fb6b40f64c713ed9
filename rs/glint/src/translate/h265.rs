use bytes::Bytes;
use num_enum::TryFromPrimitive;
use tracing::warn;

use crate::annexb::NalUnits;
use crate::codec;
use crate::coding::Builder;
use crate::model::{DecodeUnit, EncodedUnit, UnitKind};
use crate::{Error, Result};

use super::{Translate, Translated};

/// ITU-T H.265 Table 7-1, the subset the translator branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum NalType {
	BlaWLp = 16,
	BlaWRadl = 17,
	BlaNLp = 18,
	IdrWRadl = 19,
	IdrNLp = 20,
	Cra = 21,
	Vps = 32,
	Sps = 33,
	Pps = 34,
}

impl NalType {
	/// Random access points all reset decoder state like an IDR does.
	fn is_key(self) -> bool {
		matches!(
			self,
			Self::BlaWLp | Self::BlaWRadl | Self::BlaNLp | Self::IdrWRadl | Self::IdrNLp | Self::Cra
		)
	}
}

// The type field sits in bits 1..7 of the first header byte.
fn nal_type(nal: &[u8]) -> Option<NalType> {
	let header = *nal.first()?;
	NalType::try_from((header >> 1) & 0x3F).ok()
}

/// H.265 stream translator producing hvcC descriptors.
pub struct H265Translate {
	codec: codec::H265,

	// Parameter sets seen since the last descriptor build.
	vps: Option<Bytes>,
	sps: Option<Bytes>,
	pps: Option<Bytes>,

	description: Option<Bytes>,

	// Reassembly buffer, reused across units. Only grows.
	buf: Builder,
}

impl H265Translate {
	pub fn new(codec: codec::H265) -> Self {
		Self {
			codec,
			vps: None,
			sps: None,
			pps: None,
			description: None,
			buf: Builder::new(),
		}
	}

	/// Fold a complete VPS/SPS/PPS triple into a fresh descriptor, clearing
	/// the cache.
	fn rebuild_description(&mut self) -> bool {
		let (Some(vps), Some(sps), Some(pps)) = (self.vps.clone(), self.sps.clone(), self.pps.clone()) else {
			return false;
		};

		self.vps = None;
		self.sps = None;
		self.pps = None;

		match build_hvcc(&vps, &sps, &pps) {
			Ok(description) => {
				self.description = Some(description);
				true
			}
			Err(err) => {
				warn!(%err, "discarding unusable H.265 parameter sets");
				false
			}
		}
	}
}

impl Translate for H265Translate {
	fn codec(&self) -> codec::VideoCodec {
		self.codec.into()
	}

	fn translate(&mut self, unit: &DecodeUnit) -> Result<Translated> {
		if !unit.is_key() && self.description.is_none() {
			return Ok(Translated::default());
		}

		let mut total = 0;
		let mut saw_idr = false;

		for nal in NalUnits::new(&unit.payload) {
			match nal_type(nal) {
				Some(NalType::Vps) => self.vps = Some(Bytes::copy_from_slice(nal)),
				Some(NalType::Sps) => self.sps = Some(Bytes::copy_from_slice(nal)),
				Some(NalType::Pps) => self.pps = Some(Bytes::copy_from_slice(nal)),
				kind => {
					if kind.is_some_and(NalType::is_key) {
						saw_idr = true;
					}
					total += 4 + nal.len();
				}
			}
		}

		let reconfigure = self.rebuild_description();

		if self.description.is_none() {
			warn!("H.265 key unit arrived without VPS/SPS/PPS, no descriptor yet");
			return Ok(Translated::default());
		}

		if total == 0 {
			return Ok(Translated { reconfigure, unit: None });
		}

		self.buf.reserve(total);
		for nal in NalUnits::new(&unit.payload) {
			match nal_type(nal) {
				Some(NalType::Vps | NalType::Sps | NalType::Pps) => {}
				_ => {
					self.buf.put_u32_be(nal.len() as u32);
					self.buf.put_slice(nal);
				}
			}
		}

		let unit = EncodedUnit {
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

/// A minimal hvcC that the consuming decoder's parser accepts.
///
/// The profile, compatibility, constraint and level fields are copied from
/// fixed offsets into the SPS: profile_tier_level is assumed to sit right
/// after the 2-byte NAL header and the vps-id/max-sub-layers byte. This is
/// not a bitstream parse, and the remaining fields get conservative
/// defaults (4:2:0 chroma, 8-bit, frame rate unstated). Downstream decoders
/// were validated against exactly this layout; keep it byte-for-byte.
fn build_hvcc(vps: &[u8], sps: &[u8], pps: &[u8]) -> Result<Bytes> {
	if sps.len() < 15 {
		return Err(Error::TruncatedNal);
	}

	let mut builder = Builder::with_capacity(38 + vps.len() + sps.len() + pps.len());
	builder.put_u8(1); // configurationVersion
	builder.put_u8(sps[3]); // general_profile_space/tier_flag/profile_idc
	builder.put_slice(&sps[4..8]); // general_profile_compatibility_flags
	builder.put_slice(&sps[8..14]); // general_constraint_indicator_flags
	builder.put_u8(sps[14]); // general_level_idc
	builder.put_u16_be(0xF000); // reserved | min_spatial_segmentation_idc = 0
	builder.put_u8(0xFC); // reserved | parallelismType = 0
	builder.put_u8(0xFD); // reserved | chromaFormat = 4:2:0
	builder.put_u8(0xF8); // reserved | bitDepthLumaMinus8 = 0
	builder.put_u8(0xF8); // reserved | bitDepthChromaMinus8 = 0
	builder.put_u16_be(0); // avgFrameRate unstated
	builder.put_u8(0x0F); // numTemporalLayers = 1, temporalIdNested, lengthSizeMinusOne = 3
	builder.put_u8(3); // numOfArrays

	for (kind, nal) in [(NalType::Vps, vps), (NalType::Sps, sps), (NalType::Pps, pps)] {
		builder.put_u8(kind as u8); // array_completeness = 0
		builder.put_u16_be(1); // numNalus
		builder.put_u16_be(nal.len() as u16);
		builder.put_slice(nal);
	}

	Ok(builder.freeze())
}
