//! Codec identities and their WebCodecs registry strings.
//!
//! Each codec carries the profile fields needed to render the `codecs`
//! parameter understood by the host decoder. The same codec exists in an
//! in-band flavor (parameter sets inside the bitstream, `avc3`/`hev1`) and
//! an out-of-band flavor (parameter sets in a descriptor, `avc1`/`hvc1`);
//! negotiation flips between the two.

use std::fmt;
use std::str::FromStr;

/// A codec string that could not be parsed.
#[derive(thiserror::Error, Debug, Clone)]
#[error("invalid codec string: {0}")]
pub struct InvalidCodec(pub String);

/// The compressed video codecs the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From)]
pub enum VideoCodec {
	H264(H264),
	H265(H265),
	AV1(AV1),
}

impl VideoCodec {
	/// The in-band flavor of this codec. AV1 is always in-band.
	pub fn to_in_band(self) -> Self {
		match self {
			Self::H264(codec) => Self::H264(H264 { in_band: true, ..codec }),
			Self::H265(codec) => Self::H265(H265 { in_band: true, ..codec }),
			Self::AV1(codec) => Self::AV1(codec),
		}
	}

	/// The out-of-band flavor, if the codec has one.
	pub fn to_out_of_band(self) -> Option<Self> {
		match self {
			Self::H264(codec) => Some(Self::H264(H264 { in_band: false, ..codec })),
			Self::H265(codec) => Some(Self::H265(H265 { in_band: false, ..codec })),
			Self::AV1(_) => None,
		}
	}

	pub fn in_band(&self) -> bool {
		match self {
			Self::H264(codec) => codec.in_band,
			Self::H265(codec) => codec.in_band,
			Self::AV1(_) => true,
		}
	}
}

impl fmt::Display for VideoCodec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::H264(codec) => codec.fmt(f),
			Self::H265(codec) => codec.fmt(f),
			Self::AV1(codec) => codec.fmt(f),
		}
	}
}

impl FromStr for VideoCodec {
	type Err = InvalidCodec;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.split('.').next() {
			Some("avc1" | "avc3") => Ok(H264::from_str(s)?.into()),
			Some("hvc1" | "hev1") => Ok(H265::from_str(s)?.into()),
			Some("av01") => Ok(AV1::from_str(s)?.into()),
			_ => Err(InvalidCodec(s.to_string())),
		}
	}
}

/// H.264/AVC, `avc3.PPCCLL` in-band or `avc1.PPCCLL` out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H264 {
	pub profile: u8,
	pub constraints: u8,
	pub level: u8,
	pub in_band: bool,
}

impl fmt::Display for H264 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tag = if self.in_band { "avc3" } else { "avc1" };
		write!(f, "{}.{:02X}{:02X}{:02X}", tag, self.profile, self.constraints, self.level)
	}
}

impl FromStr for H264 {
	type Err = InvalidCodec;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let err = || InvalidCodec(s.to_string());

		let (tag, rest) = s.split_once('.').ok_or_else(err)?;
		let in_band = match tag {
			"avc3" => true,
			"avc1" => false,
			_ => return Err(err()),
		};

		if rest.len() != 6 || !rest.is_ascii() {
			return Err(err());
		}

		let byte = |range| u8::from_str_radix(&rest[range], 16).map_err(|_| err());

		Ok(Self {
			profile: byte(0..2)?,
			constraints: byte(2..4)?,
			level: byte(4..6)?,
			in_band,
		})
	}
}

/// H.265/HEVC, `hev1.…` in-band or `hvc1.…` out-of-band.
///
/// The string form follows ISO/IEC 14496-15 Annex E: profile space and idc,
/// the compatibility flags in reverse bit order, tier and level, then the
/// constraint bytes with trailing zeros trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H265 {
	pub in_band: bool,
	pub profile_space: u8,
	pub profile_idc: u8,
	pub profile_compatibility_flags: u32,
	pub tier_flag: bool,
	pub level_idc: u8,
	pub constraint_flags: [u8; 6],
}

impl fmt::Display for H265 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tag = if self.in_band { "hev1" } else { "hvc1" };

		match self.profile_space {
			0 => write!(f, "{}.{}", tag, self.profile_idc)?,
			space => write!(f, "{}.{}{}", tag, (b'A' + space - 1) as char, self.profile_idc)?,
		}

		write!(f, ".{:X}", self.profile_compatibility_flags.reverse_bits())?;
		write!(f, ".{}{}", if self.tier_flag { 'H' } else { 'L' }, self.level_idc)?;

		let trailing = self.constraint_flags.iter().rev().take_while(|b| **b == 0).count();
		for byte in &self.constraint_flags[..6 - trailing] {
			write!(f, ".{:X}", byte)?;
		}

		Ok(())
	}
}

impl FromStr for H265 {
	type Err = InvalidCodec;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let err = || InvalidCodec(s.to_string());

		let mut parts = s.split('.');
		let in_band = match parts.next() {
			Some("hev1") => true,
			Some("hvc1") => false,
			_ => return Err(err()),
		};

		let profile = parts.next().ok_or_else(err)?;
		let (profile_space, idc) = match profile.chars().next() {
			Some(space @ 'A'..='C') => (space as u8 - b'A' + 1, &profile[1..]),
			_ => (0, profile),
		};
		let profile_idc = idc.parse().map_err(|_| err())?;

		let compat = parts.next().ok_or_else(err)?;
		let profile_compatibility_flags = u32::from_str_radix(compat, 16).map_err(|_| err())?.reverse_bits();

		let level = parts.next().ok_or_else(err)?;
		let tier_flag = match level.chars().next() {
			Some('L') => false,
			Some('H') => true,
			_ => return Err(err()),
		};
		let level_idc = level[1..].parse().map_err(|_| err())?;

		let mut constraint_flags = [0u8; 6];
		for (i, part) in parts.enumerate() {
			if i >= constraint_flags.len() {
				return Err(err());
			}
			constraint_flags[i] = u8::from_str_radix(part, 16).map_err(|_| err())?;
		}

		Ok(Self {
			in_band,
			profile_space,
			profile_idc,
			profile_compatibility_flags,
			tier_flag,
			level_idc,
			constraint_flags,
		})
	}
}

/// AV1, `av01.P.LLT.DD`. There is no out-of-band flavor and no translator;
/// the pipeline only ever feeds it as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AV1 {
	pub profile: u8,
	pub level: u8,
	pub high_tier: bool,
	pub bit_depth: u8,
}

impl fmt::Display for AV1 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"av01.{}.{:02}{}.{:02}",
			self.profile,
			self.level,
			if self.high_tier { 'H' } else { 'M' },
			self.bit_depth
		)
	}
}

impl FromStr for AV1 {
	type Err = InvalidCodec;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let err = || InvalidCodec(s.to_string());

		let mut parts = s.split('.');
		if parts.next() != Some("av01") {
			return Err(err());
		}

		let profile = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;

		let level_tier = parts.next().ok_or_else(err)?;
		if level_tier.len() < 2 || !level_tier.is_ascii() {
			return Err(err());
		}
		let (level, tier) = level_tier.split_at(level_tier.len() - 1);
		let level = level.parse().map_err(|_| err())?;
		let high_tier = match tier {
			"H" => true,
			"M" => false,
			_ => return Err(err()),
		};

		let bit_depth = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;

		Ok(Self {
			profile,
			level,
			high_tier,
			bit_depth,
		})
	}
}
