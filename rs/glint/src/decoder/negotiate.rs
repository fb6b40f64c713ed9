use tracing::debug;

use crate::Result;
use crate::codec::VideoCodec;

use super::{DecoderConfig, DecoderHost, HardwarePreference, StreamSetup};

/// Probes candidate configurations against the host's capability query in a
/// fixed priority order, keeping the first accepted one.
pub struct Negotiator<'a, H: DecoderHost> {
	host: &'a H,
}

impl<'a, H: DecoderHost> Negotiator<'a, H> {
	pub fn new(host: &'a H) -> Self {
		Self { host }
	}

	/// The attempt order for one codec flavor: hardware preferred, then no
	/// preference, then no preference once more. The repeat covers platforms
	/// whose capability answer is order-sensitive.
	fn candidates(setup: &StreamSetup, codec: VideoCodec) -> [DecoderConfig; 3] {
		let base = DecoderConfig {
			codec,
			description: None,
			coded_width: Some(setup.width),
			coded_height: Some(setup.height),
			hardware_acceleration: HardwarePreference::NoPreference,
			optimize_for_latency: true,
		};

		[
			DecoderConfig {
				hardware_acceleration: HardwarePreference::Prefer,
				..base.clone()
			},
			base.clone(),
			base,
		]
	}

	/// Find an accepted configuration for this codec flavor, or `None` when
	/// the host rejects every candidate.
	pub async fn negotiate(&self, setup: &StreamSetup, codec: VideoCodec) -> Result<Option<DecoderConfig>> {
		for config in Self::candidates(setup, codec) {
			if self.host.is_config_supported(&config).await? {
				debug!(codec = %config.codec, hardware = ?config.hardware_acceleration, "decoder configuration accepted");
				return Ok(Some(config));
			}
		}

		debug!(%codec, "no decoder configuration accepted");
		Ok(None)
	}
}
