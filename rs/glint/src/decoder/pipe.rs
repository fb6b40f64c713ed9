use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::model::{DecodeUnit, EncodedUnit};
use crate::render::RenderSink;
use crate::stats::VideoStats;
use crate::translate::{self, Translate};
use crate::{Error, Result};

use super::{DecoderConfig, DecoderHost, Negotiator, StreamSetup};

/// Pipeline lifecycle. `Errored` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipeState {
	#[default]
	AwaitingConfig,
	Ready,
	Errored,
}

/// Estimated queued latency above which a keyframe is requested.
const MAX_QUEUED_MS: u64 = 200;

/// Queue depth that must also be exceeded before requesting one.
const MAX_QUEUED_UNITS: usize = 2;

/// The decode pipeline.
///
/// Negotiates a configuration with the host decoder, translates or passes
/// through access units, forwards decoded pictures to the render sink and
/// keeps the decoder's backlog in check by requesting keyframes.
pub struct VideoPipe<H: DecoderHost, S: RenderSink<H::Picture>> {
	host: H,
	sink: S,

	state: PipeState,
	setup: Option<StreamSetup>,
	config: Option<DecoderConfig>,
	translator: Option<Box<dyn Translate>>,

	// Units received before the decoder was configured, in arrival order.
	pending: VecDeque<DecodeUnit>,

	needs_keyframe: bool,
	idr_requested: bool,
	closed: bool,

	stats: VideoStats,
}

impl<H: DecoderHost, S: RenderSink<H::Picture>> VideoPipe<H, S> {
	pub fn new(host: H, sink: S) -> Self {
		Self {
			host,
			sink,
			state: PipeState::default(),
			setup: None,
			config: None,
			translator: None,
			pending: VecDeque::new(),
			needs_keyframe: true,
			idr_requested: false,
			closed: false,
			stats: VideoStats::default(),
		}
	}

	pub fn state(&self) -> PipeState {
		self.state
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn sink(&self) -> &S {
		&self.sink
	}

	/// Counters for the stats overlay; snapshotting resets the interval.
	pub fn stats(&mut self) -> &mut VideoStats {
		&mut self.stats
	}

	/// Negotiate a configuration and configure the host decoder.
	///
	/// The in-band flavor of the codec is tried first. If the host rejects
	/// every candidate, the out-of-band flavor is tried with a translator
	/// doing the reframing in software. Units submitted before this
	/// resolves are flushed to the decoder in arrival order.
	pub async fn setup(&mut self, setup: StreamSetup) -> Result<()> {
		let in_band = setup.codec.to_in_band();
		let negotiated = match Negotiator::new(&self.host).negotiate(&setup, in_band).await {
			Ok(negotiated) => negotiated,
			Err(err) => return Err(self.fail(err)),
		};

		let (config, translator) = match negotiated {
			Some(config) => (config, None),
			None => match self.fallback(&setup).await {
				Ok(fallback) => fallback,
				Err(err) => return Err(self.fail(err)),
			},
		};

		if let Err(err) = self.host.configure(&config) {
			return Err(self.fail(err));
		}

		debug!(codec = %config.codec, translated = translator.is_some(), "video decoder configured");

		self.translator = translator;
		self.config = Some(config);
		self.setup = Some(setup);
		self.state = PipeState::Ready;
		self.needs_keyframe = true;

		while let Some(unit) = self.pending.pop_front() {
			if let Err(err) = self.process(&unit) {
				return Err(self.fail(err));
			}
		}

		Ok(())
	}

	/// The out-of-band flavor with software reframing, for platforms that
	/// cannot take Annex-B.
	async fn fallback(&self, setup: &StreamSetup) -> Result<(DecoderConfig, Option<Box<dyn Translate>>)> {
		let codec = setup.codec.to_out_of_band().ok_or(Error::UnsupportedCodec(setup.codec))?;
		let translator = translate::for_codec(codec).ok_or(Error::UnsupportedCodec(setup.codec))?;

		match Negotiator::new(&self.host).negotiate(setup, codec).await? {
			Some(config) => Ok((config, Some(translator))),
			None => Err(Error::UnsupportedCodec(setup.codec)),
		}
	}

	fn fail(&mut self, err: Error) -> Error {
		warn!(%err, "video pipeline failed");
		self.state = PipeState::Errored;
		err
	}

	/// Submit one access unit. Buffers while configuration is pending and
	/// drops (with a log) once the pipeline has failed or been cleaned up.
	pub fn submit(&mut self, unit: DecodeUnit) {
		if self.closed {
			debug!("dropping unit, pipeline closed");
			return;
		}

		match self.state {
			PipeState::Errored => {
				debug!("dropping unit, pipeline errored");
			}
			PipeState::AwaitingConfig => {
				self.pending.push_back(unit);
			}
			PipeState::Ready => {
				if let Err(err) = self.process(&unit) {
					self.fail(err);
				}
			}
		}
	}

	fn process(&mut self, unit: &DecodeUnit) -> Result<()> {
		self.stats.submitted();

		if self.translator.is_some() && self.config.is_none() {
			// Reachable only through misuse; fail loudly rather than feed a
			// decoder that was never configured.
			return Err(Error::MissingContext);
		}

		let translated = match self.translator.as_mut() {
			Some(translator) => translator.translate(unit)?,
			None => return self.passthrough(unit),
		};

		if translated.reconfigure {
			self.reconfigure()?;
		}

		let Some(encoded) = translated.unit else {
			if !translated.reconfigure {
				self.stats.dropped();
			}
			return Ok(());
		};

		if self.needs_keyframe && !encoded.is_key() {
			self.stats.dropped();
			debug!("dropping delta unit, waiting for a keyframe");
			return Ok(());
		}

		self.decode(&encoded)
	}

	/// Swap in a fresh configuration carrying the translator's descriptor.
	fn reconfigure(&mut self) -> Result<()> {
		let description = self.translator.as_ref().and_then(|t| t.description());
		let config = self.config.as_ref().ok_or(Error::MissingContext)?;
		let config = DecoderConfig {
			description,
			..config.clone()
		};

		debug!(codec = %config.codec, "reconfiguring decoder with a fresh descriptor");

		self.host.reset()?;
		self.host.configure(&config)?;
		self.config = Some(config);

		// The descriptor was rebuilt from in-stream parameter sets, so a
		// fresh IDR is arriving with it.
		self.idr_requested = false;

		Ok(())
	}

	fn passthrough(&mut self, unit: &DecodeUnit) -> Result<()> {
		if self.needs_keyframe && !unit.is_key() {
			self.stats.dropped();
			debug!("dropping delta unit, waiting for a keyframe");
			return Ok(());
		}

		self.decode(&EncodedUnit::passthrough(unit))
	}

	fn decode(&mut self, unit: &EncodedUnit) -> Result<()> {
		if unit.is_key() {
			self.needs_keyframe = false;
			self.idr_requested = false;
		}

		self.host.decode(unit)?;
		self.stats.decoded();

		Ok(())
	}

	/// Deliver a decoded picture from the host decoder's output callback.
	/// Ownership transfers to the sink.
	pub fn on_output(&mut self, picture: H::Picture) {
		if self.state == PipeState::Errored {
			return;
		}

		self.stats.presented();
		self.sink.present(picture);
	}

	/// Record a fault reported by the host decoder. Terminal; the pipe does
	/// not recreate the decoder.
	pub fn on_error(&mut self, message: &str) {
		self.fail(Error::Decoder(message.to_string()));
	}

	/// Estimate the decoder's queued latency and reset it when it has
	/// fallen too far behind. Returns true when the caller should request
	/// an IDR from the remote encoder; at most once per reset.
	pub fn poll_request_idr(&mut self) -> bool {
		if self.state != PipeState::Ready {
			return false;
		}
		let Some(setup) = self.setup else {
			return false;
		};

		let depth = self.host.queue_depth();
		let queued_ms = depth as u64 * 1000 / u64::from(setup.fps.max(1));
		self.stats.queued(queued_ms);

		if queued_ms <= MAX_QUEUED_MS || depth <= MAX_QUEUED_UNITS || self.idr_requested {
			return false;
		}

		warn!(depth, queued_ms, "decoder backlog, requesting a keyframe");

		if let Err(err) = self.host.reset() {
			self.fail(err);
			return false;
		}

		self.needs_keyframe = true;
		self.idr_requested = true;
		self.stats.keyframe_requested();

		true
	}

	/// Release the host decoder and any buffered units. Idempotent.
	pub fn cleanup(&mut self) {
		if self.closed {
			return;
		}

		self.closed = true;
		self.pending.clear();
		self.host.close();
	}
}

impl<H: DecoderHost, S: RenderSink<H::Picture>> Drop for VideoPipe<H, S> {
	fn drop(&mut self) {
		self.cleanup();
	}
}

#[cfg(test)]
mod tests {
	use bytes::Bytes;
	use futures::FutureExt;

	use super::super::fake::{CollectSink, FakeHost};
	use super::*;
	use crate::codec::VideoCodec;
	use crate::model::{Timestamp, UnitKind};

	const SPS: &[u8] = &[0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9];
	const PPS: &[u8] = &[0x68, 0xEB, 0xE3, 0xCB];
	const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x00, 0x33, 0xFF];
	const DELTA: &[u8] = &[0x41, 0x9A, 0x24, 0x6C];

	fn annexb(nals: &[&[u8]]) -> Bytes {
		let mut buf = Vec::new();
		for nal in nals {
			buf.extend_from_slice(&[0, 0, 0, 1]);
			buf.extend_from_slice(nal);
		}
		buf.into()
	}

	fn unit(kind: UnitKind, micros: u64, payload: Bytes) -> DecodeUnit {
		DecodeUnit {
			kind,
			timestamp: Timestamp::from_micros(micros),
			duration: 16_667,
			payload,
		}
	}

	fn h264_setup() -> StreamSetup {
		StreamSetup {
			codec: "avc3.64001F".parse().unwrap(),
			width: 1280,
			height: 720,
			fps: 30,
		}
	}

	fn pipe(host: FakeHost) -> VideoPipe<FakeHost, CollectSink> {
		VideoPipe::new(host, CollectSink::default())
	}

	#[tokio::test]
	async fn test_buffered_units_flush_in_order() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));

		pipe.submit(unit(UnitKind::Key, 1, annexb(&[SPS, PPS, IDR])));
		pipe.submit(unit(UnitKind::Delta, 2, annexb(&[DELTA])));
		pipe.submit(unit(UnitKind::Delta, 3, annexb(&[DELTA])));
		assert!(pipe.host().decoded.is_empty());

		pipe.setup(h264_setup()).await.unwrap();
		assert_eq!(pipe.state(), PipeState::Ready);

		let order: Vec<u64> = pipe.host().decoded.iter().map(|u| u.timestamp.as_micros()).collect();
		assert_eq!(order, vec![1, 2, 3]);
	}

	#[test]
	fn test_setup_only_suspends_on_capability_queries() {
		// With a host that answers immediately, setup never yields.
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		pipe.setup(h264_setup())
			.now_or_never()
			.expect("setup would have blocked")
			.unwrap();
		assert_eq!(pipe.state(), PipeState::Ready);
	}

	#[tokio::test]
	async fn test_in_band_path_passes_through() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		pipe.setup(h264_setup()).await.unwrap();

		// The first candidate is the in-band flavor with hardware preferred.
		let config = &pipe.host().configured[0];
		assert!(config.codec.in_band());
		assert!(config.description.is_none());

		let payload = annexb(&[IDR]);
		pipe.submit(unit(UnitKind::Key, 1, payload.clone()));

		// No translation: the Annex-B bytes reach the decoder untouched.
		assert_eq!(pipe.host().decoded[0].payload, payload);
	}

	#[tokio::test]
	async fn test_passthrough_gates_on_keyframe() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		pipe.setup(h264_setup()).await.unwrap();

		pipe.submit(unit(UnitKind::Delta, 1, annexb(&[DELTA])));
		assert!(pipe.host().decoded.is_empty());

		pipe.submit(unit(UnitKind::Key, 2, annexb(&[IDR])));
		pipe.submit(unit(UnitKind::Delta, 3, annexb(&[DELTA])));
		assert_eq!(pipe.host().decoded.len(), 2);
	}

	#[tokio::test]
	async fn test_out_of_band_fallback_translates() {
		let host = FakeHost::accepting(|config| !config.codec.in_band());
		let mut pipe = pipe(host);
		pipe.setup(h264_setup()).await.unwrap();

		// Three in-band candidates rejected, then the out-of-band flavor.
		assert_eq!(pipe.host().queries.borrow().len(), 4);
		assert!(!pipe.host().configured[0].codec.in_band());
		assert!(pipe.host().configured[0].description.is_none());

		pipe.submit(unit(UnitKind::Key, 1, annexb(&[SPS, PPS, IDR])));

		// The key unit rebuilt the descriptor: reset, reconfigure, decode.
		assert_eq!(pipe.host().resets, 1);
		assert_eq!(pipe.host().configured.len(), 2);

		let description = pipe.host().configured[1].description.as_ref().unwrap();
		assert_eq!(&description[1..4], &SPS[1..4]);

		let decoded = &pipe.host().decoded;
		assert_eq!(decoded.len(), 1);
		assert_eq!(&decoded[0].payload[..4], &(IDR.len() as u32).to_be_bytes());
		assert_eq!(&decoded[0].payload[4..], IDR);
	}

	#[tokio::test]
	async fn test_unsupported_codec_is_terminal() {
		let mut pipe = pipe(FakeHost::accepting(|_| false));

		let err = pipe.setup(h264_setup()).await.unwrap_err();
		assert!(matches!(err, Error::UnsupportedCodec(_)));
		assert_eq!(pipe.state(), PipeState::Errored);

		// Both flavors were probed, three candidates each.
		assert_eq!(pipe.host().queries.borrow().len(), 6);

		// Submitting afterwards is a logged no-op.
		pipe.submit(unit(UnitKind::Key, 1, annexb(&[IDR])));
		assert!(pipe.host().decoded.is_empty());
	}

	#[tokio::test]
	async fn test_av1_has_no_fallback() {
		let mut pipe = pipe(FakeHost::accepting(|_| false));
		let setup = StreamSetup {
			codec: "av01.0.04M.08".parse().unwrap(),
			width: 1280,
			height: 720,
			fps: 30,
		};

		let err = pipe.setup(setup).await.unwrap_err();
		assert!(matches!(err, Error::UnsupportedCodec(VideoCodec::AV1(_))));
		assert_eq!(pipe.state(), PipeState::Errored);

		// Only the in-band candidates were probed.
		assert_eq!(pipe.host().queries.borrow().len(), 3);
	}

	#[tokio::test]
	async fn test_poll_request_idr_thresholds() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		let depth = pipe.host().depth.clone();
		pipe.setup(h264_setup()).await.unwrap();

		// 5 units at 30 fps is roughly 166ms of backlog: fine.
		depth.set(5);
		assert!(!pipe.poll_request_idr());

		// 8 units is roughly 266ms: request a keyframe, exactly once.
		depth.set(8);
		assert!(pipe.poll_request_idr());
		assert_eq!(pipe.host().resets, 1);

		depth.set(8);
		assert!(!pipe.poll_request_idr());

		// The gate reopens once a key unit makes it through.
		pipe.submit(unit(UnitKind::Key, 1, annexb(&[IDR])));
		depth.set(8);
		assert!(pipe.poll_request_idr());
	}

	#[tokio::test]
	async fn test_keyframe_gate_after_backlog_reset() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		let depth = pipe.host().depth.clone();
		pipe.setup(h264_setup()).await.unwrap();

		pipe.submit(unit(UnitKind::Key, 1, annexb(&[IDR])));

		depth.set(8);
		assert!(pipe.poll_request_idr());

		// Deltas are dropped until the requested keyframe arrives.
		pipe.submit(unit(UnitKind::Delta, 2, annexb(&[DELTA])));
		assert_eq!(pipe.host().decoded.len(), 1);

		pipe.submit(unit(UnitKind::Key, 3, annexb(&[IDR])));
		assert_eq!(pipe.host().decoded.len(), 2);
	}

	#[tokio::test]
	async fn test_decoder_error_is_terminal() {
		let mut host = FakeHost::accepting(|_| true);
		host.fail_decode = true;
		let mut pipe = pipe(host);
		pipe.setup(h264_setup()).await.unwrap();

		pipe.submit(unit(UnitKind::Key, 1, annexb(&[IDR])));
		assert_eq!(pipe.state(), PipeState::Errored);
	}

	#[tokio::test]
	async fn test_reported_decoder_fault_is_terminal() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		pipe.setup(h264_setup()).await.unwrap();

		pipe.on_error("hardware fell over");
		assert_eq!(pipe.state(), PipeState::Errored);

		pipe.on_output(7);
		assert!(pipe.sink().pictures.is_empty());
	}

	#[tokio::test]
	async fn test_output_flows_to_sink() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		pipe.setup(h264_setup()).await.unwrap();

		pipe.on_output(1);
		pipe.on_output(2);
		assert_eq!(pipe.sink().pictures, vec![1, 2]);
	}

	#[tokio::test]
	async fn test_cleanup_is_idempotent() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		pipe.setup(h264_setup()).await.unwrap();

		pipe.cleanup();
		pipe.cleanup();
		assert_eq!(pipe.host().closed, 1);

		pipe.submit(unit(UnitKind::Key, 1, annexb(&[IDR])));
		assert!(pipe.host().decoded.is_empty());
	}

	#[tokio::test]
	async fn test_h265_end_to_end() {
		const VPS: &[u8] = &[0x40, 0x01, 0x0C, 0x01, 0xFF, 0xFF];
		const HSPS: &[u8] = &[
			0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x00, 0x90, 0x00, 0x00, 0x00, 0x00, 0x00, 0x5D, 0xA0,
		];
		const HPPS: &[u8] = &[0x44, 0x01, 0xC1, 0x72, 0xB4];
		const HIDR: &[u8] = &[0x26, 0x01, 0xAF, 0x08, 0x42];

		let host = FakeHost::accepting(|config| !config.codec.in_band());
		let mut pipe = pipe(host);
		let setup = StreamSetup {
			codec: "hev1.1.6.L93.B0".parse().unwrap(),
			width: 1920,
			height: 1080,
			fps: 60,
		};
		pipe.setup(setup).await.unwrap();

		assert_eq!(pipe.host().configured[0].codec.to_string(), "hvc1.1.6.L93.B0");

		pipe.submit(unit(UnitKind::Key, 1, annexb(&[VPS, HSPS, HPPS, HIDR])));

		let description = pipe.host().configured[1].description.as_ref().unwrap();
		assert_eq!(description[1], HSPS[3]);

		let decoded = &pipe.host().decoded;
		assert_eq!(decoded.len(), 1);
		assert_eq!(&decoded[0].payload[4..], HIDR);
	}

	#[tokio::test]
	async fn test_stats_track_the_interval() {
		let mut pipe = pipe(FakeHost::accepting(|_| true));
		pipe.setup(h264_setup()).await.unwrap();

		pipe.submit(unit(UnitKind::Delta, 1, annexb(&[DELTA])));
		pipe.submit(unit(UnitKind::Key, 2, annexb(&[IDR])));
		pipe.on_output(9);

		let snapshot = pipe.stats().snapshot();
		assert_eq!(snapshot.submitted, 2);
		assert_eq!(snapshot.dropped, 1);
		assert_eq!(snapshot.decoded, 1);
		assert_eq!(snapshot.presented, 1);

		// The next interval starts clean.
		let snapshot = pipe.stats().snapshot();
		assert_eq!(snapshot.submitted, 0);
	}
}
