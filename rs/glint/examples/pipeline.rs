// cargo run --example pipeline
//
// Drives the decode pipeline end to end against a scripted host decoder.
// The host refuses Annex-B, so negotiation falls back to the out-of-band
// flavor and a translator rewrites the stream: the first access unit
// rebuilds the avcC descriptor and only the IDR slice reaches the decoder.

use bytes::Bytes;
use glint::decoder::{DecoderConfig, DecoderHost, StreamSetup, VideoPipe};
use glint::render::RenderSink;
use glint::{DecodeUnit, EncodedUnit, Result, Timestamp, UnitKind};

struct PrintHost {
	depth: usize,
}

impl DecoderHost for PrintHost {
	type Picture = Vec<u8>;

	async fn is_config_supported(&self, config: &DecoderConfig) -> Result<bool> {
		// This platform cannot take Annex-B directly.
		Ok(!config.codec.in_band())
	}

	fn configure(&mut self, config: &DecoderConfig) -> Result<()> {
		let description = config.description.as_ref().map(Bytes::len);
		println!("configure {} description={description:?}", config.codec);
		Ok(())
	}

	fn decode(&mut self, unit: &EncodedUnit) -> Result<()> {
		self.depth += 1;
		println!("decode {:?} at {} ({} bytes)", unit.kind, unit.timestamp, unit.payload.len());
		Ok(())
	}

	fn reset(&mut self) -> Result<()> {
		self.depth = 0;
		println!("reset");
		Ok(())
	}

	fn close(&mut self) {
		println!("close");
	}

	fn queue_depth(&self) -> usize {
		self.depth
	}
}

struct PrintSink;

impl RenderSink<Vec<u8>> for PrintSink {
	fn present(&mut self, picture: Vec<u8>) {
		println!("present {} bytes", picture.len());
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let mut pipe = VideoPipe::new(PrintHost { depth: 0 }, PrintSink);

	// Units can arrive before setup finishes; they are buffered and flushed
	// in order once the decoder is configured.
	pipe.submit(DecodeUnit {
		kind: UnitKind::Key,
		timestamp: Timestamp::ZERO,
		duration: 16_667,
		payload: key_unit(),
	});

	pipe.setup(StreamSetup {
		codec: "avc3.64001F".parse()?,
		width: 1280,
		height: 720,
		fps: 60,
	})
	.await?;

	// A delta unit flows through the established translator.
	pipe.submit(DecodeUnit {
		kind: UnitKind::Delta,
		timestamp: Timestamp::from_micros(16_667),
		duration: 16_667,
		payload: delta_unit(),
	});

	// The host's output callback would normally drive this.
	pipe.on_output(vec![0; 1280 * 720 * 4]);

	println!("stats: {:?}", pipe.stats().snapshot());

	pipe.cleanup();
	Ok(())
}

// A minimal Annex-B key access unit: SPS, PPS and an IDR slice.
fn key_unit() -> Bytes {
	let mut buf = Vec::new();
	for nal in [
		&[0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9][..],
		&[0x68, 0xEB, 0xE3, 0xCB],
		&[0x65, 0x88, 0x84, 0x00, 0x33, 0xFF],
	] {
		buf.extend_from_slice(&[0, 0, 0, 1]);
		buf.extend_from_slice(nal);
	}
	buf.into()
}

fn delta_unit() -> Bytes {
	let mut buf = vec![0, 0, 0, 1];
	buf.extend_from_slice(&[0x41, 0x9A, 0x24, 0x6C]);
	buf.into()
}
