//! Test doubles for the host decoder and the render sink.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::model::EncodedUnit;
use crate::render::RenderSink;
use crate::{Error, Result};

use super::{DecoderConfig, DecoderHost};

/// A scripted host decoder that records every call.
pub struct FakeHost {
	accept: Box<dyn Fn(&DecoderConfig) -> bool>,

	pub queries: RefCell<Vec<DecoderConfig>>,
	pub configured: Vec<DecoderConfig>,
	pub decoded: Vec<EncodedUnit>,
	pub resets: usize,
	pub closed: usize,

	/// Reported queue depth. Shared so tests can adjust it after handing
	/// the host to the pipe.
	pub depth: Rc<Cell<usize>>,

	/// When set, `decode` fails with a decoder error.
	pub fail_decode: bool,
}

impl FakeHost {
	pub fn accepting(accept: impl Fn(&DecoderConfig) -> bool + 'static) -> Self {
		Self {
			accept: Box::new(accept),
			queries: RefCell::new(Vec::new()),
			configured: Vec::new(),
			decoded: Vec::new(),
			resets: 0,
			closed: 0,
			depth: Rc::default(),
			fail_decode: false,
		}
	}
}

impl DecoderHost for FakeHost {
	type Picture = u32;

	async fn is_config_supported(&self, config: &DecoderConfig) -> Result<bool> {
		self.queries.borrow_mut().push(config.clone());
		Ok((self.accept)(config))
	}

	fn configure(&mut self, config: &DecoderConfig) -> Result<()> {
		self.configured.push(config.clone());
		Ok(())
	}

	fn decode(&mut self, unit: &EncodedUnit) -> Result<()> {
		if self.fail_decode {
			return Err(Error::Decoder("injected failure".into()));
		}

		self.decoded.push(unit.clone());
		Ok(())
	}

	fn reset(&mut self) -> Result<()> {
		self.resets += 1;
		self.depth.set(0);
		Ok(())
	}

	fn close(&mut self) {
		self.closed += 1;
	}

	fn queue_depth(&self) -> usize {
		self.depth.get()
	}
}

/// A sink that keeps every delivered picture.
#[derive(Default)]
pub struct CollectSink {
	pub pictures: Vec<u32>,
}

impl RenderSink<u32> for CollectSink {
	fn present(&mut self, picture: u32) {
		self.pictures.push(picture);
	}
}
