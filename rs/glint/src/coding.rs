//! Append-only byte assembly for length-prefixed samples and descriptor
//! boxes.

use bytes::{BufMut, Bytes, BytesMut};

/// A growable, append-only byte builder.
///
/// The backing storage is retained across [`Builder::split`] calls so the hot
/// decode path settles into a steady-state allocation. Integer writes are
/// big-endian, matching the NAL length prefixes and ISO box fields it exists
/// to produce.
#[derive(Default)]
pub struct Builder {
	buf: BytesMut,
}

impl Builder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			buf: BytesMut::with_capacity(capacity),
		}
	}

	/// Ensure space for `additional` more bytes before a burst of writes.
	pub fn reserve(&mut self, additional: usize) {
		self.buf.reserve(additional);
	}

	pub fn put_u8(&mut self, value: u8) {
		self.buf.put_u8(value);
	}

	pub fn put_u16_be(&mut self, value: u16) {
		self.buf.put_u16(value);
	}

	pub fn put_u32_be(&mut self, value: u32) {
		self.buf.put_u32(value);
	}

	pub fn put_slice(&mut self, slice: &[u8]) {
		self.buf.put_slice(slice);
	}

	pub fn len(&self) -> usize {
		self.buf.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}

	/// Take the assembled bytes, leaving the builder empty but with its
	/// capacity intact for the next round.
	pub fn split(&mut self) -> Bytes {
		self.buf.split().freeze()
	}

	/// Consume the builder, returning the assembled bytes.
	pub fn freeze(self) -> Bytes {
		self.buf.freeze()
	}
}
