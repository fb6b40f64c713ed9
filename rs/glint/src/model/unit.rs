use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::model::Timestamp;

/// Whether an access unit can be decoded without any prior stream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
	Key,
	Delta,
}

/// One compressed access unit as received from the transport.
///
/// The payload is a cheap reference-counted handle; the pipe clones it only
/// when it has to buffer units before the decoder is configured.
#[derive(Debug, Clone)]
pub struct DecodeUnit {
	pub kind: UnitKind,

	/// Presentation time of the unit.
	pub timestamp: Timestamp,

	/// How long the unit is displayed, in microseconds.
	pub duration: u64,

	/// The compressed bitstream, Annex-B or length-prefixed depending on
	/// the negotiated path.
	pub payload: Bytes,
}

impl DecodeUnit {
	pub fn is_key(&self) -> bool {
		self.kind == UnitKind::Key
	}
}

/// A translated access unit, ready to feed to the host decoder.
#[derive(Debug, Clone)]
pub struct EncodedUnit {
	pub kind: UnitKind,
	pub timestamp: Timestamp,
	pub duration: u64,
	pub payload: Bytes,
}

impl EncodedUnit {
	/// Carry a unit through unchanged, for the pass-through path.
	pub fn passthrough(unit: &DecodeUnit) -> Self {
		Self {
			kind: unit.kind,
			timestamp: unit.timestamp,
			duration: unit.duration,
			payload: unit.payload.clone(),
		}
	}

	pub fn is_key(&self) -> bool {
		self.kind == UnitKind::Key
	}
}
