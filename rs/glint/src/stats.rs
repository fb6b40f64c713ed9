//! Decode-path counters for the viewer's stats overlay.
//!
//! The pipe feeds these as it works; whoever renders the overlay takes a
//! [`VideoStats::snapshot`] once per display interval, which resets the
//! counters for the next one.

use serde::Serialize;

/// Counters aggregated since the last snapshot.
#[derive(Debug, Default, Clone)]
pub struct VideoStats {
	submitted: u64,
	decoded: u64,
	dropped: u64,
	presented: u64,
	keyframes_requested: u64,

	queued_ms_min: u64,
	queued_ms_max: u64,
	queued_ms_total: u64,
	queued_samples: u64,
}

impl VideoStats {
	pub(crate) fn submitted(&mut self) {
		self.submitted += 1;
	}

	pub(crate) fn decoded(&mut self) {
		self.decoded += 1;
	}

	pub(crate) fn dropped(&mut self) {
		self.dropped += 1;
	}

	pub(crate) fn presented(&mut self) {
		self.presented += 1;
	}

	pub(crate) fn keyframe_requested(&mut self) {
		self.keyframes_requested += 1;
	}

	pub(crate) fn queued(&mut self, queued_ms: u64) {
		if self.queued_samples == 0 {
			self.queued_ms_min = queued_ms;
			self.queued_ms_max = queued_ms;
		} else {
			self.queued_ms_min = self.queued_ms_min.min(queued_ms);
			self.queued_ms_max = self.queued_ms_max.max(queued_ms);
		}

		self.queued_ms_total += queued_ms;
		self.queued_samples += 1;
	}

	/// Take the interval's numbers and start the next one.
	pub fn snapshot(&mut self) -> StatsSnapshot {
		let queue = (self.queued_samples > 0).then(|| QueueLatency {
			min_ms: self.queued_ms_min,
			max_ms: self.queued_ms_max,
			avg_ms: self.queued_ms_total / self.queued_samples,
		});

		let snapshot = StatsSnapshot {
			submitted: self.submitted,
			decoded: self.decoded,
			dropped: self.dropped,
			presented: self.presented,
			keyframes_requested: self.keyframes_requested,
			queue,
		};

		*self = Self::default();
		snapshot
	}
}

/// One interval's worth of decode statistics.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
	pub submitted: u64,
	pub decoded: u64,
	pub dropped: u64,
	pub presented: u64,
	pub keyframes_requested: u64,
	pub queue: Option<QueueLatency>,
}

/// Estimated decoder queue latency over the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueLatency {
	pub min_ms: u64,
	pub max_ms: u64,
	pub avg_ms: u64,
}
