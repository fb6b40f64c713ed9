use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timestamp overflow")]
pub struct TimestampOverflow;

/// A timestamp representing the presentation time of an access unit in
/// microseconds, scoped to the stream.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
	/// The maximum representable timestamp.
	pub const MAX: Self = Self(u64::MAX);

	/// The zero timestamp.
	pub const ZERO: Self = Self(0);

	pub const fn from_secs(seconds: u64) -> Result<Self, TimestampOverflow> {
		match seconds.checked_mul(1_000_000) {
			Some(micros) => Ok(Self(micros)),
			None => Err(TimestampOverflow),
		}
	}

	pub const fn from_millis(millis: u64) -> Result<Self, TimestampOverflow> {
		match millis.checked_mul(1000) {
			Some(micros) => Ok(Self(micros)),
			None => Err(TimestampOverflow),
		}
	}

	pub const fn from_micros(micros: u64) -> Self {
		Self(micros)
	}

	/// Get the timestamp as microseconds.
	pub const fn as_micros(self) -> u64 {
		self.0
	}

	/// Get the timestamp as milliseconds.
	pub const fn as_millis(self) -> u64 {
		self.0 / 1000
	}

	/// Get the timestamp as seconds.
	pub const fn as_secs(self) -> u64 {
		self.0 / 1_000_000
	}

	pub fn checked_add(self, rhs: Self) -> Option<Self> {
		self.0.checked_add(rhs.0).map(Self)
	}

	pub fn checked_sub(self, rhs: Self) -> Option<Self> {
		self.0.checked_sub(rhs.0).map(Self)
	}

	pub fn saturating_sub(self, rhs: Self) -> Self {
		Self(self.0.saturating_sub(rhs.0))
	}
}

impl TryFrom<Duration> for Timestamp {
	type Error = TimestampOverflow;

	fn try_from(duration: Duration) -> Result<Self, Self::Error> {
		Ok(Self(duration.as_micros().try_into().map_err(|_| TimestampOverflow)?))
	}
}

impl From<Timestamp> for Duration {
	fn from(timestamp: Timestamp) -> Self {
		Duration::from_micros(timestamp.0)
	}
}

impl std::fmt::Debug for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}µs", self.0)
	}
}

impl std::fmt::Display for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}µs", self.0)
	}
}

impl std::ops::Add<Timestamp> for Timestamp {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		self.checked_add(rhs).expect("timestamp overflow")
	}
}

impl std::ops::Sub for Timestamp {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self {
		self.checked_sub(rhs).expect("timestamp overflow")
	}
}
