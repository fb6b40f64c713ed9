use crate::codec::VideoCodec;

/// A list of possible errors produced by the decode pipeline.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	/// No candidate configuration was accepted by the host decoder,
	/// including the out-of-band fallback when one exists for the codec.
	#[error("unsupported codec: {0}")]
	UnsupportedCodec(VideoCodec),

	/// The host decoder reported an internal fault. Terminal; the pipe does
	/// not second-guess the platform.
	#[error("decoder error: {0}")]
	Decoder(String),

	/// A translator was invoked without an installed decoder configuration.
	#[error("missing codec context")]
	MissingContext,

	/// A NAL unit was too short to carry the bytes the descriptor needs.
	#[error("truncated NAL unit")]
	TruncatedNal,

	#[error(transparent)]
	Timestamp(#[from] crate::model::TimestampOverflow),
}

pub type Result<T> = std::result::Result<T, Error>;
