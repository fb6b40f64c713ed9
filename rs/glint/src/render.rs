//! The downstream picture sink.
//!
//! Rendering itself happens elsewhere; the pipe only needs a statically
//! typed place to hand pictures to.

/// Receives decoded pictures from the pipe.
///
/// Ownership of each picture transfers on delivery; the sink is responsible
/// for releasing it once displayed, however the host platform defines
/// release.
pub trait RenderSink<P> {
	fn present(&mut self, picture: P);
}

/// A sink that immediately drops every picture.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl<P> RenderSink<P> for Discard {
	fn present(&mut self, _picture: P) {}
}
