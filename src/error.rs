use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("transport error: {0}")]
	Transport(#[from] io::Error),

	#[error("protocol error: {0}")]
	Protocol(String),

	#[error("time value {text:?} does not fit in 64-bit picoseconds")]
	Range { text: String },

	#[error("expected {expected} points but received {actual}")]
	SizeMismatch { expected: usize, actual: usize },

	#[error("capture contains no samples")]
	EmptyCapture,

	#[error("invalid configuration: {0}")]
	InvalidConfig(&'static str),

	#[error("failed to write output: {0}")]
	Export(#[source] io::Error),

	#[error("failed to render plot: {0}")]
	Plot(String),
}

impl Error {
	pub(crate) fn protocol(msg: impl Into<String>) -> Self {
		Error::Protocol(msg.into())
	}
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
	for Error
{
	fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
		Error::Plot(format!("{value:?}"))
	}
}

pub type Result<T> = std::result::Result<T, Error>;
