//! Error type shared by every process flavour.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

/// Failure outcome of a process.
///
/// Cloneable so that every clone of a [`ProcessHandle`](crate::ProcessHandle)
/// observes the same outcome.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
	/// The computation itself failed.
	#[error("{0}")]
	Failed(Arc<anyhow::Error>),

	/// A coroutine-backed process stopped because it was cancelled.
	#[error("process cancelled")]
	Cancelled,

	/// The process body panicked.
	#[error("process panicked: {0}")]
	Panicked(String),

	/// The process task ended without publishing an outcome.
	#[error("process ended without an outcome")]
	Dropped,
}

impl ProcessError {
	/// Wraps an arbitrary failure cause.
	pub fn failed(cause: impl Into<anyhow::Error>) -> Self {
		Self::Failed(Arc::new(cause.into()))
	}

	/// Wraps a plain message as a failure cause.
	pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
		Self::Failed(Arc::new(anyhow::Error::msg(message)))
	}

	/// Converts a caught panic payload into [`ProcessError::Panicked`].
	pub fn panicked(payload: &(dyn Any + Send)) -> Self {
		Self::Panicked(crate::spawn::panic_message(payload))
	}

	/// Returns `true` for [`ProcessError::Cancelled`].
	pub const fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}

	/// Returns the user failure cause, if this is [`ProcessError::Failed`].
	pub fn cause(&self) -> Option<&anyhow::Error> {
		match self {
			Self::Failed(cause) => Some(cause),
			_ => None,
		}
	}
}

impl From<anyhow::Error> for ProcessError {
	fn from(cause: anyhow::Error) -> Self {
		Self::Failed(Arc::new(cause))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn failed_keeps_cause_message() {
		let err = ProcessError::msg("fetch failed");
		assert_eq!(err.to_string(), "fetch failed");
		assert_eq!(err.cause().map(ToString::to_string).as_deref(), Some("fetch failed"));
		assert!(!err.is_cancelled());
	}

	#[test]
	fn clones_share_the_cause() {
		let err = ProcessError::failed(std::io::Error::other("disk"));
		let ProcessError::Failed(a) = &err else { unreachable!() };
		let ProcessError::Failed(b) = &err.clone() else { unreachable!() };
		assert!(Arc::ptr_eq(a, b));
	}

	#[test]
	fn panicked_reads_the_payload() {
		let payload = std::panic::catch_unwind(|| panic!("render {}", "exploded")).unwrap_err();
		let err = ProcessError::panicked(payload.as_ref());
		assert!(matches!(&err, ProcessError::Panicked(msg) if msg == "render exploded"));
		assert!(err.cause().is_none());
	}

	#[test]
	fn cancelled_has_no_cause() {
		assert!(ProcessError::Cancelled.is_cancelled());
		assert!(ProcessError::Cancelled.cause().is_none());
	}
}
