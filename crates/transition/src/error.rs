//! Failure notifications delivered to observers.

use std::fmt;

use segue_process::ProcessError;

use crate::{Action, RenderFn};

/// Settlement of a transition that is reported through `error`.
///
/// `Failed` is a live transition that failed. The two cancelled variants are
/// transitions that settled after a newer `mutate` had superseded them.
pub enum ActionError<P, V, S> {
	/// The live transition failed.
	Failed { action: Action<P, V, S>, params: P, cause: ProcessError },
	/// A superseded transition completed; its render function was not applied.
	CancelledAction { action: Action<P, V, S>, params: P, render: RenderFn<P, V, S> },
	/// A superseded transition failed.
	CancelledError { action: Action<P, V, S>, params: P, cause: ProcessError },
}

impl<P, V, S> ActionError<P, V, S> {
	pub fn action(&self) -> &Action<P, V, S> {
		match self {
			Self::Failed { action, .. } | Self::CancelledAction { action, .. } | Self::CancelledError { action, .. } => action,
		}
	}

	pub fn params(&self) -> &P {
		match self {
			Self::Failed { params, .. } | Self::CancelledAction { params, .. } | Self::CancelledError { params, .. } => params,
		}
	}

	/// Failure cause; `None` for [`ActionError::CancelledAction`].
	pub fn cause(&self) -> Option<&ProcessError> {
		match self {
			Self::Failed { cause, .. } | Self::CancelledError { cause, .. } => Some(cause),
			Self::CancelledAction { .. } => None,
		}
	}

	/// Discarded render function of a superseded successful transition.
	pub fn render(&self) -> Option<&RenderFn<P, V, S>> {
		match self {
			Self::CancelledAction { render, .. } => Some(render),
			_ => None,
		}
	}

	/// Returns `true` when the transition had been superseded.
	pub const fn is_cancelled(&self) -> bool {
		matches!(self, Self::CancelledAction { .. } | Self::CancelledError { .. })
	}
}

impl<P, V, S> Clone for ActionError<P, V, S>
where
	P: Clone,
{
	fn clone(&self) -> Self {
		match self {
			Self::Failed { action, params, cause } => Self::Failed {
				action: action.clone(),
				params: params.clone(),
				cause: cause.clone(),
			},
			Self::CancelledAction { action, params, render } => Self::CancelledAction {
				action: action.clone(),
				params: params.clone(),
				render: render.clone(),
			},
			Self::CancelledError { action, params, cause } => Self::CancelledError {
				action: action.clone(),
				params: params.clone(),
				cause: cause.clone(),
			},
		}
	}
}

impl<P, V, S> fmt::Display for ActionError<P, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Failed { action, cause, .. } => write!(f, "action `{action}` failed: {cause}"),
			Self::CancelledAction { action, .. } => write!(f, "action `{action}` completed after being superseded"),
			Self::CancelledError { action, cause, .. } => write!(f, "action `{action}` failed after being superseded: {cause}"),
		}
	}
}

impl<P, V, S> fmt::Debug for ActionError<P, V, S>
where
	P: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let variant = match self {
			Self::Failed { .. } => "Failed",
			Self::CancelledAction { .. } => "CancelledAction",
			Self::CancelledError { .. } => "CancelledError",
		};
		f.debug_struct(variant)
			.field("action", self.action())
			.field("params", self.params())
			.field("cause", &self.cause())
			.finish()
	}
}

impl<P, V, S> std::error::Error for ActionError<P, V, S>
where
	P: fmt::Debug,
{
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.cause().map(|cause| cause as &(dyn std::error::Error + 'static))
	}
}
