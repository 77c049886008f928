use std::fmt;
use std::future::Future;

use crate::{Action, ActionError, TransitionCoordinator};

/// Immutable snapshot handed to a [`RenderFn`](crate::RenderFn).
///
/// Built fresh each time a render function is applied.
pub struct State<P, V, S> {
	coordinator: TransitionCoordinator<P, V, S>,
	action: Action<P, V, S>,
	params: P,
}

impl<P, V, S> State<P, V, S> {
	pub(crate) fn new(coordinator: TransitionCoordinator<P, V, S>, action: Action<P, V, S>, params: P) -> Self {
		Self { coordinator, action, params }
	}

	/// Action whose transition produced this state.
	pub fn action(&self) -> &Action<P, V, S> {
		&self.action
	}

	pub fn params(&self) -> &P {
		&self.params
	}

	pub fn coordinator(&self) -> &TransitionCoordinator<P, V, S> {
		&self.coordinator
	}
}

impl<P, V, S> State<P, V, S>
where
	P: Clone + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
	S: 'static,
{
	/// Starts a new transition on the owning coordinator.
	pub fn mutate(&self, action: Action<P, V, S>, params: P) -> impl Future<Output = Result<(), ActionError<P, V, S>>> + Send + use<P, V, S> {
		self.coordinator.mutate(action, params)
	}

	/// Re-runs the action that produced this state with the same parameters.
	pub fn reload(&self) -> impl Future<Output = Result<(), ActionError<P, V, S>>> + Send + use<P, V, S> {
		self.coordinator.mutate(self.action.clone(), self.params.clone())
	}
}

impl<P, V, S> Clone for State<P, V, S>
where
	P: Clone,
{
	fn clone(&self) -> Self {
		Self {
			coordinator: self.coordinator.clone(),
			action: self.action.clone(),
			params: self.params.clone(),
		}
	}
}

impl<P, V, S> fmt::Debug for State<P, V, S>
where
	P: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("State")
			.field("coordinator", &self.coordinator.name())
			.field("action", &self.action)
			.field("params", &self.params)
			.finish()
	}
}
