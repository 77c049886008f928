use std::sync::Arc;

use super::{TransitionCoordinator, UnhandledHook};
use crate::ActionError;

const DEFAULT_NAME: &str = "coordinator";

/// Configuration for a [`TransitionCoordinator`].
pub struct CoordinatorBuilder<P, V, S> {
	name: Arc<str>,
	unhandled: Option<Box<UnhandledHook<P, V, S>>>,
}

impl<P, V, S> Default for CoordinatorBuilder<P, V, S> {
	fn default() -> Self {
		Self {
			name: Arc::from(DEFAULT_NAME),
			unhandled: None,
		}
	}
}

impl<P, V, S> CoordinatorBuilder<P, V, S> {
	/// Sets the name reported in log events.
	#[must_use]
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Arc::from(name.into());
		self
	}

	/// Sets the hook receiving failures that no observer handled.
	///
	/// Without one, unhandled failures are logged at `error` level.
	#[must_use]
	pub fn on_unhandled(mut self, hook: impl Fn(&ActionError<P, V, S>) + Send + Sync + 'static) -> Self {
		self.unhandled = Some(Box::new(hook));
		self
	}

	pub fn build(self) -> TransitionCoordinator<P, V, S>
	where
		P: 'static,
		V: 'static,
		S: 'static,
	{
		let unhandled: Box<UnhandledHook<P, V, S>> = match self.unhandled {
			Some(hook) => hook,
			None => {
				let coordinator = Arc::clone(&self.name);
				Box::new(move |error: &ActionError<P, V, S>| {
					tracing::error!(%coordinator, action = error.action().name(), %error, "transition.unhandled");
				})
			}
		};
		TransitionCoordinator::from_parts(self.name, unhandled)
	}
}

impl<P, V, S> std::fmt::Debug for CoordinatorBuilder<P, V, S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CoordinatorBuilder")
			.field("name", &self.name)
			.field("on_unhandled", &self.unhandled.is_some())
			.finish()
	}
}
