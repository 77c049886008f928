//! Single-flight coordinator: at most one live transition, newest wins.

use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use segue_process::{ProcessError, ProcessHandle};

use crate::{Action, ActionError, Observer, RenderFn, State, Subscription, SubscriptionRegistry};

mod builder;

pub use builder::CoordinatorBuilder;

pub(crate) type UnhandledHook<P, V, S> = dyn Fn(&ActionError<P, V, S>) + Send + Sync;

struct Shared<P, V, S> {
	name: Arc<str>,
	current: Mutex<Option<ProcessHandle<RenderFn<P, V, S>>>>,
	registry: SubscriptionRegistry<P, V, S>,
	/// Serialises the check-clear-dispatch sequence of each settlement.
	settle: tokio::sync::Mutex<()>,
	unhandled: Box<UnhandledHook<P, V, S>>,
}

/// Runs [`Action`]s one at a time and publishes their rendered outputs.
///
/// Starting a new transition cancels the one in flight. A transition that
/// settles after it was superseded never produces `next`; observers receive
/// [`ActionError::CancelledAction`] or [`ActionError::CancelledError`]
/// instead. Clones share one coordinator.
pub struct TransitionCoordinator<P, V, S> {
	shared: Arc<Shared<P, V, S>>,
}

impl<P, V, S> Clone for TransitionCoordinator<P, V, S> {
	fn clone(&self) -> Self {
		Self {
			shared: Arc::clone(&self.shared),
		}
	}
}

impl<P, V, S> Default for TransitionCoordinator<P, V, S>
where
	P: 'static,
	V: 'static,
	S: 'static,
{
	fn default() -> Self {
		Self::builder().build()
	}
}

impl<P, V, S> fmt::Debug for TransitionCoordinator<P, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransitionCoordinator")
			.field("name", &self.name())
			.field("idle", &self.is_idle())
			.field("observers", &self.observer_count())
			.finish()
	}
}

impl<P, V, S> TransitionCoordinator<P, V, S>
where
	P: 'static,
	V: 'static,
	S: 'static,
{
	pub fn new() -> Self {
		Self::default()
	}
}

impl<P, V, S> TransitionCoordinator<P, V, S> {
	pub fn builder() -> CoordinatorBuilder<P, V, S> {
		CoordinatorBuilder::default()
	}

	pub(crate) fn from_parts(name: Arc<str>, unhandled: Box<UnhandledHook<P, V, S>>) -> Self {
		Self {
			shared: Arc::new(Shared {
				name,
				current: Mutex::new(None),
				registry: SubscriptionRegistry::default(),
				settle: tokio::sync::Mutex::new(()),
				unhandled,
			}),
		}
	}

	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// Returns `true` when no transition is in flight.
	pub fn is_idle(&self) -> bool {
		self.shared.current.lock().is_none()
	}

	pub fn observer_count(&self) -> usize {
		self.shared.registry.len()
	}

	/// Returns `true` when both values refer to the same coordinator.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.shared, &other.shared)
	}

	/// Clears `current` if it still is `handle`. Returns whether it was.
	fn release(&self, handle: &ProcessHandle<RenderFn<P, V, S>>) -> bool {
		let mut current = self.shared.current.lock();
		if current.as_ref().is_some_and(|live| live.ptr_eq(handle)) {
			*current = None;
			true
		} else {
			false
		}
	}
}

impl<P, V, S> TransitionCoordinator<P, V, S>
where
	P: Clone + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
	S: 'static,
{
	/// Starts `action(params)`, superseding any transition in flight.
	///
	/// The previous transition is cancelled and the new one is started before
	/// this returns. Settlement and dispatch proceed in the background whether
	/// or not the returned future is polled; awaiting it waits for dispatch.
	///
	/// The future resolves to `Err` only when the live transition failed and
	/// no observer handled the error. The unhandled hook has already run by
	/// then. A render function or `next` callback that panics counts as a
	/// failure of the live transition. Superseded settlements always resolve
	/// to `Ok(())`.
	pub fn mutate(&self, action: Action<P, V, S>, params: P) -> impl Future<Output = Result<(), ActionError<P, V, S>>> + Send + use<P, V, S> {
		let previous = self.shared.current.lock().clone();
		if let Some(previous) = previous {
			tracing::debug!(coordinator = %self.shared.name, process_id = previous.id(), "transition.superseded");
			previous.cancel();
		}

		let handle = segue_process::run(action.start(params.clone()));
		let displaced = self.shared.current.lock().replace(handle.clone());
		if let Some(displaced) = displaced {
			// a concurrent mutate published its handle in between
			displaced.cancel();
		}
		tracing::debug!(coordinator = %self.shared.name, action = action.name(), process_id = handle.id(), "transition.start");

		let coordinator = self.clone();
		let settlement = ProcessHandle::leaf(async move { Ok(coordinator.settle(handle, action, params).await) });
		async move {
			match settlement.wait().await {
				Ok(result) => result,
				// an observer callback or the unhandled hook panicked
				Err(ProcessError::Panicked(message)) => resume_unwind(Box::new(message)),
				Err(error) => {
					tracing::error!(%error, "transition.settle_failed");
					Ok(())
				}
			}
		}
	}

	async fn settle(self, handle: ProcessHandle<RenderFn<P, V, S>>, action: Action<P, V, S>, params: P) -> Result<(), ActionError<P, V, S>> {
		let outcome = handle.wait().await;

		let _settling = self.shared.settle.lock().await;
		let live = self.release(&handle);
		let process_id = handle.id();
		match (outcome, live) {
			(Ok(render), true) => {
				let state = State::new(self.clone(), action.clone(), params.clone());
				let applied = catch_unwind(AssertUnwindSafe(|| {
					let output = render.render(&state);
					self.shared.registry.next(&output)
				}));
				match applied {
					Ok(observers) => {
						tracing::debug!(coordinator = %self.shared.name, action = action.name(), process_id, observers, "transition.applied");
						Ok(())
					}
					Err(payload) => {
						let cause = ProcessError::panicked(payload.as_ref());
						tracing::warn!(coordinator = %self.shared.name, action = action.name(), process_id, %cause, "transition.render_panicked");
						self.fail(ActionError::Failed { action, params, cause })
					}
				}
			}
			(Ok(render), false) => {
				tracing::warn!(coordinator = %self.shared.name, action = action.name(), process_id, "transition.stale");
				self.shared.registry.error(&ActionError::CancelledAction { action, params, render });
				Ok(())
			}
			(Err(cause), true) => self.fail(ActionError::Failed { action, params, cause }),
			(Err(cause), false) => {
				tracing::warn!(coordinator = %self.shared.name, action = action.name(), process_id, %cause, "transition.stale");
				self.shared.registry.error(&ActionError::CancelledError { action, params, cause });
				Ok(())
			}
		}
	}

	fn fail(&self, error: ActionError<P, V, S>) -> Result<(), ActionError<P, V, S>> {
		let handled = self.shared.registry.error(&error);
		if handled > 0 {
			tracing::debug!(coordinator = %self.shared.name, action = error.action().name(), observers = handled, "transition.failed");
			return Ok(());
		}
		(self.shared.unhandled)(&error);
		Err(error)
	}

	/// Registers `observer`. See [`SubscriptionRegistry::subscribe`].
	pub fn subscribe(&self, observer: Observer<P, V, S>) -> Subscription {
		self.shared.registry.subscribe(observer)
	}

	/// Registers a `next` and an `error` callback as one observer.
	pub fn subscribe_fn(
		&self,
		on_next: impl Fn(&S) + Send + Sync + 'static,
		on_error: impl Fn(&ActionError<P, V, S>) + Send + Sync + 'static,
	) -> Subscription {
		self.subscribe(Observer::new().on_next(on_next).on_error(on_error))
	}

	/// Like [`subscribe_fn`](Self::subscribe_fn), also calling `on_complete`
	/// on [`shutdown`](Self::shutdown).
	pub fn subscribe_callbacks(
		&self,
		on_next: impl Fn(&S) + Send + Sync + 'static,
		on_error: impl Fn(&ActionError<P, V, S>) + Send + Sync + 'static,
		on_complete: impl Fn() + Send + Sync + 'static,
	) -> Subscription {
		self.subscribe(Observer::new().on_next(on_next).on_error(on_error).on_complete(on_complete))
	}

	/// Cancels the transition in flight and completes every observer.
	///
	/// The coordinator stays usable; later subscriptions and mutations behave
	/// as on a fresh coordinator.
	pub fn shutdown(&self) {
		let current = self.shared.current.lock().take();
		if let Some(current) = current {
			current.cancel();
		}
		tracing::debug!(coordinator = %self.shared.name, observers = self.shared.registry.len(), "transition.shutdown");
		self.shared.registry.complete();
	}
}

#[cfg(test)]
mod tests;
