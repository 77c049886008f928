//! Drives a [`Coroutine`] to completion as a cancellable process.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::coroutine::{Step, StepResult};
use crate::kind::ProcessKind;
use crate::resolve::resolve;
use crate::token::{RunToken, next_process_id};
use crate::{Coroutine, ProcessError, ProcessHandle, Resolved};

type Feed<V> = Option<Result<Resolved<V>, ProcessError>>;

struct Runner<C, V> {
	/// `None` once the coroutine finished or was terminated.
	coroutine: Mutex<Option<C>>,
	/// Child process resolving the last yielded request.
	pending: Mutex<Option<ProcessHandle<Resolved<V>>>>,
	token: RunToken,
}

/// Starts driving `coroutine` and returns its process handle.
///
/// Each yielded request is resolved with [`resolve`] and its outcome is fed
/// back through [`Coroutine::resume`] or [`Coroutine::fail`]. The process
/// settles with the coroutine's output, or with the first error it does not
/// recover from.
///
/// Cancelling the handle terminates the coroutine, forwards cancellation to
/// the pending child, and settles the process with
/// [`ProcessError::Cancelled`] without waiting for the child to stop.
pub fn run<V, C>(coroutine: C) -> ProcessHandle<C::Output>
where
	V: Clone + Send + Sync + 'static,
	C: Coroutine<V> + 'static,
	C::Output: Clone + Send + Sync + 'static,
{
	let id = next_process_id();
	let runner = Arc::new(Runner {
		coroutine: Mutex::new(Some(coroutine)),
		pending: Mutex::new(None),
		token: RunToken::new(id),
	});
	let driver = Arc::clone(&runner);
	ProcessHandle::spawn(
		id,
		ProcessKind::Coroutine,
		async move {
			let outcome = driver.drive().await;
			// cancel() can land after the last step released the coroutine
			let taken = driver.coroutine.lock().take();
			if let Some(mut coroutine) = taken
				&& outcome.as_ref().is_err_and(ProcessError::is_cancelled)
			{
				coroutine.terminate();
			}
			outcome
		},
		Some(Box::new(move || runner.cancel())),
	)
}

impl<C, V> Runner<C, V>
where
	V: Clone + Send + Sync + 'static,
	C: Coroutine<V>,
{
	async fn drive(&self) -> Result<C::Output, ProcessError> {
		let process_id = self.token.process_id();
		let mut feed: Feed<V> = None;
		loop {
			let request = match self.step(feed.take())? {
				Step::Complete(output) => {
					tracing::trace!(process_id, "process.coroutine.complete");
					return Ok(output);
				}
				Step::Yielded(request) => request,
			};
			tracing::trace!(process_id, request = request.kind(), "process.coroutine.yield");

			let pending = resolve(request);
			*self.pending.lock() = Some(pending.clone());
			if self.token.is_cancelled() {
				// cancel() may have looked at `pending` before it was stored
				self.pending.lock().take();
				pending.cancel();
				return Err(ProcessError::Cancelled);
			}

			let outcome = tokio::select! {
				biased;
				() = self.token.cancelled() => return Err(ProcessError::Cancelled),
				outcome = pending.wait() => outcome,
			};
			self.pending.lock().take();
			feed = Some(outcome);
		}
	}

	fn step(&self, feed: Feed<V>) -> StepResult<V, C::Output> {
		let mut slot = self.coroutine.lock();
		let Some(coroutine) = slot.as_mut() else {
			return Err(ProcessError::Cancelled);
		};
		let step = match feed {
			None => coroutine.resume(None),
			Some(Ok(value)) => coroutine.resume(Some(value)),
			Some(Err(error)) => coroutine.fail(error),
		};
		if self.token.is_cancelled() {
			// cancelled while this step held the coroutine
			let taken = slot.take();
			drop(slot);
			if let Some(mut coroutine) = taken {
				coroutine.terminate();
			}
			return Err(ProcessError::Cancelled);
		}
		step
	}

	fn cancel(&self) {
		if !self.token.cancel() {
			return;
		}
		tracing::trace!(process_id = self.token.process_id(), "process.coroutine.terminate");
		// A step in progress holds the lock; `step` terminates once it returns.
		let taken = self.coroutine.try_lock().and_then(|mut slot| slot.take());
		if let Some(mut coroutine) = taken {
			coroutine.terminate();
		}
		let pending = self.pending.lock().take();
		if let Some(pending) = pending {
			pending.cancel();
		}
	}
}
