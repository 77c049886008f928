//! Suspended computations driven step by step by the runner.
//!
//! A [`Coroutine`] is an explicit state machine: the runner resumes it with
//! the resolution of its previous request (or feeds it the failure), and it
//! answers with either another [`Request`] or its final output.
//! [`terminate`](Coroutine::terminate) runs any cleanup it owns when the
//! computation is cancelled.

use crate::{ProcessError, Request, Resolved};

/// Result of one coroutine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step<Y, D> {
	/// The computation yielded a value and wants to be resumed.
	Yielded(Y),
	/// The computation finished.
	Complete(D),
}

impl<Y, D> Step<Y, D> {
	#[inline]
	pub const fn is_yielded(&self) -> bool {
		matches!(self, Step::Yielded(_))
	}

	#[inline]
	pub const fn is_complete(&self) -> bool {
		matches!(self, Step::Complete(_))
	}

	/// Maps the completion value, leaving a yield untouched.
	pub fn map_complete<D2>(self, f: impl FnOnce(D) -> D2) -> Step<Y, D2> {
		match self {
			Step::Yielded(y) => Step::Yielded(y),
			Step::Complete(d) => Step::Complete(f(d)),
		}
	}
}

/// Outcome of resuming a coroutine.
pub type StepResult<V, O> = Result<Step<Request<V>, O>, ProcessError>;

/// A suspended computation yielding [`Request`]s.
pub trait Coroutine<V>: Send {
	type Output;

	/// Resumes with the resolution of the previous request, or `None` on the
	/// first step.
	fn resume(&mut self, input: Option<Resolved<V>>) -> StepResult<V, Self::Output>;

	/// Feeds the failure of the previous request back in. Returning `Err`
	/// means the failure was not recovered.
	fn fail(&mut self, error: ProcessError) -> StepResult<V, Self::Output> {
		Err(error)
	}

	/// Runs cleanup on cancellation. The coroutine is never resumed afterwards.
	fn terminate(&mut self) {}
}

impl<V, C> Coroutine<V> for Box<C>
where
	C: Coroutine<V> + ?Sized,
{
	type Output = C::Output;

	fn resume(&mut self, input: Option<Resolved<V>>) -> StepResult<V, Self::Output> {
		(**self).resume(input)
	}

	fn fail(&mut self, error: ProcessError) -> StepResult<V, Self::Output> {
		(**self).fail(error)
	}

	fn terminate(&mut self) {
		(**self).terminate();
	}
}

/// Input handed to a [`from_fn`] coroutine.
#[derive(Debug)]
pub enum Resume<V> {
	Start,
	Value(Resolved<V>),
	Error(ProcessError),
}

/// Coroutine built from a step closure. See [`from_fn`].
pub struct FromFn<F> {
	step: F,
	cleanup: Option<Box<dyn FnOnce() + Send>>,
}

/// Builds a coroutine from a closure that receives every [`Resume`] input.
pub fn from_fn<V, O, F>(step: F) -> FromFn<F>
where
	F: FnMut(Resume<V>) -> StepResult<V, O> + Send,
{
	FromFn { step, cleanup: None }
}

impl<F> FromFn<F> {
	/// Registers cleanup that runs when the coroutine is terminated.
	#[must_use]
	pub fn on_terminate(mut self, cleanup: impl FnOnce() + Send + 'static) -> Self {
		self.cleanup = Some(Box::new(cleanup));
		self
	}
}

impl<V, O, F> Coroutine<V> for FromFn<F>
where
	F: FnMut(Resume<V>) -> StepResult<V, O> + Send,
{
	type Output = O;

	fn resume(&mut self, input: Option<Resolved<V>>) -> StepResult<V, O> {
		(self.step)(input.map_or(Resume::Start, Resume::Value))
	}

	fn fail(&mut self, error: ProcessError) -> StepResult<V, O> {
		(self.step)(Resume::Error(error))
	}

	fn terminate(&mut self) {
		if let Some(cleanup) = self.cleanup.take() {
			cleanup();
		}
	}
}

/// Coroutine that yields one request and completes from its resolution.
pub struct Once<V, F> {
	request: Option<Request<V>>,
	finish: Option<F>,
}

/// Yields `request`, then completes with `finish(resolved)`.
///
/// A failed request is not recovered.
pub fn once<V, O, F>(request: Request<V>, finish: F) -> Once<V, F>
where
	F: FnOnce(Resolved<V>) -> O + Send,
{
	Once {
		request: Some(request),
		finish: Some(finish),
	}
}

impl<V, O, F> Coroutine<V> for Once<V, F>
where
	V: Send + Sync,
	F: FnOnce(Resolved<V>) -> O + Send,
{
	type Output = O;

	fn resume(&mut self, input: Option<Resolved<V>>) -> StepResult<V, O> {
		if let Some(request) = self.request.take() {
			return Ok(Step::Yielded(request));
		}
		match (input, self.finish.take()) {
			(Some(resolved), Some(finish)) => Ok(Step::Complete(finish(resolved))),
			_ => Err(ProcessError::msg("coroutine resumed after completion")),
		}
	}
}

/// Coroutine that completes immediately without yielding.
pub struct Ready<O> {
	output: Option<O>,
}

pub fn ready<O>(output: O) -> Ready<O> {
	Ready { output: Some(output) }
}

impl<V, O> Coroutine<V> for Ready<O>
where
	O: Send,
{
	type Output = O;

	fn resume(&mut self, _input: Option<Resolved<V>>) -> StepResult<V, O> {
		self.output
			.take()
			.map(Step::Complete)
			.ok_or_else(|| ProcessError::msg("coroutine resumed after completion"))
	}
}
