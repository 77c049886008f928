//! Identity-bearing cancellable handle over a pending result.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::ProcessError;
use crate::kind::ProcessKind;
use crate::spawn::spawn_process;
use crate::token::next_process_id;

type Outcome<T> = Option<Result<T, ProcessError>>;

pub(crate) type Canceller = Box<dyn Fn() + Send + Sync>;

struct Inner<T> {
	id: u64,
	kind: ProcessKind,
	outcome: watch::Receiver<Outcome<T>>,
	canceller: Option<Canceller>,
	cancel_requested: AtomicBool,
}

/// Cancellable handle to a running (or settled) process.
///
/// Clones share one process. Handles are compared by identity only, through
/// [`ProcessHandle::ptr_eq`]; two distinct processes are never equal even when
/// they settle to the same value.
pub struct ProcessHandle<T> {
	inner: Arc<Inner<T>>,
}

impl<T> Clone for ProcessHandle<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> fmt::Debug for ProcessHandle<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProcessHandle")
			.field("id", &self.inner.id)
			.field("kind", &self.inner.kind)
			.field("settled", &self.is_settled())
			.finish()
	}
}

impl<T> ProcessHandle<T> {
	/// Process id, unique for the lifetime of the program.
	pub fn id(&self) -> u64 {
		self.inner.id
	}

	pub fn kind(&self) -> ProcessKind {
		self.inner.kind
	}

	/// Returns `true` when both handles refer to the same process.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Returns `true` once an outcome has been published.
	pub fn is_settled(&self) -> bool {
		self.inner.outcome.borrow().is_some()
	}

	/// Returns `true` if [`cancel`](Self::cancel) took effect on this process.
	pub fn is_cancelled(&self) -> bool {
		self.inner.cancel_requested.load(Ordering::Acquire)
	}

	/// Signals cancellation.
	///
	/// Idempotent, and a no-op once the process has settled. Does not wait for
	/// the process to actually stop.
	pub fn cancel(&self) {
		if self.is_settled() {
			return;
		}
		if self.inner.cancel_requested.swap(true, Ordering::AcqRel) {
			return;
		}
		tracing::trace!(process_id = self.inner.id, process_kind = self.inner.kind.as_str(), "process.cancel");
		if let Some(canceller) = &self.inner.canceller {
			canceller();
		}
	}
}

impl<T> ProcessHandle<T>
where
	T: Clone + Send + Sync + 'static,
{
	/// Handle that is settled from the start.
	pub fn ready(outcome: Result<T, ProcessError>) -> Self {
		let (_tx, rx) = watch::channel(Some(outcome));
		Self::from_parts(next_process_id(), ProcessKind::Ready, rx, None)
	}

	/// Runs a plain future. Cancelling the handle has no effect on it.
	pub fn leaf<F>(fut: F) -> Self
	where
		F: Future<Output = Result<T, ProcessError>> + Send + 'static,
	{
		Self::spawn(next_process_id(), ProcessKind::Leaf, fut, None)
	}

	/// Runs a future together with a cancel signal of its own.
	///
	/// `cancel` is invoked at most once, and not at all if the handle has
	/// already settled.
	pub fn with_cancel<F>(fut: F, cancel: impl Fn() + Send + Sync + 'static) -> Self
	where
		F: Future<Output = Result<T, ProcessError>> + Send + 'static,
	{
		Self::spawn(next_process_id(), ProcessKind::Leaf, fut, Some(Box::new(cancel)))
	}

	pub(crate) fn spawn<F>(id: u64, kind: ProcessKind, body: F, canceller: Option<Canceller>) -> Self
	where
		F: Future<Output = Result<T, ProcessError>> + Send + 'static,
	{
		let (tx, rx) = watch::channel(None);
		let handle = Self::from_parts(id, kind, rx, canceller);
		spawn_process(id, body, move |outcome| {
			tracing::trace!(process_id = id, process_kind = kind.as_str(), ok = outcome.is_ok(), "process.settled");
			tx.send_replace(Some(outcome));
		});
		handle
	}

	fn from_parts(id: u64, kind: ProcessKind, outcome: watch::Receiver<Outcome<T>>, canceller: Option<Canceller>) -> Self {
		Self {
			inner: Arc::new(Inner {
				id,
				kind,
				outcome,
				canceller,
				cancel_requested: AtomicBool::new(false),
			}),
		}
	}

	/// Waits for the outcome. Any number of clones may wait concurrently.
	pub async fn wait(&self) -> Result<T, ProcessError> {
		let mut rx = self.inner.outcome.clone();
		let outcome = match rx.wait_for(Option::is_some).await {
			Ok(slot) => slot.clone(),
			Err(_) => None,
		};
		outcome.unwrap_or(Err(ProcessError::Dropped))
	}
}
