use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic id clock shared by every process in the address space.
#[derive(Debug, Default)]
pub(crate) struct ProcessClock {
	next: AtomicU64,
}

impl ProcessClock {
	pub const fn new() -> Self {
		Self { next: AtomicU64::new(0) }
	}

	/// Returns the next process id, starting at 1.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

static CLOCK: ProcessClock = ProcessClock::new();

/// Allocates a fresh process id.
pub(crate) fn next_process_id() -> u64 {
	CLOCK.next()
}

/// Process-scoped cancellation token for coroutine runs.
#[derive(Debug, Clone)]
pub(crate) struct RunToken {
	process_id: u64,
	cancel: CancellationToken,
}

impl RunToken {
	pub fn new(process_id: u64) -> Self {
		Self {
			process_id,
			cancel: CancellationToken::new(),
		}
	}

	pub const fn process_id(&self) -> u64 {
		self.process_id
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation. Returns `false` if it had already been requested.
	pub fn cancel(&self) -> bool {
		if self.cancel.is_cancelled() {
			return false;
		}
		self.cancel.cancel();
		true
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}
}
