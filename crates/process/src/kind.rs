/// How a [`ProcessHandle`](crate::ProcessHandle) was built, which decides what
/// `cancel()` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessKind {
	/// Already settled at construction; nothing runs.
	Ready,
	/// Plain future; cancellation is a no-op.
	Leaf,
	/// Sequence or keyed fan-out; cancellation is forwarded to every child.
	FanOut,
	/// Driven coroutine; cancellation terminates it and its pending child.
	Coroutine,
}

impl ProcessKind {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Ready => "ready",
			Self::Leaf => "leaf",
			Self::FanOut => "fan_out",
			Self::Coroutine => "coroutine",
		}
	}
}
