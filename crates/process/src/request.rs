//! Requests yielded by a coroutine and the resolved trees they turn into.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::{Coroutine, ProcessError, ProcessHandle};

/// An asynchronous request, classified once at construction.
///
/// `Ready`, `Future` and `Process` are leaves. `Sequence` and `Keyed` fan out
/// to their children, and `Suspended` is driven as a nested coroutine.
pub enum Request<V> {
	/// A value that is already available.
	Ready(V),
	/// A plain future. It cannot be cancelled.
	Future(BoxFuture<'static, Result<V, ProcessError>>),
	/// A running process that participates in cancellation.
	Process(ProcessHandle<Resolved<V>>),
	/// An ordered list of requests.
	Sequence(Vec<Request<V>>),
	/// A string-keyed mapping of requests. Key order is preserved.
	Keyed(IndexMap<String, Request<V>>),
	/// A nested coroutine whose output is the resolved value.
	Suspended(Box<dyn Coroutine<V, Output = Resolved<V>>>),
}

impl<V> Request<V>
where
	V: Send + 'static,
{
	pub fn ready(value: V) -> Self {
		Self::Ready(value)
	}

	/// Wraps a fallible future as a non-cancellable leaf.
	pub fn future<F, E>(fut: F) -> Self
	where
		F: Future<Output = Result<V, E>> + Send + 'static,
		E: Into<anyhow::Error>,
	{
		Self::Future(fut.map(|res| res.map_err(ProcessError::failed)).boxed())
	}

	/// Wraps an infallible future as a non-cancellable leaf.
	pub fn lazy<F>(fut: F) -> Self
	where
		F: Future<Output = V> + Send + 'static,
	{
		Self::Future(fut.map(Ok).boxed())
	}

	pub fn process(handle: ProcessHandle<Resolved<V>>) -> Self {
		Self::Process(handle)
	}

	pub fn sequence(items: impl IntoIterator<Item = Request<V>>) -> Self {
		Self::Sequence(items.into_iter().collect())
	}

	pub fn keyed<K, I>(entries: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, Request<V>)>,
	{
		Self::Keyed(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}

	pub fn suspended(coroutine: impl Coroutine<V, Output = Resolved<V>> + 'static) -> Self {
		Self::Suspended(Box::new(coroutine))
	}

	/// Short name of the variant, for logs.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Ready(_) => "ready",
			Self::Future(_) => "future",
			Self::Process(_) => "process",
			Self::Sequence(_) => "sequence",
			Self::Keyed(_) => "keyed",
			Self::Suspended(_) => "suspended",
		}
	}
}

impl<V> FromIterator<Request<V>> for Request<V> {
	fn from_iter<I: IntoIterator<Item = Request<V>>>(iter: I) -> Self {
		Self::Sequence(iter.into_iter().collect())
	}
}

impl<V> fmt::Debug for Request<V>
where
	V: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ready(v) => f.debug_tuple("Ready").field(v).finish(),
			Self::Future(_) => f.write_str("Future(..)"),
			Self::Process(handle) => f.debug_tuple("Process").field(&handle.id()).finish(),
			Self::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
			Self::Keyed(entries) => f.debug_tuple("Keyed").field(entries).finish(),
			Self::Suspended(_) => f.write_str("Suspended(..)"),
		}
	}
}

/// Fully resolved mirror of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<V> {
	Value(V),
	Sequence(Vec<Resolved<V>>),
	Keyed(IndexMap<String, Resolved<V>>),
}

impl<V> Resolved<V> {
	pub fn as_value(&self) -> Option<&V> {
		match self {
			Self::Value(v) => Some(v),
			_ => None,
		}
	}

	pub fn into_value(self) -> Option<V> {
		match self {
			Self::Value(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_sequence(&self) -> Option<&[Resolved<V>]> {
		match self {
			Self::Sequence(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_keyed(&self) -> Option<&IndexMap<String, Resolved<V>>> {
		match self {
			Self::Keyed(entries) => Some(entries),
			_ => None,
		}
	}

	/// Looks up a key of a keyed tree.
	pub fn get(&self, key: &str) -> Option<&Resolved<V>> {
		self.as_keyed().and_then(|entries| entries.get(key))
	}

	/// Looks up an index of a sequence tree.
	pub fn at(&self, index: usize) -> Option<&Resolved<V>> {
		self.as_sequence().and_then(|items| items.get(index))
	}

	/// Flattens a sequence of plain values, or `None` if the tree is not one.
	pub fn into_values(self) -> Option<Vec<V>> {
		match self {
			Self::Sequence(items) => items.into_iter().map(Resolved::into_value).collect(),
			_ => None,
		}
	}
}
