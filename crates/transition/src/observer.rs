//! Observers, subscriptions, and the ordered registry that dispatches to them.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::ActionError;

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Set of optional callbacks receiving coordinator events.
///
/// Only the callbacks that were registered are invoked.
pub struct Observer<P, V, S> {
	start: Option<Callback<Subscription>>,
	next: Option<Callback<S>>,
	error: Option<Callback<ActionError<P, V, S>>>,
	complete: Option<Box<dyn Fn() + Send + Sync>>,
}

impl<P, V, S> Default for Observer<P, V, S> {
	fn default() -> Self {
		Self {
			start: None,
			next: None,
			error: None,
			complete: None,
		}
	}
}

impl<P, V, S> Observer<P, V, S> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Called with the new subscription before the observer is registered.
	#[must_use]
	pub fn on_start(mut self, f: impl Fn(&Subscription) + Send + Sync + 'static) -> Self {
		self.start = Some(Box::new(f));
		self
	}

	/// Called with every applied render output.
	#[must_use]
	pub fn on_next(mut self, f: impl Fn(&S) + Send + Sync + 'static) -> Self {
		self.next = Some(Box::new(f));
		self
	}

	/// Called with failures and superseded settlements.
	#[must_use]
	pub fn on_error(mut self, f: impl Fn(&ActionError<P, V, S>) + Send + Sync + 'static) -> Self {
		self.error = Some(Box::new(f));
		self
	}

	/// Called once when the coordinator shuts down.
	#[must_use]
	pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
		self.complete = Some(Box::new(f));
		self
	}

	pub fn handles_errors(&self) -> bool {
		self.error.is_some()
	}
}

impl<P, V, S> fmt::Debug for Observer<P, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observer")
			.field("start", &self.start.is_some())
			.field("next", &self.next.is_some())
			.field("error", &self.error.is_some())
			.field("complete", &self.complete.is_some())
			.finish()
	}
}

trait Detach: Send + Sync {
	fn detach(&self, id: u64);
}

struct SubscriptionInner {
	id: u64,
	closed: AtomicBool,
	registry: Weak<dyn Detach>,
}

/// Registration of one observer. Clones refer to the same registration.
#[derive(Clone)]
pub struct Subscription {
	inner: Arc<SubscriptionInner>,
}

impl Subscription {
	pub fn closed(&self) -> bool {
		self.inner.closed.load(Ordering::Acquire)
	}

	/// Stops delivery to the observer. Calling it again is a no-op.
	///
	/// During an ongoing dispatch pass the observer still receives the event
	/// being dispatched; later events are not delivered.
	pub fn unsubscribe(&self) {
		if self.inner.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		if let Some(registry) = self.inner.registry.upgrade() {
			registry.detach(self.inner.id);
		}
	}

	fn close(&self) {
		self.inner.closed.store(true, Ordering::Release);
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.inner.id)
			.field("closed", &self.closed())
			.finish()
	}
}

struct Entry<P, V, S> {
	id: u64,
	observer: Arc<Observer<P, V, S>>,
	subscription: Subscription,
}

struct RegistryInner<P, V, S> {
	next_id: AtomicU64,
	entries: Mutex<Vec<Entry<P, V, S>>>,
}

impl<P, V, S> Detach for RegistryInner<P, V, S> {
	fn detach(&self, id: u64) {
		self.entries.lock().retain(|entry| entry.id != id);
	}
}

/// Ordered observer list.
///
/// Dispatch iterates a snapshot taken at the start of each pass, in
/// subscription order, so callbacks may subscribe or unsubscribe freely.
pub struct SubscriptionRegistry<P, V, S> {
	inner: Arc<RegistryInner<P, V, S>>,
}

impl<P, V, S> Clone for SubscriptionRegistry<P, V, S> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<P, V, S> Default for SubscriptionRegistry<P, V, S> {
	fn default() -> Self {
		Self {
			inner: Arc::new(RegistryInner {
				next_id: AtomicU64::new(0),
				entries: Mutex::new(Vec::new()),
			}),
		}
	}
}

impl<P, V, S> SubscriptionRegistry<P, V, S> {
	pub fn len(&self) -> usize {
		self.inner.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<P, V, S> SubscriptionRegistry<P, V, S>
where
	P: 'static,
	V: 'static,
	S: 'static,
{
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `observer`, calling its `start` callback first.
	///
	/// An observer that unsubscribes from inside `start` is never registered.
	pub fn subscribe(&self, observer: Observer<P, V, S>) -> Subscription {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		let inner = Arc::downgrade(&self.inner);
		let registry: Weak<dyn Detach> = inner;
		let subscription = Subscription {
			inner: Arc::new(SubscriptionInner {
				id,
				closed: AtomicBool::new(false),
				registry,
			}),
		};

		if let Some(start) = &observer.start {
			start(&subscription);
		}
		if subscription.closed() {
			return subscription;
		}

		self.inner.entries.lock().push(Entry {
			id,
			observer: Arc::new(observer),
			subscription: subscription.clone(),
		});
		subscription
	}

	fn snapshot(&self) -> Vec<Arc<Observer<P, V, S>>> {
		self.inner.entries.lock().iter().map(|entry| Arc::clone(&entry.observer)).collect()
	}

	/// Delivers `value` to every `next` callback. Returns how many ran.
	pub fn next(&self, value: &S) -> usize {
		let mut delivered = 0;
		for observer in self.snapshot() {
			if let Some(next) = &observer.next {
				next(value);
				delivered += 1;
			}
		}
		delivered
	}

	/// Delivers `error` to every `error` callback. Returns how many ran.
	pub fn error(&self, error: &ActionError<P, V, S>) -> usize {
		let mut delivered = 0;
		for observer in self.snapshot() {
			if let Some(on_error) = &observer.error {
				on_error(error);
				delivered += 1;
			}
		}
		delivered
	}

	/// Closes every subscription, empties the list, then calls each `complete`
	/// callback in subscription order.
	pub fn complete(&self) {
		let entries = std::mem::take(&mut *self.inner.entries.lock());
		for entry in &entries {
			entry.subscription.close();
		}
		for entry in entries {
			if let Some(complete) = &entry.observer.complete {
				complete();
			}
		}
	}
}
