//! Actions, the transitions they start, and the render functions those
//! transitions produce.

use std::fmt;
use std::sync::Arc;

use segue_process::Coroutine;

use crate::State;

/// Suspended computation started by an [`Action`]; it resolves to a [`RenderFn`].
pub type Transition<P, V, S> = Box<dyn Coroutine<V, Output = RenderFn<P, V, S>>>;

type ActionBody<P, V, S> = dyn Fn(P) -> Transition<P, V, S> + Send + Sync;

/// Named, re-invokable function from parameters to a [`Transition`].
///
/// Clones share identity; compare with [`Action::ptr_eq`].
pub struct Action<P, V, S> {
	name: Arc<str>,
	body: Arc<ActionBody<P, V, S>>,
}

impl<P, V, S> Action<P, V, S> {
	pub fn new<F, C>(name: impl Into<Arc<str>>, body: F) -> Self
	where
		P: 'static,
		V: 'static,
		S: 'static,
		F: Fn(P) -> C + Send + Sync + 'static,
		C: Coroutine<V, Output = RenderFn<P, V, S>> + 'static,
	{
		Self {
			name: name.into(),
			body: Arc::new(move |params| Box::new(body(params)) as Transition<P, V, S>),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns `true` when both values are clones of the same action.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.body, &other.body)
	}

	/// Builds a fresh transition for `params`.
	pub fn start(&self, params: P) -> Transition<P, V, S> {
		(self.body)(params)
	}
}

impl<P, V, S> Clone for Action<P, V, S> {
	fn clone(&self) -> Self {
		Self {
			name: Arc::clone(&self.name),
			body: Arc::clone(&self.body),
		}
	}
}

impl<P, V, S> fmt::Debug for Action<P, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Action").field(&self.name).finish()
	}
}

impl<P, V, S> fmt::Display for Action<P, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

/// Pure function from a [`State`] snapshot to the opaque output `S`.
pub struct RenderFn<P, V, S> {
	render: Arc<dyn Fn(&State<P, V, S>) -> S + Send + Sync>,
}

impl<P, V, S> RenderFn<P, V, S> {
	pub fn new(render: impl Fn(&State<P, V, S>) -> S + Send + Sync + 'static) -> Self {
		Self { render: Arc::new(render) }
	}

	pub fn render(&self, state: &State<P, V, S>) -> S {
		(self.render)(state)
	}
}

impl<P, V, S> Clone for RenderFn<P, V, S> {
	fn clone(&self) -> Self {
		Self {
			render: Arc::clone(&self.render),
		}
	}
}

impl<P, V, S> fmt::Debug for RenderFn<P, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("RenderFn(..)")
	}
}
