//! Single-flight transitions over cancellable coroutine processes.
//!
//! An [`Action`] turns parameters into a [`Transition`]: a coroutine that
//! yields asynchronous requests and finally produces a [`RenderFn`]. The
//! [`TransitionCoordinator`] runs one transition at a time. Starting a new
//! one cancels the previous one, and only the newest transition's render
//! output reaches observers through `next`. Superseded and failed
//! transitions are reported through `error` as an [`ActionError`].
//!
//! The execution layer lives in [`process`].

mod action;
mod coordinator;
mod error;
mod observer;
mod state;

pub use segue_process as process;

pub use action::{Action, RenderFn, Transition};
pub use coordinator::{CoordinatorBuilder, TransitionCoordinator};
pub use error::ActionError;
pub use observer::{Observer, Subscription, SubscriptionRegistry};
pub use state::State;
