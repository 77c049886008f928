//! Cancellable processes over nested asynchronous requests.
//!
//! This crate provides the execution layer under the transition coordinator:
//! * [`Request`] / [`Resolved`]: tagged trees of leaf values, futures,
//!   sequences, keyed maps and nested coroutines, and their resolved mirror
//! * [`resolve`]: recursive, order-preserving resolution of a request tree
//! * [`Coroutine`]: suspended computation resumed step by step
//! * [`run`]: coroutine runner with cooperative cancellation
//! * [`ProcessHandle`]: identity-bearing cancellable handle to a pending result

pub mod coroutine;
mod error;
mod handle;
mod join;
mod kind;
mod request;
mod resolve;
mod runner;
mod spawn;
mod token;

pub use coroutine::{Coroutine, Resume, Step, StepResult};
pub use error::ProcessError;
pub use handle::ProcessHandle;
pub use kind::ProcessKind;
pub use request::{Request, Resolved};
pub use resolve::{resolve, resolve_value};
pub use runner::run;
