use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::OnceLock;

use futures::FutureExt;

use crate::ProcessError;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("segue-process-global")
			.build()
			.expect("failed to build segue-process global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns a process body, converting a panic into [`ProcessError::Panicked`]
/// before handing the outcome to `publish`.
#[allow(clippy::disallowed_methods)]
pub(crate) fn spawn_process<T, F, P>(process_id: u64, body: F, publish: P)
where
	F: Future<Output = Result<T, ProcessError>> + Send + 'static,
	P: FnOnce(Result<T, ProcessError>) + Send + 'static,
	T: Send + 'static,
{
	tracing::trace!(process_id, "process.spawn");
	runtime_handle().spawn(async move {
		let outcome = match AssertUnwindSafe(body).catch_unwind().await {
			Ok(outcome) => outcome,
			Err(payload) => {
				let message = panic_message(payload.as_ref());
				tracing::warn!(process_id, panic = %message, "process.panicked");
				Err(ProcessError::Panicked(message))
			}
		};
		publish(outcome);
	});
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
