//! Recursive resolution of [`Request`] trees into [`Resolved`] trees.

use crate::join::join_ordered;
use crate::kind::ProcessKind;
use crate::runner::run;
use crate::token::next_process_id;
use crate::{ProcessError, ProcessHandle, Request, Resolved};

/// Starts resolving `request` and returns the process driving it.
///
/// Every child of a sequence or keyed request is started before any of them
/// is awaited, so independent branches make progress concurrently. The
/// resolved tree keeps the input order and key set regardless of which child
/// settles first. If any child fails, the whole resolution fails with it.
pub fn resolve<V>(request: Request<V>) -> ProcessHandle<Resolved<V>>
where
	V: Clone + Send + Sync + 'static,
{
	match request {
		Request::Ready(value) => ProcessHandle::ready(Ok(Resolved::Value(value))),
		Request::Future(fut) => ProcessHandle::leaf(async move { fut.await.map(Resolved::Value) }),
		Request::Process(handle) => handle,
		Request::Sequence(items) => {
			let children: Vec<_> = items.into_iter().map(resolve).collect();
			fan_out(children, Resolved::Sequence)
		}
		Request::Keyed(entries) => {
			let (keys, children): (Vec<String>, Vec<_>) = entries.into_iter().map(|(key, req)| (key, resolve(req))).unzip();
			fan_out(children, move |values| Resolved::Keyed(keys.into_iter().zip(values).collect()))
		}
		Request::Suspended(coroutine) => run(coroutine),
	}
}

/// Resolves `request` and waits for the resolved tree.
pub async fn resolve_value<V>(request: Request<V>) -> Result<Resolved<V>, ProcessError>
where
	V: Clone + Send + Sync + 'static,
{
	resolve(request).wait().await
}

fn fan_out<V, F>(children: Vec<ProcessHandle<Resolved<V>>>, assemble: F) -> ProcessHandle<Resolved<V>>
where
	V: Clone + Send + Sync + 'static,
	F: FnOnce(Vec<Resolved<V>>) -> Resolved<V> + Send + 'static,
{
	if children.is_empty() {
		return ProcessHandle::ready(Ok(assemble(Vec::new())));
	}

	let waiting = children.clone();
	ProcessHandle::spawn(
		next_process_id(),
		ProcessKind::FanOut,
		async move { join_ordered(&waiting).await.map(assemble) },
		Some(Box::new(move || children.iter().for_each(ProcessHandle::cancel))),
	)
}
