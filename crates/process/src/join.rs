use std::future::poll_fn;
use std::task::Poll;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::{ProcessError, ProcessHandle};

/// Waits for every handle and returns their values in input order.
///
/// Children are polled in index order on every wake. The first failure
/// observed wins; failures observed in the same pass resolve to the lowest
/// index. Remaining children are left running.
pub(crate) async fn join_ordered<T>(handles: &[ProcessHandle<T>]) -> Result<Vec<T>, ProcessError>
where
	T: Clone + Send + Sync + 'static,
{
	let mut waits: Vec<Option<BoxFuture<'_, Result<T, ProcessError>>>> = handles.iter().map(|h| Some(h.wait().boxed())).collect();
	let mut values: Vec<Option<T>> = handles.iter().map(|_| None).collect();

	poll_fn(|cx| {
		let mut pending = 0usize;
		for (wait, value) in waits.iter_mut().zip(values.iter_mut()) {
			let Some(fut) = wait else {
				continue;
			};
			match fut.as_mut().poll(cx) {
				Poll::Ready(Ok(v)) => {
					*value = Some(v);
					*wait = None;
				}
				Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
				Poll::Pending => pending += 1,
			}
		}
		if pending > 0 {
			return Poll::Pending;
		}
		Poll::Ready(values.iter_mut().map(Option::take).collect::<Option<Vec<T>>>().ok_or(ProcessError::Dropped))
	})
	.await
}
