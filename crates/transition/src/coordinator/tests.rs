use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use segue_process::coroutine::{Resume, from_fn, once, ready};
use segue_process::{ProcessError, Request, Resolved, StepResult};

use super::*;

type Coordinator = TransitionCoordinator<u32, u32, String>;
type Render = RenderFn<u32, u32, String>;
type Log = Arc<Mutex<Vec<String>>>;

fn describe(error: &ActionError<u32, u32, String>) -> String {
	let kind = match error {
		ActionError::Failed { .. } => "failed",
		ActionError::CancelledAction { .. } => "cancelled_action",
		ActionError::CancelledError { .. } => "cancelled_error",
	};
	format!("{kind}:{}:{}", error.action(), error.params())
}

fn record(log: &Log) -> Observer<u32, u32, String> {
	let next = Arc::clone(log);
	let error = Arc::clone(log);
	Observer::new()
		.on_next(move |output: &String| next.lock().push(format!("next:{output}")))
		.on_error(move |e| error.lock().push(describe(e)))
}

fn render_resolved(resolved: Resolved<u32>) -> Render {
	let value = resolved.into_value().unwrap_or_default();
	RenderFn::new(move |state: &State<u32, u32, String>| format!("{}:{value}", state.action()))
}

/// Resolves `params` after `ms` and renders `"{action}:{params}"`.
fn delayed(name: &'static str, ms: u64) -> Action<u32, u32, String> {
	Action::new(name, move |params: u32| {
		let fetch = Request::lazy(async move {
			tokio::time::sleep(Duration::from_millis(ms)).await;
			params
		});
		once(fetch, render_resolved)
	})
}

/// Renders `"{action}:{params}"` without yielding.
fn instant(name: &'static str) -> Action<u32, u32, String> {
	Action::new(name, |_: u32| ready(RenderFn::new(|state: &State<u32, u32, String>| format!("{}:{}", state.action(), state.params()))))
}

/// Yields a request that never resolves.
fn stuck(name: &'static str) -> Action<u32, u32, String> {
	Action::new(name, |_: u32| once(Request::lazy(std::future::pending::<u32>()), render_resolved))
}

fn exploding(name: &'static str) -> Action<u32, u32, String> {
	Action::new(name, |_: u32| ready(RenderFn::new(|_: &State<u32, u32, String>| -> String { panic!("render exploded") })))
}

fn rejecting(name: &'static str) -> Action<u32, u32, String> {
	Action::new(name, |_: u32| from_fn(|_: Resume<u32>| -> StepResult<u32, Render> { Err(ProcessError::msg("bad params")) }))
}

async fn wait_for(log: &Log, len: usize) {
	for _ in 0..200 {
		if log.lock().len() >= len {
			return;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	panic!("expected {len} events, got {:?}", log.lock());
}

#[tokio::test]
async fn every_observer_gets_one_next_per_transition() {
	let coordinator = Coordinator::new();
	let first = Log::default();
	let second = Log::default();
	coordinator.subscribe(record(&first));
	coordinator.subscribe(record(&second));

	let action = Action::new("sum", |params: u32| {
		once(Request::sequence([Request::ready(params), Request::ready(2)]), |resolved: Resolved<u32>| {
			let total: u32 = resolved.into_values().unwrap_or_default().into_iter().sum();
			RenderFn::new(move |_: &State<u32, u32, String>| format!("total:{total}"))
		})
	});
	assert!(coordinator.mutate(action, 40).await.is_ok());

	assert_eq!(*first.lock(), ["next:total:42"]);
	assert_eq!(*second.lock(), ["next:total:42"]);
	assert!(coordinator.is_idle());
}

#[tokio::test]
async fn superseded_transition_never_produces_next() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	coordinator.subscribe(record(&log));

	let slow = coordinator.mutate(delayed("slow", 30), 1);
	let fast = coordinator.mutate(delayed("fast", 1), 2);
	assert!(slow.await.is_ok());
	assert!(fast.await.is_ok());

	let events = log.lock().clone();
	assert_eq!(events.len(), 2);
	assert!(events.contains(&"cancelled_error:slow:1".to_string()));
	assert!(events.contains(&"next:fast:2".to_string()));
}

#[tokio::test]
async fn completion_racing_a_newer_mutate_is_cancelled_action() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	coordinator.subscribe(record(&log));

	let settling = coordinator.shared.settle.lock().await;
	let first = coordinator.mutate(instant("a"), 1);
	let Some(a) = coordinator.shared.current.lock().clone() else {
		panic!("a should be in flight");
	};
	assert!(a.wait().await.is_ok());

	let second = coordinator.mutate(instant("b"), 2);
	assert!(!a.is_cancelled(), "settled handles ignore cancel");
	drop(settling);

	assert!(first.await.is_ok());
	assert!(second.await.is_ok());
	assert_eq!(*log.lock(), ["cancelled_action:a:1", "next:b:2"]);
}

#[tokio::test]
async fn cancelled_action_carries_the_discarded_render() {
	let coordinator = Coordinator::new();
	let discarded = Arc::new(Mutex::new(None));
	let slot = Arc::clone(&discarded);
	coordinator.subscribe(Observer::new().on_error(move |e: &ActionError<u32, u32, String>| {
		if let Some(render) = e.render() {
			*slot.lock() = Some(render.clone());
		}
	}));

	let settling = coordinator.shared.settle.lock().await;
	let first = coordinator.mutate(instant("a"), 7);
	let Some(a) = coordinator.shared.current.lock().clone() else {
		panic!("a should be in flight");
	};
	let _ = a.wait().await;
	let _second = coordinator.mutate(stuck("b"), 0);
	drop(settling);
	assert!(first.await.is_ok());

	let render = discarded.lock().clone();
	let state = State::new(coordinator.clone(), instant("a"), 7);
	assert_eq!(render.map(|r| r.render(&state)).as_deref(), Some("a:7"));
	coordinator.shutdown();
}

#[tokio::test]
async fn live_failure_goes_to_error_observers() {
	let unhandled = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&unhandled);
	let coordinator = Coordinator::builder()
		.on_unhandled(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		})
		.build();
	let log = Log::default();
	coordinator.subscribe(record(&log));

	assert!(coordinator.mutate(rejecting("load"), 3).await.is_ok());
	assert_eq!(*log.lock(), ["failed:load:3"]);
	assert_eq!(unhandled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failure_without_error_callbacks_is_unhandled() {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&seen);
	let coordinator = Coordinator::builder()
		.on_unhandled(move |e: &ActionError<u32, u32, String>| sink.lock().push(e.to_string()))
		.build();
	coordinator.subscribe(Observer::new().on_next(|_: &String| {}));

	let outcome = coordinator.mutate(rejecting("load"), 3).await;
	let Err(error) = outcome else {
		panic!("unhandled failure must not resolve as success");
	};
	assert!(!error.is_cancelled());
	assert_eq!(*error.params(), 3);
	assert_eq!(*seen.lock(), ["action `load` failed: bad params"]);
}

#[tokio::test]
async fn stale_failure_is_not_unhandled() {
	let unhandled = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&unhandled);
	let coordinator = Coordinator::builder()
		.on_unhandled(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		})
		.build();

	let first = coordinator.mutate(stuck("a"), 1);
	let second = coordinator.mutate(instant("b"), 2);
	assert!(first.await.is_ok());
	assert!(second.await.is_ok());
	assert_eq!(unhandled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failure_racing_a_newer_mutate_is_cancelled_error() {
	let unhandled = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&unhandled);
	let coordinator = Coordinator::builder()
		.on_unhandled(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		})
		.build();
	let log = Log::default();
	let next = Arc::clone(&log);
	let error = Arc::clone(&log);
	coordinator.subscribe_fn(
		move |out| next.lock().push(format!("next:{out}")),
		move |e| {
			let cause = e.cause().map(ToString::to_string).unwrap_or_default();
			error.lock().push(format!("{}:{cause}", describe(e)));
		},
	);

	let settling = coordinator.shared.settle.lock().await;
	let first = coordinator.mutate(rejecting("a"), 1);
	let Some(a) = coordinator.shared.current.lock().clone() else {
		panic!("a should be in flight");
	};
	assert!(a.wait().await.is_err());

	let second = coordinator.mutate(instant("b"), 2);
	drop(settling);

	assert!(first.await.is_ok());
	assert!(second.await.is_ok());
	assert_eq!(*log.lock(), ["cancelled_error:a:1:bad params", "next:b:2"]);
	assert_eq!(unhandled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn render_panic_fails_the_live_transition() {
	let unhandled = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&unhandled);
	let coordinator = Coordinator::builder()
		.on_unhandled(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		})
		.build();

	let outcome = coordinator.mutate(exploding("boom"), 1).await;
	let Err(ActionError::Failed { cause, params, .. }) = outcome else {
		panic!("a panicking render must reject mutate");
	};
	assert_eq!(params, 1);
	assert!(matches!(&cause, ProcessError::Panicked(msg) if msg.contains("render exploded")));
	assert_eq!(unhandled.load(Ordering::SeqCst), 1);
	assert!(coordinator.is_idle());
}

#[tokio::test]
async fn render_panic_reaches_error_observers() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	coordinator.subscribe(record(&log));

	assert!(coordinator.mutate(exploding("boom"), 1).await.is_ok());
	assert!(coordinator.mutate(instant("after"), 2).await.is_ok());
	assert_eq!(*log.lock(), ["failed:boom:1", "next:after:2"]);
}

#[tokio::test]
#[should_panic(expected = "observer exploded")]
async fn panicking_error_observer_resurfaces_from_mutate() {
	let coordinator = Coordinator::new();
	coordinator.subscribe(Observer::new().on_error(|_| panic!("observer exploded")));
	let _ = coordinator.mutate(rejecting("load"), 1).await;
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.0.lock().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

#[tokio::test]
async fn stale_settlement_is_logged_as_a_warning() {
	let captured = Captured::default();
	let writer = captured.clone();
	let subscriber = tracing_subscriber::fmt()
		.with_writer(move || writer.clone())
		.with_max_level(tracing::Level::WARN)
		.with_ansi(false)
		.finish();
	let _guard = tracing::subscriber::set_default(subscriber);

	let coordinator = Coordinator::new();
	let first = coordinator.mutate(stuck("a"), 1);
	let second = coordinator.mutate(instant("b"), 2);
	assert!(first.await.is_ok());
	assert!(second.await.is_ok());

	let output = String::from_utf8_lossy(&captured.0.lock()).into_owned();
	let stale = output.lines().find(|line| line.contains("transition.stale"));
	assert!(stale.is_some_and(|line| line.contains("WARN")), "{output}");
}

#[tokio::test]
async fn repeated_cancel_notifies_once() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	coordinator.subscribe(record(&log));

	let pending = coordinator.mutate(stuck("a"), 1);
	let Some(handle) = coordinator.shared.current.lock().clone() else {
		panic!("a should be in flight");
	};
	handle.cancel();
	handle.cancel();
	assert!(pending.await.is_ok());
	handle.cancel();

	tokio::time::sleep(Duration::from_millis(10)).await;
	assert_eq!(*log.lock(), ["failed:a:1"]);
	assert!(handle.is_cancelled());
}

#[tokio::test]
async fn unsubscribed_observer_receives_nothing() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	let subscription = coordinator.subscribe(record(&log));
	assert_eq!(coordinator.observer_count(), 1);

	subscription.unsubscribe();
	subscription.unsubscribe();
	assert!(subscription.closed());
	assert_eq!(coordinator.observer_count(), 0);

	assert!(coordinator.mutate(instant("a"), 1).await.is_ok());
	assert!(log.lock().is_empty());
}

#[tokio::test]
async fn observers_may_start_a_new_transition() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	coordinator.subscribe(record(&log));

	let chained = coordinator.clone();
	let follow = delayed("follow", 1);
	coordinator.subscribe(Observer::new().on_next(move |output: &String| {
		if output.starts_with("first") {
			drop(chained.mutate(follow.clone(), 2));
		}
	}));

	assert!(coordinator.mutate(delayed("first", 1), 1).await.is_ok());
	wait_for(&log, 2).await;
	assert_eq!(*log.lock(), ["next:first:1", "next:follow:2"]);
	coordinator.shutdown();
}

#[tokio::test]
async fn dispatch_continues_without_awaiting_mutate() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	coordinator.subscribe(record(&log));

	drop(coordinator.mutate(delayed("detached", 1), 5));
	wait_for(&log, 1).await;
	assert_eq!(*log.lock(), ["next:detached:5"]);
}

#[tokio::test]
async fn state_reload_reruns_the_same_action() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	coordinator.subscribe(record(&log));

	let captured: Arc<Mutex<Option<State<u32, u32, String>>>> = Arc::default();
	let slot = Arc::clone(&captured);
	let action = Action::new("capture", move |params: u32| {
		let slot = Arc::clone(&slot);
		ready(RenderFn::new(move |state: &State<u32, u32, String>| {
			*slot.lock() = Some(state.clone());
			format!("capture:{params}")
		}))
	});
	assert!(coordinator.mutate(action.clone(), 4).await.is_ok());

	let Some(state) = captured.lock().clone() else {
		panic!("render should have run");
	};
	assert!(state.action().ptr_eq(&action));
	assert_eq!(*state.params(), 4);
	assert!(state.coordinator().ptr_eq(&coordinator));

	assert!(state.reload().await.is_ok());
	assert!(state.mutate(instant("other"), 9).await.is_ok());
	assert_eq!(*log.lock(), ["next:capture:4", "next:capture:4", "next:other:9"]);
}

#[tokio::test]
async fn shutdown_cancels_and_completes_observers() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	let completed = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&completed);
	let subscription = coordinator.subscribe(record(&log).on_complete(move || {
		counter.fetch_add(1, Ordering::SeqCst);
	}));

	let pending = coordinator.mutate(stuck("a"), 1);
	assert!(!coordinator.is_idle());
	coordinator.shutdown();

	assert!(coordinator.is_idle());
	assert!(subscription.closed());
	assert_eq!(coordinator.observer_count(), 0);
	assert_eq!(completed.load(Ordering::SeqCst), 1);
	assert!(pending.await.is_ok());
	assert!(log.lock().is_empty());

	let again = Log::default();
	coordinator.subscribe(record(&again));
	assert!(coordinator.mutate(instant("b"), 2).await.is_ok());
	assert_eq!(*again.lock(), ["next:b:2"]);
}

#[tokio::test]
async fn subscribe_fn_registers_both_callbacks() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	let next = Arc::clone(&log);
	let error = Arc::clone(&log);
	coordinator.subscribe_fn(move |out| next.lock().push(out.clone()), move |e| error.lock().push(describe(e)));

	assert!(coordinator.mutate(instant("ok"), 1).await.is_ok());
	assert!(coordinator.mutate(rejecting("bad"), 2).await.is_ok());
	assert_eq!(*log.lock(), ["ok:1", "failed:bad:2"]);
}

#[tokio::test]
async fn subscribe_callbacks_reports_completion() {
	let coordinator = Coordinator::new();
	let log = Log::default();
	let next = Arc::clone(&log);
	let error = Arc::clone(&log);
	let complete = Arc::clone(&log);
	let subscription = coordinator.subscribe_callbacks(
		move |out| next.lock().push(out.clone()),
		move |e| error.lock().push(describe(e)),
		move || complete.lock().push("complete".to_string()),
	);

	assert!(coordinator.mutate(instant("ok"), 1).await.is_ok());
	coordinator.shutdown();
	coordinator.shutdown();
	assert!(subscription.closed());
	assert_eq!(*log.lock(), ["ok:1", "complete"]);
}

#[test]
fn builder_names_the_coordinator() {
	assert_eq!(Coordinator::new().name(), "coordinator");
	let named = Coordinator::builder().name("search").build();
	assert_eq!(named.name(), "search");
	assert!(named.is_idle());
	assert!(format!("{named:?}").contains("search"));
}
