use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Semaphore, broadcast};

use intervisor::{
    BackoffPolicy, Config, DispatcherError, Event, EventKind, HandlerKind, InterruptError,
    Interrupts, ManualClock, Menu, MenuError, Phase, ProcessControl, Scope, TaskCtx, TaskHandle,
    TaskId, TaskState,
};

fn config() -> Config {
    Config {
        restart_backoff: BackoffPolicy::immediate(),
        ..Config::default()
    }
}

fn context(clock: &Arc<ManualClock>) -> Arc<Interrupts> {
    Interrupts::builder(config())
        .with_clock(Arc::clone(clock) as _)
        .build()
}

async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
    drain_events(rx).into_iter().map(|ev| ev.kind).collect()
}

fn position(events: &[Event], what: &str, pred: impl Fn(&Event) -> bool) -> usize {
    events
        .iter()
        .position(pred)
        .unwrap_or_else(|| panic!("no {what} event"))
}

fn count(kinds: &[EventKind], kind: EventKind) -> usize {
    kinds.iter().filter(|k| **k == kind).count()
}

/// Registers under `scope` and counts every wake.
async fn count_wakes(
    ctx: TaskCtx,
    scope: &'static str,
    hits: Arc<AtomicUsize>,
) -> Result<(), InterruptError> {
    ctx.register(scope)?;
    loop {
        ctx.wait_for_signal().await?;
        hits.fetch_add(1, Ordering::SeqCst);
    }
}

fn handler(
    hub: &Arc<Interrupts>,
    scope: &'static str,
    hits: Arc<AtomicUsize>,
) -> TaskHandle<Result<(), InterruptError>> {
    hub.spawn(scope, move |ctx| count_wakes(ctx, scope, hits))
}

/// Long-running work that only a forced interrupt can reach; counts them.
fn root_task(hub: &Arc<Interrupts>, forced: Arc<AtomicUsize>) -> TaskHandle<()> {
    hub.spawn("root", move |ctx| async move {
        loop {
            if ctx
                .suspend(tokio::time::sleep(Duration::from_secs(3600)))
                .await
                .is_err()
            {
                forced.fetch_add(1, Ordering::SeqCst);
            }
        }
    })
}

fn hits(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

#[derive(Default)]
struct ScriptedMenu {
    picks: Mutex<VecDeque<Option<usize>>>,
    prompts: Mutex<Vec<Vec<String>>>,
}

impl ScriptedMenu {
    fn new(picks: impl IntoIterator<Item = Option<usize>>) -> Arc<Self> {
        let menu = Self::default();
        menu.picks.lock().extend(picks);
        Arc::new(menu)
    }

    fn push(&self, pick: Option<usize>) {
        self.picks.lock().push_back(pick);
    }

    fn remaining(&self) -> usize {
        self.picks.lock().len()
    }
}

#[async_trait]
impl Menu for ScriptedMenu {
    async fn choose(&self, _prompt: &str, options: &[String]) -> Result<Option<usize>, MenuError> {
        self.prompts.lock().push(options.to_vec());
        Ok(self.picks.lock().pop_front().flatten())
    }
}

/// Holds every prompt until [`release`](GatedMenu::release), then answers `pick`.
struct GatedMenu {
    gate: Semaphore,
    opened: AtomicUsize,
    pick: Option<usize>,
}

impl GatedMenu {
    fn new(pick: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            opened: AtomicUsize::new(0),
            pick,
        })
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Menu for GatedMenu {
    async fn choose(&self, _prompt: &str, _options: &[String]) -> Result<Option<usize>, MenuError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.map_err(|_| MenuError::Closed)?;
        permit.forget();
        Ok(self.pick)
    }
}

#[derive(Default)]
struct RecordingProcess {
    exits: Mutex<Vec<i32>>,
    aborts: AtomicUsize,
}

impl ProcessControl for RecordingProcess {
    fn exit(&self, code: i32) {
        self.exits.lock().push(code);
    }

    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn broadcast_escalation_and_unregister() {
    let clock = Arc::new(ManualClock::new());
    let hub = context(&clock);
    let mut events = hub.events();

    let forced = Arc::new(AtomicUsize::new(0));
    let root = root_task(&hub, Arc::clone(&forced));
    hub.set_root_task(root.id());

    let a_hits = Arc::new(AtomicUsize::new(0));
    let b_hits = Arc::new(AtomicUsize::new(0));
    let a = handler(&hub, "a", Arc::clone(&a_hits));
    let b = handler(&hub, "b", Arc::clone(&b_hits));

    let _dispatcher = hub.start_simple_handler(false).expect("first start");
    eventually("handlers waiting", || hub.is_waiting(a.id()) && hub.is_waiting(b.id())).await;
    eventually("root suspended", || root.state() == TaskState::Suspended).await;

    // Scenario A: one interrupt wakes both scopes, root untouched.
    assert!(hub.raise());
    eventually("first broadcast", || hits(&a_hits) == 1 && hits(&b_hits) == 1).await;
    assert_eq!(hits(&forced), 0);

    // Scenario B: a second interrupt 200ms later also escalates, exactly once.
    eventually("handlers waiting again", || hub.is_waiting(a.id()) && hub.is_waiting(b.id())).await;
    clock.advance(Duration::from_millis(200));
    assert!(hub.raise());
    eventually("second broadcast", || hits(&a_hits) == 2 && hits(&b_hits) == 2).await;
    eventually("root forced", || hits(&forced) == 1).await;

    let kinds = drain(&mut events);
    assert_eq!(count(&kinds, EventKind::Escalated), 1);
    assert_eq!(count(&kinds, EventKind::ForceDelivered), 1);
    assert_eq!(count(&kinds, EventKind::Broadcast), 2);

    // Scenario C: after unregistering `a`, only `b` is woken.
    assert_eq!(hub.unregister("a", a.id()), Ok(true));
    assert_eq!(hub.scopes(), vec![Scope::from("b")]);
    eventually("b waiting", || hub.is_waiting(b.id())).await;
    clock.advance(Duration::from_secs(2));
    assert!(hub.raise());
    eventually("third broadcast", || hits(&b_hits) == 3).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hits(&a_hits), 2);
    assert_eq!(hits(&forced), 1);

    root.abort();
    a.abort();
    b.abort();
    hub.shutdown();
}

#[tokio::test]
async fn spaced_interrupts_never_escalate() {
    let clock = Arc::new(ManualClock::new());
    let hub = context(&clock);
    let mut events = hub.events();

    let forced = Arc::new(AtomicUsize::new(0));
    let root = root_task(&hub, Arc::clone(&forced));
    hub.set_root_task(root.id());
    let _dispatcher = hub.start_simple_handler(false).expect("start");
    eventually("root suspended", || root.state() == TaskState::Suspended).await;

    for round in 1..=3 {
        clock.advance(Duration::from_secs(1));
        assert!(hub.raise());
        eventually("received", || {
            count(&drain(&mut events), EventKind::InterruptReceived) == 1
        })
        .await;
        assert_eq!(hits(&forced), 0, "round {round}");
    }

    root.abort();
    hub.shutdown();
}

#[tokio::test]
async fn double_start_keeps_one_dispatcher() {
    let hub = context(&Arc::new(ManualClock::new()));

    let first = hub.start_simple_handler(false).expect("first start");
    assert!(hub.start_simple_handler(false).is_none());
    assert!(hub.start_interactive_handler(false).is_none());
    assert!(hub.is_running());
    assert!(hub.bridge_installed());
    assert_eq!(hub.active_handler(), Some(HandlerKind::Simple));
    assert_eq!(hub.active_dispatcher(), Some(first.id()));

    assert!(hub.stop_handler());
    assert!(!hub.is_running());
    assert!(!hub.bridge_installed());
    assert_eq!(hub.active_handler(), None);
    assert_eq!(first.join().await.expect("join"), Ok(()));

    assert!(!hub.raise(), "no bridge after stop");
    assert!(!hub.stop_handler());
}

#[tokio::test]
async fn forced_start_replaces_bridge_and_dispatcher() {
    let hub = context(&Arc::new(ManualClock::new()));
    let mut events = hub.events();

    let first = hub.start_simple_handler(false).expect("first start");
    let second = hub.start_simple_handler(true).expect("forced start");
    assert_ne!(first.id(), second.id());

    assert_eq!(first.join().await.expect("join"), Ok(()));
    assert!(hub.is_running());
    assert_eq!(hub.active_dispatcher(), Some(second.id()));

    let b_hits = Arc::new(AtomicUsize::new(0));
    let b = handler(&hub, "b", Arc::clone(&b_hits));
    eventually("b waiting", || hub.is_waiting(b.id())).await;
    assert!(hub.raise());
    eventually("new dispatcher broadcasts", || hits(&b_hits) == 1).await;

    let kinds = drain(&mut events);
    assert_eq!(count(&kinds, EventKind::BridgeInstalled), 2);
    assert_eq!(count(&kinds, EventKind::DispatcherStarted), 2);
    assert_eq!(count(&kinds, EventKind::DispatcherStopped), 1);
    assert_eq!(count(&kinds, EventKind::DispatcherCrashed), 0);

    b.abort();
    hub.shutdown();
}

#[tokio::test]
async fn crashed_dispatcher_is_replaced() {
    let hub = context(&Arc::new(ManualClock::new()));
    let mut events = hub.events();

    let first = hub.start_simple_handler(false).expect("start");
    let first_id = first.id();
    eventually("dispatcher suspended", || first.state() == TaskState::Suspended).await;

    assert!(hub.force_interrupt_handler());
    let err = first
        .join()
        .await
        .expect("join")
        .expect_err("dispatcher must fail");
    assert!(matches!(err, DispatcherError::Interrupted { .. }));
    assert_eq!(err.as_label(), "dispatcher_interrupted");

    assert!(hub.is_running());
    assert!(hub.bridge_installed());
    let replacement = hub.active_dispatcher().expect("replacement published");
    assert_ne!(replacement, first_id);

    // The replacement is started through the regular non-forced path, so the
    // crashed incarnation had already cleared `running`.
    let log = drain_events(&mut events);
    let started = position(&log, "replacement start", |e| {
        e.kind == EventKind::DispatcherStarted && e.task == Some(replacement)
    });
    let crashed = position(&log, "crash", |e| {
        e.kind == EventKind::DispatcherCrashed && e.task == Some(first_id)
    });
    let restarted = position(&log, "restart", |e| e.kind == EventKind::DispatcherRestarted);
    assert!(started < crashed && crashed < restarted, "{log:?}");
    assert_eq!(log[started].attempt, Some(1));
    assert_eq!(log[restarted].attempt, Some(1));
    assert_eq!(log[restarted].task, Some(replacement));
    assert!(log[crashed].reason.as_deref().is_some_and(|r| r.starts_with("interrupted")));

    // The replacement serves interrupts.
    let b_hits = Arc::new(AtomicUsize::new(0));
    let b = handler(&hub, "b", Arc::clone(&b_hits));
    eventually("b waiting", || hub.is_waiting(b.id())).await;
    assert!(hub.raise());
    eventually("replacement broadcasts", || hits(&b_hits) == 1).await;

    b.abort();
    hub.shutdown();
}

#[tokio::test]
async fn interactive_scope_menu_then_stop() {
    let clock = Arc::new(ManualClock::new());
    // interrupt one scope → "a" → go back → ignore
    let menu = ScriptedMenu::new([Some(1), Some(0), Some(2), Some(3)]);
    let hub = Interrupts::builder(config())
        .with_clock(Arc::clone(&clock) as _)
        .with_menu(Arc::clone(&menu) as _)
        .with_process(Arc::new(RecordingProcess::default()))
        .build();

    let a_hits = Arc::new(AtomicUsize::new(0));
    let b_hits = Arc::new(AtomicUsize::new(0));
    let a = handler(&hub, "a", Arc::clone(&a_hits));
    let b = handler(&hub, "b", Arc::clone(&b_hits));

    let dispatcher = hub.start_interactive_handler(false).expect("start");
    assert_eq!(hub.active_handler(), Some(HandlerKind::Interactive));
    eventually("handlers waiting", || hub.is_waiting(a.id()) && hub.is_waiting(b.id())).await;

    assert!(hub.raise());
    eventually("scope a interrupted", || hits(&a_hits) == 1).await;
    eventually("menu script consumed", || {
        menu.remaining() == 0 && dispatcher.state() == TaskState::Suspended
    })
    .await;
    assert_eq!(hits(&b_hits), 0);
    {
        let prompts = menu.prompts.lock();
        assert_eq!(prompts.len(), 4);
        assert_eq!(prompts[1], vec!["a", "b", "Go back"]);
        assert_eq!(prompts[3].len(), 7);
    }

    // Stop action ends the dispatcher without a restart.
    menu.push(Some(4));
    clock.advance(Duration::from_secs(2));
    assert!(hub.raise());
    assert_eq!(dispatcher.join().await.expect("join"), Ok(()));
    assert!(!hub.is_running());
    assert!(!hub.bridge_installed());
    assert_eq!(hub.active_dispatcher(), None);

    a.abort();
    b.abort();
    hub.shutdown();
}

fn gated_context(menu: &Arc<GatedMenu>, process: &Arc<RecordingProcess>) -> Arc<Interrupts> {
    Interrupts::builder(config())
        .with_clock(Arc::new(ManualClock::new()))
        .with_menu(Arc::clone(menu) as _)
        .with_process(Arc::clone(process) as _)
        .build()
}

#[tokio::test]
async fn forced_start_ends_dispatcher_waiting_in_menu() {
    // "Interrupt all" once the operator answers.
    let menu = GatedMenu::new(Some(0));
    let process = Arc::new(RecordingProcess::default());
    let hub = gated_context(&menu, &process);
    let mut events = hub.events();

    let a_hits = Arc::new(AtomicUsize::new(0));
    let a = handler(&hub, "a", Arc::clone(&a_hits));
    let old = hub.start_interactive_handler(false).expect("start");
    eventually("a waiting", || hub.is_waiting(a.id())).await;

    assert!(hub.raise());
    eventually("menu open", || {
        menu.opened() == 1 && old.state() == TaskState::Suspended
    })
    .await;

    let new = hub.start_interactive_handler(true).expect("forced start");
    assert_eq!(old.join().await.expect("join"), Ok(()));
    assert!(hub.is_running());
    assert_eq!(hub.active_dispatcher(), Some(new.id()));
    assert_eq!(hub.active_handler(), Some(HandlerKind::Interactive));

    // The replaced menu never acts: nothing is broadcast until the new
    // dispatcher receives an interrupt of its own.
    menu.release();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hits(&a_hits), 0);

    assert!(hub.raise());
    eventually("new dispatcher broadcasts", || hits(&a_hits) == 1).await;
    assert_eq!(menu.opened(), 2);

    let kinds = drain(&mut events);
    assert_eq!(count(&kinds, EventKind::ForceDelivered), 1);
    assert_eq!(count(&kinds, EventKind::DispatcherStopped), 1);
    assert_eq!(count(&kinds, EventKind::DispatcherCrashed), 0);
    assert_eq!(count(&kinds, EventKind::DispatcherRestarted), 0);
    assert!(process.exits.lock().is_empty());

    a.abort();
    hub.shutdown();
}

#[tokio::test]
async fn stop_ends_dispatcher_waiting_in_menu() {
    // "Exit the process" if the answer were ever acted on.
    let menu = GatedMenu::new(Some(5));
    let process = Arc::new(RecordingProcess::default());
    let hub = gated_context(&menu, &process);

    let dispatcher = hub.start_interactive_handler(false).expect("start");
    eventually("dispatcher suspended", || dispatcher.state() == TaskState::Suspended).await;
    assert!(hub.raise());
    eventually("menu open", || menu.opened() == 1).await;

    assert!(hub.stop_handler());
    assert_eq!(dispatcher.join().await.expect("join"), Ok(()));
    assert!(!hub.is_running());
    assert_eq!(hub.active_dispatcher(), None);

    menu.release();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(process.exits.lock().is_empty());
    assert_eq!(process.aborts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn interactive_exit_and_abort_use_process_control() {
    let menu = ScriptedMenu::new([Some(5)]);
    let process = Arc::new(RecordingProcess::default());
    let hub = Interrupts::builder(Config {
        exit_code: 3,
        ..config()
    })
    .with_clock(Arc::new(ManualClock::new()))
    .with_menu(Arc::clone(&menu) as _)
    .with_process(Arc::clone(&process) as _)
    .build();

    let dispatcher = hub.start_interactive_handler(false).expect("start");
    assert!(hub.raise());
    assert_eq!(dispatcher.join().await.expect("join"), Ok(()));
    assert_eq!(*process.exits.lock(), vec![3]);

    menu.push(Some(6));
    let dispatcher = hub.start_interactive_handler(false).expect("restart after exit");
    assert!(hub.raise());
    assert_eq!(dispatcher.join().await.expect("join"), Ok(()));
    assert_eq!(process.aborts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn deferred_interrupts_coalesce() {
    let hub = context(&Arc::new(ManualClock::new()));
    let mut events = hub.events();

    let a_hits = Arc::new(AtomicUsize::new(0));
    let a = handler(&hub, "a", Arc::clone(&a_hits));
    let _dispatcher = hub.start_simple_handler(false).expect("start");
    eventually("a waiting", || hub.is_waiting(a.id())).await;

    let outer = hub.defer_signals();
    let inner = hub.defer_signals();
    assert!(hub.is_deferring());
    assert!(!hub.raise());
    assert!(!hub.raise());

    drop(inner);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hits(&a_hits), 0);

    drop(outer);
    assert!(!hub.is_deferring());
    eventually("deferred wake delivered", || hits(&a_hits) == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hits(&a_hits), 1);

    let kinds = drain(&mut events);
    assert_eq!(count(&kinds, EventKind::InterruptDeferred), 2);
    assert_eq!(count(&kinds, EventKind::Escalated), 0);

    a.abort();
    hub.shutdown();
}

#[tokio::test]
async fn registry_errors_surface_synchronously() {
    let hub = context(&Arc::new(ManualClock::new()));
    let stranger = TaskId::from_raw(u64::MAX);

    assert_eq!(
        hub.wait_for_signal(stranger).await,
        Err(InterruptError::NotRegistered { task: stranger })
    );

    hub.set_phase(Phase::Snapshot);
    assert_eq!(hub.phase(), Phase::Snapshot);
    let err = hub.register("x", stranger).expect_err("restricted");
    assert!(matches!(err, InterruptError::RestrictedPhase { phase: Phase::Snapshot, .. }));
    assert!(hub.unregister("x", stranger).is_err());

    hub.set_phase(Phase::Runtime);
    hub.register("x", stranger).expect("runtime registration");
    hub.register("x", stranger).expect("duplicates accepted");
    assert!(!hub.is_waiting(stranger));
    assert_eq!(hub.handler_count(), 2);
    assert_eq!(hub.interrupt_all(), 2);
    assert_eq!(hub.shutdown(), 2);
    assert_eq!(hub.handler_count(), 0);
    assert!(hub.scopes().is_empty());
}

#[tokio::test]
async fn force_requires_a_suspended_target() {
    let hub = context(&Arc::new(ManualClock::new()));

    let task = hub.spawn("busy", |ctx| async move {
        ctx.suspend(tokio::time::sleep(Duration::from_secs(3600))).await
    });
    // Not polled yet: still running, the forced interrupt is dropped.
    assert!(!hub.force_interrupt(task.id()));
    assert!(!hub.force_interrupt_root());
    assert!(!hub.force_interrupt_handler());

    eventually("suspended", || task.state() == TaskState::Suspended).await;
    assert!(hub.force_interrupt(task.id()));
    assert!(!hub.force_interrupt(task.id()), "one pending signal at most");

    let id = task.id();
    let out = task.join().await.expect("join");
    assert!(matches!(out, Err(InterruptError::Interrupted { .. })));
    assert!(!hub.force_interrupt(id), "finished tasks are gone");
    assert_eq!(hub.task_count(), 0);
}
