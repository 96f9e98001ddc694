use super::*;
use crate::error::BootstrapError;
use crate::events::BootstrapperEvent;
use crate::error::UnitError;
use crate::initializer::{
    Direction, Initializer, ManagedInitializer, Placement, UnitDeclaration, UnitHandler, UnitId,
};
use crate::process::ProcessShape;
use crate::registry::BootstrapperBuilder;
use crate::simulated::{Activity, ActivityJournal, SimulatedHandler, SimulatedUnit};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn build(units: Vec<Arc<dyn Initializer>>) -> Bootstrapper {
    BootstrapperBuilder::new()
        .configure(|registry| {
            registry.add_initializers(units);
        })
        .build()
        .unwrap()
}

fn instant(id: &str) -> Arc<SimulatedUnit> {
    Arc::new(SimulatedUnit::instant(UnitDeclaration::new(id)))
}

fn delayed(declaration: UnitDeclaration, delay: Duration) -> Arc<SimulatedUnit> {
    let handler = SimulatedHandler::new(declaration.id().clone()).with_delays(delay, delay);
    Arc::new(SimulatedUnit::new(declaration, handler))
}

fn failing(id: &str, on_start: bool, on_stop: bool) -> Arc<SimulatedUnit> {
    let handler = SimulatedHandler::new(id.into()).failing(on_start, on_stop);
    Arc::new(SimulatedUnit::new(UnitDeclaration::new(id), handler))
}

fn drain(receiver: &mut broadcast::Receiver<BootstrapperEvent>) -> Vec<BootstrapperEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

fn state_changes(events: &[BootstrapperEvent]) -> Vec<BootstrapperState> {
    events
        .iter()
        .filter_map(|event| match event {
            BootstrapperEvent::StateChanged { state } => Some(*state),
            _ => None,
        })
        .collect()
}

fn time_requests(events: &[BootstrapperEvent]) -> Vec<Duration> {
    events
        .iter()
        .filter_map(|event| match event {
            BootstrapperEvent::AdditionalTimeRequested { duration } => Some(*duration),
            _ => None,
        })
        .collect()
}

async fn wait_for_state(
    receiver: &mut broadcast::Receiver<BootstrapperEvent>,
    expected: BootstrapperState,
) {
    loop {
        let event = timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("timed out waiting for state change")
            .unwrap();
        if event == (BootstrapperEvent::StateChanged { state: expected }) {
            return;
        }
    }
}

#[tokio::test]
async fn test_new_bootstrapper_is_stopped() {
    let bootstrapper = build(vec![instant("a")]);

    assert_eq!(bootstrapper.state(), BootstrapperState::Stopped);
    assert_eq!(bootstrapper.additional_time(), DEFAULT_ADDITIONAL_TIME);
}

#[tokio::test]
async fn test_startup_then_shutdown() {
    let a = instant("a");
    let b = instant("b");
    let bootstrapper = build(vec![a.clone(), b.clone()]);
    let mut events = bootstrapper.subscribe();
    let cancel = CancellationToken::new();

    assert!(bootstrapper.begin_startup(&cancel).await.unwrap());
    assert_eq!(bootstrapper.state(), BootstrapperState::Started);
    assert!(a.is_started() && b.is_started());

    assert_eq!(
        drain(&mut events),
        vec![
            BootstrapperEvent::StateChanged {
                state: BootstrapperState::Starting
            },
            BootstrapperEvent::AdditionalTimeRequested {
                duration: DEFAULT_ADDITIONAL_TIME
            },
            BootstrapperEvent::StateChanged {
                state: BootstrapperState::Started
            },
        ]
    );

    assert!(bootstrapper.begin_shutdown(&cancel).await.unwrap());
    assert_eq!(bootstrapper.state(), BootstrapperState::Stopped);
    assert!(!a.is_started() && !b.is_started());
    assert_eq!(
        state_changes(&drain(&mut events)),
        vec![BootstrapperState::Stopping, BootstrapperState::Stopped]
    );
}

#[tokio::test]
async fn test_restart_after_shutdown() {
    let bootstrapper = build(vec![instant("a")]);
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        assert!(bootstrapper.begin_startup(&cancel).await.unwrap());
        assert!(bootstrapper.begin_shutdown(&cancel).await.unwrap());
    }
    assert_eq!(bootstrapper.state(), BootstrapperState::Stopped);
}

#[tokio::test]
async fn test_double_startup_is_rejected() {
    let bootstrapper = build(vec![instant("a")]);
    let cancel = CancellationToken::new();
    bootstrapper.begin_startup(&cancel).await.unwrap();
    let mut events = bootstrapper.subscribe();

    let error = bootstrapper.begin_startup(&cancel).await.unwrap_err();

    match error {
        BootstrapError::InvalidState { expected, found } => {
            assert_eq!(expected, BootstrapperState::Stopped);
            assert_eq!(found, BootstrapperState::Started);
        }
        other => panic!("expected invalid state, got {}", other),
    }
    assert_eq!(bootstrapper.state(), BootstrapperState::Started);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_shutdown_before_startup_is_rejected() {
    let bootstrapper = build(vec![instant("a")]);

    let error = bootstrapper
        .begin_shutdown(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        BootstrapError::InvalidState {
            expected: BootstrapperState::Started,
            found: BootstrapperState::Stopped,
        }
    ));
    assert_eq!(bootstrapper.state(), BootstrapperState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transition_during_startup_is_rejected() {
    let bootstrapper = Arc::new(build(vec![delayed(
        UnitDeclaration::new("slow"),
        Duration::from_millis(200),
    )]));
    let mut events = bootstrapper.subscribe();

    let running = {
        let bootstrapper = Arc::clone(&bootstrapper);
        tokio::spawn(async move { bootstrapper.begin_startup(&CancellationToken::new()).await })
    };
    wait_for_state(&mut events, BootstrapperState::Starting).await;

    let cancel = CancellationToken::new();
    let shutdown = bootstrapper.begin_shutdown(&cancel).await.unwrap_err();
    assert!(matches!(
        shutdown,
        BootstrapError::InvalidState {
            found: BootstrapperState::Starting,
            ..
        }
    ));
    assert!(bootstrapper.begin_startup(&cancel).await.unwrap_err().is_invalid_state());

    assert!(running.await.unwrap().unwrap());
    assert_eq!(bootstrapper.state(), BootstrapperState::Started);
}

#[tokio::test(start_paused = true)]
async fn test_additional_time_requested_while_running() {
    let bootstrapper = build(vec![delayed(
        UnitDeclaration::new("slow"),
        Duration::from_secs(23),
    )]);
    bootstrapper.set_additional_time(Duration::from_secs(10));
    let mut events = bootstrapper.subscribe();

    assert!(bootstrapper
        .begin_startup(&CancellationToken::new())
        .await
        .unwrap());

    // Once up front, then at 5, 10, 15 and 20 seconds
    let requests = time_requests(&drain(&mut events));
    assert_eq!(requests.len(), 5);
    assert!(requests.iter().all(|d| *d == Duration::from_secs(10)));
}

#[tokio::test(start_paused = true)]
async fn test_zero_additional_time_does_not_spin() {
    let bootstrapper = build(vec![delayed(
        UnitDeclaration::new("slow"),
        Duration::from_millis(20),
    )]);
    bootstrapper.set_additional_time(Duration::ZERO);
    let mut events = bootstrapper.subscribe();

    assert!(bootstrapper
        .begin_startup(&CancellationToken::new())
        .await
        .unwrap());

    let requests = time_requests(&drain(&mut events)).len();
    assert!(requests > 1);
    assert!(requests <= 21);
}

#[tokio::test]
async fn test_failed_startup_faults() {
    let healthy = instant("healthy");
    let bootstrapper = build(vec![
        failing("first", true, false),
        failing("second", true, false),
        healthy.clone(),
    ]);
    let mut events = bootstrapper.subscribe();
    let cancel = CancellationToken::new();

    assert!(!bootstrapper.begin_startup(&cancel).await.unwrap());

    assert_eq!(bootstrapper.state(), BootstrapperState::Faulted);
    assert!(healthy.is_started());
    assert_eq!(
        state_changes(&drain(&mut events)),
        vec![BootstrapperState::Starting, BootstrapperState::Faulted]
    );

    assert!(bootstrapper.begin_startup(&cancel).await.unwrap_err().is_invalid_state());
    assert!(bootstrapper.begin_shutdown(&cancel).await.unwrap_err().is_invalid_state());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_failure_skips_dependents() {
    let journal = ActivityJournal::new();
    let broken = SimulatedHandler::new("a".into())
        .failing(true, false)
        .with_journal(Arc::clone(&journal));
    let bootstrapper = build(vec![
        Arc::new(SimulatedUnit::new(UnitDeclaration::new("a"), broken)),
        Arc::new(SimulatedUnit::journaled(
            UnitDeclaration::builder("b").start_after("a").build(),
            Duration::ZERO,
            Arc::clone(&journal),
        )),
    ]);

    assert!(!bootstrapper
        .begin_startup(&CancellationToken::new())
        .await
        .unwrap());

    assert!(journal
        .position(&Activity::Began("b".into(), Direction::Startup))
        .is_none());
}

#[tokio::test]
async fn test_failed_shutdown_faults() {
    let bootstrapper = build(vec![failing("a", false, true), instant("b")]);
    let cancel = CancellationToken::new();

    assert!(bootstrapper.begin_startup(&cancel).await.unwrap());
    assert!(!bootstrapper.begin_shutdown(&cancel).await.unwrap());
    assert_eq!(bootstrapper.state(), BootstrapperState::Faulted);
}

#[tokio::test]
async fn test_cancelled_before_startup() {
    let a = instant("a");
    let bootstrapper = build(vec![a.clone()]);
    let mut events = bootstrapper.subscribe();
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(!bootstrapper.begin_startup(&cancel).await.unwrap());

    assert_eq!(bootstrapper.state(), BootstrapperState::Stopped);
    assert!(!a.is_started());
    assert!(drain(&mut events).is_empty());

    // A later, uncancelled attempt proceeds normally
    assert!(bootstrapper
        .begin_startup(&CancellationToken::new())
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_startup() {
    let journal = ActivityJournal::new();
    let bootstrapper = Arc::new(build(vec![
        Arc::new(SimulatedUnit::journaled(
            UnitDeclaration::new("a"),
            Duration::from_millis(50),
            Arc::clone(&journal),
        )),
        Arc::new(SimulatedUnit::journaled(
            UnitDeclaration::builder("b").start_after("a").build(),
            Duration::from_millis(50),
            Arc::clone(&journal),
        )),
    ]));
    let cancel = CancellationToken::new();

    let running = {
        let bootstrapper = Arc::clone(&bootstrapper);
        let cancel = cancel.clone();
        tokio::spawn(async move { bootstrapper.begin_startup(&cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    assert!(!running.await.unwrap().unwrap());
    assert_eq!(bootstrapper.state(), BootstrapperState::Faulted);
    assert!(journal
        .position(&Activity::Began("b".into(), Direction::Startup))
        .is_none());
}

/// Cancels the host's token from inside its own start, then succeeds
struct CancelsHost(CancellationToken);

#[async_trait::async_trait]
impl UnitHandler for CancelsHost {
    async fn on_start(&self, _cancel: &CancellationToken) -> Result<(), UnitError> {
        self.0.cancel();
        Ok(())
    }

    async fn on_stop(&self, _cancel: &CancellationToken) -> Result<(), UnitError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_cancelled_between_steps_settles_started() {
    let cancel = CancellationToken::new();
    let first = Arc::new(ManagedInitializer::new(
        UnitDeclaration::new("first"),
        CancelsHost(cancel.clone()),
    ));
    let second = Arc::new(SimulatedUnit::instant(
        UnitDeclaration::builder("second")
            .start_after("first")
            .stop_placement(Placement::Last)
            .build(),
    ));
    let bootstrapper = build(vec![
        first.clone() as Arc<dyn Initializer>,
        second.clone(),
    ]);
    let mut events = bootstrapper.subscribe();

    assert!(!bootstrapper.begin_startup(&cancel).await.unwrap());

    assert_eq!(bootstrapper.state(), BootstrapperState::Started);
    assert!(first.is_started());
    assert!(!second.is_started());
    assert_eq!(
        state_changes(&drain(&mut events)),
        vec![BootstrapperState::Starting, BootstrapperState::Started]
    );

    // Whatever did start can still be shut down
    bootstrapper
        .begin_shutdown(&CancellationToken::new())
        .await
        .unwrap();
    assert!(!first.is_started());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_startup_faults() {
    let a = delayed(UnitDeclaration::new("a"), Duration::from_secs(60));
    let b = delayed(UnitDeclaration::new("b"), Duration::from_secs(60));
    let bootstrapper = build(vec![a.clone(), b.clone()]);
    let mut events = bootstrapper.subscribe();
    let cancel = CancellationToken::new();

    let abandoned = timeout(Duration::from_secs(1), bootstrapper.begin_startup(&cancel)).await;
    assert!(abandoned.is_err());

    assert_eq!(bootstrapper.state(), BootstrapperState::Faulted);
    assert_eq!(
        state_changes(&drain(&mut events)),
        vec![BootstrapperState::Starting, BootstrapperState::Faulted]
    );

    // Detached parallel steps see the cancellation instead of finishing later
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(!a.is_started() && !b.is_started());

    match bootstrapper.begin_startup(&cancel).await.unwrap_err() {
        BootstrapError::InvalidState { found, .. } => {
            assert_eq!(found, BootstrapperState::Faulted)
        }
        other => panic!("expected invalid state, got {}", other),
    }
}

#[tokio::test]
async fn test_busy_transition_lock_is_reported() {
    let bootstrapper = build(vec![instant("a")]);
    let mut events = bootstrapper.subscribe();

    let held = bootstrapper.transition_lock.try_lock().unwrap();
    let error = bootstrapper
        .begin_startup(&CancellationToken::new())
        .await
        .unwrap_err();
    drop(held);

    assert!(matches!(
        error,
        BootstrapError::TransitionInProgress {
            requested: Direction::Startup
        }
    ));
    assert!(error.is_invalid_state());
    assert_eq!(bootstrapper.state(), BootstrapperState::Stopped);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_example_scenario() {
    let journal = ActivityJournal::new();
    let unit = |declaration| -> Arc<dyn Initializer> {
        Arc::new(SimulatedUnit::journaled(
            declaration,
            Duration::from_millis(5),
            Arc::clone(&journal),
        ))
    };
    let bootstrapper = build(vec![
        unit(UnitDeclaration::new("A")),
        unit(UnitDeclaration::builder("B").start_after("A").build()),
        unit(
            UnitDeclaration::builder("C")
                .start_placement(Placement::Ending)
                .build(),
        ),
    ]);

    assert_eq!(
        bootstrapper.startup_process().unwrap().shape().to_string(),
        "Sequential(Sequential(A, B), C)"
    );
    assert!(bootstrapper
        .begin_startup(&CancellationToken::new())
        .await
        .unwrap());

    assert_eq!(
        journal.finished_units(Direction::Startup),
        vec![UnitId::from("A"), UnitId::from("B"), UnitId::from("C")]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_follows_stop_declarations() {
    let journal = ActivityJournal::new();
    let unit = |declaration| -> Arc<dyn Initializer> {
        Arc::new(SimulatedUnit::journaled(
            declaration,
            Duration::from_millis(5),
            Arc::clone(&journal),
        ))
    };
    let bootstrapper = build(vec![
        unit(UnitDeclaration::builder("database").stop_after("api").build()),
        unit(UnitDeclaration::new("api")),
        unit(
            UnitDeclaration::builder("metrics")
                .stop_placement(Placement::Last)
                .build(),
        ),
    ]);
    let cancel = CancellationToken::new();

    assert!(bootstrapper.begin_startup(&cancel).await.unwrap());
    assert!(bootstrapper.begin_shutdown(&cancel).await.unwrap());

    let finished_api = journal
        .position(&Activity::Finished("api".into(), Direction::Shutdown))
        .unwrap();
    let began_database = journal
        .position(&Activity::Began("database".into(), Direction::Shutdown))
        .unwrap();
    assert!(finished_api < began_database);
    assert_eq!(
        journal.finished_units(Direction::Shutdown).last(),
        Some(&UnitId::from("metrics"))
    );
}

#[tokio::test]
async fn test_cyclic_plan_is_an_error() {
    let bootstrapper = build(vec![
        Arc::new(SimulatedUnit::instant(
            UnitDeclaration::builder("a").start_after("b").build(),
        )),
        Arc::new(SimulatedUnit::instant(
            UnitDeclaration::builder("b").start_after("a").build(),
        )),
    ]);
    let mut events = bootstrapper.subscribe();

    let error = bootstrapper
        .begin_startup(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, BootstrapError::CyclicDependency { .. }));
    assert_eq!(bootstrapper.state(), BootstrapperState::Stopped);
    assert!(drain(&mut events).is_empty());
}

#[test]
fn test_plans_are_built_once() {
    let bootstrapper = build(vec![instant("a"), instant("b")]);

    let first = bootstrapper.startup_process().unwrap();
    let second = bootstrapper.startup_process().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert_eq!(
        bootstrapper.shutdown_process().unwrap().shape(),
        ProcessShape::Parallel(vec![ProcessShape::single("a"), ProcessShape::single("b")])
    );
}

#[test]
fn test_state_display() {
    assert_eq!(BootstrapperState::Faulted.to_string(), "Faulted");
    assert!(BootstrapperState::Stopping.is_transient());
    assert!(!BootstrapperState::Started.is_transient());
}
