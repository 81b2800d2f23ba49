use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use voras_dss::{DssError, DssKeyAccess, DynamicRun, RetryBudget};
use voras_framework::{FrameworkError, RunLifecycle, RunStatus};
use voras_kvstore::KeyValueFile;
use voras_test_utils::temp_store;

#[test]
fn only_one_engine_allocates_a_run() {
    let (_dir, store) = temp_store();
    let life = RunLifecycle::new(DynamicRun::new(Arc::clone(&store), "U7").unwrap());
    life.create().unwrap();

    let barrier = Arc::new(Barrier::new(6));
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let life = RunLifecycle::new(DynamicRun::new(store, "U7").unwrap());
                barrier.wait();
                life.transition(RunStatus::Queued, RunStatus::Allocated)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let won = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(won, 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, FrameworkError::StatusConflict { .. })));
    assert_eq!(life.status().unwrap(), Some(RunStatus::Allocated));
}

#[test]
fn concurrent_advance_to_cancelled_applies_once() {
    let (_dir, store) = temp_store();
    let life = RunLifecycle::new(DynamicRun::new(Arc::clone(&store), "U8").unwrap());
    life.create().unwrap();
    let budget = RetryBudget::new().with_pause(Duration::from_millis(1));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let life = life.clone();
            thread::spawn(move || life.advance(RunStatus::Cancelled, &budget))
        })
        .collect();

    let mut replaced_queued = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(RunStatus::Queued) => replaced_queued += 1,
            Ok(other) => panic!("replaced {other}"),
            Err(e) => assert!(matches!(e, FrameworkError::IllegalTransition { .. }), "{e}"),
        }
    }
    assert_eq!(replaced_queued, 1);
    assert_eq!(life.status().unwrap(), Some(RunStatus::Cancelled));
}

#[test]
fn runs_do_not_share_status() {
    let (_dir, store) = temp_store();
    let a = RunLifecycle::new(DynamicRun::new(Arc::clone(&store), "A").unwrap());
    let b = RunLifecycle::new(DynamicRun::new(Arc::clone(&store), "B").unwrap());
    a.create().unwrap();
    b.create().unwrap();
    a.transition(RunStatus::Queued, RunStatus::Cancelled).unwrap();

    assert_eq!(b.status().unwrap(), Some(RunStatus::Queued));
    assert_eq!(
        store.get("dss.framework.run.A.status").unwrap().as_deref(),
        Some("cancelled")
    );
}

fn running(store: &Arc<KeyValueFile>, run: &str) -> RunLifecycle {
    let life = RunLifecycle::new(DynamicRun::new(Arc::clone(store), run).unwrap());
    life.create().unwrap();
    let budget = RetryBudget::new();
    for status in [RunStatus::Allocated, RunStatus::Started, RunStatus::Running] {
        life.advance(status, &budget).unwrap();
    }
    life
}

#[test]
fn finish_writes_outcome_then_finishes() {
    let (_dir, store) = temp_store();
    let life = running(&store, "F1");

    let replaced = life
        .finish(&RetryBudget::new(), |run| {
            run.put("result", "passed")?;
            Ok(())
        })
        .unwrap();

    assert_eq!(replaced, RunStatus::Running);
    assert_eq!(life.status().unwrap(), Some(RunStatus::Finished));
    assert_eq!(
        store.get("dss.framework.run.F1.result").unwrap().as_deref(),
        Some("passed")
    );
}

#[test]
fn failed_outcome_write_cancels_the_run() {
    let (_dir, store) = temp_store();
    let life = running(&store, "F2");

    let err = life
        .finish(&RetryBudget::new(), |_| {
            Err(DssError::RetryExhausted { attempts: 1 }.into())
        })
        .unwrap_err();

    assert!(matches!(err, FrameworkError::Dss(DssError::RetryExhausted { .. })), "{err}");
    assert_eq!(life.status().unwrap(), Some(RunStatus::Cancelled));
    assert!(store.get("dss.framework.run.F2.cancelled.time").unwrap().is_some());
}
