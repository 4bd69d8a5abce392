//! Multi-frame dataflow scenarios.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use lunar::{
    request, DestroyPolicy, FutureId, Payload, RunOutcome, RuntimeError, Scheduler,
    SchedulerConfig, Signal,
};

#[test]
fn test_fan_out_readers_all_see_value() {
    let mut scheduler = Scheduler::new();
    let value = scheduler.create_future().unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for _ in 0..5 {
        scheduler.spawn(
            move |cx, seen: &mut Rc<RefCell<Vec<i64>>>| {
                seen.borrow_mut().push(request!(cx, value).as_long()?);
                Ok(Signal::Done)
            },
            seen.clone(),
        );
    }
    scheduler.spawn(
        move |cx, _: &mut ()| {
            cx.submit(value, 9i64)?;
            Ok(Signal::Done)
        },
        (),
    );

    let report = scheduler.run();
    assert_eq!(report.completed, 6);
    assert_eq!(*seen.borrow(), vec![9; 5]);
    assert_eq!(scheduler.stats().wakes, 5);
}

#[test]
fn test_join_waits_for_both_inputs() {
    let mut scheduler = Scheduler::new();
    let left = scheduler.create_future().unwrap();
    let right = scheduler.create_future().unwrap();
    let out = scheduler.create_future().unwrap();

    scheduler.spawn(
        move |cx, _: &mut ()| {
            let a = request!(cx, left).as_double()?;
            let b = request!(cx, right).as_double()?;
            cx.submit(out, a * b)?;
            Ok(Signal::Done)
        },
        (),
    );
    scheduler.spawn(
        move |cx, _: &mut ()| {
            cx.submit(right, 4.0)?;
            Ok(Signal::Continue)
        },
        (),
    );

    // The producer of `right` resubmits on its second step and fails there.
    scheduler.submit(left, 0.5).unwrap();
    let report = scheduler.run();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        report.failed[0].reason,
        RuntimeError::AlreadyCompleted(right).to_string()
    );
    assert_eq!(scheduler.read(out), Ok(Some(Payload::Double(2.0))));
}

#[test]
fn test_chain_of_stages() {
    let mut scheduler = Scheduler::new();
    let ids: Vec<FutureId> = (0..=10)
        .map(|_| scheduler.create_future().unwrap())
        .collect();

    // Spawned in reverse so every stage suspends before its input exists.
    for stage in (0..10).rev() {
        let (input, output) = (ids[stage], ids[stage + 1]);
        scheduler.spawn(
            move |cx, _: &mut ()| {
                let value = request!(cx, input).as_int()?;
                cx.submit(output, value * 2)?;
                Ok(Signal::Done)
            },
            (),
        );
    }
    scheduler.submit(ids[0], 1).unwrap();

    let report = scheduler.run();
    assert_eq!(report.outcome, RunOutcome::Idle);
    assert_eq!(scheduler.read(ids[10]), Ok(Some(Payload::Int(1024))));
}

#[test]
fn test_opaque_payload_passes_through() {
    let mut scheduler = Scheduler::new();
    let value = scheduler.create_future().unwrap();
    let out = scheduler.create_future().unwrap();

    scheduler.spawn(
        move |cx, _: &mut ()| {
            let words = request!(cx, value).downcast::<Vec<String>>()?;
            cx.submit(out, words.len() as i32)?;
            Ok(Signal::Done)
        },
        (),
    );
    scheduler
        .submit(value, Payload::Opaque(Arc::new(vec!["a".to_string(), "b".to_string()])))
        .unwrap();

    scheduler.run();
    assert_eq!(scheduler.read(out), Ok(Some(Payload::Int(2))));
}

#[test]
fn test_identifier_reuse_after_destroy() {
    let mut scheduler = Scheduler::new();
    let first = scheduler.create_future().unwrap();
    scheduler.submit(first, 1).unwrap();
    scheduler.destroy(first).unwrap();

    let second = scheduler.create_future().unwrap();
    assert_eq!(second, first);
    assert_eq!(scheduler.read(second), Ok(None));
}

#[test]
fn test_abandon_policy_end_to_end() {
    let mut scheduler = Scheduler::with_config(SchedulerConfig {
        destroy_policy: DestroyPolicy::Abandon,
        ..Default::default()
    });
    let value = scheduler.create_future().unwrap();

    let waiting = scheduler.spawn(
        move |cx, _: &mut ()| {
            request!(cx, value);
            Ok(Signal::Done)
        },
        (),
    );
    scheduler.step();
    scheduler.destroy(value).unwrap();

    let report = scheduler.run();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].frame, waiting);
    assert!(report.suspended.is_empty());
}
