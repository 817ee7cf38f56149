//! Completion tracking against the in-memory store.

mod common;

use uuid::Uuid;

use rota_core::store::{Clock, FixedClock};
use rota_core::{NotFoundKind, RescheduleScope, ScheduleError};

use common::*;

#[tokio::test]
async fn complete_and_reopen() {
    let fx = Fixture::new(template(vec![(1, vec![squat()])])).await;
    fx.scheduler
        .ensure_generated(fx.plan.id, d(2025, 1, 6), d(2025, 1, 6))
        .await
        .unwrap();
    let inst = fx.instance_on(d(2025, 1, 6), "squat").await;

    let done = fx.scheduler.mark_completed(inst.id).await.unwrap();
    assert!(done.completed);
    assert_eq!(done.completed_at, Some(FixedClock::on(d(2025, 1, 6)).now()));
    assert_eq!(done.date, inst.date);

    let reopened = fx.scheduler.mark_incomplete(inst.id).await.unwrap();
    assert!(!reopened.completed);
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn transitions_are_idempotent() {
    let fx = Fixture::new(template(vec![(1, vec![squat()])])).await;
    fx.scheduler
        .ensure_generated(fx.plan.id, d(2025, 1, 6), d(2025, 1, 6))
        .await
        .unwrap();
    let inst = fx.instance_on(d(2025, 1, 6), "squat").await;

    let once = fx.scheduler.mark_completed(inst.id).await.unwrap();
    let twice = fx.scheduler.mark_completed(inst.id).await.unwrap();
    assert_eq!(once, twice);

    let open = fx.scheduler.mark_incomplete(inst.id).await.unwrap();
    let still_open = fx.scheduler.mark_incomplete(inst.id).await.unwrap();
    assert_eq!(open, still_open);

    // Never-completed instances are returned unchanged.
    assert_eq!(fx.scheduler.mark_incomplete(inst.id).await.unwrap(), open);
}

#[tokio::test]
async fn missing_instance_is_not_found() {
    let fx = Fixture::new(template(vec![])).await;
    let id = Uuid::new_v4();
    for result in [
        fx.scheduler.mark_completed(id).await,
        fx.scheduler.mark_incomplete(id).await,
    ] {
        assert!(matches!(
            result,
            Err(ScheduleError::NotFound(NotFoundKind::Instance(missing))) if missing == id
        ));
    }
}

#[tokio::test]
async fn tombstones_cannot_be_completed() {
    let fx = Fixture::new(template(vec![(3, vec![squat()])])).await;
    fx.scheduler
        .ensure_generated(fx.plan.id, d(2025, 1, 8), d(2025, 1, 8))
        .await
        .unwrap();
    let inst = fx.instance_on(d(2025, 1, 8), "squat").await;
    let tombstone = fx
        .scheduler
        .reschedule(inst.id, d(2025, 1, 9), RescheduleScope::ThisWeek)
        .await
        .unwrap()
        .tombstone
        .unwrap();

    let err = fx.scheduler.mark_completed(tombstone.id).await.unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));
    assert!(!fx.scheduler.get_instance(tombstone.id).await.unwrap().completed);
}

#[tokio::test]
async fn reopened_instance_can_be_rescheduled_again() {
    let fx = Fixture::new(template(vec![(1, vec![squat()])])).await;
    fx.scheduler
        .ensure_generated(fx.plan.id, d(2025, 1, 6), d(2025, 1, 6))
        .await
        .unwrap();
    let inst = fx.instance_on(d(2025, 1, 6), "squat").await;

    fx.scheduler.mark_completed(inst.id).await.unwrap();
    let blocked = fx
        .scheduler
        .reschedule(inst.id, d(2025, 1, 7), RescheduleScope::ThisWeek)
        .await;
    assert!(matches!(blocked, Err(ScheduleError::Validation(_))));

    fx.scheduler.mark_incomplete(inst.id).await.unwrap();
    let moved = fx
        .scheduler
        .reschedule(inst.id, d(2025, 1, 7), RescheduleScope::ThisWeek)
        .await
        .unwrap();
    assert_eq!(moved.instance.date, d(2025, 1, 7));
}
