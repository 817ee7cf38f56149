//! Integration tests for `scheduled_instances` queries, including the
//! partial unique indexes that guard generation.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use rota_db::pool::{ScheduleSummary, schedule_summary};
use rota_db::queries::instances::{self, InstanceFilter, InstancePatch, NewInstance};
use rota_db::queries::{exercises, is_unique_violation, plans};
use rota_db::template::WeeklyTemplate;
use rota_test_utils::{create_test_db, drop_test_db};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

async fn seed(pool: &PgPool) -> Uuid {
    exercises::insert_exercise(pool, "squat", "Back Squat", "legs")
        .await
        .unwrap();
    plans::insert_plan(pool, "strength", 1, &WeeklyTemplate::default())
        .await
        .unwrap()
        .id
}

fn occurrence(plan_id: Option<Uuid>, date: NaiveDate) -> NewInstance {
    NewInstance {
        exercise_id: "squat".to_string(),
        category_id: "legs".to_string(),
        workout_plan_id: plan_id,
        date,
        sets: 3,
        reps: 10,
        weight: 50.0,
        weight_plates: None,
        notes: None,
        is_hidden: false,
        suppressed_sets: None,
        suppressed_reps: None,
        suppressed_weight: None,
    }
}

/// Tombstone for the 3x10 @ 50 squat slot.
fn tombstone(plan_id: Uuid, date: NaiveDate) -> NewInstance {
    NewInstance {
        sets: 0,
        reps: 0,
        weight: 0.0,
        is_hidden: true,
        suppressed_sets: Some(3),
        suppressed_reps: Some(10),
        suppressed_weight: Some(50.0),
        ..occurrence(Some(plan_id), date)
    }
}

#[tokio::test]
async fn visible_signature_is_unique_per_date() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = seed(&pool).await;

    let first = instances::insert_instance_if_absent(&pool, &occurrence(Some(plan_id), d(2025, 1, 6)))
        .await
        .unwrap();
    assert!(first.is_some());

    let second = instances::insert_instance_if_absent(&pool, &occurrence(Some(plan_id), d(2025, 1, 6)))
        .await
        .unwrap();
    assert!(second.is_none(), "duplicate should be suppressed");

    let err = instances::insert_instance(&pool, &occurrence(Some(plan_id), d(2025, 1, 6)))
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err));

    // Ad hoc rows are not constrained.
    instances::insert_instance(&pool, &occurrence(None, d(2025, 1, 6)))
        .await
        .unwrap();
    instances::insert_instance(&pool, &occurrence(None, d(2025, 1, 6)))
        .await
        .unwrap();

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn tombstone_does_not_block_visible_row() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = seed(&pool).await;

    instances::insert_instance(&pool, &tombstone(plan_id, d(2025, 1, 8)))
        .await
        .unwrap();
    let again = instances::insert_instance_if_absent(&pool, &tombstone(plan_id, d(2025, 1, 8)))
        .await
        .unwrap();
    assert!(again.is_none(), "one tombstone per slot and date");

    // A different slot of the same exercise gets its own tombstone.
    let heavy = NewInstance {
        suppressed_sets: Some(5),
        suppressed_reps: Some(5),
        suppressed_weight: Some(80.0),
        ..tombstone(plan_id, d(2025, 1, 8))
    };
    let other_slot = instances::insert_instance_if_absent(&pool, &heavy)
        .await
        .unwrap();
    assert!(other_slot.is_some());

    let visible = instances::insert_instance_if_absent(&pool, &occurrence(Some(plan_id), d(2025, 1, 8)))
        .await
        .unwrap();
    assert!(visible.is_some());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn tombstone_must_name_its_slot() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = seed(&pool).await;

    let anonymous = NewInstance {
        suppressed_sets: None,
        ..tombstone(plan_id, d(2025, 1, 8))
    };
    let result = instances::insert_instance(&pool, &anonymous).await;
    assert!(result.is_err(), "hidden rows must carry the suppressed slot");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn range_listing_respects_filters() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = seed(&pool).await;

    for day in [6, 13, 20] {
        instances::insert_instance(&pool, &occurrence(Some(plan_id), d(2025, 1, day)))
            .await
            .unwrap();
    }
    instances::insert_instance(&pool, &tombstone(plan_id, d(2025, 1, 8)))
        .await
        .unwrap();
    instances::insert_instance(&pool, &occurrence(None, d(2025, 1, 7)))
        .await
        .unwrap();

    let visible = instances::list_instances_in_range(
        &pool,
        d(2025, 1, 6),
        d(2025, 1, 13),
        &InstanceFilter::default(),
    )
    .await
    .unwrap();
    let dates: Vec<NaiveDate> = visible.iter().map(|i| i.date).collect();
    assert_eq!(dates, vec![d(2025, 1, 6), d(2025, 1, 7), d(2025, 1, 13)]);

    let plan_rows = instances::list_instances_in_range(
        &pool,
        d(2025, 1, 1),
        d(2025, 1, 31),
        &InstanceFilter::plan_with_hidden(plan_id),
    )
    .await
    .unwrap();
    assert_eq!(plan_rows.len(), 4);
    assert_eq!(plan_rows.iter().filter(|i| i.is_hidden).count(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn find_by_signature_skips_hidden_and_earlier_rows() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = seed(&pool).await;

    let first = instances::insert_instance(&pool, &occurrence(Some(plan_id), d(2025, 1, 6)))
        .await
        .unwrap();
    for day in [13, 20] {
        instances::insert_instance(&pool, &occurrence(Some(plan_id), d(2025, 1, day)))
            .await
            .unwrap();
    }
    instances::insert_instance(&pool, &tombstone(plan_id, d(2025, 1, 15)))
        .await
        .unwrap();

    let sig = first.signature().unwrap();
    let found = instances::find_by_signature(&pool, &sig, d(2025, 1, 13), None)
        .await
        .unwrap();
    let dates: Vec<NaiveDate> = found.iter().map(|i| i.date).collect();
    assert_eq!(dates, vec![d(2025, 1, 13), d(2025, 1, 20)]);

    let bounded = instances::find_by_signature(&pool, &sig, d(2025, 1, 1), Some(d(2025, 1, 13)))
        .await
        .unwrap();
    assert_eq!(bounded.len(), 2);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn update_patch_and_completion_guard() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = seed(&pool).await;

    let inst = instances::insert_instance(&pool, &occurrence(Some(plan_id), d(2025, 1, 6)))
        .await
        .unwrap();

    let done_at = Utc::now();
    let completed = instances::update_instance(
        &pool,
        inst.id,
        &InstancePatch {
            completed: Some(true),
            completed_at: Some(Some(done_at)),
            notes: Some(Some("felt heavy".to_string())),
            ..InstancePatch::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(completed.completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.notes.as_deref(), Some("felt heavy"));
    assert_eq!(completed.date, d(2025, 1, 6));

    let guarded = instances::update_instance(
        &pool,
        inst.id,
        &InstancePatch {
            require_incomplete: true,
            ..InstancePatch::move_to(d(2025, 1, 8))
        },
    )
    .await
    .unwrap();
    assert!(guarded.is_none(), "completed instance must not move");

    let reopened = instances::update_instance(
        &pool,
        inst.id,
        &InstancePatch {
            completed: Some(false),
            completed_at: Some(None),
            ..InstancePatch::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!reopened.completed);
    assert!(reopened.completed_at.is_none());
    assert_eq!(reopened.notes.as_deref(), Some("felt heavy"));

    assert!(instances::delete_instance(&pool, inst.id).await.unwrap());
    assert!(!instances::delete_instance(&pool, inst.id).await.unwrap());
    assert!(instances::get_instance(&pool, inst.id).await.unwrap().is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn schedule_summary_separates_tombstones() {
    let (pool, db_name) = create_test_db().await;
    assert_eq!(
        schedule_summary(&pool).await.unwrap(),
        ScheduleSummary::default()
    );

    let plan_id = seed(&pool).await;
    let monday = instances::insert_instance(&pool, &occurrence(Some(plan_id), d(2025, 1, 6)))
        .await
        .unwrap();
    instances::insert_instance(&pool, &occurrence(Some(plan_id), d(2025, 1, 13)))
        .await
        .unwrap();
    instances::insert_instance(&pool, &occurrence(None, d(2025, 1, 7)))
        .await
        .unwrap();
    instances::insert_instance(&pool, &tombstone(plan_id, d(2025, 1, 20)))
        .await
        .unwrap();
    let patch = InstancePatch {
        completed: Some(true),
        completed_at: Some(Some(Utc::now())),
        ..InstancePatch::default()
    };
    instances::update_instance(&pool, monday.id, &patch)
        .await
        .unwrap()
        .unwrap();

    let summary = schedule_summary(&pool).await.unwrap();
    assert_eq!(
        summary,
        ScheduleSummary {
            exercises: 1,
            plans: 1,
            instances: 3,
            completed: 1,
            ad_hoc: 1,
            tombstones: 1,
        }
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}
