//! Ad hoc instance management and plan-file import.

mod common;

use uuid::Uuid;

use rota_core::instances::NewAdHocInstance;
use rota_core::plan_file::parse_plan_file;
use rota_core::store::{InstanceFilter, PlanRepository};
use rota_core::{NotFoundKind, ScheduleError};

use common::*;

fn bench_on(date: chrono::NaiveDate) -> NewAdHocInstance {
    NewAdHocInstance {
        exercise_id: "bench".to_string(),
        date,
        sets: 5,
        reps: 5,
        weight: 80.0,
        weight_plates: Some(serde_json::json!([20, 10])),
        notes: Some("paused".to_string()),
    }
}

#[tokio::test]
async fn ad_hoc_instance_resolves_category() {
    let fx = Fixture::new(template(vec![])).await;
    let inst = fx.scheduler.create_ad_hoc(bench_on(d(2025, 1, 7))).await.unwrap();

    assert_eq!(inst.workout_plan_id, None);
    assert_eq!(inst.category_id, "chest");
    assert_eq!(inst.notes.as_deref(), Some("paused"));
    assert_eq!(inst.weight_plates, Some(serde_json::json!([20, 10])));
    assert!(inst.signature().is_none());
    assert_eq!(fx.scheduler.get_instance(inst.id).await.unwrap(), inst);
}

#[tokio::test]
async fn ad_hoc_instances_may_repeat() {
    let fx = Fixture::new(template(vec![])).await;
    fx.scheduler.create_ad_hoc(bench_on(d(2025, 1, 7))).await.unwrap();
    fx.scheduler.create_ad_hoc(bench_on(d(2025, 1, 7))).await.unwrap();

    let all = fx
        .scheduler
        .list_instances(d(2025, 1, 7), d(2025, 1, 7), &InstanceFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn ad_hoc_validation() {
    let fx = Fixture::new(template(vec![])).await;

    let negative = NewAdHocInstance {
        reps: -1,
        ..bench_on(d(2025, 1, 7))
    };
    assert!(matches!(
        fx.scheduler.create_ad_hoc(negative).await,
        Err(ScheduleError::Validation(_))
    ));

    let heavy = NewAdHocInstance {
        weight: -2.5,
        ..bench_on(d(2025, 1, 7))
    };
    assert!(matches!(
        fx.scheduler.create_ad_hoc(heavy).await,
        Err(ScheduleError::Validation(_))
    ));

    let unknown = NewAdHocInstance {
        exercise_id: "curl".to_string(),
        ..bench_on(d(2025, 1, 7))
    };
    assert!(matches!(
        fx.scheduler.create_ad_hoc(unknown).await,
        Err(ScheduleError::NotFound(NotFoundKind::Exercise(_)))
    ));

    assert!(fx.store.snapshot().await.is_empty());
}

#[tokio::test]
async fn listing_filters_plan_and_hidden_rows() {
    let fx = Fixture::new(template(vec![(3, vec![squat()])])).await;
    fx.scheduler
        .ensure_generated(fx.plan.id, d(2025, 1, 6), d(2025, 1, 12))
        .await
        .unwrap();
    let wednesday = fx.instance_on(d(2025, 1, 8), "squat").await;
    fx.scheduler
        .reschedule(
            wednesday.id,
            d(2025, 1, 9),
            rota_core::RescheduleScope::ThisWeek,
        )
        .await
        .unwrap();
    fx.scheduler.create_ad_hoc(bench_on(d(2025, 1, 7))).await.unwrap();

    let everything_visible = fx
        .scheduler
        .list_instances(d(2025, 1, 6), d(2025, 1, 12), &InstanceFilter::default())
        .await
        .unwrap();
    assert_eq!(
        dates_of(&everything_visible),
        vec![d(2025, 1, 7), d(2025, 1, 9)]
    );

    let with_hidden = fx
        .scheduler
        .list_instances(
            d(2025, 1, 6),
            d(2025, 1, 12),
            &InstanceFilter::plan_with_hidden(fx.plan.id),
        )
        .await
        .unwrap();
    assert_eq!(dates_of(&with_hidden), vec![d(2025, 1, 8), d(2025, 1, 9)]);

    let reversed = fx
        .scheduler
        .list_instances(d(2025, 1, 12), d(2025, 1, 6), &InstanceFilter::default())
        .await;
    assert!(matches!(reversed, Err(ScheduleError::Validation(_))));
}

#[tokio::test]
async fn delete_instance() {
    let fx = Fixture::new(template(vec![])).await;
    let inst = fx.scheduler.create_ad_hoc(bench_on(d(2025, 1, 7))).await.unwrap();

    fx.scheduler.delete_instance(inst.id).await.unwrap();
    assert!(matches!(
        fx.scheduler.get_instance(inst.id).await,
        Err(ScheduleError::NotFound(NotFoundKind::Instance(_)))
    ));
    assert!(matches!(
        fx.scheduler.delete_instance(inst.id).await,
        Err(ScheduleError::NotFound(NotFoundKind::Instance(_)))
    ));
    assert!(matches!(
        fx.scheduler.delete_instance(Uuid::new_v4()).await,
        Err(ScheduleError::NotFound(_))
    ));
}

const PUSH_PULL: &str = r#"
[plan]
name = "Push/Pull"

[[days]]
day_of_week = 1
name = "Push"

[[days.exercises]]
exercise_id = "bench"
sets = 5
reps = 5
weight = 80.0

[[days]]
day_of_week = 4
name = "Pull"

[[days.exercises]]
exercise_id = "row"
sets = 4
reps = 8
weight = 60.0
"#;

#[tokio::test]
async fn plan_file_import_then_generate() {
    let fx = Fixture::new(template(vec![])).await;
    let file = parse_plan_file(PUSH_PULL).unwrap();

    let plan = fx.scheduler.create_plan(&file).await.unwrap();
    assert_eq!(plan.name, "Push/Pull");
    assert_eq!(plan.week_start(), 1);
    assert_eq!(plan.template(), &file.to_template());

    let report = fx
        .scheduler
        .ensure_generated(plan.id, d(2025, 1, 6), d(2025, 1, 12))
        .await
        .unwrap();
    assert_eq!(report.created, 2);

    let listed = fx.store.list_plans().await.unwrap();
    assert!(listed.iter().any(|p| p.id == plan.id));
}

#[tokio::test]
async fn plan_file_with_unknown_exercises_is_rejected() {
    let fx = Fixture::new(template(vec![])).await;
    let file = parse_plan_file(&PUSH_PULL.replace("\"row\"", "\"pendlay\"")).unwrap();

    let before = fx.store.list_plans().await.unwrap().len();
    match fx.scheduler.create_plan(&file).await {
        Err(ScheduleError::Validation(msg)) => assert!(msg.contains("pendlay")),
        other => panic!("expected Validation, got {other:?}"),
    }
    assert_eq!(fx.store.list_plans().await.unwrap().len(), before);
}
