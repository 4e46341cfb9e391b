use chrono::NaiveDate;
use daybook::core::error::DaybookError;
use daybook::engine::model::{
    Goal, GoalId, NewGoal, NewTask, Priority, ProgressRate, Task, UserId,
};
use daybook::engine::persistence::{MemoryReportStore, ReportStore};
use daybook::engine::tasks;
use daybook::engine::{
    BacklogPolicy, ScanOptions, apply_pending, discard_candidates, execute_carry_over,
    scan_for_carry_over,
};

fn jan(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
}

fn user() -> UserId {
    UserId::from("mika")
}

fn seed(
    store: &mut MemoryReportStore,
    date: NaiveDate,
    tasks: &[(&str, i64, Option<&GoalId>)],
) -> Vec<Task> {
    let report = store.create_report(&user(), date).expect("create report");
    tasks
        .iter()
        .map(|(title, progress, goal)| {
            let mut new_task = NewTask::titled(*title);
            new_task.progress_rate = ProgressRate::clamped(*progress);
            new_task.goal_id = goal.cloned();
            let task = new_task.into_task(&report.id).expect("valid task");
            store.insert_task(&task).expect("insert task");
            task
        })
        .collect()
}

fn titles(store: &MemoryReportStore, date: NaiveDate) -> Vec<String> {
    store
        .get_report(&user(), date)
        .expect("read")
        .map(|r| r.tasks.into_iter().map(|t| t.title).collect())
        .unwrap_or_default()
}

#[test]
fn unfinished_tasks_move_to_the_next_day_with_progress_reset() {
    let mut store = MemoryReportStore::new();
    seed(
        &mut store,
        jan(10),
        &[("write tests", 40, None), ("review", 70, None), ("deploy", 100, None)],
    );

    let mut pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    assert_eq!(pending.len(), 2);
    assert!(pending.candidates.iter().all(|c| c.origin_date == jan(10)));

    let report = apply_pending(&mut store, &mut pending, jan(11)).expect("apply");
    assert!(pending.is_empty());
    assert_eq!(report.report_date, jan(11));
    assert_eq!(report.tasks.len(), 2);
    assert!(report.tasks.iter().all(|t| t.progress_rate == ProgressRate::ZERO));
    assert!(report.tasks.iter().all(|t| t.daily_report_id == report.id));

    assert_eq!(titles(&store, jan(10)), vec!["deploy".to_string()]);
}

#[test]
fn each_carried_task_lives_in_exactly_one_report() {
    let mut store = MemoryReportStore::new();
    let seeded = seed(&mut store, jan(10), &[("a", 10, None), ("b", 20, None)]);
    let pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    execute_carry_over(&mut store, &user(), &pending.candidates, jan(11)).expect("execute");

    let reports = store
        .get_reports_between(&user(), jan(1), jan(31))
        .expect("history");
    for task in &seeded {
        let holders = reports.iter().filter(|r| r.contains_task(&task.id)).count();
        assert_eq!(holders, 1, "task {} held by {} reports", task.id, holders);
    }

    let rescan =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("rescan");
    assert!(rescan.is_empty());
}

#[test]
fn mid_batch_failure_restores_everything_already_moved() {
    let mut store = MemoryReportStore::new();
    seed(
        &mut store,
        jan(10),
        &[("one", 10, None), ("two", 20, None), ("three", 30, None)],
    );
    let mut pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");

    store.fail_reassign_on_call(3);
    let err = apply_pending(&mut store, &mut pending, jan(11)).expect_err("injected failure");
    assert!(err.is_persistence_failure());

    // The caller's list survives the failure.
    assert_eq!(pending.len(), 3);

    // Same tasks, same order, same progress.
    let origin = store.get_report(&user(), jan(10)).expect("read").expect("origin");
    assert_eq!(titles(&store, jan(10)), vec!["one", "two", "three"]);
    let progress: Vec<u8> = origin.tasks.iter().map(|t| t.progress_rate.value()).collect();
    assert_eq!(progress, vec![10, 20, 30]);
    assert!(titles(&store, jan(11)).is_empty());

    // Retrying with the same list now succeeds.
    let report = apply_pending(&mut store, &mut pending, jan(11)).expect("retry");
    assert_eq!(report.tasks.len(), 3);
}

#[test]
fn progress_changed_since_scan_is_a_conflict_with_no_writes() {
    let mut store = MemoryReportStore::new();
    let seeded = seed(&mut store, jan(10), &[("a", 10, None), ("b", 20, None)]);
    let pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");

    let mut edited = seeded[1].clone();
    edited.progress_rate = ProgressRate::clamped(60);
    store.update_task(&edited).expect("concurrent edit");
    let calls_before = store.reassign_calls();

    let err = execute_carry_over(&mut store, &user(), &pending.candidates, jan(11))
        .expect_err("stale candidates");
    assert!(err.is_conflict(), "unexpected error: {}", err);
    assert_eq!(store.reassign_calls(), calls_before);
    assert_eq!(titles(&store, jan(10)).len(), 2);
}

#[test]
fn rollback_keeps_finished_tasks_in_place_between_carried_ones() {
    let mut store = MemoryReportStore::new();
    seed(
        &mut store,
        jan(10),
        &[("a", 10, None), ("done", 100, None), ("b", 20, None), ("c", 30, None)],
    );
    let pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");

    store.fail_reassign_on_call(3);
    execute_carry_over(&mut store, &user(), &pending.candidates, jan(11))
        .expect_err("injected failure");
    assert_eq!(titles(&store, jan(10)), vec!["a", "done", "b", "c"]);
}

#[test]
fn task_already_carried_elsewhere_is_a_conflict() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(10), &[("a", 10, None)]);
    let mut first =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    let mut stale = first.clone();
    apply_pending(&mut store, &mut first, jan(11)).expect("first apply");
    let calls_before = store.reassign_calls();

    let err = apply_pending(&mut store, &mut stale, jan(11)).expect_err("task moved");
    assert!(err.is_conflict(), "unexpected error: {}", err);
    assert_eq!(store.reassign_calls(), calls_before);
    assert_eq!(stale.len(), 1);
    assert_eq!(titles(&store, jan(11)), vec!["a"]);
}

#[test]
fn task_dismissed_after_scan_is_a_conflict() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(10), &[("a", 10, None), ("b", 20, None)]);
    let pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    store
        .dismiss_tasks(&user(), &pending.task_ids()[..1], jan(11))
        .expect("dismiss");

    let err = execute_carry_over(&mut store, &user(), &pending.candidates, jan(11))
        .expect_err("dismissed");
    assert!(err.is_conflict(), "unexpected error: {}", err);
    assert_eq!(store.reassign_calls(), 0);
    assert_eq!(titles(&store, jan(10)), vec!["a", "b"]);
}

#[test]
fn origin_report_recreated_for_the_same_day_is_a_conflict() {
    let mut scanned = MemoryReportStore::new();
    seed(&mut scanned, jan(10), &[("a", 10, None)]);
    let pending =
        scan_for_carry_over(&scanned, &user(), jan(11), ScanOptions::default()).expect("scan");

    // Same day and title, different report and task ids.
    let mut current = MemoryReportStore::new();
    seed(&mut current, jan(10), &[("a", 10, None)]);

    let err = execute_carry_over(&mut current, &user(), &pending.candidates, jan(11))
        .expect_err("replaced origin");
    assert!(err.is_conflict(), "unexpected error: {}", err);
    assert!(current.get_report(&user(), jan(11)).expect("read").is_none());
}

#[test]
fn backward_carry_over_is_rejected() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(10), &[("a", 10, None)]);
    let pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");

    let err = execute_carry_over(&mut store, &user(), &pending.candidates, jan(9))
        .expect_err("backwards");
    assert!(matches!(err, DaybookError::ValidationError(_)));
}

#[test]
fn discarding_twice_is_the_same_as_once() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(10), &[("a", 10, None), ("b", 0, None)]);
    let mut pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");

    assert_eq!(discard_candidates(&mut store, &mut pending, jan(11)).expect("discard"), 2);
    assert_eq!(discard_candidates(&mut store, &mut pending, jan(11)).expect("again"), 0);
    assert_eq!(store.dismissed_task_ids(&user()).expect("dismissed").len(), 2);

    // Tasks stay where they were and no longer show up.
    assert_eq!(titles(&store, jan(10)).len(), 2);
    let rescan =
        scan_for_carry_over(&store, &user(), jan(12), ScanOptions::default()).expect("rescan");
    assert!(rescan.is_empty());
}

#[test]
fn discarding_the_newest_backlog_does_not_surface_older_reports() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(9), &[("older", 20, None)]);
    seed(&mut store, jan(10), &[("recent", 50, None)]);

    let mut pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    let found: Vec<&str> = pending
        .candidates
        .iter()
        .map(|c| c.task.title.as_str())
        .collect();
    assert_eq!(found, vec!["recent"]);

    discard_candidates(&mut store, &mut pending, jan(11)).expect("discard");
    let rescan =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("rescan");
    assert!(rescan.is_empty(), "resurfaced: {:?}", rescan.task_ids());
}

#[test]
fn most_recent_policy_only_offers_the_newest_closed_report() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(8), &[("old", 10, None)]);
    seed(&mut store, jan(10), &[("recent", 50, None)]);

    let pending =
        scan_for_carry_over(&store, &user(), jan(12), ScanOptions::default()).expect("scan");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending.candidates[0].task.title, "recent");
    assert_eq!(pending.candidates[0].origin_date, jan(10));
}

#[test]
fn accumulate_policy_collects_the_whole_backlog_newest_first() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(8), &[("old", 10, None)]);
    seed(&mut store, jan(9), &[("done", 100, None)]);
    seed(&mut store, jan(10), &[("recent", 50, None)]);

    let options = ScanOptions {
        backlog: BacklogPolicy::Accumulate,
        ..ScanOptions::default()
    };
    let mut pending = scan_for_carry_over(&store, &user(), jan(12), options).expect("scan");
    let found: Vec<&str> = pending
        .candidates
        .iter()
        .map(|c| c.task.title.as_str())
        .collect();
    assert_eq!(found, vec!["recent", "old"]);

    let report = apply_pending(&mut store, &mut pending, jan(12)).expect("apply");
    assert_eq!(report.tasks.len(), 2);
    assert_eq!(titles(&store, jan(9)), vec!["done".to_string()]);
}

#[test]
fn scan_limit_bounds_history_read() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(5), &[("too old", 10, None)]);
    seed(&mut store, jan(9), &[("finished", 100, None)]);
    seed(&mut store, jan(10), &[("finished too", 100, None)]);

    let options = ScanOptions {
        scan_limit: 2,
        backlog: BacklogPolicy::MostRecent,
    };
    let pending = scan_for_carry_over(&store, &user(), jan(11), options).expect("scan");
    assert!(pending.is_empty());

    let wide = scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    assert_eq!(wide.len(), 1);
}

#[test]
fn todays_report_never_contributes_candidates() {
    let mut store = MemoryReportStore::new();
    seed(&mut store, jan(11), &[("in flight", 30, None)]);
    let pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    assert!(pending.is_empty());
}

#[test]
fn carried_goal_tasks_recompute_the_goal() {
    let mut store = MemoryReportStore::new();
    let goal = tasks::create_goal(
        &mut store,
        &user(),
        NewGoal {
            title: "ship v1".into(),
            target_date: None,
            priority: Priority::High,
        },
    )
    .expect("goal");
    seed(
        &mut store,
        jan(10),
        &[("half", 50, Some(&goal.id)), ("done", 100, Some(&goal.id))],
    );
    tasks::recompute_goal_progress(&mut store, &goal.id).expect("recompute");
    assert_eq!(
        store.get_goal(&goal.id).expect("read").expect("goal").progress_rate,
        ProgressRate::clamped(75)
    );

    let mut pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    apply_pending(&mut store, &mut pending, jan(11)).expect("apply");

    // 0 (carried, reset) and 100 (stayed behind) average to 50.
    assert_eq!(
        store.get_goal(&goal.id).expect("read").expect("goal").progress_rate,
        ProgressRate::clamped(50)
    );
}

fn linked_goal(store: &mut MemoryReportStore, title: &str) -> Goal {
    tasks::create_goal(
        store,
        &user(),
        NewGoal {
            title: title.into(),
            target_date: None,
            priority: Priority::Medium,
        },
    )
    .expect("goal")
}

fn goal_progress(store: &MemoryReportStore, goal: &Goal) -> ProgressRate {
    store.get_goal(&goal.id).expect("read").expect("goal").progress_rate
}

#[test]
fn goal_recompute_failure_restores_tasks_and_goals() {
    let mut store = MemoryReportStore::new();
    let first = linked_goal(&mut store, "first");
    let second = linked_goal(&mut store, "second");
    seed(
        &mut store,
        jan(10),
        &[
            ("a", 40, Some(&first.id)),
            ("b", 60, Some(&second.id)),
            ("c", 100, Some(&first.id)),
        ],
    );
    tasks::recompute_goal_progress(&mut store, &first.id).expect("recompute");
    tasks::recompute_goal_progress(&mut store, &second.id).expect("recompute");
    assert_eq!(goal_progress(&store, &first), ProgressRate::clamped(70));
    assert_eq!(goal_progress(&store, &second), ProgressRate::clamped(60));

    let mut pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");
    assert_eq!(pending.len(), 2);

    // The first goal update goes through, the second fails.
    store.fail_goal_progress_on_call(2);
    let err = apply_pending(&mut store, &mut pending, jan(11)).expect_err("injected failure");
    assert!(err.is_persistence_failure());
    assert_eq!(pending.len(), 2);

    assert_eq!(titles(&store, jan(10)), vec!["a", "b", "c"]);
    let origin = store.get_report(&user(), jan(10)).expect("read").expect("origin");
    let progress: Vec<u8> = origin.tasks.iter().map(|t| t.progress_rate.value()).collect();
    assert_eq!(progress, vec![40, 60, 100]);
    assert!(titles(&store, jan(11)).is_empty());
    assert_eq!(goal_progress(&store, &first), ProgressRate::clamped(70));
    assert_eq!(goal_progress(&store, &second), ProgressRate::clamped(60));
}

#[test]
fn goal_deleted_after_scan_does_not_block_carry_over() {
    let mut store = MemoryReportStore::new();
    let goal = linked_goal(&mut store, "dropped");
    seed(&mut store, jan(10), &[("a", 40, Some(&goal.id))]);
    let mut pending =
        scan_for_carry_over(&store, &user(), jan(11), ScanOptions::default()).expect("scan");

    tasks::delete_goal(&mut store, &goal.id).expect("delete goal");

    let report = apply_pending(&mut store, &mut pending, jan(11)).expect("apply");
    assert_eq!(report.tasks.len(), 1);
    assert_eq!(report.tasks[0].goal_id, None);
    assert!(titles(&store, jan(10)).is_empty());
}
