use chrono::NaiveDate;
use daybook::core::error::DaybookError;
use daybook::engine::model::{
    ConditionScore, NewGoal, NewTask, Priority, ProgressRate, TaskCategory, UserId,
};
use daybook::engine::persistence::{MemoryReportStore, ReportStore};
use daybook::engine::tasks;

fn jan(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
}

fn user() -> UserId {
    UserId::from("mika")
}

fn goal(store: &mut MemoryReportStore, title: &str) -> daybook::engine::model::Goal {
    tasks::create_goal(
        store,
        &user(),
        NewGoal {
            title: title.into(),
            target_date: Some(jan(31)),
            priority: Priority::Medium,
        },
    )
    .expect("create goal")
}

#[test]
fn add_task_creates_todays_report_on_first_use() {
    let mut store = MemoryReportStore::new();
    let mut new_task = NewTask::titled("  plan sprint  ");
    new_task.category = TaskCategory::Continuous;
    new_task.estimated_time_minutes = Some(45);

    let task = tasks::add_task(&mut store, &user(), jan(10), new_task).expect("add");
    assert_eq!(task.title, "plan sprint");

    let report = store.get_report(&user(), jan(10)).expect("read").expect("report");
    assert_eq!(report.id, task.daily_report_id);
    assert_eq!(report.tasks, vec![task]);
}

#[test]
fn blank_titles_are_rejected() {
    let mut store = MemoryReportStore::new();
    let err = tasks::add_task(&mut store, &user(), jan(10), NewTask::titled("   "))
        .expect_err("blank title");
    assert!(matches!(err, DaybookError::ValidationError(_)));
}

#[test]
fn closed_reports_reject_progress_updates() {
    let mut store = MemoryReportStore::new();
    let task = tasks::add_task(&mut store, &user(), jan(10), NewTask::titled("a")).expect("add");

    let updated =
        tasks::update_task_progress(&mut store, &task.id, ProgressRate::clamped(40), jan(10))
            .expect("same day");
    assert_eq!(updated.progress_rate.value(), 40);

    let err = tasks::update_task_progress(&mut store, &task.id, ProgressRate::COMPLETE, jan(11))
        .expect_err("closed");
    assert!(matches!(err, DaybookError::ValidationError(_)));
    let stored = store.get_task(&task.id).expect("read").expect("task");
    assert_eq!(stored.progress_rate.value(), 40);
}

#[test]
fn goal_progress_follows_linked_task_updates() {
    let mut store = MemoryReportStore::new();
    let g = goal(&mut store, "learn rust");

    let mut first = NewTask::titled("chapter 1");
    first.goal_id = Some(g.id.clone());
    let first = tasks::add_task(&mut store, &user(), jan(10), first).expect("add");
    let second = tasks::add_task(&mut store, &user(), jan(10), NewTask::titled("chapter 2"))
        .expect("add");

    tasks::update_task_progress(&mut store, &first.id, ProgressRate::COMPLETE, jan(10))
        .expect("progress");
    assert_eq!(
        store.get_goal(&g.id).expect("read").expect("goal").progress_rate,
        ProgressRate::COMPLETE
    );

    tasks::link_task_goal(&mut store, &second.id, Some(g.id.clone()), jan(10)).expect("link");
    assert_eq!(
        store.get_goal(&g.id).expect("read").expect("goal").progress_rate,
        ProgressRate::clamped(50)
    );

    tasks::link_task_goal(&mut store, &second.id, None, jan(10)).expect("unlink");
    assert_eq!(
        store.get_goal(&g.id).expect("read").expect("goal").progress_rate,
        ProgressRate::COMPLETE
    );
}

#[test]
fn moving_a_task_between_goals_recomputes_both() {
    let mut store = MemoryReportStore::new();
    let a = goal(&mut store, "a");
    let b = goal(&mut store, "b");

    let mut new_task = NewTask::titled("shared");
    new_task.goal_id = Some(a.id.clone());
    new_task.progress_rate = ProgressRate::clamped(80);
    let task = tasks::add_task(&mut store, &user(), jan(10), new_task).expect("add");
    assert_eq!(store.get_goal(&a.id).unwrap().unwrap().progress_rate.value(), 80);

    tasks::link_task_goal(&mut store, &task.id, Some(b.id.clone()), jan(10)).expect("relink");
    assert_eq!(store.get_goal(&a.id).unwrap().unwrap().progress_rate.value(), 0);
    assert_eq!(store.get_goal(&b.id).unwrap().unwrap().progress_rate.value(), 80);
}

#[test]
fn linking_to_another_users_goal_is_not_found() {
    let mut store = MemoryReportStore::new();
    let foreign = tasks::create_goal(
        &mut store,
        &UserId::from("someone-else"),
        NewGoal {
            title: "theirs".into(),
            target_date: None,
            priority: Priority::Low,
        },
    )
    .expect("goal");
    let task = tasks::add_task(&mut store, &user(), jan(10), NewTask::titled("mine")).expect("add");

    let err = tasks::link_task_goal(&mut store, &task.id, Some(foreign.id), jan(10))
        .expect_err("foreign goal");
    assert!(matches!(err, DaybookError::NotFound(_)));
}

#[test]
fn deleting_a_goal_keeps_tasks_and_clears_links() {
    let mut store = MemoryReportStore::new();
    let g = goal(&mut store, "temporary");
    let mut new_task = NewTask::titled("linked");
    new_task.goal_id = Some(g.id.clone());
    let task = tasks::add_task(&mut store, &user(), jan(10), new_task).expect("add");

    let unlinked = tasks::delete_goal(&mut store, &g.id).expect("delete");
    assert_eq!(unlinked, vec![task.id.clone()]);
    assert!(store.get_goal(&g.id).expect("read").is_none());

    let stored = store.get_task(&task.id).expect("read").expect("task survives");
    assert_eq!(stored.goal_id, None);
    assert!(matches!(
        tasks::delete_goal(&mut store, &g.id),
        Err(DaybookError::NotFound(_))
    ));
}

#[test]
fn condition_score_is_only_settable_for_today() {
    let mut store = MemoryReportStore::new();
    let score = ConditionScore::try_from(7).expect("in range");

    let report = tasks::set_condition_score(&mut store, &user(), jan(10), Some(score), jan(10))
        .expect("today");
    assert_eq!(report.condition_score, Some(score));

    let err = tasks::set_condition_score(&mut store, &user(), jan(9), Some(score), jan(10))
        .expect_err("past day");
    assert!(matches!(err, DaybookError::ValidationError(_)));
    assert!(ConditionScore::try_from(11).is_err());
    assert!(ConditionScore::try_from(0).is_err());
}
