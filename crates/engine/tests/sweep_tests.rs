//! Due-task sweep and reaper behaviour over in-memory doubles.

mod common;

use bcp_db::models::status::TaskStatus;

use common::*;

#[tokio::test]
async fn due_sweep_launches_overdue_drills_as_their_creator() {
    let h = harness(ScriptedRds::default());
    h.store.add_instance(1, "rm-src-1");

    let due_at = h.clock.now() - chrono::Duration::hours(1);
    let task = h
        .orchestrator
        .create_task(&scheduled_task(1, due_at), 31)
        .await
        .unwrap();

    let launched = h.orchestrator.run_due_tasks().await.unwrap();
    assert_eq!(launched, 1);

    wait_for_status(&h.store, task.id, TaskStatus::Success).await;

    // The execute audit event carries the original creator, not a system
    // actor.
    let execute = h.audit.events().into_iter().last().unwrap();
    assert_eq!(execute.actor_id, Some(31));
}

#[tokio::test]
async fn due_sweep_ignores_future_schedules() {
    let h = harness(ScriptedRds::default());
    h.store.add_instance(1, "rm-src-1");

    let due_at = h.clock.now() + chrono::Duration::hours(1);
    let task = h
        .orchestrator
        .create_task(&scheduled_task(1, due_at), 31)
        .await
        .unwrap();

    let launched = h.orchestrator.run_due_tasks().await.unwrap();
    assert_eq!(launched, 0);
    assert_eq!(h.store.status_of(task.id), Some(TaskStatus::Pending.id()));
}

#[tokio::test]
async fn due_sweep_isolates_per_task_failures() {
    let h = harness(ScriptedRds::default());
    h.store.add_instance(1, "rm-src-1");

    // The poisoned drill is due first, so the sweep hits its failure before
    // reaching the healthy one.
    let poisoned = h
        .orchestrator
        .create_task(&scheduled_task(1, h.clock.now() - chrono::Duration::minutes(10)), 31)
        .await
        .unwrap();
    let healthy = h
        .orchestrator
        .create_task(&scheduled_task(1, h.clock.now() - chrono::Duration::minutes(5)), 31)
        .await
        .unwrap();
    h.store.poison_mark_running(poisoned.id);

    let launched = h.orchestrator.run_due_tasks().await.unwrap();
    assert_eq!(launched, 1);
    wait_for_status(&h.store, healthy.id, TaskStatus::Success).await;
    assert_eq!(h.store.status_of(poisoned.id), Some(TaskStatus::Pending.id()));
}

#[tokio::test]
async fn reaping_an_empty_running_set_is_a_noop() {
    let h = harness(ScriptedRds::default());
    assert_eq!(h.orchestrator.reap_stuck_tasks().await, 0);
}
