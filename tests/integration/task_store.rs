//! Integration tests for the optimistic task store.
//!
//! Runs `TaskStore` against `LoopbackTaskApi`, using `fail_next` to inject
//! errors and `hold_next` to observe state while a request is in flight.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;

use taskdeck::api::loopback::LoopbackTaskApi;
use taskdeck::api::{Operation, RequestError};
use taskdeck::tasks::{StoreError, StoreEvent, TaskStore};
use taskdeck_proto::task::{CreateTaskInput, TaskId, UpdateTaskInput, ValidationError};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

const USER: &str = "user-1";

fn make_store() -> (Arc<TaskStore<LoopbackTaskApi>>, LoopbackTaskApi) {
    let api = LoopbackTaskApi::new();
    let (store, _rx) = TaskStore::new(api.clone(), USER, 64);
    (Arc::new(store), api)
}

/// Seeds `titles` on the server and loads them into the store.
async fn make_loaded_store(titles: &[&str]) -> (Arc<TaskStore<LoopbackTaskApi>>, LoopbackTaskApi) {
    let (store, api) = make_store();
    for title in titles {
        api.seed(USER, &CreateTaskInput::new(*title));
    }
    store.fetch().await.unwrap();
    (store, api)
}

/// Yields until the loopback has received `n` calls.
async fn wait_for_calls(api: &LoopbackTaskApi, n: usize) {
    for _ in 0..10_000 {
        if api.calls().len() >= n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("loopback never received {n} calls");
}

// ===========================================================================
// Create
// ===========================================================================

#[tokio::test]
async fn create_adds_exactly_one_matching_task() {
    let inputs = [
        CreateTaskInput::new("Buy milk"),
        CreateTaskInput::new("Write report").with_description("quarterly numbers"),
        CreateTaskInput::new("t".repeat(200)),
        CreateTaskInput::new("Unicode ✓ title").with_description("d".repeat(1000)),
    ];
    let (store, _api) = make_store();

    for (i, input) in inputs.iter().enumerate() {
        let task = store.create(input.clone()).await.unwrap();
        let tasks = store.tasks();
        assert_eq!(tasks.len(), i + 1);

        let matching: Vec<_> = tasks.iter().filter(|t| t.id == task.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].title, input.title);
        assert_eq!(matching[0].description, input.description);
        assert!(!matching[0].completed);
        assert_eq!(matching[0].user_id, USER);
    }
    assert_eq!(store.pending_count(), 0);
    assert!(store.error().is_none());
    assert!(!store.loading());
}

#[tokio::test]
async fn create_shows_provisional_record_while_in_flight() {
    let (store, api) = make_store();
    let release = api.hold_next();

    let handle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("Draft")).await })
    };
    wait_for_calls(&api, 1).await;

    let snapshot = store.snapshot();
    assert!(snapshot.loading);
    assert_eq!(snapshot.pending, 1);
    assert_eq!(snapshot.tasks.len(), 1);
    let provisional = &snapshot.tasks[0];
    assert!(provisional.id.is_provisional());
    assert!(store.is_provisional(provisional.id));
    assert_eq!(provisional.title, "Draft");

    release.send(()).unwrap();
    let task = handle.await.unwrap().unwrap();

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0], task);
    assert!(!task.id.is_provisional());
    assert!(!store.is_provisional(provisional.id));
    assert!(!store.loading());
}

#[tokio::test]
async fn cancelled_create_leaves_no_provisional_record() {
    let (store, api) = make_store();
    let release = api.hold_next();

    let handle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("Draft")).await })
    };
    wait_for_calls(&api, 1).await;
    assert_eq!(store.tasks().len(), 1);

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    drop(release);

    assert!(store.tasks().is_empty());
    assert_eq!(store.pending_count(), 0);
    assert!(!store.loading());
    assert!(store.error().is_none());
}

#[tokio::test]
async fn failing_create_removes_provisional_and_sets_error() {
    let (store, api) = make_loaded_store(&["Existing"]).await;
    api.fail_next(RequestError::transport("network unreachable"));

    let err = store.create(CreateTaskInput::new("Doomed")).await.unwrap_err();
    assert_eq!(
        err,
        StoreError::Request(RequestError::transport("network unreachable"))
    );

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Existing");
    assert!(tasks.iter().all(|t| !t.id.is_provisional()));
    assert_eq!(store.error().as_deref(), Some("network unreachable"));
    assert_eq!(store.pending_count(), 0);
    assert!(!store.loading());
}

#[tokio::test]
async fn failing_create_rolls_back_only_its_own_record() {
    let (store, api) = make_store();
    let hold_ok = api.hold_next();
    let hold_fail = api.hold_next();

    let ok = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("Keeps")).await })
    };
    wait_for_calls(&api, 1).await;
    let doomed = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("Fails")).await })
    };
    wait_for_calls(&api, 2).await;
    assert_eq!(store.tasks().len(), 2);

    // The failure is popped by whichever call resumes first.
    api.fail_next(RequestError::http(500, "Internal Server Error"));
    hold_fail.send(()).unwrap();
    assert!(doomed.await.unwrap().is_err());

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Keeps");
    assert!(tasks[0].id.is_provisional());

    hold_ok.send(()).unwrap();
    let kept = ok.await.unwrap().unwrap();
    assert_eq!(store.tasks(), vec![kept]);
}

#[tokio::test]
async fn concurrent_creates_reconcile_independently() {
    let (store, api) = make_store();
    let first = api.hold_next();
    let second = api.hold_next();

    let a = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("A")).await })
    };
    wait_for_calls(&api, 1).await;
    let b = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("B")).await })
    };
    wait_for_calls(&api, 2).await;

    // Resolve out of order.
    second.send(()).unwrap();
    let b = b.await.unwrap().unwrap();
    first.send(()).unwrap();
    let a = a.await.unwrap().unwrap();

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0], a);
    assert_eq!(tasks[1], b);
    assert_eq!(store.pending_count(), 0);
}

#[tokio::test]
async fn empty_title_is_rejected_before_any_call() {
    let (store, api) = make_store();

    for title in ["", "   \t "] {
        let err = store.create(CreateTaskInput::new(title)).await.unwrap_err();
        assert_eq!(err, StoreError::Validation(ValidationError::TitleRequired));
    }

    assert!(api.calls().is_empty());
    assert!(store.tasks().is_empty());
    assert!(store.error().is_none());
    assert!(!store.loading());
}

#[tokio::test]
async fn overlong_title_is_rejected() {
    let (store, api) = make_store();
    let err = store
        .create(CreateTaskInput::new("T".repeat(201)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::Validation(ValidationError::TitleTooLong { len: 201, max: 200 })
    );
    assert_eq!(err.to_string(), "Title must be 200 characters or less");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn overlong_description_is_rejected() {
    let (store, api) = make_store();
    let input = CreateTaskInput::new("ok").with_description("d".repeat(1001));
    let err = store.create(input).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::DescriptionTooLong { len: 1001, .. })
    ));
    assert!(api.calls().is_empty());
}

// ===========================================================================
// Update
// ===========================================================================

#[tokio::test]
async fn update_title_leaves_other_fields_unchanged() {
    let (store, api) = make_store();
    api.seed(
        USER,
        &CreateTaskInput::new("Old").with_description("keep me"),
    );
    store.fetch().await.unwrap();
    let before = store.tasks()[0].clone();

    let after = store
        .update(before.id, UpdateTaskInput::title("X"))
        .await
        .unwrap();

    assert_eq!(after.title, "X");
    assert_eq!(after.id, before.id);
    assert_eq!(after.user_id, before.user_id);
    assert_eq!(after.description, before.description);
    assert_eq!(after.completed, before.completed);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(store.tasks(), vec![after]);
}

#[tokio::test]
async fn update_applies_optimistically() {
    let (store, api) = make_loaded_store(&["Old"]).await;
    let id = store.tasks()[0].id;
    let release = api.hold_next();

    let handle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.update(id, UpdateTaskInput::title("  New  ")).await })
    };
    wait_for_calls(&api, 2).await;
    assert_eq!(store.task(id).unwrap().title, "New");
    assert!(store.loading());

    release.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(api.tasks_of(USER)[0].title, "New");
}

#[tokio::test]
async fn failed_update_resynchronizes_from_server() {
    let (store, api) = make_loaded_store(&["Server title", "Other"]).await;
    let id = store.tasks()[0].id;
    api.fail_next(RequestError::http(500, "update failed"));

    let err = store
        .update(id, UpdateTaskInput::title("Local title"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Request(_)));

    assert_eq!(store.tasks(), api.tasks_of(USER));
    assert_eq!(store.task(id).unwrap().title, "Server title");
    assert_eq!(store.error().as_deref(), Some("update failed"));
    assert!(!store.loading());

    let ops: Vec<_> = api.calls().iter().map(|c| c.operation).collect();
    assert_eq!(ops, vec![Operation::List, Operation::Update, Operation::List]);
}

#[tokio::test]
async fn failed_resync_keeps_write_error() {
    let (store, api) = make_loaded_store(&["A"]).await;
    let id = store.tasks()[0].id;
    api.fail_next(RequestError::http(500, "write failed"));
    api.fail_next(RequestError::http(503, "refetch failed"));

    let _ = store.update(id, UpdateTaskInput::title("B")).await;

    assert_eq!(store.error().as_deref(), Some("write failed"));
    assert!(!store.loading());
}

#[tokio::test]
async fn update_of_unknown_id_reaches_server() {
    let (store, api) = make_loaded_store(&["A"]).await;
    let before = store.tasks();

    let err = store
        .update(TaskId::new(999), UpdateTaskInput::title("ghost"))
        .await
        .unwrap_err();
    match err {
        StoreError::Request(e) => assert!(e.is_not_found()),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.tasks(), before);
    assert_eq!(store.error().as_deref(), Some("Task not found"));
    assert_eq!(api.calls()[1].task_id, Some(TaskId::new(999)));
}

#[tokio::test]
async fn update_with_blank_title_is_rejected() {
    let (store, api) = make_loaded_store(&["A"]).await;
    let id = store.tasks()[0].id;
    let err = store
        .update(id, UpdateTaskInput::title("  "))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::Validation(ValidationError::TitleRequired));
    assert_eq!(api.calls().len(), 1);
}

// ===========================================================================
// Toggle
// ===========================================================================

#[tokio::test]
async fn toggle_marks_task_complete() {
    let (store, _api) = make_loaded_store(&["Only"]).await;
    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, TaskId::new(1));
    assert!(!tasks[0].completed);

    let updated = store.toggle_complete(TaskId::new(1)).await.unwrap();
    assert!(updated.completed);

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, TaskId::new(1));
    assert!(tasks[0].completed);
    assert!(store.error().is_none());
}

#[tokio::test]
async fn toggle_twice_restores_completion() {
    let (store, _api) = make_loaded_store(&["A", "B"]).await;
    let original = store.tasks()[1].clone();

    store.toggle_complete(original.id).await.unwrap();
    let back = store.toggle_complete(original.id).await.unwrap();

    assert_eq!(back.completed, original.completed);
    assert_eq!(back.title, original.title);
    assert!(back.updated_at >= original.updated_at);
}

#[tokio::test]
async fn failed_toggle_restores_server_state() {
    let (store, api) = make_loaded_store(&["A"]).await;
    let id = store.tasks()[0].id;
    api.fail_next(RequestError::http(404, "Task not found"));

    assert!(store.toggle_complete(id).await.is_err());
    assert!(!store.task(id).unwrap().completed);
    assert_eq!(store.error().as_deref(), Some("Task not found"));
}

#[tokio::test]
async fn provisional_ids_are_not_sent() {
    let (store, api) = make_store();
    let release = api.hold_next();
    let handle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("Pending")).await })
    };
    wait_for_calls(&api, 1).await;
    let temp_id = store.tasks()[0].id;

    assert_eq!(
        store.toggle_complete(temp_id).await.unwrap_err(),
        StoreError::Provisional(temp_id)
    );
    assert_eq!(
        store.delete(temp_id).await.unwrap_err(),
        StoreError::Provisional(temp_id)
    );
    assert_eq!(api.calls().len(), 1);

    release.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

// ===========================================================================
// Delete
// ===========================================================================

#[tokio::test]
async fn delete_removes_exactly_one() {
    let (store, api) = make_loaded_store(&["A", "B", "C"]).await;
    let target = store.tasks()[1].id;

    store.delete(target).await.unwrap();
    let titles: Vec<_> = store.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["A", "C"]);

    // Deleting again fails server-side and must not take another task with it.
    let err = store.delete(target).await.unwrap_err();
    assert!(matches!(err, StoreError::Request(ref e) if e.is_not_found()));
    let titles: Vec<_> = store.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["A", "C"]);
    assert_eq!(api.tasks_of(USER).len(), 2);
}

#[tokio::test]
async fn failed_delete_brings_task_back_via_refetch() {
    let (store, api) = make_loaded_store(&["A", "B"]).await;
    let target = store.tasks()[0].id;
    let release = api.hold_next();
    api.fail_next(RequestError::http(500, "delete failed"));

    let handle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.delete(target).await })
    };
    wait_for_calls(&api, 2).await;
    assert!(store.task(target).is_none());

    release.send(()).unwrap();
    assert!(handle.await.unwrap().is_err());

    assert!(store.task(target).is_some());
    assert_eq!(store.tasks(), api.tasks_of(USER));
    assert_eq!(store.error().as_deref(), Some("delete failed"));
}

#[tokio::test]
async fn delete_wins_over_refetch_that_resolves_first() {
    let (store, api) = make_loaded_store(&["A", "B"]).await;
    let target = store.tasks()[0].id;
    let release = api.hold_next();

    let handle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.delete(target).await })
    };
    wait_for_calls(&api, 2).await;

    // The server still holds the task, but the local delete is in flight.
    store.fetch().await.unwrap();
    assert!(store.task(target).is_none());

    release.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert!(store.task(target).is_none());
    assert_eq!(store.tasks(), api.tasks_of(USER));
    assert_eq!(store.pending_count(), 0);
}

#[tokio::test]
async fn cancelled_delete_does_not_hide_task_from_refetch() {
    let (store, api) = make_loaded_store(&["A", "B"]).await;
    let target = store.tasks()[0].id;
    let release = api.hold_next();

    let handle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.delete(target).await })
    };
    wait_for_calls(&api, 2).await;
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    drop(release);

    assert_eq!(store.pending_count(), 0);
    assert!(!store.loading());
    store.fetch().await.unwrap();
    assert!(store.task(target).is_some());
}

// ===========================================================================
// Fetch, loading and error lifecycle
// ===========================================================================

#[tokio::test]
async fn fetch_keeps_in_flight_provisional_records() {
    let (store, api) = make_loaded_store(&["Server"]).await;
    let release = api.hold_next();
    let handle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("Local")).await })
    };
    wait_for_calls(&api, 2).await;

    store.fetch().await.unwrap();
    let titles: Vec<_> = store.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Server", "Local"]);
    // The create is still in flight.
    assert!(store.loading());

    release.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(store.tasks(), api.tasks_of(USER));
    assert!(!store.loading());
}

#[tokio::test]
async fn error_clears_when_next_operation_starts() {
    let (store, api) = make_loaded_store(&["A"]).await;
    api.fail_next(RequestError::http(500, "boom"));
    let _ = store.fetch().await;
    assert_eq!(store.error().as_deref(), Some("boom"));

    let id = store.tasks()[0].id;
    store.toggle_complete(id).await.unwrap();
    assert!(store.error().is_none());
}

#[tokio::test]
async fn loading_spans_overlapping_operations() {
    let (store, api) = make_loaded_store(&["A"]).await;
    let id = store.tasks()[0].id;
    let first = api.hold_next();
    let second = api.hold_next();

    let toggle = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.toggle_complete(id).await })
    };
    wait_for_calls(&api, 2).await;
    let fetch = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.fetch().await })
    };
    wait_for_calls(&api, 3).await;

    first.send(()).unwrap();
    toggle.await.unwrap().unwrap();
    assert!(store.loading(), "fetch is still in flight");

    second.send(()).unwrap();
    fetch.await.unwrap().unwrap();
    assert!(!store.loading());
}

#[tokio::test]
async fn events_report_failures() {
    let api = LoopbackTaskApi::new();
    let (store, mut rx) = TaskStore::new(api.clone(), USER, 256);
    api.fail_next(RequestError::transport("offline"));
    let _ = store.create(CreateTaskInput::new("A")).await;

    let mut failures = Vec::new();
    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            StoreEvent::Failed { operation, message } => failures.push((operation, message)),
            StoreEvent::Changed(snapshot) => last = Some(snapshot),
        }
    }
    assert_eq!(failures, vec![(Operation::Create, "offline".to_string())]);
    let last = last.unwrap();
    assert!(!last.loading);
    assert!(last.tasks.is_empty());
    assert_eq!(last.error.as_deref(), Some("offline"));
}

#[tokio::test]
async fn full_event_channel_does_not_block() {
    let api = LoopbackTaskApi::new();
    let (store, _rx) = TaskStore::new(api, USER, 1);
    for i in 0..5 {
        store
            .create(CreateTaskInput::new(format!("task {i}")))
            .await
            .unwrap();
    }
    assert_eq!(store.tasks().len(), 5);
}

// ===========================================================================
// User scoping
// ===========================================================================

#[tokio::test]
async fn set_user_refetches_for_new_user() {
    let (store, api) = make_loaded_store(&["mine"]).await;
    api.seed("user-2", &CreateTaskInput::new("theirs"));

    store.set_user("user-2").await.unwrap();
    assert_eq!(store.user_id(), "user-2");
    let titles: Vec<_> = store.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["theirs"]);
    assert_eq!(api.calls().last().unwrap().user_id, "user-2");
}

#[tokio::test]
async fn responses_for_previous_user_are_dropped() {
    let (store, api) = make_store();
    api.seed("user-2", &CreateTaskInput::new("theirs"));
    let release = api.hold_next();

    let create = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create(CreateTaskInput::new("late")).await })
    };
    wait_for_calls(&api, 1).await;

    store.set_user("user-2").await.unwrap();
    assert_eq!(store.pending_count(), 0);

    release.send(()).unwrap();
    let created = create.await.unwrap().unwrap();
    assert_eq!(created.user_id, USER);

    let titles: Vec<_> = store.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["theirs"]);
    assert!(!store.loading());
}
