use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use tinytasks_core::{
    is_contiguous, CoreConfig, MemoryProvider, PersistenceError, Snapshot, StorageError,
    StoreEvent, Task, TaskList, TaskStorage, DEFAULT_LIST_TITLE,
};
use uuid::Uuid;

fn setup() -> TaskStorage<MemoryProvider> {
    TaskStorage::open(MemoryProvider::new(), CoreConfig::default()).unwrap()
}

fn positions(indices: &[usize]) -> BTreeSet<usize> {
    indices.iter().copied().collect()
}

fn task_texts(storage: &TaskStorage<MemoryProvider>, list: &TaskList) -> Vec<(String, i64)> {
    storage
        .tasks(list.id)
        .unwrap()
        .iter()
        .map(|task| (task.text.clone(), task.order))
        .collect()
}

fn add_named_task(storage: &mut TaskStorage<MemoryProvider>, list: &TaskList, text: &str) -> Task {
    let task = storage.add_task(list.id).unwrap();
    storage.update_task_text(task.id, text).unwrap();
    storage.task(task.id).unwrap().clone()
}

#[test]
fn add_task_list_uses_defaults_and_appends() {
    let mut storage = setup();

    let first = storage.add_task_list().unwrap();
    let second = storage.add_task_list().unwrap();
    let third = storage.add_task_list().unwrap();

    assert_eq!(first.title.as_deref(), Some(DEFAULT_LIST_TITLE));
    assert_eq!([first.order, second.order, third.order], [0, 1, 2]);
    assert!(first.last_changed > 0);

    let ids: Vec<_> = storage.task_lists().iter().map(|list| list.id).collect();
    assert_eq!(ids, [first.id, second.id, third.id]);
    assert_eq!(storage.provider().commit_count(), 3);
}

#[test]
fn add_task_appends_empty_open_tasks() {
    let mut storage = setup();
    let list = storage.add_task_list().unwrap();

    let orders: Vec<i64> = (0..4)
        .map(|_| storage.add_task(list.id).unwrap().order)
        .collect();
    assert_eq!(orders, [0, 1, 2, 3]);

    let tasks = storage.tasks(list.id).unwrap();
    assert!(tasks.iter().all(|task| task.text.is_empty() && !task.is_done));
    assert!(tasks.iter().all(|task| task.list_id == list.id));
}

#[test]
fn groceries_scenario_moves_then_restamps_after_delete() {
    let mut storage = setup();
    let list = storage.add_task_list().unwrap();
    storage.update_title(list.id, "Groceries").unwrap();
    assert_eq!(storage.task_list(list.id).unwrap().order, 0);

    let milk = add_named_task(&mut storage, &list, "Milk");
    add_named_task(&mut storage, &list, "Eggs");
    add_named_task(&mut storage, &list, "Bread");
    assert_eq!(
        task_texts(&storage, &list),
        [
            ("Milk".to_string(), 0),
            ("Eggs".to_string(), 1),
            ("Bread".to_string(), 2)
        ]
    );

    storage.move_tasks(list.id, &positions(&[2]), 0).unwrap();
    assert_eq!(
        task_texts(&storage, &list),
        [
            ("Bread".to_string(), 0),
            ("Milk".to_string(), 1),
            ("Eggs".to_string(), 2)
        ]
    );

    storage.delete_tasks(&[milk.id]).unwrap();
    assert_eq!(
        task_texts(&storage, &list),
        [("Bread".to_string(), 0), ("Eggs".to_string(), 1)]
    );

    let stored = storage.provider().stored_task(milk.id);
    assert!(stored.is_none());
}

#[test]
fn deleting_first_list_restamps_remaining_lists() {
    let mut storage = setup();
    let a = storage.add_task_list().unwrap();
    let b = storage.add_task_list().unwrap();

    storage.delete_task_lists(&[a.id]).unwrap();

    assert!(storage.task_list(a.id).is_none());
    assert_eq!(storage.task_list(b.id).unwrap().order, 0);
    assert_eq!(storage.provider().stored_list(b.id).unwrap().order, 0);
}

#[test]
fn deleting_list_cascades_to_its_tasks() {
    let mut storage = setup();
    let doomed = storage.add_task_list().unwrap();
    let kept = storage.add_task_list().unwrap();
    let doomed_tasks: Vec<_> = (0..3)
        .map(|_| storage.add_task(doomed.id).unwrap())
        .collect();
    let kept_task = storage.add_task(kept.id).unwrap();

    storage.delete_task_lists(&[doomed.id]).unwrap();

    for task in &doomed_tasks {
        assert!(storage.task(task.id).is_none());
        assert!(storage.provider().stored_task(task.id).is_none());
    }
    assert!(matches!(
        storage.tasks(doomed.id),
        Err(StorageError::TaskListNotFound(id)) if id == doomed.id
    ));
    assert_eq!(storage.task(kept_task.id).unwrap().list_id, kept.id);
    assert_eq!(storage.provider().stored_task_count(), 1);
}

#[test]
fn multi_select_move_of_lists_keeps_relative_order() {
    let mut storage = setup();
    let lists: Vec<_> = (0..4).map(|_| storage.add_task_list().unwrap()).collect();

    storage.move_task_lists(&positions(&[0, 2]), 4).unwrap();

    let ids: Vec<_> = storage.task_lists().iter().map(|list| list.id).collect();
    assert_eq!(ids, [lists[1].id, lists[3].id, lists[0].id, lists[2].id]);
    let ordered: Vec<TaskList> = storage.task_lists().into_iter().cloned().collect();
    assert!(is_contiguous(&ordered));
}

#[test]
fn move_that_changes_nothing_does_not_commit() {
    let mut storage = setup();
    let list = storage.add_task_list().unwrap();
    storage.add_task(list.id).unwrap();
    storage.add_task(list.id).unwrap();
    let commits = storage.provider().commit_count();

    storage.move_tasks(list.id, &positions(&[0]), 1).unwrap();
    assert_eq!(storage.provider().commit_count(), commits);
}

#[test]
fn out_of_bounds_move_is_rejected() {
    let mut storage = setup();
    let list = storage.add_task_list().unwrap();
    storage.add_task(list.id).unwrap();

    let err = storage
        .move_tasks(list.id, &positions(&[5]), 0)
        .unwrap_err();
    assert!(matches!(err, StorageError::Order(_)));
}

#[test]
fn unknown_ids_fail_before_any_commit() {
    let mut storage = setup();
    let list = storage.add_task_list().unwrap();
    let commits = storage.provider().commit_count();
    let missing = Uuid::new_v4();

    assert!(matches!(
        storage.add_task(missing),
        Err(StorageError::TaskListNotFound(id)) if id == missing
    ));
    assert!(matches!(
        storage.delete_task_lists(&[list.id, missing]),
        Err(StorageError::TaskListNotFound(id)) if id == missing
    ));
    assert!(matches!(
        storage.toggle_done(missing),
        Err(StorageError::TaskNotFound(id)) if id == missing
    ));
    assert!(storage.task_list(list.id).is_some());
    assert_eq!(storage.provider().commit_count(), commits);
}

#[test]
fn title_update_bumps_last_changed() {
    let mut storage = setup();
    let list = storage.add_task_list().unwrap();

    storage.update_title(list.id, "").unwrap();
    let updated = storage.task_list(list.id).unwrap();
    assert_eq!(updated.title.as_deref(), Some(""));
    assert_eq!(updated.display_title(), "Untitled");
    assert!(updated.last_changed >= list.last_changed);
}

#[test]
fn toggle_and_set_done_commit_flag() {
    let mut storage = setup();
    let list = storage.add_task_list().unwrap();
    let task = storage.add_task(list.id).unwrap();

    assert!(storage.toggle_done(task.id).unwrap());
    assert!(storage.provider().stored_task(task.id).unwrap().is_done);

    storage.set_done(task.id, false).unwrap();
    assert!(!storage.task(task.id).unwrap().is_done);
}

#[test]
fn failed_commit_leaves_graph_and_observers_untouched() {
    let mut storage = setup();
    let list = storage.add_task_list().unwrap();
    let task = storage.add_task(list.id).unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    storage.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    storage.provider_mut().reject_next_commit("disk full");
    let err = storage.delete_task_lists(&[list.id]).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Persistence(PersistenceError::Rejected(ref reason)) if reason == "disk full"
    ));
    assert!(storage.task_list(list.id).is_some());
    assert!(storage.task(task.id).is_some());
    assert!(events.borrow().is_empty());

    storage.provider_mut().set_read_only(true);
    assert!(storage.add_task(list.id).is_err());
    assert!(storage.update_task_text(task.id, "lost").is_err());
    assert_eq!(storage.tasks(list.id).unwrap().len(), 1);
    assert!(storage.task(task.id).unwrap().text.is_empty());

    storage.provider_mut().set_read_only(false);
    storage.delete_task_lists(&[list.id]).unwrap();
    assert_eq!(*events.borrow(), [StoreEvent::TaskListsDeleted(vec![list.id])]);
}

#[test]
fn observers_receive_committed_events_until_unsubscribed() {
    let mut storage = setup();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let subscription = storage.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let list = storage.add_task_list().unwrap();
    let task = storage.add_task(list.id).unwrap();
    storage.toggle_done(task.id).unwrap();
    storage.delete_tasks(&[task.id]).unwrap();

    assert_eq!(
        *events.borrow(),
        [
            StoreEvent::TaskListAdded(list.id),
            StoreEvent::TaskAdded {
                list_id: list.id,
                task_id: task.id
            },
            StoreEvent::TasksUpdated(vec![task.id]),
            StoreEvent::TasksDeleted {
                list_ids: vec![list.id],
                task_ids: vec![task.id]
            },
        ]
    );

    assert!(storage.unsubscribe(subscription));
    storage.add_task_list().unwrap();
    assert_eq!(events.borrow().len(), 4);
}

#[test]
fn open_normalizes_gapped_orders_and_commits_them() {
    let first = TaskList::new(2, 10);
    let second = TaskList::new(7, 10);
    let tasks = vec![Task::new(first.id, 1), Task::new(first.id, 5)];
    let provider = MemoryProvider::with_snapshot(Snapshot {
        lists: vec![first.clone(), second.clone()],
        tasks: tasks.clone(),
    });

    let storage = TaskStorage::open(provider, CoreConfig::default()).unwrap();

    assert_eq!(storage.task_list(first.id).unwrap().order, 0);
    assert_eq!(storage.task_list(second.id).unwrap().order, 1);
    assert!(is_contiguous(storage.tasks(first.id).unwrap()));
    assert_eq!(storage.provider().commit_count(), 1);
    assert_eq!(storage.provider().stored_task(tasks[1].id).unwrap().order, 1);
}

#[test]
fn open_rejects_orphan_tasks_and_invalid_config() {
    let provider = MemoryProvider::with_snapshot(Snapshot {
        lists: Vec::new(),
        tasks: vec![Task::new(Uuid::new_v4(), 0)],
    });
    let err = TaskStorage::open(provider, CoreConfig::default()).err().unwrap();
    assert!(matches!(
        err,
        StorageError::Persistence(PersistenceError::InvalidData(_))
    ));

    let config = CoreConfig {
        debounce_window_ms: 0,
        ..CoreConfig::default()
    };
    let err = TaskStorage::open(MemoryProvider::new(), config).err().unwrap();
    assert!(matches!(err, StorageError::Config(_)));
}
