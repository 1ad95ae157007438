use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use taskforge::{EngineConfig, TaskError, TaskManager, TaskSpec, TaskStatus, TaskUpdate};
use tempfile::TempDir;

fn project_plan() -> TaskManager {
    let mut manager = TaskManager::new(EngineConfig::default()).expect("default config is valid");

    let schema = manager
        .create_task(TaskSpec::new("Design database schema", "Users and orders", 5, 2.0).with_tags(&["backend"]))
        .unwrap();
    let api = manager
        .create_task(TaskSpec::new("Build REST API", "CRUD endpoints", 4, 3.0).with_tags(&["backend"]))
        .unwrap();
    let ui = manager
        .create_task(TaskSpec::new("Build dashboard", "Charts and tables", 3, 4.0).with_tags(&["frontend"]))
        .unwrap();
    let docs = manager
        .create_task(TaskSpec::new("Write user guide", "Getting started", 1, 1.0))
        .unwrap();

    manager.add_dependency(&schema.id, &api.id).unwrap();
    manager.add_dependency(&api.id, &ui.id).unwrap();
    manager.add_dependency(&ui.id, &docs.id).unwrap();
    manager
}

#[test]
fn test_project_lifecycle() {
    let mut manager = project_plan();
    let order: Vec<String> = manager
        .get_task_execution_order()
        .unwrap()
        .iter()
        .map(|id| manager.get_task(id).unwrap().title.clone())
        .collect();
    assert_eq!(
        order,
        vec![
            "Design database schema",
            "Build REST API",
            "Build dashboard",
            "Write user guide"
        ]
    );

    // Work through the chain; exactly one task is ready at each step
    for _ in 0..4 {
        let ready = manager.get_ready_tasks();
        assert_eq!(ready.len(), 1);
        manager
            .update_task(&ready[0].id, TaskUpdate::status(TaskStatus::InProgress))
            .unwrap();
        assert!(manager.get_ready_tasks().is_empty());
        manager.complete_task(&ready[0].id, ready[0].estimated_time).unwrap();
    }

    assert_eq!(manager.get_tasks_by_status(TaskStatus::Completed).len(), 4);
    assert!(manager.optimize_order().unwrap().is_empty());
    assert!(manager.validate_integrity().is_empty());
}

#[test]
fn test_snapshot_file_roundtrip() {
    let manager = project_plan();
    let temp_dir = TempDir::new().expect("Should be able to create temporary directory");
    let path = temp_dir.path().join("tasks.json");

    fs::write(&path, manager.export_to_json().unwrap()).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let restored = TaskManager::import_from_json(EngineConfig::default(), &content).unwrap();

    assert_eq!(restored.get_all_tasks(), manager.get_all_tasks());
    assert_eq!(restored.dependency_edges(), manager.dependency_edges());
    assert_eq!(
        restored.get_task_execution_order().unwrap(),
        manager.get_task_execution_order().unwrap()
    );
    assert_eq!(restored.get_tasks_by_tag("backend").len(), 2);
}

#[test]
fn test_failed_operations_leave_state_unchanged() {
    let mut manager = project_plan();
    let before = manager.snapshot();
    let tasks = manager.get_all_tasks();
    let (first, last) = (&tasks[0], &tasks[3]);

    assert!(matches!(
        manager.add_dependency(&last.id, &first.id),
        Err(TaskError::Cycle { .. })
    ));
    assert!(matches!(
        manager.update_task(
            &first.id,
            TaskUpdate {
                priority: Some(9),
                ..Default::default()
            }
        ),
        Err(TaskError::InvalidInput(_))
    ));

    let after = manager.snapshot();
    assert_eq!(after.tasks, before.tasks);
    assert_eq!(after.edges, before.edges);
    assert!(manager.validate_integrity().is_empty());
}

#[test]
fn test_error_response_codes() {
    let mut manager = project_plan();
    let tasks = manager.get_all_tasks();

    let err = manager
        .add_dependency(&tasks[3].id, &tasks[0].id)
        .unwrap_err();
    let response = err.to_error_response();
    assert_eq!(response.code, "CIRCULAR_DEPENDENCY");

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["code"], "CIRCULAR_DEPENDENCY");
    assert!(json["error"].as_str().unwrap().contains(tasks[0].id.as_str()));
}

#[test]
fn test_shared_engine_behind_mutex() {
    let manager = Arc::new(Mutex::new(
        TaskManager::new(EngineConfig::default()).unwrap(),
    ));

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for i in 0..5 {
                    let title = format!("worker {} item {}", worker, i);
                    manager
                        .lock()
                        .unwrap()
                        .create_task(TaskSpec::new(&title, "", 3, 1.0))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let manager = manager.lock().unwrap();
    assert_eq!(manager.task_count(), 20);
    let sequences: Vec<u64> = manager.get_all_tasks().iter().map(|t| t.sequence).collect();
    assert_eq!(sequences, (0..20).collect::<Vec<u64>>());
    assert_eq!(manager.search_tasks("worker item").len(), 20);
}
