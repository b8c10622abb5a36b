use taskboard_server::task::{NewTask, TaskPatch, TaskService, TaskStats};

mod common;

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn task_store_works_against_postgres() {
    let container = common::setup_container()
        .await
        .expect("Failed to start postgres container");
    let db = common::setup_db(&container)
        .await
        .expect("Failed to setup database");
    let alice = common::insert_user(&db, "alice@example.com").await;
    let bob = common::insert_user(&db, "bob@example.com").await;
    let service = TaskService::new(&db);

    let first = service
        .create_task(alice, NewTask::titled("Buy milk"))
        .await
        .unwrap();
    service
        .create_task(alice, NewTask::titled("Write report").with_status("In Progress"))
        .await
        .unwrap();
    service
        .update_task(first.id(), alice, TaskPatch::status("Completed"))
        .await
        .unwrap();

    assert_eq!(
        service.task_stats(alice).await.unwrap(),
        TaskStats {
            todo: 0,
            in_progress: 1,
            completed: 1
        }
    );
    assert_eq!(service.task_stats(bob).await.unwrap(), TaskStats::default());
    assert!(service.delete_task(first.id(), bob).await.is_err());
    service.delete_task(first.id(), alice).await.unwrap();
    assert_eq!(service.list_tasks(alice).await.unwrap().len(), 1);
}
