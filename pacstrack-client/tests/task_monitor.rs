use std::sync::Arc;
use std::time::Duration;

use pacstrack_client::notify::{NoticeLevel, drain};
use pacstrack_client::scroll::Viewport;
use pacstrack_client::testing::{StubApiService, refused, sample_task};
use pacstrack_client::{ApiError, Notifier, SubmitError, TaskBoard, TaskMonitor};
use pacstrack_model::{TaskAction, TaskId, TaskRecord};
use tokio::time::sleep;

fn tasks(n: u64) -> Vec<TaskRecord> {
    (0..n)
        .map(|id| sample_task(id, if id % 3 == 0 { "completed" } else { "active" }))
        .collect()
}

fn monitor(stub: &Arc<StubApiService>, notifier: Notifier) -> TaskMonitor {
    TaskMonitor::new(
        stub.clone(),
        TaskBoard::new(200.0, 25.0),
        Duration::from_secs(2),
        notifier,
    )
}

#[tokio::test]
async fn refresh_preserves_selection_and_scroll() {
    let stub = Arc::new(StubApiService::new());
    stub.set_default_tasks(tasks(40));
    let monitor = monitor(&stub, Notifier::detached());

    assert_eq!(monitor.refresh().await.unwrap(), 40);
    let board = monitor.board();
    {
        let mut board = board.write();
        board.select_rows(&[3, 5]);
        board.viewport_mut().set_scroll_offset(300.0);
    }

    monitor.refresh().await.unwrap();

    let board = board.read();
    assert_eq!(board.table().selected_positions(), vec![3, 5]);
    assert_eq!(board.viewport().scroll_offset(), 300.0);
}

#[tokio::test]
async fn failed_refresh_leaves_board_as_is() {
    let stub = Arc::new(StubApiService::new());
    stub.set_default_tasks(tasks(4));
    let monitor = monitor(&stub, Notifier::detached());
    monitor.refresh().await.unwrap();
    monitor.board().write().select_rows(&[1]);

    stub.push_tasks(Err(refused("/get_tasks_table")));
    assert!(monitor.refresh().await.is_err());

    let board = monitor.board();
    let board = board.read();
    assert_eq!(board.table().len(), 4);
    assert_eq!(board.table().selected_positions(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn loop_refreshes_on_fixed_delay_until_stopped() {
    let stub = Arc::new(StubApiService::new());
    stub.set_default_tasks(tasks(3));
    stub.push_tasks(Err(refused("/get_tasks_table")));
    let monitor = monitor(&stub, Notifier::detached());

    let poller = monitor.start();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(stub.calls().task_fetches, 1);
    assert!(monitor.board().read().table().is_empty());

    // A failed fetch still re-arms the loop.
    sleep(Duration::from_secs(2)).await;
    assert_eq!(stub.calls().task_fetches, 2);
    assert_eq!(monitor.board().read().table().len(), 3);

    sleep(Duration::from_secs(4)).await;
    assert_eq!(stub.calls().task_fetches, 4);

    poller.stop();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(stub.calls().task_fetches, 4);
}

#[tokio::test]
async fn action_posts_selected_ids_in_row_order() {
    let stub = Arc::new(StubApiService::new());
    stub.set_default_tasks(tasks(6));
    let monitor = monitor(&stub, Notifier::detached());
    monitor.refresh().await.unwrap();

    assert!(matches!(
        monitor.apply_action(TaskAction::Pause).await,
        Err(SubmitError::EmptySelection)
    ));
    assert!(stub.calls().actions.is_empty());

    monitor.board().write().select_rows(&[4, 1]);
    assert_eq!(monitor.apply_action(TaskAction::Retry).await.unwrap(), 2);

    let actions = stub.calls().actions;
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, TaskAction::Retry);
    assert_eq!(actions[0].ids, vec![TaskId::new(1), TaskId::new(4)]);
}

#[tokio::test]
async fn failed_action_is_reported() {
    let stub = Arc::new(StubApiService::new());
    stub.set_default_tasks(tasks(2));
    stub.fail_task_actions(Some(refused("/task_action")));
    let (notifier, mut notices) = Notifier::channel();
    let monitor = monitor(&stub, notifier);
    monitor.refresh().await.unwrap();
    monitor.board().write().select_rows(&[0]);

    let err = monitor.apply_action(TaskAction::Delete).await.unwrap_err();
    assert!(matches!(err, SubmitError::Api(_)));

    let notices = drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].title.contains("delete"));
}

#[tokio::test(start_paused = true)]
async fn unreadable_task_list_is_reported_once_per_streak() {
    let stub = Arc::new(StubApiService::new());
    stub.set_default_tasks(tasks(3));
    let unreadable = || {
        Err(ApiError::malformed(
            "http://stub/get_tasks_table",
            "expected a sequence",
        ))
    };
    stub.push_tasks(unreadable());
    stub.push_tasks(unreadable());
    stub.push_tasks(Err(refused("/get_tasks_table")));
    let (notifier, mut notices) = Notifier::channel();
    let monitor = monitor(&stub, notifier);

    let poller = monitor.start();
    // Fetches at 0s, 2s and 4s fail; 6s succeeds.
    sleep(Duration::from_millis(6_100)).await;
    assert_eq!(stub.calls().task_fetches, 4);
    assert_eq!(monitor.board().read().table().len(), 3);

    let reported = drain(&mut notices);
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].level, NoticeLevel::Error);
    assert!(reported[0].body.contains("get_tasks_table"));

    // A good list ends the streak; the next unreadable one is reported again.
    stub.push_tasks(unreadable());
    sleep(Duration::from_secs(2)).await;
    assert_eq!(stub.calls().task_fetches, 5);
    assert_eq!(drain(&mut notices).len(), 1);

    poller.shutdown().await;
}
