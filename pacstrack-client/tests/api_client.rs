use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use pacstrack_client::{ApiClient, ApiError, ApiService};
use pacstrack_model::{
    DiscoveryQuery, ProgressValue, Record, TaskAction, TaskActionRequest, TaskId, TaskStatus,
    TransferRequest, parse_form_date,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Recorded(Arc<Mutex<Vec<Value>>>);

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn router(recorded: Recorded) -> Router {
    Router::new()
        .route(
            "/get_devices",
            get(|| async {
                Json(json!({"data": [
                    {"name": "PACS", "ae_title": "PACS", "address": "10.0.0.2:104",
                     "imgs_series": "Yes", "imgs_study": "Yes"},
                    {"name": "CT_ROOM", "ae_title": "CT1", "address": "10.0.0.3:104",
                     "imgs_series": "Unknown", "imgs_study": "Yes"}
                ]}))
            }),
        )
        .route(
            "/find_missing_series",
            post(|State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                recorded.0.lock().push(body);
                Json(json!({
                    "data": [{"source": "CT_ROOM", "StudyDate": "20240305"}],
                    "series_in_device": 10,
                    "missing_series": 1,
                    "filtered_series": 0
                }))
            }),
        )
        .route(
            "/check_storage_progress",
            get(|| async { Json(json!({"data": {"status": "Querying", "progress": "3 / 10"}})) }),
        )
        .route(
            "/get_tasks_table",
            get(|| async {
                Json(json!({"data": [
                    {"task_id": 7, "status": "failed", "progress": "100%",
                     "started": "2024-03-05 10:00"}
                ]}))
            }),
        )
        .route(
            "/task_action",
            post(|State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                recorded.0.lock().push(body);
                "ok"
            }),
        )
        .route(
            "/get_study_data",
            post(|State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                recorded.0.lock().push(body.clone());
                let mut series = body;
                series["level"] = json!("SERIES");
                series["SeriesNumber"] = json!(2);
                series["SeriesInstanceUID"] = json!("1.9.1.2");
                Json(json!({"data": [series]}))
            }),
        )
        .route(
            "/search_studies",
            post(|| async { Json(json!({"data": "not a list"})) }),
        )
        .route(
            "/move",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "queue offline") }),
        )
        .with_state(recorded)
}

#[tokio::test]
async fn decodes_envelopes_and_posts_form_bodies() {
    let recorded = Recorded::default();
    let base = spawn_server(router(recorded.clone())).await;
    let client = ApiClient::new(base, Some(Duration::from_secs(5))).unwrap();

    let devices = client.fetch_devices().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert!(devices[0].is_archive());
    assert!(!devices[1].reports_series_image_counts());

    let query = DiscoveryQuery::today("CT_ROOM", parse_form_date("2024-03-05").unwrap());
    let response = client.find_missing_series(&query).await.unwrap();
    assert_eq!(response.missing.len(), 1);
    assert!(response.ignored.is_empty());
    assert_eq!(response.series_in_device, Some(10));
    assert_eq!(
        recorded.0.lock()[0],
        json!({
            "dateSelector": "today",
            "startDate": "2024-03-05",
            "endDate": "2024-03-05",
            "device": "CT_ROOM"
        })
    );

    let progress = client.check_storage_progress().await.unwrap();
    assert_eq!(progress.status, "Querying");
    assert_eq!(progress.progress, ProgressValue::Fraction { done: 3, total: 10 });

    let tasks = client.fetch_tasks().await.unwrap();
    assert_eq!(tasks[0].status, TaskStatus::Failed);
    assert_eq!(tasks[0].progress().as_percent(), Some(100.0));
}

#[tokio::test]
async fn study_row_is_posted_for_its_series() {
    let recorded = Recorded::default();
    let base = spawn_server(router(recorded.clone())).await;
    let client = ApiClient::new(base, None).unwrap();

    let study = Record::new()
        .with("source", "PACS")
        .with("level", "STUDY")
        .with("StudyInstanceUID", "1.9.1");
    let series = client.fetch_study_series(&study).await.unwrap();

    assert_eq!(
        recorded.0.lock()[0],
        json!({"source": "PACS", "level": "STUDY", "StudyInstanceUID": "1.9.1"})
    );
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].get_str("level"), Some("SERIES"));
    assert_eq!(series[0].get_str("StudyInstanceUID"), Some("1.9.1"));
    assert_eq!(series[0].get_str("SeriesInstanceUID"), Some("1.9.1.2"));
}

#[tokio::test]
async fn task_action_ignores_plain_text_reply() {
    let recorded = Recorded::default();
    let base = spawn_server(router(recorded.clone())).await;
    let client = ApiClient::new(base, None).unwrap();

    client
        .task_action(&TaskActionRequest {
            action: TaskAction::Continue,
            ids: vec![TaskId::new(7)],
        })
        .await
        .unwrap();

    assert_eq!(
        recorded.0.lock()[0],
        json!({"action": "continue", "ids": [7]})
    );
}

#[tokio::test]
async fn wrong_shape_is_malformed() {
    let base = spawn_server(router(Recorded::default())).await;
    let client = ApiClient::new(base, None).unwrap();

    let query =
        pacstrack_model::StudySearchQuery::today("PACS", parse_form_date("2024-03-05").unwrap());
    let err = client.search_studies(&query).await.unwrap_err();
    assert!(err.is_malformed(), "{err}");
}

#[tokio::test]
async fn error_status_carries_body() {
    let base = spawn_server(router(Recorded::default())).await;
    let client = ApiClient::new(base, None).unwrap();

    let err = client
        .transfer(&TransferRequest {
            destination: "PACS".to_string(),
            items: Vec::new(),
        })
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "queue offline");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(format!("http://{addr}"), None).unwrap();
    let err = client.fetch_devices().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "{err}");
}
