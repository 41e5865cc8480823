#![cfg(feature = "web")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use equipment_visualizer::app::{AppState, router};
use equipment_visualizer::config::AppConfig;
use equipment_visualizer::store::DatasetStore;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "test-token";
const BOUNDARY: &str = "X-EQUIPMENT-BOUNDARY";
const HEADER: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature";

fn test_app(dir: &TempDir) -> Router {
    test_app_with(dir, |_| {})
}

fn test_app_with(dir: &TempDir, tweak: impl FnOnce(&mut AppConfig)) -> Router {
    let mut config = AppConfig::with_token(TOKEN);
    config.data_dir = dir.path().to_path_buf();
    tweak(&mut config);
    let store = DatasetStore::open(&config.data_dir, config.retention_limit).unwrap();
    router(Arc::new(AppState {
        config,
        store: Arc::new(store),
    }))
}

fn multipart_body(field: &str, file_name: &str, content: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n--{b}--\r\n",
        b = BOUNDARY
    )
    .into_bytes()
}

fn upload_request(field: &str, content: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::AUTHORIZATION, format!("Token {}", TOKEN))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, "equipment.csv", content)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn sample_csv() -> String {
    format!("{HEADER}\nPump1,Pump,10,5,70\nPump2,Valve,20,ND,80\n")
}

#[tokio::test]
async fn upload_returns_summary_and_id() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, body) = send_json(&app, upload_request("file", &sample_csv())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Uploaded successfully");
    assert_eq!(body["dataset_id"], 1);
    assert_eq!(body["summary"]["total_count"], 2);
    assert_eq!(body["summary"]["averages"]["Pressure"], 5.0);
    assert_eq!(body["summary"]["averages"]["Flowrate"], 15.0);
    assert_eq!(body["summary"]["averages"]["Temperature"], 75.0);
    assert_eq!(body["summary"]["type_distribution"]["Pump"], 1);
    assert_eq!(body["summary"]["type_distribution"]["Valve"], 1);
}

#[tokio::test]
async fn undefined_mean_is_null_in_json() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let csv = format!("{HEADER}\nA,Pump,1,ND,3\n");
    let (status, body) = send_json(&app, upload_request("file", &csv)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["summary"]["averages"]["Pressure"].is_null());
    assert_eq!(body["summary"]["averages"]["Flowrate"], 1.0);
}

#[tokio::test]
async fn short_rows_count_with_missing_cells() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let csv = format!("{HEADER}\nPump1,Pump,10,5,70\nPump2,Valve,20\n");
    let (status, body) = send_json(&app, upload_request("file", &csv)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["summary"]["total_count"], 2);
    assert_eq!(body["summary"]["averages"]["Flowrate"], 15.0);
    assert_eq!(body["summary"]["averages"]["Pressure"], 5.0);
}

#[tokio::test]
async fn requests_without_valid_token_are_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let anonymous = Request::builder()
        .uri("/api/history")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication credentials were not provided.");

    let wrong = Request::builder()
        .uri("/api/history")
        .header(header::AUTHORIZATION, "Token wrong")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token.");
}

#[tokio::test]
async fn health_needs_no_token() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_columns_are_listed() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let csv = "Equipment Name,Flowrate,Temperature\nPump1,10,70\n";
    let (status, body) = send_json(&app, upload_request("file", csv)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required columns");
    assert_eq!(body["code"], "missing_columns");
    assert_eq!(body["missing"], serde_json::json!(["Type", "Pressure"]));
}

#[tokio::test]
async fn malformed_csv_is_rejected_and_not_stored() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let csv = format!("{HEADER}\nPump1,Pump,10,5,70,extra\n");
    let (status, body) = send_json(&app, upload_request("file", &csv)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid CSV format");
    assert!(body["detail"].is_string());

    let (status, _) = send_json(&app, get("/api/summary/latest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, body) = send_json(&app, upload_request("attachment", &sample_csv())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app_with(&dir, |config| config.max_upload_bytes = 256);

    let mut csv = HEADER.to_string();
    for i in 0..500 {
        csv.push_str(&format!("\nPump{},Pump,1,2,3", i));
    }
    let (status, _) = send(&app, upload_request("file", &csv)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn latest_is_404_until_first_upload() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, body) = send_json(&app, get("/api/summary/latest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No dataset found");

    send(&app, upload_request("file", &sample_csv())).await;
    send(&app, upload_request("file", &sample_csv())).await;

    let (status, body) = send_json(&app, get("/api/summary/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 2);
    assert_eq!(body["row_count"], 2);
    assert_eq!(body["uploaded_by"], "admin");
    assert_eq!(body["original_name"], "equipment.csv");
    assert!(body["uploaded_at"].is_string());
}

#[tokio::test]
async fn history_keeps_the_last_five_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    for _ in 0..8 {
        let (status, _) = send(&app, upload_request("file", &sample_csv())).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send_json(&app, get("/api/history")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![8, 7, 6, 5, 4]);

    let (status, _) = send(&app, get("/api/report/3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_is_a_pdf_attachment() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);
    send(&app, upload_request("file", &sample_csv())).await;

    let response = app.clone().oneshot(get("/api/report/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"dataset_1.pdf\""
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"%PDF"));

    let (status, body) = send_json(&app, get("/api/report/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn admin_delete_removes_dataset() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);
    send(&app, upload_request("file", &sample_csv())).await;

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/datasets/1")
        .header(header::AUTHORIZATION, format!("Token {}", TOKEN))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get("/api/report/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_json(&app, get("/api/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn concurrent_uploads_respect_the_cap() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let mut handles = Vec::new();
    for _ in 0..12 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            send(&app, upload_request("file", &sample_csv())).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let (_, body) = send_json(&app, get("/api/history")).await;
    let ids: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![12, 11, 10, 9, 8]);
}
