use std::io::{Cursor, Read};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use epubify_core::job::ConversionRequest;

use crate::integration::common::{docs_site, docs_site_with_delay, setup_test_app};

#[tokio::test]
async fn root_returns_banner() {
    let app = setup_test_app();

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["message"], "Epubify API");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn health_reports_task_count() {
    let app = setup_test_app();
    app.state
        .converter
        .create_job(ConversionRequest::new("https://docs.example.com/"))
        .await
        .unwrap();

    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["tasks"], 1);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn convert_without_url_returns_400() {
    let app = setup_test_app();

    let response = app.post_json("/convert", json!({ "title": "No URL" })).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "validation_error");
}

#[tokio::test]
async fn convert_with_blank_url_returns_400() {
    let app = setup_test_app();

    let response = app.post_json("/convert", json!({ "url": "   " })).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "validation_error");
}

#[tokio::test]
async fn unknown_task_returns_404() {
    let app = setup_test_app();
    let id = uuid::Uuid::new_v4();

    for uri in [format!("/status/{id}"), format!("/download/{id}")] {
        let response = app.get(&uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(response.json()["error"], "not_found");
    }

    let response = app.send(delete_request(&id.to_string())).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_task_id_returns_404() {
    let app = setup_test_app();

    let response = app.get("/status/not-a-uuid").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "not_found");
}

#[tokio::test]
async fn pending_task_status_and_download() {
    let app = setup_test_app();
    let job = app
        .state
        .converter
        .create_job(ConversionRequest::new("https://docs.example.com/"))
        .await
        .unwrap();

    let status = app.get(&format!("/status/{}", job.id)).await;
    assert_eq!(status.status, StatusCode::OK);
    let json = status.json();
    assert_eq!(json["task_id"], job.id.to_string());
    assert_eq!(json["status"], "pending");
    assert_eq!(json["progress"], 0);
    assert_eq!(json["message"], "Conversion queued");
    assert!(json["download_url"].is_null());

    let download = app.get(&format!("/download/{}", job.id)).await;
    assert_eq!(download.status, StatusCode::BAD_REQUEST);
    let json = download.json();
    assert_eq!(json["error"], "not_ready");
    assert_eq!(json["message"], "Conversion not completed yet");
}

fn delete_request(task_id: &str) -> Request<Body> {
    Request::delete(format!("/task/{task_id}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn delete_refuses_pending_task() {
    let app = setup_test_app();
    let job = app
        .state
        .converter
        .create_job(ConversionRequest::new("https://docs.example.com/"))
        .await
        .unwrap();

    let response = app.send(delete_request(&job.id.to_string())).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "not_ready");

    let status = app.get(&format!("/status/{}", job.id)).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.json()["status"], "pending");
}

#[tokio::test]
async fn delete_running_task_is_refused_and_finished_task_stays_deleted() {
    let site = docs_site_with_delay(Duration::from_millis(200)).await;
    let app = setup_test_app();

    let response = app
        .post_json("/convert", json!({ "url": format!("{}/docs/", site.uri()) }))
        .await;
    let task_id = response.json()["task_id"].as_str().unwrap().to_string();

    let refused = app.send(delete_request(&task_id)).await;
    assert_eq!(refused.status, StatusCode::BAD_REQUEST);
    assert_eq!(refused.json()["error"], "not_ready");

    let status = app.wait_for_terminal(&task_id).await;
    assert_eq!(status["status"], "completed");

    let deleted = app.send(delete_request(&task_id)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.json()["message"], "Task deleted successfully");

    tokio::time::sleep(Duration::from_millis(300)).await;
    let status = app.get(&format!("/status/{task_id}")).await;
    assert_eq!(status.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/health").await.json()["tasks"], 0);
}

#[tokio::test]
async fn converts_documentation_site_end_to_end() {
    let site = docs_site().await;
    let app = setup_test_app();

    let response = app
        .post_json(
            "/convert",
            json!({ "url": format!("{}/docs/", site.uri()), "title": "My Guide" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let json = response.json();
    assert_eq!(json["message"], "Conversion started");
    let task_id = json["task_id"].as_str().unwrap().to_string();

    let status = app.wait_for_terminal(&task_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["progress"], 100);
    assert_eq!(status["message"], "Conversion completed successfully!");
    assert_eq!(status["download_url"], format!("/download/{task_id}"));

    let download = app.get(&format!("/download/{task_id}")).await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.headers["content-type"], "application/epub+zip");
    assert_eq!(
        download.headers["content-disposition"],
        "attachment; filename=\"My_Guide.epub\""
    );

    let mut archive = zip::ZipArchive::new(Cursor::new(download.body)).unwrap();
    assert_eq!(archive.by_index(0).unwrap().name(), "mimetype");
    assert!(archive.by_name("OEBPS/chapter2.xhtml").is_err());

    let mut nav = String::new();
    archive
        .by_name("OEBPS/toc.xhtml")
        .unwrap()
        .read_to_string(&mut nav)
        .unwrap();
    assert!(nav.contains(r#"<a href="chapter0.xhtml">Introduction</a>"#));
    assert!(nav.contains(r#"<a href="chapter1.xhtml">Setup &amp; Install</a>"#));

    let mut chapter = String::new();
    archive
        .by_name("OEBPS/chapter0.xhtml")
        .unwrap()
        .read_to_string(&mut chapter)
        .unwrap();
    assert!(chapter.contains("converts documentation sites into books"));
    assert!(chapter.contains(&format!("{}/docs/intro.html", site.uri())));
}

#[tokio::test]
async fn unreachable_index_marks_task_failed() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&site)
        .await;
    let app = setup_test_app();

    let response = app
        .post_json("/convert", json!({ "url": format!("{}/docs/", site.uri()) }))
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let task_id = response.json()["task_id"].as_str().unwrap().to_string();

    let status = app.wait_for_terminal(&task_id).await;
    assert_eq!(status["status"], "failed");
    assert!(
        status["message"]
            .as_str()
            .unwrap()
            .starts_with("Conversion failed:")
    );

    let download = app.get(&format!("/download/{task_id}")).await;
    assert_eq!(download.status, StatusCode::BAD_REQUEST);
    assert_eq!(download.json()["error"], "not_ready");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app();

    let response = app.get("/api-docs/openapi.json").await;

    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["info"]["title"], "Epubify API");
    assert!(json["paths"]["/convert"].is_object());
}
