use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use epubify_core::config::ConversionConfig;
use epubify_core::registry::MemoryRegistry;
use epubify_server::routes;
use epubify_server::state::AppState;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Build the app with the private-address guard off so it can reach wiremock.
pub fn setup_test_app() -> TestApp {
    let config = ConversionConfig::default()
        .allow_private_urls()
        .with_fetch_timeout(Duration::from_secs(5));
    let state = Arc::new(AppState::new(config, MemoryRegistry::new()).unwrap());

    TestApp {
        router: routes::router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, json: serde_json::Value) -> TestResponse {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Poll `/status/{id}` until the job leaves `pending`/`processing`.
    pub async fn wait_for_terminal(&self, task_id: &str) -> serde_json::Value {
        for _ in 0..100 {
            let json = self.get(&format!("/status/{task_id}")).await.json();
            if json["status"] == "completed" || json["status"] == "failed" {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("task {task_id} did not finish");
    }
}

fn article_page(title: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>{title} | Example Docs</title></head>
           <body>
             <nav class="sidebar"><a href="/docs/intro.html">Introduction</a></nav>
             <article><h1>{title}</h1><p>{body}</p></article>
           </body></html>"#
    )
}

/// A small documentation site: an index with a sidebar linking two real
/// pages and one missing page.
pub async fn docs_site() -> MockServer {
    docs_site_with_delay(Duration::ZERO).await
}

/// [`docs_site`] whose article pages each take `delay` to respond.
pub async fn docs_site_with_delay(delay: Duration) -> MockServer {
    let server = MockServer::start().await;

    let index = r#"<html><head><title>Example Docs</title></head><body>
        <nav class="sidebar">
          <a href="/docs/intro.html">Introduction</a>
          <a href="/docs/setup.html">Setup</a>
          <a href="/docs/missing.html">Missing</a>
          <a href="/docs/guide.pdf">PDF</a>
        </nav>
        <p>Welcome.</p>
      </body></html>"#;

    let pages = [
        ("/docs/", index.to_string()),
        (
            "/docs/intro.html",
            article_page(
                "Introduction",
                &"The tool converts documentation sites into books, chapter by chapter. ".repeat(4),
            ),
        ),
        (
            "/docs/setup.html",
            article_page(
                "Setup & Install",
                &"Install the package, then run the setup command once, and verify it works. "
                    .repeat(4),
            ),
        ),
    ];

    for (route, html) in pages {
        let page_delay = if route == "/docs/" { Duration::ZERO } else { delay };
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(html, "text/html; charset=utf-8")
                    .set_delay(page_delay),
            )
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/docs/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    server
}
