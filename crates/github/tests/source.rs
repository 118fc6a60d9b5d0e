//! Drives `GitHubSource` against an in-process stand-in for the REST v3 API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use github::{GitHubConfig, GitHubSource, PullRequestHandle};
use pipeline::{RecordSource, SourceFetchError, SourceRecord};

#[derive(Default)]
struct Seen {
    queries: Vec<String>,
    authorization: Vec<String>,
    accept: Vec<String>,
}

#[derive(Clone)]
struct Mock {
    base: String,
    seen: Arc<Mutex<Seen>>,
}

impl Mock {
    fn record(&self, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let mut seen = self.seen.lock().unwrap();
        seen.authorization.push(header("authorization"));
        seen.accept.push(header("accept"));
    }
}

async fn search(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    mock.record(&headers);
    mock.seen
        .lock()
        .unwrap()
        .queries
        .push(params.get("q").cloned().unwrap_or_default());
    Json(json!({
        "total_count": 2,
        "items": [
            {
                "html_url": format!("{}/acme/app/pull/7", mock.base),
                "pull_request": { "url": format!("{}/api/v3/repos/acme/app/pulls/7", mock.base) }
            },
            { "html_url": format!("{}/acme/app/issues/8", mock.base) }
        ]
    }))
}

async fn pull_request(State(mock): State<Mock>, headers: HeaderMap) -> Json<Value> {
    mock.record(&headers);
    Json(json!({
        "url": format!("{}/api/v3/repos/acme/app/pulls/7", mock.base),
        "node_id": "PR_kw7",
        "html_url": format!("{}/acme/app/pull/7", mock.base),
        "user": { "login": "octo", "html_url": "https://ghe.example.com/octo" },
        "body": "Fixes login",
        "created_at": "2021-04-01T09:30:00Z",
        "merged_at": "2021-04-02T17:05:09Z",
        "merged_by": { "login": "lead", "html_url": "https://ghe.example.com/lead" },
        "head": { "ref": "feature/login", "sha": "1111111", "repo": { "full_name": "octo/app" } },
        "base": { "ref": "main", "sha": "2222222", "repo": { "full_name": "acme/app" } },
        "_links": { "comments": { "href": format!("{}/api/v3/repos/acme/app/issues/7/comments", mock.base) } }
    }))
}

async fn comments(State(mock): State<Mock>, headers: HeaderMap) -> Json<Value> {
    mock.record(&headers);
    Json(json!([
        {
            "created_at": "2021-04-01T10:00:00.000Z",
            "author_association": "MEMBER",
            "body": "first",
            "user": { "login": "a", "html_url": "https://ghe.example.com/a" }
        },
        {
            "created_at": "2021-04-01T11:00:00.000Z",
            "author_association": "MEMBER",
            "body": "second",
            "user": { "login": "b", "html_url": "https://ghe.example.com/b" }
        }
    ]))
}

async fn reviews(State(mock): State<Mock>, headers: HeaderMap) -> Json<Value> {
    mock.record(&headers);
    Json(json!([
        {
            "submitted_at": "2021-04-02T08:00:00.000Z",
            "author_association": "MEMBER",
            "body": "LGTM",
            "state": "APPROVED",
            "user": { "login": "lead", "html_url": "https://ghe.example.com/lead" }
        }
    ]))
}

async fn start(router: impl FnOnce(Mock) -> Router) -> Mock {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock = Mock {
        base: format!("http://{}", listener.local_addr().unwrap()),
        seen: Arc::default(),
    };
    let app = router(mock.clone());
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    mock
}

fn api(mock: Mock) -> Router {
    Router::new()
        .route("/api/v3/search/issues", get(search))
        .route("/api/v3/repos/acme/app/pulls/7", get(pull_request))
        .route("/api/v3/repos/acme/app/issues/7/comments", get(comments))
        .route("/api/v3/repos/acme/app/pulls/7/reviews", get(reviews))
        .with_state(mock)
}

fn source(mock: &Mock) -> GitHubSource {
    GitHubSource::new(GitHubConfig {
        endpoint: mock.base.clone(),
        access_token: "pat-123".into(),
        query: "repo:acme/app is:merged merged:{start}..{end}".into(),
        date_range_days: 90,
    })
    .unwrap()
}

#[tokio::test]
async fn discovers_only_pull_requests() {
    let mock = start(api).await;
    let source = source(&mock);

    let handles = source.discover().await.unwrap();

    assert_eq!(
        handles,
        vec![PullRequestHandle {
            url: format!("{}/api/v3/repos/acme/app/pulls/7", mock.base),
            html_url: Some(format!("{}/acme/app/pull/7", mock.base)),
        }]
    );
    assert_eq!(source.describe(&handles[0]), format!("{}/acme/app/pull/7", mock.base));

    let seen = mock.seen.lock().unwrap();
    assert_eq!(seen.queries.len(), 1);
    assert!(seen.queries[0].starts_with("repo:acme/app is:merged merged:"));
    assert!(!seen.queries[0].contains("{start}"));
    assert!(!seen.queries[0].contains("{end}"));
}

#[tokio::test]
async fn fetches_details_comments_and_reviews_in_order() {
    let mock = start(api).await;
    let source = source(&mock);
    let handles = source.discover().await.unwrap();

    let record = source.fetch(&handles[0]).await.unwrap();

    let SourceRecord::PullRequest(evidence) = record else {
        panic!("expected a pull request record");
    };
    assert_eq!(evidence.pull_request.node_id.as_deref(), Some("PR_kw7"));
    let bodies: Vec<_> = evidence.comments.iter().filter_map(|c| c.body.as_deref()).collect();
    assert_eq!(bodies, ["first", "second"]);
    assert_eq!(evidence.reviews.len(), 1);
    assert_eq!(evidence.reviews[0].state.as_deref(), Some("APPROVED"));

    let seen = mock.seen.lock().unwrap();
    assert_eq!(seen.authorization.len(), 4);
    assert!(seen.authorization.iter().all(|h| h == "token pat-123"));
    assert!(seen.accept.iter().all(|h| h == "application/json"));
}

#[tokio::test]
async fn error_status_carries_the_url() {
    let mock = start(|mock| {
        Router::new()
            .route("/api/v3/search/issues", get(|| async { StatusCode::UNAUTHORIZED }))
            .with_state(mock)
    })
    .await;

    let err = source(&mock).discover().await.unwrap_err();

    match err {
        SourceFetchError::Status { url, status } => {
            assert_eq!(status, 401);
            assert!(url.contains("/api/v3/search/issues?q="));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unexpected_json_shape_is_a_decode_error() {
    let mock = start(|mock| {
        Router::new()
            .route(
                "/api/v3/repos/acme/app/pulls/7",
                get(|| async { Json(json!(["not", "an", "object"])) }),
            )
            .with_state(mock)
    })
    .await;
    let handle = PullRequestHandle {
        url: format!("{}/api/v3/repos/acme/app/pulls/7", mock.base),
        html_url: None,
    };

    let err = source(&mock).fetch(&handle).await.unwrap_err();

    assert!(matches!(err, SourceFetchError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let source = GitHubSource::new(GitHubConfig {
        endpoint: base,
        access_token: "pat-123".into(),
        query: "is:pr".into(),
        date_range_days: 1,
    })
    .unwrap();

    let err = source.discover().await.unwrap_err();

    assert!(matches!(err, SourceFetchError::Transport { .. }));
}
