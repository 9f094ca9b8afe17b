use std::future::poll_fn;
use std::pin::pin;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::IntoResponse;
use booksense_gemini_model::{
    Error, GeminiConfigBuilder, GeminiProvider, GeminiResponse,
};
use booksense_model::{
    ErrorKind, ModelMessage, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tokio::net::TcpListener;

const API_KEY: &str = "test-secret-key";

#[derive(Debug)]
struct ReceivedRequest {
    uri: String,
    api_key: Option<String>,
}

struct FakeService {
    status: StatusCode,
    content_type: &'static str,
    body: &'static str,
    received: Mutex<Vec<ReceivedRequest>>,
}

async fn handle(
    State(service): State<Arc<FakeService>>,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    service.received.lock().unwrap().push(ReceivedRequest {
        uri: uri.to_string(),
        api_key,
    });
    (
        service.status,
        [(header::CONTENT_TYPE, service.content_type)],
        service.body,
    )
}

/// Serves one canned response on a local port and returns the provider
/// pointed at it.
async fn serve(
    status: StatusCode,
    content_type: &'static str,
    body: &'static str,
) -> (GeminiProvider, Arc<FakeService>) {
    let service = Arc::new(FakeService {
        status,
        content_type,
        body,
        received: Mutex::default(),
    });
    let app = Router::new()
        .fallback(handle)
        .with_state(Arc::clone(&service));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = GeminiConfigBuilder::with_api_key(API_KEY)
        .with_base_url(format!("http://{addr}/v1beta"))
        .build();
    (GeminiProvider::new(config), service)
}

fn request(model: &str) -> ModelRequest {
    ModelRequest {
        model: model.to_owned(),
        messages: vec![ModelMessage::User("Recommend 3 books".to_owned())],
    }
}

async fn collect_text(resp: GeminiResponse) -> Result<String, Error> {
    let mut resp = pin!(resp);
    let mut text = String::new();
    while let Some(event) =
        poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
    {
        if let ModelResponseEvent::MessageDelta(delta) = event {
            text.push_str(&delta);
        }
    }
    Ok(text)
}

#[tokio::test]
async fn test_streamed_reply() {
    let (provider, service) = serve(
        StatusCode::OK,
        "text/event-stream",
        include_str!("../fixtures/stream_response.txt"),
    )
    .await;

    let resp = provider.send_request(&request("gemini-2.5-flash")).await;
    let text = collect_text(resp.unwrap()).await.unwrap();
    assert_eq!(text, "Try Dune, Siddhartha and Momo.");

    let received = service.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].uri,
        "/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
    );
    assert_eq!(received[0].api_key.as_deref(), Some(API_KEY));
    assert!(!received[0].uri.contains(API_KEY));
}

#[tokio::test]
async fn test_model_stays_in_one_segment() {
    let (provider, service) = serve(
        StatusCode::OK,
        "text/event-stream",
        include_str!("../fixtures/stream_response.txt"),
    )
    .await;

    provider
        .send_request(&request("x/../../admin?debug=1#"))
        .await
        .unwrap();

    let received = service.received.lock().unwrap();
    assert_eq!(
        received[0].uri,
        "/v1beta/models/x%2F..%2F..%2Fadmin%3Fdebug=1%23:streamGenerateContent?alt=sse"
    );
}

#[tokio::test]
async fn test_unexpected_content_type() {
    let (provider, _) =
        serve(StatusCode::OK, "application/json", r#"{"candidates": []}"#)
            .await;

    let err = provider
        .send_request(&request("gemini-2.5-flash"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn test_service_error() {
    let (provider, _) = serve(
        StatusCode::TOO_MANY_REQUESTS,
        "application/json",
        r#"{"error": {"code": 429, "message": "Quota exceeded.", "status": "RESOURCE_EXHAUSTED"}}"#,
    )
    .await;

    let err = provider
        .send_request(&request("gemini-2.5-flash"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    assert_eq!(err.to_string(), "[429 RESOURCE_EXHAUSTED] Quota exceeded.");
}

#[tokio::test]
async fn test_rejected_key() {
    let (provider, _) =
        serve(StatusCode::FORBIDDEN, "text/plain", "Permission denied").await;

    let err = provider
        .send_request(&request("gemini-2.5-flash"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "[403] Permission denied");
}
