//! Route table and handlers translating HTTP into dispatcher calls

use super::error::HttpError;
use crate::dispatch::{Dispatcher, Target};
use crate::error::DispatchError;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use dispatch_shared::{codec, routes, DroneId};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the dispatch router
///
/// | Method | Path       | Operation                                  |
/// |--------|------------|--------------------------------------------|
/// | POST   | `/connect` | park until assigned, then `302` to actions |
/// | GET    | `/actions` | collect the assigned task                  |
/// | POST   | `/actions` | submit a task                              |
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route(
            routes::CONNECT,
            post(connect).fallback(method_not_allowed),
        )
        .route(
            routes::ACTIONS,
            // HEAD would otherwise run the GET handler and consume the task
            get(collect_actions)
                .head(method_not_allowed)
                .post(submit_actions)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Long-poll registration; the response is written only once a task is assigned
async fn connect(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> Result<Response, HttpError> {
    let drone_id = codec::decode_drone_request(&body).map_err(DispatchError::from)?;
    let drone_id = dispatcher.register(drone_id).await?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, routes::actions_location(drone_id))],
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct ActionsQuery {
    id: Option<String>,
}

async fn collect_actions(
    State(dispatcher): State<Arc<Dispatcher>>,
    Query(query): Query<ActionsQuery>,
) -> Result<Response, HttpError> {
    let drone_id: DroneId = query
        .id
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(DispatchError::from)?;

    let payload = dispatcher.collect(drone_id).await?;
    let body = codec::encode_payload(&payload).map_err(DispatchError::EncodingFailure)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn submit_actions(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> Result<StatusCode, HttpError> {
    // Pilots have always seen 500 for undecodable submissions
    let submission = codec::decode_actions_request(&body).map_err(HttpError::internal)?;
    dispatcher.submit(Target::from(submission.target), submission.payload)?;
    Ok(StatusCode::OK)
}

async fn not_found() -> HttpError {
    HttpError::not_found()
}

async fn method_not_allowed() -> HttpError {
    HttpError::method_not_allowed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use dispatch_shared::TaskPayload;
    use std::time::Duration;
    use tower::ServiceExt;

    fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn wait_for_len(dispatcher: &Dispatcher, len: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while dispatcher.queue_len() != len {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queue never reached expected length");
    }

    fn app() -> (Router, Arc<Dispatcher>) {
        let dispatcher = Arc::new(Dispatcher::default());
        (router(dispatcher.clone()), dispatcher)
    }

    #[tokio::test]
    async fn test_connect_method_not_allowed() {
        let (app, _) = app();
        let response = app.oneshot(request("GET", "/connect", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_string(response).await, "method not allowed\n");
    }

    #[tokio::test]
    async fn test_actions_method_not_allowed() {
        let (app, _) = app();
        let response = app.oneshot(request("PATCH", "/actions", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_string(response).await, "method not allowed\n");
    }

    #[tokio::test]
    async fn test_head_actions_keeps_task() {
        let (app, dispatcher) = app();

        let connecting = tokio::spawn(
            app.clone()
                .oneshot(request("POST", "/connect", r#"{"droneID":"1"}"#)),
        );
        wait_for_len(&dispatcher, 1).await;
        dispatcher
            .submit(Target::Any, TaskPayload::new(6, vec!["hover".into()]))
            .unwrap();
        connecting.await.unwrap().unwrap();

        let response = app
            .clone()
            .oneshot(request("HEAD", "/actions?id=1", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(dispatcher.queue_len(), 1);

        let response = app.oneshot(request("GET", "/actions?id=1", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(decode_task(&body_string(response).await).item_id, 6);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (app, _) = app();
        let response = app.oneshot(request("GET", "/checkplus", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "not found\n");
    }

    #[tokio::test]
    async fn test_submit_without_drones() {
        let (app, dispatcher) = app();
        let response = app
            .oneshot(request(
                "POST",
                "/actions",
                r#"{"itemID":"1","actions":["deploy"]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "no available drones\n");
        assert_eq!(dispatcher.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_submit_malformed_body() {
        let (app, _) = app();
        let response = app.oneshot(request("POST", "/actions", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_connect_malformed_id() {
        let (app, dispatcher) = app();
        let response = app
            .oneshot(request("POST", "/connect", r#"{"droneID":"one"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(dispatcher.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_collect_unknown_drone() {
        let (app, _) = app();
        let response = app.oneshot(request("GET", "/actions?id=5", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "no drone found with this ID\n");
    }

    #[tokio::test]
    async fn test_collect_missing_id() {
        let (app, _) = app();
        let response = app.oneshot(request("GET", "/actions", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_connect_submit_collect() {
        let (app, dispatcher) = app();

        let connecting = tokio::spawn(
            app.clone()
                .oneshot(request("POST", "/connect", r#"{"droneID":"1"}"#)),
        );
        wait_for_len(&dispatcher, 1).await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/actions",
                r#"{"itemID":"1","actions":["deploy"]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.is_empty());

        let redirect = connecting.await.unwrap().unwrap();
        assert_eq!(redirect.status(), StatusCode::FOUND);
        let location = redirect.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert_eq!(location, "/actions?id=1");

        let response = app.oneshot(request("GET", &location, "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        let task: TaskPayload = decode_task(&body);
        assert_eq!(task, TaskPayload::new(1, vec!["deploy".into()]));
        assert_eq!(dispatcher.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_targeted_submit_over_http() {
        let (app, dispatcher) = app();

        let first = tokio::spawn(
            app.clone()
                .oneshot(request("POST", "/connect", r#"{"droneID":"1"}"#)),
        );
        wait_for_len(&dispatcher, 1).await;
        let second = tokio::spawn(
            app.clone()
                .oneshot(request("POST", "/connect", r#"{"droneID":"2"}"#)),
        );
        wait_for_len(&dispatcher, 2).await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/actions",
                r#"{"itemID":"8","actions":["scan"],"droneID":"2"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let redirect = second.await.unwrap().unwrap();
        assert_eq!(redirect.headers()[header::LOCATION], "/actions?id=2");
        assert!(!first.is_finished());

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/actions",
                r#"{"itemID":"9","actions":["scan"],"droneID":"7"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "no drone found with this ID\n");
        first.abort();
    }

    #[tokio::test]
    async fn test_duplicate_connect_conflict() {
        let (app, dispatcher) = app();

        let parked = tokio::spawn(
            app.clone()
                .oneshot(request("POST", "/connect", r#"{"droneID":"4"}"#)),
        );
        wait_for_len(&dispatcher, 1).await;

        let response = app
            .oneshot(request("POST", "/connect", r#"{"droneID":"4"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_string(response).await, "drone already queued\n");
        parked.abort();
    }

    fn decode_task(body: &str) -> TaskPayload {
        codec::decode_payload(body.as_bytes()).unwrap()
    }
}
