pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::session::handlers as sessions;
use crate::state::AppState;
use crate::structure::handlers as structure;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stateless document tools
        .route("/api/v1/structure", post(structure::handle_structure))
        .route("/api/v1/normalize", post(structure::handle_normalize))
        .route("/api/v1/validate", post(structure::handle_validate))
        // Editing sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(sessions::handle_get_session).delete(sessions::handle_delete_session),
        )
        .route("/api/v1/sessions/:id/history", get(sessions::handle_history))
        .route("/api/v1/sessions/:id/apply", post(sessions::handle_apply))
        .route("/api/v1/sessions/:id/undo", post(sessions::handle_undo))
        .route("/api/v1/sessions/:id/redo", post(sessions::handle_redo))
        .route("/api/v1/sessions/:id/locks", put(sessions::handle_set_locks))
        .route("/api/v1/sessions/:id/suggest", post(sessions::handle_suggest))
        .route("/api/v1/sessions/:id/diagnose", post(sessions::handle_diagnose))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::RetryPolicy;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Config {
            port: 0,
            rust_log: "info".into(),
            collaborator_url: None,
            collaborator_retry: RetryPolicy::default(),
            collaborator_timeout: Duration::from_secs(1),
            default_locked_paths: vec!["/basics/name".into()],
        };
        AppState::new(config, None)
    }

    fn resume() -> Value {
        json!({
            "basics": {
                "name": "Jane Doe",
                "label": "Engineer",
                "email": "jane@example.com",
                "phone": "+1 555 123 4567",
                "links": []
            },
            "summary": "",
            "skills": ["Rust"],
            "work": [],
            "projects": [],
            "education": [],
            "certs": []
        })
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state());
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_validate_reports_violations() {
        let app = build_router(test_state());
        let mut doc = resume();
        doc["work"] = json!([{ "position": "x" }]);
        let (status, body) = call(&app, Method::POST, "/api/v1/validate", Some(json!({ "resume": doc }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], false);
        assert!(!body["errors"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_structure_requires_input() {
        let app = build_router(test_state());
        let (status, body) = call(&app, Method::POST, "/api/v1/structure", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_structure_fallback_without_collaborator() {
        let app = build_router(test_state());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/structure",
            Some(json!({ "rawText": "Jane Doe\nExperience\nsomething", "fallback": true })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "COLLABORATOR_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_session_edit_flow() {
        let app = build_router(test_state());
        let (status, created) =
            call(&app, Method::POST, "/api/v1/sessions", Some(json!({ "resume": resume() }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["version"], 1);
        let id = created["id"].as_str().unwrap().to_string();

        // Default lock on /basics/name rejects the atomic batch.
        let rename = json!({
            "patch": [{
                "id": "s1", "path": "/basics/name", "kind": "replace",
                "oldValue": "Jane Doe", "newValue": "J. Doe",
                "rationale": "shorter", "provenance": "from_user"
            }]
        });
        let (status, body) =
            call(&app, Method::POST, &format!("/api/v1/sessions/{id}/apply"), Some(rename)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "locked");

        let add_skill = json!({
            "patch": [{
                "id": "s2", "path": "/skills/1", "kind": "insert",
                "newValue": "Go",
                "rationale": "relevant", "provenance": "from_user"
            }]
        });
        let (status, report) =
            call(&app, Method::POST, &format!("/api/v1/sessions/{id}/apply"), Some(add_skill)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["version"], 2);
        assert_eq!(report["document"]["skills"], json!(["Rust", "Go"]));

        let (status, undone) =
            call(&app, Method::POST, &format!("/api/v1/sessions/{id}/undo"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(undone["resume"]["skills"], json!(["Rust"]));
        assert_eq!(undone["canRedo"], true);

        let (status, history) =
            call(&app, Method::GET, &format!("/api/v1/sessions/{id}/history"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["current"], 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = build_router(test_state());
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());
        let (status, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_session_frees_it() {
        let app = build_router(test_state());
        let (_, created) =
            call(&app, Method::POST, "/api/v1/sessions", Some(json!({ "resume": resume() }))).await;
        let uri = format!("/api/v1/sessions/{}", created["id"].as_str().unwrap());

        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_session_rejects_invalid_resume() {
        let app = build_router(test_state());
        let mut doc = resume();
        doc["basics"]["email"] = json!("");
        let (status, body) =
            call(&app, Method::POST, "/api/v1/sessions", Some(json!({ "resume": doc }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "SCHEMA_INVALID");
        assert_eq!(body["error"]["details"]["violations"][0]["path"], "/basics/email");
    }

    #[tokio::test]
    async fn test_diagnose_session() {
        let app = build_router(test_state());
        let (_, created) =
            call(&app, Method::POST, "/api/v1/sessions", Some(json!({ "resume": resume() }))).await;
        let id = created["id"].as_str().unwrap();
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/diagnose"),
            Some(json!({ "role": "Full-stack" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gaps"], json!(["Surface TypeScript if relevant"]));
    }
}
