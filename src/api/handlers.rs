//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ConversationListResponse, ConversationResponse, ConversationWithActivitiesResponse,
    CreateSessionRequest, DraftRequest, ErrorResponse, MessageRequest, NavigateRequest,
    SelectSectionRequest, SubmitRequest,
};
use super::AppState;
use crate::runtime::{RuntimeError, TurnOutcome};
use crate::writing::{
    ExitResponse, SessionView, SubmissionOutcome, SubmitRejection, SubmitResponse, WritingError,
    WritingTask,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversations
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/new", post(create_conversation))
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/conversations/:id/messages", post(send_message))
        .route("/api/conversations/:id/stream", get(stream_conversation))
        // Writing sessions
        .route("/api/writing/sessions", post(create_session))
        .route("/api/writing/sessions/:id", get(get_session))
        .route("/api/writing/sessions/:id/select", post(select_section))
        .route("/api/writing/sessions/:id/navigate", post(navigate))
        .route("/api/writing/sessions/:id/draft", put(save_draft))
        .route("/api/writing/sessions/:id/submit", post(submit))
        .route("/api/writing/sessions/:id/exit", post(request_exit))
        .route("/api/writing/sessions/:id/exit/confirm", post(confirm_exit))
        .route("/api/writing/sessions/:id/exit/cancel", post(cancel_exit))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversations
// ============================================================

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let conversations = state
        .runtime
        .db()
        .list_conversations()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ConversationListResponse {
        conversations: conversations
            .into_iter()
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
            .collect(),
    }))
}

async fn create_conversation(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ConversationResponse>), AppError> {
    let conversation = state.runtime.create_conversation()?;
    let conversation =
        serde_json::to_value(conversation).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(ConversationResponse { conversation })))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationWithActivitiesResponse>, AppError> {
    let db = state.runtime.db();
    let conversation = db.get_conversation(&id).map_err(RuntimeError::from)?;
    let activities = db.get_activities(&id).map_err(RuntimeError::from)?;

    Ok(Json(ConversationWithActivitiesResponse {
        conversation: serde_json::to_value(conversation)
            .map_err(|e| AppError::Internal(e.to_string()))?,
        activities: activities
            .into_iter()
            .map(|a| serde_json::to_value(a).unwrap_or(Value::Null))
            .collect(),
    }))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    let outcome = state.runtime.send_message(&id, &req.text).await?;
    Ok(Json(outcome))
}

async fn stream_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (init, rx) = state.runtime.subscribe(&id).await?;
    Ok(sse_stream(init, rx))
}

// ============================================================
// Writing sessions
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let defaults = WritingTask::default();
    let task = WritingTask {
        task_type: req.task_type.unwrap_or(defaults.task_type),
        question_number: req.question_number.unwrap_or(defaults.question_number),
    };
    let view = state.writing.create_session(task).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.writing.get(&id).await?))
}

async fn select_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SelectSectionRequest>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.writing.select_section(&id, req.section).await?))
}

async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.writing.navigate(&id, req.direction).await?))
}

async fn save_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        state.writing.save_draft(&id, req.section, &req.text).await?,
    ))
}

/// Oracle failures answer 502 but still carry the session so the client can
/// show the kept draft and the remaining attempts
async fn submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let response = state
        .writing
        .submit(&id, req.section, req.text.as_deref())
        .await?;
    let status = match response.outcome {
        SubmissionOutcome::Graded { .. } => StatusCode::OK,
        SubmissionOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    Ok((status, Json(response)))
}

async fn request_exit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExitResponse>, AppError> {
    Ok(Json(state.writing.request_exit(&id).await?))
}

async fn confirm_exit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExitResponse>, AppError> {
    Ok(Json(state.writing.confirm_exit(&id).await?))
}

async fn cancel_exit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.writing.cancel_exit(&id).await?))
}

async fn get_version() -> &'static str {
    concat!("english-ready ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::NotFound(_) => AppError::NotFound(e.to_string()),
            RuntimeError::Storage(_) | RuntimeError::Transition(_) | RuntimeError::Stopped(_) => {
                tracing::error!(error = %e, "Turn failed");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl From<WritingError> for AppError {
    fn from(e: WritingError) -> Self {
        match e {
            WritingError::NotFound(_) => AppError::NotFound(e.to_string()),
            WritingError::Rejected(SubmitRejection::EmptyText) => AppError::BadRequest(e.to_string()),
            WritingError::Rejected(_) => AppError::Conflict(e.to_string()),
            WritingError::Storage(_) => {
                tracing::error!(error = %e, "Writing storage failed");
                AppError::Internal(e.to_string())
            }
            WritingError::Grading(_) => AppError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot;
    use crate::db::Database;
    use crate::grading::FeedbackPayload;
    use crate::recognizer::UnconfiguredRecognizer;
    use crate::runtime::testing::{InMemoryStorage, MockOracle};
    use crate::runtime::RuntimeManager;
    use crate::writing::{AttemptPolicy, WritingService};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(oracle: Arc<MockOracle>, root: &str) -> Router {
        let runtime = RuntimeManager::new(
            Database::open_in_memory().unwrap(),
            Arc::new(bot::registry().unwrap()),
            Arc::new(UnconfiguredRecognizer),
            root,
        );
        let writing = WritingService::new(
            Arc::new(InMemoryStorage::new()),
            oracle,
            AttemptPolicy::ConsumeBeforeGrading,
        );
        create_router(AppState::new(runtime, writing))
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_chat_turn_over_http() {
        let router = router(Arc::new(MockOracle::new()), bot::HELLO_CHAIN);
        let (status, created) = call(&router, "POST", "/api/conversations/new", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["conversation"]["id"].as_str().unwrap().to_string();

        let uri = format!("/api/conversations/{id}/messages");
        let (status, turn) = call(&router, "POST", &uri, Some(serde_json::json!({"text": "hey"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(turn["status"], "waiting");

        let (_, turn) = call(&router, "POST", &uri, Some(serde_json::json!({"text": "Hi"}))).await;
        assert_eq!(turn["status"], "completed");

        let (status, full) = call(&router, "GET", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(full["activities"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_404() {
        let router = router(Arc::new(MockOracle::new()), bot::MAIN);
        let (status, body) = call(
            &router,
            "POST",
            "/api/conversations/missing/messages",
            Some(serde_json::json!({"text": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn test_submit_status_codes() {
        let oracle = Arc::new(MockOracle::new());
        oracle.queue_response(Ok(FeedbackPayload {
            grade: Some(72.0),
            ..FeedbackPayload::default()
        }));
        let router = router(oracle, bot::MAIN);

        let (status, session) = call(&router, "POST", "/api/writing/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = session["id"].as_str().unwrap().to_string();
        let uri = format!("/api/writing/sessions/{id}/submit");

        let (status, _) = call(
            &router,
            "POST",
            &uri,
            Some(serde_json::json!({"section": "introduction", "text": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &router,
            "POST",
            &uri,
            Some(serde_json::json!({"section": "introduction", "text": "The chart shows sales."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["status"], "graded");

        // Nothing queued: the oracle fails and the draft survives
        let (status, body) = call(
            &router,
            "POST",
            &uri,
            Some(serde_json::json!({"section": "analysis", "text": "Sales doubled."})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["outcome"]["status"], "failed");
    }

    #[tokio::test]
    async fn test_exit_flow_and_closed_session() {
        let router = router(Arc::new(MockOracle::new()), bot::MAIN);
        let (_, session) = call(&router, "POST", "/api/writing/sessions", None).await;
        let id = session["id"].as_str().unwrap().to_string();

        let (status, _) = call(&router, "POST", &format!("/api/writing/sessions/{id}/exit/confirm"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, exit) = call(&router, "POST", &format!("/api/writing/sessions/{id}/exit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(exit["session"]["phase"], "confirming_exit");

        let (status, _) = call(&router, "POST", &format!("/api/writing/sessions/{id}/exit/confirm"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &router,
            "PUT",
            &format!("/api/writing/sessions/{id}/draft"),
            Some(serde_json::json!({"section": "conclusion", "text": "Late words."})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
