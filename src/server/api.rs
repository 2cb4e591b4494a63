use crate::agent::CampaignAgent;
use crate::cli::Args;
use crate::llm::BoxError;
use crate::models::api::{ ChatRequest, ErrorResponse, ResetRequest, ResetResponse };
use crate::session::DEFAULT_SESSION_ID;
use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::State,
    http::{ HeaderMap, StatusCode },
    response::{ Html, IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error, debug };

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AppState {
    agent: Arc<CampaignAgent>,
    index_path: String,
}

impl AppState {
    pub fn new(agent: Arc<CampaignAgent>, index_path: impl Into<String>) -> Self {
        Self { agent, index_path: index_path.into() }
    }
}

pub fn router(app_state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/reset", post(reset_handler))
        .layer(cors)
        .with_state(app_state)
}

pub async fn start_http_server(
    addr: &str,
    agent: Arc<CampaignAgent>,
    args: Args
) -> Result<(), BoxError> {
    let app = router(AppState::new(agent, args.index_path.clone()));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
        e
    })?;
    info!("HTTP server listening on: http://{}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

fn error_response(code: StatusCode, message: &str) -> Response {
    (code, Json(ErrorResponse { error: message.to_string() })).into_response()
}

/// Body field first, then the session header, then the shared default session.
fn resolve_session_id(from_body: Option<&str>, headers: &HeaderMap) -> String {
    from_body
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

async fn index_handler(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(&state.index_path).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            debug!("Index page '{}' unavailable: {}", state.index_path, e);
            error_response(StatusCode::NOT_FOUND, "Index page not found")
        }
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>
) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No message provided");
    }
    let session_id = resolve_session_id(req.session_id.as_deref(), &headers);
    info!("Received message for session '{}'", session_id);
    debug!("Message content: '{}'", message);

    match state.agent.process_message(&session_id, message).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!("Error in chat endpoint: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn reset_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        ResetRequest::default()
    } else {
        match serde_json::from_slice::<ResetRequest>(&body) {
            Ok(req) => req,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, &format!("Invalid reset request: {}", e));
            }
        }
    };
    let session_id = resolve_session_id(req.session_id.as_deref(), &headers);
    state.agent.reset_session(&session_id).await;

    Json(ResetResponse { message: "Session reset successfully".to_string() }).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSettings;
    use crate::config::prompt::PromptConfig;
    use crate::models::api::ChatResponse;
    use crate::pipeline::PipelineStage;
    use crate::testing::{ ScriptedChatClient, StubExtractor };
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(client: &Arc<ScriptedChatClient>) -> (Router, Arc<CampaignAgent>) {
        let agent = Arc::new(
            CampaignAgent::new(
                client.clone(),
                Arc::new(StubExtractor::default()),
                Arc::new(PromptConfig::default()),
                AgentSettings::default()
            )
        );
        let index = std::env::temp_dir().join("campaign-agent-missing-index.html");
        let router = router(AppState::new(agent.clone(), index.to_string_lossy().to_string()));
        (router, agent)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let client = Arc::new(ScriptedChatClient::new());
        let (router, _) = app(&client);

        let response = router.oneshot(post_json("/chat", r#"{"message": "   "}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No message provided");
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn chat_returns_reply_and_status() {
        let client = Arc::new(ScriptedChatClient::new());
        client.push_reply("What is the campaign called?");
        let (router, _) = app(&client);

        let response = router
            .oneshot(post_json("/chat", r#"{"message": "Check this out https://shop.example/item1"}"#)).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ChatResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(body.reply, "What is the campaign called?");
        assert_eq!(body.stage, PipelineStage::Collecting);
        assert_eq!(body.status, "Collected 1 product(s). Continue providing campaign details.");
    }

    #[tokio::test]
    async fn transport_failure_maps_to_internal_error() {
        let client = Arc::new(ScriptedChatClient::new());
        client.push_error("connection refused");
        let (router, _) = app(&client);

        let response = router.oneshot(post_json("/chat", r#"{"message": "hi"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Internal server error");
    }

    #[tokio::test]
    async fn session_header_selects_session_and_reset_clears_it() {
        let client = Arc::new(ScriptedChatClient::new());
        client.push_reply("ok");
        let (router, agent) = app(&client);

        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .header(SESSION_HEADER, "team-a")
            .body(Body::from(r#"{"message": "https://shop.example/a"}"#))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        {
            let session = agent.sessions().session("team-a").await;
            assert_eq!(session.lock().await.state.products.len(), 1);
        }

        let response = router
            .oneshot(post_json("/reset", r#"{"session_id": "team-a"}"#)).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Session reset successfully");
        let session = agent.sessions().session("team-a").await;
        assert!(session.lock().await.state.products.is_empty());
    }

    #[tokio::test]
    async fn reset_accepts_empty_body() {
        let client = Arc::new(ScriptedChatClient::new());
        let (router, _) = app(&client);

        let request = Request::builder().method("POST").uri("/reset").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_index_page_is_not_found() {
        let client = Arc::new(ScriptedChatClient::new());
        let (router, _) = app(&client);

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn body_session_id_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, "from-header".parse().unwrap());
        assert_eq!(resolve_session_id(Some("from-body"), &headers), "from-body");
        assert_eq!(resolve_session_id(Some("  "), &headers), "from-header");
        assert_eq!(resolve_session_id(None, &HeaderMap::new()), DEFAULT_SESSION_ID);
    }
}
