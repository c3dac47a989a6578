//! Routes for the narrator: publishing, pause, scenery and the state query.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use narrator_core::chat::MessageKind;
use narrator_core::error::NarratorError;
use narrator_core::role::Role;
use narrator_core::state::SharedState;
use narrator_core::store::StateStore;
use narrator_publishing::application::chat_hook::ChatDisposition;
use narrator_publishing::application::publisher::PublishOutcome;
use narrator_publishing::domain::message::PublishOptions;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::extract::CallerRole;
use crate::state::AppState;

/// Request body for POST /narrate.
#[derive(Debug, Deserialize)]
pub struct NarrateRequest {
    /// A single narration.
    pub message: Option<String>,
    /// Narrations to show one after another.
    #[serde(default)]
    pub messages: Vec<String>,
    /// Chat speaker alias.
    pub speaker: Option<String>,
    /// Scene the narrator is viewing.
    pub scene: Option<String>,
}

/// Request body for POST /describe and POST /notify.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// Text to post.
    pub message: String,
    /// Chat speaker alias.
    pub speaker: Option<String>,
    /// Scene the narrator is viewing.
    pub scene: Option<String>,
}

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Raw chat submission.
    pub content: String,
    /// Chat speaker alias.
    pub speaker: Option<String>,
}

/// Request body for POST /pause. Toggles when `paused` is absent.
#[derive(Debug, Default, Deserialize)]
pub struct PauseRequest {
    /// Target pause flag.
    pub paused: Option<bool>,
}

/// Request body for POST /scenery. Toggles when `scenery` is absent.
#[derive(Debug, Default, Deserialize)]
pub struct SceneryRequest {
    /// Target scenery flag.
    pub scenery: Option<bool>,
}

/// Request body for POST /game-pause.
#[derive(Debug, Deserialize)]
pub struct GamePauseRequest {
    /// Whether the game is now paused.
    pub paused: bool,
}

/// Response body for POST /narrate.
#[derive(Debug, Serialize)]
pub struct NarrateResponse {
    /// Epoch of the narration now on display; absent for a queued sequence.
    pub narration_id: Option<u64>,
    /// Number of narrations accepted.
    pub queued: usize,
}

/// Response body for POST /describe and POST /notify.
#[derive(Debug, Serialize)]
pub struct PostedResponse {
    /// Kind of the posted message.
    pub kind: MessageKind,
}

/// Response body for POST /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Whether the submission was a narrator command and must not be
    /// posted as is.
    pub consumed: bool,
    /// Kind the command published, if consumed.
    pub kind: Option<MessageKind>,
}

/// Response body for POST /pause.
#[derive(Debug, Serialize)]
pub struct PauseResponse {
    /// New pause flag; absent when no narration is open.
    pub paused: Option<bool>,
}

/// Response body for POST /scenery and POST /game-pause.
#[derive(Debug, Serialize)]
pub struct SceneryResponse {
    /// New scenery flag; absent when nothing changed.
    pub scenery: Option<bool>,
}

fn require_narrator(role: Role) -> Result<(), ApiError> {
    if role.is_privileged() {
        Ok(())
    } else {
        warn!(?role, "narrator route called without narrator role");
        Err(ApiError(NarratorError::Unauthorized))
    }
}

fn options(speaker: Option<String>, scene: Option<String>) -> PublishOptions {
    let mut options = PublishOptions::default();
    if let Some(speaker) = speaker {
        options = options.with_speaker(speaker);
    }
    if let Some(scene) = scene {
        options = options.with_scene(scene);
    }
    options
}

/// GET /state
async fn get_state(State(state): State<AppState>) -> Json<SharedState> {
    Json(state.store.get())
}

/// POST /narrate
#[instrument(skip(state, request))]
async fn narrate(
    State(state): State<AppState>,
    CallerRole(role): CallerRole,
    Json(request): Json<NarrateRequest>,
) -> Result<(StatusCode, Json<NarrateResponse>), ApiError> {
    require_narrator(role)?;
    let options = options(request.speaker, request.scene);

    match (request.message, request.messages.is_empty()) {
        (Some(message), true) => {
            let outcome = state.publisher.narrate(role, &message, &options).await?;
            let PublishOutcome::Narrating(receipt) = outcome else {
                return Err(ApiError(NarratorError::Unauthorized));
            };
            Ok((
                StatusCode::OK,
                Json(NarrateResponse {
                    narration_id: Some(receipt.narration_id()),
                    queued: 1,
                }),
            ))
        }
        (None, false) => {
            let messages = request.messages;
            let queued = messages.len();
            info!(queued, "narration sequence queued");
            let publisher = state.publisher.clone();
            tokio::spawn(async move {
                match publisher.narrate_sequence(role, &messages, &options).await {
                    Ok(finished) => info!(finished, "narration sequence done"),
                    Err(e) => warn!(error = %e, "narration sequence aborted"),
                }
            });
            Ok((
                StatusCode::ACCEPTED,
                Json(NarrateResponse {
                    narration_id: None,
                    queued,
                }),
            ))
        }
        _ => Err(ApiError(NarratorError::Validation(
            "provide either message or a non-empty messages list".to_owned(),
        ))),
    }
}

async fn post_message(
    state: &AppState,
    role: Role,
    kind: MessageKind,
    request: MessageRequest,
) -> Result<Json<PostedResponse>, ApiError> {
    require_narrator(role)?;
    let options = options(request.speaker, request.scene);
    match state
        .publisher
        .publish(role, kind, &request.message, &options)
        .await?
    {
        PublishOutcome::Rejected => Err(ApiError(NarratorError::Unauthorized)),
        PublishOutcome::Posted | PublishOutcome::Narrating(_) => Ok(Json(PostedResponse { kind })),
    }
}

/// POST /describe
#[instrument(skip(state, request))]
async fn describe(
    State(state): State<AppState>,
    CallerRole(role): CallerRole,
    Json(request): Json<MessageRequest>,
) -> Result<Json<PostedResponse>, ApiError> {
    post_message(&state, role, MessageKind::Description, request).await
}

/// POST /notify
#[instrument(skip(state, request))]
async fn notify(
    State(state): State<AppState>,
    CallerRole(role): CallerRole,
    Json(request): Json<MessageRequest>,
) -> Result<Json<PostedResponse>, ApiError> {
    post_message(&state, role, MessageKind::Notification, request).await
}

/// POST /chat
#[instrument(skip(state, request))]
async fn chat(
    State(state): State<AppState>,
    CallerRole(role): CallerRole,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let options = options(request.speaker, None);
    let disposition = state
        .chat_hook
        .handle(role, &request.content, &options)
        .await?;
    let response = match disposition {
        ChatDisposition::Consumed { kind } => ChatResponse {
            consumed: true,
            kind: Some(kind),
        },
        ChatDisposition::Passthrough => ChatResponse {
            consumed: false,
            kind: None,
        },
    };
    Ok(Json(response))
}

/// POST /pause
#[instrument(skip(state))]
async fn pause(
    State(state): State<AppState>,
    CallerRole(role): CallerRole,
    Json(request): Json<PauseRequest>,
) -> Result<Json<PauseResponse>, ApiError> {
    require_narrator(role)?;
    let paused = match request.paused {
        Some(paused) => state.publisher.set_paused(role, paused).await?,
        None => state.publisher.toggle_paused(role).await?,
    };
    Ok(Json(PauseResponse { paused }))
}

/// POST /scenery
#[instrument(skip(state))]
async fn scenery(
    State(state): State<AppState>,
    CallerRole(role): CallerRole,
    Json(request): Json<SceneryRequest>,
) -> Result<Json<SceneryResponse>, ApiError> {
    require_narrator(role)?;
    let scenery = state.publisher.set_scenery(role, request.scenery).await?;
    Ok(Json(SceneryResponse { scenery }))
}

/// POST /game-pause
#[instrument(skip(state))]
async fn game_pause(
    State(state): State<AppState>,
    CallerRole(role): CallerRole,
    Json(request): Json<GamePauseRequest>,
) -> Result<Json<SceneryResponse>, ApiError> {
    require_narrator(role)?;
    let scenery = state.publisher.game_paused(role, request.paused).await?;
    Ok(Json(SceneryResponse { scenery }))
}

/// Returns the router for the narrator routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/state", get(get_state))
        .route("/narrate", post(narrate))
        .route("/describe", post(describe))
        .route("/notify", post(notify))
        .route("/chat", post(chat))
        .route("/pause", post(pause))
        .route("/scenery", post(scenery))
        .route("/game-pause", post(game_pause))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use narrator_store::ReplicatedStateStore;
    use narrator_test_support::{FixedClock, RecordingChatLog};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::extract::ROLE_HEADER;

    struct TestApp {
        router: Router,
        store: Arc<ReplicatedStateStore>,
        chat: Arc<RecordingChatLog>,
    }

    fn test_app() -> TestApp {
        let store = Arc::new(ReplicatedStateStore::in_memory());
        let chat = Arc::new(RecordingChatLog::new());
        let (app_state, _task) = AppState::start(
            store.clone(),
            chat.clone(),
            Arc::new(FixedClock::session_start()),
            narrator_core::settings::NarratorSettings::default(),
        );
        TestApp {
            router: router().with_state(app_state),
            store,
            chat,
        }
    }

    async fn post_as(
        app: &TestApp,
        role: Option<&str>,
        uri: &str,
        body: &Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(role) = role {
            builder = builder.header(ROLE_HEADER, role);
        }
        let request = builder
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_returns_default_record() {
        // Arrange
        let app = test_app();
        let request = Request::builder()
            .uri("/state")
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.router.clone().oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(
            json,
            json!({
                "narration": { "id": 0, "display": false, "message": "", "paused": false },
                "scenery": false
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_narrate_as_gm_starts_a_narration() {
        // Arrange
        let app = test_app();

        // Act
        let (status, json) = post_as(
            &app,
            Some("gm"),
            "/narrate",
            &json!({ "message": "The storm breaks." }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["narration_id"], 1);
        let narration = app.store.get().narration;
        assert!(narration.display);
        assert_eq!(narration.message, "The storm breaks.");
        assert_eq!(app.chat.posted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_narrate_without_role_returns_403() {
        // Arrange
        let app = test_app();

        // Act
        let (status, json) =
            post_as(&app, None, "/narrate", &json!({ "message": "Nope" })).await;

        // Assert
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "unauthorized");
        assert_eq!(app.store.get(), SharedState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_narrate_without_message_returns_400() {
        let app = test_app();

        let (status, json) = post_as(&app, Some("gm"), "/narrate", &json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_narrate_sequence_is_accepted_and_runs_in_order() {
        // Arrange
        let app = test_app();

        // Act
        let (status, json) = post_as(
            &app,
            Some("narrator"),
            "/narrate",
            &json!({ "messages": ["One", "Two"] }),
        )
        .await;
        tokio::time::sleep(Duration::from_secs(20)).await;

        // Assert
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["queued"], 2);
        let narration = app.store.get().narration;
        assert_eq!(narration.id, 2);
        assert!(!narration.display);
        assert_eq!(app.chat.posted().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_posts_to_chat_only() {
        let app = test_app();

        let (status, json) = post_as(
            &app,
            Some("gm"),
            "/describe",
            &json!({ "message": "Rain on the roof.", "speaker": "Keeper" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kind"], "description");
        assert_eq!(app.store.get().narration.id, 0);
        assert_eq!(app.chat.posted()[0].speaker, "Keeper");
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_consumes_commands_and_passes_plain_text() {
        // Arrange
        let app = test_app();

        // Act
        let (_, command) = post_as(
            &app,
            Some("gm"),
            "/chat",
            &json!({ "content": "/notify Roll for initiative" }),
        )
        .await;
        let (_, plain) =
            post_as(&app, Some("gm"), "/chat", &json!({ "content": "brb" })).await;

        // Assert
        assert_eq!(command, json!({ "consumed": true, "kind": "notification" }));
        assert_eq!(plain, json!({ "consumed": false, "kind": null }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_toggles_open_narration() {
        // Arrange
        let app = test_app();
        post_as(&app, Some("gm"), "/narrate", &json!({ "message": "Wait" })).await;

        // Act
        let (status, json) = post_as(&app, Some("gm"), "/pause", &json!({})).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["paused"], true);
        assert!(app.store.get().narration.paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenery_toggles_and_rejects_observers() {
        // Arrange
        let app = test_app();

        // Act
        let (status, json) = post_as(&app, Some("gm"), "/scenery", &json!({})).await;
        let (observer_status, _) =
            post_as(&app, Some("player"), "/scenery", &json!({ "scenery": false })).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["scenery"], true);
        assert_eq!(observer_status, StatusCode::FORBIDDEN);
        assert!(app.store.get().scenery);
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_pause_is_ignored_unless_linked() {
        let app = test_app();

        let (status, json) =
            post_as(&app, Some("gm"), "/game-pause", &json!({ "paused": true })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["scenery"], Value::Null);
        assert!(!app.store.get().scenery);
    }
}
