// 🌐 HTTP API - Intake sessions over REST (axum)
// Sessions live in memory only and disappear with the process.

use crate::config::AppConfig;
use crate::guidance::GuidanceBuilder;
use crate::intake::{assess_text, Assessment, IntakeSession, IntakeWarning};
use crate::severity::{SeverityClassifier, SeverityTier};
use crate::transcription::{AudioClip, Transcriber, TranscriptionError};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<Mutex<HashMap<Uuid, IntakeSession>>>,
    classifier: Arc<SeverityClassifier>,
    guidance: Arc<GuidanceBuilder>,
    checklist: Arc<Vec<String>>,
    transcriber: Arc<dyn Transcriber>,
    session_idle: Duration,
    max_sessions: usize,
    max_voice_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: &AppConfig, transcriber: Arc<dyn Transcriber>) -> Self {
        // chrono::Duration::seconds panics past i64::MAX milliseconds
        let idle_secs = config.server.session_idle_secs.min(i64::MAX as u64 / 1000) as i64;

        AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            classifier: Arc::new(config.classifier()),
            guidance: Arc::new(config.guidance()),
            checklist: Arc::new(config.checklist_labels()),
            transcriber,
            session_idle: Duration::seconds(idle_secs),
            max_sessions: config.server.max_sessions.max(1),
            max_voice_upload_bytes: config.server.max_voice_upload_bytes,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, IntakeSession>> {
        // Each update is a single call on one session; a poisoned map is still consistent
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Drop every session idle as of `now`. Returns how many went.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_idle(now, self.session_idle));
        let evicted = before - sessions.len();

        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "idle intake sessions evicted");
        }
        evicted
    }

    /// Insert a new session, making room by evicting idle sessions and
    /// then the least recently active ones.
    fn insert_session(&self, session: IntakeSession) {
        self.evict_idle(Utc::now());

        let mut sessions = self.sessions();
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_activity())
                .map(|(id, _)| *id);
            let Some(oldest) = oldest else { break };
            sessions.remove(&oldest);
            tracing::warn!(session = %oldest, limit = self.max_sessions, "session limit reached, evicted oldest");
        }
        sessions.insert(session.id, session);
    }
}

/// Look up a live session and mark it active. An idle one is dropped.
fn live_session(
    sessions: &mut HashMap<Uuid, IntakeSession>,
    id: Uuid,
    idle: Duration,
) -> Option<&mut IntakeSession> {
    if sessions.get(&id).is_some_and(|s| s.is_idle(Utc::now(), idle)) {
        sessions.remove(&id);
        tracing::info!(session = %id, "idle intake session expired");
        return None;
    }

    let session = sessions.get_mut(&id)?;
    session.touch();
    Some(session)
}

/// Periodically evict idle sessions for as long as the runtime lives
pub fn spawn_session_reaper(state: AppState, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            state.evict_idle(Utc::now());
        }
    })
}

// ============================================================================
// Wire types
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

fn session_not_found(id: Uuid) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Session {} not found", id))
}

/// One checklist entry with its tier
#[derive(Serialize)]
pub struct ChecklistItem {
    label: String,
    severity: SeverityTier,
}

/// Checklist plus the configured top-tier symptoms
#[derive(Serialize)]
pub struct ChecklistView {
    items: Vec<ChecklistItem>,
    severe_symptoms: Vec<String>,
}

#[derive(Deserialize)]
pub struct TextRequest {
    text: String,
}

#[derive(Deserialize)]
pub struct ChecklistRequest {
    symptoms: Vec<String>,
}

/// Session as seen by clients
#[derive(Serialize)]
pub struct SessionView {
    id: Uuid,
    created_at: DateTime<Utc>,
    symptoms: Vec<String>,
    checklist_selection: Vec<String>,
    typed_text: Option<String>,
    voice_text: Option<String>,
    panic: bool,
    assessment: Option<Assessment>,
}

impl SessionView {
    fn build(session: &IntakeSession, state: &AppState) -> Self {
        SessionView {
            id: session.id,
            created_at: session.created_at,
            symptoms: session.registry().all().to_vec(),
            checklist_selection: session.checklist_selection().to_vec(),
            typed_text: session.typed_text().map(str::to_string),
            voice_text: session.voice_text().map(str::to_string),
            panic: session.panic_active(),
            assessment: session.assess(&state.classifier, &state.guidance),
        }
    }
}

/// Result of feeding one input into a session
#[derive(Serialize)]
pub struct IntakeResponse {
    added: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<IntakeWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    session: SessionView,
}

/// Run an update against one session and answer with its new view
fn with_session<F>(state: &AppState, id: Uuid, update: F) -> Response
where
    F: FnOnce(&mut IntakeSession) -> Result<Vec<String>, IntakeWarning>,
{
    let mut sessions = state.sessions();
    let Some(session) = live_session(&mut sessions, id, state.session_idle) else {
        return session_not_found(id);
    };

    let (added, warning) = match update(session) {
        Ok(added) => (added, None),
        Err(warning) => (Vec::new(), Some(warning)),
    };

    let response = IntakeResponse {
        added,
        message: warning.as_ref().map(|w| w.to_string()),
        warning,
        session: SessionView::build(session, state),
    };
    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/checklist - Symptoms offered for selection, severe ones marked
async fn get_checklist(State(state): State<AppState>) -> impl IntoResponse {
    let items = state
        .checklist
        .iter()
        .map(|label| ChecklistItem {
            label: label.clone(),
            severity: state.classifier.classify(label),
        })
        .collect();
    let severe_symptoms = state
        .classifier
        .top_tier_symptoms()
        .into_iter()
        .map(str::to_string)
        .collect();

    Json(ApiResponse::ok(ChecklistView {
        items,
        severe_symptoms,
    }))
}

/// POST /api/assess - One-shot assessment of free text, no session
async fn assess(State(state): State<AppState>, Json(request): Json<TextRequest>) -> Response {
    match assess_text(&request.text, &state.classifier, &state.guidance) {
        Some(assessment) => (StatusCode::OK, Json(ApiResponse::ok(assessment))).into_response(),
        None => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "No symptoms found in the text",
        ),
    }
}

/// POST /api/sessions - Start a session
async fn create_session(State(state): State<AppState>) -> Response {
    let session = IntakeSession::new();
    let view = SessionView::build(&session, &state);
    state.insert_session(session);

    (StatusCode::CREATED, Json(ApiResponse::ok(view))).into_response()
}

/// GET /api/sessions/:id - Current symptoms and assessment
async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let mut sessions = state.sessions();
    match live_session(&mut sessions, id, state.session_idle) {
        Some(session) => {
            (StatusCode::OK, Json(ApiResponse::ok(SessionView::build(session, &state)))).into_response()
        }
        None => session_not_found(id),
    }
}

/// DELETE /api/sessions/:id - End a session
async fn end_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.sessions().remove(&id) {
        Some(_) => {
            tracing::info!(session = %id, "intake session ended");
            (StatusCode::OK, Json(ApiResponse::ok("deleted"))).into_response()
        }
        None => session_not_found(id),
    }
}

/// POST /api/sessions/:id/checklist - Replace the checklist selection
async fn select_checklist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChecklistRequest>,
) -> Response {
    with_session(&state, id, |session| Ok(session.select_checklist(&request.symptoms)))
}

/// POST /api/sessions/:id/text - Add typed symptoms
async fn add_text(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TextRequest>,
) -> Response {
    with_session(&state, id, |session| Ok(session.add_text(&request.text)))
}

/// POST /api/sessions/:id/voice - Add symptoms from a WAV recording (raw body)
///
/// Bodies over `max_voice_upload_bytes` answer with a `recording_too_large` warning.
async fn add_voice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let known = live_session(&mut state.sessions(), id, state.session_idle).is_some();
    if !known {
        return session_not_found(id);
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            let limit = state.max_voice_upload_bytes;
            tracing::warn!(session = %id, limit, "voice upload over the size limit");
            return with_session(&state, id, |_| Err(IntakeWarning::RecordingTooLarge(limit)));
        }
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };

    // The speech call blocks; keep it off the executor and outside the lock
    let transcriber = Arc::clone(&state.transcriber);
    let outcome = tokio::task::spawn_blocking(move || {
        AudioClip::from_wav_bytes(body.to_vec()).and_then(|clip| transcriber.transcribe(&clip))
    })
    .await
    .unwrap_or_else(|e| Err(TranscriptionError::ServiceUnavailable(e.to_string())));

    with_session(&state, id, |session| session.add_transcript(outcome))
}

/// POST /api/sessions/:id/panic - Switch on panic mode
async fn trigger_panic(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    with_session(&state, id, |session| {
        session.trigger_panic();
        Ok(Vec::new())
    })
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let voice_limit = DefaultBodyLimit::max(state.max_voice_upload_bytes);

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/checklist", get(get_checklist))
        .route("/assess", post(assess))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(end_session))
        .route("/sessions/:id/checklist", post(select_checklist))
        .route("/sessions/:id/text", post(add_text))
        .route("/sessions/:id/voice", post(add_voice).layer(voice_limit))
        .route("/sessions/:id/panic", post(trigger_panic))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::{test_wav, FixedTranscriber};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with_config(config: AppConfig, transcriber: FixedTranscriber) -> (Router, AppState) {
        let state = AppState::new(&config, Arc::new(transcriber));
        (router(state.clone()), state)
    }

    fn app_with(transcriber: FixedTranscriber) -> (Router, AppState) {
        app_with_config(AppConfig::default(), transcriber)
    }

    fn app() -> (Router, AppState) {
        app_with(FixedTranscriber(Err(TranscriptionError::NotConfigured)))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, Method::POST, "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_and_checklist() {
        let (app, _) = app();

        let (status, body) = send(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");

        let (_, body) = send(&app, Method::GET, "/api/checklist", None).await;
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(items[0], json!({ "label": "Road Accident", "severity": "Severe" }));
        assert!(items.contains(&json!({ "label": "Burn Injury", "severity": "Urgent" })));
        assert_eq!(
            body["data"]["severe_symptoms"],
            json!(["Breathing Problem", "Chest Pain", "Heavy Bleeding", "Road Accident"])
        );
    }

    #[tokio::test]
    async fn test_checklist_marks_configured_severe_symptoms() {
        let config = AppConfig {
            severe_symptoms: Some(vec!["burn injury".to_string()]),
            ..AppConfig::default()
        };
        let (app, _) = app_with_config(config, FixedTranscriber(Err(TranscriptionError::NotConfigured)));

        let (_, body) = send(&app, Method::GET, "/api/checklist", None).await;
        assert_eq!(body["data"]["severe_symptoms"], json!(["Burn Injury"]));
        let severe: Vec<&Value> = body["data"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|item| item["severity"] == "Severe")
            .collect();
        assert_eq!(severe, vec![&json!({ "label": "Burn Injury", "severity": "Severe" })]);
    }

    #[tokio::test]
    async fn test_stateless_assess() {
        let (app, _) = app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/assess",
            Some(json!({ "text": "chest pain and dizziness" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["symptoms"], json!(["Chest Pain", "Dizziness"]));
        assert_eq!(body["data"]["severity"], "Severe");
        assert_eq!(
            body["data"]["guidance"]["maps_link"],
            "https://www.google.com/maps/search/trauma+hospital+near+me"
        );

        let (status, body) =
            send(&app, Method::POST, "/api/assess", Some(json!({ "text": " & " }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_session_flow() {
        let (app, state) = app();
        let id = new_session(&app).await;
        assert_eq!(state.session_count(), 1);

        let (_, body) = send(&app, Method::GET, &format!("/api/sessions/{}", id), None).await;
        assert!(body["data"]["assessment"].is_null());

        let (_, body) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/checklist", id),
            Some(json!({ "symptoms": ["Burn Injury"] })),
        )
        .await;
        assert_eq!(body["data"]["added"], json!(["Burn Injury"]));
        assert_eq!(body["data"]["session"]["assessment"]["severity"], "Urgent");

        let (_, body) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/text", id),
            Some(json!({ "text": "fever & heavy bleeding" })),
        )
        .await;
        assert_eq!(body["data"]["added"], json!(["Fever", "Heavy Bleeding"]));
        let session = &body["data"]["session"];
        assert_eq!(session["symptoms"], json!(["Burn Injury", "Fever", "Heavy Bleeding"]));
        assert_eq!(session["assessment"]["severity"], "Severe");
        assert_eq!(session["assessment"]["severe_symptoms"], json!(["Heavy Bleeding"]));

        let (_, body) = send(&app, Method::POST, &format!("/api/sessions/{}/panic", id), None).await;
        assert_eq!(body["data"]["session"]["panic"], true);
        assert_eq!(
            body["data"]["session"]["assessment"]["panic_instructions"][0],
            "CALL AMBULANCE NOW (108)"
        );

        let (status, _) = send(&app, Method::DELETE, &format!("/api/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.session_count(), 0);

        let (status, _) = send(&app, Method::GET, &format!("/api/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn post_wav(app: &Router, id: &str, wav: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/sessions/{}/voice", id))
            .header(header::CONTENT_TYPE, "audio/wav")
            .body(Body::from(wav))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_voice_input() {
        let (app, _) = app_with(FixedTranscriber(Ok("breathing problem and cough".to_string())));
        let id = new_session(&app).await;

        let (status, body) = post_wav(&app, &id, test_wav(1_600)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["added"], json!(["Breathing Problem", "Cough"]));
        assert_eq!(body["data"]["session"]["voice_text"], "breathing problem and cough");
        assert!(body["data"].get("warning").is_none());
    }

    #[tokio::test]
    async fn test_voice_failure_is_a_warning() {
        let (app, _) = app_with(FixedTranscriber(Err(TranscriptionError::NoSpeech)));
        let id = new_session(&app).await;

        let (status, body) = post_wav(&app, &id, test_wav(1_600)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["warning"]["kind"], "no_speech_detected");
        assert_eq!(body["data"]["session"]["symptoms"], json!([]));

        let (_, body) = post_wav(&app, &id, b"RIFFnope".to_vec()).await;
        assert_eq!(body["data"]["warning"]["kind"], "unreadable_audio");
    }

    #[tokio::test]
    async fn test_voice_upload_over_limit_is_a_warning() {
        let mut config = AppConfig::default();
        config.server.max_voice_upload_bytes = 1024 * 1024;
        let (app, state) = app_with_config(config, FixedTranscriber(Ok("fever".to_string())));
        let id = new_session(&app).await;

        // 800k 16-bit frames ≈ 1.6 MB
        let (status, body) = post_wav(&app, &id, test_wav(800_000)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["warning"]["kind"], "recording_too_large");
        assert_eq!(body["data"]["warning"]["detail"], 1024 * 1024);
        assert_eq!(
            body["data"]["message"],
            "The recording is too long. Keep it under 1 MB or type your symptoms."
        );
        assert_eq!(body["data"]["session"]["symptoms"], json!([]));

        let (status, body) = post_wav(&app, &id, test_wav(1_600)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["added"], json!(["Fever"]));
        assert_eq!(state.session_count(), 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let (app, state) = app();
        let id = new_session(&app).await;

        assert_eq!(state.evict_idle(Utc::now()), 0);
        assert_eq!(state.session_count(), 1);

        assert_eq!(state.evict_idle(Utc::now() + Duration::hours(1)), 1);
        assert_eq!(state.session_count(), 0);

        let (status, _) = send(&app, Method::GET, &format!("/api/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_count_is_capped() {
        let mut config = AppConfig::default();
        config.server.max_sessions = 3;
        let (app, state) = app_with_config(config, FixedTranscriber(Err(TranscriptionError::NotConfigured)));

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(new_session(&app).await);
            assert!(state.session_count() <= 3);
        }
        assert_eq!(state.session_count(), 3);

        let newest = ids.last().unwrap();
        let (status, _) = send(&app, Method::GET, &format!("/api/sessions/{}", newest), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reaper_evicts_in_background() {
        let mut config = AppConfig::default();
        config.server.session_idle_secs = 0;
        let (app, state) = app_with_config(config, FixedTranscriber(Err(TranscriptionError::NotConfigured)));
        new_session(&app).await;

        let reaper = spawn_session_reaper(state.clone(), std::time::Duration::from_millis(10));
        for _ in 0..100 {
            if state.session_count() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        reaper.abort();

        assert_eq!(state.session_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (app, _) = app();
        let uri = format!("/api/sessions/{}/text", Uuid::new_v4());

        let (status, body) = send(&app, Method::POST, &uri, Some(json!({ "text": "fever" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
