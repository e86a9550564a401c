mod config;
mod telegram;

use crate::config::Settings;
use crate::telegram::TelegramDelivery;
use anyhow::Context;
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use movie_flow::{
    Delivery, EventDispatcher, InMemorySessionStore, MenuEngine, MovieCatalog, OmdbCatalog,
    Session, SessionStore, UserId,
};
use std::sync::Arc;
use teloxide::types::Update;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<EventDispatcher>,
    sessions: Arc<dyn SessionStore>,
    bot_id: String,
}

/// Initialize tracing; `LOG_FORMAT=pretty` for development, JSON otherwise
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "movie_service=debug,movie_flow=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

/// Tags every request with a correlation ID, echoed back on the response so a failed
/// webhook delivery in Telegram's `getWebhookInfo` can be matched to our logs
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = header.clone() {
        request.headers_mut().insert(CORRELATION_HEADER, value);
    }

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        path = %request.uri().path()
    );
    let mut response = next.run(request).instrument(span).await;
    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook/{bot_id}", post(webhook))
        .route("/session/{user_id}", get(get_session))
        .layer(from_fn(correlation_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    // Engine: catalog, in-memory sessions, menu state machine
    let catalog: Arc<dyn MovieCatalog> = Arc::new(
        OmdbCatalog::with_base_url(&settings.omdb_api_key, &settings.omdb_base_url)
            .context("failed to build catalog client")?,
    );
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let engine = Arc::new(MenuEngine::new(catalog, sessions.clone()));

    // Outbound side of the bot
    let telegram = Arc::new(
        TelegramDelivery::new(&settings.telegram_token, &settings.telegram_api_url)
            .context("failed to build telegram client")?,
    );
    if let Some(endpoint) = settings.webhook_endpoint() {
        match telegram.set_webhook(&endpoint).await {
            Ok(()) => info!(endpoint = %endpoint, "webhook registered"),
            Err(e) => warn!(endpoint = %endpoint, error = %e, "webhook registration failed"),
        }
    } else {
        info!("WEBHOOK_URL not set, expecting the webhook to be registered externally");
    }

    let delivery: Arc<dyn Delivery> = telegram;
    let state = AppState {
        dispatcher: Arc::new(EventDispatcher::new(engine, delivery)),
        sessions,
        bot_id: settings.bot_id.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    info!("Server running on http://{}", settings.bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

fn correlation_id(headers: &HeaderMap) -> &str {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

async fn webhook(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    let correlation_id = correlation_id(&headers);

    if bot_id != state.bot_id {
        warn!(correlation_id = %correlation_id, bot_id = %bot_id, "Webhook for unknown bot");
        return StatusCode::NOT_FOUND;
    }

    let update_id = update.id;
    let Some(event) = telegram::into_event(update) else {
        debug!(correlation_id = %correlation_id, update_id, "Ignoring update");
        return StatusCode::OK;
    };
    let user_id = event.user;

    // Everything the engine logs for this update carries its id and user
    let span = tracing::info_span!("telegram_update", update_id, user_id = %user_id);

    async move {
        info!(correlation_id = %correlation_id, action = ?event.action, "Processing update");

        match state.dispatcher.dispatch(event).await {
            Ok(_) => {
                info!(correlation_id = %correlation_id, "Update processed");
                StatusCode::OK
            }
            Err(e) => {
                // Non-2xx makes Telegram redeliver the update later
                error!(correlation_id = %correlation_id, error = %e, "Failed to process update");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
    .instrument(span)
    .await
}

async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Session>, StatusCode> {
    let correlation_id = correlation_id(&headers);
    let user_id = UserId(user_id);

    match state.sessions.get(user_id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => {
            info!(correlation_id = %correlation_id, user_id = %user_id, "Session not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!(
                correlation_id = %correlation_id,
                user_id = %user_id,
                error = %e,
                "Failed to get session"
            );
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use movie_flow::{ChatId, FlowError, InMemoryCatalog, MenuView, MovieDetail, Origin, Screen};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingDelivery {
        sent: Mutex<Vec<(ChatId, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Delivery for RecordingDelivery {
        async fn send_view(&self, chat: ChatId, view: &MenuView) -> movie_flow::Result<()> {
            if self.fail {
                return Err(FlowError::DeliveryError("offline".into()));
            }
            self.sent.lock().unwrap().push((chat, view.text.clone()));
            Ok(())
        }

        async fn answer(&self, _chat: ChatId, _origin: &Origin, _notice: Option<&str>) -> movie_flow::Result<()> {
            Ok(())
        }
    }

    fn test_app(delivery: Arc<RecordingDelivery>) -> Router {
        let catalog = InMemoryCatalog::new(vec![
            MovieDetail::new("tt1375666", "Inception", "2010").with_genres(&["Sci-Fi"]),
        ]);
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let engine = Arc::new(MenuEngine::new(Arc::new(catalog), sessions.clone()));
        app(AppState {
            dispatcher: Arc::new(EventDispatcher::new(engine, delivery)),
            sessions,
            bot_id: "42".to_string(),
        })
    }

    fn post_update(path: &str, update: Value) -> Request<Body> {
        Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(update.to_string()))
            .unwrap()
    }

    fn message(user: i64, text: &str) -> Value {
        json!({
            "message_id": 1,
            "date": 1_700_000_000,
            "chat": { "id": user, "type": "private", "first_name": "Test" },
            "from": { "id": user, "is_bot": false, "first_name": "Test" },
            "text": text
        })
    }

    fn text_update(user: i64, text: &str) -> Value {
        json!({ "update_id": 1, "message": message(user, text) })
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(Arc::default());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let correlation_id = response.headers().get(CORRELATION_HEADER).unwrap();
        assert!(Uuid::parse_str(correlation_id.to_str().unwrap()).is_ok());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_webhook_processes_search_and_exposes_session() {
        let delivery = Arc::new(RecordingDelivery::default());
        let app = test_app(delivery.clone());

        let response = app
            .clone()
            .oneshot(post_update("/webhook/42", text_update(7, "Inception")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            delivery.sent.lock().unwrap().as_slice(),
            &[(ChatId(7), "🎬 Inception (2010)".to_string())]
        );

        let response = app
            .oneshot(Request::get("/session/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let session: Session = serde_json::from_slice(&body).unwrap();
        assert_eq!(session.last_query.as_deref(), Some("Inception"));
        assert_eq!(session.screen, Screen::SearchResults("Inception".into()));
    }

    #[tokio::test]
    async fn test_webhook_for_other_bot_is_not_found() {
        let delivery = Arc::new(RecordingDelivery::default());
        let response = test_app(delivery.clone())
            .oneshot(post_update("/webhook/99", text_update(7, "/start")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(delivery.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ignorable_update_is_acknowledged() {
        let response = test_app(Arc::default())
            .oneshot(post_update(
                "/webhook/42",
                json!({ "update_id": 5, "edited_message": message(7, "/start") }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_server_error() {
        let delivery = Arc::new(RecordingDelivery {
            fail: true,
            ..Default::default()
        });
        let response = test_app(delivery)
            .oneshot(post_update("/webhook/42", text_update(7, "/start")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let response = test_app(Arc::default())
            .oneshot(Request::get("/session/12345").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
