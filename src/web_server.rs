use anyhow::{Context, Result};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    serve, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::constants::PAGE_TITLE;
use crate::error::SessionError;
use crate::profile::{AgeRange, FormSubmission, Temperament};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

// One-shot message shown on the next render.
#[derive(Clone, Debug, Serialize)]
struct Notice {
    kind: &'static str,
    text: String,
}

impl Notice {
    fn error(text: impl Into<String>) -> Self {
        Self { kind: "error", text: text.into() }
    }

    fn success(text: impl Into<String>) -> Self {
        Self { kind: "success", text: text.into() }
    }
}

struct WebSession {
    session: Session,
    notice: Option<Notice>,
}

// Shared application state. The mutex is held for a whole interaction,
// including the remote call, so interactions never interleave.
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    inner: Arc<Mutex<WebSession>>,
}

impl AppState {
    pub fn new(session: Session, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            inner: Arc::new(Mutex::new(WebSession {
                session,
                notice: None,
            })),
        }
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        // Watch the templates directory for changes
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

fn render_index(state: &AppState, web: &mut WebSession) -> Response {
    let view = web.session.view();
    let notice = web.notice.take();
    let age_options: Vec<&str> = AgeRange::ALL.iter().map(|a| a.label()).collect();
    let temperament_options: Vec<&str> = Temperament::ALL.iter().map(|t| t.label()).collect();

    let rendered = state.templates.acquire_env().and_then(|env| {
        env.get_template("index.html").and_then(|tmpl| {
            tmpl.render(minijinja::context! {
                title => PAGE_TITLE,
                view => view,
                notice => notice,
                age_options => age_options,
                temperament_options => temperament_options,
            })
        })
    });

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
                .into_response()
        }
    }
}

fn halted_response(message: String) -> Response {
    (StatusCode::CONFLICT, message).into_response()
}

async fn index_handler(State(state): State<AppState>) -> Response {
    let mut web = state.inner.lock().await;
    render_index(&state, &mut web)
}

fn parse_form(fields: &[(String, String)]) -> Result<FormSubmission, SessionError> {
    let field = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };
    let temperament = fields
        .iter()
        .filter(|(key, _)| key == "temperament")
        .map(|(_, value)| value.as_str());

    FormSubmission::from_labels(
        field("age_range"),
        temperament,
        field("challenges").unwrap_or_default(),
    )
}

// Form-submit hook. Fields: age_range, temperament (repeated), challenges.
async fn submit_form_handler(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let mut web = state.inner.lock().await;
    if let Some(message) = web.session.halted_message() {
        return halted_response(message.to_string());
    }

    let result = match parse_form(&fields) {
        Ok(submission) => web.session.submit_form(submission),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!("Rejected intake form: {}", e);
        web.notice = Some(Notice::error(e.to_string()));
        return Redirect::to("/").into_response();
    }

    match web.session.enter_chat().await {
        Ok(()) => {
            web.notice = Some(Notice::success(
                "Thanks! Setting up your personalized chat...",
            ));
        }
        // Fatal errors are shown by the halted page itself.
        Err(e) if e.is_fatal() => {}
        Err(e) => web.notice = Some(Notice::error(e.to_string())),
    }
    Redirect::to("/").into_response()
}

#[derive(Deserialize)]
struct ChatInput {
    #[serde(default)]
    prompt: String,
}

// Chat-input hook.
async fn chat_handler(State(state): State<AppState>, Form(input): Form<ChatInput>) -> Response {
    let mut web = state.inner.lock().await;
    if let Some(message) = web.session.halted_message() {
        return halted_response(message.to_string());
    }

    if let Err(e) = web.session.send_user_message(&input.prompt).await {
        web.notice = Some(Notice::error(e.to_string()));
    }
    Redirect::to("/").into_response()
}

// Side-panel "Restart Chat / Edit Child Info" action.
async fn reset_handler(State(state): State<AppState>) -> Response {
    let mut web = state.inner.lock().await;
    if let Some(message) = web.session.halted_message() {
        return halted_response(message.to_string());
    }

    web.session.reset();
    web.notice = None;
    Redirect::to("/").into_response()
}

pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/form", post(submit_form_handler))
        .route("/chat", post(chat_handler))
        .route("/reset", post(reset_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(config: WebConfig, session: Session) -> Result<()> {
    let state = AppState::new(session, config.templates_dir.clone());
    let app = build_router(state, &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
