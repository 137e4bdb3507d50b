//! HTTP routes and shared server state.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use minijinja::{Environment, context};
use serde::Serialize;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use verboten_core::live::{LiveConnector, LiveGame, RelayOutcome};
use verboten_core::{Config, Language};

use crate::transport::client_transport;

const PAGE_TEMPLATE: &str = include_str!("../../../assets/verboten.html");

/// State shared by every request. Games never store anything here.
pub struct AppState {
    pub config: Config,
    pub connector: Arc<dyn LiveConnector>,
    templates: Environment<'static>,
}

impl AppState {
    pub fn new(config: Config, connector: Arc<dyn LiveConnector>) -> Result<Self, minijinja::Error> {
        let mut templates = Environment::new();
        templates.add_template("verboten.html", PAGE_TEMPLATE)?;
        Ok(Self {
            config,
            connector,
            templates,
        })
    }
}

#[derive(Serialize)]
struct LanguageOption {
    code: &'static str,
    name: &'static str,
    choose: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    let catalog = state.config.game.catalog_path.clone();
    let assets = state.config.server.assets_dir.clone();

    Router::new()
        .route("/", get(index))
        .route("/live/:lang", get(live))
        .route_service("/words.json", ServeFile::new(catalog))
        .nest_service("/forbiddenwords", ServeDir::new(assets))
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    let languages: Vec<LanguageOption> = Language::ALL
        .iter()
        .map(|lang| LanguageOption {
            code: lang.code(),
            name: lang.name(),
            choose: lang.phrases().choose_language,
        })
        .collect();

    let rendered = state
        .templates
        .get_template("verboten.html")
        .and_then(|page| {
            page.render(context! {
                languages => languages,
            })
        });

    match rendered {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

/// Proscribed words arrive as repeated `forbidden` query parameters.
fn forbidden_words(params: Vec<(String, String)>) -> Vec<String> {
    params
        .into_iter()
        .filter(|(key, value)| key == "forbidden" && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
        .collect()
}

async fn live(
    UrlPath(lang): UrlPath<String>,
    Query(params): Query<Vec<(String, String)>>,
    State(state): State<Arc<AppState>>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let language: Language = match lang.parse() {
        Ok(language) => language,
        Err(_) => return (StatusCode::NOT_FOUND, "unsupported language").into_response(),
    };
    let Some(ws) = ws else {
        return (StatusCode::BAD_REQUEST, "expected a websocket upgrade").into_response();
    };

    let forbidden = forbidden_words(params);
    let voice = state.config.game.voice_name.clone();

    ws.on_upgrade(move |socket| async move {
        let game = LiveGame::new(language, forbidden, voice);
        let id = game.id.clone();
        match game.play(state.connector.as_ref(), client_transport(socket)).await {
            Ok(RelayOutcome::Lost { judge }) => info!(game = %id, judge = %judge, "game lost"),
            Ok(outcome) => info!(game = %id, outcome = ?outcome, "game ended"),
            Err(e) => warn!(game = %id, error = %e, "game could not start"),
        }
    })
}
