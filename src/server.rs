use askama::Template;
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Json},
    routing::get,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::plot::Figure;

/// Serialized figure kept for serving
#[derive(Debug, Clone)]
struct PublishedFigure {
    title: String,
    json: String,
}

#[derive(Clone)]
struct AppState {
    figures: Arc<BTreeMap<String, PublishedFigure>>,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Serialize)]
struct FigureInfo {
    name: String,
    title: String,
}

#[derive(Template)]
#[template(path = "plot.html")]
struct PlotTemplate {
    name: String,
    title: String,
    figure_json: String,
}

/// GET /api/v1/figures
async fn list_figures(State(state): State<AppState>) -> Json<ApiResponse<Vec<FigureInfo>>> {
    let figures = state
        .figures
        .iter()
        .map(|(name, figure)| FigureInfo {
            name: name.clone(),
            title: figure.title.clone(),
        })
        .collect();

    Json(ApiResponse::success(figures))
}

/// GET /api/v1/figures/:name
/// Plotly figure JSON (data, layout, config)
async fn get_figure_json(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let figure = state.figures.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        figure.json.clone(),
    ))
}

/// GET /figures/:name
/// Interactive Plotly page
async fn get_figure_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let figure = state.figures.get(&name).ok_or(StatusCode::NOT_FOUND)?;

    let template = PlotTemplate {
        name: name.clone(),
        title: figure.title.clone(),
        figure_json: figure.json.clone(),
    };

    let html = template.render().map_err(|e| {
        error!("Template rendering error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Html(html))
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

pub fn router(figures: &[Figure]) -> Router {
    let published: BTreeMap<String, PublishedFigure> = figures
        .iter()
        .map(|f| {
            (
                f.name.clone(),
                PublishedFigure {
                    title: f.title.clone(),
                    json: f.to_json(),
                },
            )
        })
        .collect();

    let state = AppState {
        figures: Arc::new(published),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/figures", get(list_figures))
        .route("/api/v1/figures/{name}", get(get_figure_json))
        .route("/figures/{name}", get(get_figure_page))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(figures: Vec<Figure>, port: u16) -> anyhow::Result<()> {
    let app = router(&figures);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("serving {} figures on http://0.0.0.0:{}", figures.len(), port);
    info!("  GET /health");
    info!("  GET /api/v1/figures");
    info!("  GET /api/v1/figures/:name");
    info!("  GET /figures/:name");
    for figure in &figures {
        info!("  http://localhost:{}/figures/{}", port, figure.name);
    }

    axum::serve(listener, app).await?;

    Ok(())
}
