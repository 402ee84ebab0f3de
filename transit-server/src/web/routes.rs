//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::domain::{Station, StationUid};
use crate::service::{ResolveError, StationQuery};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health))
        .route("/api/stations/:city/search", get(search_station))
        .route("/api/stations/:city/all", get(stations_in_area))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        time: Utc::now().to_rfc3339(),
        directory_ready: state.service.directory().is_ready(),
    })
}

/// Look up one station by UID or public ID.
async fn search_station(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(req): Query<StationSearchRequest>,
) -> Result<Json<Station>, AppError> {
    let query = station_query(&req)?;
    let station = state.service.resolve(&city, &query).await?;
    Ok(Json(station))
}

/// All stations within a radius of a point.
async fn stations_in_area(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(req): Query<AreaRequest>,
) -> Result<Json<Vec<Station>>, AppError> {
    let lat = parse_number(req.lat.as_deref(), "Invalid latitude")?;
    let lon = parse_number(req.lon.as_deref(), "Invalid longitude")?;
    let radius = parse_number(req.rad.as_deref(), "Invalid radius")?;

    let stations = state
        .service
        .stations_within(&city, lat, lon, radius)
        .await?;
    Ok(Json(stations))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn station_query(req: &StationSearchRequest) -> Result<StationQuery, AppError> {
    if let Some(uid) = non_empty(req.uid.as_deref()) {
        let uid = StationUid::parse(uid).map_err(|e| AppError::BadRequest {
            message: e.to_string(),
        })?;
        return Ok(StationQuery::Uid(uid));
    }

    match non_empty(req.id.as_deref()) {
        Some(id) => Ok(StationQuery::Id(id.to_string())),
        None => Err(AppError::BadRequest {
            message: "invalid query parameters".to_string(),
        }),
    }
}

fn parse_number(value: Option<&str>, message: &str) -> Result<f64, AppError> {
    non_empty(value)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::BadRequest {
            message: message.to_string(),
        })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Unavailable { message: String },
    BadGateway { message: String },
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        let message = e.to_string();
        match e {
            ResolveError::UnknownCity(_) | ResolveError::NotFound(_) => {
                AppError::NotFound { message }
            }
            ResolveError::NotReady { .. } => AppError::Unavailable { message },
            ResolveError::InvalidStation(_) => AppError::BadRequest { message },
            ResolveError::Transport(_) | ResolveError::Protocol(_) => {
                AppError::BadGateway { message }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
        };

        if status.is_server_error() {
            warn!(status = status.as_u16(), %message, "request failed");
        } else {
            debug!(status = status.as_u16(), %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
