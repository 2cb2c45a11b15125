//! Request handlers for the API endpoints.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;
use super::types::{
    ErrorResponse, HealthResponse, SessionsResponse, SiteView, SitesResponse,
};
use crate::cycle::CycleReport;
use crate::session::{ActuatorSession, IngestSession, SessionKind};
use crate::site::TenantLocation;
use crate::state::SharedState;

/// `GET /` → 200 + `{"message": "API is running"}`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "API is running",
    })
}

/// `GET /ws/sensors` → WebSocket upgrade into an ingestion session.
pub async fn sensor_socket(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let shared = Arc::clone(&state.shared);
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = IngestSession::new(shared, socket).run().await {
            warn!(error = %e, "sensor session ended");
        }
    })
}

/// `GET /ws/actuators` → WebSocket upgrade into an actuator session.
pub async fn actuator_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let shared = Arc::clone(&state.shared);
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = ActuatorSession::new(shared, socket).run().await {
            warn!(error = %e, "actuator session ended");
        }
    })
}

/// Every site known to the process: reported, integrated, or commanded.
fn known_sites(shared: &SharedState, report: &CycleReport) -> BTreeSet<TenantLocation> {
    let mut sites: BTreeSet<TenantLocation> = shared.store.energy_snapshot().into_keys().collect();
    sites.extend(report.buffer.keys().cloned());
    sites.extend(report.commands.keys().cloned());
    sites
}

fn site_view(shared: &SharedState, report: &CycleReport, tl: &TenantLocation) -> SiteView {
    SiteView::new(
        tl,
        report.buffer.get(tl),
        shared.store.energy_kwh(tl),
        report.commands.get(tl).cloned().unwrap_or_default(),
    )
}

/// `GET /sites` → 200 + `SitesResponse` JSON
pub async fn get_sites(State(state): State<Arc<AppState>>) -> Json<SitesResponse> {
    let report = state.shared.hub.latest();
    let sites = known_sites(&state.shared, &report)
        .iter()
        .map(|tl| site_view(&state.shared, &report, tl))
        .collect();

    Json(SitesResponse {
        cycle: report.cycle,
        completed_at: report.completed_at,
        sites,
    })
}

/// `GET /sites/{company}/{location}` → 200 + `SiteView`, or 404 if the
/// site has never been seen.
pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Path((company, location)): Path<(String, String)>,
) -> impl IntoResponse {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("unknown site {company}/{location}"),
            }),
        )
    };

    let Some(tl) = TenantLocation::new(&company, &location) else {
        return Err(not_found());
    };
    let report = state.shared.hub.latest();
    if !known_sites(&state.shared, &report).contains(&tl) {
        return Err(not_found());
    }

    Ok(Json(site_view(&state.shared, &report, &tl)))
}

/// `GET /sessions` → 200 + `SessionsResponse` JSON
pub async fn get_sessions(State(state): State<Arc<AppState>>) -> Json<SessionsResponse> {
    let sessions = &state.shared.sessions;
    Json(SessionsResponse {
        sensors: sessions.count(SessionKind::Sensor),
        actuators: sessions.count(SessionKind::Actuator),
        active: sessions.list(),
    })
}
