//! REST handlers for rule management and resolution.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::RouterError;
use crate::http::request::ApiJson;
use crate::http::response::error_response;
use crate::http::server::AppState;
use crate::lifecycle::clock;
use crate::routing::{RouteRequest, ScoredRule};
use crate::rules::{NewRule, Rule, RulePatch, Timestamp};

#[derive(Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PruneParams {
    /// Prune as of this earlier time instead of now. Later values are
    /// capped at now, so an active rule is never removed.
    pub now: Option<Timestamp>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PruneResult {
    pub pruned: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveParams {
    #[serde(default)]
    pub domain: String,
    pub subdomain: Option<String>,
    pub path: Option<String>,
    /// Comma-separated query-parameter keys carried by the request.
    pub query: Option<String>,
}

impl ResolveParams {
    fn to_request(&self) -> Result<RouteRequest, RouterError> {
        if self.domain.trim().is_empty() {
            return Err(RouterError::InvalidInput("domain is required".into()));
        }
        let keys = self
            .query
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty());
        Ok(RouteRequest::new(
            &self.domain,
            self.subdomain.as_deref(),
            self.path.as_deref(),
            keys,
        ))
    }
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

pub async fn create_rule(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewRule>,
) -> Result<(StatusCode, Json<Rule>), RouterError> {
    let rule = state.service.create(input)?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn list_rules(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Rule>>, RouterError> {
    let rules = if params.active {
        state.service.list_active(clock::now())?
    } else {
        state.service.list_all()?
    };
    Ok(Json(rules))
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Rule>, RouterError> {
    state
        .service
        .get(&id)?
        .map(Json)
        .ok_or(RouterError::NotFound(id))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<RulePatch>,
) -> Result<Json<Rule>, RouterError> {
    Ok(Json(state.service.update(&id, patch)?))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, RouterError> {
    if state.service.delete(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(RouterError::NotFound(id))
    }
}

pub async fn prune_rules(
    State(state): State<AppState>,
    Query(params): Query<PruneParams>,
) -> Result<Json<PruneResult>, RouterError> {
    let now = clock::now();
    let as_of = params.now.map_or(now, |t| t.min(now));
    let pruned = state.service.prune(as_of)?;
    Ok(Json(PruneResult { pruned }))
}

pub async fn resolve(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Response, RouterError> {
    let request = params.to_request()?;
    Ok(match state.service.resolve(&request)? {
        Some(rule) => Json(rule).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no matching rule"),
    })
}

pub async fn explain(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<Vec<ScoredRule>>, RouterError> {
    let request = params.to_request()?;
    Ok(Json(state.service.explain(&request)?))
}
