use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kodama_data::column::{instance_columns, node_columns, render_table};
use kodama_data::{Instance, InstanceState, Node, RejectedRecord, TableView};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// --- Nodes ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    #[serde(flatten)]
    pub node: Node,
    pub free_slots: u32,
    pub heartbeat_stale: bool,
}

fn node_view(node: Node, timeout: chrono::Duration) -> NodeView {
    let heartbeat_stale = node.is_heartbeat_stale(Utc::now(), timeout);
    NodeView {
        free_slots: node.free_slots(),
        heartbeat_stale,
        node,
    }
}

fn stale_after(state: &AppState) -> chrono::Duration {
    chrono::Duration::from_std(state.heartbeat_timeout()).unwrap_or(chrono::Duration::MAX)
}

pub async fn list_nodes(State(state): State<Arc<AppState>>) -> Json<Vec<NodeView>> {
    let timeout = stale_after(&state);
    let nodes = state.nodes().await;
    Json(nodes.into_iter().map(|n| node_view(n, timeout)).collect())
}

pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<NodeView>, StatusCode> {
    let timeout = stale_after(&state);
    state
        .get_node(&id)
        .await
        .map(|n| Json(node_view(n, timeout)))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_node_instances(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Instance>>, StatusCode> {
    // Verify node exists
    state.get_node(&id).await.ok_or(StatusCode::NOT_FOUND)?;

    let instances = state
        .instances()
        .await
        .into_iter()
        .filter(|i| i.node.id == id)
        .collect();
    Ok(Json(instances))
}

// --- Instances ---

#[derive(Debug, Default, Deserialize)]
pub struct InstanceFilter {
    pub state: Option<String>,
    pub region: Option<String>,
    /// Only instances that are not DESTROYED or FAILED
    pub active: Option<bool>,
}

pub async fn list_instances(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<InstanceFilter>,
) -> Result<Json<Vec<Instance>>, StatusCode> {
    let wanted_state = filter
        .state
        .as_deref()
        .map(str::parse::<InstanceState>)
        .transpose()
        .map_err(|e| {
            debug!(error = %e, "rejected instance filter");
            StatusCode::BAD_REQUEST
        })?;

    let instances = state
        .instances()
        .await
        .into_iter()
        .filter(|i| wanted_state.map_or(true, |s| i.state == s))
        .filter(|i| filter.region.as_deref().map_or(true, |r| i.region == r))
        .filter(|i| !filter.active.unwrap_or(false) || i.is_active())
        .collect();

    Ok(Json(instances))
}

pub async fn get_instance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Instance>, StatusCode> {
    state
        .get_instance(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// --- Tables ---

pub async fn instance_table(State(state): State<Arc<AppState>>) -> Json<TableView> {
    let instances = state.instances().await;
    Json(render_table(&instance_columns(), &instances))
}

pub async fn node_table(State(state): State<Arc<AppState>>) -> Json<TableView> {
    let nodes = state.nodes().await;
    Json(render_table(&node_columns(), &nodes))
}

pub async fn list_rejected(State(state): State<Arc<AppState>>) -> Json<Vec<RejectedRecord>> {
    Json(state.rejected().await)
}
