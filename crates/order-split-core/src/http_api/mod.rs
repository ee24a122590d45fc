use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    AllocationOutcome, AllocationResult, CatalogError, CatalogStore, Contract, ContractDraft,
    ContractId, ExportBundle, ItemId, OrderSession, Resource, SessionError, StagedLine,
    StagingError, TransferRejection, TransferRequest,
};

pub type SharedStore = Arc<dyn CatalogStore + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    session: Arc<RwLock<OrderSession>>,
    store: SharedStore,
}

impl AppState {
    pub fn new(session: OrderSession, store: SharedStore) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            store,
        }
    }

    pub fn with_shared(session: Arc<RwLock<OrderSession>>, store: SharedStore) -> Self {
        Self { session, store }
    }

    fn session(&self) -> Arc<RwLock<OrderSession>> {
        self.session.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Rejected(TransferRejection),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::ContractNotFound(_) => ApiError::NotFound(value.to_string()),
            CatalogError::InvalidData(_) => ApiError::Invalid(value.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::Catalog(err) => err.into(),
            SessionError::Transfer(rejection) => ApiError::Rejected(rejection),
            SessionError::ContractNotFound(_) | SessionError::NoAllocation => {
                ApiError::NotFound(value.to_string())
            }
            SessionError::Staging(StagingError::NoContract) => {
                ApiError::NotFound(value.to_string())
            }
            SessionError::Staging(_) | SessionError::Validation(_) => {
                ApiError::Invalid(value.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(ErrorBody {
                    error: "not_found",
                    message,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Rejected(rejection) => {
                let body = Json(ErrorBody {
                    error: "transfer_rejected",
                    message: rejection.to_string(),
                });
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
            ApiError::Internal(message) => {
                let body = Json(ErrorBody {
                    error: "internal_error",
                    message,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SelectContractPayload {
    contract_id: ContractId,
}

#[derive(Debug, Deserialize)]
struct QuantityPayload {
    item_id: ItemId,
    quantity: u64,
}

#[derive(Debug, Deserialize)]
struct QuantitiesPayload {
    quantities: Vec<QuantityPayload>,
}

#[derive(Debug, Deserialize)]
struct ResourcesPayload {
    resources: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StagingView {
    contract_id: Option<ContractId>,
    lines: Vec<StagedLine>,
    selected_resources: Vec<String>,
}

impl StagingView {
    fn from_session(session: &OrderSession) -> Self {
        let staging = session.staging();
        Self {
            contract_id: staging.contract().map(|c| c.id),
            lines: staging.lines().to_vec(),
            selected_resources: staging.selected_resources().iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    date: Option<NaiveDate>,
    #[serde(default = "default_consolidated")]
    consolidated: bool,
}

fn default_consolidated() -> bool {
    true
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/resources", get(list_resources))
        .route("/contracts", get(list_contracts).post(create_contract))
        .route("/contracts/:id", get(get_contract).delete(delete_contract))
        .route("/session/contract", put(select_contract))
        .route("/session/quantities", put(set_quantities))
        .route("/session/resources", put(set_resources))
        .route(
            "/session/allocation",
            get(current_allocation).post(compute_allocation),
        )
        .route("/session/transfer", post(apply_transfer))
        .route("/session/export", get(export_allocation))
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    session: OrderSession,
    store: SharedStore,
) -> std::io::Result<()> {
    let state = AppState::new(session, store);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_resources(State(state): State<AppState>) -> Json<Vec<Resource>> {
    let session = state.session();
    let resources = {
        let guard = session.read();
        guard.registry().resources().to_vec()
    };
    Json(resources)
}

async fn list_contracts(State(state): State<AppState>) -> Result<Json<Vec<Contract>>, ApiError> {
    let session = state.session();
    let contracts = {
        let mut guard = session.write();
        guard.reload_contracts(state.store.as_ref())?;
        guard.contracts().to_vec()
    };
    Ok(Json(contracts))
}

async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<ContractId>,
) -> Result<Json<Contract>, ApiError> {
    let session = state.session();
    let found = {
        let mut guard = session.write();
        if !guard.contracts().iter().any(|c| c.id == contract_id) {
            guard.reload_contracts(state.store.as_ref())?;
        }
        guard
            .contracts()
            .iter()
            .find(|c| c.id == contract_id)
            .cloned()
    };
    match found {
        Some(contract) => Ok(Json(contract)),
        None => Err(ApiError::not_found(format!(
            "contract {contract_id} not found"
        ))),
    }
}

async fn create_contract(
    State(state): State<AppState>,
    Json(draft): Json<ContractDraft>,
) -> Result<(StatusCode, Json<Contract>), ApiError> {
    let session = state.session();
    let created = {
        let mut guard = session.write();
        let id = guard.create_contract(state.store.as_ref(), &draft)?;
        guard
            .contracts()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| ApiError::internal("contract not found after creation"))?
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<ContractId>,
) -> Result<StatusCode, ApiError> {
    let session = state.session();
    {
        let mut guard = session.write();
        guard.delete_contract(state.store.as_ref(), contract_id)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn select_contract(
    State(state): State<AppState>,
    Json(payload): Json<SelectContractPayload>,
) -> Result<Json<StagingView>, ApiError> {
    let session = state.session();
    let view = {
        let mut guard = session.write();
        if !guard.contracts().iter().any(|c| c.id == payload.contract_id) {
            guard.reload_contracts(state.store.as_ref())?;
        }
        guard.select_contract(payload.contract_id)?;
        StagingView::from_session(&guard)
    };
    Ok(Json(view))
}

async fn set_quantities(
    State(state): State<AppState>,
    Json(payload): Json<QuantitiesPayload>,
) -> Result<Json<StagingView>, ApiError> {
    let session = state.session();
    let view = {
        let mut guard = session.write();
        // Apply to a copy so a bad line leaves the staged order untouched.
        let mut next = (*guard).clone();
        for line in &payload.quantities {
            next.set_quantity(line.item_id, line.quantity)?;
        }
        *guard = next;
        StagingView::from_session(&guard)
    };
    Ok(Json(view))
}

async fn set_resources(
    State(state): State<AppState>,
    Json(payload): Json<ResourcesPayload>,
) -> Result<Json<StagingView>, ApiError> {
    let session = state.session();
    let view = {
        let mut guard = session.write();
        guard.set_resources(payload.resources)?;
        StagingView::from_session(&guard)
    };
    Ok(Json(view))
}

async fn compute_allocation(State(state): State<AppState>) -> Json<AllocationOutcome> {
    let session = state.session();
    let outcome = {
        let mut guard = session.write();
        guard.compute()
    };
    Json(outcome)
}

async fn current_allocation(
    State(state): State<AppState>,
) -> Result<Json<AllocationResult>, ApiError> {
    let session = state.session();
    let current = {
        let guard = session.read();
        guard.result().cloned()
    };
    current
        .map(Json)
        .ok_or_else(|| ApiError::from(SessionError::NoAllocation))
}

async fn apply_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<AllocationResult>, ApiError> {
    let session = state.session();
    let updated = {
        let mut guard = session.write();
        guard.transfer(&request)?.clone()
    };
    Ok(Json(updated))
}

async fn export_allocation(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<ExportBundle>, ApiError> {
    let reference_date = query.date.unwrap_or_else(|| Local::now().date_naive());
    let session = state.session();
    let bundle = {
        let guard = session.read();
        guard.export(reference_date, query.consolidated)?
    };
    Ok(Json(bundle))
}
