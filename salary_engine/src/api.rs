//! HTTP API for the Salary Engine.
//!
//! This module exposes the catalog, assignment evaluation, pay runs
//! and payslip summaries as JSON endpoints using the
//! [`axum`](https://crates.io/crates/axum) framework.  The catalog is
//! the only shared state; it sits behind a `tokio` read/write lock so
//! evaluations can run concurrently while catalog edits are applied
//! one at a time.

use crate::aggregator::{AssignmentDraft, AssignmentEdit};
use crate::catalog::ComponentCatalog;
use crate::config::{AppConfig, OrganizationSettings};
use crate::error::{ApiError, CatalogError};
use crate::evaluator::ValidationWarning;
use crate::models::{
    AssignmentTotals, Attendance, ComponentId, PayPeriod, PayslipRecord, PayslipSummary,
    SalaryComponentDefinition, SalaryStructure, StructureId,
};
use crate::payrun::{self, PayRunInput, PayRunResult};
use crate::summarizer;
use crate::tax::FlatRateCalculator;
use crate::wire::{lenient_f64, Page};
use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across requests.
pub struct AppState {
    pub catalog: RwLock<ComponentCatalog>,
    pub settings: OrganizationSettings,
}

impl AppState {
    pub fn new(catalog: ComponentCatalog, settings: OrganizationSettings) -> Arc<Self> {
        Arc::new(Self {
            catalog: RwLock::new(catalog),
            settings,
        })
    }
}

/// Builds the API router around existing state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/components", get(list_components).post(create_component))
        .route(
            "/api/components/:id",
            get(get_component)
                .put(update_component)
                .delete(delete_component),
        )
        .route("/api/components/:id/clone", post(clone_component))
        .route("/api/structures", get(list_structures).post(create_structure))
        .route(
            "/api/structures/:id",
            get(get_structure)
                .put(update_structure)
                .delete(delete_structure),
        )
        .route("/api/structures/:id/clone", post(clone_structure))
        .route("/api/catalog/audit", get(audit_catalog))
        .route("/api/assignments/preview", post(preview_assignment))
        .route("/api/assignments/edit", post(edit_assignment))
        .route("/api/payslips/generate", post(generate_payslips))
        .route("/api/payslips/summary", post(summarize_payslips))
        .with_state(state)
}

/// Loads the catalog named by the configuration (if any) and builds
/// the router.  Returns the router and a handle to the state.
pub fn router_from_config(config: &AppConfig) -> Result<(Router, Arc<AppState>)> {
    let catalog = match &config.catalog_file {
        Some(path) => ComponentCatalog::load_from_file(path)
            .with_context(|| format!("loading catalog from {}", path.display()))?,
        None => ComponentCatalog::new(),
    };
    let state = AppState::new(catalog, config.settings.clone());
    Ok((build_router(state.clone()), state))
}

/// Launch the API server and block until it terminates.
pub async fn serve(config: AppConfig) -> Result<()> {
    let (router, _state) = router_from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "salary engine listening");
    axum::serve(listener, router).await?;
    Ok(())
}

type Shared = State<Arc<AppState>>;

async fn list_components(State(state): Shared) -> Json<Vec<SalaryComponentDefinition>> {
    let catalog = state.catalog.read().await;
    Json(catalog.components().cloned().collect())
}

async fn get_component(
    State(state): Shared,
    Path(id): Path<ComponentId>,
) -> Result<Json<SalaryComponentDefinition>, ApiError> {
    let catalog = state.catalog.read().await;
    catalog
        .component(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| CatalogError::NotFound { kind: "component", id }.into())
}

async fn create_component(
    State(state): Shared,
    Json(definition): Json<SalaryComponentDefinition>,
) -> Result<(StatusCode, Json<SalaryComponentDefinition>), ApiError> {
    let created = state.catalog.write().await.create_component(definition)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_component(
    State(state): Shared,
    Path(id): Path<ComponentId>,
    Json(definition): Json<SalaryComponentDefinition>,
) -> Result<Json<SalaryComponentDefinition>, ApiError> {
    let updated = state.catalog.write().await.update_component(id, definition)?;
    Ok(Json(updated))
}

async fn delete_component(
    State(state): Shared,
    Path(id): Path<ComponentId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.write().await.delete_component(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clone_component(
    State(state): Shared,
    Path(id): Path<ComponentId>,
) -> Result<(StatusCode, Json<SalaryComponentDefinition>), ApiError> {
    let copy = state.catalog.write().await.clone_component(id)?;
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn list_structures(State(state): Shared) -> Json<Vec<SalaryStructure>> {
    let catalog = state.catalog.read().await;
    Json(catalog.structures().cloned().collect())
}

async fn get_structure(
    State(state): Shared,
    Path(id): Path<StructureId>,
) -> Result<Json<SalaryStructure>, ApiError> {
    let catalog = state.catalog.read().await;
    catalog
        .structure(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| CatalogError::NotFound { kind: "structure", id }.into())
}

async fn create_structure(
    State(state): Shared,
    Json(structure): Json<SalaryStructure>,
) -> Result<(StatusCode, Json<SalaryStructure>), ApiError> {
    let created = state.catalog.write().await.create_structure(structure)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_structure(
    State(state): Shared,
    Path(id): Path<StructureId>,
    Json(structure): Json<SalaryStructure>,
) -> Result<Json<SalaryStructure>, ApiError> {
    let updated = state.catalog.write().await.update_structure(id, structure)?;
    Ok(Json(updated))
}

async fn delete_structure(
    State(state): Shared,
    Path(id): Path<StructureId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.write().await.delete_structure(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clone_structure(
    State(state): Shared,
    Path(id): Path<StructureId>,
) -> Result<(StatusCode, Json<SalaryStructure>), ApiError> {
    let copy = state.catalog.write().await.clone_structure(id)?;
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn audit_catalog(State(state): Shared) -> Json<Vec<ValidationWarning>> {
    Json(state.catalog.read().await.audit())
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub structure_id: StructureId,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub basic_amount: f64,
    #[serde(default)]
    pub attendance: Option<Attendance>,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft: AssignmentDraft,
    pub totals: AssignmentTotals,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationWarning>,
}

async fn preview_assignment(
    State(state): Shared,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    let attendance = request
        .attendance
        .unwrap_or_else(|| Attendance::full(state.settings.default_working_days));
    let catalog = state.catalog.read().await;
    let structure = catalog
        .structure(request.structure_id)
        .ok_or(CatalogError::NotFound {
            kind: "structure",
            id: request.structure_id,
        })?;
    let (draft, warnings) =
        AssignmentDraft::from_structure(&catalog, structure, request.basic_amount, attendance)?;
    let totals = draft.totals();
    Ok(Json(DraftResponse {
        draft,
        totals,
        warnings,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub draft: AssignmentDraft,
    pub edit: AssignmentEdit,
}

async fn edit_assignment(Json(request): Json<EditRequest>) -> Result<Json<DraftResponse>, ApiError> {
    let mut draft = request.draft;
    let totals = draft.apply(request.edit)?;
    Ok(Json(DraftResponse {
        draft,
        totals,
        warnings: Vec::new(),
    }))
}

async fn generate_payslips(
    State(state): Shared,
    Json(input): Json<PayRunInput>,
) -> Result<Json<PayRunResult>, ApiError> {
    let calculator = FlatRateCalculator::from_settings(&state.settings);
    let result = payrun::run_payroll(&input, &state.settings, &calculator)?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub period: Option<PayPeriod>,
    pub records: Page<PayslipRecord>,
}

async fn summarize_payslips(
    Json(request): Json<SummaryRequest>,
) -> Result<Json<PayslipSummary>, ApiError> {
    let summary = match request.period {
        Some(period) => {
            period.validate()?;
            summarizer::summarize_period(&request.records.items, period)
        }
        None => summarizer::summarize(&request.records.items),
    };
    Ok(Json(summary))
}
