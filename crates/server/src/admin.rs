//! Administrative routes: admin login and provisioning, the cross-user
//! request views and lifecycle operations, and catalog management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use jansetu_core::domain::department::DepartmentId;
use jansetu_core::domain::identity::{Admin, AdminId, AdminRole};
use jansetu_core::domain::request::RequestId;
use jansetu_core::domain::service::{ServiceId, ServiceType};
use jansetu_core::errors::{CatalogError, IdentityError};
use jansetu_core::reporting::{
    group_by_department, DepartmentGroup, DepartmentStats, RequestFilter, ServiceStats,
};
use jansetu_db::repositories::{
    AdminLogin, DepartmentUpdate, NewAdmin, NewDepartment, NewService, ServiceUpdate,
};
use jansetu_db::RequestScope;

use crate::auth::AuthenticatedAdmin;
use crate::bootstrap::AppState;
use crate::citizen::{
    parse_kind_param, parse_status_param, Ack, RequestDetailResponse, SessionResponse,
};
use crate::error::ApiError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/me", get(profile))
        .route("/api/admin/admins", post(create_admin))
        .route("/api/admin/requests", get(all_requests))
        .route("/api/admin/requests/{request_id}", get(request_detail))
        .route("/api/admin/requests/{request_id}/status", patch(update_status))
        .route("/api/admin/requests/{request_id}/assign", post(assign_request))
        .route("/api/admin/departments", post(create_department))
        .route(
            "/api/admin/departments/{dept_id}",
            patch(update_department).delete(delete_department),
        )
        .route("/api/admin/departments/{dept_id}/stats", get(department_stats))
        .route("/api/admin/departments/{dept_id}/services", post(add_service))
        .route(
            "/api/admin/departments/{dept_id}/services/{service_id}",
            patch(update_service).delete(remove_service),
        )
        .route(
            "/api/admin/departments/{dept_id}/services/{service_id}/toggle",
            post(toggle_service),
        )
        .route(
            "/api/admin/departments/{dept_id}/services/{service_id}/stats",
            get(service_stats),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AdminLoginBody {
    pub admin_id: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminBody {
    pub name: String,
    pub email: String,
    pub role: String,
    pub mobile: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateAdminResponse {
    pub admin: Admin,
    /// Shown exactly once; only a salted digest is stored.
    pub initial_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AllRequestsQuery {
    pub status: Option<String>,
    pub request_type: Option<String>,
    pub dept_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupedRequestsResponse {
    pub total_requests: usize,
    pub departments: Vec<DepartmentGroup>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub assigned_to: String,
    pub superadmin_code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentBody {
    pub dept_name: String,
    pub office_location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateDepartmentResponse {
    pub dept_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDepartmentBody {
    pub dept_name: Option<String>,
    pub office_location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddServiceBody {
    pub service_name: String,
    pub service_type: String,
    pub description: Option<String>,
    pub fee: Option<Decimal>,
    pub processing_time_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AddServiceResponse {
    pub service_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateServiceBody {
    pub service_name: Option<String>,
    pub service_type: Option<String>,
    pub description: Option<String>,
    pub fee: Option<Decimal>,
    pub processing_time_days: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub is_active: bool,
}

fn parse_service_type(value: &str) -> Result<ServiceType, ApiError> {
    ServiceType::parse(value)
        .ok_or_else(|| ApiError::from(CatalogError::InvalidServiceType(value.to_string())))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginBody>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .identity
        .login_admin(AdminLogin {
            admin_id: body.admin_id,
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: session.expires_at.to_rfc3339(),
    }))
}

async fn profile(
    auth: AuthenticatedAdmin,
    State(state): State<AppState>,
) -> Result<Json<Admin>, ApiError> {
    let admin = state
        .identity
        .find_admin(&auth.admin_id)
        .await?
        .ok_or_else(|| ApiError::not_found("admin not found"))?;
    Ok(Json(admin))
}

async fn create_admin(
    auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateAdminBody>,
) -> Result<(StatusCode, Json<CreateAdminResponse>), ApiError> {
    let role = AdminRole::parse(&body.role)
        .ok_or_else(|| ApiError::from(IdentityError::InvalidRole(body.role.clone())))?;

    let created = state
        .identity
        .create_admin(NewAdmin { name: body.name, email: body.email, role, mobile: body.mobile })
        .await?;

    info!(
        event_name = "identity.admin_created",
        admin_id = %created.admin.id.0,
        created_by = %auth.admin_id.0,
        created_by_role = auth.role.as_str(),
        "admin account created"
    );
    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            admin: created.admin,
            initial_password: created.initial_password,
        }),
    ))
}

async fn all_requests(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Query(query): Query<AllRequestsQuery>,
) -> Result<Json<GroupedRequestsResponse>, ApiError> {
    let filter = RequestFilter {
        status: query.status.as_deref().map(parse_status_param).transpose()?,
        kind: query.request_type.as_deref().map(parse_kind_param).transpose()?,
        department: query.dept_id.map(DepartmentId),
        user: None,
    };

    let summaries = state.reporting.list_requests(&filter).await?;
    let total_requests = summaries.len();
    Ok(Json(GroupedRequestsResponse {
        total_requests,
        departments: group_by_department(summaries),
    }))
}

async fn request_detail(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Json<RequestDetailResponse>, ApiError> {
    let bundle = state
        .engine
        .get_request_with_history(RequestId(request_id), RequestScope::Any)
        .await?;

    Ok(Json(RequestDetailResponse {
        request: bundle.request,
        status_history: bundle.history,
        documents: bundle.documents,
        payments: bundle.payments,
    }))
}

async fn update_status(
    auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<Ack>, ApiError> {
    let status = parse_status_param(&body.status)?;

    state
        .engine
        .transition_status(RequestId(request_id), status, &auth.admin_id, body.remarks.as_deref())
        .await?;

    info!(
        event_name = "lifecycle.status_updated",
        request_id,
        new_status = status.as_str(),
        admin_id = %auth.admin_id.0,
        "request status updated"
    );
    Ok(Json(Ack { success: true, message: "request status updated".to_string() }))
}

async fn assign_request(
    auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
    Json(body): Json<AssignBody>,
) -> Result<Json<Ack>, ApiError> {
    state
        .engine
        .assign_request(
            RequestId(request_id),
            &AdminId(body.assigned_to),
            &body.superadmin_code,
        )
        .await?;

    info!(
        event_name = "lifecycle.request_assigned",
        request_id,
        assigned_by = %auth.admin_id.0,
        "request assigned"
    );
    Ok(Json(Ack { success: true, message: "request assigned".to_string() }))
}

async fn create_department(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateDepartmentBody>,
) -> Result<(StatusCode, Json<CreateDepartmentResponse>), ApiError> {
    if body.dept_name.trim().is_empty() {
        return Err(ApiError::validation("department name is required"));
    }

    let dept_id = state
        .catalog
        .create_department(NewDepartment {
            name: body.dept_name,
            office_location: body.office_location,
            contact_email: body.contact_email,
            contact_phone: body.contact_phone,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CreateDepartmentResponse { dept_id: dept_id.0 })))
}

async fn update_department(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path(dept_id): Path<String>,
    Json(body): Json<UpdateDepartmentBody>,
) -> Result<Json<Ack>, ApiError> {
    state
        .catalog
        .update_department(
            &DepartmentId(dept_id),
            DepartmentUpdate {
                name: body.dept_name,
                office_location: body.office_location,
                contact_email: body.contact_email,
                contact_phone: body.contact_phone,
            },
        )
        .await?;

    Ok(Json(Ack { success: true, message: "department updated".to_string() }))
}

async fn delete_department(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path(dept_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    state.catalog.delete_department(&DepartmentId(dept_id)).await?;
    Ok(Json(Ack { success: true, message: "department deleted".to_string() }))
}

async fn department_stats(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path(dept_id): Path<String>,
) -> Result<Json<DepartmentStats>, ApiError> {
    let stats = state
        .reporting
        .department_stats(&DepartmentId(dept_id))
        .await?
        .ok_or_else(|| ApiError::not_found("department not found"))?;
    Ok(Json(stats))
}

async fn add_service(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path(dept_id): Path<String>,
    Json(body): Json<AddServiceBody>,
) -> Result<(StatusCode, Json<AddServiceResponse>), ApiError> {
    if body.service_name.trim().is_empty() {
        return Err(ApiError::validation("service name is required"));
    }
    let service_type = parse_service_type(&body.service_type)?;

    let service_id = state
        .catalog
        .add_service(
            &DepartmentId(dept_id),
            NewService {
                name: body.service_name,
                service_type,
                description: body.description,
                fee: body.fee,
                processing_time_days: body.processing_time_days,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(AddServiceResponse { service_id: service_id.0 })))
}

async fn update_service(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path((dept_id, service_id)): Path<(String, String)>,
    Json(body): Json<UpdateServiceBody>,
) -> Result<Json<Ack>, ApiError> {
    let service_type = body.service_type.as_deref().map(parse_service_type).transpose()?;

    state
        .catalog
        .update_service(
            &DepartmentId(dept_id),
            &ServiceId(service_id),
            ServiceUpdate {
                name: body.service_name,
                service_type,
                description: body.description,
                fee: body.fee,
                processing_time_days: body.processing_time_days,
                active: body.is_active,
            },
        )
        .await?;

    Ok(Json(Ack { success: true, message: "service updated".to_string() }))
}

async fn toggle_service(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path((dept_id, service_id)): Path<(String, String)>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let is_active =
        state.catalog.toggle_service(&DepartmentId(dept_id), &ServiceId(service_id)).await?;
    Ok(Json(ToggleResponse { is_active }))
}

async fn remove_service(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path((dept_id, service_id)): Path<(String, String)>,
) -> Result<Json<Ack>, ApiError> {
    state.catalog.remove_service(&DepartmentId(dept_id), &ServiceId(service_id)).await?;
    Ok(Json(Ack { success: true, message: "service deleted".to_string() }))
}

async fn service_stats(
    _auth: AuthenticatedAdmin,
    State(state): State<AppState>,
    Path((dept_id, service_id)): Path<(String, String)>,
) -> Result<Json<ServiceStats>, ApiError> {
    let stats = state
        .reporting
        .service_stats(&DepartmentId(dept_id), &ServiceId(service_id))
        .await?
        .ok_or_else(|| ApiError::not_found("service not found in this department"))?;
    Ok(Json(stats))
}
