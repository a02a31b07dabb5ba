//! Citizen-facing routes: registration, login, profile, documents,
//! catalog browsing, request submission and tracking, receipts.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use jansetu_core::domain::department::{Department, DepartmentId};
use jansetu_core::domain::document::Document;
use jansetu_core::domain::history::StatusHistoryEntry;
use jansetu_core::domain::identity::User;
use jansetu_core::domain::payment::{Payment, PaymentStatus};
use jansetu_core::domain::request::{RequestId, RequestKind, RequestStatus, ServiceRequest};
use jansetu_core::domain::service::{Service, ServiceId};
use jansetu_core::errors::LifecycleError;
use jansetu_core::reporting::{PaymentReceipt, RequestFilter, RequestSummary};
use jansetu_db::repositories::{NewDocument, NewUser, ProfileUpdate, UserLogin};
use jansetu_db::RequestScope;

use crate::auth::AuthenticatedUser;
use crate::bootstrap::AppState;
use crate::error::ApiError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/users/me", get(profile).patch(update_profile))
        .route("/api/users/me/password", post(change_password))
        .route("/api/users/documents", get(list_documents).post(upload_document))
        .route("/api/users/documents/{document_id}", delete(delete_document))
        .route("/api/users/receipts", get(receipts))
        .route("/api/departments", get(departments))
        .route("/api/departments/{dept_id}", get(department))
        .route("/api/departments/{dept_id}/services", get(department_services))
        .route("/api/requests", post(create_request).get(my_requests))
        .route("/api/requests/{request_id}", get(request_detail))
        .route("/api/requests/{request_id}/cancel", post(cancel_request))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub full_name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub aadhaar: Option<String>,
    pub password: String,
    pub language_preference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub aadhaar: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileBody {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub language_preference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordBody {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadDocumentBody {
    pub document_type: String,
    pub document_number: Option<String>,
    pub file_path: String,
    pub request_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    pub document_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub service_id: String,
    pub request_kind: String,
    pub description: Option<String>,
    pub transaction_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateRequestResponse {
    pub request_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyRequestsQuery {
    pub status: Option<String>,
    pub request_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReceiptsQuery {
    pub payment_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServicesQuery {
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct Listing<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> Listing<T> {
    fn of(items: Vec<T>) -> Self {
        Self { count: items.len(), items }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestDetailResponse {
    pub request: ServiceRequest,
    pub status_history: Vec<StatusHistoryEntry>,
    pub documents: Vec<Document>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

pub(crate) fn parse_status_param(value: &str) -> Result<RequestStatus, ApiError> {
    RequestStatus::parse(value)
        .ok_or_else(|| ApiError::from(LifecycleError::InvalidStatus(value.to_string())))
}

pub(crate) fn parse_kind_param(value: &str) -> Result<RequestKind, ApiError> {
    RequestKind::parse(value)
        .ok_or_else(|| ApiError::validation("request type must be 'Request' or 'Complaint'"))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user_id = state
        .identity
        .register_user(NewUser {
            full_name: body.full_name,
            email: body.email,
            mobile: body.mobile,
            aadhaar: body.aadhaar,
            password: body.password,
            language_preference: body.language_preference,
        })
        .await?;

    info!(event_name = "identity.user_registered", user_id = %user_id.0, "user registered");
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id: user_id.0 })))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .identity
        .login_user(UserLogin {
            email: body.email,
            mobile: body.mobile,
            aadhaar: body.aadhaar,
            password: body.password,
        })
        .await?;

    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: session.expires_at.to_rfc3339(),
    }))
}

async fn profile(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .identity
        .find_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(Json(user))
}

async fn update_profile(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Json<Ack>, ApiError> {
    state
        .identity
        .update_profile(
            &auth.user_id,
            ProfileUpdate {
                full_name: body.full_name,
                email: body.email,
                mobile: body.mobile,
                language_preference: body.language_preference,
            },
        )
        .await?;

    Ok(Json(Ack { success: true, message: "profile updated".to_string() }))
}

async fn change_password(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordBody>,
) -> Result<Json<Ack>, ApiError> {
    state
        .identity
        .change_password(&auth.user_id, &body.current_password, &body.new_password)
        .await?;

    Ok(Json(Ack { success: true, message: "password changed".to_string() }))
}

async fn list_documents(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Listing<Document>>, ApiError> {
    let documents = state.documents.list_for_user(&auth.user_id).await?;
    Ok(Json(Listing::of(documents)))
}

async fn upload_document(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Json(body): Json<UploadDocumentBody>,
) -> Result<(StatusCode, Json<UploadDocumentResponse>), ApiError> {
    if body.document_type.trim().is_empty() || body.file_path.trim().is_empty() {
        return Err(ApiError::validation("document type and file path are required"));
    }

    // Attaching to a request is only allowed for the caller's own
    // request; a foreign request reads as nonexistent.
    let request_id = body.request_id.map(RequestId);
    if let Some(request_id) = request_id {
        state
            .engine
            .get_request_with_history(request_id, RequestScope::ForUser(auth.user_id.clone()))
            .await?;
    }

    let document_id = state
        .documents
        .add(NewDocument {
            user_id: auth.user_id,
            request_id,
            document_type: body.document_type,
            document_number: body.document_number,
            file_path: body.file_path,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UploadDocumentResponse { document_id })))
}

async fn delete_document(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
) -> Result<Json<Ack>, ApiError> {
    if !state.documents.delete(document_id, &auth.user_id).await? {
        return Err(ApiError::not_found("document not found"));
    }
    Ok(Json(Ack { success: true, message: "document deleted".to_string() }))
}

async fn receipts(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<ReceiptsQuery>,
) -> Result<Json<Listing<PaymentReceipt>>, ApiError> {
    let status = query
        .payment_status
        .as_deref()
        .map(|value| {
            PaymentStatus::parse(value)
                .ok_or_else(|| ApiError::validation(format!("invalid payment status `{value}`")))
        })
        .transpose()?;

    let receipts = state.payments.list_receipts(&auth.user_id, status).await?;
    Ok(Json(Listing::of(receipts)))
}

async fn departments(
    State(state): State<AppState>,
) -> Result<Json<Listing<Department>>, ApiError> {
    let departments = state.catalog.list_departments().await?;
    Ok(Json(Listing::of(departments)))
}

async fn department(
    State(state): State<AppState>,
    Path(dept_id): Path<String>,
) -> Result<Json<Department>, ApiError> {
    let department = state
        .catalog
        .find_department(&DepartmentId(dept_id))
        .await?
        .ok_or_else(|| ApiError::not_found("department not found"))?;
    Ok(Json(department))
}

async fn department_services(
    State(state): State<AppState>,
    Path(dept_id): Path<String>,
    Query(query): Query<ServicesQuery>,
) -> Result<Json<Listing<Service>>, ApiError> {
    // Citizens browse the live catalog; inactive services only show up
    // when explicitly requested.
    let only_active = match query.is_active {
        Some(false) => None,
        _ => Some(true),
    };
    let services =
        state.catalog.list_services(&DepartmentId(dept_id), only_active).await?;
    Ok(Json(Listing::of(services)))
}

async fn create_request(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<CreateRequestResponse>), ApiError> {
    let kind = parse_kind_param(&body.request_kind)?;

    let request_id = state
        .engine
        .create_request(
            &auth.user_id,
            &ServiceId(body.service_id),
            kind,
            body.description,
            body.transaction_ref.as_deref(),
        )
        .await?;

    info!(
        event_name = "lifecycle.request_created",
        request_id = request_id.0,
        user_id = %auth.user_id.0,
        "request submitted"
    );
    Ok((StatusCode::CREATED, Json(CreateRequestResponse { request_id: request_id.0 })))
}

async fn my_requests(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<MyRequestsQuery>,
) -> Result<Json<Listing<RequestSummary>>, ApiError> {
    let filter = RequestFilter {
        status: query.status.as_deref().map(parse_status_param).transpose()?,
        kind: query.request_type.as_deref().map(parse_kind_param).transpose()?,
        department: None,
        user: Some(auth.user_id),
    };

    let requests = state.reporting.list_requests(&filter).await?;
    Ok(Json(Listing::of(requests)))
}

async fn request_detail(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Json<RequestDetailResponse>, ApiError> {
    let bundle = state
        .engine
        .get_request_with_history(RequestId(request_id), RequestScope::ForUser(auth.user_id))
        .await?;

    Ok(Json(RequestDetailResponse {
        request: bundle.request,
        status_history: bundle.history,
        documents: bundle.documents,
        payments: bundle.payments,
    }))
}

async fn cancel_request(
    auth: AuthenticatedUser,
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Json<Ack>, ApiError> {
    state.engine.cancel_request(RequestId(request_id), &auth.user_id).await?;

    info!(
        event_name = "lifecycle.request_cancelled",
        request_id,
        user_id = %auth.user_id.0,
        "request cancelled by user"
    );
    Ok(Json(Ack { success: true, message: "request cancelled".to_string() }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use jansetu_db::fixtures;

    use crate::testutil::{request, send, setup, user_token};

    #[tokio::test]
    async fn register_login_and_fetch_profile() {
        let (router, _pool) = setup().await;

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "full_name": "Meera Pillai",
                    "email": "meera@example.in",
                    "mobile": "9876511111",
                    "password": "harbour-lane-21",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let user_id = body["user_id"].as_str().expect("user_id").to_string();
        assert!(user_id.starts_with("UID"));

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/auth/login",
                None,
                Some(serde_json::json!({
                    "email": "meera@example.in",
                    "password": "harbour-lane-21",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().expect("token").to_string();

        let (status, body) =
            send(&router, request("GET", "/api/users/me", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Meera Pillai");

        let (status, _body) = send(&router, request("GET", "/api/users/me", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn payable_request_flow_create_track_cancel() {
        let (router, pool) = setup().await;
        let token = user_token(&pool, "asha@example.in").await;

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/requests",
                Some(&token),
                Some(serde_json::json!({
                    "service_id": fixtures::SERVICE_LICENCE,
                    "request_kind": "Request",
                    "description": "Licence expired last month",
                    "transaction_ref": fixtures::TXN_SUCCESS,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        let request_id = body["request_id"].as_i64().expect("request_id");

        let uri = format!("/api/requests/{request_id}");
        let (status, body) = send(&router, request("GET", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["request"]["status"], "Pending");
        assert_eq!(body["status_history"].as_array().expect("history").len(), 1);
        assert_eq!(body["payments"].as_array().expect("payments").len(), 1);

        let cancel_uri = format!("/api/requests/{request_id}/cancel");
        let (status, _body) = send(&router, request("POST", &cancel_uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, request("GET", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["request"]["status"], "Cancelled");
        assert_eq!(body["status_history"].as_array().expect("history").len(), 2);

        // A cancelled request cannot be cancelled again.
        let (status, body) = send(&router, request("POST", &cancel_uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn failed_payment_and_bad_kind_are_client_errors() {
        let (router, pool) = setup().await;
        let token = user_token(&pool, "asha@example.in").await;

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/requests",
                Some(&token),
                Some(serde_json::json!({
                    "service_id": fixtures::SERVICE_LICENCE,
                    "request_kind": "Request",
                    "transaction_ref": fixtures::TXN_FAILED,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation");

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/requests",
                Some(&token),
                Some(serde_json::json!({
                    "service_id": fixtures::SERVICE_CERTIFICATE,
                    "request_kind": "Grievance",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn foreign_requests_read_as_not_found() {
        let (router, pool) = setup().await;
        let asha = user_token(&pool, "asha@example.in").await;
        let vikram = user_token(&pool, "vikram@example.in").await;

        let (_status, body) = send(
            &router,
            request(
                "POST",
                "/api/requests",
                Some(&asha),
                Some(serde_json::json!({
                    "service_id": fixtures::SERVICE_CERTIFICATE,
                    "request_kind": "Request",
                })),
            ),
        )
        .await;
        let request_id = body["request_id"].as_i64().expect("request_id");

        let uri = format!("/api/requests/{request_id}");
        let (status, body) = send(&router, request("GET", &uri, Some(&vikram), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "not_found");
    }

    #[tokio::test]
    async fn catalog_browsing_is_public_and_active_only_by_default() {
        let (router, _pool) = setup().await;

        let (status, body) = send(&router, request("GET", "/api/departments", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let uri = format!("/api/departments/{}/services", fixtures::DEPT_TRANSPORT);
        let (status, body) = send(&router, request("GET", &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        // The inactive trade permit is hidden.
        assert_eq!(body["count"], 2);

        let uri = format!("/api/departments/{}/services?is_active=false", fixtures::DEPT_TRANSPORT);
        let (status, body) = send(&router, request("GET", &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn document_bookkeeping_round_trip() {
        let (router, pool) = setup().await;
        let token = user_token(&pool, "asha@example.in").await;

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/users/documents",
                Some(&token),
                Some(serde_json::json!({
                    "document_type": "aadhaar_card",
                    "file_path": "/uploads/aadhaar-card.pdf",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let document_id = body["document_id"].as_i64().expect("document_id");

        let (status, body) =
            send(&router, request("GET", "/api/users/documents", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let uri = format!("/api/users/documents/{document_id}");
        let (status, _body) = send(&router, request("DELETE", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _body) = send(&router, request("DELETE", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/users/documents",
                Some(&token),
                Some(serde_json::json!({
                    "document_type": "",
                    "file_path": "/uploads/x.pdf",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn receipts_filter_by_payment_status() {
        let (router, pool) = setup().await;
        let token = user_token(&pool, "asha@example.in").await;

        let (status, body) =
            send(&router, request("GET", "/api/users/receipts", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);

        let (status, body) = send(
            &router,
            request("GET", "/api/users/receipts?payment_status=Failed", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, _body) = send(
            &router,
            request("GET", "/api/users/receipts?payment_status=Bounced", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn my_requests_filters_and_sorts_by_recency() {
        let (router, pool) = setup().await;
        let token = user_token(&pool, "asha@example.in").await;

        for (service, kind) in [
            (fixtures::SERVICE_CERTIFICATE, "Request"),
            (fixtures::SERVICE_CERTIFICATE, "Complaint"),
        ] {
            let (status, _body) = send(
                &router,
                request(
                    "POST",
                    "/api/requests",
                    Some(&token),
                    Some(serde_json::json!({
                        "service_id": service,
                        "request_kind": kind,
                    })),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) =
            send(&router, request("GET", "/api/requests", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (status, body) = send(
            &router,
            request("GET", "/api/requests?request_type=Complaint", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, _body) = send(
            &router,
            request("GET", "/api/requests?status=Someday", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
