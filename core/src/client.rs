//! The HTTP client facade for the Genzura API.
//!
//! # Design
//! `ApiClient` holds the base URL, the session context and a transport. As in
//! a host-does-IO client, every operation is split in two: a `build_*` method
//! produces the `HttpRequest` (pure, testable without a server), and the
//! async method sends it through the `Transport` and turns the outcome into
//! an `ApiResponse`. Nothing here returns `Err` or panics to the caller;
//! transport, status and decoding failures all become `ApiResponse::Error`.
//! Each call is a single attempt: no retry, no timeout.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::envelope::ApiResponse;
use crate::error::{ApiError, StoreError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::Session;
use crate::storage::{
    FileStore, MemoryStore, SessionStore, BUSINESS_TYPE_KEY, ORGANIZATION_NAME_KEY,
};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    Branch, CreateBranch, CreateEmployee, CreateOrganization, CredentialCheck, Employee, Empty,
    HealthStatus, LoginRequest, LoginResponse, MessageResponse, Organization, ResetTokenInfo,
    SignupRequest, TokenRefresh, UpdateBranch, UpdateEmployee, UpdateOrganization,
};

/// Role recorded for platform administrators.
pub const PLATFORM_ADMIN_ROLE: &str = "platform_admin";

/// Caller-supplied transport options for `ApiClient::request`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

pub struct ApiClient {
    base_url: String,
    session: Session,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Build a client and rehydrate its session from `store`.
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session: Session::restore(store),
            transport,
        }
    }

    /// Build a reqwest-backed client. The session lives in `config.store_path`
    /// when set, in memory otherwise.
    pub fn from_config(config: &ClientConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn SessionStore> = match &config.store_path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(config, Arc::new(ReqwestTransport::new()), store))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // -----------------------------------------------------------------------
    // Generic request
    // -----------------------------------------------------------------------

    /// Shape a request for `endpoint` (a path relative to the base URL).
    ///
    /// Header precedence: `Content-Type: application/json` first, then the
    /// caller's headers (replacing a same-named default), then the bearer
    /// token when one is held.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        options: RequestOptions,
    ) -> HttpRequest {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        for (key, value) in options.headers {
            set_header(&mut headers, key, value);
        }
        if let Some(token) = self.session.token() {
            set_header(
                &mut headers,
                "Authorization".to_string(),
                format!("Bearer {token}"),
            );
        }
        HttpRequest {
            method,
            path: format!("{}{endpoint}", self.base_url),
            headers,
            body: options.body,
        }
    }

    /// Build and send a request in one step.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResponse<T> {
        self.send(self.build_request(method, endpoint, options))
            .await
    }

    /// Send one request and normalize whatever comes back.
    pub async fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> ApiResponse<T> {
        tracing::debug!(method = %request.method, url = %request.path, "sending API request");
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "API request failed");
                return err.into();
            }
        };
        tracing::debug!(status = response.status, "API response received");
        parse_response(response)
    }

    async fn send_built<T: DeserializeOwned>(
        &self,
        built: Result<HttpRequest, ApiError>,
    ) -> ApiResponse<T> {
        match built {
            Ok(request) => self.send(request).await,
            Err(err) => err.into(),
        }
    }

    fn build_json<B: Serialize>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.build_request(
            method,
            endpoint,
            RequestOptions {
                headers: Vec::new(),
                body: Some(body),
            },
        ))
    }

    fn build_plain(&self, method: HttpMethod, endpoint: &str) -> HttpRequest {
        self.build_request(method, endpoint, RequestOptions::default())
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    pub fn build_platform_login(&self, credentials: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, "/auth/platform/login", credentials)
    }

    pub fn build_login(&self, credentials: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, "/auth/login", credentials)
    }

    pub fn build_signup(&self, input: &SignupRequest) -> Result<HttpRequest, ApiError> {
        self.build_signup_on(input, Utc::now().date_naive())
    }

    /// Signup request whose one-year subscription starts on `today`.
    pub fn build_signup_on(
        &self,
        input: &SignupRequest,
        today: NaiveDate,
    ) -> Result<HttpRequest, ApiError> {
        let subscription_end = today + chrono::Duration::days(365);
        let body = serde_json::json!({
            "organization": {
                "name": input.organization_name,
                "tier": "Basic",
                "subscription_start": today.format("%Y-%m-%d").to_string(),
                "subscription_end": subscription_end.format("%Y-%m-%d").to_string(),
            },
            "user": {
                "email": input.email,
                "password": input.password,
                "role": "SuperAdmin",
            },
            "business_type": input.business_type,
            "business_category": input.business_category,
        });
        self.build_json(HttpMethod::Post, "/auth/signup", &body)
    }

    pub async fn platform_login(&self, credentials: &LoginRequest) -> ApiResponse<LoginResponse> {
        let response = self
            .send_built(self.build_platform_login(credentials))
            .await;
        if let Some(login) = issued_login(&response) {
            self.session.begin(&login.token, PLATFORM_ADMIN_ROLE, None);
        }
        response
    }

    pub async fn login(&self, credentials: &LoginRequest) -> ApiResponse<LoginResponse> {
        let response = self.send_built(self.build_login(credentials)).await;
        if let Some(login) = issued_login(&response) {
            self.session
                .begin(&login.token, &login.user.role, login.user.organization_id);
        }
        response
    }

    pub async fn signup(&self, input: &SignupRequest) -> ApiResponse<LoginResponse> {
        let response = self.send_built(self.build_signup(input)).await;
        if let Some(login) = issued_login(&response) {
            self.session
                .begin(&login.token, &login.user.role, login.user.organization_id);
            self.session
                .remember(BUSINESS_TYPE_KEY, &input.business_type);
            self.session
                .remember(ORGANIZATION_NAME_KEY, &input.organization_name);
        }
        response
    }

    pub fn logout(&self) {
        self.session.end();
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn user_role(&self) -> Option<String> {
        self.session.user_role()
    }

    pub fn organization_id(&self) -> Option<i64> {
        self.session.organization_id()
    }

    pub fn set_token(&self, token: &str) {
        self.session.set_token(token);
    }

    /// Cheap local check before credentials are sent anywhere.
    pub fn validate_credentials(&self, email: &str, password: &str) -> CredentialCheck {
        let error = if email.is_empty() || password.is_empty() {
            Some("Email and password are required")
        } else if !email.contains('@') {
            Some("Please enter a valid email address")
        } else if password.chars().count() < 3 {
            Some("Password must be at least 3 characters long")
        } else {
            None
        };
        CredentialCheck {
            is_valid: error.is_none(),
            error: error.map(str::to_string),
        }
    }

    pub fn build_forgot_password(&self, email: &str) -> Result<HttpRequest, ApiError> {
        self.build_json(
            HttpMethod::Post,
            "/auth/forgot-password",
            &serde_json::json!({ "email": email }),
        )
    }

    pub fn build_reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(
            HttpMethod::Post,
            "/auth/reset-password",
            &serde_json::json!({ "token": token, "new_password": new_password }),
        )
    }

    pub fn build_verify_reset_token(&self, token: &str) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token)
            .finish();
        self.build_plain(
            HttpMethod::Get,
            &format!("/auth/verify-reset-token?{query}"),
        )
    }

    pub fn build_refresh_token(&self) -> HttpRequest {
        self.build_plain(HttpMethod::Post, "/auth/refresh")
    }

    pub fn build_health_check(&self) -> HttpRequest {
        self.build_plain(HttpMethod::Get, "/health")
    }

    pub async fn forgot_password(&self, email: &str) -> ApiResponse<MessageResponse> {
        self.send_built(self.build_forgot_password(email)).await
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> ApiResponse<MessageResponse> {
        self.send_built(self.build_reset_password(token, new_password))
            .await
    }

    pub async fn verify_reset_token(&self, token: &str) -> ApiResponse<ResetTokenInfo> {
        self.send(self.build_verify_reset_token(token)).await
    }

    /// Exchange the current token for a fresh one.
    pub async fn refresh_token(&self) -> ApiResponse<TokenRefresh> {
        let response: ApiResponse<TokenRefresh> = self.send(self.build_refresh_token()).await;
        if let Some(refresh) = response.data().filter(|r| !r.token.is_empty()) {
            self.session.set_token(&refresh.token);
        }
        response
    }

    pub async fn health_check(&self) -> ApiResponse<HealthStatus> {
        self.send(self.build_health_check()).await
    }

    // -----------------------------------------------------------------------
    // Organizations
    // -----------------------------------------------------------------------

    pub fn build_create_organization(
        &self,
        input: &CreateOrganization,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, "/organizations", input)
    }

    pub fn build_get_organizations(&self) -> HttpRequest {
        self.build_plain(HttpMethod::Get, "/organizations")
    }

    pub fn build_get_organization(&self, id: i64) -> HttpRequest {
        self.build_plain(HttpMethod::Get, &format!("/organizations/{id}"))
    }

    pub fn build_update_organization(
        &self,
        id: i64,
        input: &UpdateOrganization,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Put, &format!("/organizations/{id}"), input)
    }

    pub fn build_delete_organization(&self, id: i64) -> HttpRequest {
        self.build_plain(HttpMethod::Delete, &format!("/organizations/{id}"))
    }

    pub async fn create_organization(
        &self,
        input: &CreateOrganization,
    ) -> ApiResponse<Organization> {
        self.send_built(self.build_create_organization(input))
            .await
    }

    pub async fn get_organizations(&self) -> ApiResponse<Vec<Organization>> {
        self.send(self.build_get_organizations()).await
    }

    pub async fn get_organization(&self, id: i64) -> ApiResponse<Organization> {
        self.send(self.build_get_organization(id)).await
    }

    pub async fn update_organization(
        &self,
        id: i64,
        input: &UpdateOrganization,
    ) -> ApiResponse<Organization> {
        self.send_built(self.build_update_organization(id, input))
            .await
    }

    pub async fn delete_organization(&self, id: i64) -> ApiResponse<Empty> {
        self.send(self.build_delete_organization(id)).await
    }

    // -----------------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------------

    pub fn build_create_branch(&self, input: &CreateBranch) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, "/branches", input)
    }

    pub fn build_get_branches(&self, limit: Option<u32>, offset: Option<u32>) -> HttpRequest {
        let endpoint = with_query(
            "/branches",
            &[
                ("limit", limit.map(i64::from)),
                ("offset", offset.map(i64::from)),
            ],
        );
        self.build_plain(HttpMethod::Get, &endpoint)
    }

    pub fn build_get_branch(&self, id: i64) -> HttpRequest {
        self.build_plain(HttpMethod::Get, &format!("/branches/{id}"))
    }

    pub fn build_update_branch(
        &self,
        id: i64,
        input: &UpdateBranch,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Put, &format!("/branches/{id}"), input)
    }

    pub fn build_delete_branch(&self, id: i64) -> HttpRequest {
        self.build_plain(HttpMethod::Delete, &format!("/branches/{id}"))
    }

    pub fn build_get_branch_employees(&self, branch_id: i64) -> HttpRequest {
        self.build_plain(HttpMethod::Get, &format!("/branches/{branch_id}/employees"))
    }

    pub async fn create_branch(&self, input: &CreateBranch) -> ApiResponse<Branch> {
        self.send_built(self.build_create_branch(input)).await
    }

    pub async fn get_branches(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ApiResponse<Vec<Branch>> {
        self.send(self.build_get_branches(limit, offset)).await
    }

    pub async fn get_branch(&self, id: i64) -> ApiResponse<Branch> {
        self.send(self.build_get_branch(id)).await
    }

    pub async fn update_branch(&self, id: i64, input: &UpdateBranch) -> ApiResponse<Branch> {
        self.send_built(self.build_update_branch(id, input)).await
    }

    pub async fn delete_branch(&self, id: i64) -> ApiResponse<Empty> {
        self.send(self.build_delete_branch(id)).await
    }

    pub async fn get_branch_employees(&self, branch_id: i64) -> ApiResponse<Vec<Employee>> {
        self.send(self.build_get_branch_employees(branch_id)).await
    }

    // -----------------------------------------------------------------------
    // Employees
    // -----------------------------------------------------------------------

    pub fn build_create_employee(&self, input: &CreateEmployee) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, "/employees", input)
    }

    pub fn build_get_employees(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
        branch_id: Option<i64>,
    ) -> HttpRequest {
        let endpoint = with_query(
            "/employees",
            &[
                ("limit", limit.map(i64::from)),
                ("offset", offset.map(i64::from)),
                ("branch_id", branch_id),
            ],
        );
        self.build_plain(HttpMethod::Get, &endpoint)
    }

    pub fn build_get_employee(&self, id: i64) -> HttpRequest {
        self.build_plain(HttpMethod::Get, &format!("/employees/{id}"))
    }

    pub fn build_update_employee(
        &self,
        id: i64,
        input: &UpdateEmployee,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Put, &format!("/employees/{id}"), input)
    }

    pub fn build_delete_employee(&self, id: i64) -> HttpRequest {
        self.build_plain(HttpMethod::Delete, &format!("/employees/{id}"))
    }

    pub async fn create_employee(&self, input: &CreateEmployee) -> ApiResponse<Employee> {
        self.send_built(self.build_create_employee(input)).await
    }

    pub async fn get_employees(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
        branch_id: Option<i64>,
    ) -> ApiResponse<Vec<Employee>> {
        self.send(self.build_get_employees(limit, offset, branch_id))
            .await
    }

    pub async fn get_employee(&self, id: i64) -> ApiResponse<Employee> {
        self.send(self.build_get_employee(id)).await
    }

    pub async fn update_employee(&self, id: i64, input: &UpdateEmployee) -> ApiResponse<Employee> {
        self.send_built(self.build_update_employee(id, input))
            .await
    }

    pub async fn delete_employee(&self, id: i64) -> ApiResponse<Empty> {
        self.send(self.build_delete_employee(id)).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Interpret a raw response as an envelope.
///
/// Non-2xx: the body's `message` or `error` field, else
/// `HTTP error! status: <code>`. 2xx: an envelope-shaped body is taken as-is;
/// a bare payload is wrapped as success data (a `data` field is unwrapped
/// unless the body is a login response).
pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> ApiResponse<T> {
    if !response.is_success() {
        let err = status_error(&response);
        tracing::warn!(status = response.status, error = %err, "API returned error status");
        return err.into();
    }
    match decode_success(&response.body) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "failed to decode API response");
            err.into()
        }
    }
}

fn status_error(response: &HttpResponse) -> ApiError {
    let body: Option<Value> = serde_json::from_str(&response.body).ok();
    let message = body
        .as_ref()
        .and_then(|body| text_field(body, "message").or_else(|| text_field(body, "error")));
    match message {
        Some(message) => ApiError::Http {
            status: response.status,
            message,
        },
        None => ApiError::status(response.status),
    }
}

fn text_field(body: &Value, name: &str) -> Option<String> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn decode_success<T: DeserializeOwned>(body: &str) -> Result<ApiResponse<T>, ApiError> {
    if body.trim().is_empty() {
        return Ok(ApiResponse::Success {
            data: None,
            message: None,
        });
    }
    let deserialization = |e: serde_json::Error| ApiError::Deserialization(e.to_string());

    let value: Value = serde_json::from_str(body).map_err(deserialization)?;
    if is_envelope(&value) {
        return serde_json::from_value(value).map_err(deserialization);
    }

    let payload = match value {
        Value::Object(mut map) if map.contains_key("data") && !is_login_body(&map) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(payload)
        .map(ApiResponse::success)
        .map_err(deserialization)
}

fn is_envelope(value: &Value) -> bool {
    matches!(
        value.get("status").and_then(Value::as_str),
        Some("success" | "error")
    )
}

fn is_login_body(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("token") && map.contains_key("user")
}

fn issued_login(response: &ApiResponse<LoginResponse>) -> Option<&LoginResponse> {
    response.data().filter(|login| !login.token.is_empty())
}

/// Append present parameters, in order, as a query string.
fn with_query(endpoint: &str, params: &[(&str, Option<i64>)]) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (name, value) in params {
        if let Some(value) = value {
            query.append_pair(name, &value.to_string());
            any = true;
        }
    }
    if any {
        format!("{endpoint}?{}", query.finish())
    } else {
        endpoint.to_string()
    }
}

fn set_header(headers: &mut Vec<(String, String)>, key: String, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
        Some(existing) => *existing = (key, value),
        None => headers.push((key, value)),
    }
}
