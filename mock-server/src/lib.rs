//! In-memory stand-in for the Genzura business API.
//!
//! Serves the auth, organization, branch and employee endpoints with the
//! envelope response shape, bearer-token auth and `limit`/`offset`
//! pagination. State lives in one `Store` behind an `RwLock`; nothing is
//! persisted.

pub mod auth;
pub mod model;
pub mod resources;
pub mod response;

use std::{
    collections::{BTreeMap, HashMap},
    env,
    sync::Arc,
};

use axum::{
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

use model::{Organization, User, PLATFORM_ADMIN};
use response::Failure;

/// Seeded accounts and listener settings.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub port: u16,
    pub log_level: String,
    pub admin_email: String,
    pub admin_password: String,
    pub manager_email: String,
    pub manager_password: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            log_level: "info".to_string(),
            admin_email: "admin@genzura.local".to_string(),
            admin_password: "admin123".to_string(),
            manager_email: "manager@genzura.local".to_string(),
            manager_password: "manager123".to_string(),
        }
    }
}

impl MockConfig {
    /// Load `PORT`, `MOCK_LOG_LEVEL` and `MOCK_{ADMIN,MANAGER}_{EMAIL,PASSWORD}`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let var = |name: &str, fallback: String| env::var(name).unwrap_or(fallback);

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("MOCK_LOG_LEVEL", defaults.log_level),
            admin_email: var("MOCK_ADMIN_EMAIL", defaults.admin_email),
            admin_password: var("MOCK_ADMIN_PASSWORD", defaults.admin_password),
            manager_email: var("MOCK_MANAGER_EMAIL", defaults.manager_email),
            manager_password: var("MOCK_MANAGER_PASSWORD", defaults.manager_password),
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    last_id: i64,
    pub users: Vec<User>,
    /// Bearer token to user id.
    pub sessions: HashMap<String, i64>,
    pub organizations: BTreeMap<i64, Organization>,
    pub branches: BTreeMap<i64, model::Branch>,
    pub employees: BTreeMap<i64, model::Employee>,
    /// Password-reset token to email.
    pub reset_tokens: HashMap<String, String>,
}

impl Store {
    /// One demo organization, its manager, and a platform administrator.
    pub fn seeded(config: &MockConfig) -> Self {
        let mut store = Self::default();
        let now = now();
        let organization_id = store.next_id();
        store.organizations.insert(
            organization_id,
            Organization {
                id: organization_id,
                name: "Genzura Demo".to_string(),
                tier: "Basic".to_string(),
                subscription_start: "2024-01-01".to_string(),
                subscription_end: "2025-01-01".to_string(),
                created_at: now.clone(),
                updated_at: now,
            },
        );
        let admin_id = store.next_id();
        store.users.push(User {
            id: admin_id,
            email: config.admin_email.clone(),
            password: config.admin_password.clone(),
            role: PLATFORM_ADMIN.to_string(),
            organization_id: None,
        });
        let manager_id = store.next_id();
        store.users.push(User {
            id: manager_id,
            email: config.manager_email.clone(),
            password: config.manager_password.clone(),
            role: "SuperAdmin".to_string(),
            organization_id: Some(organization_id),
        });
        store
    }

    pub fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn issue_token(&mut self, user_id: i64) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), user_id);
        token
    }

    pub fn user_for_token(&self, token: &str) -> Option<&User> {
        let user_id = self.sessions.get(token)?;
        self.users.iter().find(|user| user.id == *user_id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }

    /// Outstanding reset token for `email`, if one was requested.
    pub fn reset_token_for(&self, email: &str) -> Option<String> {
        self.reset_tokens
            .iter()
            .find(|(_, owner)| owner.eq_ignore_ascii_case(email))
            .map(|(token, _)| token.clone())
    }
}

pub type Db = Arc<RwLock<Store>>;

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller from its bearer token.
pub(crate) fn authenticate(store: &Store, headers: &HeaderMap) -> Result<User, Failure> {
    bearer(headers)
        .and_then(|token| store.user_for_token(token))
        .cloned()
        .ok_or_else(Failure::unauthorized)
}

pub fn new_db(config: &MockConfig) -> Db {
    Arc::new(RwLock::new(Store::seeded(config)))
}

/// Router over a freshly seeded store with default accounts.
pub fn app() -> Router {
    router(new_db(&MockConfig::default()))
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/health", get(auth::health))
        .route("/auth/platform/login", post(auth::platform_login))
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/verify-reset-token", get(auth::verify_reset_token))
        .route(
            "/organizations",
            get(resources::list_organizations).post(resources::create_organization),
        )
        .route(
            "/organizations/{id}",
            get(resources::get_organization)
                .put(resources::update_organization)
                .delete(resources::delete_organization),
        )
        .route(
            "/branches",
            get(resources::list_branches).post(resources::create_branch),
        )
        .route(
            "/branches/{id}",
            get(resources::get_branch)
                .put(resources::update_branch)
                .delete(resources::delete_branch),
        )
        .route("/branches/{id}/employees", get(resources::branch_employees))
        .route(
            "/employees",
            get(resources::list_employees).post(resources::create_employee),
        )
        .route(
            "/employees/{id}",
            get(resources::get_employee)
                .put(resources::update_employee)
                .delete(resources::delete_employee),
        )
        .with_state(db)
}

/// Serve `db` so the caller keeps a handle on the state.
pub async fn serve(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, router(db)).await
}
