//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port with its own store,
//! then drives the real reqwest-backed `ApiClient` over HTTP. The server's
//! `Db` handle stays with the test so out-of-band state (reset tokens) can
//! be read back.

use std::sync::Arc;

use genzura_core::storage::{AUTH_TOKEN_KEY, BUSINESS_TYPE_KEY, SESSION_KEYS};
use genzura_core::{
    bindings, ApiClient, ApiResponse, ClientConfig, CreateBranch, CreateEmployee,
    CreateOrganization, EmployeeStatus, FileStore, HttpMethod, LoginRequest, MemoryStore,
    RequestOptions, ReqwestTransport, SessionStore, SignupRequest, UpdateEmployee,
    UpdateOrganization,
};
use mock_server::{Db, MockConfig};

async fn start_server() -> (String, Db) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db = mock_server::new_db(&MockConfig::default());
    tokio::spawn(mock_server::serve(listener, db.clone()));
    (format!("http://{addr}"), db)
}

fn client_with_store(base_url: &str, store: Arc<dyn SessionStore>) -> ApiClient {
    ApiClient::new(
        &ClientConfig::new(base_url),
        Arc::new(ReqwestTransport::new()),
        store,
    )
}

fn client(base_url: &str) -> ApiClient {
    client_with_store(base_url, Arc::new(MemoryStore::new()))
}

fn manager() -> LoginRequest {
    LoginRequest {
        email: "manager@genzura.local".to_string(),
        password: "manager123".to_string(),
    }
}

fn admin() -> LoginRequest {
    LoginRequest {
        email: "admin@genzura.local".to_string(),
        password: "admin123".to_string(),
    }
}

#[tokio::test]
async fn health_check_wraps_bare_payload() {
    let (url, _db) = start_server().await;
    let health = client(&url).health_check().await;
    let status = health.data().unwrap();
    assert_eq!(status.status, "ok");
    assert!(status.version.is_some());
}

#[tokio::test]
async fn unknown_route_yields_generic_status_message() {
    let (url, _db) = start_server().await;
    let env: ApiResponse<serde_json::Value> = client(&url)
        .request(HttpMethod::Get, "/inventory", RequestOptions::default())
        .await;
    assert_eq!(env, ApiResponse::error("HTTP error! status: 404"));
}

#[tokio::test]
async fn unreachable_server_resolves_to_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let env = client(&format!("http://{addr}")).get_organizations().await;
    assert!(!env.is_success());
    assert!(!env.error_message().unwrap().is_empty());
}

#[tokio::test]
async fn branch_and_employee_lifecycle() {
    let (url, _db) = start_server().await;
    let c = client(&url);

    // Step 1: login.
    let login = c.login(&manager()).await;
    assert!(login.is_success());
    assert!(c.is_authenticated());
    assert_eq!(c.organization_id(), Some(1));

    // Step 2: list is empty.
    let branches = c.get_branches(None, None).await;
    assert_eq!(branches, ApiResponse::success(Vec::new()));

    // Step 3: create a branch.
    let created = c
        .create_branch(&CreateBranch {
            name: "Remera".to_string(),
            location: "Kigali".to_string(),
            phone: "0788000000".to_string(),
            email: "remera@shop.rw".to_string(),
            manager_id: None,
        })
        .await
        .into_data()
        .unwrap();
    assert_eq!(created.organization_id, 1);

    // Step 4: paginated list.
    let page = c.get_branches(Some(10), Some(0)).await.into_data().unwrap();
    assert_eq!(page, vec![created.clone()]);

    // Step 5: hire into the branch.
    let employee = c
        .create_employee(&CreateEmployee {
            first_name: "Aline".to_string(),
            last_name: "Uwase".to_string(),
            email: "aline@shop.rw".to_string(),
            phone: "0722000000".to_string(),
            job_title: "Cashier".to_string(),
            basic_salary: "250000.00".to_string(),
            hire_date: "2024-02-01".to_string(),
            branch_id: Some(created.id),
        })
        .await
        .into_data()
        .unwrap();
    assert_eq!(employee.status, EmployeeStatus::Active);

    // Step 6: filtered list and branch roster agree.
    let filtered = c
        .get_employees(None, None, Some(created.id))
        .await
        .into_data()
        .unwrap();
    let roster = c.get_branch_employees(created.id).await.into_data().unwrap();
    assert_eq!(filtered, roster);
    assert_eq!(roster.len(), 1);

    // Step 7: partial update.
    let updated = c
        .update_employee(
            employee.id,
            &UpdateEmployee {
                job_title: Some("Supervisor".to_string()),
                ..Default::default()
            },
        )
        .await
        .into_data()
        .unwrap();
    assert_eq!(updated.job_title, "Supervisor");
    assert_eq!(updated.first_name, "Aline");

    // Step 8: delete, then get is not found.
    let deleted = c.delete_employee(employee.id).await;
    assert!(deleted.is_success());
    assert_eq!(deleted.message(), Some("Employee deleted"));
    let gone = c.get_employee(employee.id).await;
    assert_eq!(gone, ApiResponse::error("Employee not found"));

    assert!(c.delete_branch(created.id).await.is_success());
    assert_eq!(
        c.get_branch(created.id).await,
        ApiResponse::error("Branch not found")
    );
}

#[tokio::test]
async fn platform_admin_manages_organizations() {
    let (url, _db) = start_server().await;
    let c = client(&url);
    c.platform_login(&admin()).await;
    assert_eq!(c.user_role().as_deref(), Some("platform_admin"));

    let org = c
        .create_organization(&CreateOrganization {
            name: "Musanze Traders".to_string(),
            tier: "Premium".to_string(),
            subscription_start: "2024-01-01".to_string(),
            subscription_end: "2025-01-01".to_string(),
        })
        .await
        .into_data()
        .unwrap();

    let renamed = c
        .update_organization(
            org.id,
            &UpdateOrganization {
                name: Some("Musanze Traders Ltd".to_string()),
                ..Default::default()
            },
        )
        .await
        .into_data()
        .unwrap();
    assert_eq!(renamed.name, "Musanze Traders Ltd");
    assert_eq!(renamed.tier, "Premium");

    assert_eq!(c.get_organizations().await.into_data().unwrap().len(), 2);
    assert!(c.delete_organization(org.id).await.is_success());
    assert_eq!(
        c.get_organization(org.id).await,
        ApiResponse::error("Organization not found")
    );
}

#[tokio::test]
async fn logout_drops_authorization() {
    let (url, _db) = start_server().await;
    let c = client(&url);
    c.login(&manager()).await;
    assert!(c.get_organizations().await.is_success());

    c.logout();
    assert!(!c.is_authenticated());
    assert_eq!(
        c.get_organizations().await,
        ApiResponse::error("Unauthorized")
    );
}

#[tokio::test]
async fn session_survives_client_rebuild() {
    let (url, _db) = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = client_with_store(&url, Arc::new(FileStore::open(&path).unwrap()));
    first.login(&manager()).await;
    drop(first);

    let second = ApiClient::from_config(&ClientConfig::new(&url).with_store_path(&path)).unwrap();
    assert!(second.is_authenticated());
    assert_eq!(second.organization_id(), Some(1));
    assert!(second.get_branches(None, None).await.is_success());

    second.logout();
    let reopened = FileStore::open(&path).unwrap();
    for key in SESSION_KEYS {
        assert_eq!(reopened.get(key), None);
    }
}

#[tokio::test]
async fn signup_starts_session_and_remembers_profile() {
    let (url, _db) = start_server().await;
    let store = Arc::new(MemoryStore::new());
    let c = client_with_store(&url, store.clone());

    let env = c
        .signup(&SignupRequest {
            organization_name: "Huye Pharmacy".to_string(),
            email: "owner@huye.rw".to_string(),
            password: "pharma".to_string(),
            business_type: "product".to_string(),
            business_category: "pharmacy".to_string(),
        })
        .await;
    let login = env.into_data().unwrap();
    assert_eq!(login.user.role, "SuperAdmin");
    assert!(c.is_authenticated());
    assert_eq!(c.organization_id(), login.user.organization_id);
    assert_eq!(store.get(BUSINESS_TYPE_KEY).as_deref(), Some("product"));

    let orgs = c.get_organizations().await.into_data().unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].name, "Huye Pharmacy");
    assert_eq!(orgs[0].tier, "Basic");
}

#[tokio::test]
async fn password_reset_round_trip() {
    let (url, db) = start_server().await;
    let c = client(&url);

    let sent = c.forgot_password("manager@genzura.local").await;
    assert!(sent.is_success());
    let token = db
        .read()
        .await
        .reset_token_for("manager@genzura.local")
        .unwrap();

    let info = c.verify_reset_token(&token).await.into_data().unwrap();
    assert_eq!(info.email, "manager@genzura.local");
    assert!(c.reset_password(&token, "fresh-pass").await.is_success());

    let stale = c.login(&manager()).await;
    assert_eq!(stale, ApiResponse::error("Invalid credentials"));
    let fresh = c
        .login(&LoginRequest {
            email: "manager@genzura.local".to_string(),
            password: "fresh-pass".to_string(),
        })
        .await;
    assert!(fresh.is_success());
}

#[tokio::test]
async fn refresh_token_keeps_session_usable() {
    let (url, _db) = start_server().await;
    let store = Arc::new(MemoryStore::new());
    let c = client_with_store(&url, store.clone());
    c.login(&manager()).await;
    let before = store.get(AUTH_TOKEN_KEY).unwrap();

    let refreshed = c.refresh_token().await.into_data().unwrap();
    assert_ne!(refreshed.token, before);
    assert_eq!(store.get(AUTH_TOKEN_KEY), Some(refreshed.token));
    assert!(c.get_branches(None, None).await.is_success());
}

#[tokio::test]
async fn hook_bindings_drive_the_live_api() {
    let (url, _db) = start_server().await;
    let c = Arc::new(client(&url));

    let login = bindings::login(&c);
    login.execute(manager()).await;
    assert!(login.error().is_none());
    assert!(c.is_authenticated());

    let branches = bindings::branches(&c, Some(10), Some(0));
    branches.execute(()).await;
    assert_eq!(branches.data(), Some(Vec::new()));

    let missing = bindings::organization(&c, Some(404));
    missing.execute(()).await;
    assert_eq!(missing.error().as_deref(), Some("Organization not found"));
    assert!(missing.data().is_none());
}
