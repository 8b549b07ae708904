//! Ready-made hooks, one per facade operation.
//!
//! Each constructor captures a shared `ApiClient` and returns an `ApiHook`
//! whose `execute` arguments are the operation's inputs. Read hooks bound to
//! an optional id resolve to an error envelope without touching the network
//! when the id is missing.

use std::future::Future;
use std::sync::Arc;

use crate::client::ApiClient;
use crate::envelope::ApiResponse;
use crate::hook::ApiHook;
use crate::types::{
    Branch, CreateBranch, CreateEmployee, CreateOrganization, Employee, Empty, HealthStatus,
    LoginRequest, LoginResponse, MessageResponse, Organization, ResetTokenInfo, SignupRequest,
    TokenRefresh, UpdateBranch, UpdateEmployee, UpdateOrganization,
};

fn bind<A, T, F, Fut>(client: &Arc<ApiClient>, call: F) -> ApiHook<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(Arc<ApiClient>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResponse<T>> + Send + 'static,
{
    let client = Arc::clone(client);
    ApiHook::new(move |args| call(Arc::clone(&client), args), None)
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

pub fn login(client: &Arc<ApiClient>) -> ApiHook<LoginRequest, LoginResponse> {
    bind(client, |client, credentials: LoginRequest| async move {
        client.login(&credentials).await
    })
}

pub fn platform_login(client: &Arc<ApiClient>) -> ApiHook<LoginRequest, LoginResponse> {
    bind(client, |client, credentials: LoginRequest| async move {
        client.platform_login(&credentials).await
    })
}

pub fn signup(client: &Arc<ApiClient>) -> ApiHook<SignupRequest, LoginResponse> {
    bind(client, |client, input: SignupRequest| async move {
        client.signup(&input).await
    })
}

pub fn forgot_password(client: &Arc<ApiClient>) -> ApiHook<String, MessageResponse> {
    bind(client, |client, email: String| async move {
        client.forgot_password(&email).await
    })
}

/// Arguments are `(reset_token, new_password)`.
pub fn reset_password(client: &Arc<ApiClient>) -> ApiHook<(String, String), MessageResponse> {
    bind(client, |client, (token, new_password): (String, String)| async move {
        client.reset_password(&token, &new_password).await
    })
}

pub fn verify_reset_token(client: &Arc<ApiClient>) -> ApiHook<String, ResetTokenInfo> {
    bind(client, |client, token: String| async move {
        client.verify_reset_token(&token).await
    })
}

pub fn refresh_token(client: &Arc<ApiClient>) -> ApiHook<(), TokenRefresh> {
    bind(client, |client, ()| async move { client.refresh_token().await })
}

pub fn health_check(client: &Arc<ApiClient>) -> ApiHook<(), HealthStatus> {
    bind(client, |client, ()| async move { client.health_check().await })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub fn organizations(client: &Arc<ApiClient>) -> ApiHook<(), Vec<Organization>> {
    bind(client, |client, ()| async move { client.get_organizations().await })
}

pub fn organization(client: &Arc<ApiClient>, id: Option<i64>) -> ApiHook<(), Organization> {
    bind(client, move |client, ()| async move {
        match id {
            Some(id) => client.get_organization(id).await,
            None => ApiResponse::error("No organization ID provided"),
        }
    })
}

pub fn branches(
    client: &Arc<ApiClient>,
    limit: Option<u32>,
    offset: Option<u32>,
) -> ApiHook<(), Vec<Branch>> {
    bind(client, move |client, ()| async move {
        client.get_branches(limit, offset).await
    })
}

pub fn branch(client: &Arc<ApiClient>, id: Option<i64>) -> ApiHook<(), Branch> {
    bind(client, move |client, ()| async move {
        match id {
            Some(id) => client.get_branch(id).await,
            None => ApiResponse::error("No branch ID provided"),
        }
    })
}

pub fn employees(
    client: &Arc<ApiClient>,
    limit: Option<u32>,
    offset: Option<u32>,
    branch_id: Option<i64>,
) -> ApiHook<(), Vec<Employee>> {
    bind(client, move |client, ()| async move {
        client.get_employees(limit, offset, branch_id).await
    })
}

pub fn employee(client: &Arc<ApiClient>, id: Option<i64>) -> ApiHook<(), Employee> {
    bind(client, move |client, ()| async move {
        match id {
            Some(id) => client.get_employee(id).await,
            None => ApiResponse::error("No employee ID provided"),
        }
    })
}

pub fn branch_employees(
    client: &Arc<ApiClient>,
    branch_id: Option<i64>,
) -> ApiHook<(), Vec<Employee>> {
    bind(client, move |client, ()| async move {
        match branch_id {
            Some(id) => client.get_branch_employees(id).await,
            None => ApiResponse::error("No branch ID provided"),
        }
    })
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

pub fn create_organization(client: &Arc<ApiClient>) -> ApiHook<CreateOrganization, Organization> {
    bind(client, |client, input: CreateOrganization| async move {
        client.create_organization(&input).await
    })
}

pub fn update_organization(
    client: &Arc<ApiClient>,
) -> ApiHook<(i64, UpdateOrganization), Organization> {
    bind(client, |client, (id, input): (i64, UpdateOrganization)| async move {
        client.update_organization(id, &input).await
    })
}

pub fn delete_organization(client: &Arc<ApiClient>) -> ApiHook<i64, Empty> {
    bind(client, |client, id: i64| async move {
        client.delete_organization(id).await
    })
}

pub fn create_branch(client: &Arc<ApiClient>) -> ApiHook<CreateBranch, Branch> {
    bind(client, |client, input: CreateBranch| async move {
        client.create_branch(&input).await
    })
}

pub fn update_branch(client: &Arc<ApiClient>) -> ApiHook<(i64, UpdateBranch), Branch> {
    bind(client, |client, (id, input): (i64, UpdateBranch)| async move {
        client.update_branch(id, &input).await
    })
}

pub fn delete_branch(client: &Arc<ApiClient>) -> ApiHook<i64, Empty> {
    bind(client, |client, id: i64| async move { client.delete_branch(id).await })
}

pub fn create_employee(client: &Arc<ApiClient>) -> ApiHook<CreateEmployee, Employee> {
    bind(client, |client, input: CreateEmployee| async move {
        client.create_employee(&input).await
    })
}

pub fn update_employee(client: &Arc<ApiClient>) -> ApiHook<(i64, UpdateEmployee), Employee> {
    bind(client, |client, (id, input): (i64, UpdateEmployee)| async move {
        client.update_employee(id, &input).await
    })
}

pub fn delete_employee(client: &Arc<ApiClient>) -> ApiHook<i64, Empty> {
    bind(client, |client, id: i64| async move {
        client.delete_employee(id).await
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ApiError;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::storage::MemoryStore;
    use crate::transport::Transport;

    /// Counts calls and always answers with an empty success list.
    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: r#"{"status":"success","data":[]}"#.to_string(),
            })
        }
    }

    fn client(transport: Arc<CountingTransport>) -> Arc<ApiClient> {
        Arc::new(ApiClient::new(
            &ClientConfig::new("http://localhost:3000"),
            transport,
            Arc::new(MemoryStore::new()),
        ))
    }

    #[tokio::test]
    async fn missing_id_short_circuits() {
        let transport = Arc::new(CountingTransport::default());
        let client = client(transport.clone());

        let hook = branch(&client, None);
        let response = hook.execute(()).await;
        assert_eq!(response, Some(ApiResponse::error("No branch ID provided")));
        assert_eq!(hook.error().as_deref(), Some("No branch ID provided"));

        let hook = employee(&client, None);
        hook.execute(()).await;
        assert_eq!(hook.error().as_deref(), Some("No employee ID provided"));

        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_binding_commits_data() {
        let transport = Arc::new(CountingTransport::default());
        let client = client(transport.clone());

        let hook = branches(&client, Some(10), Some(0));
        hook.execute(()).await;
        assert_eq!(hook.data(), Some(Vec::new()));
        assert_eq!(hook.error(), None);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}
