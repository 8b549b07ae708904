//! Async client core for the Genzura business API.
//!
//! # Overview
//! `ApiClient` is the single point of contact with the remote JSON service:
//! it owns the session token, shapes every request, and returns every outcome
//! as an `ApiResponse` envelope so callers never handle transport errors
//! themselves. `ApiHook` turns any operation into observable
//! `{data, loading, error}` state in which only the latest call commits.
//!
//! # Design
//! - Requests and responses are plain data (`http`); the network sits behind
//!   the `Transport` port, reqwest by default.
//! - The session token is mirrored into a `SessionStore` port (memory or a
//!   JSON file), rehydrated when the client is built.
//! - One attempt per call. Retry and timeout policy belongs to the caller.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod bindings;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod hook;
pub mod http;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;

pub use client::{parse_response, ApiClient, RequestOptions, PLATFORM_ADMIN_ROLE};
pub use config::ClientConfig;
pub use envelope::ApiResponse;
pub use error::{ApiError, StoreError};
pub use hook::{ApiHook, RequestState};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::Session;
pub use storage::{FileStore, MemoryStore, SessionStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AuthUser, Branch, CreateBranch, CreateEmployee, CreateOrganization, CredentialCheck, Employee,
    EmployeeStatus, Empty, HealthStatus, LoginRequest, LoginResponse, MessageResponse,
    Organization, ResetTokenInfo, SignupRequest, TokenRefresh, UpdateBranch, UpdateEmployee,
    UpdateOrganization,
};
