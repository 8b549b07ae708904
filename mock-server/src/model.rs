//! Records and payloads served by the mock API.

use serde::{Deserialize, Serialize};

pub const PLATFORM_ADMIN: &str = "platform_admin";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub tier: String,
    pub subscription_start: String,
    pub subscription_end: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<i64>,
    pub organization_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub job_title: String,
    pub basic_salary: String,
    pub hire_date: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
    pub organization_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// An account able to sign in. Never serialized as-is.
#[derive(Clone, Debug)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub role: String,
    pub organization_id: Option<i64>,
}

impl User {
    pub fn is_platform_admin(&self) -> bool {
        self.role == PLATFORM_ADMIN
    }

    /// Platform admins see every organization; everyone else only their own.
    pub fn can_access(&self, organization_id: i64) -> bool {
        self.is_platform_admin() || self.organization_id == Some(organization_id)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            organization_id: user.organization_id,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupOrganization {
    pub name: String,
    pub tier: String,
    pub subscription_start: String,
    pub subscription_end: String,
}

#[derive(Deserialize)]
pub struct SignupUser {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct Signup {
    pub organization: SignupOrganization,
    pub user: SignupUser,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub business_category: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPassword {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPassword {
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub tier: String,
    pub subscription_start: String,
    pub subscription_end: String,
}

#[derive(Deserialize)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub tier: Option<String>,
    pub subscription_start: Option<String>,
    pub subscription_end: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateBranch {
    pub name: String,
    pub location: String,
    pub phone: String,
    pub email: String,
    pub manager_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateBranch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub manager_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub job_title: String,
    pub basic_salary: String,
    pub hire_date: String,
    pub branch_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateEmployee {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub basic_salary: Option<String>,
    pub hire_date: Option<String>,
    pub branch_id: Option<i64>,
}

/// `limit`/`offset` pagination plus the employee branch filter.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub branch_id: Option<i64>,
}

impl ListQuery {
    pub fn page<'a, T: Clone + 'a>(&self, items: impl Iterator<Item = &'a T>) -> Vec<T> {
        items
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, organization_id: Option<i64>) -> User {
        User {
            id: 1,
            email: "u@x.rw".to_string(),
            password: "pw".to_string(),
            role: role.to_string(),
            organization_id,
        }
    }

    #[test]
    fn platform_admin_reaches_every_organization() {
        assert!(user(PLATFORM_ADMIN, None).can_access(42));
        assert!(user("Manager", Some(1)).can_access(1));
        assert!(!user("Manager", Some(1)).can_access(2));
    }

    #[test]
    fn page_applies_offset_then_limit() {
        let items = [1, 2, 3, 4, 5];
        let query = ListQuery {
            limit: Some(2),
            offset: Some(1),
            branch_id: None,
        };
        assert_eq!(query.page(items.iter()), vec![2, 3]);
        assert_eq!(ListQuery::default().page(items.iter()).len(), 5);
    }

    #[test]
    fn create_branch_manager_is_optional() {
        let input: CreateBranch = serde_json::from_str(
            r#"{"name":"Remera","location":"Kigali","phone":"1","email":"r@x.rw"}"#,
        )
        .unwrap();
        assert!(input.manager_id.is_none());
    }

    #[test]
    fn public_user_hides_password() {
        let json = serde_json::to_value(PublicUser::from(&user("Manager", Some(3)))).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["organization_id"], 3);
    }
}
