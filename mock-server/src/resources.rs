//! Organization, branch and employee CRUD handlers.
//!
//! Every route requires a bearer token. Non-platform users are confined to
//! their own organization; records outside it answer 404 as if absent.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::model::{
    Branch, CreateBranch, CreateEmployee, CreateOrganization, Employee, ListQuery, Organization,
    UpdateBranch, UpdateEmployee, UpdateOrganization, User,
};
use crate::response::{message, success, ApiResult, Failure};
use crate::{authenticate, now, Db};

fn home_organization(user: &User) -> Result<i64, Failure> {
    user.organization_id
        .ok_or_else(|| Failure::bad_request("This action requires an organization account"))
}

// ---------------------------------------------------------------------------
// Organizations
// ---------------------------------------------------------------------------

pub async fn list_organizations(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    let organizations: Vec<Organization> = store
        .organizations
        .values()
        .filter(|org| user.can_access(org.id))
        .cloned()
        .collect();
    Ok(success(StatusCode::OK, organizations))
}

pub async fn create_organization(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateOrganization>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    if !user.is_platform_admin() {
        return Err(Failure::forbidden());
    }
    let stamp = now();
    let organization = Organization {
        id: store.next_id(),
        name: input.name,
        tier: input.tier,
        subscription_start: input.subscription_start,
        subscription_end: input.subscription_end,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store
        .organizations
        .insert(organization.id, organization.clone());
    Ok(success(StatusCode::CREATED, organization))
}

pub async fn get_organization(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    store
        .organizations
        .get(&id)
        .filter(|org| user.can_access(org.id))
        .cloned()
        .map(|org| success(StatusCode::OK, org))
        .ok_or_else(|| Failure::not_found("Organization"))
}

pub async fn update_organization(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateOrganization>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    let org = store
        .organizations
        .get_mut(&id)
        .filter(|org| user.can_access(org.id))
        .ok_or_else(|| Failure::not_found("Organization"))?;
    if let Some(name) = input.name {
        org.name = name;
    }
    if let Some(tier) = input.tier {
        org.tier = tier;
    }
    if let Some(start) = input.subscription_start {
        org.subscription_start = start;
    }
    if let Some(end) = input.subscription_end {
        org.subscription_end = end;
    }
    org.updated_at = now();
    Ok(success(StatusCode::OK, org.clone()))
}

pub async fn delete_organization(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    if !user.is_platform_admin() {
        return Err(Failure::forbidden());
    }
    store
        .organizations
        .remove(&id)
        .map(|_| message("Organization deleted"))
        .ok_or_else(|| Failure::not_found("Organization"))
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

pub async fn list_branches(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    let visible = store
        .branches
        .values()
        .filter(|branch| user.can_access(branch.organization_id));
    Ok(success(StatusCode::OK, query.page(visible)))
}

pub async fn create_branch(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateBranch>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    let organization_id = home_organization(&user)?;
    let stamp = now();
    let branch = Branch {
        id: store.next_id(),
        name: input.name,
        location: input.location,
        phone: input.phone,
        email: input.email,
        manager_id: input.manager_id,
        organization_id,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store.branches.insert(branch.id, branch.clone());
    Ok(success(StatusCode::CREATED, branch))
}

pub async fn get_branch(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    store
        .branches
        .get(&id)
        .filter(|branch| user.can_access(branch.organization_id))
        .cloned()
        .map(|branch| success(StatusCode::OK, branch))
        .ok_or_else(|| Failure::not_found("Branch"))
}

pub async fn update_branch(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateBranch>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    let branch = store
        .branches
        .get_mut(&id)
        .filter(|branch| user.can_access(branch.organization_id))
        .ok_or_else(|| Failure::not_found("Branch"))?;
    if let Some(name) = input.name {
        branch.name = name;
    }
    if let Some(location) = input.location {
        branch.location = location;
    }
    if let Some(phone) = input.phone {
        branch.phone = phone;
    }
    if let Some(email) = input.email {
        branch.email = email;
    }
    if input.manager_id.is_some() {
        branch.manager_id = input.manager_id;
    }
    branch.updated_at = now();
    Ok(success(StatusCode::OK, branch.clone()))
}

pub async fn delete_branch(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    let owned = store
        .branches
        .get(&id)
        .is_some_and(|branch| user.can_access(branch.organization_id));
    if !owned {
        return Err(Failure::not_found("Branch"));
    }
    store.branches.remove(&id);
    Ok(message("Branch deleted"))
}

pub async fn branch_employees(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    let branch = store
        .branches
        .get(&id)
        .filter(|branch| user.can_access(branch.organization_id))
        .ok_or_else(|| Failure::not_found("Branch"))?;
    let employees: Vec<Employee> = store
        .employees
        .values()
        .filter(|employee| employee.branch_id == Some(branch.id))
        .cloned()
        .collect();
    Ok(success(StatusCode::OK, employees))
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

pub async fn list_employees(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    let visible = store.employees.values().filter(|employee| {
        user.can_access(employee.organization_id)
            && query
                .branch_id
                .map_or(true, |branch_id| employee.branch_id == Some(branch_id))
    });
    Ok(success(StatusCode::OK, query.page(visible)))
}

pub async fn create_employee(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateEmployee>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    let organization_id = home_organization(&user)?;
    if let Some(branch_id) = input.branch_id {
        let in_org = store
            .branches
            .get(&branch_id)
            .is_some_and(|branch| branch.organization_id == organization_id);
        if !in_org {
            return Err(Failure::bad_request("Unknown branch"));
        }
    }
    let stamp = now();
    let employee = Employee {
        id: store.next_id(),
        first_name: input.first_name,
        last_name: input.last_name,
        email: input.email,
        phone: input.phone,
        job_title: input.job_title,
        basic_salary: input.basic_salary,
        hire_date: input.hire_date,
        status: "active".to_string(),
        branch_id: input.branch_id,
        organization_id,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store.employees.insert(employee.id, employee.clone());
    Ok(success(StatusCode::CREATED, employee))
}

pub async fn get_employee(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    store
        .employees
        .get(&id)
        .filter(|employee| user.can_access(employee.organization_id))
        .cloned()
        .map(|employee| success(StatusCode::OK, employee))
        .ok_or_else(|| Failure::not_found("Employee"))
}

pub async fn update_employee(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateEmployee>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    let employee = store
        .employees
        .get_mut(&id)
        .filter(|employee| user.can_access(employee.organization_id))
        .ok_or_else(|| Failure::not_found("Employee"))?;
    if let Some(first_name) = input.first_name {
        employee.first_name = first_name;
    }
    if let Some(last_name) = input.last_name {
        employee.last_name = last_name;
    }
    if let Some(email) = input.email {
        employee.email = email;
    }
    if let Some(phone) = input.phone {
        employee.phone = phone;
    }
    if let Some(job_title) = input.job_title {
        employee.job_title = job_title;
    }
    if let Some(salary) = input.basic_salary {
        employee.basic_salary = salary;
    }
    if let Some(hire_date) = input.hire_date {
        employee.hire_date = hire_date;
    }
    if input.branch_id.is_some() {
        employee.branch_id = input.branch_id;
    }
    employee.updated_at = now();
    Ok(success(StatusCode::OK, employee.clone()))
}

pub async fn delete_employee(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    let owned = store
        .employees
        .get(&id)
        .is_some_and(|employee| user.can_access(employee.organization_id));
    if !owned {
        return Err(Failure::not_found("Employee"));
    }
    store.employees.remove(&id);
    Ok(message("Employee deleted"))
}
