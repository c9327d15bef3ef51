use axum::{extract::{rejection::JsonRejection, State}, Json};
use models::Customer;
use serde::{Deserialize, Serialize};
use service::IdReassignment;
use tracing::info;

use crate::errors::JsonApiError;
use super::AppState;

/// Incoming candidate. Absent or null fields fall through to validation
/// instead of failing deserialization, so a missing name is reported as such.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: i32,
    pub id: i64,
}

impl From<CustomerInput> for Customer {
    fn from(input: CustomerInput) -> Self {
        Customer::new(
            input.first_name.unwrap_or_default(),
            input.last_name.unwrap_or_default(),
            input.age,
            input.id,
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddCustomersOutput {
    pub message: String,
    pub added: usize,
    pub reassigned: Vec<IdReassignment>,
}

/// 列出所有客户（按 lastName, firstName 排序）
pub async fn list_customers(State(state): State<AppState>) -> Json<Vec<Customer>> {
    Json(state.customers.list().await)
}

/// 返回当前最大 id；空库返回 1
pub async fn get_last_id(State(state): State<AppState>) -> Json<i64> {
    Json(state.customers.last_id().await)
}

/// 批量新增客户，全部成功或全部拒绝
pub async fn add_customers(
    State(state): State<AppState>,
    payload: Result<Json<Vec<CustomerInput>>, JsonRejection>,
) -> Result<Json<AddCustomersOutput>, JsonApiError> {
    let Json(inputs) = payload?;
    let candidates: Vec<Customer> = inputs.into_iter().map(Customer::from).collect();
    let outcome = state.customers.add_batch(candidates).await?;
    info!(added = outcome.added, reassigned = outcome.reassigned.len(), "customers added");
    Ok(Json(AddCustomersOutput {
        message: "Customers added successfully.".to_string(),
        added: outcome.added,
        reassigned: outcome.reassigned,
    }))
}
