use axum::extract::State;
use serde::Serialize;
use serde_json::{json, Value};
use shared::{ExampleItem, ExampleItemChanges, NewExampleItem, PageRequest, Pagination};

use crate::error::ApiResult;
use crate::handlers::internal_error;
use crate::request::RequestContext;
use crate::response::{bad_request, handle_error, not_found, success, validation_failed, Success};
use crate::state::AppState;
use crate::validation::{validate, RuleSet, ValidationRule};

/// `error.code` of a failed example payload.
const EXAMPLE_VALIDATION_CODE: i64 = 40001;

#[derive(Debug, Serialize)]
pub struct ExampleListResponse {
    pub data: Vec<ExampleItem>,
    pub pagination: Pagination,
}

fn item_rules(name_required: bool) -> RuleSet {
    let name = if name_required {
        ValidationRule::required()
    } else {
        ValidationRule::optional()
    };
    RuleSet::new()
        .field("name", name.string().min_length(3).max_length(50))
        .field("description", ValidationRule::optional().string().max_length(200))
}

fn item_id(ctx: &RequestContext) -> ApiResult<i64> {
    ctx.param_id("id")
        .filter(|id| *id != 0)
        .ok_or_else(|| bad_request("ID is required", None, None))
}

/// List items
pub async fn list_items(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<ExampleListResponse>> {
    let page = PageRequest::new(ctx.query_value("page"), ctx.query_value("limit"));

    let (data, total) = state
        .examples
        .list_items(page)
        .await
        .map_err(handle_error)?;

    Ok(success(
        "Data retrieved successfully",
        ExampleListResponse {
            data,
            pagination: Pagination::new(page, total),
        },
    ))
}

pub async fn get_item(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<ExampleItem>> {
    let id = item_id(&ctx)?;

    let item = state
        .examples
        .find_item(id)
        .await
        .map_err(handle_error)?
        .ok_or_else(|| not_found("Data not found"))?;

    Ok(success("Data retrieved successfully", item))
}

pub async fn create_item(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<ExampleItem>> {
    let result = validate(ctx.body(), &item_rules(true));
    if !result.is_valid() {
        return Err(validation_failed(result, EXAMPLE_VALIDATION_CODE));
    }

    let name = ctx.present_text("name")
        .ok_or_else(|| internal_error("create item", "name missing after validation"))?;

    let item = state
        .examples
        .create_item(NewExampleItem {
            name,
            description: ctx.present_text("description"),
        })
        .await
        .map_err(handle_error)?;

    tracing::info!(item_id = item.id, "example item created");
    Ok(success("Data created successfully", item))
}

pub async fn update_item(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<ExampleItem>> {
    let id = item_id(&ctx)?;

    let result = validate(ctx.body(), &item_rules(false));
    if !result.is_valid() {
        return Err(validation_failed(result, EXAMPLE_VALIDATION_CODE));
    }

    let changes = ExampleItemChanges {
        name: ctx.present_text("name"),
        description: ctx.present_text("description"),
    };

    let item = state
        .examples
        .update_item(id, changes)
        .await
        .map_err(handle_error)?
        .ok_or_else(|| not_found("Data not found"))?;

    Ok(success("Data updated successfully", item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Success<Value>> {
    let id = item_id(&ctx)?;

    let deleted = state
        .examples
        .delete_item(id)
        .await
        .map_err(handle_error)?;
    if !deleted {
        return Err(not_found("Data not found"));
    }

    tracing::info!(item_id = id, "example item deleted");
    Ok(success("Data deleted successfully", json!({ "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_create_rules_require_name() {
        let result = validate(&json!({"description": "x"}), &item_rules(true));
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].field, "name");
        assert_eq!(result.errors()[0].message, "name is required");
    }

    #[test]
    fn test_update_rules_accept_empty_body() {
        assert!(validate(&json!({}), &item_rules(false)).is_valid());
        assert!(validate(&Value::Null, &item_rules(false)).is_valid());
    }

    #[test]
    fn test_description_length_is_bounded() {
        let long = "d".repeat(201);
        let result = validate(&json!({"name": "Widget", "description": long}), &item_rules(true));
        assert_eq!(result.errors().len(), 1);
        assert_eq!(
            result.errors()[0].message,
            "description must be between 1 and 200 characters"
        );
    }

    #[test]
    fn test_item_id_rejects_zero_and_garbage() {
        let ctx = |raw: &str| {
            RequestContext::new(
                HashMap::from([("id".to_string(), raw.to_string())]),
                HashMap::new(),
                Value::Null,
            )
        };
        assert_eq!(item_id(&ctx("12")).unwrap(), 12);
        assert!(item_id(&ctx("0")).is_err());
        assert!(item_id(&ctx("abc")).is_err());
    }
}
