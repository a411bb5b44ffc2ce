//! Search endpoints
//!
//! `/search` accepts any root operation; the per-operation routes reject
//! requests that select a different one. Both forms take the request as
//! GET query parameters or a POST JSON body:
//!
//! ```json
//! {"query": "{ user(name: \"ann\") { total users { id name } } }", "operationName": null, "variables": {}}
//! ```
//!
//! Caller identity comes from the `User-Id`, `Department-Id` and `Tenant-Id`
//! headers set by the gateway in front of this service.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::query::{
    ExecutionContext, Identity, OperationKind, QueryError, QueryErrors, QueryRequest,
};

/// GET form of a [QueryRequest]; `variables` is a JSON object string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Option<String>,
}

impl SearchParams {
    fn into_request(self) -> Result<QueryRequest, QueryError> {
        let variables = match self.variables.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                serde_json::from_str::<Map<String, Value>>(raw).map_err(|e| QueryError::Parse {
                    message: format!("variables must be a JSON object: {e}"),
                    locations: Vec::new(),
                })?,
            ),
        };
        Ok(QueryRequest {
            query: self.query,
            operation_name: self.operation_name.filter(|name| !name.is_empty()),
            variables,
        })
    }
}

async fn execute(state: AppState, headers: HeaderMap, request: QueryRequest, scope: Option<OperationKind>) -> Response {
    let ctx = ExecutionContext::new(Identity::from_headers(&headers))
        .with_timeout(state.config.backend_timeout)
        .with_cancellation(state.shutdown.child_token());

    match state.executor.execute(&request, &ctx, scope).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(errors) => reject(errors),
    }
}

fn reject(errors: QueryErrors) -> Response {
    (StatusCode::BAD_REQUEST, Json(errors.to_body())).into_response()
}

/// GET and POST handlers for one route
fn search(scope: Option<OperationKind>) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>, headers: HeaderMap, Query(params): Query<SearchParams>| async move {
            match params.into_request() {
                Ok(request) => execute(state, headers, request, scope).await,
                Err(e) => {
                    e.log();
                    reject(e.into())
                }
            }
        },
    )
    .post(
        move |State(state): State<AppState>, headers: HeaderMap, body: Result<Json<QueryRequest>, JsonRejection>| async move {
            match body {
                Ok(Json(request)) => execute(state, headers, request, scope).await,
                Err(rejection) => {
                    let e = QueryError::Parse {
                        message: rejection.body_text(),
                        locations: Vec::new(),
                    };
                    e.log();
                    reject(e.into())
                }
            }
        },
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", search(None))
        .route("/search/user", search(Some(OperationKind::User)))
        .route("/search/department/member", search(Some(OperationKind::DepartmentMember)))
        .route("/search/subordinate", search(Some(OperationKind::Subordinate)))
        .route("/search/role/member", search(Some(OperationKind::RoleMember)))
        .route("/search/leader", search(Some(OperationKind::Leader)))
        .route("/search/department", search(Some(OperationKind::Department)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_params_into_request() {
        let params = SearchParams {
            query: "{ leader { id } }".to_string(),
            operation_name: Some(String::new()),
            variables: Some(r#"{"size": 5}"#.to_string()),
        };

        let request = params.into_request().unwrap();
        assert_eq!(request.operation_name, None);
        assert_eq!(request.variables.unwrap()["size"], 5);
    }

    #[test]
    fn test_params_with_bad_variables() {
        let params = SearchParams {
            variables: Some("[1, 2]".to_string()),
            ..Default::default()
        };
        assert_matches!(params.into_request(), Err(QueryError::Parse { .. }));
    }
}
