//! Query executor: parse, validate, bind, resolve and shape one request.
//!
//! ```text
//! Received -> Parsed -> Validated -> Bound -> Resolved -> Formatted
//! ```
//!
//! Any stage may fail; the request then ends with every error collected so
//! far and no partial data. Parsing and validation run against the schema
//! registry only, so a request that fails them never reaches the repository.

use std::collections::HashMap;

use async_graphql::parser::parse_query;
use async_graphql::parser::types::{
    BaseType, DocumentOperations, ExecutableDocument, Field, OperationDefinition, OperationType,
    Selection, SelectionSet, Type,
};
use async_graphql::{Name, Pos, Positioned, Value as ConstValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::binder::{Binder, RawArguments};
use super::context::ExecutionContext;
use super::error::{Location, QueryError, QueryErrors};
use super::resolvers::Resolvers;
use super::schema::{self, ArgKind, FieldKind, OperationKind, OperationSpec, Shape};
use crate::repository::RepositoryError;

/// Request payload as sent by clients
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// Success envelope: `{code: 0, data: {<response key>: <result>}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub code: u16,
    pub data: Map<String, Value>,
}

/// A validated request, ready to bind
#[derive(Debug)]
pub struct Plan {
    /// Root field alias, or its name
    pub response_key: String,
    pub operation: &'static OperationSpec,
    pub arguments: RawArguments,
    selection: Vec<SelectedField>,
}

#[derive(Debug)]
struct SelectedField {
    key: String,
    name: String,
    kind: Selected,
}

#[derive(Debug)]
enum Selected {
    Typename,
    Scalar,
    Object {
        shape: &'static Shape,
        fields: Vec<SelectedField>,
    },
}

pub struct Executor {
    resolvers: Resolvers,
    binder: Binder,
}

impl Executor {
    pub fn new(resolvers: Resolvers, binder: Binder) -> Self {
        Self { resolvers, binder }
    }

    /// Execute one request. `scope` restricts the request to a single root
    /// operation (used by the per-operation routes).
    pub async fn execute(
        &self,
        request: &QueryRequest,
        ctx: &ExecutionContext,
        scope: Option<OperationKind>,
    ) -> Result<QueryResponse, QueryErrors> {
        let result = self.run(request, ctx, scope).await;
        if let Err(errors) = &result {
            for error in errors.errors() {
                error.log();
            }
        }
        result
    }

    async fn run(
        &self,
        request: &QueryRequest,
        ctx: &ExecutionContext,
        scope: Option<OperationKind>,
    ) -> Result<QueryResponse, QueryErrors> {
        let Plan {
            response_key,
            operation,
            arguments,
            selection,
        } = plan(request, scope)?;
        debug!(operation = operation.name, arguments = ?arguments, "Query validated");

        let bound = self.binder.bind(operation, arguments, &ctx.identity)?;
        let resolved = self.resolvers.resolve(bound, ctx).await?;

        respond(response_key, &selection, operation.output.shape(), &resolved).map_err(QueryErrors::from)
    }
}

/// Wrap the projected result in the success envelope.
fn respond(
    response_key: String,
    selection: &[SelectedField],
    shape: &Shape,
    resolved: &impl Serialize,
) -> Result<QueryResponse, QueryError> {
    let value = serde_json::to_value(resolved).map_err(|e| {
        QueryError::Backend(RepositoryError::Decode(format!("cannot encode result: {e}")))
    })?;

    let mut data = Map::new();
    data.insert(response_key, project(&value, selection, shape.name));
    Ok(QueryResponse { code: 0, data })
}

// ============================================================================
// Parse + validate
// ============================================================================

/// Parse and validate request text against the schema registry.
pub fn plan(request: &QueryRequest, scope: Option<OperationKind>) -> Result<Plan, QueryErrors> {
    let document = parse_query(&request.query).map_err(|e| QueryError::Parse {
        message: e.to_string(),
        locations: e.positions().map(Location::from).collect(),
    })?;

    let mut errors = Vec::new();

    for fragment in document.fragments.values() {
        errors.push(QueryError::validation("fragments are not supported", Some(fragment.pos)));
    }

    let operation = match select_operation(&document, request.operation_name.as_deref()) {
        Ok(operation) => operation,
        Err(e) => {
            errors.push(e);
            return Err(QueryErrors::new(errors));
        }
    };
    let plan = validate_operation(operation, request.variables.as_ref(), scope, &mut errors);

    match plan {
        Some(plan) if errors.is_empty() => Ok(plan),
        _ => {
            if errors.is_empty() {
                errors.push(QueryError::validation("query selects nothing", Some(operation.pos)));
            }
            Err(QueryErrors::new(errors))
        }
    }
}

fn select_operation<'a>(
    document: &'a ExecutableDocument,
    name: Option<&str>,
) -> Result<&'a Positioned<OperationDefinition>, QueryError> {
    match (&document.operations, name) {
        (DocumentOperations::Single(operation), _) => Ok(operation),
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .iter()
            .find(|(candidate, _)| candidate.as_str() == name)
            .map(|(_, operation)| operation)
            .ok_or_else(|| QueryError::validation(format!("unknown operation named `{name}`"), None)),
        (DocumentOperations::Multiple(operations), None) => {
            let mut iter = operations.values();
            match (iter.next(), iter.next()) {
                (Some(operation), None) => Ok(operation),
                _ => Err(QueryError::validation(
                    "operationName is required when the document holds several operations",
                    None,
                )),
            }
        }
    }
}

fn validate_operation(
    operation: &Positioned<OperationDefinition>,
    provided: Option<&Map<String, Value>>,
    scope: Option<OperationKind>,
    errors: &mut Vec<QueryError>,
) -> Option<Plan> {
    let definition = &operation.node;

    if definition.ty != OperationType::Query {
        errors.push(QueryError::validation(
            format!("{} operations are not supported", definition.ty),
            Some(operation.pos),
        ));
    }
    if let Some(directive) = definition.directives.first() {
        errors.push(QueryError::validation("directives are not supported", Some(directive.pos)));
    }

    let variables = variables(definition, provided, errors);

    let mut roots = Vec::new();
    for item in &definition.selection_set.node.items {
        match &item.node {
            Selection::Field(field) => roots.push(field),
            Selection::FragmentSpread(_) | Selection::InlineFragment(_) => {
                errors.push(QueryError::validation("fragments are not supported", Some(item.pos)));
            }
        }
    }
    if let Some(extra) = roots.get(1) {
        errors.push(QueryError::validation(
            "only one root field may be selected per request",
            Some(extra.pos),
        ));
    }

    let root = roots.first()?;
    let name = root.node.name.node.as_str();
    let Some(spec) = schema::lookup(name) else {
        errors.push(QueryError::validation(
            format!("unknown field `{name}` on type `Query`"),
            Some(root.pos),
        ));
        return None;
    };

    if let Some(kind) = scope.filter(|kind| *kind != spec.kind) {
        errors.push(QueryError::validation(
            format!("`{name}` cannot be queried here, this endpoint serves `{}`", kind.name()),
            Some(root.pos),
        ));
    }
    if let Some(directive) = root.node.directives.first() {
        errors.push(QueryError::validation("directives are not supported", Some(directive.pos)));
    }

    let arguments = arguments(spec, &root.node, &variables, errors);

    let shape = spec.output.shape();
    if root.node.selection_set.node.items.is_empty() {
        errors.push(QueryError::validation(
            format!("field `{name}` of type `{}` must have a selection of subfields", shape.name),
            Some(root.pos),
        ));
    }
    let selection = select(shape, &root.node.selection_set, errors);

    Some(Plan {
        response_key: root
            .node
            .alias
            .as_ref()
            .map_or(name, |alias| alias.node.as_str())
            .to_string(),
        operation: spec,
        arguments,
        selection,
    })
}

/// Resolve declared variables from the request, then defaults, then null.
fn variables(
    definition: &OperationDefinition,
    provided: Option<&Map<String, Value>>,
    errors: &mut Vec<QueryError>,
) -> HashMap<Name, ConstValue> {
    let mut values = HashMap::new();

    for variable in &definition.variable_definitions {
        let name = &variable.node.name.node;
        let ty = &variable.node.var_type.node;

        let value = match provided.and_then(|vars| vars.get(name.as_str())) {
            Some(json) => ConstValue::from_json(json.clone()).unwrap_or_else(|e| {
                errors.push(QueryError::validation(
                    format!("variable `${name}` is invalid: {e}"),
                    Some(variable.pos),
                ));
                ConstValue::Null
            }),
            None => variable
                .node
                .default_value
                .as_ref()
                .map_or(ConstValue::Null, |default| default.node.clone()),
        };

        if value == ConstValue::Null && !ty.nullable {
            errors.push(QueryError::validation(
                format!("variable `${name}` of required type `{ty}` was not provided"),
                Some(variable.pos),
            ));
        } else if !type_accepts(ty, &value) {
            errors.push(QueryError::validation(
                format!("variable `${name}` expects type `{ty}`, found {value}"),
                Some(variable.pos),
            ));
        }

        values.insert(name.clone(), value);
    }

    values
}

fn type_accepts(ty: &Type, value: &ConstValue) -> bool {
    match (&ty.base, value) {
        (_, ConstValue::Null) => ty.nullable,
        (BaseType::List(inner), ConstValue::List(items)) => items.iter().all(|item| type_accepts(inner, item)),
        (BaseType::List(inner), single) => type_accepts(inner, single),
        (BaseType::Named(name), value) => match name.as_str() {
            "String" | "ID" => matches!(value, ConstValue::String(_)),
            "Int" => matches!(value, ConstValue::Number(n) if n.is_i64()),
            "Float" => matches!(value, ConstValue::Number(_)),
            "Boolean" => matches!(value, ConstValue::Boolean(_)),
            // custom scalars check their own structure later
            _ => true,
        },
    }
}

fn arguments(
    spec: &OperationSpec,
    field: &Field,
    variables: &HashMap<Name, ConstValue>,
    errors: &mut Vec<QueryError>,
) -> RawArguments {
    let mut arguments = RawArguments::new();

    for (name, value) in &field.arguments {
        let Some(arg) = spec.arg(name.node.as_str()) else {
            errors.push(QueryError::validation(
                format!("unknown argument `{}` on field `{}`", name.node, spec.name),
                Some(name.pos),
            ));
            continue;
        };
        if arguments.contains_key(arg.name) {
            errors.push(QueryError::validation(
                format!("argument `{}` is given more than once", arg.name),
                Some(name.pos),
            ));
            continue;
        }

        let resolved = match value
            .node
            .clone()
            .into_const_with(|var| variables.get(&var).cloned().ok_or(var))
        {
            Ok(resolved) => resolved,
            Err(var) => {
                errors.push(QueryError::validation(
                    format!("variable `${var}` is not defined"),
                    Some(value.pos),
                ));
                continue;
            }
        };

        if !kind_accepts(arg.kind, &resolved) {
            errors.push(QueryError::validation(
                format!(
                    "argument `{}` on field `{}` expects {}, found {resolved}",
                    arg.name,
                    spec.name,
                    arg.kind.type_name()
                ),
                Some(value.pos),
            ));
            continue;
        }

        match resolved.into_json() {
            Ok(json) => {
                arguments.insert(arg.name.to_string(), json);
            }
            Err(e) => errors.push(QueryError::validation(
                format!("argument `{}` cannot be represented: {e}", arg.name),
                Some(value.pos),
            )),
        }
    }

    arguments
}

fn kind_accepts(kind: ArgKind, value: &ConstValue) -> bool {
    match (kind, value) {
        (_, ConstValue::Null) => true,
        (ArgKind::String, ConstValue::String(_)) => true,
        (ArgKind::Int, ConstValue::Number(n)) => n.is_i64(),
        (ArgKind::OrderList, _) => true,
        _ => false,
    }
}

fn select(
    shape: &'static Shape,
    set: &Positioned<SelectionSet>,
    errors: &mut Vec<QueryError>,
) -> Vec<SelectedField> {
    let mut selected: Vec<SelectedField> = Vec::new();

    for item in &set.node.items {
        let Selection::Field(field) = &item.node else {
            errors.push(QueryError::validation("fragments are not supported", Some(item.pos)));
            continue;
        };
        let name = field.node.name.node.as_str();
        let key = field
            .node
            .alias
            .as_ref()
            .map_or(name, |alias| alias.node.as_str());

        if let Some(directive) = field.node.directives.first() {
            errors.push(QueryError::validation("directives are not supported", Some(directive.pos)));
        }
        if let Some((arg, _)) = field.node.arguments.first() {
            errors.push(QueryError::validation(
                format!("field `{name}` on type `{}` takes no arguments", shape.name),
                Some(arg.pos),
            ));
        }

        let has_selection = !field.node.selection_set.node.items.is_empty();
        let kind = if name == "__typename" {
            Selected::Typename
        } else {
            match shape.field(name).map(|spec| spec.kind) {
                None => {
                    errors.push(QueryError::validation(
                        format!("unknown field `{name}` on type `{}`", shape.name),
                        Some(field.pos),
                    ));
                    continue;
                }
                Some(FieldKind::Scalar) => {
                    if has_selection {
                        errors.push(QueryError::validation(
                            format!("field `{name}` is a scalar and takes no selection"),
                            Some(field.pos),
                        ));
                    }
                    Selected::Scalar
                }
                Some(FieldKind::Object(inner)) => {
                    if !has_selection {
                        errors.push(QueryError::validation(
                            format!(
                                "field `{name}` of type `{}` must have a selection of subfields",
                                inner.name
                            ),
                            Some(field.pos),
                        ));
                    }
                    Selected::Object {
                        shape: inner,
                        fields: select(inner, &field.node.selection_set, errors),
                    }
                }
            }
        };

        merge(
            &mut selected,
            SelectedField {
                key: key.to_string(),
                name: name.to_string(),
                kind,
            },
            field.pos,
            errors,
        );
    }

    selected
}

/// Add a field to a selection. A response key selected again for the same
/// field merges its sub-selection into the first occurrence.
fn merge(
    selected: &mut Vec<SelectedField>,
    incoming: SelectedField,
    pos: Pos,
    errors: &mut Vec<QueryError>,
) {
    let Some(existing) = selected.iter_mut().find(|s| s.key == incoming.key) else {
        selected.push(incoming);
        return;
    };

    if existing.name != incoming.name {
        errors.push(QueryError::validation(
            format!(
                "fields `{}` and `{}` conflict on response key `{}`",
                existing.name, incoming.name, incoming.key
            ),
            Some(pos),
        ));
        return;
    }

    if let (Selected::Object { fields, .. }, Selected::Object { fields: more, .. }) =
        (&mut existing.kind, incoming.kind)
    {
        for field in more {
            merge(fields, field, pos, errors);
        }
    }
}

// ============================================================================
// Format
// ============================================================================

/// Keep only the selected fields, in selection order, under their response
/// keys. Lists (including nested chains) are projected element-wise.
fn project(value: &Value, fields: &[SelectedField], type_name: &str) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project(item, fields, type_name))
                .collect(),
        ),
        Value::Object(object) => {
            let mut out = Map::with_capacity(fields.len());
            for field in fields {
                let value = match &field.kind {
                    Selected::Typename => Value::String(type_name.to_string()),
                    Selected::Scalar => object.get(&field.name).cloned().unwrap_or(Value::Null),
                    Selected::Object { shape, fields } => project(
                        object.get(&field.name).unwrap_or(&Value::Null),
                        fields,
                        shape.name,
                    ),
                };
                out.insert(field.key.clone(), value);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::binder::DEFAULT_MAX_SIZE;
    use crate::query::context::Identity;
    use crate::query::error::ErrorKind;
    use crate::query::filters::{OrderBy, Page};
    use crate::query::resolvers::tests::{RecordingRepository, user};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn setup(users: Vec<crate::query::types::User>) -> (Arc<RecordingRepository>, Executor) {
        let repo = Arc::new(RecordingRepository::with_users(users));
        let executor = Executor::new(Resolvers::new(repo.clone()), Binder::default());
        (repo, executor)
    }

    fn kinds(errors: &QueryErrors) -> Vec<ErrorKind> {
        errors.errors().iter().map(QueryError::kind).collect()
    }

    async fn run(executor: &Executor, query: &str) -> Result<QueryResponse, QueryErrors> {
        executor
            .execute(
                &QueryRequest::new(query),
                &ExecutionContext::new(Identity::user("u1")),
                None,
            )
            .await
    }

    #[tokio::test]
    async fn test_user_search_end_to_end() {
        let (repo, executor) = setup(vec![user("u1", &[]), user("u2", &[])]);

        let response = run(
            &executor,
            r#"{ user(name: "an", page: 0, size: 0) { total users { id name } } }"#,
        )
        .await
        .unwrap();

        assert_eq!(repo.calls(), vec!["search_users"]);
        let (filter, page) = repo.user_filters.lock().unwrap()[0].clone();
        assert_eq!(filter.name.as_deref(), Some("an"));
        assert_eq!(page, Page::new(1, DEFAULT_MAX_SIZE));

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "code": 0,
                "data": {"user": {"total": 2, "users": [
                    {"id": "u1", "name": "name-u1"},
                    {"id": "u2", "name": "name-u2"}
                ]}}
            })
        );
    }

    #[tokio::test]
    async fn test_projection_follows_selection_order_and_aliases() {
        let (_, executor) = setup(vec![user("u1", &["l1"]), user("l1", &[])]);

        let response = run(
            &executor,
            "{ chain: leader { who: name __typename id leaders { id } } }",
        )
        .await
        .unwrap();

        let value = serde_json::to_value(&response.data).unwrap();
        assert_eq!(
            value,
            json!({"chain": [{"who": "name-l1", "__typename": "user", "id": "l1", "leaders": []}]})
        );
        let keys: Vec<&String> = value["chain"][0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["who", "__typename", "id", "leaders"]);
    }

    #[tokio::test]
    async fn test_repeated_field_merges_subselections() {
        let (_, executor) = setup(vec![user("u1", &[])]);

        let response = run(&executor, "{ user { users { id } total users { name id } } }")
            .await
            .unwrap();

        let value = serde_json::to_value(&response.data).unwrap();
        assert_eq!(
            value,
            json!({"user": {"users": [{"id": "u1", "name": "name-u1"}], "total": 1}})
        );
        let keys: Vec<&String> = value["user"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["users", "total"]);
    }

    #[tokio::test]
    async fn test_conflicting_response_keys_are_rejected() {
        let (repo, executor) = setup(Vec::new());

        let errors = run(&executor, "{ user { users { id: name id } } }")
            .await
            .unwrap_err();

        assert_eq!(kinds(&errors), vec![ErrorKind::Validation]);
        assert!(errors.errors()[0].to_string().contains("conflict"));
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_unencodable_result_is_backend_error() {
        let plan = plan(&QueryRequest::new("{ user { total } }"), None).unwrap();
        let unencodable: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);

        let err = respond(
            plan.response_key,
            &plan.selection,
            plan.operation.output.shape(),
            &unencodable,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[tokio::test]
    async fn test_unknown_root_operation_never_resolves() {
        let (repo, executor) = setup(Vec::new());

        let errors = run(&executor, "{ posts { total } }").await.unwrap_err();

        assert_eq!(kinds(&errors), vec![ErrorKind::Validation]);
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mistyped_argument_is_validation_error() {
        let (repo, executor) = setup(Vec::new());

        let errors = run(&executor, r#"{ user(page: "two") { total } }"#).await.unwrap_err();

        assert_eq!(kinds(&errors), vec![ErrorKind::Validation]);
        assert!(errors.errors()[0].to_string().contains("expects Int"));
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_all_validation_errors_are_reported() {
        let (_, executor) = setup(Vec::new());

        let errors = run(
            &executor,
            r#"{ user(nickname: "a", size: "x") { total bogus users } }"#,
        )
        .await
        .unwrap_err();

        assert_eq!(errors.errors().len(), 4);
        assert!(kinds(&errors).iter().all(|k| *k == ErrorKind::Validation));
        assert!(errors.errors().iter().all(|e| !e.locations().is_empty()));
    }

    #[tokio::test]
    async fn test_parse_error_carries_location() {
        let (_, executor) = setup(Vec::new());

        let errors = run(&executor, "{ user(").await.unwrap_err();

        assert_eq!(kinds(&errors), vec![ErrorKind::Parse]);
        assert!(!errors.errors()[0].locations().is_empty());
    }

    #[tokio::test]
    async fn test_only_single_root_queries() {
        let (_, executor) = setup(Vec::new());

        for query in [
            "mutation { user { total } }",
            "{ user { total } leader { id } }",
            "{ user { ...Page } } fragment Page on users { total }",
            "{ user @skip(if: true) { total } }",
            "{ user }",
        ] {
            let errors = run(&executor, query).await.unwrap_err();
            assert!(
                kinds(&errors).contains(&ErrorKind::Validation),
                "{query} should fail validation"
            );
        }
    }

    #[tokio::test]
    async fn test_variables_and_defaults() {
        let (repo, executor) = setup(Vec::new());
        let variables = json!({"name": "ann", "order": ["-createdAt"]});
        let request = QueryRequest::new(
            "query Find($name: String, $size: Int = 5, $order: orderBy) { user(name: $name, size: $size, orderBy: $order) { total } }",
        )
        .with_variables(variables.as_object().unwrap().clone());

        executor
            .execute(&request, &ExecutionContext::default(), None)
            .await
            .unwrap();

        let (filter, page) = repo.user_filters.lock().unwrap()[0].clone();
        assert_eq!(filter.name.as_deref(), Some("ann"));
        assert_eq!(filter.order_by, vec![OrderBy::desc("createdAt")]);
        assert_eq!(page, Page::new(1, 5));
    }

    #[tokio::test]
    async fn test_variable_errors() {
        let (repo, executor) = setup(Vec::new());

        let undefined = run(&executor, "{ user(name: $who) { total } }").await.unwrap_err();
        assert_eq!(kinds(&undefined), vec![ErrorKind::Validation]);

        let missing = run(
            &executor,
            "query($id: String!) { departmentMember(id: $id) { total } }",
        )
        .await
        .unwrap_err();
        assert_eq!(kinds(&missing), vec![ErrorKind::Validation]);

        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_operation_name_selects_operation() {
        let (repo, executor) = setup(Vec::new());
        let text = "query A { user { total } } query B { department { total } }";

        executor
            .execute(
                &QueryRequest::new(text).with_operation_name("B"),
                &ExecutionContext::default(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(repo.calls(), vec!["search_departments"]);

        let errors = executor
            .execute(&QueryRequest::new(text), &ExecutionContext::default(), None)
            .await
            .unwrap_err();
        assert_eq!(kinds(&errors), vec![ErrorKind::Validation]);
    }

    #[tokio::test]
    async fn test_fragment_errors_survive_ambiguous_operation() {
        let (repo, executor) = setup(Vec::new());
        let text = "query A { user { total } } query B { department { total } } fragment F on users { total }";

        let errors = executor
            .execute(&QueryRequest::new(text), &ExecutionContext::default(), None)
            .await
            .unwrap_err();

        assert_eq!(kinds(&errors), vec![ErrorKind::Validation, ErrorKind::Validation]);
        assert!(errors.errors()[0].to_string().contains("fragments"));
        assert!(errors.errors()[1].to_string().contains("operationName"));
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scoped_endpoint_rejects_other_operations() {
        let (repo, executor) = setup(Vec::new());

        let errors = executor
            .execute(
                &QueryRequest::new("{ user { total } }"),
                &ExecutionContext::default(),
                Some(OperationKind::Leader),
            )
            .await
            .unwrap_err();

        assert_eq!(kinds(&errors), vec![ErrorKind::Validation]);
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_department_member_with_empty_id() {
        let (repo, executor) = setup(Vec::new());

        let errors = run(&executor, r#"{ departmentMember(id: "") { total } }"#)
            .await
            .unwrap_err();

        assert_eq!(kinds(&errors), vec![ErrorKind::MissingArgument]);
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_subordinate_uses_caller_identity() {
        let (repo, executor) = setup(Vec::new());

        let errors = run(&executor, r#"{ subordinate(leaderID: "u9") { total } }"#)
            .await
            .unwrap_err();
        assert_eq!(kinds(&errors), vec![ErrorKind::Validation]);

        run(&executor, "{ subordinate { total } }").await.unwrap();
        let (filter, _) = repo.user_filters.lock().unwrap()[0].clone();
        assert_eq!(filter.leader_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_order_object_literals() {
        let (repo, executor) = setup(Vec::new());

        run(
            &executor,
            r#"{ roleMember(id: "r1", orderBy: [{createdAt: DESC}, "name"]) { total } }"#,
        )
        .await
        .unwrap();

        let (filter, _) = repo.user_filters.lock().unwrap()[0].clone();
        assert_eq!(filter.role_id.as_deref(), Some("r1"));
        assert_eq!(
            filter.order_by,
            vec![OrderBy::desc("createdAt"), OrderBy::asc("name")]
        );
    }

    #[tokio::test]
    async fn test_scalar_order_is_binding_error() {
        let (repo, executor) = setup(Vec::new());

        let errors = run(&executor, r#"{ user(orderBy: "name") { total } }"#)
            .await
            .unwrap_err();

        assert_eq!(kinds(&errors), vec![ErrorKind::Binding]);
        assert!(repo.calls().is_empty());
    }
}
