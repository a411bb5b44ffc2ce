//! Argument binder: loosely-typed argument maps to typed filters.
//!
//! Binding happens after validation, so argument names and scalar kinds are
//! already known to be right. What is left here:
//!
//! - renaming arguments to filter fields (`id` to `departmentID`, ...)
//! - injecting values derived from the caller identity, overwriting anything
//!   the raw map carries under the same key
//! - paging defaults
//! - parsing the `orderBy` scalar into ordered `(field, direction)` keys
//! - coercing the remaining predicates into the filter struct

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::context::Identity;
use super::error::QueryError;
use super::filters::{Direction, DepartmentFilter, OrderBy, Page, UserFilter};
use super::schema::{Derived, OperationKind, OperationSpec};

/// Page size used when the request gives none
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound for page sizes, and the size used for "everything" requests
/// (`size: 0`)
pub const DEFAULT_MAX_SIZE: u32 = 999;

/// Raw argument values keyed by argument name
pub type RawArguments = Map<String, Value>;

/// A user search ready for the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSearch {
    pub filter: UserFilter,
    pub page: Page,
}

/// A department search ready for the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentSearch {
    pub filter: DepartmentFilter,
    pub page: Page,
}

/// A fully bound root operation. One variant per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundQuery {
    User(UserSearch),
    DepartmentMember(UserSearch),
    Subordinate(UserSearch),
    RoleMember(UserSearch),
    Leader,
    Department(DepartmentSearch),
}

/// Paging defaults applied to every collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingPolicy {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PagingPolicy {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl PagingPolicy {
    /// Normalize raw paging values so that `page >= 1` and
    /// `1 <= size <= max_size`.
    pub fn page(&self, page: Option<i64>, size: Option<i64>) -> Page {
        let max_size = self.max_size.max(1);
        let page = match page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 1,
        };
        let size = match size {
            None => self.default_size,
            Some(s) if s <= 0 => max_size,
            Some(s) => u32::try_from(s).unwrap_or(max_size),
        };
        Page::new(page, size.clamp(1, max_size))
    }
}

/// Binds validated arguments for one operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Binder {
    paging: PagingPolicy,
}

impl Binder {
    pub fn new(paging: PagingPolicy) -> Self {
        Self { paging }
    }

    pub fn bind(
        &self,
        op: &OperationSpec,
        args: RawArguments,
        identity: &Identity,
    ) -> Result<BoundQuery, QueryError> {
        if op.kind == OperationKind::Leader {
            return Ok(BoundQuery::Leader);
        }

        let mut fields = Map::new();
        let mut page = None;
        let mut size = None;
        let mut order_by = Vec::new();

        for (name, value) in args {
            let target = op.arg(&name).map_or(name.as_str(), |a| a.binds_to);
            match target {
                "page" => page = int_argument("page", &value)?,
                "size" => size = int_argument("size", &value)?,
                "orderBy" => order_by = order_list(&value)?,
                _ => {
                    fields.insert(target.to_string(), value);
                }
            }
        }

        match op.derived {
            Some(Derived::LeaderFromCaller) => {
                let user_id = identity
                    .user_id
                    .clone()
                    .ok_or(QueryError::MissingArgument("userID"))?;
                fields.insert("leaderID".to_string(), Value::String(user_id));
            }
            Some(Derived::TenantFromCaller) => match &identity.tenant_id {
                Some(tenant) => {
                    fields.insert("tenantID".to_string(), Value::String(tenant.clone()));
                }
                None => {
                    fields.remove("tenantID");
                }
            },
            None => {}
        }

        let page = self.paging.page(page, size);
        let query = match op.kind {
            OperationKind::Department => {
                let mut filter: DepartmentFilter = coerce(fields)?;
                filter.order_by = order_by;
                BoundQuery::Department(DepartmentSearch { filter, page })
            }
            kind => {
                let mut filter: UserFilter = coerce(fields)?;
                filter.order_by = order_by;
                let search = UserSearch { filter, page };
                match kind {
                    OperationKind::DepartmentMember => BoundQuery::DepartmentMember(search),
                    OperationKind::Subordinate => BoundQuery::Subordinate(search),
                    OperationKind::RoleMember => BoundQuery::RoleMember(search),
                    _ => BoundQuery::User(search),
                }
            }
        };

        Ok(query)
    }
}

fn coerce<T: DeserializeOwned>(fields: Map<String, Value>) -> Result<T, QueryError> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| QueryError::Binding(e.to_string()))
}

fn int_argument(name: &str, value: &Value) -> Result<Option<i64>, QueryError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| QueryError::Binding(format!("`{name}` expects an integer, got {n}"))),
        other => Err(QueryError::Binding(format!(
            "`{name}` expects an integer, got {other}"
        ))),
    }
}

/// Parse the `orderBy` scalar. Accepted elements are tokens (`"-createdAt"`)
/// and single-key objects (`{createdAt: DESC}`); anything but `ASC` in the
/// object form sorts descending.
pub fn order_list(value: &Value) -> Result<Vec<OrderBy>, QueryError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(QueryError::Binding(format!(
                "`orderBy` expects a list, got {other}"
            )));
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(token) => OrderBy::parse_token(token).ok_or_else(|| {
                QueryError::Binding(format!("`orderBy[{i}]` names no field"))
            }),
            Value::Object(entry) if entry.len() == 1 => {
                let Some((field, direction)) = entry.iter().next() else {
                    return Err(QueryError::Binding(format!("`orderBy[{i}]` is empty")));
                };
                if field.trim().is_empty() {
                    return Err(QueryError::Binding(format!("`orderBy[{i}]` names no field")));
                }
                let direction = match direction.as_str() {
                    Some(d) if d.eq_ignore_ascii_case("ASC") => Direction::Asc,
                    _ => Direction::Desc,
                };
                Ok(OrderBy {
                    field: field.clone(),
                    direction,
                })
            }
            other => Err(QueryError::Binding(format!(
                "`orderBy[{i}]` must be a field token or a single-key object, got {other}"
            ))),
        })
        .collect()
}
