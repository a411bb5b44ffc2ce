//! Typed filter, ordering and paging values handed to the repository.
//!
//! A filter carries optional predicates; `None` always means "no constraint"
//! (the binder turns empty strings into `None`). Ordering keeps the caller's
//! key order and is completed with a fixed tiebreaker by [sort_keys].

use serde::{Deserialize, Deserializer, Serialize};

/// Sort direction for one ordering key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Backend sort order keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// One `(field, direction)` ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse an ordering token: `-field` sorts descending, `field` ascending.
    /// Returns `None` for a token without a field name.
    pub fn parse_token(token: &str) -> Option<Self> {
        let token = token.trim();
        let (field, direction) = match token.strip_prefix('-') {
            Some(rest) => (rest.trim(), Direction::Desc),
            None => (token, Direction::Asc),
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Caller ordering followed by the tiebreaker, unless the caller already
/// sorts on it.
pub fn sort_keys(order_by: &[OrderBy], tiebreaker: &str) -> Vec<OrderBy> {
    let mut keys = order_by.to_vec();
    if !keys.iter().any(|key| key.field == tiebreaker) {
        keys.push(OrderBy::asc(tiebreaker));
    }
    keys
}

/// 1-based page number and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub size: u32,
}

impl Page {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Number of records to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.size)
    }
}

/// Predicates for user searches.
///
/// Built by the binder from operation arguments; the id filters are only ever
/// populated by renamed or identity-derived arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserFilter {
    /// Full-text match on the user name
    #[serde(default, deserialize_with = "non_empty")]
    pub name: Option<String>,
    /// Prefix match on the phone number
    #[serde(default, deserialize_with = "non_empty")]
    pub phone: Option<String>,
    /// Prefix match on the email address
    #[serde(default, deserialize_with = "non_empty")]
    pub email: Option<String>,
    #[serde(default, rename = "departmentName", deserialize_with = "non_empty")]
    pub department_name: Option<String>,
    #[serde(default, rename = "departmentID", deserialize_with = "non_empty")]
    pub department_id: Option<String>,
    #[serde(default, rename = "roleName", deserialize_with = "non_empty")]
    pub role_name: Option<String>,
    #[serde(default, rename = "roleID", deserialize_with = "non_empty")]
    pub role_id: Option<String>,
    #[serde(default, rename = "leaderID", deserialize_with = "non_empty")]
    pub leader_id: Option<String>,
    #[serde(skip)]
    pub order_by: Vec<OrderBy>,
}

impl UserFilter {
    /// Stable final sort key for user pages
    pub const TIEBREAKER: &'static str = "id";
}

/// Predicates for department searches
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DepartmentFilter {
    #[serde(default, deserialize_with = "ids")]
    pub ids: Vec<String>,
    /// Phrase-prefix match on the department name
    #[serde(default, deserialize_with = "non_empty")]
    pub name: Option<String>,
    /// Tenant scope; `None` restricts to departments that have any tenant
    #[serde(default, rename = "tenantID", deserialize_with = "non_empty")]
    pub tenant_id: Option<String>,
    #[serde(skip)]
    pub order_by: Vec<OrderBy>,
}

impl DepartmentFilter {
    pub const TIEBREAKER: &'static str = "id";
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

/// A single id or a list of ids; empty entries are dropped.
fn ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let ids = match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
        None => Vec::new(),
    };
    Ok(ids.into_iter().filter(|id| !id.trim().is_empty()).collect())
}
