//! Directory records as stored by the search backend and returned to callers.
//!
//! Records are written by the ingestion process and are read-only here. The
//! backend stores snake_case keys for some user attributes while responses use
//! camelCase, so those fields carry separate serialize/deserialize names.

use serde::{Deserialize, Deserializer, Serialize};

/// A directory user with denormalized memberships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    /// Creation time in milliseconds since the epoch
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, rename(deserialize = "job_number"), alias = "jobNumber")]
    pub job_number: String,
    #[serde(default)]
    pub avatar: String,
    /// 1 normal, 2 active, -1 deleted, -2 disabled
    #[serde(default, rename(deserialize = "use_status"), alias = "useStatus")]
    pub use_status: i32,
    #[serde(default, rename(deserialize = "tenant_id", serialize = "tenantID"), alias = "tenantID")]
    pub tenant_id: String,
    /// 1 man, 2 woman
    #[serde(default)]
    pub gender: i32,
    #[serde(default)]
    pub source: String,
    #[serde(default, rename(deserialize = "self_email"), alias = "selfEmail")]
    pub self_email: String,
    /// Department chains, each ordered from the user's own department up to
    /// the top-level ancestor.
    #[serde(default, deserialize_with = "chains")]
    pub departments: Vec<Vec<DepartmentRef>>,
    /// Leader chains, each ordered from the nearest leader to the top.
    #[serde(default, deserialize_with = "chains")]
    pub leaders: Vec<Vec<Leader>>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub roles: Vec<Role>,
}

impl User {
    /// Leader ids in chain order (nearest first), without duplicates.
    pub fn leader_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for leader in self.leaders.iter().flatten() {
            if leader.id.is_empty() || ids.contains(&leader.id) {
                continue;
            }
            ids.push(leader.id.clone());
        }
        ids
    }
}

/// Department membership entry embedded on a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pid: String,
}

/// Management-chain entry embedded on a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A department document from the department index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Parent department id; empty for top-level departments
    #[serde(default)]
    pub pid: String,
    #[serde(default)]
    pub attr: String,
    #[serde(default, rename = "tenantID")]
    pub tenant_id: String,
}

/// One page of matching users.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPage {
    pub total: i64,
    pub users: Vec<User>,
}

/// One page of matching departments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepartmentPage {
    pub total: i64,
    pub departments: Vec<Department>,
}

/// Raw hits returned by a backend search.
#[derive(Debug, Clone, PartialEq)]
pub struct Hits<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Hits<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }
}

/// Accepts either a list of chains or a single flat chain.
fn chains<'de, D, T>(deserializer: D) -> Result<Vec<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Form<T> {
        Chains(Vec<Vec<T>>),
        Flat(Vec<T>),
    }

    Ok(match Option::<Form<T>>::deserialize(deserializer)? {
        Some(Form::Chains(chains)) => chains,
        Some(Form::Flat(flat)) if flat.is_empty() => Vec::new(),
        Some(Form::Flat(flat)) => vec![flat],
        None => Vec::new(),
    })
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
