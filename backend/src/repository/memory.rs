//! Fixture-backed repository.
//!
//! Loads users and departments from a JSON file shaped like
//! `{"users": [...], "departments": [...]}` (documents in backend form) and
//! evaluates filters in process. Full-text predicates are approximated by
//! case-insensitive substring matching, prefix predicates by case-insensitive
//! prefix matching.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{Repository, RepositoryError};
use crate::query::filters::{sort_keys, DepartmentFilter, Direction, OrderBy, Page, UserFilter};
use crate::query::types::{Department, Hits, User};

#[derive(Debug, Default, Deserialize)]
struct Fixtures {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    departments: Vec<Department>,
}

/// In-process repository over a fixed record set. Batch lookups return
/// records in storage order, like a search backend would.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    users: Vec<User>,
    departments: Vec<Department>,
}

impl MemoryRepository {
    pub fn new(users: Vec<User>, departments: Vec<Department>) -> Self {
        Self { users, departments }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let fixtures: Fixtures = serde_json::from_str(json).context("Invalid fixture document")?;
        Ok(Self::new(fixtures.users, fixtures.departments))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures from {}", path.display()))?;
        let repo = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            users = repo.users.len(),
            departments = repo.departments.len(),
            "Loaded directory fixtures"
        );
        Ok(repo)
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn starts_with(haystack: &str, prefix: &str) -> bool {
    haystack.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// `true` when the predicate is unset or the check passes
fn check(predicate: &Option<String>, test: impl FnOnce(&str) -> bool) -> bool {
    predicate.as_deref().is_none_or(test)
}

fn user_matches(user: &User, filter: &UserFilter) -> bool {
    let departments = || user.departments.iter().flatten();
    check(&filter.name, |q| contains(&user.name, q))
        && check(&filter.phone, |q| starts_with(&user.phone, q))
        && check(&filter.email, |q| starts_with(&user.email, q))
        && check(&filter.department_name, |q| {
            departments().any(|d| contains(&d.name, q))
        })
        && check(&filter.department_id, |id| departments().any(|d| d.id == id))
        && check(&filter.role_name, |q| user.roles.iter().any(|r| contains(&r.name, q)))
        && check(&filter.role_id, |id| user.roles.iter().any(|r| r.id == id))
        && check(&filter.leader_id, |id| {
            user.leaders.iter().flatten().any(|l| l.id == id)
        })
}

fn department_matches(department: &Department, filter: &DepartmentFilter) -> bool {
    (filter.ids.is_empty() || filter.ids.contains(&department.id))
        && check(&filter.name, |q| starts_with(&department.name, q))
        && match &filter.tenant_id {
            Some(tenant) => &department.tenant_id == tenant,
            None => !department.tenant_id.is_empty(),
        }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Sort by the given keys (response field names), then slice out the page.
fn sort_and_page<T: Serialize + Clone>(items: Vec<&T>, keys: &[OrderBy], page: Page) -> Hits<T> {
    let total = items.len() as i64;
    let mut rows: Vec<(Value, &T)> = items
        .into_iter()
        .map(|item| (serde_json::to_value(item).unwrap_or(Value::Null), item))
        .collect();

    rows.sort_by(|(a, _), (b, _)| {
        keys.iter()
            .map(|key| {
                let ordering = compare_values(
                    a.get(&key.field).unwrap_or(&Value::Null),
                    b.get(&key.field).unwrap_or(&Value::Null),
                );
                match key.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = rows
        .into_iter()
        .skip(offset)
        .take(page.size as usize)
        .map(|(_, item)| item.clone())
        .collect();
    Hits::new(items, total)
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn search_users(&self, filter: &UserFilter, page: Page) -> Result<Hits<User>, RepositoryError> {
        let matches = self
            .users
            .iter()
            .filter(|user| user_matches(user, filter))
            .collect();
        let keys = sort_keys(&filter.order_by, UserFilter::TIEBREAKER);
        Ok(sort_and_page(matches, &keys, page))
    }

    async fn search_departments(
        &self,
        filter: &DepartmentFilter,
        page: Page,
    ) -> Result<Hits<Department>, RepositoryError> {
        let matches = self
            .departments
            .iter()
            .filter(|department| department_matches(department, filter))
            .collect();
        let keys = sort_keys(&filter.order_by, DepartmentFilter::TIEBREAKER);
        Ok(sort_and_page(matches, &keys, page))
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.iter().find(|user| user.id == id).cloned())
    }

    async fn list_users(&self, ids: &[String]) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .users
            .iter()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURES: &str = r#"{
        "users": [
            {"id": "u1", "name": "Ann Lee", "phone": "13800000001", "email": "ann@corp.io", "createdAt": 3,
             "departments": [[{"id": "d2", "name": "Platform"}, {"id": "d1", "name": "R&D"}]],
             "leaders": [[{"id": "u3"}, {"id": "u2"}]],
             "roles": [{"id": "r1", "name": "engineer"}]},
            {"id": "u2", "name": "Bob Stone", "phone": "13900000002", "email": "bob@corp.io", "createdAt": 1,
             "departments": [[{"id": "d1", "name": "R&D"}]], "roles": [{"id": "r2", "name": "director"}]},
            {"id": "u3", "name": "Annie Ma", "phone": "13800000003", "email": "annie@corp.io", "createdAt": 2,
             "departments": [[{"id": "d2", "name": "Platform"}, {"id": "d1", "name": "R&D"}]],
             "leaders": [[{"id": "u2"}]], "roles": [{"id": "r1", "name": "engineer"}]}
        ],
        "departments": [
            {"id": "d1", "name": "R&D", "tenantID": "t1"},
            {"id": "d2", "name": "Platform", "pid": "d1", "tenantID": "t1"},
            {"id": "d9", "name": "Orphan"}
        ]
    }"#;

    fn repo() -> MemoryRepository {
        MemoryRepository::from_json(FIXTURES).unwrap()
    }

    fn ids(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_without_predicates_sorts_by_tiebreaker() {
        let hits = repo()
            .search_users(&UserFilter::default(), Page::new(1, 10))
            .await
            .unwrap();
        assert_eq!(hits.total, 3);
        assert_eq!(ids(&hits.items), vec!["u1", "u2", "u3"]);
    }

    #[tokio::test]
    async fn test_search_name_and_ordering() {
        let filter = UserFilter {
            name: Some("ann".to_string()),
            order_by: vec![OrderBy::desc("createdAt")],
            ..Default::default()
        };
        let hits = repo().search_users(&filter, Page::new(1, 10)).await.unwrap();
        assert_eq!(ids(&hits.items), vec!["u1", "u3"]);
    }

    #[tokio::test]
    async fn test_search_by_memberships() {
        let repo = repo();
        let by_department = UserFilter {
            department_id: Some("d2".to_string()),
            ..Default::default()
        };
        let by_leader = UserFilter {
            leader_id: Some("u2".to_string()),
            ..Default::default()
        };
        let by_role = UserFilter {
            role_id: Some("r2".to_string()),
            ..Default::default()
        };

        let page = Page::new(1, 10);
        assert_eq!(ids(&repo.search_users(&by_department, page).await.unwrap().items), vec!["u1", "u3"]);
        assert_eq!(ids(&repo.search_users(&by_leader, page).await.unwrap().items), vec!["u1", "u3"]);
        assert_eq!(ids(&repo.search_users(&by_role, page).await.unwrap().items), vec!["u2"]);
    }

    #[tokio::test]
    async fn test_paging_reports_full_total() {
        let hits = repo()
            .search_users(&UserFilter::default(), Page::new(2, 2))
            .await
            .unwrap();
        assert_eq!(hits.total, 3);
        assert_eq!(ids(&hits.items), vec!["u3"]);
    }

    #[tokio::test]
    async fn test_department_tenant_scope() {
        let repo = repo();
        let page = Page::new(1, 10);

        let any_tenant = repo
            .search_departments(&DepartmentFilter::default(), page)
            .await
            .unwrap();
        assert_eq!(any_tenant.total, 2);

        let by_prefix = DepartmentFilter {
            name: Some("plat".to_string()),
            tenant_id: Some("t1".to_string()),
            ..Default::default()
        };
        let hits = repo.search_departments(&by_prefix, page).await.unwrap();
        assert_eq!(hits.items.len(), 1);
        assert_eq!(hits.items[0].id, "d2");
    }

    #[tokio::test]
    async fn test_point_and_batch_lookups() {
        let repo = repo();
        assert_eq!(repo.get_user("u2").await.unwrap().map(|u| u.name), Some("Bob Stone".to_string()));
        assert_eq!(repo.get_user("nobody").await.unwrap(), None);

        let users = repo
            .list_users(&["u3".to_string(), "u2".to_string()])
            .await
            .unwrap();
        assert_eq!(ids(&users), vec!["u2", "u3"]);
    }
}
