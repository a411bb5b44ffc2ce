//! Resolver set: one method per root operation over a shared repository.
//!
//! Every collection operation goes through the same paged search; `leader`
//! is the only two-step resolution (own record, then the referenced users).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::binder::{BoundQuery, DepartmentSearch, UserSearch};
use super::context::ExecutionContext;
use super::error::QueryError;
use super::types::{DepartmentPage, User, UserPage};
use crate::repository::Repository;

/// Result of one root operation, serialized as-is before projection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolved {
    Users(UserPage),
    Leaders(Vec<User>),
    Departments(DepartmentPage),
}

#[derive(Clone)]
pub struct Resolvers {
    repo: Arc<dyn Repository>,
}

impl Resolvers {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn resolve(&self, query: BoundQuery, ctx: &ExecutionContext) -> Result<Resolved, QueryError> {
        match query {
            BoundQuery::User(search) | BoundQuery::RoleMember(search) | BoundQuery::Subordinate(search) => {
                self.users(search, ctx).await.map(Resolved::Users)
            }
            BoundQuery::DepartmentMember(search) => {
                if search.filter.department_id.is_none() {
                    return Err(QueryError::MissingArgument("id"));
                }
                self.users(search, ctx).await.map(Resolved::Users)
            }
            BoundQuery::Leader => self.leaders(ctx).await.map(Resolved::Leaders),
            BoundQuery::Department(search) => self.departments(search, ctx).await.map(Resolved::Departments),
        }
    }

    async fn users(&self, search: UserSearch, ctx: &ExecutionContext) -> Result<UserPage, QueryError> {
        let hits = ctx
            .guard(self.repo.search_users(&search.filter, search.page))
            .await?;
        debug!(total = hits.total, returned = hits.items.len(), "User search resolved");
        Ok(UserPage {
            total: hits.total,
            users: hits.items,
        })
    }

    async fn departments(
        &self,
        search: DepartmentSearch,
        ctx: &ExecutionContext,
    ) -> Result<DepartmentPage, QueryError> {
        let hits = ctx
            .guard(self.repo.search_departments(&search.filter, search.page))
            .await?;
        Ok(DepartmentPage {
            total: hits.total,
            departments: hits.items,
        })
    }

    /// The caller's management chain, nearest leader first.
    async fn leaders(&self, ctx: &ExecutionContext) -> Result<Vec<User>, QueryError> {
        let user_id = ctx
            .identity
            .user_id
            .as_deref()
            .ok_or(QueryError::MissingArgument("userID"))?;

        let user = ctx
            .guard(self.repo.get_user(user_id))
            .await?
            .ok_or_else(|| QueryError::Consistency {
                user_id: user_id.to_string(),
            })?;

        let ids = user.leader_ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: HashMap<String, User> = ctx
            .guard(self.repo.list_users(&ids))
            .await?
            .into_iter()
            .map(|leader| (leader.id.clone(), leader))
            .collect();

        // batch lookups come back in backend order; restore chain order
        let mut leaders = Vec::with_capacity(ids.len());
        for id in &ids {
            match found.remove(id) {
                Some(leader) => leaders.push(leader),
                None => warn!(user_id = %user_id, leader_id = %id, "Leader record missing from backend"),
            }
        }
        Ok(leaders)
    }
}
