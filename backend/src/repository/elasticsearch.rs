//! Elasticsearch driver for the repository contract.
//!
//! Users and departments live in separate indices. Predicates translate as:
//!
//! | Filter field | Query |
//! |---|---|
//! | name, departmentName, roleName | `match` (full text) |
//! | phone, email, department (index) name | `match_phrase_prefix` |
//! | departmentID, roleID, leaderID | `term` on the membership id |
//!
//! Text fields are sorted through their `.keyword` sub-field.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use super::{Repository, RepositoryError};
use crate::query::filters::{DepartmentFilter, OrderBy, Page, UserFilter, sort_keys};
use crate::query::types::{Department, Hits, User};

const USER_KEYWORD_FIELDS: &[&str] = &["name", "phone", "email"];
const DEPARTMENT_KEYWORD_FIELDS: &[&str] = &["id", "name", "pid"];

/// Connection settings for the search cluster
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub url: Url,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_index: String,
    pub department_index: String,
    /// Transport-level timeout for every request
    pub timeout: Duration,
}

pub struct ElasticsearchRepository {
    client: Client,
    config: ElasticsearchConfig,
}

impl ElasticsearchRepository {
    pub fn new(mut config: ElasticsearchConfig) -> anyhow::Result<Self> {
        // Url::join drops the last path segment unless it ends with a slash
        if !config.url.path().ends_with('/') {
            let path = format!("{}/", config.url.path());
            config.url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create Elasticsearch HTTP client")?;
        Ok(Self { client, config })
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.request(method, url);
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_ref()),
            None => request,
        }
    }

    async fn search<T: DeserializeOwned + Document>(
        &self,
        index: &str,
        body: Value,
    ) -> Result<Hits<T>, RepositoryError> {
        let url = self
            .config
            .url
            .join(&format!("{index}/_search"))
            .map_err(|e| RepositoryError::Request(format!("invalid index url: {e}")))?;

        debug!(index = %index, body = %body, "Elasticsearch search");
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            warn!(index = %index, status = %status, "Elasticsearch search failed");
            return Err(RepositoryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        decode_hits(&bytes)
    }
}

#[async_trait]
impl Repository for ElasticsearchRepository {
    async fn search_users(&self, filter: &UserFilter, page: Page) -> Result<Hits<User>, RepositoryError> {
        let body = search_body(
            user_query(filter),
            &sort_keys(&filter.order_by, UserFilter::TIEBREAKER),
            USER_KEYWORD_FIELDS,
            page,
        );
        self.search(&self.config.user_index, body).await
    }

    async fn search_departments(
        &self,
        filter: &DepartmentFilter,
        page: Page,
    ) -> Result<Hits<Department>, RepositoryError> {
        let body = search_body(
            department_query(filter),
            &sort_keys(&filter.order_by, DepartmentFilter::TIEBREAKER),
            DEPARTMENT_KEYWORD_FIELDS,
            page,
        );
        self.search(&self.config.department_index, body).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let body = json!({
            "query": {"term": {"id": id}},
            "size": 1,
        });
        let hits: Hits<User> = self.search(&self.config.user_index, body).await?;
        Ok(hits.items.into_iter().next())
    }

    async fn list_users(&self, ids: &[String]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // size must cover every id; the backend default is 10
        let body = json!({
            "query": {"terms": {"id": ids}},
            "size": ids.len(),
        });
        let hits: Hits<User> = self.search(&self.config.user_index, body).await?;
        Ok(hits.items)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        let response = self
            .request(reqwest::Method::GET, self.config.url.clone())
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RepositoryError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

// ============================================================================
// Query construction
// ============================================================================

pub(crate) fn user_query(filter: &UserFilter) -> Value {
    let mut must = Vec::new();

    if let Some(name) = &filter.name {
        must.push(json!({"match": {"name": name}}));
    }
    if let Some(phone) = &filter.phone {
        must.push(json!({"match_phrase_prefix": {"phone": phone}}));
    }
    if let Some(email) = &filter.email {
        must.push(json!({"match_phrase_prefix": {"email": email}}));
    }
    if let Some(name) = &filter.department_name {
        must.push(json!({"match": {"departments.name": name}}));
    }
    if let Some(name) = &filter.role_name {
        must.push(json!({"match": {"roles.name": name}}));
    }
    if let Some(id) = &filter.department_id {
        must.push(json!({"term": {"departments.id": id}}));
    }
    if let Some(id) = &filter.role_id {
        must.push(json!({"term": {"roles.id": id}}));
    }
    if let Some(id) = &filter.leader_id {
        must.push(json!({"term": {"leaders.id": id}}));
    }

    bool_must(must)
}

pub(crate) fn department_query(filter: &DepartmentFilter) -> Value {
    let mut must = Vec::new();

    if !filter.ids.is_empty() {
        must.push(json!({"terms": {"id.keyword": filter.ids}}));
    }
    if let Some(name) = &filter.name {
        must.push(json!({"match_phrase_prefix": {"name": name}}));
    }
    match &filter.tenant_id {
        Some(tenant) => must.push(json!({"term": {"tenantID": tenant}})),
        None => must.push(json!({"exists": {"field": "tenantID"}})),
    }

    bool_must(must)
}

fn bool_must(must: Vec<Value>) -> Value {
    if must.is_empty() {
        json!({"match_all": {}})
    } else {
        json!({"bool": {"must": must}})
    }
}

pub(crate) fn sort_clause(keys: &[OrderBy], keyword_fields: &[&str]) -> Value {
    keys.iter()
        .map(|key| {
            let field = if keyword_fields.contains(&key.field.as_str()) {
                format!("{}.keyword", key.field)
            } else {
                key.field.clone()
            };
            json!({field: {"order": key.direction.as_str(), "unmapped_type": "keyword"}})
        })
        .collect()
}

pub(crate) fn search_body(query: Value, keys: &[OrderBy], keyword_fields: &[&str], page: Page) -> Value {
    json!({
        "query": query,
        "sort": sort_clause(keys, keyword_fields),
        "from": page.offset(),
        "size": page.size,
        "track_total_hits": true,
    })
}

// ============================================================================
// Response decoding
// ============================================================================

/// Documents whose id may live only in the hit metadata
trait Document {
    fn fill_id(&mut self, id: String);
}

impl Document for User {
    fn fill_id(&mut self, id: String) {
        if self.id.is_empty() {
            self.id = id;
        }
    }
}

impl Document for Department {
    fn fill_id(&mut self, id: String) {
        if self.id.is_empty() {
            self.id = id;
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse<T> {
    hits: HitsBody<T>,
}

#[derive(Deserialize)]
struct HitsBody<T> {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default = "Vec::new")]
    hits: Vec<Hit<T>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(i64),
    Object { value: i64 },
}

#[derive(Deserialize)]
struct Hit<T> {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(rename = "_source")]
    source: T,
}

fn decode_hits<T: DeserializeOwned + Document>(bytes: &[u8]) -> Result<Hits<T>, RepositoryError> {
    let response: SearchResponse<T> =
        serde_json::from_slice(bytes).map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let returned = response.hits.hits.len() as i64;
    let total = match response.hits.total {
        Some(TotalHits::Count(n)) | Some(TotalHits::Object { value: n }) => n,
        None => returned,
    };
    let items = response
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let mut doc = hit.source;
            doc.fill_id(hit.id);
            doc
        })
        .collect();

    Ok(Hits::new(items, total))
}
