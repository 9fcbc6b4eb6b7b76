use super::http::{ApiClient, Auth};
use super::{Page, PageParams, Provider};
use crate::error::{CountError, Result};
use crate::model::{
    CommitRecord, DateRange, PullRequestRecord, PullRequestState, Repository, UserIdentity,
};
use crate::util::trim_slashes;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

const RELATIVE_API_ENDPOINT: &str = "api/v4";

/// GitLab adapter, for gitlab.com or a self-hosted instance.
///
/// Pages are bare JSON arrays with no continuation envelope; a page holding
/// exactly `per_page` items means another page may exist. The commit and
/// merge-request endpoints accept date bounds, which are passed through as an
/// optimization only — the core still classifies every record itself.
pub struct GitLab {
    api: ApiClient,
    base: String,
    min_access_level: u32,
    range: DateRange,
}

impl GitLab {
    pub fn new(url: Option<&str>, token: &str, min_access_level: u32, range: DateRange) -> Self {
        let base = match url {
            Some(url) => build_api_endpoint(url),
            None => format!("https://gitlab.com/{RELATIVE_API_ENDPOINT}"),
        };
        Self {
            api: ApiClient::new(Auth::PrivateToken(token.to_string())),
            base,
            min_access_level,
            range,
        }
    }

    fn date_query(&self, since_key: &str, until_key: &str) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(since) = self.range.since {
            query.push((since_key.to_string(), since.to_rfc3339()));
        }
        if let Some(until) = self.range.until {
            query.push((until_key.to_string(), until.to_rfc3339()));
        }
        query
    }
}

/// Normalize a user-supplied instance URL: trim slashes, drop a trailing
/// `api/v4` if the user already included it, default the scheme, then append
/// the API path.
fn build_api_endpoint(url: &str) -> String {
    let mut base = trim_slashes(url);
    if base.ends_with(RELATIVE_API_ENDPOINT) {
        base = trim_slashes(&base[..base.len() - RELATIVE_API_ENDPOINT.len()]);
    }
    if base.starts_with("https://") || base.starts_with("http://") {
        format!("{base}/{RELATIVE_API_ENDPOINT}")
    } else {
        format!("http://{base}/{RELATIVE_API_ENDPOINT}")
    }
}

#[async_trait]
impl Provider for GitLab {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    async fn resolve_identity(&self, configured: &UserIdentity) -> Result<UserIdentity> {
        // Username matching needs no platform lookup here.
        Ok(configured.clone())
    }

    async fn list_repositories(&self, page: PageParams) -> Result<Page<Repository>> {
        let url = format!("{}/projects", self.base);
        let query = vec![
            ("min_access_level".to_string(), self.min_access_level.to_string()),
            ("order_by".to_string(), "updated_at".to_string()),
            ("sort".to_string(), "desc".to_string()),
            ("per_page".to_string(), page.per_page.to_string()),
            ("page".to_string(), page.page.to_string()),
        ];

        let projects: Vec<ProjectWire> = match self.api.get_json(&url, &query).await {
            Ok(projects) => projects,
            Err(CountError::MalformedResponse(msg)) => {
                warn!(%msg, "malformed project page, treating as final empty page");
                return Ok(Page::empty());
            }
            Err(e) => return Err(e),
        };

        let has_more = projects.len() == page.per_page as usize;
        let items = projects.into_iter().map(ProjectWire::into_repository).collect();
        Ok(Page { items, has_more })
    }

    async fn list_commits(&self, repo: &Repository, page: PageParams) -> Result<Page<CommitRecord>> {
        let url = format!("{}/projects/{}/repository/commits", self.base, repo.id);
        let mut query = vec![
            ("all".to_string(), "true".to_string()),
            ("per_page".to_string(), page.per_page.to_string()),
            ("page".to_string(), page.page.to_string()),
        ];
        query.extend(self.date_query("since", "until"));

        let commits: Vec<CommitWire> = match self.api.get_json(&url, &query).await {
            Ok(commits) => commits,
            Err(CountError::MalformedResponse(msg)) => {
                warn!(%msg, "malformed commit page, treating as final empty page");
                return Ok(Page::empty());
            }
            Err(e) => return Err(e),
        };

        let has_more = commits.len() == page.per_page as usize;
        let items = commits.into_iter().map(CommitWire::into_record).collect();
        Ok(Page { items, has_more })
    }

    async fn list_pull_requests(
        &self,
        repo: &Repository,
        page: PageParams,
    ) -> Result<Page<PullRequestRecord>> {
        let url = format!("{}/projects/{}/merge_requests", self.base, repo.id);
        let mut query = vec![
            ("per_page".to_string(), page.per_page.to_string()),
            ("page".to_string(), page.page.to_string()),
        ];
        query.extend(self.date_query("created_after", "created_before"));

        let merge_requests: Vec<MergeRequestWire> = match self.api.get_json(&url, &query).await {
            Ok(merge_requests) => merge_requests,
            Err(CountError::MalformedResponse(msg)) => {
                warn!(%msg, "malformed merge request page, treating as final empty page");
                return Ok(Page::empty());
            }
            Err(e) => return Err(e),
        };

        let has_more = merge_requests.len() == page.per_page as usize;
        let items = merge_requests
            .into_iter()
            .map(MergeRequestWire::into_record)
            .collect();
        Ok(Page { items, has_more })
    }
}

#[derive(Deserialize)]
struct ProjectWire {
    id: u64,
    name: String,
    path_with_namespace: String,
    namespace: Option<NamespaceWire>,
    web_url: Option<String>,
    visibility: Option<String>,
    created_at: Option<DateTime<Utc>>,
    last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct NamespaceWire {
    path: Option<String>,
}

impl ProjectWire {
    fn into_repository(self) -> Repository {
        Repository {
            id: self.id.to_string(),
            name: self.name,
            full_name: self.path_with_namespace,
            owner: self.namespace.and_then(|n| n.path).unwrap_or_default(),
            url: self.web_url.unwrap_or_default(),
            is_private: self.visibility.as_deref() != Some("public"),
            created_at: self.created_at,
            updated_at: self.last_activity_at,
        }
    }
}

#[derive(Deserialize)]
struct CommitWire {
    id: String,
    #[serde(default)]
    message: String,
    author_name: Option<String>,
    author_email: Option<String>,
    #[serde(default)]
    parent_ids: Vec<String>,
    committed_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl CommitWire {
    fn into_record(self) -> CommitRecord {
        let committed_at = self.committed_date.unwrap_or(self.created_at);
        CommitRecord {
            hash: self.id,
            author_username: None,
            author_email: self.author_email,
            author_name: self.author_name,
            author_raw: None,
            parent_count: self.parent_ids.len(),
            message: self.message,
            committed_at,
        }
    }
}

#[derive(Deserialize)]
struct MergeRequestWire {
    id: u64,
    #[serde(default)]
    state: String,
    author: Option<AuthorWire>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct AuthorWire {
    username: Option<String>,
    name: Option<String>,
}

impl MergeRequestWire {
    fn into_record(self) -> PullRequestRecord {
        let state = match self.state.as_str() {
            "opened" => PullRequestState::Open,
            "merged" => PullRequestState::Merged,
            "closed" => PullRequestState::Declined,
            _ => PullRequestState::Other,
        };
        let (author_username, author_name) = match self.author {
            Some(author) => (author.username, author.name),
            None => (None, None),
        };
        PullRequestRecord {
            id: self.id.to_string(),
            state,
            author_username,
            author_uuid: None,
            author_name,
            created_at: self.created_at,
        }
    }
}
