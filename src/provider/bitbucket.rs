use super::http::{ApiClient, Auth};
use super::{Page, PageParams, Provider};
use crate::error::{CountError, Result};
use crate::model::{
    CommitRecord, DateRange, PullRequestRecord, PullRequestState, Repository, UserIdentity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Messages Bitbucket synthesizes when a branch is closed through the UI;
/// the older wording is still seen in long-lived repositories.
const CLOSED_BRANCH_PREFIXES: &[&str] = &["Close branch ", "Closed branch "];

/// Bitbucket Cloud adapter.
///
/// Paging quirk: responses carry a `next` URL, but following it verbatim
/// returns inconsistent results, so it is only read as a has-more boolean.
/// The scan loop re-issues the original endpoint with the page number
/// incremented instead.
pub struct Bitbucket {
    api: ApiClient,
    base: String,
    min_role: String,
    range: DateRange,
}

impl Bitbucket {
    pub fn new(username: &str, token: &str, min_role: &str, range: DateRange) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, username, token, min_role, range)
    }

    pub fn with_base_url(
        base: &str,
        username: &str,
        token: &str,
        min_role: &str,
        range: DateRange,
    ) -> Self {
        Self {
            api: ApiClient::new(Auth::Basic {
                username: username.to_string(),
                token: token.to_string(),
            }),
            base: crate::util::trim_slashes(base).to_string(),
            min_role: min_role.to_string(),
            range,
        }
    }

    /// Server-side repository filter; commits have no date filter on this
    /// platform, so the core's own date classification stays load-bearing.
    fn repo_query(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(since) = self.range.since {
            clauses.push(format!("updated_on>={}", since.to_rfc3339()));
        }
        if let Some(until) = self.range.until {
            clauses.push(format!("created_on<={}", until.to_rfc3339()));
        }
        clauses.join(" AND ")
    }
}

#[async_trait]
impl Provider for Bitbucket {
    fn name(&self) -> &'static str {
        "bitbucket"
    }

    fn closed_branch_prefixes(&self) -> &'static [&'static str] {
        CLOSED_BRANCH_PREFIXES
    }

    // Listing arrives oldest-first and the API ignores sort params, so the
    // engine reverses the aggregate.
    fn repositories_newest_first(&self) -> bool {
        false
    }

    async fn resolve_identity(&self, configured: &UserIdentity) -> Result<UserIdentity> {
        let url = format!("{}/user", self.base);
        let user: UserWire = self
            .api
            .get_json(&url, &[])
            .await
            .map_err(|e| CountError::AuthResolution(e.to_string()))?;

        let mut identity = configured.clone();
        identity.uuid = user.uuid;
        Ok(identity)
    }

    async fn list_repositories(&self, page: PageParams) -> Result<Page<Repository>> {
        let url = format!("{}/repositories", self.base);
        let mut query = vec![
            ("role".to_string(), self.min_role.clone()),
            ("pagelen".to_string(), page.per_page.to_string()),
            ("page".to_string(), page.page.to_string()),
        ];
        let q = self.repo_query();
        if !q.is_empty() {
            query.push(("q".to_string(), q));
        }

        let envelope: Envelope<RepoWire> = match self.api.get_json(&url, &query).await {
            Ok(envelope) => envelope,
            Err(CountError::MalformedResponse(msg)) => {
                warn!(%msg, "malformed repository page, treating as final empty page");
                return Ok(Page::empty());
            }
            Err(e) => return Err(e),
        };

        let has_more = envelope.next.is_some();
        let Some(values) = envelope.values else {
            warn!(%url, "repository page missing 'values', treating as final empty page");
            return Ok(Page::empty());
        };

        let items = values.into_iter().map(RepoWire::into_repository).collect();
        Ok(Page { items, has_more })
    }

    async fn list_commits(&self, repo: &Repository, page: PageParams) -> Result<Page<CommitRecord>> {
        let url = format!("{}/repositories/{}/commits", self.base, repo.full_name);
        let query = vec![
            ("pagelen".to_string(), page.per_page.to_string()),
            ("page".to_string(), page.page.to_string()),
        ];

        let envelope: Envelope<CommitWire> = match self.api.get_json(&url, &query).await {
            Ok(envelope) => envelope,
            Err(CountError::MalformedResponse(msg)) => {
                warn!(%msg, "malformed commit page, treating as final empty page");
                return Ok(Page::empty());
            }
            Err(e) => return Err(e),
        };

        let has_more = envelope.next.is_some();
        let Some(values) = envelope.values else {
            warn!(%url, "commit page missing 'values', treating as final empty page");
            return Ok(Page::empty());
        };

        let items = values.into_iter().map(CommitWire::into_record).collect();
        Ok(Page { items, has_more })
    }

    async fn list_pull_requests(
        &self,
        repo: &Repository,
        page: PageParams,
    ) -> Result<Page<PullRequestRecord>> {
        let url = format!("{}/repositories/{}/pullrequests", self.base, repo.full_name);
        let mut query = vec![
            ("state".to_string(), "all".to_string()),
            ("pagelen".to_string(), page.per_page.to_string()),
            ("page".to_string(), page.page.to_string()),
        ];

        let mut clauses = Vec::new();
        if let Some(since) = self.range.since {
            clauses.push(format!("created_on>={}", since.to_rfc3339()));
        }
        if let Some(until) = self.range.until {
            clauses.push(format!("created_on<={}", until.to_rfc3339()));
        }
        if !clauses.is_empty() {
            query.push(("q".to_string(), clauses.join(" AND ")));
        }

        let envelope: Envelope<PullRequestWire> = match self.api.get_json(&url, &query).await {
            Ok(envelope) => envelope,
            Err(CountError::MalformedResponse(msg)) => {
                warn!(%msg, "malformed pull request page, treating as final empty page");
                return Ok(Page::empty());
            }
            Err(e) => return Err(e),
        };

        let has_more = envelope.next.is_some();
        let Some(values) = envelope.values else {
            warn!(%url, "pull request page missing 'values', treating as final empty page");
            return Ok(Page::empty());
        };

        let items = values.into_iter().map(PullRequestWire::into_record).collect();
        Ok(Page { items, has_more })
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    values: Option<Vec<T>>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct UserWire {
    uuid: Option<String>,
}

#[derive(Deserialize)]
struct RepoWire {
    uuid: String,
    name: String,
    full_name: String,
    #[serde(default)]
    is_private: bool,
    workspace: Option<WorkspaceWire>,
    links: Option<LinksWire>,
    created_on: Option<DateTime<Utc>>,
    updated_on: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct WorkspaceWire {
    slug: Option<String>,
}

#[derive(Deserialize)]
struct LinksWire {
    html: Option<HrefWire>,
}

#[derive(Deserialize)]
struct HrefWire {
    href: Option<String>,
}

impl RepoWire {
    fn into_repository(self) -> Repository {
        let owner = self
            .workspace
            .and_then(|w| w.slug)
            .unwrap_or_default();
        let url = self
            .links
            .and_then(|l| l.html)
            .and_then(|h| h.href)
            .unwrap_or_default();
        Repository {
            id: self.uuid,
            name: self.name,
            full_name: self.full_name,
            owner,
            url,
            is_private: self.is_private,
            created_at: self.created_on,
            updated_at: self.updated_on,
        }
    }
}

#[derive(Deserialize)]
struct CommitWire {
    hash: String,
    #[serde(default)]
    message: String,
    date: DateTime<Utc>,
    #[serde(default)]
    parents: Vec<ParentWire>,
    author: Option<CommitAuthorWire>,
}

#[derive(Deserialize)]
struct ParentWire {
    #[allow(dead_code)]
    hash: Option<String>,
}

#[derive(Deserialize)]
struct CommitAuthorWire {
    raw: Option<String>,
    user: Option<AccountWire>,
}

#[derive(Deserialize)]
struct AccountWire {
    username: Option<String>,
    nickname: Option<String>,
    display_name: Option<String>,
    email: Option<String>,
}

impl CommitWire {
    fn into_record(self) -> CommitRecord {
        let (author_username, author_email, author_name, author_raw) = match self.author {
            Some(author) => {
                let (username, email, name) = match author.user {
                    Some(user) => (user.username.or(user.nickname), user.email, user.display_name),
                    None => (None, None, None),
                };
                (username, email, name, author.raw)
            }
            None => (None, None, None, None),
        };

        CommitRecord {
            hash: self.hash,
            author_username,
            author_email,
            author_name,
            author_raw,
            parent_count: self.parents.len(),
            message: self.message,
            committed_at: self.date,
        }
    }
}

#[derive(Deserialize)]
struct PullRequestWire {
    id: u64,
    #[serde(default)]
    state: String,
    author: Option<AccountWireWithUuid>,
    created_on: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct AccountWireWithUuid {
    uuid: Option<String>,
    username: Option<String>,
    nickname: Option<String>,
    display_name: Option<String>,
}

impl PullRequestWire {
    fn into_record(self) -> PullRequestRecord {
        let state = match self.state.as_str() {
            "OPEN" => PullRequestState::Open,
            "MERGED" => PullRequestState::Merged,
            "DECLINED" => PullRequestState::Declined,
            _ => PullRequestState::Other,
        };
        let (author_uuid, author_username, author_name) = match self.author {
            Some(author) => (
                author.uuid,
                author.username.or(author.nickname),
                author.display_name,
            ),
            None => (None, None, None),
        };
        PullRequestRecord {
            id: self.id.to_string(),
            state,
            author_username,
            author_uuid,
            author_name,
            created_at: self.created_on,
        }
    }
}
