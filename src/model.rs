use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub username: String,
    /// Platform-assigned opaque account id, filled in by adapters that need
    /// one for author matching (Bitbucket UUID).
    pub uuid: Option<String>,
    pub email_addresses: Vec<String>,
    pub display_names: Vec<String>,
}

impl UserIdentity {
    pub fn new(username: String) -> Self {
        Self {
            username,
            uuid: None,
            email_addresses: Vec::new(),
            display_names: Vec::new(),
        }
    }

    pub fn with_emails(mut self, emails: Vec<String>) -> Self {
        self.email_addresses = emails;
        self
    }

    pub fn with_display_names(mut self, names: Vec<String>) -> Self {
        self.display_names = names;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub url: String,
    pub is_private: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub hash: String,
    pub author_username: Option<String>,
    pub author_email: Option<String>,
    pub author_name: Option<String>,
    /// Free-text author field as the platform returns it, e.g.
    /// "Jane Doe <jane@example.com>". Not every platform provides one.
    pub author_raw: Option<String>,
    pub parent_count: usize,
    pub message: String,
    pub committed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Merged,
    Declined,
    Other,
}

#[derive(Debug, Clone)]
pub struct PullRequestRecord {
    pub id: String,
    pub state: PullRequestState,
    pub author_username: Option<String>,
    pub author_uuid: Option<String>,
    pub author_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoCounts {
    pub repository: String,
    pub commits: u64,
    pub pull_requests: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountSummary {
    pub repo_count: u64,
    pub commit_count: u64,
    pub pull_request_count: u64,
    pub repos: Vec<RepoCounts>,
}

impl CountSummary {
    pub fn add_repo(&mut self, counts: RepoCounts) {
        self.repo_count += 1;
        self.commit_count += counts.commits;
        self.pull_request_count += counts.pull_requests;
        self.repos.push(counts);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub provider: String,
    pub username: String,
    pub since: Option<String>,
    pub until: Option<String>,
    pub repo_count: u64,
    pub commit_count: u64,
    pub pull_request_count: u64,
    pub repos: Vec<RepoCounts>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReposOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub provider: String,
    pub repos: Vec<Repository>,
}
