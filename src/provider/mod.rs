pub mod bitbucket;
pub mod gitlab;
mod http;

pub use bitbucket::Bitbucket;
pub use gitlab::GitLab;

use crate::error::Result;
use crate::model::{CommitRecord, PullRequestRecord, Repository, UserIdentity};
use async_trait::async_trait;

/// Numeric page cursor. Owned by the scan loop; the next page is always
/// derived by incrementing this against the original endpoint and params,
/// never by following a platform-returned "next" URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub per_page: u32,
}

impl PageParams {
    pub fn first(per_page: u32) -> Self {
        Self { page: 1, per_page }
    }

    pub fn next(self) -> Self {
        Self {
            page: self.page + 1,
            per_page: self.per_page,
        }
    }
}

/// One page of items plus the continuation signal.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }
}

/// Per-platform retrieval capability. Implementations normalize wire shapes
/// into the shared record types; all filtering and counting stays in the
/// core, so any server-side filters an adapter passes through are pure
/// optimizations.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Synthetic commit-message prefixes marking automated branch closures.
    fn closed_branch_prefixes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether `list_repositories` pages arrive newest-first. When false the
    /// engine reverses the full listing to normalize ordering.
    fn repositories_newest_first(&self) -> bool {
        true
    }

    /// Resolve platform-specific identity details (e.g. an account UUID)
    /// needed before author matching. Called once per run.
    async fn resolve_identity(&self, configured: &UserIdentity) -> Result<UserIdentity>;

    async fn list_repositories(&self, page: PageParams) -> Result<Page<Repository>>;

    async fn list_commits(&self, repo: &Repository, page: PageParams) -> Result<Page<CommitRecord>>;

    async fn list_pull_requests(
        &self,
        repo: &Repository,
        page: PageParams,
    ) -> Result<Page<PullRequestRecord>>;
}
