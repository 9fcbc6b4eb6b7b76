use crate::error::{CountError, Result};
use crate::filter::{self, DateClass, IdentityMatcher};
use crate::model::{DateRange, PullRequestState, Repository};
use crate::provider::{PageParams, Provider};
use std::time::Instant;

/// Exact scans all pages; AtLeast stops as soon as the running total reaches
/// the threshold, trading exactness for fewer requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    Exact,
    AtLeast(u64),
}

/// Optional wall-clock cutoff for the whole run, checked before every page
/// fetch. Expiry is a hard failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(timeout: std::time::Duration) -> Self {
        Self {
            at: Some(Instant::now() + timeout),
        }
    }

    pub fn check(&self) -> Result<()> {
        match self.at {
            Some(at) if Instant::now() >= at => Err(CountError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Exhaust the repository listing, one page at a time, and normalize the
/// aggregate to newest-first.
pub async fn fetch_all_repositories(
    provider: &dyn Provider,
    per_page: u32,
    deadline: Deadline,
) -> Result<Vec<Repository>> {
    let mut params = PageParams::first(per_page);
    let mut repos = Vec::new();

    loop {
        deadline.check()?;
        let page = provider.list_repositories(params).await?;
        repos.extend(page.items);
        if !page.has_more {
            break;
        }
        params = params.next();
    }

    if !provider.repositories_newest_first() {
        repos.reverse();
    }

    Ok(repos)
}

/// Count the user's commits in one repository.
///
/// Per record, in order: date classification (Before abandons all remaining
/// pages, since commit listings are newest-first; After skips just the
/// record), merge/synthetic exclusion, identity match. Continuation always
/// re-issues the original endpoint with the local page number incremented;
/// platform "next" links are never followed.
pub async fn count_commits(
    provider: &dyn Provider,
    repo: &Repository,
    matcher: &IdentityMatcher,
    range: &DateRange,
    mode: CountMode,
    per_page: u32,
    deadline: Deadline,
) -> Result<u64> {
    let mut params = PageParams::first(per_page);
    let mut total = 0u64;

    loop {
        deadline.check()?;
        let page = provider.list_commits(repo, params).await?;

        for commit in &page.items {
            match filter::classify(&commit.committed_at, range) {
                DateClass::Before => return Ok(total),
                DateClass::After => continue,
                DateClass::Within => {}
            }

            if filter::is_merge_or_synthetic(commit, provider.closed_branch_prefixes()) {
                continue;
            }

            if matcher.matches_commit(commit) {
                total += 1;
                if let CountMode::AtLeast(threshold) = mode {
                    if total >= threshold {
                        return Ok(total);
                    }
                }
            }
        }

        if !page.has_more {
            break;
        }
        params = params.next();
    }

    Ok(total)
}

/// Count the user's pull requests in one repository. Declined requests never
/// count. Out-of-window records are skipped without ending the scan: pull
/// request listings carry no newest-first guarantee, so Before is not an
/// early-exit signal here.
pub async fn count_pull_requests(
    provider: &dyn Provider,
    repo: &Repository,
    matcher: &IdentityMatcher,
    range: &DateRange,
    per_page: u32,
    deadline: Deadline,
) -> Result<u64> {
    let mut params = PageParams::first(per_page);
    let mut total = 0u64;

    loop {
        deadline.check()?;
        let page = provider.list_pull_requests(repo, params).await?;

        for pr in &page.items {
            if pr.state == PullRequestState::Declined {
                continue;
            }
            if let Some(created_at) = pr.created_at {
                if filter::classify(&created_at, range) != DateClass::Within {
                    continue;
                }
            }
            if matcher.matches_pull_request(pr) {
                total += 1;
            }
        }

        if !page.has_more {
            break;
        }
        params = params.next();
    }

    Ok(total)
}
