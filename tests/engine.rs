use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gitcount::count;
use gitcount::error::{CountError, Result};
use gitcount::filter::IdentityMatcher;
use gitcount::model::{
    CommitRecord, DateRange, PullRequestRecord, PullRequestState, Repository, UserIdentity,
};
use gitcount::provider::{Page, PageParams, Provider};
use gitcount::scan::{self, CountMode, Deadline};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};

const PER_PAGE: u32 = 50;

fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

fn commit(hash: &str, email: &str, at: DateTime<Utc>, parent_count: usize) -> CommitRecord {
    CommitRecord {
        hash: hash.to_string(),
        author_username: None,
        author_email: Some(email.to_string()),
        author_name: None,
        author_raw: Some(format!("Someone <{email}>")),
        parent_count,
        message: format!("commit {hash}"),
        committed_at: at,
    }
}

fn pull_request(id: &str, username: &str, state: PullRequestState) -> PullRequestRecord {
    PullRequestRecord {
        id: id.to_string(),
        state,
        author_username: Some(username.to_string()),
        author_uuid: None,
        author_name: None,
        created_at: Some(ts(2024, 6, 1)),
    }
}

fn repo(full_name: &str) -> Repository {
    Repository {
        id: full_name.to_string(),
        name: full_name.rsplit('/').next().unwrap_or(full_name).to_string(),
        full_name: full_name.to_string(),
        owner: "acme".to_string(),
        url: format!("https://example.com/{full_name}"),
        is_private: true,
        created_at: Some(ts(2020, 1, 1)),
        updated_at: Some(ts(2024, 6, 1)),
    }
}

fn matcher_for_email(email: &str) -> IdentityMatcher {
    let identity = UserIdentity::new("jane".to_string()).with_emails(vec![email.to_string()]);
    IdentityMatcher::new(identity, true)
}

/// Scripted provider: same commit/PR pages for every repository, with
/// page-fetch call counters for early-exit assertions.
struct MockProvider {
    repos: Vec<Repository>,
    commit_pages: Vec<Vec<CommitRecord>>,
    pr_pages: Vec<Vec<PullRequestRecord>>,
    fail_commits_for: Option<String>,
    commit_calls: AtomicUsize,
    pr_calls: AtomicUsize,
}

impl MockProvider {
    fn new(commit_pages: Vec<Vec<CommitRecord>>) -> Self {
        Self {
            repos: vec![repo("acme/widget")],
            commit_pages,
            pr_pages: Vec::new(),
            fail_commits_for: None,
            commit_calls: AtomicUsize::new(0),
            pr_calls: AtomicUsize::new(0),
        }
    }

    fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    fn page_of<T: Clone>(pages: &[Vec<T>], params: PageParams) -> Page<T> {
        let index = (params.page - 1) as usize;
        match pages.get(index) {
            Some(items) => Page {
                items: items.clone(),
                has_more: index + 1 < pages.len(),
            },
            None => Page::empty(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn closed_branch_prefixes(&self) -> &'static [&'static str] {
        &["Closed branch "]
    }

    async fn resolve_identity(&self, configured: &UserIdentity) -> Result<UserIdentity> {
        Ok(configured.clone())
    }

    async fn list_repositories(&self, params: PageParams) -> Result<Page<Repository>> {
        Ok(Self::page_of(std::slice::from_ref(&self.repos), params))
    }

    async fn list_commits(&self, repo: &Repository, params: PageParams) -> Result<Page<CommitRecord>> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits_for.as_deref() == Some(repo.full_name.as_str()) {
            return Err(CountError::Api {
                status: 500,
                url: format!("mock://{}/commits", repo.full_name),
            });
        }
        Ok(Self::page_of(&self.commit_pages, params))
    }

    async fn list_pull_requests(
        &self,
        _repo: &Repository,
        params: PageParams,
    ) -> Result<Page<PullRequestRecord>> {
        self.pr_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::page_of(&self.pr_pages, params))
    }
}

#[tokio::test]
async fn merge_commits_excluded_regardless_of_author() {
    let provider = MockProvider::new(vec![vec![
        commit("m1", "a@x.com", ts(2024, 6, 2), 2),
        commit("c1", "a@x.com", ts(2024, 6, 1), 1),
    ]]);
    let matcher = matcher_for_email("a@x.com");

    let total = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &DateRange::new(),
        CountMode::Exact,
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 1);
}

#[tokio::test]
async fn synthetic_branch_closure_commits_excluded() {
    let mut closed = commit("s1", "a@x.com", ts(2024, 6, 2), 1);
    closed.message = "Closed branch feature-x".to_string();
    let provider = MockProvider::new(vec![vec![closed, commit("c1", "a@x.com", ts(2024, 6, 1), 1)]]);
    let matcher = matcher_for_email("a@x.com");

    let total = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &DateRange::new(),
        CountMode::Exact,
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 1);
}

#[tokio::test]
async fn commit_before_lower_bound_stops_fetching_pages() {
    let provider = MockProvider::new(vec![
        vec![
            commit("c1", "a@x.com", ts(2024, 6, 3), 1),
            commit("c0", "a@x.com", ts(2023, 1, 1), 1),
        ],
        vec![commit("old1", "a@x.com", ts(2022, 6, 1), 1)],
        vec![commit("old2", "a@x.com", ts(2021, 6, 1), 1)],
    ]);
    let matcher = matcher_for_email("a@x.com");
    let range = DateRange::new().with_since(ts(2024, 1, 1));

    let total = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &range,
        CountMode::Exact,
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 1);
    assert_eq!(provider.commit_calls(), 1, "later pages must not be fetched");
}

#[tokio::test]
async fn commit_after_upper_bound_skipped_but_scan_continues() {
    let provider = MockProvider::new(vec![
        vec![commit("new", "a@x.com", ts(2024, 9, 1), 1)],
        vec![commit("in1", "a@x.com", ts(2024, 5, 1), 1)],
    ]);
    let matcher = matcher_for_email("a@x.com");
    let range = DateRange::new().with_until(ts(2024, 6, 30));

    let total = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &range,
        CountMode::Exact,
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 1, "in-range commit after the skipped one still counts");
    assert_eq!(provider.commit_calls(), 2);
}

#[tokio::test]
async fn minimum_count_mode_stops_at_threshold() {
    let provider = MockProvider::new(vec![
        vec![
            commit("c1", "a@x.com", ts(2024, 6, 5), 1),
            commit("c2", "a@x.com", ts(2024, 6, 4), 1),
        ],
        vec![
            commit("c3", "a@x.com", ts(2024, 6, 3), 1),
            commit("c4", "a@x.com", ts(2024, 6, 2), 1),
        ],
        vec![
            commit("c5", "a@x.com", ts(2024, 6, 1), 1),
            commit("c6", "a@x.com", ts(2024, 5, 30), 1),
        ],
    ]);
    let matcher = matcher_for_email("a@x.com");

    let total = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &DateRange::new(),
        CountMode::AtLeast(3),
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 3);
    assert_eq!(provider.commit_calls(), 2, "threshold reached on page 2");
}

#[tokio::test]
async fn exact_mode_scans_every_page() {
    let provider = MockProvider::new(vec![
        vec![
            commit("c1", "a@x.com", ts(2024, 6, 5), 1),
            commit("c2", "a@x.com", ts(2024, 6, 4), 1),
        ],
        vec![
            commit("c3", "a@x.com", ts(2024, 6, 3), 1),
            commit("c4", "a@x.com", ts(2024, 6, 2), 1),
        ],
        vec![
            commit("c5", "a@x.com", ts(2024, 6, 1), 1),
            commit("c6", "a@x.com", ts(2024, 5, 30), 1),
        ],
    ]);
    let matcher = matcher_for_email("a@x.com");

    let total = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &DateRange::new(),
        CountMode::Exact,
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 6);
    assert_eq!(provider.commit_calls(), 3);
}

#[tokio::test]
async fn identity_matches_by_configured_email_only() {
    let provider = MockProvider::new(vec![vec![
        commit("c1", "a@x.com", ts(2024, 6, 2), 1),
        commit("c2", "nobody@else.org", ts(2024, 6, 1), 1),
    ]]);
    let matcher = matcher_for_email("a@x.com");

    let total = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &DateRange::new(),
        CountMode::Exact,
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 1);
}

#[tokio::test]
async fn declined_pull_requests_excluded() {
    let mut provider = MockProvider::new(vec![Vec::new()]);
    provider.pr_pages = vec![vec![
        pull_request("1", "jane", PullRequestState::Merged),
        pull_request("2", "jane", PullRequestState::Declined),
        pull_request("3", "jane", PullRequestState::Open),
        pull_request("4", "someone-else", PullRequestState::Merged),
    ]];
    let identity = UserIdentity::new("jane".to_string());
    let matcher = IdentityMatcher::new(identity, true);

    let total = scan::count_pull_requests(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &DateRange::new(),
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 2);
}

#[tokio::test]
async fn expired_deadline_cancels_before_any_fetch() {
    let provider = MockProvider::new(vec![vec![commit("c1", "a@x.com", ts(2024, 6, 1), 1)]]);
    let matcher = matcher_for_email("a@x.com");
    let deadline = Deadline::after(std::time::Duration::ZERO);

    let result = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &DateRange::new(),
        CountMode::Exact,
        PER_PAGE,
        deadline,
    )
    .await;

    assert!(matches!(result, Err(CountError::Cancelled)));
    assert_eq!(provider.commit_calls(), 0);
}

#[tokio::test]
async fn end_to_end_five_commit_scenario() {
    // Newest-first stream: merge, foreign author, two matching in-range, one
    // before the lower bound. Exact mode returns 2 and never asks for page 2.
    let provider = MockProvider::new(vec![
        vec![
            commit("merge", "a@x.com", ts(2024, 6, 5), 2),
            commit("other", "nobody@else.org", ts(2024, 6, 4), 1),
            commit("mine1", "a@x.com", ts(2024, 6, 3), 1),
            commit("mine2", "a@x.com", ts(2024, 6, 2), 1),
            commit("tooold", "a@x.com", ts(2023, 12, 31), 1),
        ],
        vec![commit("never-fetched", "a@x.com", ts(2023, 12, 30), 1)],
    ]);
    let matcher = matcher_for_email("a@x.com");
    let range = DateRange::new().with_since(ts(2024, 1, 1));

    let total = scan::count_commits(
        &provider,
        &repo("acme/widget"),
        &matcher,
        &range,
        CountMode::Exact,
        PER_PAGE,
        Deadline::none(),
    )
    .await
    .unwrap();

    assert_eq!(total, 2);
    assert_eq!(provider.commit_calls(), 1);
}

#[tokio::test]
async fn repeated_runs_are_idempotent() {
    let pages = || {
        vec![vec![
            commit("c1", "a@x.com", ts(2024, 6, 2), 1),
            commit("c2", "a@x.com", ts(2024, 6, 1), 1),
        ]]
    };
    let identity = UserIdentity::new("jane".to_string()).with_emails(vec!["a@x.com".to_string()]);

    let mut totals = Vec::new();
    for _ in 0..2 {
        let provider = MockProvider::new(pages());
        let report = count::run(
            &provider,
            identity.clone(),
            true,
            &DateRange::new(),
            CountMode::Exact,
            PER_PAGE,
            Deadline::none(),
            None,
        )
        .await
        .unwrap();
        assert!(report.failure.is_none());
        totals.push((
            report.summary.repo_count,
            report.summary.commit_count,
            report.summary.pull_request_count,
        ));
    }

    assert_eq!(totals[0], totals[1]);
    assert_eq!(totals[0], (1, 2, 0));
}

#[tokio::test]
async fn failure_mid_crawl_keeps_completed_repo_totals() {
    let mut provider = MockProvider::new(vec![vec![
        commit("c1", "a@x.com", ts(2024, 6, 2), 1),
    ]]);
    provider.repos = vec![repo("acme/first"), repo("acme/second")];
    provider.fail_commits_for = Some("acme/second".to_string());
    let identity = UserIdentity::new("jane".to_string()).with_emails(vec!["a@x.com".to_string()]);

    let report = count::run(
        &provider,
        identity,
        true,
        &DateRange::new(),
        CountMode::Exact,
        PER_PAGE,
        Deadline::none(),
        None,
    )
    .await
    .unwrap();

    assert!(matches!(report.failure, Some(CountError::Api { status: 500, .. })));
    assert_eq!(report.summary.repo_count, 1);
    assert_eq!(report.summary.commit_count, 1);
    assert_eq!(report.summary.repos[0].repository, "acme/first");
}
