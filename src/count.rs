use crate::cli::CommonArgs;
use crate::error::{CountError, Result};
use crate::filter::IdentityMatcher;
use crate::model::{CountSummary, DateRange, RepoCounts, UserIdentity};
use crate::provider::Provider;
use crate::scan::{self, CountMode, Deadline};
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

/// Outcome of a run. A failure while scanning one repository does not roll
/// back repositories already completed; the partial aggregate and the error
/// travel together and the caller decides what to do with them.
pub struct RunReport {
    pub summary: CountSummary,
    pub failure: Option<CountError>,
}

pub async fn run(
    provider: &dyn Provider,
    identity: UserIdentity,
    strict: bool,
    range: &DateRange,
    mode: CountMode,
    per_page: u32,
    deadline: Deadline,
    progress: Option<&ProgressBar>,
) -> Result<RunReport> {
    let resolved = provider.resolve_identity(&identity).await?;
    let matcher = IdentityMatcher::new(resolved, strict);

    let repos = scan::fetch_all_repositories(provider, per_page, deadline).await?;
    info!(count = repos.len(), provider = provider.name(), "fetched repository listing");

    let mut summary = CountSummary::default();

    for repo in &repos {
        if let Some(pb) = progress {
            pb.set_message(format!("Scanning {}", repo.full_name));
            pb.inc(1);
        }

        let counts = scan_repo(provider, repo, &matcher, range, mode, per_page, deadline).await;
        match counts {
            Ok(counts) => summary.add_repo(counts),
            // Deadline expiry is a hard failure: partial totals are discarded.
            Err(CountError::Cancelled) => return Err(CountError::Cancelled),
            Err(e) => {
                warn!(repo = %repo.full_name, error = %e, "scan failed, reporting partial results");
                return Ok(RunReport {
                    summary,
                    failure: Some(e),
                });
            }
        }
    }

    Ok(RunReport {
        summary,
        failure: None,
    })
}

async fn scan_repo(
    provider: &dyn Provider,
    repo: &crate::model::Repository,
    matcher: &IdentityMatcher,
    range: &DateRange,
    mode: CountMode,
    per_page: u32,
    deadline: Deadline,
) -> Result<RepoCounts> {
    let commits = scan::count_commits(provider, repo, matcher, range, mode, per_page, deadline).await?;
    let pull_requests =
        scan::count_pull_requests(provider, repo, matcher, range, per_page, deadline).await?;
    Ok(RepoCounts {
        repository: repo.full_name.clone(),
        commits,
        pull_requests,
    })
}

pub async fn exec(common: CommonArgs, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let range = common.resolve_range().context("Failed to resolve date range")?;
    let provider = common.build_provider(&range).context("Failed to build provider")?;
    let identity = common.identity();
    let mode = common.count_mode();
    let deadline = common.deadline();

    // Keep machine-readable output clean
    let progress = if json || ndjson {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Some(pb)
    };

    let report = run(
        provider.as_ref(),
        identity,
        common.strict,
        &range,
        mode,
        common.per_page,
        deadline,
        progress.as_ref(),
    )
    .await
    .context("Run failed")?;

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    if json {
        crate::output::count_json(&report.summary, &common)?;
    } else if ndjson {
        crate::output::count_ndjson(&report.summary)?;
    } else {
        crate::output::count_table(&report.summary, &common)?;
    }

    if let Some(failure) = report.failure {
        anyhow::bail!("Run incomplete, results above are partial: {failure}");
    }

    Ok(())
}
