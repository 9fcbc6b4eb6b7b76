use crate::cli::CommonArgs;
use anyhow::Context;

/// List every repository the configured user can access, newest-first.
pub async fn exec(common: CommonArgs, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let range = common.resolve_range().context("Failed to resolve date range")?;
    let provider = common.build_provider(&range).context("Failed to build provider")?;
    let deadline = common.deadline();

    let repos = crate::scan::fetch_all_repositories(provider.as_ref(), common.per_page, deadline)
        .await
        .context("Failed to fetch repositories")?;

    if json {
        crate::output::repos_json(&repos, provider.name())?;
    } else if ndjson {
        crate::output::repos_ndjson(&repos)?;
    } else {
        crate::output::repos_table(&repos)?;
    }

    Ok(())
}
