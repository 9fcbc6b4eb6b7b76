use crate::cli::CommonArgs;
use crate::model::{CountOutput, CountSummary, ReposOutput, Repository, SCHEMA_VERSION};
use anyhow::Result;
use chrono::Utc;
use console::style;

pub fn count_json(summary: &CountSummary, common: &CommonArgs) -> Result<()> {
    let output = CountOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        provider: common.provider_name().to_string(),
        username: common.username.clone(),
        since: common.since.clone(),
        until: common.until.clone(),
        repo_count: summary.repo_count,
        commit_count: summary.commit_count,
        pull_request_count: summary.pull_request_count,
        repos: summary.repos.clone(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn count_ndjson(summary: &CountSummary) -> Result<()> {
    for repo in &summary.repos {
        println!("{}", serde_json::to_string(repo)?);
    }
    Ok(())
}

pub fn count_table(summary: &CountSummary, common: &CommonArgs) -> Result<()> {
    if let (Some(since), Some(until)) = (&common.since, &common.until) {
        println!("Counting contributions from {} to {}", since, until);
    } else if let Some(since) = &common.since {
        println!("Counting contributions since {}", since);
    } else if let Some(until) = &common.until {
        println!("Counting contributions until {}", until);
    }

    println!(
        "{:<50} {:>8} {:>14}",
        style("Repository").bold(),
        style("Commits").bold(),
        style("Pull requests").bold()
    );
    println!("{}", "─".repeat(74));

    for repo in &summary.repos {
        println!(
            "{:<50} {:>8} {:>14}",
            repo.repository, repo.commits, repo.pull_requests
        );
    }

    println!("{}", "─".repeat(74));
    println!(
        "{:<50} {:>8} {:>14}",
        style(format!("Total ({} repositories)", summary.repo_count)).bold(),
        style(summary.commit_count).bold(),
        style(summary.pull_request_count).bold()
    );

    Ok(())
}

pub fn repos_json(repos: &[Repository], provider: &str) -> Result<()> {
    let output = ReposOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        provider: provider.to_string(),
        repos: repos.to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn repos_ndjson(repos: &[Repository]) -> Result<()> {
    for repo in repos {
        println!("{}", serde_json::to_string(repo)?);
    }
    Ok(())
}

pub fn repos_table(repos: &[Repository]) -> Result<()> {
    if repos.is_empty() {
        println!("No accessible repositories");
        return Ok(());
    }

    println!(
        "{:<45} {:<20} {:>8} {:>12}",
        style("Repository").bold(),
        style("Owner").bold(),
        style("Private").bold(),
        style("Updated").bold()
    );
    println!("{}", "─".repeat(88));

    for repo in repos {
        let updated = repo
            .updated_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<45} {:<20} {:>8} {:>12}",
            repo.full_name,
            repo.owner,
            if repo.is_private { "yes" } else { "no" },
            updated
        );
    }

    println!("\n{} repositories", repos.len());
    Ok(())
}
