use crate::error::{CountError, Result};
use crate::model::{DateRange, UserIdentity};
use crate::provider::{Bitbucket, GitLab, Provider};
use crate::scan::{CountMode, Deadline};
use anyhow::Result as AnyResult;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tracing::warn;

const DEFAULT_MIN_ROLE: &str = "contributor";

#[derive(Parser)]
#[command(name = "gitcount")]
#[command(about = "Count a user's commits and pull requests across Bitbucket and GitLab")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ProviderKind {
    Bitbucket,
    Gitlab,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, value_enum, help = "Hosting platform to crawl")]
    pub provider: ProviderKind,

    #[arg(long, help = "Base URL of a self-hosted instance")]
    pub url: Option<String>,

    #[arg(long, help = "Username on the platform")]
    pub username: String,

    #[arg(long, env = "GITCOUNT_TOKEN", help = "Access token or app password")]
    pub token: Option<String>,

    #[arg(long = "email", help = "Email address the user commits with (repeatable)")]
    pub emails: Vec<String>,

    #[arg(long = "name", help = "Display name the user commits with (repeatable)")]
    pub names: Vec<String>,

    #[arg(long, help = "Lower date bound, inclusive (RFC3339, YYYY-MM-DD, or e.g. '30 days ago')")]
    pub since: Option<String>,

    #[arg(long, help = "Upper date bound, inclusive")]
    pub until: Option<String>,

    #[arg(long, default_value_t = 100, help = "Items requested per page")]
    pub per_page: u32,

    #[arg(long, default_value_t = 30, help = "Minimum access level for GitLab projects")]
    pub min_access_level: u32,

    #[arg(long, help = "Minimum repository role for Bitbucket (default: contributor)")]
    pub min_role: Option<String>,

    #[arg(long, hide = true, help = "Deprecated alias of --min-role")]
    pub repo_role: Option<String>,

    #[arg(long, default_value_t = 1, help = "Stop counting commits per repo once this many are found")]
    pub min_commits: u64,

    #[arg(long, help = "Scan full history for exact totals, disabling the threshold early exit")]
    pub exact: bool,

    #[arg(long, help = "Match identity by exact username/email/name only, no substring matching")]
    pub strict: bool,

    #[arg(long, value_parser = humantime::parse_duration, help = "Abort the run after this long (e.g. 90s, 5m)")]
    pub timeout: Option<Duration>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count commits and pull requests across all accessible repositories
    Count {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// List all accessible repositories
    Repos {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
}

impl CommonArgs {
    pub fn provider_name(&self) -> &'static str {
        match self.provider {
            ProviderKind::Bitbucket => "bitbucket",
            ProviderKind::Gitlab => "gitlab",
        }
    }

    pub fn resolve_range(&self) -> Result<DateRange> {
        crate::util::resolve_range(self.since.as_deref(), self.until.as_deref())
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity::new(self.username.clone())
            .with_emails(self.emails.clone())
            .with_display_names(self.names.clone())
    }

    pub fn count_mode(&self) -> CountMode {
        if self.exact {
            CountMode::Exact
        } else {
            CountMode::AtLeast(self.min_commits)
        }
    }

    pub fn deadline(&self) -> Deadline {
        match self.timeout {
            Some(timeout) => Deadline::after(timeout),
            None => Deadline::none(),
        }
    }

    fn effective_min_role(&self) -> String {
        if let Some(role) = &self.min_role {
            return role.clone();
        }
        if let Some(role) = &self.repo_role {
            warn!("--repo-role is deprecated and will be removed in a future release, use --min-role");
            return role.clone();
        }
        DEFAULT_MIN_ROLE.to_string()
    }

    pub fn build_provider(&self, range: &DateRange) -> Result<Box<dyn Provider>> {
        let token = self
            .token
            .clone()
            .ok_or_else(|| CountError::Config("Missing access token (--token or GITCOUNT_TOKEN)".to_string()))?;

        let provider: Box<dyn Provider> = match self.provider {
            ProviderKind::Bitbucket => Box::new(Bitbucket::new(
                &self.username,
                &token,
                &self.effective_min_role(),
                range.clone(),
            )),
            ProviderKind::Gitlab => Box::new(GitLab::new(
                self.url.as_deref(),
                &token,
                self.min_access_level,
                range.clone(),
            )),
        };
        Ok(provider)
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub async fn execute(self) -> AnyResult<()> {
        match self.command {
            Commands::Count { json, ndjson } => crate::count::exec(self.common, json, ndjson).await,
            Commands::Repos { json, ndjson } => crate::repos::exec(self.common, json, ndjson).await,
        }
    }
}
