use crate::model::{CommitRecord, DateRange, PullRequestRecord, UserIdentity};
use chrono::{DateTime, Utc};

/// Position of a timestamp relative to a date window. `Before` doubles as the
/// early-exit signal for newest-first listings: everything after it is older
/// still, so the scan can stop fetching pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateClass {
    Before,
    Within,
    After,
}

pub fn classify(timestamp: &DateTime<Utc>, range: &DateRange) -> DateClass {
    if let Some(since) = range.since {
        if *timestamp < since {
            return DateClass::Before;
        }
    }
    if let Some(until) = range.until {
        if *timestamp > until {
            return DateClass::After;
        }
    }
    DateClass::Within
}

/// True when the commit is a merge (more than one parent) or carries a
/// platform-synthesized branch-closure message. Checked before authorship:
/// merges are excluded no matter who made them.
pub fn is_merge_or_synthetic(commit: &CommitRecord, closed_branch_prefixes: &[&str]) -> bool {
    if commit.parent_count > 1 {
        return true;
    }
    closed_branch_prefixes
        .iter()
        .any(|prefix| commit.message.starts_with(prefix))
}

/// Decides whether an author record belongs to the configured user.
///
/// The default policy is deliberately permissive: besides exact username and
/// email matches, the raw author field ("Name <email>") is searched for the
/// username, any configured email, and any configured display name as
/// substrings. `strict` drops the substring checks and keeps only exact
/// equality.
pub struct IdentityMatcher {
    identity: UserIdentity,
    strict: bool,
}

impl IdentityMatcher {
    pub fn new(identity: UserIdentity, strict: bool) -> Self {
        Self { identity, strict }
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn matches_commit(&self, commit: &CommitRecord) -> bool {
        if let Some(username) = &commit.author_username {
            if *username == self.identity.username {
                return true;
            }
        }
        if let Some(email) = &commit.author_email {
            if self.identity.email_addresses.iter().any(|e| e == email) {
                return true;
            }
        }
        if let Some(name) = &commit.author_name {
            if self.identity.display_names.iter().any(|n| n == name) {
                return true;
            }
        }

        if self.strict {
            return false;
        }

        if let Some(raw) = &commit.author_raw {
            if raw.contains(&self.identity.username) {
                return true;
            }
            if self.identity.email_addresses.iter().any(|e| raw.contains(e.as_str())) {
                return true;
            }
            if self.identity.display_names.iter().any(|n| raw.contains(n.as_str())) {
                return true;
            }
        }

        false
    }

    pub fn matches_pull_request(&self, pr: &PullRequestRecord) -> bool {
        if let (Some(uuid), Some(own)) = (&pr.author_uuid, &self.identity.uuid) {
            if uuid == own {
                return true;
            }
        }
        if let Some(username) = &pr.author_username {
            if *username == self.identity.username {
                return true;
            }
        }
        if let Some(name) = &pr.author_name {
            if self.identity.display_names.iter().any(|n| n == name) {
                return true;
            }
        }
        false
    }
}
