//! Reading filter: keeps auth, login and social pages out of both the
//! interest profile and the candidate set.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

use crate::error::{RecError, Result};

/// Hosts excluded unless the reading filter is disabled
pub const DEFAULT_EXCLUDE_HOSTS: &[&str] = &[
    "accounts.google.com",
    "auth.openai.com",
    "mail.google.com",
    "gmail.com",
    "login.microsoftonline.com",
    "login.live.com",
    "github.com",
    "x.com",
    "twitter.com",
    "www.linkedin.com",
    "linkedin.com",
    "facebook.com",
    "www.facebook.com",
];

const DEFAULT_EXCLUDE_PATTERN: &str =
    r"login|signin|sign-in|sign_in|signup|sign-up|oauth|sso|account|accounts|auth|callback";

lazy_static! {
    static ref DEFAULT_PATTERN: Regex = RegexBuilder::new(DEFAULT_EXCLUDE_PATTERN)
        .case_insensitive(true)
        .build()
        .unwrap();
}

/// Host and URL/title exclusion rules
#[derive(Debug, Clone)]
pub struct ReadingFilter {
    hosts: HashSet<String>,
    pattern: Option<Regex>,
}

impl Default for ReadingFilter {
    fn default() -> Self {
        Self {
            hosts: DEFAULT_EXCLUDE_HOSTS.iter().map(|h| h.to_string()).collect(),
            pattern: Some(DEFAULT_PATTERN.clone()),
        }
    }
}

impl ReadingFilter {
    /// A filter that lets everything through
    pub fn permissive() -> Self {
        Self {
            hosts: HashSet::new(),
            pattern: None,
        }
    }

    /// Build a filter from the user's options.
    ///
    /// `extra_hosts` and `user_pattern` apply whether or not the defaults are
    /// enabled. The user pattern is matched case-insensitively.
    pub fn new(
        use_defaults: bool,
        extra_hosts: &[String],
        user_pattern: Option<&str>,
    ) -> Result<Self> {
        let mut filter = if use_defaults {
            Self::default()
        } else {
            Self::permissive()
        };

        filter.hosts.extend(
            extra_hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty()),
        );

        if let Some(user) = user_pattern.map(str::trim).filter(|p| !p.is_empty()) {
            // Validate on its own first so the error names the user's pattern
            RegexBuilder::new(user)
                .case_insensitive(true)
                .build()
                .map_err(|e| RecError::InvalidPattern(e.to_string()))?;

            let combined = match filter.pattern {
                Some(_) => format!("(?:{})|(?:{})", DEFAULT_EXCLUDE_PATTERN, user),
                None => user.to_string(),
            };
            filter.pattern = Some(
                RegexBuilder::new(&combined)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| RecError::InvalidPattern(e.to_string()))?,
            );
        }

        Ok(filter)
    }

    /// Whether a page should be kept
    pub fn allows(&self, host: &str, url: &str, title: &str) -> bool {
        if self.hosts.contains(&host.to_ascii_lowercase()) {
            return false;
        }
        match &self.pattern {
            Some(re) => !re.is_match(url) && !re.is_match(title),
            None => true,
        }
    }
}

/// Split a comma-separated list, trimming blanks
pub fn parse_csv_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
