//! Resource name resolution
//!
//! Operators rarely type a generated pod name in full. When an allowed intent
//! carries a short name ("frontend"), the resolver lists names of that kind
//! through the fixed listing template and picks the closest real one. The
//! rewritten intent goes back through the policy before anything runs.

use crate::command::render_listing;
use crate::executor::CommandExecutor;
use crate::intent::{Intent, IntentFlag};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Groups of words operators use interchangeably for a component
const ALIAS_FAMILIES: &[(&str, &[&str])] = &[
    ("frontend", &["front", "fe", "ui", "web"]),
    ("backend", &["back", "be", "api", "server"]),
    ("database", &["db", "postgres", "mysql", "mongo"]),
    ("redis", &["cache", "session"]),
    ("nginx", &["proxy", "lb", "loadbalancer"]),
];

const MAX_OTHER_MATCHES: usize = 4;

/// Result of matching a partial name against real names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    pub name: String,
    pub others: Vec<String>,
    /// The partial name matched exactly and needed no rewrite
    pub exact: bool,
}

/// Whether a name already looks like a full generated name
pub fn looks_complete(name: &str) -> bool {
    name.len() > 20 && name.matches('-').count() >= 3
}

/// Match `partial` against `candidates`
///
/// Exact match first, then prefix, then substring, then alias families.
/// Among several matches the shortest wins.
pub fn find_best_match(partial: &str, candidates: &[String]) -> Option<NameMatch> {
    let partial = partial.to_lowercase();

    if let Some(exact) = candidates.iter().find(|c| c.to_lowercase() == partial) {
        return Some(NameMatch {
            name: exact.clone(),
            others: Vec::new(),
            exact: true,
        });
    }

    let mut matches: Vec<&String> = candidates
        .iter()
        .filter(|c| c.to_lowercase().starts_with(&partial))
        .collect();

    if matches.is_empty() {
        matches = candidates
            .iter()
            .filter(|c| c.to_lowercase().contains(&partial))
            .collect();
    }

    if matches.is_empty() {
        matches = candidates
            .iter()
            .filter(|c| alias_match(&partial, &c.to_lowercase()))
            .collect();
    }

    let best = matches.iter().min_by_key(|c| c.len())?;
    let others = matches
        .iter()
        .filter(|c| *c != best)
        .take(MAX_OTHER_MATCHES)
        .map(|c| c.to_string())
        .collect();

    Some(NameMatch {
        name: best.to_string(),
        others,
        exact: false,
    })
}

fn alias_match(partial: &str, candidate: &str) -> bool {
    ALIAS_FAMILIES.iter().any(|(key, aliases)| {
        (*key == partial || aliases.contains(&partial))
            && (candidate.contains(key) || aliases.iter().any(|a| candidate.contains(a)))
    })
}

/// Resolves partial resource names against the live cluster
#[derive(Debug, Clone)]
pub struct NameResolver {
    binary: String,
    executor: CommandExecutor,
    timeout: Duration,
}

impl NameResolver {
    pub fn new(binary: impl Into<String>, executor: CommandExecutor, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            executor,
            timeout,
        }
    }

    /// Resolve the intent's resource name, returning the intent unchanged
    /// when there is nothing to resolve or listing fails
    pub async fn resolve(&self, mut intent: Intent, cancel: &CancellationToken) -> Intent {
        let (Some(partial), Some(kind)) = (intent.resource_name.clone(), intent.resource_kind.clone())
        else {
            return intent;
        };
        if looks_complete(&partial) || intent.has_flag(IntentFlag::AllNamespaces) {
            return intent;
        }

        let listing = match render_listing(&self.binary, &kind, intent.namespace.as_deref()) {
            Ok(listing) => listing,
            Err(e) => {
                debug!("Skipping name resolution: {}", e);
                return intent;
            }
        };

        let result = match self.executor.execute(&listing, self.timeout, cancel).await {
            Ok(result) if result.success() => result,
            Ok(result) => {
                debug!(
                    "Name listing for {} failed ({:?}, exit {:?})",
                    kind.cli_name(),
                    result.outcome,
                    result.exit_code
                );
                return intent;
            }
            Err(e) => {
                debug!("Name listing for {} failed: {}", kind.cli_name(), e);
                return intent;
            }
        };

        let names: Vec<String> = result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        match find_best_match(&partial, &names) {
            Some(found) if found.exact => {
                intent.resource_name = Some(found.name);
            }
            Some(found) => {
                info!(
                    "Resolved {} name '{}' to '{}'",
                    kind, partial, found.name
                );
                intent.resource_name = Some(found.name);
                intent.resolved_from = Some(partial);
                intent.other_matches = found.others;
            }
            None => {
                debug!(
                    "No {} matching '{}' among {} names",
                    kind,
                    partial,
                    names.len()
                );
            }
        }
        intent
    }
}
