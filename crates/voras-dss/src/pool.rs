//! Resource pools
//!
//! A pool is a set of resource strings described by templates such as
//! `APPL{0-9}{A-Z}`. Each `{x-y}` range expands to every character from `x`
//! to `y`; both ends must be digits or both uppercase letters. A string is
//! taken while `dss.<ns>.<key_prefix><string>` exists.

use crate::access::DssKeyAccess;
use crate::action::DssAction;
use crate::error::{DssError, DssResult};
use crate::retry::{cas_retry, CasAttempt, RetryBudget};
use crate::service::DynamicStatusStore;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Default cap on strings a single template may produce
pub const DEFAULT_MAX_EXPANSION: usize = 10_000;

enum Part {
    Literal(char),
    Range(char, char),
}

fn parse_template(template: &str) -> DssResult<Vec<Part>> {
    let mut parts = Vec::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut body = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    body.push(c);
                }
                if !closed {
                    return Err(DssError::invalid_template(template, "unclosed '{'"));
                }
                let mut ends = body.chars();
                let (Some(lo), Some('-'), Some(hi), None) =
                    (ends.next(), ends.next(), ends.next(), ends.next())
                else {
                    return Err(DssError::invalid_template(
                        template,
                        format!("malformed range '{{{body}'"),
                    ));
                };
                let same_class = (lo.is_ascii_digit() && hi.is_ascii_digit())
                    || (lo.is_ascii_uppercase() && hi.is_ascii_uppercase());
                if !same_class || lo > hi {
                    return Err(DssError::invalid_template(
                        template,
                        format!("range {lo}-{hi} must be ascending digits or uppercase letters"),
                    ));
                }
                parts.push(Part::Range(lo, hi));
            }
            '}' => {
                return Err(DssError::invalid_template(template, "unmatched '}'"));
            }
            other => parts.push(Part::Literal(other)),
        }
    }
    Ok(parts)
}

/// Expand a template into every string it describes, in lexical order
///
/// # Errors
/// `DssError::InvalidTemplate` for malformed ranges or when the expansion
/// would exceed `max_expansion` strings
pub fn expand_template(template: &str, max_expansion: usize) -> DssResult<Vec<String>> {
    let parts = parse_template(template)?;

    let mut total: usize = 1;
    for part in &parts {
        if let Part::Range(lo, hi) = part {
            let width = (*hi as usize) - (*lo as usize) + 1;
            total = total.saturating_mul(width);
        }
    }
    if total > max_expansion {
        return Err(DssError::invalid_template(
            template,
            format!("expands to {total} strings, limit is {max_expansion}"),
        ));
    }

    let mut out = vec![String::new()];
    for part in &parts {
        match part {
            Part::Literal(c) => out.iter_mut().for_each(|s| s.push(*c)),
            Part::Range(lo, hi) => {
                out = out
                    .iter()
                    .flat_map(|s| {
                        (*lo..=*hi).map(move |c| {
                            let mut next = s.clone();
                            next.push(c);
                            next
                        })
                    })
                    .collect();
            }
        }
    }
    Ok(out)
}

/// Reservation of pooled resource strings within one namespace
#[derive(Debug, Clone)]
pub struct ResourcePool {
    dss: DynamicStatusStore,
    key_prefix: String,
    max_expansion: usize,
}

impl ResourcePool {
    /// Create pool; taken strings are tracked under `key_prefix`
    #[must_use]
    pub fn new(dss: DynamicStatusStore, key_prefix: impl Into<String>) -> Self {
        Self {
            dss,
            key_prefix: key_prefix.into(),
            max_expansion: DEFAULT_MAX_EXPANSION,
        }
    }

    /// With expansion cap per template
    #[inline]
    #[must_use]
    pub fn with_max_expansion(mut self, max_expansion: usize) -> Self {
        self.max_expansion = max_expansion;
        self
    }

    /// Strings described by `templates` that are neither taken nor rejected
    ///
    /// # Errors
    /// Template or store errors
    pub fn free(&self, templates: &[&str], rejected: &BTreeSet<String>) -> DssResult<Vec<String>> {
        let taken = self.dss.get_prefix(&self.key_prefix)?;
        let mut seen = BTreeSet::new();
        let mut free = Vec::new();
        for template in templates {
            for candidate in expand_template(template, self.max_expansion)? {
                let key = format!("{}{candidate}", self.key_prefix);
                if taken.contains_key(&key) || rejected.contains(&candidate) {
                    continue;
                }
                if seen.insert(candidate.clone()) {
                    free.push(candidate);
                }
            }
        }
        Ok(free)
    }

    /// Claim `count` free strings for `owner`
    ///
    /// Each claim adds `<key_prefix><string>=<owner>` in the namespace and
    /// `<string>.owner=<owner>` in the resource tree, all in one batch. A lost
    /// race picks again from a fresh read.
    ///
    /// # Errors
    /// - `DssError::PoolExhausted` if fewer than `count` strings are free
    /// - `DssError::RetryExhausted` if every attempt lost a race
    pub fn reserve(
        &self,
        templates: &[&str],
        count: usize,
        rejected: &BTreeSet<String>,
        owner: &str,
        budget: &RetryBudget,
    ) -> DssResult<Vec<String>> {
        let claimed = cas_retry(budget, |attempt| {
            let free = self.free(templates, rejected)?;
            if free.len() < count {
                return Err(DssError::PoolExhausted {
                    requested: count,
                    available: free.len(),
                });
            }

            let picked: Vec<String> = free
                .choose_multiple(&mut rand::thread_rng(), count)
                .cloned()
                .collect();
            let actions: Vec<DssAction> = picked
                .iter()
                .flat_map(|s| {
                    [
                        DssAction::add(format!("{}{s}", self.key_prefix), owner),
                        DssAction::update_resource(format!("{s}.owner"), owner),
                    ]
                })
                .collect();

            match self.dss.perform_actions(&actions) {
                Ok(()) => Ok(CasAttempt::Done(picked)),
                Err(e) if e.is_match_failure() => {
                    debug!(attempt, "resource claim collided");
                    Ok(CasAttempt::Retry)
                }
                Err(e) => Err(e),
            }
        })?
        .unwrap_or_default();

        info!(namespace = %self.dss.namespace(), owner, resources = ?claimed, "reserved resources");
        Ok(claimed)
    }

    /// Release a string held by `owner`
    ///
    /// # Errors
    /// `DssError::Match` if the string is not held by `owner`
    pub fn release(&self, resource: &str, owner: &str) -> DssResult<()> {
        self.dss.perform_actions(&[
            DssAction::delete_if(format!("{}{resource}", self.key_prefix), owner),
            DssAction::delete_resource_prefix(format!("{resource}.")),
        ])?;
        debug!(namespace = %self.dss.namespace(), resource, owner, "released resource");
        Ok(())
    }
}
