use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::finding::{Finding, RuleIdentity};

/// How precisely a finding must reappear to count as still present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Rule identity plus file and context.
    #[default]
    Context,
    /// Rule identity only, anywhere in the package.
    Package,
}

/// Equality key of a finding under one granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    identity: RuleIdentity,
    location: Option<(String, String)>,
}

impl MatchKey {
    pub fn new(finding: &Finding, granularity: Granularity) -> Self {
        let location = match granularity {
            Granularity::Context => Some((finding.filename_clean.clone(), finding.context.clone())),
            Granularity::Package => None,
        };
        Self {
            identity: finding.identity(),
            location,
        }
    }
}

/// Exact-match presence test against one revision's findings.
///
/// Keys of the other revision are hashed once, so testing a whole revision
/// is linear in both sizes.
#[derive(Debug, Clone)]
pub struct FindingMatcher {
    granularity: Granularity,
    keys: HashSet<MatchKey>,
}

impl FindingMatcher {
    pub fn new(granularity: Granularity, other: &[Finding]) -> Self {
        Self {
            granularity,
            keys: other.iter().map(|f| MatchKey::new(f, granularity)).collect(),
        }
    }

    pub fn still_present(&self, finding: &Finding) -> bool {
        self.keys.contains(&MatchKey::new(finding, self.granularity))
    }

    /// One verdict per finding, in input order.
    pub fn verdicts(&self, findings: &[Finding]) -> Vec<MatchVerdict> {
        findings
            .iter()
            .enumerate()
            .map(|(index, f)| MatchVerdict::new(index, f, self.still_present(f)))
            .collect()
    }
}

/// Exact-match verdict for one previous-revision finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchVerdict {
    pub index: usize,
    pub filename_clean: String,
    pub context: String,
    pub start_line: usize,
    pub identity: RuleIdentity,
    pub still_present: bool,
    pub resolved: bool,
}

impl MatchVerdict {
    pub fn new(index: usize, finding: &Finding, still_present: bool) -> Self {
        Self {
            index,
            filename_clean: finding.filename_clean.clone(),
            context: finding.context.clone(),
            start_line: finding.start_line,
            identity: finding.identity(),
            still_present,
            resolved: !still_present,
        }
    }
}
