use daa_scope::bare_filename;

use crate::config::NormalizeSection;
use crate::finding::Finding;

/// Field-level cleanup applied to every finding before matching.
///
/// Normalizing twice gives the same result as normalizing once.
#[derive(Debug, Clone)]
pub struct FindingNormalizer {
    strip_quotes: bool,
    prefixes: Vec<String>,
}

impl Default for FindingNormalizer {
    fn default() -> Self {
        Self::new(&NormalizeSection::default())
    }
}

impl FindingNormalizer {
    pub fn new(config: &NormalizeSection) -> Self {
        let mut normalizer = Self {
            strip_quotes: config.strip_quotes,
            prefixes: Vec::new(),
        };
        for prefix in &config.strip_prefixes {
            normalizer.add_prefix(prefix);
        }
        normalizer
    }

    /// Also strip `prefix`, typically the package root as the tool saw it.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.add_prefix(prefix);
        self
    }

    fn add_prefix(&mut self, prefix: &str) {
        let slashed = prefix.replace('\\', "/");
        let trimmed = trim_leading(slashed.trim_end_matches('/'));
        if !trimmed.is_empty() && !self.prefixes.iter().any(|p| p == trimmed) {
            self.prefixes.push(trimmed.to_string());
        }
    }

    pub fn normalize(&self, mut finding: Finding) -> Finding {
        if self.strip_quotes {
            finding.rule = strip_quotes(&finding.rule);
            finding.description = strip_quotes(&finding.description);
            finding.message = finding.message.as_deref().map(strip_quotes);
        }
        finding.filename_clean = self.clean_path(&finding.filename_raw);
        if finding.context.is_empty() {
            finding.context = fallback_context(&finding);
        }
        finding
    }

    /// Package-relative form of a reported path.
    ///
    /// Leading `./` and `/` are trimmed, then the longest prefix that covers
    /// whole leading segments is cut once. Segments past the prefix are never
    /// touched, so a package directory may repeat inside the path.
    pub fn clean_path(&self, raw: &str) -> String {
        let slashed = raw.replace('\\', "/");
        let path = trim_leading(&slashed);
        let rest = self
            .prefixes
            .iter()
            .filter_map(|prefix| leading_segments(path, prefix).map(|rest| (prefix.len(), rest)))
            .max_by_key(|(len, _)| *len)
            .map_or(path, |(_, rest)| trim_leading(rest));
        rest.to_string()
    }
}

/// Remove `'` and `"` characters.
pub fn strip_quotes(text: &str) -> String {
    text.chars().filter(|c| *c != '"' && *c != '\'').collect()
}

fn fallback_context(finding: &Finding) -> String {
    let path = if finding.filename_clean.is_empty() {
        &finding.filename_raw
    } else {
        &finding.filename_clean
    };
    bare_filename(path).to_string()
}

/// The part of `path` after `prefix` when `prefix` is its leading segments.
fn leading_segments<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    path.strip_prefix(prefix)?.strip_prefix('/')
}

fn trim_leading(mut path: &str) -> &str {
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            return path;
        }
    }
}
