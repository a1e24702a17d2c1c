// Findings and tool report ingestion.
//
// Reports arrive as JSON arrays of records keyed by the tool's own column
// names. Values may be strings or numbers depending on how the rows were
// exported, so every column is read leniently and converted once here.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::IngestError;

/// Static-analysis tool a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Generic Python linter.
    Bandit,
    /// Cross-language analyzer.
    CodeQl,
    /// Java bug-pattern detector.
    SpotBugs,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Bandit, Tool::CodeQl, Tool::SpotBugs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bandit => "bandit",
            Self::CodeQl => "codeql",
            Self::SpotBugs => "spotbugs",
        }
    }

    /// Report columns that make up the rule identity, in key order.
    pub fn identity_columns(self) -> &'static [&'static str] {
        match self {
            Self::Bandit => &[
                "test_name",
                "test_id",
                "issue_severity",
                "issue_confidence",
                "issue_text",
            ],
            Self::CodeQl => &["name", "description", "severity"],
            Self::SpotBugs => &["category", "message", "severity"],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bandit" => Ok(Self::Bandit),
            "codeql" => Ok(Self::CodeQl),
            "spotbugs" => Ok(Self::SpotBugs),
            _ => Err(IngestError::UnknownTool(s.to_string())),
        }
    }
}

/// One reported static-analysis result.
///
/// The rule fields are shared across tools: `rule` holds the Bandit
/// `test_name`, the CodeQL `name` or the SpotBugs `category`; `description`
/// holds `issue_text`, `description` or the SpotBugs `message`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub tool: Tool,
    pub filename_raw: String,
    pub filename_clean: String,
    pub rule: String,
    pub rule_id: Option<String>,
    pub description: String,
    pub severity: String,
    pub confidence: Option<String>,
    pub message: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    /// Resolved scope name, or the bare filename. Empty until enriched.
    pub context: String,
}

impl Finding {
    /// The rule identity this finding is grouped under at package level.
    pub fn identity(&self) -> RuleIdentity {
        match self.tool {
            Tool::Bandit => RuleIdentity {
                rule: self.rule.clone(),
                rule_id: self.rule_id.clone(),
                severity: self.severity.clone(),
                confidence: self.confidence.clone(),
                description: self.description.clone(),
            },
            Tool::CodeQl | Tool::SpotBugs => RuleIdentity {
                rule: self.rule.clone(),
                rule_id: None,
                severity: self.severity.clone(),
                confidence: None,
                description: self.description.clone(),
            },
        }
    }
}

/// Tool-specific rule identity of a finding, location excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleIdentity {
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub description: String,
    pub severity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

impl fmt::Display for RuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule)?;
        if let Some(id) = &self.rule_id {
            write!(f, " ({id})")?;
        }
        write!(f, " [{}", self.severity)?;
        if let Some(confidence) = &self.confidence {
            write!(f, "/{confidence}")?;
        }
        write!(f, "] {}", self.description)
    }
}

// ── Ingestion ─────────────────────────────────────────────────────

/// Read a report file for `tool`.
pub fn load_report(tool: Tool, path: &Path) -> Result<Vec<Finding>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let findings = parse_report(tool, &text, path)?;
    info!(tool = %tool, path = %path.display(), findings = findings.len(), "Loaded report");
    Ok(findings)
}

/// Decode report text. `origin` is only used in error messages.
pub fn parse_report(tool: Tool, text: &str, origin: &Path) -> Result<Vec<Finding>, IngestError> {
    let json_err = |source| IngestError::Json {
        path: origin.to_path_buf(),
        source,
    };
    match tool {
        Tool::Bandit => {
            let records: Vec<BanditRecord> = serde_json::from_str(text).map_err(json_err)?;
            records
                .into_iter()
                .enumerate()
                .map(|(i, r)| r.into_finding(i))
                .collect()
        }
        Tool::CodeQl => {
            let records: Vec<CodeQlRecord> = serde_json::from_str(text).map_err(json_err)?;
            Ok(records.into_iter().map(CodeQlRecord::into_finding).collect())
        }
        Tool::SpotBugs => {
            let records: Vec<SpotBugsRecord> = serde_json::from_str(text).map_err(json_err)?;
            records
                .into_iter()
                .enumerate()
                .map(|(i, r)| r.into_finding(i))
                .collect()
        }
    }
}

#[derive(Debug, Deserialize)]
struct BanditRecord {
    #[serde(default, deserialize_with = "opt_text")]
    filename: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    filename_clean: Option<String>,
    #[serde(deserialize_with = "text")]
    test_name: String,
    #[serde(default, deserialize_with = "opt_text")]
    test_id: Option<String>,
    #[serde(deserialize_with = "text")]
    issue_severity: String,
    #[serde(default, deserialize_with = "opt_text")]
    issue_confidence: Option<String>,
    #[serde(deserialize_with = "text")]
    issue_text: String,
    #[serde(default, deserialize_with = "line")]
    line_number: Option<usize>,
    #[serde(default)]
    line_range: Option<Value>,
}

impl BanditRecord {
    fn into_finding(self, index: usize) -> Result<Finding, IngestError> {
        let filename = self
            .filename
            .or(self.filename_clean)
            .ok_or(IngestError::MissingField {
                index,
                field: "filename",
            })?;
        let start_line = self.line_number.ok_or(IngestError::MissingField {
            index,
            field: "line_number",
        })?;
        let end_line = self
            .line_range
            .as_ref()
            .and_then(range_end)
            .map_or(start_line, |end| end.max(start_line));

        Ok(Finding {
            tool: Tool::Bandit,
            filename_clean: filename.clone(),
            filename_raw: filename,
            rule: self.test_name,
            rule_id: self.test_id,
            description: self.issue_text,
            severity: self.issue_severity,
            confidence: self.issue_confidence,
            message: None,
            start_line,
            end_line,
            context: String::new(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CodeQlRecord {
    #[serde(deserialize_with = "text")]
    name: String,
    #[serde(deserialize_with = "text")]
    description: String,
    #[serde(deserialize_with = "text")]
    severity: String,
    #[serde(default, deserialize_with = "opt_text")]
    message: Option<String>,
    #[serde(deserialize_with = "text")]
    path: String,
    #[serde(deserialize_with = "required_line")]
    start_line: usize,
    #[serde(default, deserialize_with = "line")]
    end_line: Option<usize>,
}

impl CodeQlRecord {
    fn into_finding(self) -> Finding {
        Finding {
            tool: Tool::CodeQl,
            filename_clean: self.path.clone(),
            filename_raw: self.path,
            rule: self.name,
            rule_id: None,
            description: self.description,
            severity: self.severity,
            confidence: None,
            message: self.message,
            start_line: self.start_line,
            end_line: self.end_line.map_or(self.start_line, |e| e.max(self.start_line)),
            context: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpotBugsRecord {
    #[serde(deserialize_with = "text")]
    category: String,
    #[serde(deserialize_with = "text")]
    severity: String,
    #[serde(deserialize_with = "text")]
    message: String,
    #[serde(rename = "fileName", default, deserialize_with = "opt_text")]
    file_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    source_filepath: Option<String>,
    #[serde(rename = "startLine", default, deserialize_with = "line")]
    start_line: Option<usize>,
    #[serde(rename = "endLine", default, deserialize_with = "line")]
    end_line: Option<usize>,
}

impl SpotBugsRecord {
    fn into_finding(self, index: usize) -> Result<Finding, IngestError> {
        let filename = self
            .source_filepath
            .or(self.file_name)
            .ok_or(IngestError::MissingField {
                index,
                field: "fileName",
            })?;
        // Class-level bugs carry no line; line 0 resolves to the whole file.
        let start_line = self.start_line.unwrap_or(0);

        Ok(Finding {
            tool: Tool::SpotBugs,
            filename_clean: filename.clone(),
            filename_raw: filename,
            rule: self.category,
            rule_id: None,
            description: self.message,
            severity: self.severity,
            confidence: None,
            message: None,
            start_line,
            end_line: self.end_line.map_or(start_line, |e| e.max(start_line)),
            context: String::new(),
        })
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn line<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    let value = Value::deserialize(d)?;
    match &value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        _ => line_value(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid line number: {value}"))),
    }
}

fn required_line<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    line(d)?.ok_or_else(|| serde::de::Error::custom("line number is empty"))
}

/// Line numbers exported through spreadsheets often come out as `12.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn line_value(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

/// Last line of a Bandit `line_range`, given as a list or its text form.
fn range_end(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => items.iter().filter_map(line_value).max(),
        Value::String(s) => s
            .trim_matches(|c| c == '[' || c == ']')
            .split(',')
            .filter_map(|part| part.trim().parse::<usize>().ok())
            .max(),
        _ => None,
    }
}
