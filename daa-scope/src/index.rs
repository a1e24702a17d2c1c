// Scope index construction, shared by every grammar.
//
// Adapters report declarations; this module settles their line ranges
// (exact or inferred), attaches parent names, and emits a whole-file entry
// when a file declares nothing.

use std::path::Path;

use tracing::debug;

use crate::languages::helpers::{first_error, start_line};
use crate::languages::{Declaration, EndLines, LanguageRegistry, LanguageSupport};
use crate::{Result, ScopeEntry, ScopeError, ScopeKind, bare_filename};

/// Builds the scope entries of one source file.
#[derive(Debug, Default)]
pub struct ScopeIndexBuilder {
    registry: LanguageRegistry,
}

impl ScopeIndexBuilder {
    pub fn new() -> Self {
        Self {
            registry: LanguageRegistry::new(),
        }
    }

    /// Whether `path` has an extension some registered grammar handles.
    pub fn supports(&self, path: &Path) -> bool {
        self.registry.for_file(path).is_some()
    }

    /// Parse `source` with the grammar matching `path` and build its entries.
    pub fn build(&self, path: &Path, source: &str) -> Result<Vec<ScopeEntry>> {
        let lang = self
            .registry
            .for_file(path)
            .ok_or_else(|| ScopeError::UnsupportedLanguage(path.display().to_string()))?;
        build_entries(lang.as_ref(), path, source)
    }
}

/// Build the scope entries of one file with an explicit grammar adapter.
pub fn build_entries(
    lang: &dyn LanguageSupport,
    path: &Path,
    source: &str,
) -> Result<Vec<ScopeEntry>> {
    let tree = parse(lang, path, source)?;
    let line_count = source.lines().count();
    let decls = lang.declarations(&tree, source);

    if decls.is_empty() {
        return Ok(vec![whole_file_entry(lang.whole_file_kind(), path, line_count)]);
    }

    let ends: Vec<usize> = match lang.end_lines() {
        EndLines::Exact => decls
            .iter()
            .map(|d| d.end_line.unwrap_or(d.start_line))
            .collect(),
        EndLines::Inferred => infer_end_lines(&decls, line_count),
    };

    let entries: Vec<ScopeEntry> = decls
        .iter()
        .zip(ends)
        .map(|(decl, end_line)| ScopeEntry {
            file_path: path.to_path_buf(),
            kind: decl.kind,
            name: Some(decl.name.clone()),
            start_line: decl.start_line,
            end_line,
            parent_name: decl.parent.map(|p| decls[p].name.clone()),
        })
        .collect();

    debug!(
        path = %path.display(),
        language = lang.id(),
        entries = entries.len(),
        "Built scope index"
    );
    Ok(entries)
}

fn parse(lang: &dyn LanguageSupport, path: &Path, source: &str) -> Result<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&lang.tree_sitter_language())
        .map_err(|e| ScopeError::TreeSitter(e.to_string()))?;

    let tree = parser.parse(source, None).ok_or_else(|| ScopeError::Parse {
        path: path.display().to_string(),
        message: "parser produced no tree".to_string(),
    })?;

    if let Some(bad) = first_error(tree.root_node()) {
        return Err(ScopeError::Parse {
            path: path.display().to_string(),
            message: format!("syntax error at line {}", start_line(bad)),
        });
    }
    Ok(tree)
}

fn whole_file_entry(kind: ScopeKind, path: &Path, line_count: usize) -> ScopeEntry {
    let name = match kind {
        ScopeKind::Module => None,
        _ => Some(bare_filename(&path.to_string_lossy()).to_string()),
    };
    ScopeEntry {
        file_path: path.to_path_buf(),
        kind,
        name,
        start_line: 0,
        end_line: line_count,
        parent_name: None,
    }
}

/// Infer end lines for adapters that only know where declarations start.
///
/// Type-level declarations and members form two groups, each sorted by start
/// line. Inside a group an entry ends the line before its successor starts,
/// and the last one ends at `line_count`. Members are then clamped to their
/// parent's end, since the member group spans every type in the file.
fn infer_end_lines(decls: &[Declaration], line_count: usize) -> Vec<usize> {
    let mut ends = vec![line_count; decls.len()];

    let (types, members): (Vec<usize>, Vec<usize>) =
        (0..decls.len()).partition(|&i| decls[i].parent.is_none());

    for mut group in [types, members] {
        group.sort_by_key(|&i| (decls[i].start_line, i));
        for pair in group.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            // Two declarations on one line would otherwise end before they start.
            ends[current] = decls[next]
                .start_line
                .saturating_sub(1)
                .max(decls[current].start_line);
        }
        if let Some(&last) = group.last() {
            ends[last] = line_count.max(decls[last].start_line);
        }
    }

    for (i, decl) in decls.iter().enumerate() {
        if let Some(parent) = decl.parent {
            ends[i] = ends[i].min(ends[parent]).max(decl.start_line);
        }
    }

    ends
}
