use crate::ScopeKind;

use super::helpers::{child_by_field, declared_name, end_line, named_children, start_line};
use super::{Declaration, EndLines, LanguageSupport};

#[derive(Debug)]
pub struct PythonSupport;

impl LanguageSupport for PythonSupport {
    fn id(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn end_lines(&self) -> EndLines {
        EndLines::Exact
    }

    fn whole_file_kind(&self) -> ScopeKind {
        ScopeKind::Module
    }

    fn declarations(&self, tree: &tree_sitter::Tree, source: &str) -> Vec<Declaration> {
        let mut decls = Vec::new();

        // Only top-level definitions and the functions directly inside a
        // top-level class are indexed; deeper nesting is not resolved.
        for child in named_children(tree.root_node()) {
            let Some(def) = unwrap_decorated(child) else {
                continue;
            };
            match def.kind() {
                "function_definition" => {
                    if let Some(decl) = exact_declaration(def, source, ScopeKind::Function, None) {
                        decls.push(decl);
                    }
                }
                "class_definition" => {
                    let Some(class) = exact_declaration(def, source, ScopeKind::Class, None)
                    else {
                        continue;
                    };
                    let class_idx = decls.len();
                    decls.push(class);

                    let Some(body) = child_by_field(def, "body") else {
                        continue;
                    };
                    for member in named_children(body) {
                        let Some(member) = unwrap_decorated(member) else {
                            continue;
                        };
                        if member.kind() != "function_definition" {
                            continue;
                        }
                        if let Some(method) =
                            exact_declaration(member, source, ScopeKind::Method, Some(class_idx))
                        {
                            decls.push(method);
                        }
                    }
                }
                _ => {}
            }
        }

        decls
    }
}

/// Strip decorators so the range starts at the `def`/`class` line.
fn unwrap_decorated(node: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    if node.kind() == "decorated_definition" {
        child_by_field(node, "definition")
    } else {
        Some(node)
    }
}

fn exact_declaration(
    node: tree_sitter::Node<'_>,
    source: &str,
    kind: ScopeKind,
    parent: Option<usize>,
) -> Option<Declaration> {
    Some(Declaration {
        kind,
        name: declared_name(node, source)?,
        start_line: start_line(node),
        end_line: Some(end_line(node)),
        parent,
    })
}
