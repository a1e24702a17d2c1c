use crate::ScopeKind;

use super::helpers::{child_by_field, declared_name, find_child_by_kind, named_children, start_line};
use super::{Declaration, EndLines, LanguageSupport};

/// Declarations that open a type at the top of a compilation unit.
const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Members of a type body that get their own scope.
const MEMBER_DECLARATIONS: &[&str] = &[
    "constructor_declaration",
    "compact_constructor_declaration",
    "method_declaration",
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

#[derive(Debug)]
pub struct JavaSupport;

impl LanguageSupport for JavaSupport {
    fn id(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_java::LANGUAGE.into()
    }

    // Ranges are derived from where the next declaration starts, so trailing
    // comments and javadoc of the following member land in the previous one.
    fn end_lines(&self) -> EndLines {
        EndLines::Inferred
    }

    fn whole_file_kind(&self) -> ScopeKind {
        ScopeKind::File
    }

    fn declarations(&self, tree: &tree_sitter::Tree, source: &str) -> Vec<Declaration> {
        let mut decls = Vec::new();

        for node in named_children(tree.root_node()) {
            if !TYPE_DECLARATIONS.contains(&node.kind()) {
                continue;
            }
            let Some(name) = declared_name(node, source) else {
                continue;
            };
            let type_idx = decls.len();
            decls.push(Declaration {
                kind: ScopeKind::Class,
                name,
                start_line: start_line(node),
                end_line: None,
                parent: None,
            });

            let Some(body) = child_by_field(node, "body") else {
                continue;
            };
            for member in member_list(body) {
                if !MEMBER_DECLARATIONS.contains(&member.kind()) {
                    continue;
                }
                let Some(name) = declared_name(member, source) else {
                    continue;
                };
                decls.push(Declaration {
                    kind: ScopeKind::Method,
                    name,
                    start_line: start_line(member),
                    end_line: None,
                    parent: Some(type_idx),
                });
            }
        }

        decls
    }
}

/// Members of a type body.
///
/// Enum bodies keep their members in a declaration list after the constants;
/// every other body is scanned directly.
fn member_list(body: tree_sitter::Node<'_>) -> Vec<tree_sitter::Node<'_>> {
    match find_child_by_kind(body, "enum_body_declarations") {
        Some(declarations) => named_children(declarations),
        None => named_children(body),
    }
}
