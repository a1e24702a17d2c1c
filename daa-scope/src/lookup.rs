use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::{ScopeEntry, ScopeKind, bare_filename};

/// How a line's context was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Exactly one scope contains the line.
    Enclosed,
    /// A class and one of its methods contain the line.
    Qualified,
    /// No scope contains the line; the bare filename is used.
    Unscoped,
    /// Overlap that is not a class/method pair; the narrowest scope won.
    Ambiguous { candidates: usize },
}

/// Context resolved for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub context: String,
    pub outcome: LookupOutcome,
}

/// Line-to-context resolution over one file's scope entries.
#[derive(Debug, Clone, Copy)]
pub struct ScopeLookup<'a> {
    file_name: &'a str,
    entries: &'a [ScopeEntry],
}

impl<'a> ScopeLookup<'a> {
    /// `path` is only used for its last segment, the fallback context.
    pub fn new(path: &'a str, entries: &'a [ScopeEntry]) -> Self {
        Self {
            file_name: bare_filename(path),
            entries,
        }
    }

    /// Resolve the context for `line`. Never fails; the worst case is the
    /// bare filename.
    pub fn resolve(&self, line: usize) -> Resolution {
        let candidates: Vec<&ScopeEntry> =
            self.entries.iter().filter(|e| e.contains(line)).collect();

        match candidates.as_slice() {
            [] => self.unscoped(),
            [only] => Resolution {
                context: self.plain_name(only),
                outcome: LookupOutcome::Enclosed,
            },
            [a, b] => match class_method_pair(a, b) {
                Some((class, method)) => Resolution {
                    context: format!(
                        "{}.{}",
                        self.plain_name(class),
                        self.plain_name(method)
                    ),
                    outcome: LookupOutcome::Qualified,
                },
                None => self.narrowest(&candidates),
            },
            _ => self.narrowest(&candidates),
        }
    }

    fn unscoped(&self) -> Resolution {
        Resolution {
            context: self.file_name.to_string(),
            outcome: LookupOutcome::Unscoped,
        }
    }

    fn plain_name(&self, entry: &ScopeEntry) -> String {
        if entry.kind.is_whole_file() {
            return self.file_name.to_string();
        }
        entry
            .name
            .clone()
            .unwrap_or_else(|| self.file_name.to_string())
    }

    /// Narrowest range wins; ties go to the later start, then the more
    /// specific kind.
    fn narrowest(&self, candidates: &[&ScopeEntry]) -> Resolution {
        let winner = candidates
            .iter()
            .min_by_key(|e| (e.width(), Reverse(e.start_line), Reverse(e.kind.specificity())));

        match winner {
            Some(entry) => Resolution {
                context: entry.context_name(self.file_name),
                outcome: LookupOutcome::Ambiguous {
                    candidates: candidates.len(),
                },
            },
            None => self.unscoped(),
        }
    }
}

fn class_method_pair<'e>(
    a: &'e ScopeEntry,
    b: &'e ScopeEntry,
) -> Option<(&'e ScopeEntry, &'e ScopeEntry)> {
    match (a.kind, b.kind) {
        (ScopeKind::Class, ScopeKind::Method) => Some((a, b)),
        (ScopeKind::Method, ScopeKind::Class) => Some((b, a)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use proptest::prelude::*;

    use super::*;

    fn entry(kind: ScopeKind, name: &str, start: usize, end: usize, parent: Option<&str>) -> ScopeEntry {
        ScopeEntry {
            file_path: PathBuf::from("pkg/mod.py"),
            kind,
            name: Some(name.to_string()),
            start_line: start,
            end_line: end,
            parent_name: parent.map(str::to_string),
        }
    }

    #[test]
    fn single_match_returns_its_name() {
        let entries = vec![entry(ScopeKind::Function, "f", 1, 3, None)];
        let r = ScopeLookup::new("pkg/mod.py", &entries).resolve(2);
        assert_eq!(r.context, "f");
        assert_eq!(r.outcome, LookupOutcome::Enclosed);
    }

    #[test]
    fn class_method_pair_is_qualified_in_either_order() {
        let entries = vec![
            entry(ScopeKind::Method, "m", 5, 8, Some("C")),
            entry(ScopeKind::Class, "C", 4, 10, None),
        ];
        let r = ScopeLookup::new("pkg/mod.py", &entries).resolve(6);
        assert_eq!(r.context, "C.m");
        assert_eq!(r.outcome, LookupOutcome::Qualified);
    }

    #[test]
    fn no_match_falls_back_to_filename() {
        let entries = vec![entry(ScopeKind::Function, "f", 1, 3, None)];
        let r = ScopeLookup::new("pkg/sub/mod.py", &entries).resolve(40);
        assert_eq!(r.context, "mod.py");
        assert_eq!(r.outcome, LookupOutcome::Unscoped);

        let r = ScopeLookup::new("pkg/sub/mod.py", &[]).resolve(1);
        assert_eq!(r.context, "mod.py");
    }

    #[test]
    fn whole_file_entries_render_as_filename() {
        let mut module = entry(ScopeKind::Module, "ignored", 0, 12, None);
        module.name = None;
        let entries = vec![module];
        let r = ScopeLookup::new("pkg/mod.py", &entries).resolve(0);
        assert_eq!(r.context, "mod.py");
        assert_eq!(r.outcome, LookupOutcome::Enclosed);
    }

    #[test]
    fn deep_overlap_prefers_narrowest() {
        // Outer class, nested class member, and a method that all overlap line 6.
        let entries = vec![
            entry(ScopeKind::Class, "Outer", 1, 20, None),
            entry(ScopeKind::Method, "Inner", 3, 10, Some("Outer")),
            entry(ScopeKind::Method, "run", 6, 6, Some("Outer")),
        ];
        let r = ScopeLookup::new("Outer.java", &entries).resolve(6);
        assert_eq!(r.context, "Outer.run");
        assert_eq!(r.outcome, LookupOutcome::Ambiguous { candidates: 3 });
    }

    #[test]
    fn full_tie_keeps_the_first_entry() {
        let entries = vec![
            entry(ScopeKind::Class, "A", 1, 1, None),
            entry(ScopeKind::Class, "B", 1, 1, None),
        ];
        let r = ScopeLookup::new("AB.java", &entries).resolve(1);
        assert_eq!(r.outcome, LookupOutcome::Ambiguous { candidates: 2 });
        assert_eq!(r.context, "A");
    }

    #[test]
    fn equal_width_tie_goes_to_later_start() {
        let early = entry(ScopeKind::Function, "early", 1, 3, None);
        let late = entry(ScopeKind::Function, "late", 2, 4, None);

        for entries in [vec![early.clone(), late.clone()], vec![late, early]] {
            let r = ScopeLookup::new("m.py", &entries).resolve(3);
            assert_eq!(r.outcome, LookupOutcome::Ambiguous { candidates: 2 });
            assert_eq!(r.context, "late");
        }
    }

    #[test]
    fn same_range_tie_goes_to_more_specific_kind() {
        let class = entry(ScopeKind::Class, "C", 4, 6, None);
        let function = entry(ScopeKind::Function, "f", 4, 6, None);
        let method = entry(ScopeKind::Method, "m", 4, 6, Some("P"));

        for entries in [
            vec![class.clone(), function.clone()],
            vec![function.clone(), class.clone()],
        ] {
            let r = ScopeLookup::new("m.py", &entries).resolve(5);
            assert_eq!(r.outcome, LookupOutcome::Ambiguous { candidates: 2 });
            assert_eq!(r.context, "f");
        }

        let entries = vec![class, function, method];
        let r = ScopeLookup::new("m.py", &entries).resolve(5);
        assert_eq!(r.outcome, LookupOutcome::Ambiguous { candidates: 3 });
        assert_eq!(r.context, "P.m");
    }

    fn arb_entries() -> impl Strategy<Value = Vec<ScopeEntry>> {
        let kind = prop_oneof![
            Just(ScopeKind::Class),
            Just(ScopeKind::Function),
            Just(ScopeKind::Method),
            Just(ScopeKind::Module),
        ];
        prop::collection::vec((kind, 0usize..60, 0usize..20), 0..8).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (kind, start, len))| ScopeEntry {
                    file_path: PathBuf::from("f.py"),
                    kind,
                    name: if kind == ScopeKind::Module {
                        None
                    } else {
                        Some(format!("s{i}"))
                    },
                    start_line: start,
                    end_line: start + len,
                    parent_name: (kind == ScopeKind::Method).then(|| "P".to_string()),
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn resolve_never_returns_empty(entries in arb_entries(), line in 1usize..100) {
            let r = ScopeLookup::new("dir/f.py", &entries).resolve(line);
            prop_assert!(!r.context.is_empty());
        }
    }
}
