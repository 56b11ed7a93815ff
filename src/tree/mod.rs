//! C2: selection tree.
//!
//! Stores rules keyed by the directory prefix (anchor) they apply to and
//! answers descent/match queries during traversal; also receives completed
//! records from the tree-insertion consumer (spec §4.2).
//!
//! Nodes live in a flat arena (`Vec<Node>`) indexed by [`NodeId`] rather than
//! as an `Rc`/`RefCell` graph — parents are non-owning indices, children own
//! downward via a name-keyed map, matching the "parent = non-owning handle
//! (arena index or equivalent)" guidance of spec §9 "Cyclic references".

mod node;

pub use node::{MatchResult, NodeId};

use std::path::{Component, Path, PathBuf};

use node::Node;

use crate::core::errors::{Result, ScanError};
use crate::record::CompletedRecord;
use crate::rules::matcher::{self, LimitStatus, LocalVerdict};
use crate::rules::rule::{EntryKind, Rule, RuleKind};

/// Split a relative path into its `/`-joined string segments, in order.
///
/// Both Unix and (syntactically) Windows-style inputs are accepted since
/// rule anchors and recorded paths are always relative (never carry a root
/// or prefix component at this layer).
fn segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn join(segments: &[String]) -> String {
    segments.join("/")
}

/// The in-memory selection tree (spec §3 "Selection tree node", §4.2).
///
/// Rule installation is pre-scan only; once [`SelectionTree::freeze`] is
/// called, `install_rule` returns `ScanError::RuleInstalledAfterStart` and
/// only `attach_record` may still mutate the tree (invariant 5 of §3).
pub struct SelectionTree {
    nodes: Vec<Node>,
    root: NodeId,
    frozen: bool,
}

impl Default for SelectionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionTree {
    #[must_use]
    pub fn new() -> Self {
        let root = Node::new(None);
        Self {
            nodes: vec![root],
            root: NodeId(0),
            frozen: false,
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Materialize (or find) the node chain for `segs`, allocating any
    /// missing ancestors along the way.
    fn ensure_path(&mut self, segs: &[String]) -> NodeId {
        let mut current = self.root;
        for seg in segs {
            if let Some(&child) = self.node(current).children.get(seg) {
                current = child;
            } else {
                let id = NodeId(self.nodes.len());
                self.nodes.push(Node::new(Some(current)));
                self.node_mut(current).children.insert(seg.clone(), id);
                current = id;
            }
        }
        current
    }

    fn find_path(&self, segs: &[String]) -> Option<NodeId> {
        let mut current = self.root;
        for seg in segs {
            current = *self.node(current).children.get(seg)?;
        }
        Some(current)
    }

    /// Freeze rule installation. Called once at scan start (spec §3
    /// lifecycle: "Rules ... frozen before any scan begins").
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Install a compiled rule at `anchor_path`, materializing ancestor
    /// nodes as needed (spec §4.2 `install_rule`). Pre-scan only.
    pub fn install_rule(&mut self, anchor_path: &Path, rule: Rule) -> Result<()> {
        if self.frozen {
            return Err(ScanError::RuleInstalledAfterStart {
                anchor: anchor_path.display().to_string(),
            });
        }
        let segs = segments(anchor_path);
        let id = self.ensure_path(&segs);
        self.node_mut(id).push_rule(rule);
        Ok(())
    }

    /// Look up an existing interior node for `relative_path`, if the tree
    /// already has structure there (spec §4.2 `lookup_node`) — used by the
    /// traversal driver to decide descent for an otherwise-`NO_MATCH` path.
    #[must_use]
    pub fn lookup_node(&self, relative_path: &Path) -> Option<NodeId> {
        self.find_path(&segments(relative_path))
    }

    /// Classify `relative_path` against the installed rule tree (spec
    /// §4.2). Returns the combined [`MatchResult`] and, when a positive rule
    /// fired, the attribute mask it requests.
    #[must_use]
    pub fn classify(&self, relative_path: &Path, entry_kind: EntryKind) -> (MatchResult, Option<Rule>) {
        let segs = segments(relative_path);

        let mut current = self.root;
        let mut depth = 0usize;
        let mut best: Option<(MatchResult, Rule)> = None;
        let mut limit_denied = false;
        let mut limit_partial = false;

        loop {
            let node = self.node(current);
            let sub_path = join(&segs[depth..]);

            let limit_here = matcher::evaluate_limit(&sub_path, entry_kind, &node.limit);
            match limit_here {
                LimitStatus::Allowed => {}
                LimitStatus::Partial => limit_partial = true,
                LimitStatus::Denied => {
                    limit_denied = true;
                    break;
                }
                LimitStatus::NotApplicable => {}
            }

            let verdict = matcher::evaluate_positive(
                &sub_path,
                entry_kind,
                &node.negative,
                &node.selective,
                &node.equal,
            );
            match verdict {
                LocalVerdict::Excluded => return (MatchResult::NoMatch, None),
                LocalVerdict::Selective(rule) => {
                    best = Some((MatchResult::SelectiveMatch, rule.clone()));
                }
                LocalVerdict::Equal(rule) => {
                    best = Some((MatchResult::EqualMatch, rule.clone()));
                }
                LocalVerdict::None => {}
            }

            if depth >= segs.len() {
                break;
            }
            match node.children.get(&segs[depth]) {
                Some(&child) => {
                    current = child;
                    depth += 1;
                }
                None => break,
            }
        }

        if limit_denied {
            return (MatchResult::NoLimitMatch, None);
        }
        if let Some((result, rule)) = best {
            return (result, Some(rule));
        }
        if limit_partial {
            return (MatchResult::PartialLimitMatch, None);
        }

        let node = self.node(current);
        let remaining = join(&segs[depth.min(segs.len())..]);
        let reachable = matcher::reachable_positive(&remaining, &node.selective, &node.equal)
            || (depth >= segs.len() && !node.children.is_empty());

        if reachable {
            (MatchResult::PartialMatch, None)
        } else {
            (MatchResult::NoMatch, None)
        }
    }

    /// Attach a completed record to the node for its path, allocating the
    /// node if necessary (spec §4.2 `attach_record`). Setting a record twice
    /// for the same path is a programming error (invariant 3 of §3) and
    /// returns `ScanError::DuplicateAttach` rather than overwriting.
    pub fn attach_record(&mut self, path_in_tree: &Path, record: CompletedRecord) -> Result<()> {
        let segs = segments(path_in_tree);
        let id = self.ensure_path(&segs);
        let node = self.node_mut(id);
        if node.record.is_some() {
            return Err(ScanError::DuplicateAttach {
                path: path_in_tree.to_path_buf(),
            });
        }
        node.record = Some(record);
        node.checked = true;
        self.mark_ancestors_checked(id);
        Ok(())
    }

    fn mark_ancestors_checked(&mut self, mut id: NodeId) {
        while let Some(parent) = self.node(id).parent {
            self.node_mut(parent).checked = true;
            id = parent;
        }
    }

    /// The completed record attached at `relative_path`, if any.
    #[must_use]
    pub fn record_at(&self, relative_path: &Path) -> Option<&CompletedRecord> {
        self.find_path(&segments(relative_path))
            .and_then(|id| self.node(id).record.as_ref())
    }

    /// Total number of records attached anywhere in the tree.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.record.is_some()).count()
    }

    /// Children of `relative_path`'s node, sorted by name — used to confirm
    /// spec §8's "record order within a node's children reflects sorted
    /// directory order" property in tests.
    #[must_use]
    pub fn child_names(&self, relative_path: &Path) -> Vec<String> {
        let Some(id) = self.find_path(&segments(relative_path)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self.node(id).children.keys().cloned().collect();
        names.sort();
        names
    }

    /// Full relative paths of every node carrying a completed record,
    /// sorted — used by tests and by the database hand-off (spec §6).
    #[must_use]
    pub fn all_record_paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        self.collect_record_paths(self.root, &mut PathBuf::new(), &mut out);
        out.sort();
        out
    }

    fn collect_record_paths(&self, id: NodeId, prefix: &mut PathBuf, out: &mut Vec<PathBuf>) {
        let node = self.node(id);
        if node.record.is_some() {
            out.push(prefix.clone());
        }
        let mut names: Vec<&String> = node.children.keys().collect();
        names.sort();
        for name in names {
            let child = node.children[name];
            prefix.push(name);
            self.collect_record_paths(child, prefix, out);
            prefix.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::rule::{AttrMask, EntryKindMask};

    fn rule(pattern: &str, kind: RuleKind) -> Rule {
        Rule::new("", pattern, kind, AttrMask::ALL, EntryKindMask::ANY).unwrap()
    }

    #[test]
    fn scenario_1_selective_bin() {
        let mut tree = SelectionTree::new();
        tree.install_rule(Path::new(""), rule("^bin/.*$", RuleKind::Selective))
            .unwrap();
        tree.freeze();

        let (result, _) = tree.classify(Path::new("bin"), EntryKind::Dir);
        assert_eq!(result, MatchResult::SelectiveMatch);

        let (result, _) = tree.classify(Path::new("bin/a"), EntryKind::File);
        assert_eq!(result, MatchResult::SelectiveMatch);

        let (result, _) = tree.classify(Path::new("etc"), EntryKind::Dir);
        assert_eq!(result, MatchResult::NoMatch);

        let (result, _) = tree.classify(Path::new("etc/c"), EntryKind::File);
        assert_eq!(result, MatchResult::NoMatch);
    }

    #[test]
    fn scenario_2_selective_with_exclude() {
        let mut tree = SelectionTree::new();
        tree.install_rule(Path::new(""), rule("^var/.*$", RuleKind::Selective))
            .unwrap();
        tree.install_rule(Path::new(""), rule("^var/cache/", RuleKind::Negative))
            .unwrap();
        tree.freeze();

        assert_eq!(
            tree.classify(Path::new("var"), EntryKind::Dir).0,
            MatchResult::SelectiveMatch
        );
        assert_eq!(
            tree.classify(Path::new("var/log"), EntryKind::Dir).0,
            MatchResult::SelectiveMatch
        );
        assert_eq!(
            tree.classify(Path::new("var/log/x"), EntryKind::File).0,
            MatchResult::SelectiveMatch
        );
        assert_eq!(
            tree.classify(Path::new("var/cache"), EntryKind::Dir).0,
            MatchResult::NoMatch
        );
        assert_eq!(
            tree.classify(Path::new("var/cache/y"), EntryKind::File).0,
            MatchResult::NoMatch
        );
    }

    #[test]
    fn scenario_3_equal_rule_stops_descent_semantics() {
        let mut tree = SelectionTree::new();
        tree.install_rule(Path::new(""), rule("^etc/hosts$", RuleKind::Equal))
            .unwrap();
        tree.freeze();

        assert_eq!(
            tree.classify(Path::new("etc/hosts"), EntryKind::File).0,
            MatchResult::EqualMatch
        );
        assert_eq!(
            tree.classify(Path::new("etc/passwd"), EntryKind::File).0,
            MatchResult::NoMatch
        );
    }

    #[test]
    fn scenario_4_limit_confines_selective() {
        let mut tree = SelectionTree::new();
        tree.install_rule(Path::new(""), rule("^a/.*$", RuleKind::Selective))
            .unwrap();
        tree.install_rule(Path::new(""), rule("^a/b/", RuleKind::Limit))
            .unwrap();
        tree.freeze();

        assert_eq!(
            tree.classify(Path::new("a"), EntryKind::Dir).0,
            MatchResult::SelectiveMatch
        );
        assert_eq!(
            tree.classify(Path::new("a/b"), EntryKind::Dir).0,
            MatchResult::SelectiveMatch
        );
        assert_eq!(
            tree.classify(Path::new("a/b/1"), EntryKind::File).0,
            MatchResult::SelectiveMatch
        );
        assert_eq!(
            tree.classify(Path::new("a/c"), EntryKind::Dir).0,
            MatchResult::NoLimitMatch
        );
        assert_eq!(
            tree.classify(Path::new("a/c/2"), EntryKind::File).0,
            MatchResult::NoLimitMatch
        );
    }

    #[test]
    fn deeper_exclude_overrides_shallower_selective() {
        let mut tree = SelectionTree::new();
        tree.install_rule(Path::new(""), rule("^a/.*$", RuleKind::Selective))
            .unwrap();
        tree.install_rule(Path::new("a"), rule("^secret$", RuleKind::Negative))
            .unwrap();
        tree.freeze();

        assert_eq!(
            tree.classify(Path::new("a/secret"), EntryKind::File).0,
            MatchResult::NoMatch
        );
        assert_eq!(
            tree.classify(Path::new("a/public"), EntryKind::File).0,
            MatchResult::SelectiveMatch
        );
    }

    #[test]
    fn partial_match_when_descendant_rule_reachable() {
        let mut tree = SelectionTree::new();
        tree.install_rule(Path::new(""), rule("^a/b/.*$", RuleKind::Selective))
            .unwrap();
        tree.freeze();

        assert_eq!(
            tree.classify(Path::new("a"), EntryKind::Dir).0,
            MatchResult::PartialMatch
        );
    }

    #[test]
    fn attach_record_then_lookup() {
        let mut tree = SelectionTree::new();
        tree.freeze();
        let record = CompletedRecord::new(PathBuf::from("a/b"), EntryKind::File, AttrMask::ALL);
        tree.attach_record(Path::new("a/b"), record).unwrap();

        assert!(tree.record_at(Path::new("a/b")).is_some());
        assert!(tree.lookup_node(Path::new("a")).is_some());
    }

    #[test]
    fn duplicate_attach_is_an_error() {
        let mut tree = SelectionTree::new();
        tree.freeze();
        let record = CompletedRecord::new(PathBuf::from("a"), EntryKind::File, AttrMask::ALL);
        tree.attach_record(Path::new("a"), record.clone()).unwrap();
        let err = tree.attach_record(Path::new("a"), record).unwrap_err();
        assert_eq!(err.code(), "AIDE-3001");
    }

    #[test]
    fn install_rule_after_freeze_is_rejected() {
        let mut tree = SelectionTree::new();
        tree.freeze();
        let err = tree
            .install_rule(Path::new(""), rule("^x$", RuleKind::Selective))
            .unwrap_err();
        assert_eq!(err.code(), "AIDE-3002");
    }

    #[test]
    fn child_names_are_sorted() {
        let mut tree = SelectionTree::new();
        tree.freeze();
        for name in ["b", "a", "c"] {
            let record =
                CompletedRecord::new(PathBuf::from(name), EntryKind::File, AttrMask::ALL);
            tree.attach_record(Path::new(name), record).unwrap();
        }
        assert_eq!(tree.child_names(Path::new("")), vec!["a", "b", "c"]);
    }
}
