//! Selection tree node storage (spec §3 "Selection tree node").

use std::collections::BTreeMap;

use crate::record::CompletedRecord;
use crate::rules::rule::Rule;

/// Arena index into [`super::SelectionTree`]'s node storage. Non-owning —
/// parents hold a `NodeId`, children own the node itself via the arena Vec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(super) usize);

/// The combined verdict the selection tree produces for a path (spec §3
/// "Match result").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Deepest-matching ancestor is an equal rule: inspect, do not descend.
    EqualMatch,
    /// Deepest-matching ancestor is a selective rule: inspect and descend.
    SelectiveMatch,
    /// No ancestor matches, but a descendant could still yield a match.
    PartialMatch,
    /// Neither this path nor any descendant can match.
    NoMatch,
    /// A limit rule confines descent to a still-reachable subset.
    PartialLimitMatch,
    /// A limit rule exists and this subtree is entirely outside its reach.
    NoLimitMatch,
}

/// One node in the selection tree: a single path segment below its parent,
/// carrying the rules anchored here and (if matched) a completed record.
pub(super) struct Node {
    pub parent: Option<NodeId>,
    pub children: BTreeMap<String, NodeId>,
    pub negative: Vec<Rule>,
    pub selective: Vec<Rule>,
    pub equal: Vec<Rule>,
    pub limit: Vec<Rule>,
    /// Set once any rule at or under this node has matched at least one
    /// path (spec §3: "used to propagate descent").
    pub checked: bool,
    pub record: Option<CompletedRecord>,
}

impl Node {
    pub fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            children: BTreeMap::new(),
            negative: Vec::new(),
            selective: Vec::new(),
            equal: Vec::new(),
            limit: Vec::new(),
            checked: false,
            record: None,
        }
    }

    pub fn push_rule(&mut self, rule: Rule) {
        use crate::rules::rule::RuleKind;
        match rule.kind {
            RuleKind::Negative => self.negative.push(rule),
            RuleKind::Selective => self.selective.push(rule),
            RuleKind::Equal => self.equal.push(rule),
            RuleKind::Limit => self.limit.push(rule),
        }
    }
}
