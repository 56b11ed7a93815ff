//! C1: path matcher.
//!
//! Evaluates a single tree node's rule lists against a path relative to that
//! node's anchor. The selection tree (C2) walks the node chain from root to
//! the deepest installed ancestor and combines each node's local verdict into
//! an overall classification — this module only answers "what does this
//! one node's rules say about this one path".

use regex::Regex;

use crate::rules::rule::{EntryKind, Rule, RuleKind};

/// Local verdict of one node's rule lists against one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalVerdict<'a> {
    Excluded,
    Selective(&'a Rule),
    Equal(&'a Rule),
    None,
}

/// Whether a limit rule confines descent at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStatus {
    /// No limit rules at this node — unconstrained.
    NotApplicable,
    /// Path matches a limit rule outright.
    Allowed,
    /// No limit rule matches yet, but one could match something deeper under this path.
    Partial,
    /// No limit rule matches and none can reach this subtree — prune.
    Denied,
}

/// Test `rule.regex` against `sub_path`, and — for directories — also against
/// `sub_path` with a trailing slash appended.
///
/// The trailing-slash probe is what makes a wildcard selective rule like
/// `^bin/.*$` also match the directory `bin` itself (`.*` matches the empty
/// suffix), while an exact equal rule like `^etc/hosts$` still does not match
/// its parent directory `etc`. This single rule reproduces AIDE's "selecting
/// a directory also selects everything below it" behavior without needing a
/// separate recursive-rewrite pass over compiled patterns.
fn full_match(regex: &Regex, sub_path: &str, entry_kind: EntryKind) -> bool {
    if regex.is_match(sub_path) {
        return true;
    }
    if entry_kind == EntryKind::Dir {
        let with_slash = format!("{sub_path}/");
        if regex.is_match(&with_slash) {
            return true;
        }
    }
    false
}

/// Longest literal (non-metacharacter) prefix of a compiled pattern's source,
/// used only to decide reachability for paths that do not yet fully match.
fn literal_prefix(pattern: &str) -> &str {
    let trimmed = pattern.trim_start_matches('^');
    let end = trimmed
        .find(|c: char| matches!(c, '.' | '*' | '+' | '?' | '(' | '[' | '\\' | '$' | '|' | '{'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// Whether `sub_path` could still lead to a match of `pattern` somewhere
/// below it, without yet matching it outright. True when neither string has
/// diverged from the other along their shared prefix.
fn reachable(sub_path: &str, pattern: &str) -> bool {
    let prefix = literal_prefix(pattern);
    prefix.starts_with(sub_path) || sub_path.starts_with(prefix)
}

/// Evaluate a node's negative/selective/equal rule lists against `sub_path`,
/// in the fixed priority order from §4.1: exclude first, then selective,
/// then equal. The first match within a class short-circuits the rest of
/// that list.
#[must_use]
pub fn evaluate_positive<'a>(
    sub_path: &str,
    entry_kind: EntryKind,
    negative: &'a [Rule],
    selective: &'a [Rule],
    equal: &'a [Rule],
) -> LocalVerdict<'a> {
    for rule in negative {
        if rule.applies_to(entry_kind) && full_match(&rule.regex, sub_path, entry_kind) {
            return LocalVerdict::Excluded;
        }
    }
    for rule in selective {
        if rule.applies_to(entry_kind) && full_match(&rule.regex, sub_path, entry_kind) {
            return LocalVerdict::Selective(rule);
        }
    }
    for rule in equal {
        if rule.applies_to(entry_kind) && full_match(&rule.regex, sub_path, entry_kind) {
            return LocalVerdict::Equal(rule);
        }
    }
    LocalVerdict::None
}

/// Whether any of the node's positive (selective/equal) rules could still
/// match something below `sub_path`, used to produce `PARTIAL_MATCH` when no
/// rule matches outright yet.
#[must_use]
pub fn reachable_positive(sub_path: &str, selective: &[Rule], equal: &[Rule]) -> bool {
    selective
        .iter()
        .chain(equal.iter())
        .any(|rule| reachable(sub_path, &rule.pattern))
}

/// Combine a node's limit rules (if any) against `sub_path`.
#[must_use]
pub fn evaluate_limit(sub_path: &str, entry_kind: EntryKind, limit: &[Rule]) -> LimitStatus {
    if limit.is_empty() {
        return LimitStatus::NotApplicable;
    }
    let mut best = LimitStatus::Denied;
    for rule in limit {
        debug_assert_eq!(rule.kind, RuleKind::Limit);
        if full_match(&rule.regex, sub_path, entry_kind) {
            return LimitStatus::Allowed;
        }
        if reachable(sub_path, &rule.pattern) {
            best = LimitStatus::Partial;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::rule::{AttrMask, EntryKindMask};

    fn rule(pattern: &str, kind: RuleKind) -> Rule {
        Rule::new("", pattern, kind, AttrMask::ALL, EntryKindMask::ANY).unwrap()
    }

    #[test]
    fn selective_wildcard_matches_own_directory_via_trailing_slash() {
        let selective = vec![rule("^bin/.*$", RuleKind::Selective)];
        let verdict = evaluate_positive("bin", EntryKind::Dir, &[], &selective, &[]);
        assert!(matches!(verdict, LocalVerdict::Selective(_)));
    }

    #[test]
    fn equal_exact_rule_does_not_match_parent_directory() {
        let equal = vec![rule("^etc/hosts$", RuleKind::Equal)];
        let verdict = evaluate_positive("etc", EntryKind::Dir, &[], &[], &equal);
        assert!(matches!(verdict, LocalVerdict::None));
        assert!(reachable_positive("etc", &[], &equal));
    }

    #[test]
    fn exclude_matches_directory_and_its_children() {
        let negative = vec![rule("^var/cache/", RuleKind::Negative)];
        assert!(matches!(
            evaluate_positive("var/cache", EntryKind::Dir, &negative, &[], &[]),
            LocalVerdict::Excluded
        ));
        assert!(matches!(
            evaluate_positive("var/cache/y", EntryKind::File, &negative, &[], &[]),
            LocalVerdict::Excluded
        ));
    }

    #[test]
    fn exclude_takes_priority_over_selective_at_same_node() {
        let negative = vec![rule("^var/cache/", RuleKind::Negative)];
        let selective = vec![rule("^var/.*$", RuleKind::Selective)];
        let verdict = evaluate_positive("var/cache", EntryKind::Dir, &negative, &selective, &[]);
        assert!(matches!(verdict, LocalVerdict::Excluded));
    }

    #[test]
    fn limit_allows_exact_subtree() {
        let limit = vec![rule("^a/b/", RuleKind::Limit)];
        assert_eq!(
            evaluate_limit("a/b/1", EntryKind::File, &limit),
            LimitStatus::Allowed
        );
    }

    #[test]
    fn limit_partial_on_ancestor_directory() {
        let limit = vec![rule("^a/b/", RuleKind::Limit)];
        assert_eq!(evaluate_limit("a", EntryKind::Dir, &limit), LimitStatus::Partial);
    }

    #[test]
    fn limit_denies_diverged_subtree() {
        let limit = vec![rule("^a/b/", RuleKind::Limit)];
        assert_eq!(
            evaluate_limit("a/c", EntryKind::Dir, &limit),
            LimitStatus::Denied
        );
    }

    #[test]
    fn no_limit_rules_is_not_applicable() {
        assert_eq!(
            evaluate_limit("a", EntryKind::Dir, &[]),
            LimitStatus::NotApplicable
        );
    }
}
