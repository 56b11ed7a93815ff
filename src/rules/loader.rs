//! Minimal TOML rule-set loader (spec SPEC_FULL §[SUPPLEMENT] G).
//!
//! The rule *compiler* — parsing AIDE's own grouped-attribute configuration
//! language — is out of scope (spec §1): the core takes already-compiled
//! `Rule` values. This loader exists so the crate is exercisable end-to-end
//! without standing up that external parser: a literal list of `[[rule]]`
//! tables, one line per rule, with no macro groups, no `@@define`, no
//! include directives — just enough to build `Rule` values for tests, the
//! CLI, and the demos.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::errors::ScanError;
use crate::rules::rule::{AttrMask, EntryKindMask, Rule, RuleKind};

/// Error produced while loading or compiling a rule-set file.
pub type RuleSetError = ScanError;

/// Raw on-disk representation of one `[[rule]]` table.
#[derive(Debug, Deserialize)]
struct RawRule {
    anchor: String,
    pattern: String,
    kind: RawKind,
    #[serde(default)]
    attrs: Vec<String>,
    #[serde(default)]
    file_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    Selective,
    Equal,
    Negative,
    Limit,
}

#[derive(Debug, Deserialize, Default)]
struct RawRuleSet {
    #[serde(default)]
    rule: Vec<RawRule>,
}

/// A compiled rule paired with the anchor path it installs under.
pub struct AnchoredRule {
    pub anchor: PathBuf,
    pub rule: Rule,
}

/// Parse a TOML rule-set document (already read into memory) into compiled,
/// installable `(anchor, Rule)` pairs.
///
/// Does not install anything into a [`crate::tree::SelectionTree`] — the
/// caller does that via `SelectionTree::install_rule` before calling
/// `SelectionTree::freeze`, same as any other externally-sourced rule list
/// per spec §6 "Inputs consumed".
pub fn load_rule_set(source: &str) -> Result<Vec<AnchoredRule>, RuleSetError> {
    let raw: RawRuleSet = toml::from_str(source)?;
    raw.rule.into_iter().map(compile_rule).collect()
}

/// Convenience wrapper: read `path` from disk, then [`load_rule_set`].
pub fn load_rule_set_file(path: &Path) -> Result<Vec<AnchoredRule>, RuleSetError> {
    let source = std::fs::read_to_string(path).map_err(|source| ScanError::io(path, source))?;
    load_rule_set(&source)
}

fn compile_rule(raw: RawRule) -> Result<AnchoredRule, RuleSetError> {
    let kind = match raw.kind {
        RawKind::Selective => RuleKind::Selective,
        RawKind::Equal => RuleKind::Equal,
        RawKind::Negative => RuleKind::Negative,
        RawKind::Limit => RuleKind::Limit,
    };
    let attr_mask = parse_attr_mask(&raw.attrs, &raw.anchor)?;
    let file_types = parse_file_type_mask(&raw.file_types, &raw.anchor)?;
    let anchor = PathBuf::from(&raw.anchor);
    let rule = Rule::new(&anchor, raw.pattern, kind, attr_mask, file_types)?;
    Ok(AnchoredRule { anchor, rule })
}

fn parse_attr_mask(names: &[String], anchor: &str) -> Result<AttrMask, RuleSetError> {
    let mut mask = AttrMask::NONE;
    for name in names {
        let bit = match name.as_str() {
            "perms" => AttrMask::PERMS,
            "owner" => AttrMask::OWNER,
            "size" => AttrMask::SIZE,
            "timestamps" => AttrMask::TIMESTAMPS,
            "inode" => AttrMask::INODE,
            "link_count" => AttrMask::LINK_COUNT,
            "sha256" => AttrMask::SHA256,
            "xattrs" => AttrMask::XATTRS,
            "acl" => AttrMask::ACL,
            "selinux" => AttrMask::SELINUX,
            "e2fsattrs" => AttrMask::E2FSATTRS,
            "metadata" => AttrMask::METADATA_ONLY,
            "all" => AttrMask::ALL,
            other => {
                return Err(ScanError::InvalidRule {
                    anchor: anchor.to_string(),
                    details: format!("unknown attribute group {other:?}"),
                });
            }
        };
        mask = mask.union(bit);
    }
    if mask.is_empty() {
        mask = AttrMask::METADATA_ONLY;
    }
    Ok(mask)
}

fn parse_file_type_mask(names: &[String], anchor: &str) -> Result<EntryKindMask, RuleSetError> {
    let mut mask = EntryKindMask::ANY;
    if names.is_empty() {
        return Ok(mask);
    }
    let mut explicit = EntryKindMask::default();
    for name in names {
        let bit = match name.as_str() {
            "file" => EntryKindMask::FILE,
            "dir" => EntryKindMask::DIR,
            "symlink" => EntryKindMask::SYMLINK,
            "other" => EntryKindMask::OTHER,
            other => {
                return Err(ScanError::InvalidRule {
                    anchor: anchor.to_string(),
                    details: format!("unknown file type {other:?}"),
                });
            }
        };
        explicit = explicit.union(bit);
    }
    mask = explicit;
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_selective_and_exclude_rules() {
        let toml_src = r#"
            [[rule]]
            anchor = ""
            pattern = "^var/.*$"
            kind = "selective"
            attrs = ["perms", "sha256"]

            [[rule]]
            anchor = ""
            pattern = "^var/cache/"
            kind = "negative"
        "#;
        let rules = load_rule_set(toml_src).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].anchor, PathBuf::from(""));
        assert_eq!(rules[0].rule.kind, RuleKind::Selective);
        assert!(rules[0].rule.attr_mask.contains(AttrMask::SHA256));
        assert_eq!(rules[1].rule.kind, RuleKind::Negative);
    }

    #[test]
    fn empty_attrs_defaults_to_metadata_only() {
        let toml_src = r#"
            [[rule]]
            anchor = ""
            pattern = "^etc/hosts$"
            kind = "equal"
        "#;
        let rules = load_rule_set(toml_src).unwrap();
        assert_eq!(rules[0].rule.attr_mask, AttrMask::METADATA_ONLY);
    }

    #[test]
    fn file_type_restriction_parses() {
        let toml_src = r#"
            [[rule]]
            anchor = "bin"
            pattern = "^.*$"
            kind = "selective"
            file_types = ["file"]
        "#;
        let rules = load_rule_set(toml_src).unwrap();
        assert!(rules[0].rule.file_types.permits(crate::rules::rule::EntryKind::File));
        assert!(!rules[0].rule.file_types.permits(crate::rules::rule::EntryKind::Dir));
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        let toml_src = r#"
            [[rule]]
            anchor = ""
            pattern = "^x$"
            kind = "equal"
            attrs = ["bogus"]
        "#;
        let err = load_rule_set(toml_src).unwrap_err();
        assert_eq!(err.code(), "AIDE-1101");
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let toml_src = r#"
            [[rule]]
            anchor = ""
            pattern = "(unclosed"
            kind = "selective"
        "#;
        let err = load_rule_set(toml_src).unwrap_err();
        assert_eq!(err.code(), "AIDE-1101");
    }

    #[test]
    fn limit_kind_round_trips() {
        let toml_src = r#"
            [[rule]]
            anchor = ""
            pattern = "^a/b/"
            kind = "limit"
        "#;
        let rules = load_rule_set(toml_src).unwrap();
        assert_eq!(rules[0].rule.kind, RuleKind::Limit);
    }
}
