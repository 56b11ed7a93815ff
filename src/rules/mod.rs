//! Rule compilation and storage: the `Rule`/`RuleKind`/`AttrMask` data model
//! (spec §3), the path matcher (C1, spec §4.1), and a minimal TOML rule-set
//! loader (spec SPEC_FULL §[SUPPLEMENT] G) for callers that don't already
//! have compiled `Rule` values from an external configuration parser.

pub mod loader;
pub mod matcher;
pub mod rule;

pub use loader::{RuleSetError, load_rule_set};
pub use rule::{AttrMask, EntryKind, EntryKindMask, Rule, RuleKind};
