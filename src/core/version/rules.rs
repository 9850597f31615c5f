// ─── Compatibility Rules ───
// Evaluates a library's ordered ALLOW/DISALLOW rules against a target.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::platform::{OperatingSystem, TargetDescriptor};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

/// Verdict held before any rule in a non-empty list has applied.
///
/// A rule list that never matches the target leaves the library out.
pub const DEFAULT_RULE_ACTION: RuleAction = RuleAction::Disallow;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CompatibilityRule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRestriction>,
}

/// OS restriction of a rule. Absent fields always match; `version` and
/// `arch` are regular expressions that must match the whole value.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OsRestriction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<OperatingSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<RulePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<RulePattern>,
}

/// A rule pattern, compiled once when the rule is built or deserialized.
///
/// An invalid pattern keeps its source text for re-serialization but never
/// matches anything.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct RulePattern {
    source: String,
    compiled: Option<Regex>,
}

impl RulePattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = match Regex::new(&format!("^(?:{source})$")) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Ignoring rule with invalid pattern {:?}: {}", source, e);
                None
            }
        };
        Self { source, compiled }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_some()
    }

    /// Whole-value match.
    pub fn matches(&self, value: &str) -> bool {
        self.compiled.as_ref().is_some_and(|re| re.is_match(value))
    }
}

impl PartialEq for RulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RulePattern {}

impl From<String> for RulePattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl From<RulePattern> for String {
    fn from(pattern: RulePattern) -> Self {
        pattern.source
    }
}

impl CompatibilityRule {
    pub fn allow() -> Self {
        Self {
            action: RuleAction::Allow,
            os: None,
        }
    }

    pub fn disallow() -> Self {
        Self {
            action: RuleAction::Disallow,
            os: None,
        }
    }

    pub fn for_os(mut self, os: OperatingSystem) -> Self {
        self.os.get_or_insert_with(OsRestriction::default).name = Some(os);
        self
    }

    pub fn for_arch(mut self, pattern: &str) -> Self {
        self.os.get_or_insert_with(OsRestriction::default).arch = Some(RulePattern::new(pattern));
        self
    }

    pub fn for_os_version(mut self, pattern: &str) -> Self {
        self.os.get_or_insert_with(OsRestriction::default).version = Some(RulePattern::new(pattern));
        self
    }

    /// A rule applies when every restriction it declares matches the target.
    pub fn applies_to(&self, target: &TargetDescriptor) -> bool {
        let Some(os) = &self.os else {
            return true;
        };

        os.name.map_or(true, |name| name == target.os)
            && os
                .version
                .as_ref()
                .map_or(true, |pattern| pattern.matches(&target.os_version))
            && os
                .arch
                .as_ref()
                .map_or(true, |pattern| pattern.matches(&target.arch))
    }
}

/// Fold the rules in declaration order; the last applying rule wins.
///
/// - No rules (absent or empty) → compatible.
/// - Otherwise start from [`DEFAULT_RULE_ACTION`] and let each applying
///   rule overwrite the verdict.
pub fn is_compatible(rules: Option<&[CompatibilityRule]>, target: &TargetDescriptor) -> bool {
    let rules = match rules {
        Some(r) if !r.is_empty() => r,
        _ => return true,
    };

    let verdict = rules
        .iter()
        .filter(|rule| rule.applies_to(target))
        .fold(DEFAULT_RULE_ACTION, |_, rule| rule.action);

    verdict == RuleAction::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> TargetDescriptor {
        TargetDescriptor::new(OperatingSystem::Windows, "10.0", "x64")
    }

    fn osx() -> TargetDescriptor {
        TargetDescriptor::new(OperatingSystem::Osx, "10.5.8", "x86_64")
    }

    #[test]
    fn absent_or_empty_rules_are_compatible() {
        assert!(is_compatible(None, &windows()));
        assert!(is_compatible(Some(&[][..]), &osx()));
    }

    #[test]
    fn unconditional_disallow_always_applies() {
        let rules = [CompatibilityRule::disallow()];
        assert!(!is_compatible(Some(&rules[..]), &windows()));
        assert!(!is_compatible(Some(&rules[..]), &osx()));
    }

    #[test]
    fn seed_is_disallow_when_no_rule_applies() {
        assert_eq!(DEFAULT_RULE_ACTION, RuleAction::Disallow);
        let rules = [CompatibilityRule::allow().for_os(OperatingSystem::Osx)];
        assert!(!is_compatible(Some(&rules[..]), &windows()));
        assert!(is_compatible(Some(&rules[..]), &osx()));
    }

    #[test]
    fn last_applying_rule_wins() {
        // The classic "everything except osx" list.
        let rules = [
            CompatibilityRule::allow(),
            CompatibilityRule::disallow().for_os(OperatingSystem::Osx),
        ];
        assert!(is_compatible(Some(&rules[..]), &windows()));
        assert!(!is_compatible(Some(&rules[..]), &osx()));

        // Reordering flips the verdict for osx: the unconditional allow now comes last.
        let reordered = [
            CompatibilityRule::disallow().for_os(OperatingSystem::Osx),
            CompatibilityRule::allow(),
        ];
        assert!(is_compatible(Some(&reordered[..]), &osx()));
    }

    #[test]
    fn version_pattern_must_match_whole_value() {
        let rules = [
            CompatibilityRule::allow(),
            CompatibilityRule::disallow()
                .for_os(OperatingSystem::Osx)
                .for_os_version("^10\\.5\\.\\d$"),
        ];
        assert!(!is_compatible(Some(&rules[..]), &osx()));

        // "10\.5" alone is only a prefix of "10.5.8" and must not apply.
        let prefix_only = [
            CompatibilityRule::allow(),
            CompatibilityRule::disallow().for_os_version("10\\.5"),
        ];
        assert!(is_compatible(Some(&prefix_only[..]), &osx()));
    }

    #[test]
    fn arch_pattern_restricts_rule() {
        let rules = [
            CompatibilityRule::allow(),
            CompatibilityRule::disallow().for_arch("x86"),
        ];
        let x86 = TargetDescriptor::new(OperatingSystem::Windows, "10.0", "x86");
        assert!(!is_compatible(Some(&rules[..]), &x86));
        assert!(is_compatible(Some(&rules[..]), &windows()));
    }

    #[test]
    fn invalid_pattern_never_applies() {
        let rules = [
            CompatibilityRule::allow(),
            CompatibilityRule::disallow().for_arch("(unclosed"),
        ];
        assert!(is_compatible(Some(&rules[..]), &windows()));
        let pattern = rules[1].os.as_ref().and_then(|os| os.arch.as_ref()).unwrap();
        assert!(!pattern.is_valid());
        assert_eq!(pattern.as_str(), "(unclosed");
    }

    #[test]
    fn patterns_are_compiled_when_deserialized() {
        let rule: CompatibilityRule = serde_json::from_str(
            r#"{"action": "disallow", "os": {"name": "osx", "version": "^10\\.5\\.\\d$", "arch": "x86|x86_64"}}"#,
        )
        .unwrap();
        let os = rule.os.as_ref().unwrap();
        let version = os.version.as_ref().unwrap();
        assert!(version.is_valid());
        assert!(version.matches("10.5.8"));
        assert!(!version.matches("10.5.8.1"));
        assert!(os.arch.as_ref().unwrap().matches("x86_64"));
        assert!(!os.arch.as_ref().unwrap().matches("x86_64_v2"));

        // Source text survives a re-write unchanged.
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["os"]["version"], "^10\\.5\\.\\d$");
        assert_eq!(json["os"]["arch"], "x86|x86_64");
    }

    #[test]
    fn deserializes_descriptor_rules() {
        let rules: Vec<CompatibilityRule> = serde_json::from_str(
            r#"[
                {"action": "allow"},
                {"action": "disallow", "os": {"name": "osx", "version": "^10\\.5\\.\\d$"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(rules[0], CompatibilityRule::allow());
        assert_eq!(
            rules[1].os.as_ref().and_then(|os| os.name),
            Some(OperatingSystem::Osx)
        );
    }
}
