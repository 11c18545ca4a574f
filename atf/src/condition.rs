//! Search conditions: the property keys a backend can look up, their priority,
//! and the merge rules used when typed elements contribute default conditions.

use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recognised search property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKey {
    Name,
    ClassName,
    ControlType,
    LocalizedControlType,
    HelpText,
    AutomationId,
    RuntimeId,
    ParentRuntimeId,
    IsSelected,
}

impl ConditionKey {
    pub const ALL: [ConditionKey; 9] = [
        ConditionKey::Name,
        ConditionKey::ClassName,
        ConditionKey::ControlType,
        ConditionKey::LocalizedControlType,
        ConditionKey::HelpText,
        ConditionKey::AutomationId,
        ConditionKey::RuntimeId,
        ConditionKey::ParentRuntimeId,
        ConditionKey::IsSelected,
    ];

    /// Canonical key string. Case-sensitive.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKey::Name => "Name",
            ConditionKey::ClassName => "ClassName",
            ConditionKey::ControlType => "ControlType",
            ConditionKey::LocalizedControlType => "LocalizedControlType",
            ConditionKey::HelpText => "HelpText",
            ConditionKey::AutomationId => "AutomationId",
            ConditionKey::RuntimeId => "RuntimeId",
            ConditionKey::ParentRuntimeId => "ParentRuntimeId",
            ConditionKey::IsSelected => "SelectionItem.IsSelected",
        }
    }

    /// Rank used to choose the condition that seeds a multi-condition search.
    /// Higher wins.
    pub fn priority(&self) -> u8 {
        match self {
            ConditionKey::AutomationId => 100,
            ConditionKey::RuntimeId => 98,
            ConditionKey::Name => 96,
            ConditionKey::HelpText => 94,
            ConditionKey::LocalizedControlType => 93,
            ConditionKey::ClassName => 92,
            ConditionKey::IsSelected => 91,
            ConditionKey::ControlType => 90,
            ConditionKey::ParentRuntimeId => 89,
        }
    }
}

impl FromStr for ConditionKey {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConditionKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| AutomationError::SearchCriteria(s.to_string()))
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(key, value)` pair a candidate element has to match exactly.
///
/// The key is kept as a string so that conditions can be written and
/// deserialized freely; it is validated by the backend at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    pub value: String,
}

impl Condition {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn of(key: ConditionKey, value: impl Into<String>) -> Self {
        Self::new(key.as_str(), value)
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::of(ConditionKey::Name, value)
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Self::of(ConditionKey::ClassName, value)
    }

    pub fn control_type(value: impl Into<String>) -> Self {
        Self::of(ConditionKey::ControlType, value)
    }

    pub fn localized_control_type(value: impl Into<String>) -> Self {
        Self::of(ConditionKey::LocalizedControlType, value)
    }

    pub fn help_text(value: impl Into<String>) -> Self {
        Self::of(ConditionKey::HelpText, value)
    }

    pub fn automation_id(value: impl Into<String>) -> Self {
        Self::of(ConditionKey::AutomationId, value)
    }

    pub fn runtime_id(value: impl Into<String>) -> Self {
        Self::of(ConditionKey::RuntimeId, value)
    }

    pub fn parent_runtime_id(value: impl Into<String>) -> Self {
        Self::of(ConditionKey::ParentRuntimeId, value)
    }

    /// Selection state, written the way backends report booleans.
    pub fn is_selected(selected: bool) -> Self {
        Self::of(ConditionKey::IsSelected, bool_token(selected))
    }

    /// Resolves the key, failing with [`AutomationError::SearchCriteria`] for unknown keys.
    pub fn parsed_key(&self) -> Result<ConditionKey, AutomationError> {
        self.key.parse()
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Condition {
    fn from((key, value): (K, V)) -> Self {
        Condition::new(key, value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Boolean as reported by both backends.
pub fn bool_token(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

pub fn describe_conditions(conditions: &[Condition]) -> String {
    let parts: Vec<String> = conditions.iter().map(ToString::to_string).collect();
    format!("{{{}}}", parts.join(", "))
}

/// Orders conditions by descending priority. Ties keep their input order.
pub fn sort_by_priority(conditions: &[Condition]) -> Result<Vec<&Condition>, AutomationError> {
    let mut ranked = conditions
        .iter()
        .map(|c| Ok((c.parsed_key()?.priority(), c)))
        .collect::<Result<Vec<_>, AutomationError>>()?;
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(ranked.into_iter().map(|(_, c)| c).collect())
}

/// Merges caller conditions over an element kind's defaults.
///
/// No caller conditions means the defaults are used as they are. Otherwise the
/// result is a key-wise union where caller values replace defaults.
pub fn merge_conditions(defaults: &[Condition], overrides: &[Condition]) -> Vec<Condition> {
    if overrides.is_empty() {
        return defaults.to_vec();
    }

    let mut merged: Vec<Condition> = Vec::with_capacity(defaults.len() + overrides.len());
    for condition in defaults.iter().chain(overrides) {
        match merged.iter_mut().find(|c| c.key == condition.key) {
            Some(existing) => {
                if existing.value != condition.value {
                    tracing::trace!(
                        key = %condition.key,
                        from = %existing.value,
                        to = %condition.value,
                        "override search criteria"
                    );
                }
                existing.value = condition.value.clone();
            }
            None => merged.push(condition.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_their_canonical_strings() {
        for key in ConditionKey::ALL {
            assert_eq!(key.as_str().parse::<ConditionKey>().unwrap(), key);
        }
        assert_eq!(ConditionKey::IsSelected.as_str(), "SelectionItem.IsSelected");
    }

    #[test]
    fn keys_are_case_sensitive() {
        let err = "name".parse::<ConditionKey>().unwrap_err();
        assert!(matches!(err, AutomationError::SearchCriteria(k) if k == "name"));
    }

    #[test]
    fn priority_table_is_strictly_ordered() {
        let expected = [
            ConditionKey::AutomationId,
            ConditionKey::RuntimeId,
            ConditionKey::Name,
            ConditionKey::HelpText,
            ConditionKey::LocalizedControlType,
            ConditionKey::ClassName,
            ConditionKey::IsSelected,
            ConditionKey::ControlType,
            ConditionKey::ParentRuntimeId,
        ];
        for pair in expected.windows(2) {
            assert!(pair[0].priority() > pair[1].priority(), "{pair:?}");
        }
    }

    #[test]
    fn sort_puts_highest_priority_first_regardless_of_input_order() {
        let conditions = vec![
            Condition::control_type("Edit"),
            Condition::class_name("TextBox"),
            Condition::automation_id("1001"),
            Condition::name("Open"),
        ];
        let sorted = sort_by_priority(&conditions).unwrap();
        let keys: Vec<&str> = sorted.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["AutomationId", "Name", "ClassName", "ControlType"]);
    }

    #[test]
    fn sort_rejects_unknown_keys() {
        let conditions = vec![Condition::name("x"), Condition::new("Foo", "bar")];
        let err = sort_by_priority(&conditions).unwrap_err();
        assert!(matches!(err, AutomationError::SearchCriteria(k) if k == "Foo"));
    }

    #[test]
    fn merge_is_a_right_biased_union() {
        let defaults = vec![Condition::new("A", "x"), Condition::new("B", "y")];
        let overrides = vec![Condition::new("B", "z"), Condition::new("C", "w")];
        let merged = merge_conditions(&defaults, &overrides);
        assert_eq!(
            merged,
            vec![
                Condition::new("A", "x"),
                Condition::new("B", "z"),
                Condition::new("C", "w"),
            ]
        );
    }

    #[test]
    fn merge_without_overrides_keeps_defaults_verbatim() {
        let defaults = vec![Condition::class_name("Button"), Condition::class_name("Button")];
        assert_eq!(merge_conditions(&defaults, &[]), defaults);
    }

    #[test]
    fn is_selected_uses_backend_boolean_tokens() {
        assert_eq!(Condition::is_selected(true).value, "True");
        assert_eq!(Condition::is_selected(false).value, "False");
    }
}
