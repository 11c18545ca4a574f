use super::client::AppiumSession;
use crate::condition::{Condition, ConditionKey};
use crate::errors::AutomationError;
use crate::platforms::BackendAdapter;
use crate::wrapper::RUNTIME_ID_PROPERTY;

const WILDCARD_XPATH: &str = "//*";
const PARENT_XPATH: &str = "..";

/// Translates conditions into WinAppDriver locator strategies.
#[derive(Debug, Clone)]
pub struct AppiumAdapter {
    session: AppiumSession,
}

impl AppiumAdapter {
    pub fn new(session: AppiumSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &AppiumSession {
        &self.session
    }
}

/// Quotes `value` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so a value holding both quote kinds is
/// split on `'` and joined back with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Locator strategy and value for one condition.
pub fn locator(condition: &Condition) -> Result<(&'static str, String), AutomationError> {
    let value = &condition.value;
    Ok(match condition.parsed_key()? {
        ConditionKey::ClassName => ("class name", value.clone()),
        ConditionKey::AutomationId => ("accessibility id", value.clone()),
        ConditionKey::Name => ("name", value.clone()),
        key @ (ConditionKey::ControlType
        | ConditionKey::LocalizedControlType
        | ConditionKey::HelpText
        | ConditionKey::RuntimeId) => (
            "xpath",
            format!(".//*[@{}={}]", key.as_str(), xpath_literal(value)),
        ),
        ConditionKey::ParentRuntimeId => (
            "xpath",
            format!(".//*[parent::*[@RuntimeId={}]]", xpath_literal(value)),
        ),
        ConditionKey::IsSelected => ("xpath", format!(".//*[@IsSelected={}]", xpath_literal(value))),
    })
}

impl BackendAdapter for AppiumAdapter {
    type Handle = String;

    fn find_first_descendant(&self, scope: Option<&String>) -> Result<Option<String>, AutomationError> {
        self.session
            .find_element(scope.map(String::as_str), "xpath", WILDCARD_XPATH)
    }

    fn find_all_descendants(&self, scope: Option<&String>) -> Result<Vec<String>, AutomationError> {
        self.session
            .find_elements(scope.map(String::as_str), "xpath", WILDCARD_XPATH)
    }

    fn find_first_by(
        &self,
        scope: Option<&String>,
        condition: &Condition,
    ) -> Result<Option<String>, AutomationError> {
        let (using, value) = locator(condition)?;
        self.session
            .find_element(scope.map(String::as_str), using, &value)
    }

    fn find_all_by(
        &self,
        scope: Option<&String>,
        condition: &Condition,
    ) -> Result<Vec<String>, AutomationError> {
        let (using, value) = locator(condition)?;
        self.session
            .find_elements(scope.map(String::as_str), using, &value)
    }

    /// `ParentRuntimeId` is not an attribute; it is read from the parent node.
    fn read_property(&self, handle: &String, property: &str) -> Result<String, AutomationError> {
        if property == ConditionKey::ParentRuntimeId.as_str() {
            return match self.session.find_element(Some(handle), "xpath", PARENT_XPATH)? {
                Some(parent) => self.session.attribute(&parent, RUNTIME_ID_PROPERTY),
                None => Ok(String::new()),
            };
        }
        self.session.attribute(handle, property)
    }
}
