//! Blocking JSON wire protocol client for WinAppDriver/Appium sessions.
//!
//! Replies in both the legacy JSON wire shape (`status`/`value`) and the W3C
//! shape (`value.error`) are understood.

use crate::config::Settings;
use crate::errors::AutomationError;
use crate::wrapper::Bounds;
use base64::Engine;
use reqwest::blocking::Client;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, trace};

pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";
pub const NO_SUCH_ELEMENT: &str = "no such element";

const ROOT_APP: &str = "Root";
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
const JSONWP_NO_SUCH_ELEMENT: i64 = 7;

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    status: Option<i64>,
    #[serde(default)]
    value: Value,
}

/// One remote automation session rooted at the desktop.
#[derive(Debug, Clone)]
pub struct AppiumSession {
    client: Client,
    hub_url: String,
    session_id: String,
}

impl AppiumSession {
    /// Opens a desktop ("Root") session on `settings.machine_url`.
    pub fn start(settings: &Settings) -> Result<Self, AutomationError> {
        let hub_url = format!("{}/wd/hub", settings.machine_url.trim_end_matches('/'));
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let capabilities = json!({
            "app": ROOT_APP,
            "deviceName": settings.device_name,
            "platformName": settings.platform_name,
            "newCommandTimeout": settings.new_command_timeout_secs,
        });
        info!(url = %hub_url, app = ROOT_APP, device = %settings.device_name, "starting session");

        let reply = send(
            &client,
            Method::POST,
            &format!("{hub_url}/session"),
            Some(json!({
                "desiredCapabilities": capabilities,
                "capabilities": { "alwaysMatch": capabilities },
            })),
        )?;
        let session_id = reply
            .session_id
            .or_else(|| {
                reply
                    .value
                    .get("sessionId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                AutomationError::Transport("new session reply carries no session id".to_string())
            })?;
        debug!(%session_id, "session started");
        Ok(Self {
            client,
            hub_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, AutomationError> {
        let url = format!("{}/session/{}{}", self.hub_url, self.session_id, path);
        Ok(send(&self.client, method, &url, body)?.value)
    }

    fn scope_path(scope: Option<&str>, suffix: &str) -> String {
        match scope {
            Some(id) => format!("/element/{id}/{suffix}"),
            None => format!("/{suffix}"),
        }
    }

    /// First element found with `using`/`value` beneath `scope` (the whole
    /// session when `None`).
    pub fn find_element(
        &self,
        scope: Option<&str>,
        using: &str,
        value: &str,
    ) -> Result<Option<String>, AutomationError> {
        let reply = self.command(
            Method::POST,
            &Self::scope_path(scope, "element"),
            Some(json!({ "using": using, "value": value })),
        );
        match reply {
            Ok(value) => element_id(&value).map(Some),
            Err(e) if is_no_such_element(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn find_elements(
        &self,
        scope: Option<&str>,
        using: &str,
        value: &str,
    ) -> Result<Vec<String>, AutomationError> {
        let reply = self.command(
            Method::POST,
            &Self::scope_path(scope, "elements"),
            Some(json!({ "using": using, "value": value })),
        );
        match reply {
            Ok(Value::Array(items)) => items.iter().map(element_id).collect(),
            Ok(Value::Null) => Ok(Vec::new()),
            Ok(other) => Err(AutomationError::Transport(format!(
                "expected an element list, got {other}"
            ))),
            Err(e) if is_no_such_element(&e) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Attribute of an element; a missing attribute reads as empty.
    pub fn attribute(&self, id: &str, name: &str) -> Result<String, AutomationError> {
        let value = self.command(Method::GET, &format!("/element/{id}/attribute/{name}"), None)?;
        Ok(match value {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    pub fn rect(&self, id: &str) -> Result<Bounds, AutomationError> {
        let location = self.command(Method::GET, &format!("/element/{id}/location"), None)?;
        let size = self.command(Method::GET, &format!("/element/{id}/size"), None)?;
        Ok(Bounds {
            x: number(&location, "x")?,
            y: number(&location, "y")?,
            width: number(&size, "width")?,
            height: number(&size, "height")?,
        })
    }

    /// Moves the mouse to the middle of `id`, then by `offset` if given.
    pub fn move_to(&self, id: &str, offset: Option<(i32, i32)>) -> Result<(), AutomationError> {
        self.command(Method::POST, "/moveto", Some(json!({ "element": id })))?;
        if let Some((x, y)) = offset {
            self.command(
                Method::POST,
                "/moveto",
                Some(json!({ "xoffset": x, "yoffset": y })),
            )?;
        }
        Ok(())
    }

    /// Clicks at the current mouse position; button 0 is left, 2 is right.
    pub fn click(&self, button: u8) -> Result<(), AutomationError> {
        self.command(Method::POST, "/click", Some(json!({ "button": button })))?;
        Ok(())
    }

    pub fn double_click(&self) -> Result<(), AutomationError> {
        self.command(Method::POST, "/doubleclick", Some(json!({})))?;
        Ok(())
    }

    /// Types `text` into an element. Private-use code points are keys.
    pub fn send_value(&self, id: &str, text: &str) -> Result<(), AutomationError> {
        let chars: Vec<String> = text.chars().map(String::from).collect();
        trace!(element = id, len = chars.len(), "send value");
        self.command(
            Method::POST,
            &format!("/element/{id}/value"),
            Some(json!({ "value": chars, "text": text })),
        )?;
        Ok(())
    }

    /// PNG image of an element.
    pub fn element_screenshot(&self, id: &str) -> Result<Vec<u8>, AutomationError> {
        let value = self.command(Method::GET, &format!("/element/{id}/screenshot"), None)?;
        let encoded = value.as_str().ok_or_else(|| {
            AutomationError::Transport("screenshot reply is not a string".to_string())
        })?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AutomationError::Transport(format!("screenshot is not base64: {e}")))
    }

    /// `true` while the session still answers a desktop lookup.
    pub fn is_alive(&self) -> bool {
        matches!(
            self.find_element(None, "class name", super::DESKTOP_CLASS_NAME),
            Ok(Some(_))
        )
    }

    pub fn end(&self) -> Result<(), AutomationError> {
        info!(session_id = %self.session_id, "ending session");
        self.command(Method::DELETE, "", None)?;
        Ok(())
    }
}

fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<WireReply, AutomationError> {
    trace!(%method, url, "wire command");
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send()?;
    let status = response.status();
    let text = response.text()?;
    let reply: WireReply = if text.trim().is_empty() {
        WireReply {
            session_id: None,
            status: None,
            value: Value::Null,
        }
    } else {
        serde_json::from_str(&text)?
    };

    let legacy_status = reply.status.unwrap_or(0);
    let w3c_error = reply.value.get("error").and_then(Value::as_str);
    if status.is_success() && legacy_status == 0 && w3c_error.is_none() {
        return Ok(reply);
    }
    let error = match (w3c_error, legacy_status) {
        (Some(error), _) => error.to_string(),
        (None, JSONWP_NO_SUCH_ELEMENT) => NO_SUCH_ELEMENT.to_string(),
        (None, code) if code != 0 => format!("status {code}"),
        (None, _) => status.canonical_reason().unwrap_or("error").to_lowercase(),
    };
    let message = reply
        .value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Err(AutomationError::Protocol {
        status: status.as_u16(),
        error,
        message,
    })
}

/// Whether a failed lookup only means "nothing matched".
pub fn is_no_such_element(error: &AutomationError) -> bool {
    matches!(error, AutomationError::Protocol { error, .. } if error == NO_SUCH_ELEMENT)
}

fn element_id(value: &Value) -> Result<String, AutomationError> {
    value
        .get(W3C_ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AutomationError::Transport(format!("not an element reference: {value}")))
}

fn number(value: &Value, field: &str) -> Result<f64, AutomationError> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| AutomationError::Transport(format!("missing {field} in {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_references_in_both_shapes() {
        assert_eq!(
            element_id(&json!({ "element-6066-11e4-a52e-4f735466cecf": "42.1" })).unwrap(),
            "42.1"
        );
        assert_eq!(element_id(&json!({ "ELEMENT": "7" })).unwrap(), "7");
        assert!(element_id(&json!("7")).is_err());
    }

    #[test]
    fn no_such_element_is_recognised() {
        let e = AutomationError::Protocol {
            status: 404,
            error: NO_SUCH_ELEMENT.to_string(),
            message: String::new(),
        };
        assert!(is_no_such_element(&e));
        assert!(!is_no_such_element(&AutomationError::Transport("x".into())));
    }
}
