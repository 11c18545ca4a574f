//! The backend-neutral wrapper around one native UI node.
//!
//! [`UiItem`] is what searches return and what element facades hold. Each
//! backend supplies a [`UiItemImpl`]; everything shared by all backends
//! (bringing the window into view, pacing, keyboard shortcuts, caret moves)
//! lives on [`UiItem`] itself.

use crate::awaiting::AwaitingPolicy;
use crate::condition::ConditionKey;
use crate::errors::AutomationError;
use crate::keys::{combo_label, Key, MouseButton};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, trace};

pub const NAME_PROPERTY: &str = "Name";
pub const RUNTIME_ID_PROPERTY: &str = "RuntimeId";
pub const CLASS_NAME_PROPERTY: &str = "ClassName";
pub const HELP_TEXT_PROPERTY: &str = "HelpText";
pub const IS_ENABLED_PROPERTY: &str = "IsEnabled";
pub const BOUNDING_RECTANGLE_PROPERTY: &str = "BoundingRectangle";

/// Bounding rectangle reported for elements that are not laid out on screen.
pub const NOT_VISIBLE_BOUNDING_RECTANGLE: &str = "Left:0 Top:0 Width:0 Height:0";

const COMBO_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Restores focus/visibility of the window an element lives in. Receives the
/// window title the element was found under.
pub type BringIntoView = Arc<dyn Fn(&str) -> Result<(), AutomationError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenCoordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementDimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn coordinates(&self) -> ScreenCoordinates {
        ScreenCoordinates {
            x: self.x,
            y: self.y,
        }
    }

    pub fn dimensions(&self) -> ElementDimensions {
        ElementDimensions {
            width: self.width,
            height: self.height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// `true` unless the reported rectangle is missing or the zero sentinel.
pub fn is_visible_rectangle(rectangle: &str) -> bool {
    !(rectangle.is_empty() || rectangle == NOT_VISIBLE_BOUNDING_RECTANGLE)
}

/// Collaborators shared by a node and everything found beneath it.
#[derive(Clone)]
pub struct ItemContext {
    awaiting: Arc<dyn AwaitingPolicy>,
    window_title: String,
    bring_into_view: Option<BringIntoView>,
}

impl ItemContext {
    /// Context of the desktop root, which needs no window activation.
    pub fn desktop(awaiting: Arc<dyn AwaitingPolicy>, title: impl Into<String>) -> Self {
        Self {
            awaiting,
            window_title: title.into(),
            bring_into_view: None,
        }
    }

    /// Context of an application window.
    pub fn window(
        awaiting: Arc<dyn AwaitingPolicy>,
        title: impl Into<String>,
        bring_into_view: Option<BringIntoView>,
    ) -> Result<Self, AutomationError> {
        let title = title.into();
        let bring_into_view = bring_into_view.ok_or_else(|| {
            AutomationError::Construction(format!(
                "window '{title}' requires a bring-into-view callback"
            ))
        })?;
        Ok(Self {
            awaiting,
            window_title: title,
            bring_into_view: Some(bring_into_view),
        })
    }

    /// Context inherited by an element found beneath this one.
    pub fn child(&self) -> Result<Self, AutomationError> {
        if self.bring_into_view.is_none() {
            return Err(AutomationError::Construction(
                "non-desktop element must have a bring-into-view callback".to_string(),
            ));
        }
        Ok(self.clone())
    }

    pub fn awaiting(&self) -> &Arc<dyn AwaitingPolicy> {
        &self.awaiting
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn is_desktop(&self) -> bool {
        self.bring_into_view.is_none()
    }

    /// Waits the action delay, then activates the owning window.
    pub fn bring_into_view(&self) -> Result<(), AutomationError> {
        self.awaiting.wait_for_default_action_delay();
        match &self.bring_into_view {
            Some(callback) => callback(&self.window_title),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ItemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemContext")
            .field("window_title", &self.window_title)
            .field("desktop", &self.is_desktop())
            .finish()
    }
}

/// Backend-specific half of a [`UiItem`].
///
/// Implementations perform the raw operation only: window activation and
/// pacing are applied by [`UiItem`].
pub trait UiItemImpl: Send + Sync + Debug {
    /// Identity of the native node, used for equality and set intersection.
    fn object_id(&self) -> String;
    fn context(&self) -> &ItemContext;
    /// Reads a canonical property as a string.
    fn property(&self, name: &str) -> Result<String, AutomationError>;
    fn is_visible(&self) -> Result<bool, AutomationError>;
    fn bounds(&self) -> Result<Bounds, AutomationError>;
    /// Clicks relative to the center of the element.
    fn click(&self, button: MouseButton, x_offset: i32, y_offset: i32)
        -> Result<(), AutomationError>;
    fn double_click(&self) -> Result<(), AutomationError>;
    fn hover(&self) -> Result<(), AutomationError>;
    fn send_keys(&self, text: &str) -> Result<(), AutomationError>;
    fn press_key(&self, key: Key) -> Result<(), AutomationError>;
    fn press_modified_key(&self, modifier: Key, c: char) -> Result<(), AutomationError>;
    fn press_key_combo(&self, keys: &[Key]) -> Result<(), AutomationError>;
    /// PNG encoded image of the element.
    fn screenshot(&self) -> Result<Vec<u8>, AutomationError>;
    fn clone_box(&self) -> Box<dyn UiItemImpl>;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// One UI node of some backend.
pub struct UiItem {
    inner: Box<dyn UiItemImpl>,
    runtime_id: OnceCell<String>,
}

impl UiItem {
    pub(crate) fn new(inner: Box<dyn UiItemImpl>) -> Self {
        Self {
            inner,
            runtime_id: OnceCell::new(),
        }
    }

    pub(crate) fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }

    pub fn object_id(&self) -> String {
        self.inner.object_id()
    }

    pub fn context(&self) -> &ItemContext {
        self.inner.context()
    }

    pub fn window_title(&self) -> &str {
        self.inner.context().window_title()
    }

    fn awaiting(&self) -> &Arc<dyn AwaitingPolicy> {
        self.inner.context().awaiting()
    }

    pub fn bring_into_view(&self) -> Result<(), AutomationError> {
        self.inner.context().bring_into_view()
    }

    pub fn property(&self, name: &str) -> Result<String, AutomationError> {
        self.inner.property(name)
    }

    /// Reads the property a condition key compares against.
    pub fn condition_value(&self, key: ConditionKey) -> Result<String, AutomationError> {
        self.inner.property(key.as_str())
    }

    pub fn name(&self) -> Result<String, AutomationError> {
        self.property(NAME_PROPERTY)
    }

    pub fn class_name(&self) -> Result<String, AutomationError> {
        self.property(CLASS_NAME_PROPERTY)
    }

    pub fn help_text(&self) -> Result<String, AutomationError> {
        self.property(HELP_TEXT_PROPERTY)
    }

    /// Runtime id of the node. Read once and memoized.
    pub fn runtime_id(&self) -> Result<String, AutomationError> {
        self.runtime_id
            .get_or_try_init(|| self.inner.property(RUNTIME_ID_PROPERTY))
            .cloned()
    }

    pub fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self.property(IS_ENABLED_PROPERTY)? == "True")
    }

    pub fn is_visible(&self) -> Result<bool, AutomationError> {
        self.inner.is_visible()
    }

    pub fn coordinates(&self) -> Result<ScreenCoordinates, AutomationError> {
        self.bring_into_view()?;
        Ok(self.inner.bounds()?.coordinates())
    }

    pub fn dimensions(&self) -> Result<ElementDimensions, AutomationError> {
        self.bring_into_view()?;
        Ok(self.inner.bounds()?.dimensions())
    }

    pub fn click(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.click_with_offset(button, 0, 0)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn click_with_offset(
        &self,
        button: MouseButton,
        x_offset: i32,
        y_offset: i32,
    ) -> Result<(), AutomationError> {
        if button == MouseButton::Undefined {
            return Err(AutomationError::InvalidArgument(
                "mouse button must be defined".to_string(),
            ));
        }
        self.bring_into_view()?;
        self.inner.click(button, x_offset, y_offset)
    }

    pub fn double_click(&self) -> Result<(), AutomationError> {
        self.bring_into_view()?;
        self.inner.double_click()
    }

    pub fn hover(&self) -> Result<(), AutomationError> {
        self.bring_into_view()?;
        self.inner.hover()
    }

    pub fn send_keys(&self, text: &str) -> Result<(), AutomationError> {
        self.bring_into_view()?;
        trace!(object_id = %self.object_id(), "send keys");
        self.inner.send_keys(text)
    }

    pub fn press_key(&self, key: Key) -> Result<(), AutomationError> {
        self.bring_into_view()?;
        self.inner.press_key(key)?;
        self.awaiting().wait_for_default_action_delay();
        Ok(())
    }

    pub fn press_modified_key(&self, modifier: Key, c: char) -> Result<(), AutomationError> {
        self.bring_into_view()?;
        debug!(object_id = %self.object_id(), "press {modifier} + {c}");
        self.inner.press_modified_key(modifier, c)?;
        self.awaiting().wait_for_default_action_delay();
        Ok(())
    }

    /// Holds `keys[..n-1]` in order, presses the last one and releases the
    /// held keys in reverse.
    pub fn press_key_combo(&self, keys: &[Key]) -> Result<(), AutomationError> {
        if keys.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "key combination is empty".to_string(),
            ));
        }
        self.bring_into_view()?;
        debug!(object_id = %self.object_id(), "press combo {}", combo_label(keys));
        self.inner.press_key_combo(keys)?;
        std::thread::sleep(COMBO_SETTLE_DELAY);
        Ok(())
    }

    pub fn select_all(&self) -> Result<(), AutomationError> {
        self.press_modified_key(Key::Control, 'a')
    }

    pub fn copy_to_clipboard(&self) -> Result<(), AutomationError> {
        self.press_modified_key(Key::Control, 'c')
    }

    pub fn paste_from_clipboard(&self) -> Result<(), AutomationError> {
        self.press_modified_key(Key::Control, 'v')
    }

    pub fn move_caret_left(&self) -> Result<(), AutomationError> {
        self.press_key(Key::ArrowLeft)
    }

    pub fn move_caret_right(&self) -> Result<(), AutomationError> {
        self.press_key(Key::ArrowRight)
    }

    pub fn move_caret_to_begin(&self) -> Result<(), AutomationError> {
        self.select_all()?;
        self.move_caret_left()
    }

    pub fn move_caret_to_end(&self) -> Result<(), AutomationError> {
        self.select_all()?;
        self.move_caret_right()
    }

    pub fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        self.bring_into_view()?;
        self.inner.screenshot()
    }

    pub fn screenshot_to_file(&self, path: impl AsRef<Path>) -> Result<(), AutomationError> {
        let png = self.screenshot()?;
        std::fs::write(path.as_ref(), png)?;
        Ok(())
    }
}

impl Clone for UiItem {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
            runtime_id: self.runtime_id.clone(),
        }
    }
}

impl PartialEq for UiItem {
    fn eq(&self, other: &Self) -> bool {
        self.inner.object_id() == other.inner.object_id()
    }
}

impl Eq for UiItem {}

impl fmt::Debug for UiItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiItem").field("inner", &self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awaiting::AwaitingService;
    use crate::config::Settings;

    fn awaiting() -> Arc<dyn AwaitingPolicy> {
        Arc::new(AwaitingService::new(&Settings {
            action_delay_ms: 0,
            ..Settings::default()
        }))
    }

    #[test]
    fn zero_rectangle_sentinel_is_not_visible() {
        assert!(!is_visible_rectangle(NOT_VISIBLE_BOUNDING_RECTANGLE));
        assert!(!is_visible_rectangle(""));
        assert!(is_visible_rectangle("Left:0 Top:0 Width:10 Height:0"));
        assert!(is_visible_rectangle("Left:12 Top:40 Width:300 Height:20"));
    }

    #[test]
    fn window_context_requires_callback() {
        let err = ItemContext::window(awaiting(), "Notepad", None).unwrap_err();
        assert!(matches!(err, AutomationError::Construction(_)));
    }

    #[test]
    fn desktop_children_cannot_be_wrapped() {
        let desktop = ItemContext::desktop(awaiting(), "#32769");
        assert!(desktop.is_desktop());
        assert!(matches!(
            desktop.child(),
            Err(AutomationError::Construction(_))
        ));
    }

    #[test]
    fn window_children_share_the_callback() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = calls.clone();
        let callback: BringIntoView = Arc::new(move |title: &str| {
            seen.lock().unwrap().push(title.to_string());
            Ok(())
        });
        let window = ItemContext::window(awaiting(), "Run", Some(callback)).unwrap();
        let child = window.child().unwrap();
        child.bring_into_view().unwrap();
        assert_eq!(child.window_title(), "Run");
        assert_eq!(*calls.lock().unwrap(), vec!["Run".to_string()]);
    }

    #[test]
    fn bounds_center() {
        let bounds = Bounds {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 40.0,
        };
        assert_eq!(bounds.center(), (60.0, 40.0));
        assert!(!bounds.is_empty());
    }
}
