use crate::awaiting::AwaitingPolicy;
use crate::condition::{merge_conditions, Condition};
use crate::errors::AutomationError;
use crate::factory::{ElementCreator, ElementFactory, ElementKind};
use crate::keys::{Key, MouseButton};
use crate::platforms::NavigationProvider;
use crate::wrapper::{ElementDimensions, ScreenCoordinates, UiItem};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, trace};

const POPUP_CLASS_NAME: &str = "Popup";
const TOOLTIP_APPEAR_DELAY: Duration = Duration::from_secs(1);
const MAX_CLOSE_WINDOW_ATTEMPTS: u32 = 10;

/// An element type that can be searched for with [`Element::find_element`].
pub trait TypedElement: Sized + Send + Sync + 'static {
    const KIND: ElementKind;

    fn from_element(element: Element) -> Self;

    fn element(&self) -> &Element;
}

/// A UI element found in some application window.
///
/// Searches started from an element are scoped to its subtree and return
/// typed elements built by the session's [`ElementCreator`].
#[derive(Clone)]
pub struct Element {
    item: UiItem,
    navigation: Arc<dyn NavigationProvider>,
    creator: Arc<ElementCreator>,
    search_conditions: Arc<[Condition]>,
}

impl TypedElement for Element {
    const KIND: ElementKind = ElementKind::ELEMENT;

    fn from_element(element: Element) -> Self {
        element
    }

    fn element(&self) -> &Element {
        self
    }
}

impl Element {
    /// Wraps `item` as an element of `kind`, recording that kind's default
    /// search conditions.
    pub fn new(
        item: UiItem,
        navigation: Arc<dyn NavigationProvider>,
        creator: Arc<ElementCreator>,
        kind: ElementKind,
    ) -> Self {
        let search_conditions = creator.default_search_conditions(kind).into();
        Self {
            item,
            navigation,
            creator,
            search_conditions,
        }
    }

    pub fn item(&self) -> &UiItem {
        &self.item
    }

    pub fn navigation(&self) -> &Arc<dyn NavigationProvider> {
        &self.navigation
    }

    /// Default conditions of the kind this element was created as.
    pub fn default_search_conditions(&self) -> &[Condition] {
        &self.search_conditions
    }

    fn awaiting(&self) -> Arc<dyn AwaitingPolicy> {
        self.navigation.awaiting()
    }

    fn create<T: TypedElement>(&self, item: UiItem) -> Result<T, AutomationError> {
        let element = Element::new(item, self.navigation.clone(), self.creator.clone(), T::KIND);
        self.creator.create::<T>(element)
    }

    fn conditions_for<T: TypedElement>(&self, conditions: &[Condition]) -> Vec<Condition> {
        let defaults = self.creator.default_search_conditions(T::KIND);
        merge_conditions(&defaults, conditions)
    }

    /// First `T` in this element's subtree matching `conditions` merged over
    /// the defaults of `T`.
    #[instrument(level = "debug", skip(self), fields(kind = %T::KIND))]
    pub fn find_element<T: TypedElement>(&self, conditions: &[Condition]) -> Result<T, AutomationError> {
        self.awaiting().wait_for_default_action_delay();
        let conditions = self.conditions_for::<T>(conditions);
        let item = self.navigation.find_first(&self.item, &conditions)?;
        self.create(item)
    }

    pub fn find_first(&self, conditions: &[Condition]) -> Result<Element, AutomationError> {
        self.find_element::<Element>(conditions)
    }

    /// Every `T` in this element's subtree matching `conditions` merged over
    /// the defaults of `T`. Empty when nothing matches.
    #[instrument(level = "debug", skip(self), fields(kind = %T::KIND))]
    pub fn find_all_elements<T: TypedElement>(
        &self,
        conditions: &[Condition],
    ) -> Result<Vec<T>, AutomationError> {
        self.awaiting().wait_for_default_action_delay();
        let conditions = self.conditions_for::<T>(conditions);
        self.navigation
            .find_all(&self.item, &conditions)?
            .into_iter()
            .map(|item| self.create(item))
            .collect()
    }

    pub fn find_all(&self, conditions: &[Condition]) -> Result<Vec<Element>, AutomationError> {
        self.find_all_elements::<Element>(conditions)
    }

    /// Like [`Element::find_element`], logging the failure instead of returning it.
    pub fn try_find_element<T: TypedElement>(&self, conditions: &[Condition]) -> Option<T> {
        match self.find_element::<T>(conditions) {
            Ok(found) => Some(found),
            Err(e) => {
                error!("{e}");
                None
            }
        }
    }

    pub fn name(&self) -> Result<String, AutomationError> {
        self.item.name()
    }

    pub fn runtime_id(&self) -> Result<String, AutomationError> {
        self.item.runtime_id()
    }

    pub fn class_name(&self) -> Result<String, AutomationError> {
        self.item.class_name()
    }

    pub fn help_text(&self) -> Result<String, AutomationError> {
        self.item.help_text()
    }

    pub fn property(&self, name: &str) -> Result<String, AutomationError> {
        self.item.property(name)
    }

    pub fn coordinates(&self) -> Result<ScreenCoordinates, AutomationError> {
        self.item.coordinates()
    }

    pub fn dimensions(&self) -> Result<ElementDimensions, AutomationError> {
        self.item.dimensions()
    }

    pub fn is_visible(&self) -> Result<bool, AutomationError> {
        self.awaiting().wait_for_default_action_delay();
        self.item.is_visible()
    }

    pub fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.awaiting().wait_for_default_action_delay();
        self.item.is_enabled()
    }

    /// Polls until the element reports enabled or `max` elapses. Gives up
    /// silently.
    pub fn wait_for_enabled(&self, max: Option<Duration>) {
        let item = &self.item;
        self.awaiting()
            .wait_for(&mut || item.is_enabled().unwrap_or(false), max);
    }

    /// Left click in the middle of the element once it is enabled.
    pub fn click(&self) -> Result<(), AutomationError> {
        self.click_button(MouseButton::Left)
    }

    pub fn click_button(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.wait_for_enabled(None);
        self.item.click(button)
    }

    /// Left click, waiting at most `max` for the element to become enabled.
    pub fn click_within(&self, max: Duration) -> Result<(), AutomationError> {
        self.wait_for_enabled(Some(max));
        self.item.click(MouseButton::Left)
    }

    /// Left click at an offset from the middle of the element.
    pub fn click_with_offset(&self, x_offset: i32, y_offset: i32) -> Result<(), AutomationError> {
        self.item
            .click_with_offset(MouseButton::Left, x_offset, y_offset)
    }

    pub fn double_click(&self) -> Result<(), AutomationError> {
        debug!("double click");
        self.wait_for_enabled(None);
        self.item.double_click()
    }

    pub fn send_keys(&self, text: &str) -> Result<&Self, AutomationError> {
        self.awaiting().wait_for_default_action_delay();
        self.item.send_keys(text)?;
        Ok(self)
    }

    pub fn press_key(&self, key: Key) -> Result<&Self, AutomationError> {
        self.item.press_key(key)?;
        Ok(self)
    }

    pub fn press_key_combo(&self, keys: &[Key]) -> Result<&Self, AutomationError> {
        self.item.press_key_combo(keys)?;
        Ok(self)
    }

    pub fn take_screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        self.item.screenshot()
    }

    pub fn take_screenshot_to_file(&self, path: impl AsRef<Path>) -> Result<(), AutomationError> {
        self.item.screenshot_to_file(path)
    }

    /// Presses Alt+F4 until the window this element belongs to stops
    /// answering.
    pub fn try_close_window(&self) {
        for attempt in 1..=MAX_CLOSE_WINDOW_ATTEMPTS {
            let closed = self
                .item
                .class_name()
                .and_then(|_| self.item.press_key_combo(&[Key::Alt, Key::F4]));
            if let Err(e) = closed {
                trace!(attempt, "window closed: {e}");
                return;
            }
        }
    }

    /// Hovers the element and returns the tooltip popup of the current window.
    pub fn tooltip(&self) -> Result<Element, AutomationError> {
        self.awaiting().wait_for_default_action_delay();
        self.item.hover()?;
        self.awaiting().wait(TOOLTIP_APPEAR_DELAY);
        self.current_popup()
    }

    /// Popup of the current window, e.g. an open drop-down list.
    pub fn popup(&self) -> Result<Element, AutomationError> {
        self.awaiting().wait_for_default_action_delay();
        self.current_popup()
    }

    fn current_popup(&self) -> Result<Element, AutomationError> {
        let title = self.navigation.current_window_title().unwrap_or_default();
        let root = self.navigation.get_app_root(&title)?;
        let root = Element::new(
            root,
            self.navigation.clone(),
            self.creator.clone(),
            ElementKind::ELEMENT,
        );
        root.find_first(&[Condition::class_name(POPUP_CLASS_NAME)])
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("item", &self.item)
            .field("search_conditions", &self.search_conditions)
            .finish()
    }
}
