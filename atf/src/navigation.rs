//! Launching, switching between and closing application windows.

use crate::awaiting::AwaitingPolicy;
use crate::condition::Condition;
use crate::element::{Element, TypedElement};
use crate::elements::WindowRootElement;
use crate::errors::AutomationError;
use crate::factory::{ElementCreator, ElementKind};
use crate::keys::Key;
use crate::platforms::NavigationProvider;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{error, info, instrument, trace};

const RUN_WINDOW_TITLE: &str = "Run";
const RUN_SHORTCUT_KEY: char = 'r';
const RUN_COMBO_AUTOMATION_ID: &str = "12298";
const RUN_EDIT_AUTOMATION_ID: &str = "1001";
const CLOSE_APPLICATION_RETRIES: u32 = 2;
const MAX_CLOSE_ATTEMPTS_PER_WINDOW: u32 = 5;
const SWITCH_WINDOW_DELAY: Duration = Duration::from_millis(1000);

/// Default wait between launching an application and switching to it.
pub const DEFAULT_LAUNCH_DELAY: Duration = Duration::from_millis(2000);

pub struct NavigationService {
    provider: Arc<dyn NavigationProvider>,
    creator: Arc<ElementCreator>,
    visited_windows: Mutex<Vec<String>>,
}

impl NavigationService {
    pub fn new(provider: Arc<dyn NavigationProvider>, creator: Arc<ElementCreator>) -> Self {
        Self {
            provider,
            creator,
            visited_windows: Mutex::new(Vec::new()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn NavigationProvider> {
        &self.provider
    }

    pub fn awaiting(&self) -> Arc<dyn AwaitingPolicy> {
        self.provider.awaiting()
    }

    pub fn current_window_title(&self) -> Option<String> {
        self.provider.current_window_title()
    }

    /// Windows switched to so far, oldest first.
    pub fn visited_windows(&self) -> Vec<String> {
        self.visited().clone()
    }

    fn visited(&self) -> MutexGuard<'_, Vec<String>> {
        self.visited_windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Root of the window focus is currently on.
    pub fn root(&self) -> Result<WindowRootElement, AutomationError> {
        let title = self.current_window_title().ok_or_else(|| {
            AutomationError::ElementNotFound("no window has been opened yet".to_string())
        })?;
        self.window_root(&title)
    }

    pub fn window_root(&self, title: &str) -> Result<WindowRootElement, AutomationError> {
        let item = self.provider.get_app_root(title)?;
        Ok(self.wrap_root(item))
    }

    fn window_root_with_retries(
        &self,
        title: &str,
        retries: u32,
    ) -> Result<WindowRootElement, AutomationError> {
        let item = self.provider.get_app_root_with_retries(title, retries)?;
        Ok(self.wrap_root(item))
    }

    fn wrap_root(&self, item: crate::wrapper::UiItem) -> WindowRootElement {
        WindowRootElement::from_element(Element::new(
            item,
            self.provider.clone(),
            self.creator.clone(),
            ElementKind::WINDOW_ROOT,
        ))
    }

    /// Starts `path` through the Run dialog and switches to the window titled
    /// `title`. Failures are logged and reported as `false`.
    #[instrument(skip(self))]
    pub fn launch_application(&self, path: &str, title: &str, delay: Duration) -> bool {
        info!("launch application {path}");
        match self.try_launch_application(path, title, delay) {
            Ok(()) => true,
            Err(e) => {
                error!("failed to launch {path}: {e}");
                false
            }
        }
    }

    fn try_launch_application(
        &self,
        path: &str,
        title: &str,
        delay: Duration,
    ) -> Result<(), AutomationError> {
        let desktop = self.provider.get_desktop_root()?;
        desktop.press_modified_key(Key::Windows, RUN_SHORTCUT_KEY)?;

        let run = Element::new(
            self.provider.get_app_root(RUN_WINDOW_TITLE)?,
            self.provider.clone(),
            self.creator.clone(),
            ElementKind::ELEMENT,
        );
        let open_edit = run
            .find_first(&[Condition::automation_id(RUN_COMBO_AUTOMATION_ID)])?
            .find_first(&[Condition::automation_id(RUN_EDIT_AUTOMATION_ID)])?;
        open_edit.send_keys(path)?;
        open_edit.item().press_key(Key::Enter)?;

        self.awaiting().wait(delay);
        self.switch_to_window(title)?;
        Ok(())
    }

    /// Brings the window titled `title` to the front and makes it current.
    pub fn switch_to_window(&self, title: &str) -> Result<bool, AutomationError> {
        if title.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "window title cannot be empty".to_string(),
            ));
        }
        if self.current_window_title().as_deref() == Some(title) {
            return Ok(true);
        }
        info!("switch to window {title}");
        {
            let mut visited = self.visited();
            if !visited.iter().any(|t| t == title) {
                trace!("add {title} to visited windows");
                visited.push(title.to_string());
            }
        }
        self.awaiting().wait(SWITCH_WINDOW_DELAY);
        self.window_root(title)?.bring_into_view()
    }

    pub fn close_application(&self, title: &str) -> Result<bool, AutomationError> {
        info!("close application {title}");
        self.window_root_with_retries(title, CLOSE_APPLICATION_RETRIES)?
            .close_window()
    }

    /// Closes every visited window, most recent first, dismissing dialogs with
    /// Escape until the window no longer answers.
    pub fn close_all_applications(&self) -> bool {
        let titles: Vec<String> = self.visited().iter().rev().cloned().collect();
        for title in titles {
            if let Err(e) = self.close_until_gone(&title) {
                error!("failed to close {title}: {e}");
            }
        }
        true
    }

    fn close_until_gone(&self, title: &str) -> Result<(), AutomationError> {
        for _ in 0..MAX_CLOSE_ATTEMPTS_PER_WINDOW {
            let root = self.window_root_with_retries(title, CLOSE_APPLICATION_RETRIES)?;
            if root.class_name()?.is_empty() {
                return Ok(());
            }
            root.press_key(Key::Escape)?;
            self.close_application(title)?;
        }
        Ok(())
    }

    /// Forgets cached windows and the visited list.
    pub fn set_to_initial_state(&self) {
        self.provider.set_to_initial_state();
        self.visited().clear();
    }
}

impl std::fmt::Debug for NavigationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationService")
            .field("current_window_title", &self.current_window_title())
            .field("visited_windows", &*self.visited())
            .finish()
    }
}
