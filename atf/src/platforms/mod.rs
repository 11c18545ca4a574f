use crate::awaiting::AwaitingPolicy;
use crate::condition::Condition;
use crate::config::{Backend, Settings};
use crate::errors::AutomationError;
use crate::wrapper::UiItem;
use std::fmt::Debug;
use std::sync::Arc;

pub mod appium;
#[cfg(target_os = "windows")]
pub mod windows;

/// Retries used by [`NavigationProvider::get_app_root`].
pub const DEFAULT_APP_ROOT_RETRIES: u32 = 5;

/// Translation of single conditions into native lookups for one automation
/// engine.
///
/// Lookups are scoped to `scope`, or to the whole session/desktop when it is
/// `None`. Adapters never retry; an unknown condition key fails with
/// [`AutomationError::SearchCriteria`].
pub trait BackendAdapter: Send + Sync {
    /// Opaque reference to one native node.
    type Handle: Clone + PartialEq + Debug;

    /// First descendant of the scope, whatever it is.
    fn find_first_descendant(
        &self,
        scope: Option<&Self::Handle>,
    ) -> Result<Option<Self::Handle>, AutomationError>;

    fn find_all_descendants(
        &self,
        scope: Option<&Self::Handle>,
    ) -> Result<Vec<Self::Handle>, AutomationError>;

    fn find_first_by(
        &self,
        scope: Option<&Self::Handle>,
        condition: &Condition,
    ) -> Result<Option<Self::Handle>, AutomationError>;

    fn find_all_by(
        &self,
        scope: Option<&Self::Handle>,
        condition: &Condition,
    ) -> Result<Vec<Self::Handle>, AutomationError>;

    /// Reads a canonical property of a node as a string.
    fn read_property(&self, handle: &Self::Handle, property: &str)
        -> Result<String, AutomationError>;
}

/// Entry point for searches and window roots of one session.
pub trait NavigationProvider: Send + Sync {
    fn find_first(&self, scope: &UiItem, conditions: &[Condition])
        -> Result<UiItem, AutomationError>;

    fn find_all(&self, scope: &UiItem, conditions: &[Condition])
        -> Result<Vec<UiItem>, AutomationError>;

    fn get_app_root(&self, title: &str) -> Result<UiItem, AutomationError> {
        self.get_app_root_with_retries(title, DEFAULT_APP_ROOT_RETRIES)
    }

    fn get_app_root_with_retries(&self, title: &str, retries: u32)
        -> Result<UiItem, AutomationError>;

    fn get_desktop_root(&self) -> Result<UiItem, AutomationError>;

    /// Title of the window last resolved by `get_app_root`.
    fn current_window_title(&self) -> Option<String>;

    /// Forgets cached windows and roots.
    fn set_to_initial_state(&self);

    fn awaiting(&self) -> Arc<dyn AwaitingPolicy>;
}

/// Builds the navigation provider selected by `settings.backend`.
pub fn create_provider(settings: &Settings) -> Result<Arc<dyn NavigationProvider>, AutomationError> {
    match settings.backend {
        Backend::Remote => {
            let provider: Arc<dyn NavigationProvider> =
                appium::AppiumNavigationProvider::connect(settings)?;
            Ok(provider)
        }
        Backend::Accessibility => {
            #[cfg(target_os = "windows")]
            {
                let provider: Arc<dyn NavigationProvider> =
                    windows::UiaNavigationProvider::new(settings)?;
                Ok(provider)
            }
            #[cfg(not(target_os = "windows"))]
            {
                Err(AutomationError::UnsupportedPlatform(
                    "UI Automation backend is only available on Windows".to_string(),
                ))
            }
        }
    }
}
