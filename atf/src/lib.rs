//! UI test automation for Windows desktop applications
//!
//! Elements are located by conditions over accessibility properties and
//! driven either through a WinAppDriver/Appium server or in-process through
//! UI Automation. Searches retry with a fixed delay until they succeed or the
//! attempts run out.

use std::sync::Arc;
use tracing::instrument;

pub mod awaiting;
pub mod condition;
pub mod config;
pub mod element;
pub mod elements;
pub mod errors;
pub mod factory;
pub mod keys;
pub mod logging;
pub mod navigation;
pub mod platforms;
pub mod search;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod wrapper;

pub use condition::{Condition, ConditionKey};
pub use config::{Backend, Settings};
pub use element::{Element, TypedElement};
pub use errors::AutomationError;
pub use factory::{ElementCreator, ElementFactory, ElementKind, ElementRegistry};
pub use keys::{Key, MouseButton};
pub use navigation::NavigationService;
pub use search::{SearchEngine, SearchOutcome};
pub use wrapper::UiItem;

/// An automation session against one desktop.
pub struct Session {
    navigation: NavigationService,
}

impl Session {
    /// Connects the backend selected by `settings` with the standard element
    /// types.
    #[instrument(skip(settings), fields(backend = ?settings.backend))]
    pub fn new(settings: &Settings) -> Result<Self, AutomationError> {
        Self::with_creator(settings, ElementCreator::standard())
    }

    /// Like [`Session::new`] with a custom factory chain.
    ///
    /// ```no_run
    /// use atf::{ElementCreator, ElementRegistry, Settings, Session};
    /// use std::sync::Arc;
    ///
    /// let host = ElementRegistry::new();
    /// let creator = ElementCreator::new(vec![
    ///     Arc::new(host),
    ///     Arc::new(atf::elements::standard_registry()),
    /// ]);
    /// let session = Session::with_creator(&Settings::default(), creator)?;
    /// # Ok::<(), atf::AutomationError>(())
    /// ```
    pub fn with_creator(settings: &Settings, creator: ElementCreator) -> Result<Self, AutomationError> {
        settings.validate()?;
        let provider = platforms::create_provider(settings)?;
        Ok(Self::from_provider(provider, creator))
    }

    pub fn from_provider(
        provider: Arc<dyn platforms::NavigationProvider>,
        creator: ElementCreator,
    ) -> Self {
        Self {
            navigation: NavigationService::new(provider, Arc::new(creator)),
        }
    }

    pub fn navigation(&self) -> &NavigationService {
        &self.navigation
    }

    /// Root of the current window.
    pub fn root(&self) -> Result<elements::WindowRootElement, AutomationError> {
        self.navigation.root()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("navigation", &self.navigation)
            .finish()
    }
}
