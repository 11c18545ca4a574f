use super::adapter::AppiumAdapter;
use super::client::AppiumSession;
use super::item::AppiumUiItem;
use super::DESKTOP_CLASS_NAME;
use crate::awaiting::{AwaitingPolicy, AwaitingService};
use crate::condition::Condition;
use crate::config::Settings;
use crate::errors::AutomationError;
use crate::keys::Key;
use crate::platforms::{BackendAdapter, NavigationProvider};
use crate::search::SearchEngine;
use crate::wrapper::{BringIntoView, ItemContext, UiItem};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;
use tracing::{debug, error, instrument, trace};

#[derive(Debug, Default)]
struct WindowCache {
    current_window_title: Option<String>,
    desktop: Option<String>,
    last_window: Option<String>,
}

/// Navigation over a WinAppDriver/Appium desktop session.
pub struct AppiumNavigationProvider {
    adapter: Arc<AppiumAdapter>,
    engine: SearchEngine,
    awaiting: Arc<dyn AwaitingPolicy>,
    cache: Mutex<WindowCache>,
    this: Weak<AppiumNavigationProvider>,
}

impl AppiumNavigationProvider {
    /// Starts a desktop session on `settings.machine_url`.
    pub fn connect(settings: &Settings) -> Result<Arc<Self>, AutomationError> {
        let session = AppiumSession::start(settings)?;
        Ok(Self::with_session(session, settings))
    }

    /// Uses an already started session. Waits ping the desktop to keep the
    /// session from timing out.
    pub fn with_session(session: AppiumSession, settings: &Settings) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let pinger = this.clone();
            let awaiting: Arc<dyn AwaitingPolicy> = Arc::new(
                AwaitingService::new(settings).with_keep_alive(Box::new(move || {
                    match pinger.upgrade() {
                        Some(provider) => provider.ping_desktop().map(|_| ()),
                        None => Ok(()),
                    }
                })),
            );
            Self {
                adapter: Arc::new(AppiumAdapter::new(session)),
                engine: SearchEngine::from_settings(settings, awaiting.clone()),
                awaiting,
                cache: Mutex::new(WindowCache::default()),
                this: this.clone(),
            }
        })
    }

    pub fn session(&self) -> &AppiumSession {
        self.adapter.session()
    }

    fn cache(&self) -> MutexGuard<'_, WindowCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Looks the desktop up again, bypassing the cache.
    pub fn ping_desktop(&self) -> Result<String, AutomationError> {
        trace!("getting desktop root explicitly");
        let desktop = self
            .adapter
            .find_first_by(None, &Condition::class_name(DESKTOP_CLASS_NAME))?
            .ok_or_else(|| AutomationError::ElementNotFound("desktop root".to_string()))?;
        self.cache().desktop = Some(desktop.clone());
        Ok(desktop)
    }

    fn desktop_element(&self) -> Result<String, AutomationError> {
        let cached = self.cache().desktop.clone();
        match cached {
            Some(desktop) => Ok(desktop),
            None => self.ping_desktop(),
        }
    }

    fn find_window(&self, title: &str, retries: u32) -> Result<String, AutomationError> {
        let by_name = Condition::name(title);
        for attempt in 1..=retries.max(1) {
            let desktop = self.desktop_element()?;
            match self.adapter.find_first_by(Some(&desktop), &by_name) {
                Ok(Some(window)) => return Ok(window),
                Ok(None) => error!(attempt, "window with title {title} not found"),
                Err(e) => error!(attempt, "get window with title {title} failed: {e}"),
            }
        }
        let e = AutomationError::ElementNotFound(format!("couldn't find window with title {title}"));
        error!("{e}");
        Err(e)
    }

    fn bring_into_view_callback(&self) -> BringIntoView {
        let this = self.this.clone();
        Arc::new(move |title: &str| {
            let Some(provider) = this.upgrade() else {
                return Ok(());
            };
            if provider.current_window_title().as_deref() == Some(title) {
                return Ok(());
            }
            debug!("bringing {title} into view");
            let root = provider.get_app_root(title)?;
            root.press_key_combo(&[Key::Windows, Key::ArrowUp])?;
            provider.awaiting.wait_for_default_action_delay();
            root.press_key_combo(&[Key::Windows, Key::ArrowUp])
        })
    }
}

impl NavigationProvider for AppiumNavigationProvider {
    fn find_first(&self, scope: &UiItem, conditions: &[Condition]) -> Result<UiItem, AutomationError> {
        self.engine.find_first_in::<AppiumUiItem>(scope, conditions)
    }

    fn find_all(&self, scope: &UiItem, conditions: &[Condition]) -> Result<Vec<UiItem>, AutomationError> {
        self.engine.find_all_in::<AppiumUiItem>(scope, conditions)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_app_root_with_retries(&self, title: &str, retries: u32) -> Result<UiItem, AutomationError> {
        if title == DESKTOP_CLASS_NAME {
            return self.get_desktop_root();
        }
        let started = Instant::now();
        let cached = {
            let cache = self.cache();
            match (&cache.current_window_title, &cache.last_window) {
                (Some(current), Some(window)) if current == title => Some(window.clone()),
                _ => None,
            }
        };
        let window = match cached {
            Some(window) => window,
            None => {
                let window = self.find_window(title, retries)?;
                let mut cache = self.cache();
                cache.current_window_title = Some(title.to_string());
                cache.last_window = Some(window.clone());
                window
            }
        };
        let context = ItemContext::window(
            self.awaiting.clone(),
            title,
            Some(self.bring_into_view_callback()),
        )?;
        trace!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished getting application's root with title {title}"
        );
        Ok(UiItem::new(Box::new(AppiumUiItem::new(
            self.adapter.clone(),
            window,
            context,
        ))))
    }

    fn get_desktop_root(&self) -> Result<UiItem, AutomationError> {
        let desktop = self.desktop_element()?;
        Ok(UiItem::new(Box::new(AppiumUiItem::new(
            self.adapter.clone(),
            desktop,
            ItemContext::desktop(self.awaiting.clone(), DESKTOP_CLASS_NAME),
        ))))
    }

    fn current_window_title(&self) -> Option<String> {
        self.cache().current_window_title.clone()
    }

    fn set_to_initial_state(&self) {
        *self.cache() = WindowCache::default();
    }

    fn awaiting(&self) -> Arc<dyn AwaitingPolicy> {
        self.awaiting.clone()
    }
}

impl std::fmt::Debug for AppiumNavigationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppiumNavigationProvider")
            .field("session_id", &self.session().session_id())
            .field("cache", &*self.cache())
            .finish()
    }
}
