use super::adapter::{UiaAdapter, UiaHandle};
use super::item::UiaUiItem;
use super::{create_automation, platform_error, DESKTOP_CLASS_NAME};
use crate::awaiting::{AwaitingPolicy, AwaitingService};
use crate::condition::Condition;
use crate::config::Settings;
use crate::errors::AutomationError;
use crate::platforms::NavigationProvider;
use crate::search::SearchEngine;
use crate::wrapper::{BringIntoView, ItemContext, UiItem};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, trace};

const WINDOW_SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct WindowCache {
    current_window_title: Option<String>,
    last_window: Option<UiaHandle>,
}

/// Navigation over the local UI Automation tree.
pub struct UiaNavigationProvider {
    adapter: Arc<UiaAdapter>,
    engine: SearchEngine,
    awaiting: Arc<dyn AwaitingPolicy>,
    cache: Mutex<WindowCache>,
    this: Weak<UiaNavigationProvider>,
}

impl UiaNavigationProvider {
    pub fn new(settings: &Settings) -> Result<Arc<Self>, AutomationError> {
        let adapter = Arc::new(UiaAdapter::new(create_automation()?));
        let awaiting: Arc<dyn AwaitingPolicy> = Arc::new(AwaitingService::new(settings));
        Ok(Arc::new_cyclic(|this: &Weak<Self>| Self {
            adapter,
            engine: SearchEngine::from_settings(settings, awaiting.clone()),
            awaiting,
            cache: Mutex::new(WindowCache::default()),
            this: this.clone(),
        }))
    }

    pub fn adapter(&self) -> &Arc<UiaAdapter> {
        &self.adapter
    }

    fn cache(&self) -> MutexGuard<'_, WindowCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn find_window(&self, title: &str, retries: u32) -> Result<UiaHandle, AutomationError> {
        for attempt in 1..=retries.max(1) {
            match self.adapter.find_window(title) {
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
            provider.get_app_root(title).map(|_| ())
        })
    }
}

impl NavigationProvider for UiaNavigationProvider {
    fn find_first(&self, scope: &UiItem, conditions: &[Condition]) -> Result<UiItem, AutomationError> {
        self.engine.find_first_in::<UiaUiItem>(scope, conditions)
    }

    fn find_all(&self, scope: &UiItem, conditions: &[Condition]) -> Result<Vec<UiItem>, AutomationError> {
        self.engine.find_all_in::<UiaUiItem>(scope, conditions)
    }

    /// Resolves the window and gives it keyboard focus.
    #[instrument(level = "debug", skip(self))]
    fn get_app_root_with_retries(&self, title: &str, retries: u32) -> Result<UiItem, AutomationError> {
        if title == DESKTOP_CLASS_NAME {
            return self.get_desktop_root();
        }
        self.awaiting.wait(WINDOW_SETTLE_DELAY);
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
        window
            .element()
            .set_focus()
            .map_err(platform_error("Failed to focus window"))?;
        let context = ItemContext::window(
            self.awaiting.clone(),
            title,
            Some(self.bring_into_view_callback()),
        )?;
        trace!(
            runtime_id = window.runtime_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished getting application's root with title {title}"
        );
        Ok(UiItem::new(Box::new(UiaUiItem::new(
            self.adapter.clone(),
            window,
            context,
        ))))
    }

    fn get_desktop_root(&self) -> Result<UiItem, AutomationError> {
        trace!("getting desktop root");
        Ok(UiItem::new(Box::new(UiaUiItem::new(
            self.adapter.clone(),
            self.adapter.desktop()?,
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

impl std::fmt::Debug for UiaNavigationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiaNavigationProvider")
            .field("cache", &*self.cache())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "drives the interactive desktop"]
    fn desktop_root_uses_the_desktop_context() {
        let provider = UiaNavigationProvider::new(&Settings::default()).unwrap();
        let desktop = provider.get_desktop_root().unwrap();
        assert!(desktop.context().is_desktop());
        assert!(provider.current_window_title().is_none());
    }
}
