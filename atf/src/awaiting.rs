//! Blocking waits: fixed delays between actions and search attempts, bounded
//! polling, and plain waits that keep the remote session alive.

use crate::config::Settings;
use crate::errors::AutomationError;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Side effect run on every tick of [`AwaitingPolicy::wait`].
pub type KeepAlive = Box<dyn Fn() -> Result<(), AutomationError> + Send + Sync>;

pub trait AwaitingPolicy: Send + Sync {
    /// Polls `predicate` until it holds or `max` elapses (the configured default
    /// when `None`). Gives up silently; callers re-check the predicate.
    fn wait_for(&self, predicate: &mut dyn FnMut() -> bool, max: Option<Duration>);

    /// Sleeps for `duration`, pinging the session on every tick.
    fn wait(&self, duration: Duration);

    fn wait_for_default_action_delay(&self);

    fn wait_for_default_retry_delay(&self);
}

pub struct AwaitingService {
    action_delay: Duration,
    retry_delay: Duration,
    poll_interval: Duration,
    default_timeout: Duration,
    keep_alive: Option<KeepAlive>,
}

impl AwaitingService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            action_delay: settings.action_delay(),
            retry_delay: settings.retry_delay(),
            poll_interval: settings.wait_poll_interval(),
            default_timeout: settings.wait_default_timeout(),
            keep_alive: None,
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: KeepAlive) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    fn ping(&self) {
        if let Some(keep_alive) = &self.keep_alive {
            if let Err(e) = keep_alive() {
                warn!("keep-alive ping failed: {e}");
            }
        }
    }
}

impl fmt::Debug for AwaitingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitingService")
            .field("action_delay", &self.action_delay)
            .field("retry_delay", &self.retry_delay)
            .field("poll_interval", &self.poll_interval)
            .field("default_timeout", &self.default_timeout)
            .field("keep_alive", &self.keep_alive.is_some())
            .finish()
    }
}

impl AwaitingPolicy for AwaitingService {
    fn wait_for(&self, predicate: &mut dyn FnMut() -> bool, max: Option<Duration>) {
        let max = max.unwrap_or(self.default_timeout);
        trace!(?max, "start wait_for");
        let deadline = Instant::now() + max;
        let mut tick = 0u32;
        while !predicate() && Instant::now() < deadline {
            trace!(tick, "wait_for tick");
            tick += 1;
            thread::sleep(self.poll_interval);
        }
    }

    fn wait(&self, duration: Duration) {
        trace!(?duration, "start wait");
        let deadline = Instant::now() + duration;
        let mut tick = 0u32;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            trace!(tick, "wait tick");
            tick += 1;
            self.ping();
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    fn wait_for_default_action_delay(&self) {
        thread::sleep(self.action_delay);
    }

    fn wait_for_default_retry_delay(&self) {
        thread::sleep(self.retry_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_settings() -> Settings {
        Settings {
            action_delay_ms: 0,
            retry_delay_ms: 0,
            wait_poll_interval_ms: 5,
            wait_default_timeout_ms: 50,
            ..Settings::default()
        }
    }

    #[test]
    fn wait_for_returns_as_soon_as_predicate_holds() {
        let service = AwaitingService::new(&fast_settings());
        let mut calls = 0;
        let started = Instant::now();
        service.wait_for(
            &mut || {
                calls += 1;
                calls == 3
            },
            Some(Duration::from_secs(5)),
        );
        assert_eq!(calls, 3);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn wait_for_gives_up_silently_at_the_default_timeout() {
        let service = AwaitingService::new(&fast_settings());
        let started = Instant::now();
        service.wait_for(&mut || false, None);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
    }

    #[test]
    fn wait_pings_on_every_tick() {
        let pings = Arc::new(AtomicU32::new(0));
        let counter = pings.clone();
        let service = AwaitingService::new(&fast_settings()).with_keep_alive(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        service.wait(Duration::from_millis(40));
        assert!(pings.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn failing_ping_does_not_abort_the_wait() {
        let service = AwaitingService::new(&fast_settings()).with_keep_alive(Box::new(|| {
            Err(AutomationError::Transport("session gone".into()))
        }));
        let started = Instant::now();
        service.wait(Duration::from_millis(20));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
