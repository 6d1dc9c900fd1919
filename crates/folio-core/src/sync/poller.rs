//! Interval driver for the reconciliation engine.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use super::engine::ReconcileEngine;
use crate::config::ClientConfig;
use crate::db::KeyValueStore;
use crate::fetch::ContentSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Stopped,
    Running,
    Paused,
}

/// Whether the consumer is currently showing the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

struct Inner {
    state: PollerState,
    /// Dropping the sender cancels the timer of the running loop.
    cancel: Option<watch::Sender<()>>,
}

/// Runs a reconcile after `initial_delay` and then every `interval`.
///
/// Pausing, stopping, or dropping the poller cancels future cycles only; a
/// cycle already in flight runs to completion. Must be driven from inside a
/// Tokio runtime.
pub struct Poller<S, F> {
    engine: Arc<ReconcileEngine<S, F>>,
    initial_delay: Duration,
    interval: Duration,
    inner: Mutex<Inner>,
}

impl<S: KeyValueStore, F: ContentSource> Poller<S, F> {
    pub fn new(engine: Arc<ReconcileEngine<S, F>>, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            engine,
            initial_delay,
            interval,
            inner: Mutex::new(Inner {
                state: PollerState::Stopped,
                cancel: None,
            }),
        }
    }

    pub fn from_config(engine: Arc<ReconcileEngine<S, F>>, config: &ClientConfig) -> Self {
        Self::new(engine, config.initial_delay, config.poll_interval)
    }

    pub fn engine(&self) -> &Arc<ReconcileEngine<S, F>> {
        &self.engine
    }

    pub fn state(&self) -> PollerState {
        self.lock().state
    }

    /// Begin polling. No-op while already running.
    pub fn start(&self) {
        let mut inner = self.lock();
        if inner.state == PollerState::Running {
            return;
        }
        let engine = Arc::clone(&self.engine);
        let (cancel, cancelled) = watch::channel(());
        tokio::spawn(run(engine, cancelled, self.initial_delay, self.interval));
        inner.cancel = Some(cancel);
        inner.state = PollerState::Running;
        tracing::debug!(
            initial_delay_ms = self.initial_delay.as_millis(),
            interval_ms = self.interval.as_millis(),
            "Poller started"
        );
    }

    /// Cancel the loop but remember that it should come back.
    pub fn pause(&self) {
        let mut inner = self.lock();
        if inner.state != PollerState::Running {
            return;
        }
        inner.cancel = None;
        inner.state = PollerState::Paused;
        tracing::debug!("Poller paused");
    }

    /// Restart the loop and reconcile immediately.
    ///
    /// No-op while running, so repeated visibility events do not stack
    /// extra cycles.
    pub fn resume(&self) {
        if self.state() == PollerState::Running {
            return;
        }
        self.start();
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            engine.reconcile_cycle().await;
        });
    }

    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.cancel = None;
        inner.state = PollerState::Stopped;
    }

    pub fn on_visibility(&self, visibility: Visibility) {
        match visibility {
            Visibility::Hidden => self.pause(),
            Visibility::Visible => self.resume(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run<S: KeyValueStore, F: ContentSource>(
    engine: Arc<ReconcileEngine<S, F>>,
    mut cancelled: watch::Receiver<()>,
    initial_delay: Duration,
    interval: Duration,
) {
    let started = Instant::now();
    let initial = tokio::time::sleep_until(started + initial_delay);
    tokio::pin!(initial);
    let mut initial_pending = true;

    let mut ticker = tokio::time::interval_at(started + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Cancellation is only observed between cycles.
        tokio::select! {
            biased;
            _ = cancelled.changed() => break,
            () = &mut initial, if initial_pending => {
                initial_pending = false;
            }
            _ = ticker.tick() => {}
        }
        let outcome = engine.reconcile_cycle().await;
        tracing::debug!(
            source = %outcome.source,
            changed = outcome.changed,
            persisted = outcome.persisted,
            "Poll cycle finished"
        );
    }
    tracing::debug!("Poll loop exited");
}
