//! Balance monitor runner.
//!
//! One cycle fetches balances, then containers. Each successful fetch
//! replaces its snapshot and every changed amount is pushed to the
//! authenticated user it belongs to. A failed cycle is retried after a
//! growing backoff; the loop itself only ends on [`MonitorMessage::Shutdown`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::state::{ChangeEvent, ChangeKind, SnapshotState};
use crate::commands::{Keyboard, Reply};
use crate::report::local_now;
use crate::report::messages::{MENU_REFRESH, change_notification};
use crate::session::SessionStore;
use crate::sheets::{SheetsError, SheetsRepository};
use crate::telegram::{Messenger, mask_phone};

/// Messages that can be sent to the monitor.
#[derive(Debug, Clone)]
pub enum MonitorMessage {
    /// Start a cycle now instead of waiting for the timer.
    PollNow,
    /// Stop the monitor.
    Shutdown,
}

/// A poll cycle that could not complete.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Failed to fetch balances: {0}")]
    Balances(SheetsError),

    #[error("Failed to fetch containers: {0}")]
    Containers(SheetsError),
}

/// Outcome of one successful cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Changed amounts across both sources.
    pub changes: usize,
    /// Notifications that reached their recipient.
    pub delivered: usize,
}

/// Polls the spreadsheet and notifies users about changed amounts.
pub struct BalanceMonitor {
    repo: SheetsRepository,

    /// Shared with the dispatcher; read to resolve recipients.
    sessions: Arc<RwLock<SessionStore>>,

    messenger: Arc<dyn Messenger>,

    /// Previous snapshot of both sources.
    state: Mutex<SnapshotState>,

    poll_interval: Duration,

    backoff: Backoff,
}

impl BalanceMonitor {
    /// Creates a monitor with the default 7 s interval and 10..60 s backoff.
    #[must_use]
    pub fn new(
        repo: SheetsRepository,
        sessions: Arc<RwLock<SessionStore>>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            repo,
            sessions,
            messenger,
            state: Mutex::new(SnapshotState::new()),
            poll_interval: Duration::from_secs(7),
            backoff: Backoff::new(Duration::from_secs(10), Duration::from_secs(60)),
        }
    }

    /// Sets the delay between successful cycles.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the delay after a failed cycle and its cap.
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff = Backoff::new(initial, max);
        self
    }

    /// Runs the monitor loop. The first cycle starts immediately and only
    /// seeds the snapshots.
    pub async fn run(&self, mut rx: mpsc::Receiver<MonitorMessage>) {
        info!(
            "Balance monitor started, polling every {} seconds",
            self.poll_interval.as_secs()
        );

        let mut backoff = self.backoff.clone();
        let mut delay = Duration::ZERO;

        loop {
            tokio::select! {
                () = sleep(delay) => {}
                msg = rx.recv() => {
                    match msg {
                        Some(MonitorMessage::PollNow) => {
                            debug!("Received poll request");
                        }
                        Some(MonitorMessage::Shutdown) | None => {
                            info!("Balance monitor shutting down");
                            break;
                        }
                    }
                }
            }

            delay = match self.tick().await {
                Ok(report) => {
                    backoff.reset();
                    if report.changes > 0 {
                        info!(
                            "Detected {} changes, delivered {} notifications",
                            report.changes, report.delivered
                        );
                    }
                    self.poll_interval
                }
                Err(e) => {
                    let retry = backoff.next_delay();
                    warn!("{}; retrying in {} seconds", e, retry.as_secs());
                    retry
                }
            };
        }
    }

    /// Runs a single cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if either sheet cannot be fetched. Balance changes
    /// found before a container failure are still delivered.
    pub async fn tick(&self) -> Result<PollReport, MonitorError> {
        let mut report = PollReport::default();

        let balances = self.repo.balances().await.map_err(MonitorError::Balances)?;
        let events = self.state.lock().await.apply_balances(balances);
        self.notify(&events, &mut report).await;

        let containers = self
            .repo
            .containers()
            .await
            .map_err(MonitorError::Containers)?;
        let events = self.state.lock().await.apply_containers(containers);
        self.notify(&events, &mut report).await;

        let (balances, containers) = self.state.lock().await.tracked();
        debug!(
            "Cycle complete: tracking {} balances and {} containers",
            balances, containers
        );
        Ok(report)
    }

    async fn notify(&self, events: &[ChangeEvent], report: &mut PollReport) {
        for event in events {
            report.changes += 1;

            let recipient = {
                let sessions = self.sessions.read().await;
                let user = match event.kind {
                    ChangeKind::Balance => sessions.user_for_phone_key(&event.key),
                    ChangeKind::Container => sessions.user_for_code(&event.code),
                };
                user.map(|u| (u.user_id, u.phone.clone()))
            };

            let Some((user_id, phone)) = recipient else {
                debug!("No authenticated user for changed {:?} {}", event.kind, event.code);
                continue;
            };

            let text = change_notification(event, &phone, &local_now());
            if let Err(e) = self.messenger.send(user_id, &Reply::text(text)).await {
                warn!(
                    "Failed to notify {} ({}): {}",
                    user_id,
                    mask_phone(&phone),
                    e
                );
                continue;
            }
            report.delivered += 1;
            info!(
                "Notified {} ({}) about {:?} change",
                user_id,
                mask_phone(&phone),
                event.kind
            );

            let menu = Reply::text(MENU_REFRESH).with_keyboard(Keyboard::ClientMenu);
            if let Err(e) = self.messenger.send(user_id, &menu).await {
                debug!("Failed to refresh menu for {}: {}", user_id, e);
            }
        }
    }
}

impl std::fmt::Debug for BalanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceMonitor")
            .field("repo", &self.repo)
            .field("poll_interval", &self.poll_interval)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
