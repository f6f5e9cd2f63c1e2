//! Background loop that runs a pass every `EXPORT_TIME_INTERVAL` seconds while
//! `IS_AUTO_EXPORT` is enabled.
//!
//! Both settings are re-read at the top of every cycle, and an idle loop wakes
//! as soon as the flag is written. A failing or panicking pass is logged and
//! the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigService, ConfigUpdateEvent, settings};
use crate::monitor::{MonitorService, PassTrigger};

/// Sleep between checks while auto export is disabled.
pub const IDLE_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest active sleep.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// How long to sleep after a cycle.
///
/// Active cycles use the configured interval, clamped to at least one second;
/// an unreadable interval falls back to [`IDLE_INTERVAL`].
pub fn next_sleep(active: bool, interval_secs: Option<i64>) -> Duration {
    if !active {
        return IDLE_INTERVAL;
    }
    match interval_secs {
        Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
        Some(_) => MIN_INTERVAL,
        None => IDLE_INTERVAL,
    }
}

/// Config changes that can turn an idle loop active.
fn wakes_idle_loop(event: &ConfigUpdateEvent) -> bool {
    match event {
        ConfigUpdateEvent::ValueUpdated { key } => key == settings::IS_AUTO_EXPORT,
        ConfigUpdateEvent::Reloaded => true,
    }
}

pub struct ScheduleLoop {
    monitor: Arc<MonitorService>,
    config: Arc<ConfigService>,
    cancel: CancellationToken,
}

impl ScheduleLoop {
    pub fn new(
        monitor: Arc<MonitorService>,
        config: Arc<ConfigService>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            monitor,
            config,
            cancel,
        }
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Schedule loop started");
            self.run_loop().await;
            info!("Schedule loop stopped");
        })
    }

    async fn run_loop(&self) {
        let mut events = self.config.subscribe();
        loop {
            let active = settings::auto_export_enabled(&self.config);
            if active {
                self.run_guarded_pass().await;
            } else {
                debug!("Auto export disabled, idling");
            }

            let interval = settings::export_interval_secs(&self.config);
            if active && interval.is_none() {
                warn!(
                    key = settings::EXPORT_TIME_INTERVAL,
                    "Interval is missing or not a number, using the idle interval"
                );
            }
            if !self.pause(next_sleep(active, interval), !active, &mut events).await {
                break;
            }
        }
    }

    /// Sleep for `duration`; while `idle`, enabling auto export ends the sleep early.
    /// Returns `false` once cancelled.
    async fn pause(
        &self,
        duration: Duration,
        idle: bool,
        events: &mut broadcast::Receiver<ConfigUpdateEvent>,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + duration;
        let mut listening = idle;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = tokio::time::sleep_until(deadline) => return true,
                event = events.recv(), if listening => match event {
                    Ok(event) if wakes_idle_loop(&event) => {
                        debug!(event = %event.description(), "Settings changed, re-checking schedule");
                        return true;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => return true,
                    Err(RecvError::Closed) => listening = false,
                },
            }
        }
    }

    /// Run one pass in its own task so a panic surfaces as a `JoinError`.
    async fn run_guarded_pass(&self) {
        let monitor = self.monitor.clone();
        let handle = tokio::spawn(async move { monitor.run_pass(PassTrigger::Scheduled).await });

        match handle.await {
            Ok(Ok(report)) => debug!(
                deficient = report.deficient,
                files = report.files.len(),
                "Scheduled pass complete"
            ),
            Ok(Err(e)) => error!(error = %e, "Scheduled pass failed"),
            Err(e) if e.is_panic() => error!(error = %e, "Scheduled pass panicked"),
            Err(e) => error!(error = %e, "Scheduled pass was cancelled"),
        }
    }
}
