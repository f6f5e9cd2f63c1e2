//! One monitoring pass, end to end.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::deficiency::{DeficiencyGroups, aggregate};
use super::verifier::BatchVerifier;
use crate::Result;
use crate::config::ConfigService;
use crate::config::settings::{MonitorSettings, RefundSettings};
use crate::database::repositories::OrderRepository;
use crate::domain::{MonitorWindow, Order};
use crate::export::{ExportFailure, ExportSink};
use crate::notification::{NotificationEvent, NotificationService};
use crate::refund::{REFUND_ATTEMPTS, RefundOutcome, RefundService, submit_with_retry};

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PassTrigger {
    Scheduled,
    OnDemand,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub trigger: PassTrigger,
    pub window: MonitorWindow,
    /// Eligible orders checked.
    pub orders: usize,
    /// Orders whose count could not be fetched.
    pub unresolved: usize,
    /// Orders with a shortfall, across all products.
    pub deficient: usize,
    pub records: DeficiencyGroups,
    pub files: Vec<String>,
    pub failed_exports: Vec<ExportFailure>,
    pub refunds: Vec<RefundOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibleOrders {
    pub window: MonitorWindow,
    pub orders: Vec<Order>,
}

pub struct MonitorService {
    config: Arc<ConfigService>,
    orders: Arc<dyn OrderRepository>,
    verifier: BatchVerifier,
    export: Arc<dyn ExportSink>,
    refunds: Option<Arc<dyn RefundService>>,
    notifier: Arc<NotificationService>,
    /// Held for the whole pass so on-demand and scheduled passes never overlap.
    pass_lock: Mutex<()>,
}

/// Links to refund per product: only products the partner handles, only non-empty links.
fn refund_batches(groups: &DeficiencyGroups, settings: &RefundSettings) -> Vec<(String, Vec<String>)> {
    groups
        .iter()
        .filter(|group| settings.covers(&group.product_name))
        .map(|group| {
            let links: Vec<String> = group
                .records
                .iter()
                .filter(|record| !record.link.is_empty())
                .map(|record| record.link.clone())
                .collect();
            (group.product_name.clone(), links)
        })
        .filter(|(_, links)| !links.is_empty())
        .collect()
}

impl MonitorService {
    pub fn new(
        config: Arc<ConfigService>,
        orders: Arc<dyn OrderRepository>,
        verifier: BatchVerifier,
        export: Arc<dyn ExportSink>,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            config,
            orders,
            verifier,
            export,
            refunds: None,
            notifier,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn with_refunds(mut self, refunds: Arc<dyn RefundService>) -> Self {
        self.refunds = Some(refunds);
        self
    }

    pub fn config(&self) -> &Arc<ConfigService> {
        &self.config
    }

    fn current_window(settings: &MonitorSettings) -> Result<MonitorWindow> {
        MonitorWindow::ending_before(
            Utc::now().timestamp(),
            settings.export_time_offset,
            settings.export_time_interval,
        )
    }

    /// Orders the next pass would check.
    pub async fn list_eligible_orders(&self) -> Result<EligibleOrders> {
        let settings = MonitorSettings::from_config(&self.config)?;
        let window = Self::current_window(&settings)?;
        let orders = self
            .orders
            .find_eligible(&settings.monitored_good_ids, &window)
            .await?;
        Ok(EligibleOrders { window, orders })
    }

    /// Run a full pass and notify the outcome.
    ///
    /// Failures of an on-demand pass are also notified; scheduled failures are
    /// only logged by the caller.
    pub async fn run_pass(&self, trigger: PassTrigger) -> Result<PassReport> {
        let _guard = self.pass_lock.lock().await;
        let started = Instant::now();

        match self.execute(trigger).await {
            Ok(report) => {
                info!(
                    %trigger,
                    orders = report.orders,
                    unresolved = report.unresolved,
                    deficient = report.deficient,
                    products = report.records.product_count(),
                    files = report.files.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Monitoring pass finished"
                );
                self.notifier
                    .notify(&NotificationEvent::PassCompleted {
                        window: report.window,
                        orders: report.orders,
                        deficient_orders: report.deficient,
                        products: report.records.product_count(),
                        files: report.files.clone(),
                        timestamp: Utc::now(),
                    })
                    .await;
                Ok(report)
            }
            Err(e) => {
                error!(%trigger, error = %e, "Monitoring pass failed");
                if trigger == PassTrigger::OnDemand {
                    self.notifier
                        .notify(&NotificationEvent::PassFailed {
                            error: e.to_string(),
                            timestamp: Utc::now(),
                        })
                        .await;
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, trigger: PassTrigger) -> Result<PassReport> {
        let settings = MonitorSettings::from_config(&self.config)?;
        let window = Self::current_window(&settings)?;
        info!(%trigger, window = %window.describe(), products = ?settings.monitored_good_ids, "Starting monitoring pass");

        let orders = self
            .orders
            .find_eligible(&settings.monitored_good_ids, &window)
            .await?;
        info!(orders = orders.len(), "Loaded eligible orders");

        let outcomes = self.verifier.verify(&orders, settings.io_workers).await;
        let unresolved = outcomes.iter().filter(|o| !o.is_resolved()).count();
        let records = aggregate(&orders, &outcomes);

        let summary = self.export.export(&records).await;
        let refunds = if settings.auto_refund {
            self.submit_refunds(&records).await
        } else {
            Vec::new()
        };

        Ok(PassReport {
            trigger,
            window,
            orders: orders.len(),
            unresolved,
            deficient: records.record_count(),
            records,
            files: summary.files,
            failed_exports: summary.failed,
            refunds,
        })
    }

    async fn submit_refunds(&self, records: &DeficiencyGroups) -> Vec<RefundOutcome> {
        let Some(service) = &self.refunds else {
            warn!("Automatic refund is enabled but no refund service is configured");
            return Vec::new();
        };

        let settings = RefundSettings::from_config(&self.config);
        let mut outcomes = Vec::new();
        for (product_name, links) in refund_batches(records, &settings) {
            let outcome =
                submit_with_retry(service.as_ref(), &product_name, &links, REFUND_ATTEMPTS).await;
            if !outcome.success {
                self.notifier
                    .notify(&NotificationEvent::RefundFailed {
                        product_name: outcome.product_name.clone(),
                        links: outcome.links,
                        error: outcome.message.clone(),
                        timestamp: Utc::now(),
                    })
                    .await;
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
