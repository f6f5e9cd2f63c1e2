//! Notification events and their priority levels.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::MonitorWindow;

/// Priority level for notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A pass ran to completion.
    PassCompleted {
        window: MonitorWindow,
        orders: usize,
        deficient_orders: usize,
        products: usize,
        files: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// A pass stopped before it could produce records.
    PassFailed {
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// Refund submission for a product was given up.
    RefundFailed {
        product_name: String,
        links: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl NotificationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PassCompleted { .. } => "pass_completed",
            Self::PassFailed { .. } => "pass_failed",
            Self::RefundFailed { .. } => "refund_failed",
        }
    }

    pub fn priority(&self) -> NotificationPriority {
        match self {
            Self::PassCompleted {
                deficient_orders, ..
            } => {
                if *deficient_orders > 0 {
                    NotificationPriority::Normal
                } else {
                    NotificationPriority::Low
                }
            }
            Self::PassFailed { .. } | Self::RefundFailed { .. } => NotificationPriority::High,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::PassCompleted {
                deficient_orders, ..
            } => format!("Like check finished: {deficient_orders} deficient order(s)"),
            Self::PassFailed { .. } => "Like check failed".to_string(),
            Self::RefundFailed { product_name, .. } => {
                format!("Refund submission failed for {product_name}")
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::PassCompleted {
                window,
                orders,
                products,
                files,
                ..
            } => format!(
                "Checked {orders} order(s) in {}; {products} product(s) affected, {} file(s) written",
                window.describe(),
                files.len()
            ),
            Self::PassFailed { error, .. } => error.clone(),
            Self::RefundFailed { links, error, .. } => {
                format!("{links} link(s) not submitted: {error}")
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::PassCompleted { timestamp, .. }
            | Self::PassFailed { timestamp, .. }
            | Self::RefundFailed { timestamp, .. } => *timestamp,
        }
    }
}
