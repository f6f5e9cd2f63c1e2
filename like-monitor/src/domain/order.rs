//! Order snapshot used by the monitoring pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order as stored by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unpaid,
    Paid,
    Processing,
    Abnormal,
    Completed,
    Refunding,
    ChargedBack,
    Refunded,
    Pending,
    Other(i32),
}

impl OrderStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::Unpaid,
            1 => Self::Paid,
            2 => Self::Processing,
            3 => Self::Abnormal,
            4 => Self::Completed,
            5 => Self::Refunding,
            6 => Self::ChargedBack,
            7 => Self::Refunded,
            8 => Self::Pending,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Unpaid => -1,
            Self::Paid => 1,
            Self::Processing => 2,
            Self::Abnormal => 3,
            Self::Completed => 4,
            Self::Refunding => 5,
            Self::ChargedBack => 6,
            Self::Refunded => 7,
            Self::Pending => 8,
            Self::Other(code) => *code,
        }
    }

    /// Only completed orders are monitored.
    pub fn is_monitored(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Immutable snapshot of one order for the duration of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_sn: String,
    pub third_party_sn: Option<String>,
    pub product_id: i64,
    pub product_name: String,
    /// Share link extracted from the order parameters; empty when none was found.
    pub link: String,
    /// Promised quantity.
    pub quantity: i64,
    /// Like count when the order started.
    pub start_count: i64,
    /// Count last recorded by the shop, for display only.
    pub recorded_count: i64,
    pub amount: Decimal,
    pub status: OrderStatus,
    /// Epoch seconds.
    pub created_at: i64,
    /// Last sync time in epoch seconds; the monitoring window is matched against it.
    pub synced_at: i64,
}
