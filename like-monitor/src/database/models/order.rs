//! Row model of the shop's `order` table.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::domain::{Order, OrderStatus};

/// First URL in the order parameters.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(https?://[^\s"]+)"#).unwrap());

/// Columns the monitor reads. Integer columns are cast to `SIGNED` in SQL so
/// they decode as `i64` whatever their declared width.
#[derive(Debug, Clone, FromRow)]
pub struct OrderDbModel {
    pub id: i64,
    pub order_s_n: String,
    pub other_order_s_n: Option<String>,
    pub goods_id: i64,
    pub goods_name: Option<String>,
    pub params: Option<String>,
    pub order_num: i64,
    pub start_num: i64,
    pub current_num: i64,
    pub order_amount: Decimal,
    pub order_status: i64,
    pub create_at: i64,
    pub tb_time: i64,
}

/// Share link embedded in an order's parameter blob, or empty.
///
/// JSON-escaped slashes (`https:\/\/...`) are unescaped before matching.
pub fn extract_link(params: &str) -> String {
    let unescaped = params.replace("\\/", "/");
    LINK_RE
        .captures(&unescaped)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

impl From<OrderDbModel> for Order {
    fn from(row: OrderDbModel) -> Self {
        let link = row.params.as_deref().map(extract_link).unwrap_or_default();
        Self {
            id: row.id,
            order_sn: row.order_s_n,
            third_party_sn: row.other_order_s_n.filter(|sn| !sn.is_empty()),
            product_id: row.goods_id,
            product_name: row.goods_name.unwrap_or_default(),
            link,
            quantity: row.order_num,
            start_count: row.start_num,
            recorded_count: row.current_num,
            amount: row.order_amount,
            status: OrderStatus::from_code(i32::try_from(row.order_status).unwrap_or(i32::MIN)),
            created_at: row.create_at,
            synced_at: row.tb_time,
        }
    }
}
