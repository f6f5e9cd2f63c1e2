//! Order repository.

use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::Result;
use crate::database::models::OrderDbModel;
use crate::domain::{MonitorWindow, Order, OrderStatus};

const SELECT_ORDERS: &str = "SELECT \
    CAST(id AS SIGNED) AS id, \
    order_s_n, \
    other_order_s_n, \
    CAST(goods_id AS SIGNED) AS goods_id, \
    goods_name, \
    params, \
    CAST(COALESCE(order_num, 0) AS SIGNED) AS order_num, \
    CAST(COALESCE(start_num, 0) AS SIGNED) AS start_num, \
    CAST(COALESCE(current_num, 0) AS SIGNED) AS current_num, \
    order_amount, \
    CAST(order_status AS SIGNED) AS order_status, \
    CAST(COALESCE(create_at, 0) AS SIGNED) AS create_at, \
    CAST(tb_time AS SIGNED) AS tb_time \
    FROM `order`";

/// Read access to the shop's orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Completed orders of `product_ids` whose last sync falls in `window`,
    /// most recently synced first.
    async fn find_eligible(&self, product_ids: &[i64], window: &MonitorWindow)
    -> Result<Vec<Order>>;
}

/// SQLx implementation of OrderRepository.
pub struct SqlxOrderRepository {
    pool: MySqlPool,
}

impl SqlxOrderRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn eligible_query<'a>(product_ids: &[i64], window: &MonitorWindow) -> QueryBuilder<'a, MySql> {
    let mut qb = QueryBuilder::<MySql>::new(SELECT_ORDERS);

    qb.push(" WHERE goods_id IN (");
    let mut ids = qb.separated(", ");
    for id in product_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");

    qb.push(" AND order_status = ")
        .push_bind(OrderStatus::Completed.code())
        .push(" AND tb_time IS NOT NULL AND tb_time >= ")
        .push_bind(window.start)
        .push(" AND tb_time < ")
        .push_bind(window.end)
        .push(" ORDER BY tb_time DESC");
    qb
}

/// Drop rows the database returned outside the window or in another status.
///
/// The query already filters on both; this guards against `tb_time` columns
/// stored with a different precision.
fn retain_eligible(orders: Vec<Order>, window: &MonitorWindow) -> Vec<Order> {
    let total = orders.len();
    let kept: Vec<Order> = orders
        .into_iter()
        .filter(|order| order.status.is_monitored() && window.contains(order.synced_at))
        .collect();
    if kept.len() < total {
        tracing::warn!(
            dropped = total - kept.len(),
            window = %window.describe(),
            "Ignoring orders outside the monitoring window"
        );
    }
    kept
}

#[async_trait]
impl OrderRepository for SqlxOrderRepository {
    async fn find_eligible(
        &self,
        product_ids: &[i64],
        window: &MonitorWindow,
    ) -> Result<Vec<Order>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = eligible_query(product_ids, window);
        let rows = qb
            .build_query_as::<OrderDbModel>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            products = product_ids.len(),
            rows = rows.len(),
            window = %window.describe(),
            "Loaded eligible orders"
        );
        Ok(retain_eligible(rows.into_iter().map(Order::from).collect(), window))
    }
}
