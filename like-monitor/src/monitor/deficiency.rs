//! Shortfall computation and grouping by product.

use rust_decimal::Decimal;
use serde::Serialize;

use super::verifier::FetchOutcome;
use crate::domain::Order;
use crate::utils::filename::UNKNOWN_NAME;

/// One order that delivered fewer likes than promised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeficiencyRecord {
    pub product_name: String,
    pub product_id: i64,
    pub link: String,
    pub order_sn: String,
    pub order_id: i64,
    pub third_party_sn: Option<String>,
    pub shortfall: i64,
    pub amount: Decimal,
    pub quantity: i64,
    pub start_count: i64,
    /// `None` when the count could not be fetched.
    pub current_count: Option<u64>,
}

/// Records of one product, in query order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductGroup {
    pub product_name: String,
    pub records: Vec<DeficiencyRecord>,
}

/// Deficient orders grouped by product name.
///
/// Groups appear in the order their product was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeficiencyGroups {
    groups: Vec<ProductGroup>,
}

impl DeficiencyGroups {
    fn push(&mut self, record: DeficiencyRecord) {
        match self
            .groups
            .iter_mut()
            .find(|group| group.product_name == record.product_name)
        {
            Some(group) => group.records.push(record),
            None => self.groups.push(ProductGroup {
                product_name: record.product_name.clone(),
                records: vec![record],
            }),
        }
    }

    pub fn get(&self, product_name: &str) -> Option<&[DeficiencyRecord]> {
        self.groups
            .iter()
            .find(|group| group.product_name == product_name)
            .map(|group| group.records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductGroup> {
        self.groups.iter()
    }

    /// Number of products with at least one record.
    pub fn product_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of records over all products.
    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|group| group.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Shortfall of one order, or `None` when delivery is complete.
///
/// An unresolved count is treated as nothing delivered.
pub fn shortfall(order: &Order, outcome: FetchOutcome) -> Option<i64> {
    let produced = match outcome {
        FetchOutcome::Resolved(count) => {
            i64::try_from(count).unwrap_or(i64::MAX).saturating_sub(order.start_count)
        }
        FetchOutcome::Unresolved => 0,
    };
    let deficiency = order.quantity.saturating_sub(produced);
    (deficiency > 0).then_some(deficiency)
}

fn group_name(product_name: &str) -> String {
    let name = product_name.trim();
    if name.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Pair `orders[i]` with `outcomes[i]` and group the deficient ones by product.
///
/// An order without a matching outcome counts as unresolved.
pub fn aggregate(orders: &[Order], outcomes: &[FetchOutcome]) -> DeficiencyGroups {
    if orders.len() != outcomes.len() {
        tracing::warn!(
            orders = orders.len(),
            outcomes = outcomes.len(),
            "Outcome count does not match order count"
        );
    }

    let mut groups = DeficiencyGroups::default();
    for (index, order) in orders.iter().enumerate() {
        let outcome = outcomes
            .get(index)
            .copied()
            .unwrap_or(FetchOutcome::Unresolved);
        let Some(shortfall) = shortfall(order, outcome) else {
            continue;
        };

        tracing::info!(
            order_id = order.id,
            link = %order.link,
            shortfall,
            resolved = outcome.is_resolved(),
            "Order is short of likes"
        );
        groups.push(DeficiencyRecord {
            product_name: group_name(&order.product_name),
            product_id: order.product_id,
            link: order.link.clone(),
            order_sn: order.order_sn.clone(),
            order_id: order.id,
            third_party_sn: order.third_party_sn.clone(),
            shortfall,
            amount: order.amount,
            quantity: order.quantity,
            start_count: order.start_count,
            current_count: outcome.count(),
        });
    }
    groups
}
