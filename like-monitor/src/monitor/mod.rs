//! The monitoring pipeline: verify current counts, compute shortfalls, and
//! hand the result to export and refund.

pub mod deficiency;
pub mod proxies;
pub mod service;
pub mod verifier;

pub use deficiency::{DeficiencyGroups, DeficiencyRecord, ProductGroup, aggregate, shortfall};
pub use proxies::ConfiguredProvisioner;
pub use service::{EligibleOrders, MonitorService, PassReport, PassTrigger};
pub use verifier::{BatchVerifier, CANDIDATES_PER_ORDER, FetchOutcome, MAX_ATTEMPTS, candidate_window};
