pub mod order;

pub use order::{OrderRepository, SqlxOrderRepository};
