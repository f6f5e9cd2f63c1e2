pub mod order;

pub use order::{OrderDbModel, extract_link};
