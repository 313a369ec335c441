//! Explanation history - local log of past explanations

mod schema;
mod store;

pub use store::{HistoryEntry, HistoryStore};
