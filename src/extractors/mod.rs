//! Request extractors that reject with `AppError` (structured 400) instead of axum's plain text.

mod fragment;
mod id;
mod json;
mod query;
pub use fragment::Fragment;
pub use id::{parse_id, EntityId};
pub use json::ValidJson;
pub use query::QueryPairs;
