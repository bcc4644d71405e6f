//! Query methods on [`Database`](crate::db::Database), grouped by table.

pub mod sessions;
pub mod tasks;
