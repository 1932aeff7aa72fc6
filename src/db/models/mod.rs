//! Database models, one file per table.

pub mod gift;

pub use self::gift::*;
