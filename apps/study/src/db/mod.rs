//! SQLite progress store.

pub mod date_utils;
pub mod error;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use repository::{
    DueCard, ProgressRepository, ProgressTx, ReviewLogEntry, RosterRepository, SqliteRepository,
    StoredProgress, Visibility,
};
