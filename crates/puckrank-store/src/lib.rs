// Persistence for collected and ranked data: CSV files and a SQLite database.

pub mod csv_store;
pub mod db;

pub use csv_store::StoreError;
pub use db::{Database, RankingRun};
