//! Infrastructure layer: storage backends, reference catalog, config and the
//! `StockLedger` service that ties them to the domain decisions.

pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod store;


pub use catalog::{InMemoryReferenceCatalog, PostgresReferenceCatalog, ReferenceCatalog};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult, StoreError};
pub use ledger::{BatchRequest, StockLedger};
pub use store::postgres::run_migrations;
pub use store::{Decision, InMemoryLedgerStore, LedgerStore, PostgresLedgerStore};
