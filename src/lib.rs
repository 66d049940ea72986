//! strata: structural analysis of Python repositories, with results kept in an
//! HMAC-authenticated append-only ledger and compared snapshot to snapshot.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod report;
pub mod scan;
pub mod store;

pub use analysis::{Analysis, Engine};
pub use config::Config;
pub use error::{Result, StrataError};
pub use store::ledger::{Ledger, LedgerKey};
