//! Tamper-evident history of analysis results.
//!
//! - `wal`: the append-only line log underneath everything
//! - `ledger`: HMAC-authenticated records on top of the log
//! - `snapshot`: the reserved `snapshots` table
//! - `diff`: comparing two recorded snapshots

pub mod diff;
pub mod ledger;
pub mod snapshot;
pub mod wal;
