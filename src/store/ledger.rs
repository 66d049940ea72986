//! Authenticated append-only ledger.
//!
//! Line format: `<hmac-sha256 hex>|<canonical json>`, where the canonical JSON
//! is `{"payload":..,"table":..,"timestamp":..,"version":..}` with object keys
//! sorted at every level. The tag covers exactly the bytes after the `|`.
//!
//! Lines whose tag does not verify are never surfaced by reads; `verify`
//! reports how many there are.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use super::wal::{Durability, Wal};
use crate::config::LedgerConfig;
use crate::error::{Result, StrataError};

pub const SCHEMA_VERSION: &str = "2.1.0";

type HmacSha256 = Hmac<Sha256>;

/// Secret for the authentication tags. Never empty.
#[derive(Clone)]
pub struct LedgerKey {
    mac: HmacSha256,
}

impl LedgerKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return None;
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(&bytes).ok()?;
        Some(LedgerKey { mac })
    }

    /// Read the key from `var`. Absent or empty is an error; there is no default.
    pub fn from_env(var: &str) -> Result<Self> {
        std::env::var_os(var)
            .and_then(|value| LedgerKey::new(value.to_string_lossy().into_owned()))
            .ok_or_else(|| StrataError::MissingKey { var: var.to_string() })
    }

    fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }

    pub fn sign(&self, content: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(content);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Tags are accepted only in the exact lower-case form `sign` produces.
    pub fn verify(&self, content: &[u8], tag_hex: &str) -> bool {
        if !tag_hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return false;
        }
        let Ok(expected) = hex::decode(tag_hex) else { return false };
        let mut mac = self.mac();
        mac.update(content);
        let actual = mac.finalize().into_bytes();
        expected.len() == actual.len() && bool::from(expected.ct_eq(actual.as_slice()))
    }
}

impl fmt::Debug for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LedgerKey(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub version: String,
    pub timestamp: String,
    pub table: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

#[derive(Debug)]
pub struct Ledger {
    wal: Wal,
    key: LedgerKey,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>, key: LedgerKey) -> Self {
        Ledger::with_durability(path, key, Durability::Buffered)
    }

    pub fn with_durability(path: impl Into<PathBuf>, key: LedgerKey, durability: Durability) -> Self {
        Ledger {
            wal: Wal::new(path, durability),
            key,
        }
    }

    /// Ledger described by the `[ledger]` config section; the key comes from its env var.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let key = LedgerKey::from_env(&config.key_env)?;
        Ok(Ledger::with_durability(config.resolve_path()?, key, config.durability))
    }

    pub fn path(&self) -> &Path {
        self.wal.path()
    }

    /// Append one authenticated record. Returns the byte offset of its line.
    pub fn commit<T: Serialize + ?Sized>(&self, table: &str, payload: &T, timestamp: &str) -> Result<u64> {
        let entry = json!({
            "version": SCHEMA_VERSION,
            "timestamp": timestamp,
            "table": table,
            "payload": serde_json::to_value(payload)?,
        });

        let canonical = canonical_json(entry)?;
        let tag = self.key.sign(canonical.as_bytes());
        let offset = self.wal.append(format!("{tag}|{canonical}").as_bytes())?;

        info!("committed {table} record at offset {offset} of {}", self.path().display());
        Ok(offset)
    }

    /// Payloads of valid records in `table`, in write order.
    pub fn fetch(&self, table: &str) -> Result<Vec<Value>> {
        Ok(self.fetch_records(table)?.into_iter().map(|r| r.payload).collect())
    }

    pub fn fetch_records(&self, table: &str) -> Result<Vec<LedgerRecord>> {
        let (records, _) = self.read()?;
        Ok(records.into_iter().filter(|r| r.table == table).collect())
    }

    pub fn records(&self) -> Result<Vec<LedgerRecord>> {
        Ok(self.read()?.0)
    }

    pub fn verify(&self) -> Result<IntegrityReport> {
        Ok(self.read()?.1)
    }

    /// Write every valid record as CSV (`version,timestamp,table,payload`).
    /// Returns the number of rows written.
    pub fn export_tabular(&self, output: &Path) -> Result<usize> {
        let records = self.records()?;

        let mut out = String::from("version,timestamp,table,payload\r\n");
        for record in &records {
            let payload = canonical_json(record.payload.clone())?;
            let row = [
                record.version.as_str(),
                record.timestamp.as_str(),
                record.table.as_str(),
                payload.as_str(),
            ];
            out.push_str(&row.iter().map(|field| csv_field(field)).collect::<Vec<_>>().join(","));
            out.push_str("\r\n");
        }

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output, out)?;

        Ok(records.len())
    }

    /// Delete the whole ledger. Idempotent.
    pub fn purge(&self) -> Result<()> {
        if self.wal.remove()? {
            info!("purged ledger {}", self.path().display());
        }
        Ok(())
    }

    fn read(&self) -> Result<(Vec<LedgerRecord>, IntegrityReport)> {
        let mut records = Vec::new();
        let mut report = IntegrityReport::default();

        for entry in self.wal.read_all()? {
            let entry = entry?;
            if entry.bytes.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            report.total += 1;
            match self.authenticate(&entry.bytes) {
                Some(record) => {
                    report.valid += 1;
                    records.push(record);
                }
                None => {
                    report.invalid += 1;
                    warn!("ledger line at offset {} failed verification", entry.offset);
                }
            }
        }

        Ok((records, report))
    }

    fn authenticate(&self, line: &[u8]) -> Option<LedgerRecord> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let line = std::str::from_utf8(line).ok()?;
        let (tag, content) = line.split_once('|')?;

        if !self.key.verify(content.as_bytes(), tag) {
            return None;
        }

        serde_json::from_str(content).ok()
    }
}

/// Compact JSON with object keys sorted at every level.
pub fn canonical_json(value: Value) -> Result<String> {
    Ok(serde_json::to_string(&sorted(value))?)
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
