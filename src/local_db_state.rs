//! Durable key-value storage: the origin-scoped equivalent of browser local
//! storage. [`LmdbStore`] keeps data on disk, [`MemoryStore`] keeps it in the
//! process for tests and ephemeral hosts. Both enforce the same byte quota.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lmdb::{Cursor, Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::error::{PortalError, PortalResult};
use crate::local_db_model::StoredEntry;

pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> PortalResult<Option<StoredEntry>>;

    /// Writes `data` under `key`. With `expected_revision` set, the write only
    /// succeeds if the key is still at that revision.
    fn put(
        &self,
        key: &str,
        data: &JsonValue,
        expected_revision: Option<u64>,
    ) -> PortalResult<StoredEntry>;

    fn remove(&self, key: &str) -> PortalResult<bool>;

    fn keys(&self) -> PortalResult<Vec<String>>;

    fn clear_all_records(&self) -> PortalResult<usize>;

    /// Bytes counted against the quota.
    fn used_bytes(&self) -> PortalResult<usize>;
}

fn revision_of(key: &str, raw: Option<&[u8]>) -> u64 {
    match raw.map(|bytes| StoredEntry::from_bytes(key, bytes)) {
        Some(Ok(entry)) => entry.revision,
        Some(Err(e)) => {
            warn!("Overwriting unreadable value at '{key}': {e}");
            0
        }
        None => 0,
    }
}

fn check_quota(key: &str, used_elsewhere: usize, value_len: usize, limit: usize) -> PortalResult<()> {
    let needed = used_elsewhere + key.len() + value_len;
    if needed > limit {
        return Err(PortalError::QuotaExceeded {
            key: key.to_string(),
            needed,
            limit,
        });
    }
    Ok(())
}

pub struct LmdbStore {
    env: Environment,
    db: Database,
    path: PathBuf,
    quota: usize,
}

impl LmdbStore {
    pub fn open(dir: &Path, map_size: usize, quota: usize) -> PortalResult<Self> {
        std::fs::create_dir_all(dir)?;
        info!("Opening durable store at: {}", dir.display());

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(map_size)
            .open(dir)?;
        let db = env.create_db(Some("portal"), DatabaseFlags::empty())?;

        Ok(Self {
            env,
            db,
            path: dir.to_path_buf(),
            quota,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stores bytes without the revision envelope, the way a foreign writer
    /// sharing the same storage would.
    pub fn insert_raw(&self, key: &str, bytes: &[u8]) -> PortalResult<()> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &bytes, WriteFlags::empty())?;
        txn.commit()?;
        Ok(())
    }

    fn sum_bytes<T: Transaction>(&self, txn: &T, skip: Option<&str>) -> PortalResult<usize> {
        let mut cursor = txn.open_ro_cursor(self.db)?;
        let mut total = 0;
        // `iter_start()` panics on an empty database.
        for (k, v) in cursor.iter() {
            if skip.is_some_and(|s| s.as_bytes() == k) {
                continue;
            }
            total += k.len() + v.len();
        }
        Ok(total)
    }
}

impl DurableStore for LmdbStore {
    fn get(&self, key: &str) -> PortalResult<Option<StoredEntry>> {
        let txn = self.env.begin_ro_txn()?;
        let entry = match txn.get(self.db, &key) {
            Ok(bytes) => Some(StoredEntry::from_bytes(key, bytes)?),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.commit()?;
        Ok(entry)
    }

    fn put(
        &self,
        key: &str,
        data: &JsonValue,
        expected_revision: Option<u64>,
    ) -> PortalResult<StoredEntry> {
        let mut txn = self.env.begin_rw_txn()?;

        let current = match txn.get(self.db, &key) {
            Ok(bytes) => revision_of(key, Some(bytes)),
            Err(lmdb::Error::NotFound) => 0,
            Err(e) => return Err(e.into()),
        };
        let entry = StoredEntry::next(key, current, data, expected_revision)?;
        let bytes = entry.to_bytes()?;

        let used = self.sum_bytes(&txn, Some(key))?;
        check_quota(key, used, bytes.len(), self.quota)?;

        txn.put(self.db, &key, &bytes, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Stored '{}' at revision {} ({} bytes)", key, entry.revision, bytes.len());
        Ok(entry)
    }

    fn remove(&self, key: &str) -> PortalResult<bool> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &key, None) {
            Ok(()) => {
                txn.commit()?;
                Ok(true)
            }
            Err(lmdb::Error::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> PortalResult<Vec<String>> {
        let txn = self.env.begin_ro_txn()?;
        let mut keys = Vec::new();
        {
            let mut cursor = txn.open_ro_cursor(self.db)?;
            for (k, _) in cursor.iter() {
                keys.push(String::from_utf8_lossy(k).into_owned());
            }
        }
        txn.commit()?;
        Ok(keys)
    }

    fn clear_all_records(&self) -> PortalResult<usize> {
        let count = self.keys()?.len();
        let mut txn = self.env.begin_rw_txn()?;
        txn.clear_db(self.db)?;
        txn.commit()?;
        info!("Cleared {} durable records", count);
        Ok(count)
    }

    fn used_bytes(&self) -> PortalResult<usize> {
        let txn = self.env.begin_ro_txn()?;
        let total = self.sum_bytes(&txn, None)?;
        txn.commit()?;
        Ok(total)
    }
}

/// In-process durable store. Values are kept serialized so quota accounting
/// matches [`LmdbStore`].
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
    quota: usize,
}

impl MemoryStore {
    pub fn new(quota: usize) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            quota,
        }
    }

    pub fn insert_raw(&self, key: &str, bytes: &[u8]) {
        self.records.lock().insert(key.to_string(), bytes.to_vec());
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> PortalResult<Option<StoredEntry>> {
        let records = self.records.lock();
        records
            .get(key)
            .map(|bytes| StoredEntry::from_bytes(key, bytes))
            .transpose()
    }

    fn put(
        &self,
        key: &str,
        data: &JsonValue,
        expected_revision: Option<u64>,
    ) -> PortalResult<StoredEntry> {
        let mut records = self.records.lock();
        let current = revision_of(key, records.get(key).map(Vec::as_slice));
        let entry = StoredEntry::next(key, current, data, expected_revision)?;
        let bytes = entry.to_bytes()?;

        let used: usize = records
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(key, used, bytes.len(), self.quota)?;

        records.insert(key.to_string(), bytes);
        Ok(entry)
    }

    fn remove(&self, key: &str) -> PortalResult<bool> {
        Ok(self.records.lock().remove(key).is_some())
    }

    fn keys(&self) -> PortalResult<Vec<String>> {
        Ok(self.records.lock().keys().cloned().collect())
    }

    fn clear_all_records(&self) -> PortalResult<usize> {
        let mut records = self.records.lock();
        let count = records.len();
        records.clear();
        Ok(count)
    }

    fn used_bytes(&self) -> PortalResult<usize> {
        Ok(self
            .records
            .lock()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum())
    }
}
