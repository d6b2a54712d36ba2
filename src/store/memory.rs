//! In-memory rule table with optional JSON snapshot persistence.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::rules::{Rule, RulePatch, Timestamp};
use crate::store::{RuleStore, StoreError, StoreResult};

struct Row {
    /// Insertion sequence, gives `list` its creation order.
    seq: u64,
    rule: Rule,
}

#[derive(Default)]
struct RuleTable {
    rows: HashMap<String, Row>,
    next_seq: u64,
}

impl RuleTable {
    fn push(&mut self, rule: Rule) -> StoreResult<()> {
        if self.rows.contains_key(&rule.id) {
            return Err(StoreError::Duplicate(rule.id));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.rows.insert(rule.id.clone(), Row { seq, rule });
        Ok(())
    }

    fn ordered<'a>(&'a self, filter: impl Fn(&Rule) -> bool) -> Vec<Rule> {
        let mut rows: Vec<&'a Row> = self.rows.values().filter(|r| filter(&r.rule)).collect();
        rows.sort_by_key(|r| r.seq);
        rows.into_iter().map(|r| r.rule.clone()).collect()
    }
}

/// Rule store backed by a `RwLock`ed hash table.
///
/// Every write holds the write lock for the whole operation, including the
/// snapshot write when persistence is enabled; a failed snapshot write rolls
/// the in-memory change back.
#[derive(Default)]
pub struct MemoryRuleStore {
    table: RwLock<RuleTable>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryRuleStore {
    /// Create an empty, purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading the snapshot if it exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut table = RuleTable::default();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let rules: Vec<Rule> = serde_json::from_reader(reader)?;
            for rule in rules {
                table.push(rule)?;
            }
            tracing::info!(path = %path.display(), rules = table.rows.len(), "Loaded rule snapshot");
        } else {
            tracing::info!(path = %path.display(), "No rule snapshot found, starting empty");
        }

        Ok(Self {
            table: RwLock::new(table),
            snapshot_path: Some(path),
        })
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, RuleTable>> {
        self.table.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, RuleTable>> {
        self.table.write().map_err(|_| StoreError::Poisoned)
    }

    /// Write the table to the snapshot file via a temp file and rename.
    fn persist(&self, table: &RuleTable) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &table.ordered(|_| true))?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl RuleStore for MemoryRuleStore {
    fn insert(&self, rule: Rule) -> StoreResult<()> {
        let mut table = self.write()?;
        let id = rule.id.clone();
        table.push(rule)?;

        if let Err(e) = self.persist(&table) {
            table.rows.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Rule>> {
        Ok(self.read()?.rows.get(id).map(|r| r.rule.clone()))
    }

    fn list(&self) -> StoreResult<Vec<Rule>> {
        Ok(self.read()?.ordered(|_| true))
    }

    fn list_domain(&self, domain: &str) -> StoreResult<Vec<Rule>> {
        Ok(self.read()?.ordered(|r| r.domain == domain))
    }

    fn update(&self, id: &str, patch: &RulePatch, updated_at: Timestamp) -> StoreResult<Option<Rule>> {
        let mut table = self.write()?;
        let Some(row) = table.rows.get_mut(id) else {
            return Ok(None);
        };

        let previous = row.rule.clone();
        if let Some(target) = &patch.target {
            row.rule.target = target.clone();
        }
        if let Some(expires_at) = patch.expires_at {
            row.rule.expires_at = expires_at;
        }
        row.rule.updated_at = updated_at;
        let updated = row.rule.clone();

        if let Err(e) = self.persist(&table) {
            if let Some(row) = table.rows.get_mut(id) {
                row.rule = previous;
            }
            return Err(e);
        }
        Ok(Some(updated))
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut table = self.write()?;
        let Some(row) = table.rows.remove(id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&table) {
            table.rows.insert(id.to_string(), row);
            return Err(e);
        }
        Ok(true)
    }

    fn delete_expired(&self, now: Timestamp) -> StoreResult<usize> {
        let mut table = self.write()?;
        let expired: Vec<String> = table
            .rows
            .values()
            .filter(|r| !r.rule.is_active(now))
            .map(|r| r.rule.id.clone())
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }

        let removed: Vec<(String, Row)> = expired
            .into_iter()
            .filter_map(|id| table.rows.remove(&id).map(|row| (id, row)))
            .collect();

        if let Err(e) = self.persist(&table) {
            table.rows.extend(removed);
            return Err(e);
        }
        Ok(removed.len())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{QueryPolicy, Selector};

    fn rule(id: &str, domain: &str, expires_at: Timestamp) -> Rule {
        Rule {
            id: id.to_string(),
            domain: domain.to_string(),
            subdomain: Selector::Any,
            path: Selector::Any,
            query_policy: QueryPolicy::AllowAll,
            target: "http://127.0.0.1:3000".to_string(),
            expires_at,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let store = MemoryRuleStore::new();
        store.insert(rule("a", "example.com", 10)).unwrap();
        let err = store.insert(rule("a", "example.com", 20)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "a"));
        assert_eq!(store.get("a").unwrap().unwrap().expires_at, 10);
    }

    #[test]
    fn test_list_keeps_creation_order() {
        let store = MemoryRuleStore::new();
        for id in ["c", "a", "b"] {
            store.insert(rule(id, "example.com", 10)).unwrap();
        }
        store.insert(rule("z", "other.com", 10)).unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["c", "a", "b", "z"]);

        let ids: Vec<_> = store.list_domain("example.com").unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_update_only_touches_patched_fields() {
        let store = MemoryRuleStore::new();
        store.insert(rule("a", "example.com", 10)).unwrap();

        let patch = RulePatch {
            target: Some("http://10.0.0.2".into()),
            expires_at: None,
        };
        let updated = store.update("a", &patch, 7).unwrap().unwrap();
        assert_eq!(updated.target, "http://10.0.0.2");
        assert_eq!(updated.expires_at, 10);
        assert_eq!(updated.updated_at, 7);
        assert_eq!(updated.created_at, 1);

        assert!(store.update("missing", &patch, 7).unwrap().is_none());
    }

    #[test]
    fn test_delete_expired_boundary() {
        let store = MemoryRuleStore::new();
        store.insert(rule("past", "example.com", 50)).unwrap();
        store.insert(rule("now", "example.com", 100)).unwrap();
        store.insert(rule("future", "example.com", 101)).unwrap();

        assert_eq!(store.delete_expired(100).unwrap(), 2);
        assert_eq!(store.delete_expired(100).unwrap(), 0);

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["future"]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");

        {
            let store = MemoryRuleStore::open(&path).unwrap();
            store.insert(rule("first", "example.com", 10)).unwrap();
            store.insert(rule("second", "example.com", 20)).unwrap();
            store.insert(rule("third", "example.com", 30)).unwrap();
            assert!(store.delete("second").unwrap());
        }

        let reopened = MemoryRuleStore::open(&path).unwrap();
        let ids: Vec<_> = reopened.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["first", "third"]);
        assert_eq!(reopened.get("third").unwrap().unwrap(), rule("third", "example.com", 30));
    }

    #[test]
    fn test_failed_snapshot_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the snapshot file should be makes the rename fail.
        let path = dir.path().join("rules.json");
        let store = MemoryRuleStore::open(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.insert(rule("a", "example.com", 10)).is_err());
        assert!(store.is_empty().unwrap());
    }
}
