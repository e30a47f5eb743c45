use crate::domain::{BillEntry, BillingPeriod, CustomerHistory, CustomerRecord, MatchedBill};
use crate::ports::{BillRepository, Result};
use crate::utils::parse_timestamp;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Application service owning the load / merge / save / scan logic over
/// customer bill histories.
///
/// Saves are append-only: every saved entry is added to the history, even
/// when the same month already has one.
pub struct RecordStore {
    repository: Box<dyn BillRepository>,
}

impl RecordStore {
    /// Creates a new RecordStore over the given backend
    pub fn new(repository: Box<dyn BillRepository>) -> Self {
        Self { repository }
    }

    /// Fetches the record stored for `key`; `None` when nothing was saved yet.
    pub fn load_record(&self, key: &str) -> Result<Option<CustomerRecord>> {
        debug!(key, "loading record");
        Ok(self.repository.load(key)?.map(|stored| stored.record))
    }

    /// Merges `entry` into the history for `key` and persists it.
    ///
    /// Name and address are always overwritten with the given values. The
    /// write is conditional on the revision seen at load time, so a backend
    /// that detects a concurrent change fails with a conflict instead of
    /// clobbering it. Failures are returned as-is, never retried.
    pub fn save_record(
        &self,
        key: &str,
        customer_name: &str,
        bill_to: &str,
        entry: BillEntry,
    ) -> Result<CustomerRecord> {
        let (record, revision) = match self.repository.load(key)? {
            Some(mut stored) => {
                stored.record.customer_name = customer_name.to_string();
                stored.record.bill_to = bill_to.to_string();
                stored.record.bills.push(entry);
                (stored.record, stored.revision)
            }
            None => (
                CustomerRecord::new(customer_name.to_string(), bill_to.to_string(), entry),
                None,
            ),
        };

        self.repository.save(key, &record, revision.as_ref())?;
        info!(key, bills = record.bills.len(), "saved bill entry");
        Ok(record)
    }

    /// Scans every stored record for bills in `period` and flattens them into
    /// rows. A record that cannot be loaded is skipped with a warning; only a
    /// failure to enumerate keys fails the scan.
    pub fn list_by_month(&self, period: BillingPeriod) -> Result<Vec<MatchedBill>> {
        let keys: BTreeSet<String> = self.repository.list_keys()?.into_iter().collect();
        debug!(%period, records = keys.len(), "scanning records");

        let mut matches = Vec::new();
        for key in keys {
            let record = match self.repository.load(&key) {
                Ok(Some(stored)) => stored.record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unreadable record");
                    continue;
                }
            };

            matches.extend(record.bills_in(period).map(|bill| MatchedBill {
                key: key.clone(),
                customer_name: record.customer_name.clone(),
                bill_to: record.bill_to.clone(),
                amount: bill.amount,
                units: bill.units,
                timestamp: bill.timestamp.clone(),
            }));
        }

        Ok(matches)
    }

    /// Loads the record for `key` with its bills ordered newest first.
    /// Bills with unparseable timestamps sort after all others.
    pub fn history(&self, key: &str) -> Result<Option<CustomerHistory>> {
        let Some(record) = self.load_record(key)? else {
            return Ok(None);
        };

        let mut bills = record.bills;
        bills.sort_by(newest_first);

        Ok(Some(CustomerHistory {
            key: key.to_string(),
            customer_name: record.customer_name,
            bill_to: record.bill_to,
            bills,
        }))
    }
}

fn newest_first(a: &BillEntry, b: &BillEntry) -> Ordering {
    match (parse_timestamp(&a.timestamp), parse_timestamp(&b.timestamp)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.timestamp.cmp(&a.timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::memory::InMemoryRepository;
    use crate::ports::BillRepository;

    fn store() -> (RecordStore, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        (RecordStore::new(Box::new(repo.clone())), repo)
    }

    fn period(month: u32, year: i32) -> BillingPeriod {
        BillingPeriod::new(month, year).unwrap()
    }

    #[test]
    fn test_load_unsaved_key_is_absent() {
        let (store, _) = store();
        assert_eq!(store.load_record("1234567890").unwrap(), None);
    }

    #[test]
    fn test_first_save_creates_record() {
        let (store, _) = store();
        let entry = BillEntry::new(500.0, "2024-03-15T10:00:00");
        store
            .save_record("9999999999", "Asha", "12 Lake Road", entry.clone())
            .unwrap();

        let record = store.load_record("9999999999").unwrap().unwrap();
        assert_eq!(record.customer_name, "Asha");
        assert_eq!(record.bill_to, "12 Lake Road");
        assert_eq!(record.bills, vec![entry]);
    }

    #[test]
    fn test_latest_name_and_address_win() {
        let (store, _) = store();
        store
            .save_record("k", "Old Name", "Old Address", BillEntry::new(1.0, "2024-01-01"))
            .unwrap();
        store
            .save_record("k", "New Name", "New Address", BillEntry::new(2.0, "2024-02-01"))
            .unwrap();

        let record = store.load_record("k").unwrap().unwrap();
        assert_eq!(record.customer_name, "New Name");
        assert_eq!(record.bill_to, "New Address");
        assert_eq!(record.bills.len(), 2);
    }

    #[test]
    fn test_save_appends_even_with_colliding_timestamps() {
        let (store, _) = store();
        let entry = BillEntry::new(300.0, "2024-03-15T10:00:00");
        store.save_record("k", "A", "B", entry.clone()).unwrap();
        let record = store
            .save_record("k", "A", "B", entry.clone().with_units(4.0))
            .unwrap();

        assert_eq!(record.bills.len(), 2);
        assert_eq!(record.bills[0], entry);
        assert_eq!(record.bills[1].units, Some(4.0));
    }

    #[test]
    fn test_save_returns_what_was_persisted() {
        let (store, repo) = store();
        let returned = store
            .save_record("k", "A", "B", BillEntry::new(1.0, "2024-01-01"))
            .unwrap();
        assert_eq!(repo.load("k").unwrap().unwrap().record, returned);
    }

    #[test]
    fn test_concurrent_change_surfaces_as_conflict() {
        // A backend that changes the record between our load and our write.
        struct Racing(InMemoryRepository);

        impl BillRepository for Racing {
            fn load(&self, key: &str) -> Result<Option<crate::domain::StoredRecord>> {
                let loaded = self.0.load(key)?;
                if let Some(stored) = &loaded {
                    let mut other = stored.record.clone();
                    other.customer_name = "Someone Else".to_string();
                    self.0.save(key, &other, stored.revision.as_ref())?;
                }
                Ok(loaded)
            }

            fn save(
                &self,
                key: &str,
                record: &CustomerRecord,
                expected_revision: Option<&crate::domain::Revision>,
            ) -> Result<()> {
                self.0.save(key, record, expected_revision)
            }

            fn list_keys(&self) -> Result<Vec<String>> {
                self.0.list_keys()
            }
        }

        let inner = InMemoryRepository::new();
        let seed = CustomerRecord::new("A".into(), "B".into(), BillEntry::new(1.0, "2024-01-01"));
        inner.save("k", &seed, None).unwrap();

        let store = RecordStore::new(Box::new(Racing(inner.clone())));
        let err = store
            .save_record("k", "A", "B", BillEntry::new(2.0, "2024-02-01"))
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict { .. }));
        let current = inner.load("k").unwrap().unwrap().record;
        assert_eq!(current.customer_name, "Someone Else");
        assert_eq!(current.bills.len(), 1);
    }

    #[test]
    fn test_list_by_month_matches_example() {
        let (store, _) = store();
        store
            .save_record(
                "9999999999",
                "Asha",
                "12 Lake Road",
                BillEntry::new(500.0, "2024-03-15T10:00:00"),
            )
            .unwrap();

        let march = store.list_by_month(period(3, 2024)).unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].key, "9999999999");
        assert_eq!(march[0].amount, 500.0);
        assert_eq!(march[0].customer_name, "Asha");
        assert_eq!(march[0].bill_to, "12 Lake Road");

        assert!(store.list_by_month(period(4, 2024)).unwrap().is_empty());
        assert!(store.list_by_month(period(3, 2023)).unwrap().is_empty());
    }

    #[test]
    fn test_list_by_month_is_complete_across_keys() {
        let (store, _) = store();
        store.save_record("a", "A", "x", BillEntry::new(1.0, "2024-03-01T00:00:00")).unwrap();
        store.save_record("a", "A", "x", BillEntry::new(2.0, "2024-03-31T23:59:59")).unwrap();
        store.save_record("a", "A", "x", BillEntry::new(3.0, "2024-04-01T00:00:00")).unwrap();
        store.save_record("b", "B", "y", BillEntry::new(4.0, "2024-03-10")).unwrap();
        store.save_record("c", "C", "z", BillEntry::new(5.0, "2024-02-29T12:00:00")).unwrap();

        let mut amounts: Vec<(String, f64)> = store
            .list_by_month(period(3, 2024))
            .unwrap()
            .into_iter()
            .map(|m| (m.key, m.amount))
            .collect();
        amounts.sort_by(|x, y| x.partial_cmp(y).unwrap());

        assert_eq!(
            amounts,
            vec![("a".to_string(), 1.0), ("a".to_string(), 2.0), ("b".to_string(), 4.0)]
        );
    }

    #[test]
    fn test_list_by_month_skips_malformed_records() {
        let (store, repo) = store();
        repo.insert_corrupt("broken", "unexpected end of file").unwrap();
        store.save_record("ok", "A", "x", BillEntry::new(9.0, "2024-03-05T00:00:00")).unwrap();
        store.save_record("ok", "A", "x", BillEntry::new(8.0, "not a date")).unwrap();

        let rows = store.list_by_month(period(3, 2024)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "ok");
    }

    #[test]
    fn test_list_by_month_on_empty_store() {
        let (store, _) = store();
        assert!(store.list_by_month(period(1, 2020)).unwrap().is_empty());
    }

    #[test]
    fn test_history_is_newest_first() {
        let (store, _) = store();
        store.save_record("k", "A", "B", BillEntry::new(1.0, "2024-01-10T00:00:00")).unwrap();
        store.save_record("k", "A", "B", BillEntry::new(2.0, "unknown")).unwrap();
        store.save_record("k", "A", "B", BillEntry::new(3.0, "2024-03-10T00:00:00")).unwrap();
        store.save_record("k", "A", "B", BillEntry::new(4.0, "2024-02-10")).unwrap();

        let history = store.history("k").unwrap().unwrap();
        let amounts: Vec<f64> = history.bills.iter().map(|b| b.amount).collect();
        assert_eq!(amounts, vec![3.0, 4.0, 1.0, 2.0]);
        assert_eq!(history.key, "k");
    }

    #[test]
    fn test_history_for_unknown_key() {
        let (store, _) = store();
        assert!(store.history("nobody").unwrap().is_none());
    }
}
