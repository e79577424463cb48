//! Referral persistence.

use std::collections::HashMap;

use parking_lot::RwLock;
use qiba_protocol::{Referral, UserId};

use crate::StoreError;

const KIND: &str = "referral";

/// Stores one referral record per referrer.
pub trait ReferralStore: Send + Sync + 'static {
    /// Loads the record owned by `owner`.
    fn get(&self, owner: UserId) -> Result<Referral, StoreError>;

    /// Persists a new record.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if `owner` already has one.
    fn create(&self, referral: &Referral) -> Result<(), StoreError>;

    /// Overwrites an existing record.
    fn update(&self, referral: &Referral) -> Result<(), StoreError>;

    /// Applies `apply` to the stored record as one atomic read-modify-write
    /// and returns the record as written.
    fn modify(
        &self,
        owner: UserId,
        apply: &mut dyn FnMut(&mut Referral),
    ) -> Result<Referral, StoreError>;
}

/// An in-memory [`ReferralStore`].
#[derive(Debug, Default)]
pub struct MemoryReferralStore {
    records: RwLock<HashMap<UserId, Referral>>,
}

impl MemoryReferralStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferralStore for MemoryReferralStore {
    fn get(&self, owner: UserId) -> Result<Referral, StoreError> {
        self.records
            .read()
            .get(&owner)
            .cloned()
            .ok_or_else(|| StoreError::not_found(KIND, owner))
    }

    fn create(&self, referral: &Referral) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&referral.owner) {
            return Err(StoreError::already_exists(KIND, referral.owner));
        }
        records.insert(referral.owner, referral.clone());
        Ok(())
    }

    fn update(&self, referral: &Referral) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let slot = records
            .get_mut(&referral.owner)
            .ok_or_else(|| StoreError::not_found(KIND, referral.owner))?;
        *slot = referral.clone();
        Ok(())
    }

    fn modify(
        &self,
        owner: UserId,
        apply: &mut dyn FnMut(&mut Referral),
    ) -> Result<Referral, StoreError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&owner)
            .ok_or_else(|| StoreError::not_found(KIND, owner))?;
        apply(record);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use qiba_protocol::ReferralEdge;

    use super::*;

    #[test]
    fn test_create_then_get_returns_record() {
        let store = MemoryReferralStore::new();
        let record = Referral::new(UserId(1), Utc::now());

        store.create(&record).unwrap();

        assert_eq!(store.get(UserId(1)).unwrap(), record);
    }

    #[test]
    fn test_create_duplicate_returns_already_exists() {
        let store = MemoryReferralStore::new();
        store.create(&Referral::new(UserId(1), Utc::now())).unwrap();

        let result = store.create(&Referral::new(UserId(1), Utc::now()));

        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn test_modify_appends_edge() {
        let store = MemoryReferralStore::new();
        store.create(&Referral::new(UserId(1), Utc::now())).unwrap();

        let written = store
            .modify(UserId(1), &mut |r| {
                r.edges.push(ReferralEdge {
                    from: UserId(1),
                    to: UserId(2),
                    accepted: true,
                    accept_time: None,
                });
            })
            .unwrap();

        assert_eq!(written.edges.len(), 1);
        assert_eq!(store.get(UserId(1)).unwrap().edges.len(), 1);
    }

    #[test]
    fn test_get_unknown_returns_not_found() {
        let store = MemoryReferralStore::new();
        assert!(store.get(UserId(9)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_unknown_returns_not_found() {
        let store = MemoryReferralStore::new();
        let result = store.update(&Referral::new(UserId(9), Utc::now()));
        assert!(result.unwrap_err().is_not_found());
    }
}
