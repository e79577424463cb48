//! Player persistence.

use std::collections::HashMap;

use parking_lot::RwLock;
use qiba_protocol::{User, UserId};

use crate::StoreError;

const KIND: &str = "user";

/// Stores player records.
pub trait UserStore: Send + Sync + 'static {
    /// Loads a user by id.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the user was never created.
    fn get(&self, id: UserId) -> Result<User, StoreError>;

    /// Persists a new user.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if the id is taken.
    fn create(&self, user: &User) -> Result<(), StoreError>;

    /// Overwrites an existing user.
    fn update(&self, user: &User) -> Result<(), StoreError>;

    /// Applies `apply` to the stored user as one atomic read-modify-write
    /// and returns the record as it was written back.
    ///
    /// Nothing else can touch the same user between the read and the write,
    /// which is what keeps bonus-credit increments and decrements exact under
    /// concurrent calls.
    fn modify(
        &self,
        id: UserId,
        apply: &mut dyn FnMut(&mut User),
    ) -> Result<User, StoreError>;

    /// Returns the stored user, creating it from `user` first if absent.
    ///
    /// A concurrent create of the same id is not an error: whichever record
    /// won is returned.
    fn ensure(&self, user: &User) -> Result<User, StoreError> {
        match self.get(user.id()) {
            Ok(existing) => Ok(existing),
            Err(e) if e.is_not_found() => match self.create(user) {
                Ok(()) => Ok(user.clone()),
                Err(StoreError::AlreadyExists { .. }) => self.get(user.id()),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

/// An in-memory [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn get(&self, id: UserId) -> Result<User, StoreError> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(KIND, id))
    }

    fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.id()) {
            return Err(StoreError::already_exists(KIND, user.id()));
        }
        users.insert(user.id(), user.clone());
        tracing::debug!(user_id = %user.id(), "user created");
        Ok(())
    }

    fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        let slot = users
            .get_mut(&user.id())
            .ok_or_else(|| StoreError::not_found(KIND, user.id()))?;
        *slot = user.clone();
        Ok(())
    }

    fn modify(
        &self,
        id: UserId,
        apply: &mut dyn FnMut(&mut User),
    ) -> Result<User, StoreError> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(KIND, id))?;
        apply(user);
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use qiba_protocol::Profile;

    use super::*;

    fn user(id: i64) -> User {
        User::new(Profile::anonymous(UserId(id)))
    }

    #[test]
    fn test_create_then_get_returns_user() {
        let store = MemoryUserStore::new();
        store.create(&user(1)).unwrap();
        assert_eq!(store.get(UserId(1)).unwrap(), user(1));
    }

    #[test]
    fn test_create_duplicate_returns_already_exists() {
        let store = MemoryUserStore::new();
        store.create(&user(1)).unwrap();
        assert!(matches!(
            store.create(&user(1)),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_update_unknown_returns_not_found() {
        let store = MemoryUserStore::new();
        assert!(store.update(&user(5)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_modify_unknown_returns_not_found() {
        let store = MemoryUserStore::new();
        let result = store.modify(UserId(5), &mut |u| u.bonus_credits += 1);
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_modify_returns_written_record() {
        let store = MemoryUserStore::new();
        store.create(&user(1)).unwrap();

        let written = store
            .modify(UserId(1), &mut |u| u.bonus_credits += 3)
            .unwrap();

        assert_eq!(written.bonus_credits, 3);
        assert_eq!(store.get(UserId(1)).unwrap().bonus_credits, 3);
    }

    #[test]
    fn test_ensure_creates_missing_user() {
        let store = MemoryUserStore::new();
        let created = store.ensure(&user(2)).unwrap();
        assert_eq!(created, user(2));
        assert!(store.get(UserId(2)).is_ok());
    }

    #[test]
    fn test_ensure_keeps_existing_record() {
        let store = MemoryUserStore::new();
        let mut existing = user(2);
        existing.bonus_credits = 4;
        store.create(&existing).unwrap();

        let ensured = store.ensure(&user(2)).unwrap();

        assert_eq!(ensured.bonus_credits, 4, "ensure must not reset credits");
    }

    #[test]
    fn test_modify_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryUserStore::new());
        store.create(&user(1)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store
                            .modify(UserId(1), &mut |u| u.bonus_credits += 1)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get(UserId(1)).unwrap().bonus_credits, 800);
    }
}
