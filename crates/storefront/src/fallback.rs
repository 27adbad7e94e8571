//! In-memory user store used when the primary database cannot answer.
//!
//! Lives for the life of the process and is never persisted. Only user
//! records are kept here: products, orders and passcodes have no fallback.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use quickdrop_core::{Email, User, UserId};

/// Process-lifetime user storage keyed by id, with an email index.
#[derive(Debug, Default)]
pub struct FallbackStore {
    users: DashMap<UserId, User>,
    by_email: DashMap<Email, UserId>,
}

impl FallbackStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a user by exact email.
    #[must_use]
    pub fn find_by_email(&self, email: &Email) -> Option<User> {
        let id = *self.by_email.get(email)?;
        self.get_by_id(id)
    }

    /// Get a user by id.
    #[must_use]
    pub fn get_by_id(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|user| user.clone())
    }

    /// Create the user for `email`, or update name and phone if one exists.
    ///
    /// The email index entry stays locked for the whole operation, so
    /// concurrent upserts for one email never create two users.
    pub fn upsert(&self, name: &str, email: &Email, phone: &str, now: DateTime<Utc>) -> User {
        match self.by_email.entry(email.clone()) {
            Entry::Occupied(entry) => {
                let id = *entry.get();
                let mut user = self
                    .users
                    .entry(id)
                    .or_insert_with(|| User {
                        id,
                        name: String::new(),
                        email: email.clone(),
                        phone: String::new(),
                        created_at: now,
                    });
                name.clone_into(&mut user.name);
                phone.clone_into(&mut user.phone);
                user.clone()
            }
            Entry::Vacant(entry) => {
                let user = User {
                    id: UserId::generate(),
                    name: name.to_owned(),
                    email: email.clone(),
                    phone: phone.to_owned(),
                    created_at: now,
                };
                self.users.insert(user.id, user.clone());
                entry.insert(user.id);
                user
            }
        }
    }

    /// Insert or replace a user exactly as given.
    ///
    /// Used to mirror a record whose id was already minted elsewhere.
    pub fn put(&self, user: User) {
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(user.id);
                if previous != user.id {
                    self.users.remove(&previous);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(user.id);
            }
        }
        self.users.insert(user.id, user);
    }

    /// Number of users held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if no users are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let store = FallbackStore::new();
        let now = Utc::now();
        let first = store.upsert("Alice", &email("alice@example.com"), "555-0100", now);
        let second = store.upsert("Alicia", &email("alice@example.com"), "555-0199", now);

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Alicia");
        assert_eq!(second.phone, "555-0199");
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.find_by_email(&email("alice@example.com")).unwrap(),
            second
        );
    }

    #[test]
    fn test_email_match_is_case_sensitive() {
        let store = FallbackStore::new();
        store.upsert("Alice", &email("alice@example.com"), "1", Utc::now());
        assert!(store.find_by_email(&email("Alice@example.com")).is_none());
    }

    #[test]
    fn test_get_by_id() {
        let store = FallbackStore::new();
        let user = store.upsert("Bob", &email("bob@example.com"), "2", Utc::now());
        assert_eq!(store.get_by_id(user.id).unwrap().name, "Bob");
        assert!(store.get_by_id(UserId::generate()).is_none());
    }

    #[test]
    fn test_put_replaces_user_for_same_email() {
        let store = FallbackStore::new();
        let local = store.upsert("Carol", &email("carol@example.com"), "3", Utc::now());
        let mirrored = User {
            id: UserId::generate(),
            ..local.clone()
        };
        store.put(mirrored.clone());

        assert_eq!(store.len(), 1);
        assert!(store.get_by_id(local.id).is_none());
        assert_eq!(
            store.find_by_email(&email("carol@example.com")).unwrap().id,
            mirrored.id
        );
    }

    #[test]
    fn test_concurrent_upserts_share_one_user() {
        let store = Arc::new(FallbackStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .upsert(
                            &format!("Dana {i}"),
                            &email("dana@example.com"),
                            "4",
                            Utc::now(),
                        )
                        .id
                })
            })
            .collect();

        let ids: Vec<UserId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.len(), 1);
    }
}
