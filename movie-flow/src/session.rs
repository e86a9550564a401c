use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::{error::Result, view::Screen};

/// Opaque per-user identifier assigned by the chat transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Volatile per-user state. Lives for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    /// Saved movie identifiers, unique.
    pub watchlist: BTreeSet<String>,
    /// Written by the favorite-genre action, only displayed back to the user.
    pub favorite_genres: Vec<String>,
    pub last_query: Option<String>,
    /// Last view the user navigated to.
    pub screen: Screen,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            watchlist: BTreeSet::new(),
            favorite_genres: Vec::new(),
            last_query: None,
            screen: Screen::MainMenu,
        }
    }
}

/// Keyed store of [`Session`]s.
///
/// Every mutation is atomic with respect to concurrent readers of the same session.
/// Mutating calls create the session first when it does not exist yet.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the existing session or installs a default one.
    async fn get_or_create(&self, user: UserId) -> Result<Session>;

    async fn get(&self, user: UserId) -> Result<Option<Session>>;

    /// `true` when the identifier was not in the watchlist before.
    async fn add_to_watchlist(&self, user: UserId, movie_id: &str) -> Result<bool>;

    async fn clear_watchlist(&self, user: UserId) -> Result<()>;

    /// `true` when the genre was not a favorite before.
    async fn add_favorite_genre(&self, user: UserId, genre: &str) -> Result<bool>;

    async fn set_last_query(&self, user: UserId, query: &str) -> Result<()>;

    async fn set_screen(&self, user: UserId, screen: Screen) -> Result<()>;
}

/// In-memory implementation of [`SessionStore`]. No eviction.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<UserId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Runs `f` on the user's session while holding its shard lock.
    fn mutate<T>(&self, user: UserId, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut entry = self
            .sessions
            .entry(user)
            .or_insert_with(|| Session::new(user));
        f(entry.value_mut())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, user: UserId) -> Result<Session> {
        Ok(self.mutate(user, |session| session.clone()))
    }

    async fn get(&self, user: UserId) -> Result<Option<Session>> {
        Ok(self.sessions.get(&user).map(|entry| entry.clone()))
    }

    async fn add_to_watchlist(&self, user: UserId, movie_id: &str) -> Result<bool> {
        Ok(self.mutate(user, |session| session.watchlist.insert(movie_id.to_string())))
    }

    async fn clear_watchlist(&self, user: UserId) -> Result<()> {
        self.mutate(user, |session| session.watchlist.clear());
        Ok(())
    }

    async fn add_favorite_genre(&self, user: UserId, genre: &str) -> Result<bool> {
        Ok(self.mutate(user, |session| {
            // Case-insensitive, first spelling wins
            let known = session
                .favorite_genres
                .iter()
                .any(|g| g.eq_ignore_ascii_case(genre));
            if !known {
                session.favorite_genres.push(genre.to_string());
            }
            !known
        }))
    }

    async fn set_last_query(&self, user: UserId, query: &str) -> Result<()> {
        self.mutate(user, |session| session.last_query = Some(query.to_string()));
        Ok(())
    }

    async fn set_screen(&self, user: UserId, screen: Screen) -> Result<()> {
        self.mutate(user, |session| session.screen = screen);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_installs_default_session() {
        let store = InMemorySessionStore::new();
        assert!(store.get(UserId(7)).await.unwrap().is_none());

        let session = store.get_or_create(UserId(7)).await.unwrap();
        assert_eq!(session, Session::new(UserId(7)));
        assert_eq!(store.len(), 1);

        store.get_or_create(UserId(7)).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_watchlist_add_is_idempotent() {
        let store = InMemorySessionStore::new();
        let user = UserId(1);

        assert!(store.add_to_watchlist(user, "tt1").await.unwrap());
        assert!(!store.add_to_watchlist(user, "tt1").await.unwrap());
        assert!(store.add_to_watchlist(user, "tt2").await.unwrap());

        let session = store.get(user).await.unwrap().unwrap();
        assert_eq!(session.watchlist.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_watchlist_on_absent_session_creates_it_empty() {
        let store = InMemorySessionStore::new();
        store.clear_watchlist(UserId(3)).await.unwrap();
        let session = store.get(UserId(3)).await.unwrap().unwrap();
        assert!(session.watchlist.is_empty());
    }

    #[tokio::test]
    async fn test_favorite_genres_keep_order_and_skip_duplicates() {
        let store = InMemorySessionStore::new();
        let user = UserId(4);
        assert!(store.add_favorite_genre(user, "Drama").await.unwrap());
        assert!(store.add_favorite_genre(user, "Horror").await.unwrap());
        assert!(!store.add_favorite_genre(user, "drama").await.unwrap());

        let session = store.get(user).await.unwrap().unwrap();
        assert_eq!(session.favorite_genres, vec!["Drama", "Horror"]);
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = InMemorySessionStore::new();
        let user = UserId(9);
        let mut handles = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.add_to_watchlist(user, &format!("tt{i}")).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(store.get(user).await.unwrap().unwrap().watchlist.len(), 50);
    }
}
