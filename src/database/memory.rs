//! In-memory store used when no `DATABASE_URL` is configured, and by tests.

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use super::{StoreError, TravelLog, TravelStore, UserRecord, UserStore, UserUpdate};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, UserRecord>,
    travels: DashMap<Uuid, TravelLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut logs: Vec<TravelLog>, limit: usize) -> Vec<TravelLog> {
    logs.sort_by(|a, b| b.date.cmp(&a.date));
    logs.truncate(limit);
    logs
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, record: UserRecord) -> Result<Uuid, StoreError> {
        match self.users.entry(record.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                let id = record.id;
                slot.insert(record);
                Ok(id)
            }
        }
    }

    async fn update(&self, email: &str, update: &UserUpdate) -> Result<u64, StoreError> {
        Ok(match self.users.get_mut(email) {
            Some(mut user) => u64::from(user.apply(update)),
            None => 0,
        })
    }

    async fn delete(&self, email: &str) -> Result<u64, StoreError> {
        Ok(u64::from(self.users.remove(email).is_some()))
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut users: Vec<UserRecord> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl TravelStore for MemoryStore {
    async fn insert_travel(&self, log: TravelLog) -> Result<Uuid, StoreError> {
        let id = log.id;
        self.travels.insert(id, log);
        Ok(id)
    }

    async fn travels_by_user(&self, email: &str, limit: usize) -> Result<Vec<TravelLog>, StoreError> {
        let logs = self
            .travels
            .iter()
            .filter(|e| e.value().user_email == email)
            .map(|e| e.value().clone())
            .collect();
        Ok(newest_first(logs, limit))
    }

    async fn all_travels(&self, limit: usize) -> Result<Vec<TravelLog>, StoreError> {
        let logs = self.travels.iter().map(|e| e.value().clone()).collect();
        Ok(newest_first(logs, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::NewTravelLog;
    use chrono::{Duration, Utc};

    fn user(email: &str) -> UserRecord {
        UserRecord::new(
            email.into(),
            "Alice".into(),
            "hash".into(),
            "FC-1".into(),
            Role::Employee,
        )
    }

    fn log(email: &str, days_ago: i64) -> TravelLog {
        TravelLog::new(NewTravelLog {
            user_email: email.into(),
            date: Utc::now() - Duration::days(days_ago),
            meter_start: 0.0,
            meter_end: 10.0,
            official_km: 10.0,
            private_km: 0.0,
            remarks: format!("{days_ago} days ago"),
        })
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.insert(user("a@x.com")).await.unwrap();
        assert!(matches!(
            store.insert(user("a@x.com")).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn update_counts_only_modifications() {
        let store = MemoryStore::new();
        store.insert(user("a@x.com")).await.unwrap();

        let same = UserUpdate {
            name: Some("Alice".into()),
            ..Default::default()
        };
        assert_eq!(store.update("a@x.com", &same).await.unwrap(), 0);

        let rename = UserUpdate {
            name: Some("Alicia".into()),
            ..Default::default()
        };
        assert_eq!(store.update("a@x.com", &rename).await.unwrap(), 1);
        assert_eq!(store.update("missing@x.com", &rename).await.unwrap(), 0);

        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.name, "Alicia");
    }

    #[tokio::test]
    async fn delete_reports_count() {
        let store = MemoryStore::new();
        store.insert(user("a@x.com")).await.unwrap();
        assert_eq!(store.delete("a@x.com").await.unwrap(), 1);
        assert_eq!(store.delete("a@x.com").await.unwrap(), 0);
        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn travels_are_scoped_and_newest_first() {
        let store = MemoryStore::new();
        store.insert_travel(log("a@x.com", 3)).await.unwrap();
        store.insert_travel(log("a@x.com", 1)).await.unwrap();
        store.insert_travel(log("b@x.com", 2)).await.unwrap();

        let mine = store.travels_by_user("a@x.com", 100).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].remarks, "1 days ago");
        assert_eq!(mine[1].remarks, "3 days ago");

        let all = store.all_travels(2).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].user_email, "b@x.com");
    }
}
