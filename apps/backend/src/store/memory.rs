use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;

use super::{new_user_id, NewUser, StoreError, UserFilter, UserPatch, UserRecord, UserStore};

/// In-process store for tests and `DATABASE_URL=memory`.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Checks `candidate` against every record except `skip_id`.
fn check_unique(
    users: &HashMap<String, UserRecord>,
    email: &str,
    username: Option<&str>,
    skip_id: Option<&str>,
) -> Result<(), StoreError> {
    let others = users
        .values()
        .filter(|u| Some(u.id.as_str()) != skip_id);
    for other in others {
        if other.email == email {
            return Err(StoreError::Duplicate { field: "email" });
        }
        if let Some(username) = username.filter(|u| !u.is_empty()) {
            if other.username.as_deref() == Some(username) {
                return Err(StoreError::Duplicate { field: "username" });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read();
        if let UserFilter::Id(id) = filter {
            return Ok(users.get(id).cloned());
        }
        Ok(users.values().find(|u| filter.matches(u)).cloned())
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut all: Vec<UserRecord> = self.users.read().values().cloned().collect();
        // ULIDs sort by creation time.
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn insert_one(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write();
        check_unique(&users, &user.email, user.username.as_deref(), None)?;

        let now = OffsetDateTime::now_utc();
        let record = UserRecord {
            id: new_user_id(),
            name: user.name,
            username: user.username.filter(|u| !u.is_empty()),
            email: user.email,
            role: user.role,
            status: user.status,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_one(&self, id: &str, patch: UserPatch) -> Result<Option<UserRecord>, StoreError> {
        let mut users = self.users.write();
        let Some(current) = users.get(id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        patch.apply(&mut updated, OffsetDateTime::now_utc());
        updated.username = updated.username.filter(|u| !u.is_empty());
        check_unique(&users, &updated.email, updated.username.as_deref(), Some(id))?;

        users.insert(id.to_string(), updated.clone());
        Ok(Some(updated))
    }

    async fn delete_one(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.users.write().remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Role;
    use crate::store::UserStatus;

    fn new_user(email: &str, username: Option<&str>) -> NewUser {
        NewUser {
            name: "Test".into(),
            username: username.map(str::to_string),
            email: email.into(),
            role: Role::Operator,
            status: UserStatus::Active,
            password_hash: "$argon2id$placeholder".into(),
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_each_key() {
        let store = MemoryUserStore::new();
        let rec = store
            .insert_one(new_user("a@example.test", Some("alice")))
            .await
            .unwrap();

        for filter in [
            UserFilter::Id(rec.id.clone()),
            UserFilter::Email("a@example.test".into()),
            UserFilter::Username("alice".into()),
            UserFilter::Role(Role::Operator),
        ] {
            assert_eq!(store.find_one(&filter).await.unwrap().as_ref(), Some(&rec));
        }
        assert_eq!(
            store
                .find_one(&UserFilter::Email("b@example.test".into()))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn duplicate_email_and_username_rejected() {
        let store = MemoryUserStore::new();
        store
            .insert_one(new_user("a@example.test", Some("alice")))
            .await
            .unwrap();

        assert_eq!(
            store.insert_one(new_user("a@example.test", None)).await,
            Err(StoreError::Duplicate { field: "email" })
        );
        assert_eq!(
            store
                .insert_one(new_user("b@example.test", Some("alice")))
                .await,
            Err(StoreError::Duplicate { field: "username" })
        );
        // Empty usernames never collide.
        store.insert_one(new_user("c@example.test", Some(""))).await.unwrap();
        store.insert_one(new_user("d@example.test", Some(""))).await.unwrap();
    }

    #[tokio::test]
    async fn update_checks_uniqueness_against_others_only() {
        let store = MemoryUserStore::new();
        let a = store.insert_one(new_user("a@example.test", None)).await.unwrap();
        store.insert_one(new_user("b@example.test", None)).await.unwrap();

        let same_email = UserPatch {
            email: Some("a@example.test".into()),
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let updated = store.update_one(&a.id, same_email).await.unwrap().unwrap();
        assert_eq!(updated.name, "Renamed");
        assert!(updated.updated_at >= a.updated_at);

        let steal = UserPatch {
            email: Some("b@example.test".into()),
            ..Default::default()
        };
        assert_eq!(
            store.update_one(&a.id, steal).await,
            Err(StoreError::Duplicate { field: "email" })
        );
        assert_eq!(store.update_one("missing", UserPatch::default()).await, Ok(None));
    }

    #[tokio::test]
    async fn delete_and_list() {
        let store = MemoryUserStore::new();
        let a = store.insert_one(new_user("a@example.test", None)).await.unwrap();
        let b = store.insert_one(new_user("b@example.test", None)).await.unwrap();

        let ids: Vec<_> = store.find_all().await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.id) && ids.contains(&b.id));

        assert!(store.delete_one(&a.id).await.unwrap());
        assert!(!store.delete_one(&a.id).await.unwrap());
        assert_eq!(store.find_all().await.unwrap(), vec![b]);
    }
}
