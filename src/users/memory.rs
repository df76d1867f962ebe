use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo::{StoreError, UserStore};
use super::repo_types::{NewUser, User};

/// In-process `UserStore` with the same uniqueness and soft-delete rules as the
/// `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn soft_delete(&self, email: &str) {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut().filter(|r| r.email == email && r.deleted_at.is_none()) {
            row.deleted_at = Some(OffsetDateTime::now_utc());
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.email == user.email && r.deleted_at.is_none()) {
            return Err(StoreError::Conflict);
        }
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: rows.len() as i64 + 1,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            phone_number: user.phone_number,
            address: user.address,
            display_pic: user.display_pic,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| r.email == email && r.deleted_at.is_none())
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == user.id && r.deleted_at.is_none())
            .ok_or(StoreError::NotFound)?;
        row.first_name = user.first_name.clone();
        row.last_name = user.last_name.clone();
        row.password_hash = user.password_hash.clone();
        row.phone_number = user.phone_number.clone();
        row.address = user.address.clone();
        row.display_pic = user.display_pic.clone();
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }
}
