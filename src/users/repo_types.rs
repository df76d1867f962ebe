use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                             // assigned by the store, never changes
    pub email: String,                       // normalized login key
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,               // Argon2 PHC string, never the plaintext
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub display_pic: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,  // soft delete marker
}

impl User {
    /// A profile counts as built once both names are present.
    pub fn has_full_name(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.first_name) && filled(&self.last_name)
    }
}

/// Values for a new row; the store fills in id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub display_pic: Option<String>,
}
