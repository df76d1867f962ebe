use serde::{Deserialize, Serialize};

/// JWT payload binding a bearer token to one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub email: String, // account login key
    pub id: i64,       // user ID
    pub iat: i64,      // issued at (unix timestamp)
    pub exp: i64,      // expires at (unix timestamp)
    pub iss: String,   // issuer
}

impl Claims {
    /// Shape checks that the signature alone cannot give us.
    pub fn is_well_formed(&self) -> bool {
        self.id > 0 && !self.email.trim().is_empty() && self.iat <= self.exp
    }
}
