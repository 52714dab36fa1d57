// Principal types
//
// Users and administrators are disjoint principal kinds with separate
// login tables. Password hashes are opaque here; hashing lives in storage.

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Public identity of a user or administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Principal {
    pub id: i64,
    pub nickname: String,
}

/// Principal with its stored credential, used only for login checks
#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: i64,
    pub login_name: String,
    pub nickname: String,
    pub pass_hash: String,
}

impl Credentials {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            nickname: self.nickname.clone(),
        }
    }
}

/// Input for creating a user or administrator
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub login_name: String,
    pub nickname: String,
    pub pass_hash: String,
}

/// Which login table a principal lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountKind {
    User,
    Administrator,
}
