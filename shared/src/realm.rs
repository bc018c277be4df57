use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity space a login is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Realm {
    Member,
    Owner,
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Realm::Member => f.write_str("member"),
            Realm::Owner => f.write_str("owner"),
        }
    }
}
