//! Cloneable handle to the sqlite pool backing the session store.
//!
//! Query methods hang off this type, grouped per table (see `sessions.rs`
//! for the delegated-session queries).

use sqlx::{Pool, Sqlite};

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
