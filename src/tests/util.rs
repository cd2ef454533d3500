use crate::db::{connect_db, ensure_schema, Database};

pub async fn init_test_db() -> Database {
    let pool = connect_db("sqlite::memory:", 1)
        .await
        .expect("failed to create in-memory database");

    ensure_schema(&pool)
        .await
        .expect("failed to create schema");

    Database::new(pool)
}
