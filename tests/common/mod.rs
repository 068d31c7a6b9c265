//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to the test database and truncate all fincore tables.
///
/// Requires DATABASE_URL to point at a database with the migrations from
/// migrations/ applied.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::query(
        "TRUNCATE TABLE transactions, notifications, investments, investment_plans, \
         loans, loan_applications, crypto_orders, wallets CASCADE",
    )
    .execute(&pool)
    .await
    .expect("Failed to clean up DB");

    pool
}

/// Seed a standard 12-month monthly-compounding plan and return its id.
pub async fn seed_plan(pool: &PgPool) -> uuid::Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO investment_plans (
            name, description, min_amount, max_amount, roi_percentage,
            duration_value, duration_unit, compound_frequency
        )
        VALUES ('Growth Fund', 'Test plan', 100, 10000, 12, 12, 'months', 'monthly')
        RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .expect("Failed to seed plan")
}
