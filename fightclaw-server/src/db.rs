use sqlx::postgres::{PgPool, PgPoolOptions};

pub type DbPool = PgPool;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    for sql in [
        include_str!("../migrations/001_initial.sql"),
        include_str!("../migrations/002_match_actor_state.sql"),
    ] {
        sqlx::raw_sql(sql).execute(pool).await?;
    }
    Ok(())
}
