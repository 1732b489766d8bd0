use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;

use crate::error::AppResult;

pub async fn connect_and_migrate(database_url: &str) -> AppResult<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url);
    // Every pooled connection would otherwise see its own empty database.
    if database_url.contains(":memory:") {
        opts.max_connections(1);
    }
    let db = Database::connect(opts).await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA journal_mode=WAL".to_string(),
    ))
    .await?;

    migration::Migrator::up(&db, None).await?;
    tracing::debug!(%database_url, "database ready");
    Ok(db)
}
