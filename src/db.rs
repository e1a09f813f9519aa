use crate::config::AppConfig;
use crate::entities;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Establishes a connection pool to the database.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let pool = Database::connect(options).await?;
    info!("Database connection established");
    Ok(pool)
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    establish_connection(&cfg.database_url).await
}

/// Creates any missing tables from the entity definitions. Used in
/// development and tests; production schemas are managed externally.
pub async fn run_migrations(db: &DbPool) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table_if_missing(db, schema.create_table_from_entity(entities::product::Entity)).await?;
    create_table_if_missing(db, schema.create_table_from_entity(entities::design::Entity)).await?;
    create_table_if_missing(
        db,
        schema.create_table_from_entity(entities::product_template::Entity),
    )
    .await?;
    create_table_if_missing(db, schema.create_table_from_entity(entities::discount::Entity))
        .await?;
    create_table_if_missing(db, schema.create_table_from_entity(entities::order::Entity)).await?;
    create_table_if_missing(db, schema.create_table_from_entity(entities::order_item::Entity))
        .await?;
    create_table_if_missing(
        db,
        schema.create_table_from_entity(entities::order_counter::Entity),
    )
    .await?;
    create_table_if_missing(
        db,
        schema.create_table_from_entity(entities::store_settings::Entity),
    )
    .await?;

    info!("Schema bootstrap complete");
    Ok(())
}

async fn create_table_if_missing(
    db: &DbPool,
    mut stmt: sea_orm::sea_query::TableCreateStatement,
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    stmt.if_not_exists();
    debug!("Ensuring table exists: {:?}", stmt.get_table_name());
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
