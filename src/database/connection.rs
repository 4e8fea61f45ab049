// Database Connection Management
//
// PostgreSQL connection pooling with tokio-postgres and deadpool, and the
// PostgreSQL implementation of the user and travel stores.
use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use crate::database::models::{FromRow, TravelLog, UserRecord, UserUpdate};
use crate::database::{StoreError, TravelStore, UserStore};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_size: usize,
    pub timeouts: deadpool_postgres::Timeouts,
}

fn default_timeouts() -> deadpool_postgres::Timeouts {
    deadpool_postgres::Timeouts {
        wait: Some(Duration::from_secs(30)),
        create: Some(Duration::from_secs(30)),
        recycle: Some(Duration::from_secs(30)),
    }
}

impl DatabaseConfig {
    /// Create configuration from database URL
    pub fn from_url(url: &str, max_size: usize) -> Result<Self> {
        let parsed = url::Url::parse(url).context("Failed to parse database URL")?;

        if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
            anyhow::bail!("Invalid database URL scheme, expected postgresql or postgres");
        }

        Ok(Self {
            host: parsed.host_str().unwrap_or("localhost").to_string(),
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().unwrap_or("").to_string(),
            dbname: parsed.path().trim_start_matches('/').to_string(),
            max_size,
            timeouts: default_timeouts(),
        })
    }
}

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    /// Create a new database connection with the provided configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let masked_host = format!("{}:{}/{}", config.host, config.port, config.dbname);
        tracing::info!("Connecting to database: {}", masked_host);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.dbname(&config.dbname);

        let tls_connector = TlsConnector::builder()
            .build()
            .context("Failed to build TLS connector")?;
        let tls = MakeTlsConnector::new(tls_connector);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(config.max_size)
            .wait_timeout(config.timeouts.wait)
            .create_timeout(config.timeouts.create)
            .recycle_timeout(config.timeouts.recycle)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        let connection = Self { pool };
        connection.health_check().await?;

        tracing::info!("Database connection established");
        Ok(connection)
    }

    /// Create connection from database URL
    pub async fn from_url(url: &str, max_size: usize) -> Result<Self> {
        Self::new(DatabaseConfig::from_url(url, max_size)?).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get connection for health check")?;

        client
            .query("SELECT 1", &[])
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.context("Failed to get DB connection")
    }
}

#[async_trait]
impl UserStore for DatabaseConnection {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT * FROM users WHERE email = $1", &[&email])
            .await
            .context("Failed to query user by email")?;
        let user = row
            .map(|r| UserRecord::from_row(&r))
            .transpose()
            .context("Failed to decode user row")?;
        Ok(user)
    }

    async fn insert(&self, record: UserRecord) -> Result<Uuid, StoreError> {
        let client = self.client().await?;
        let result = client
            .execute(
                "INSERT INTO users (id, email, name, password_hash, fuel_card_no, role, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &record.id,
                    &record.email,
                    &record.name,
                    &record.password_hash,
                    &record.fuel_card_no,
                    &record.role.as_str(),
                    &record.created_at,
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(record.id),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Err(StoreError::Conflict),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert user").into()),
        }
    }

    async fn update(&self, email: &str, update: &UserUpdate) -> Result<u64, StoreError> {
        let client = self.client().await?;
        let role = update.role.map(|r| r.as_str());
        // Rows whose supplied fields already match are not counted as modified
        let n = client
            .execute(
                "UPDATE users SET \
                     name = COALESCE($2::TEXT, name), \
                     fuel_card_no = COALESCE($3::TEXT, fuel_card_no), \
                     role = COALESCE($4::TEXT, role) \
                 WHERE email = $1 AND ( \
                     ($2::TEXT IS NOT NULL AND name <> $2::TEXT) OR \
                     ($3::TEXT IS NOT NULL AND fuel_card_no <> $3::TEXT) OR \
                     ($4::TEXT IS NOT NULL AND role <> $4::TEXT))",
                &[&email, &update.name, &update.fuel_card_no, &role],
            )
            .await
            .context("Failed to update user")?;
        Ok(n)
    }

    async fn delete(&self, email: &str) -> Result<u64, StoreError> {
        let client = self.client().await?;
        let n = client
            .execute("DELETE FROM users WHERE email = $1", &[&email])
            .await
            .context("Failed to delete user")?;
        Ok(n)
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let client = self.client().await?;
        let rows = client
            .query("SELECT * FROM users ORDER BY created_at", &[])
            .await
            .context("Failed to list users")?;
        let users = rows
            .iter()
            .map(UserRecord::from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode user row")?;
        Ok(users)
    }
}

#[async_trait]
impl TravelStore for DatabaseConnection {
    async fn insert_travel(&self, log: TravelLog) -> Result<Uuid, StoreError> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO travels \
                 (id, user_email, date, meter_start, meter_end, total_km, official_km, private_km, remarks) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                &[
                    &log.id,
                    &log.user_email,
                    &log.date,
                    &log.meter_start,
                    &log.meter_end,
                    &log.total_km,
                    &log.official_km,
                    &log.private_km,
                    &log.remarks,
                ],
            )
            .await
            .context("Failed to insert travel log")?;
        Ok(log.id)
    }

    async fn travels_by_user(&self, email: &str, limit: usize) -> Result<Vec<TravelLog>, StoreError> {
        let client = self.client().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = client
            .query(
                "SELECT * FROM travels WHERE user_email = $1 ORDER BY date DESC LIMIT $2",
                &[&email, &limit],
            )
            .await
            .context("Failed to query travel logs by user")?;
        decode_travels(&rows)
    }

    async fn all_travels(&self, limit: usize) -> Result<Vec<TravelLog>, StoreError> {
        let client = self.client().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = client
            .query("SELECT * FROM travels ORDER BY date DESC LIMIT $1", &[&limit])
            .await
            .context("Failed to query travel logs")?;
        decode_travels(&rows)
    }
}

fn decode_travels(rows: &[tokio_postgres::Row]) -> Result<Vec<TravelLog>, StoreError> {
    let logs = rows
        .iter()
        .map(TravelLog::from_row)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to decode travel row")?;
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_postgres_url() {
        let config = DatabaseConfig::from_url("postgres://fuel:pw@db.internal:6543/fueltrackr", 4).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.user, "fuel");
        assert_eq!(config.password, "pw");
        assert_eq!(config.dbname, "fueltrackr");
        assert_eq!(config.max_size, 4);
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(DatabaseConfig::from_url("mysql://root@localhost/db", 4).is_err());
        assert!(DatabaseConfig::from_url("not a url", 4).is_err());
    }
}
