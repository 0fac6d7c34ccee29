use std::{env, fmt::Debug, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use libsql::{de::from_row, params::IntoParams};
use serde::de;
use tokio::sync::OnceCell;

static DB_SERVICE: OnceCell<Arc<DbService>> = OnceCell::const_new();

/// Seam between the webhook handler and the external store. The handler only
/// cares about the two operations it performs, which also keeps the handler
/// testable against an in-memory stand-in.
#[async_trait]
pub trait DepositStore: Send + Sync {
    /// Look up a user id by normalized (digits-only) CPF. At most one row is
    /// expected to match.
    async fn find_user_by_cpf(&self, cpf: &str) -> anyhow::Result<Option<i64>>;

    /// Append one balance row tagged "deposito". Never updates or deletes.
    async fn insert_deposit(&self, usuario_id: i64, valor: f64) -> anyhow::Result<()>;
}

pub async fn get_db_service() -> Arc<DbService> {
    DB_SERVICE
        .get_or_init(|| async {
            let local_path =
                env::var("LIBSQL_LOCAL_DB_PATH").unwrap_or("file:local_replica.db".to_string());

            let (db, remote) = match env::var("LIBSQL_CLIENT_URL") {
                Ok(url) => {
                    let db = libsql::Builder::new_remote_replica(
                        local_path,
                        url,
                        env::var("LIBSQL_CLIENT_TOKEN").expect("Missing LIBSQL_CLIENT_TOKEN"),
                    )
                    .build()
                    .await
                    .expect("Failed to create database");

                    let _ = db.sync().await.expect("Failed to sync db");

                    tracing::trace!("Synced remote db to local disk");

                    (db, true)
                }
                _ => {
                    let db = libsql::Builder::new_local(local_path)
                        .build()
                        .await
                        .expect("Failed to create database");

                    (db, false)
                }
            };

            tracing::debug!("Initialized db");

            Arc::new(DbService { db, remote })
        })
        .await
        .clone()
}

pub struct DbService {
    db: libsql::Database,
    remote: bool,
}

impl DbService {
    pub async fn init_tables(&self) {
        let conn = self.db.connect().expect("Failed to connect to db");
        let _ = conn
            .execute(
                "CREATE TABLE IF NOT EXISTS usuarios (id INTEGER PRIMARY KEY AUTOINCREMENT, cpf TEXT UNIQUE)",
                libsql::params!(),
            )
            .await;
        let _ = conn
            .execute(
                "CREATE TABLE IF NOT EXISTS saldo (id INTEGER PRIMARY KEY AUTOINCREMENT, usuario_id INTEGER, valor REAL, tipo TEXT)",
                libsql::params!(),
            )
            .await;
    }

    // execute the statement and return the number of rows affected
    // also syncs the DB with the remote primary when one is configured
    pub async fn execute(&self, statement: &str, params: impl IntoParams) -> anyhow::Result<u64> {
        let conn = self.db.connect().context("Failed to connect to db")?;
        let affected = conn.execute(statement, params).await?;

        if affected == 0 {
            tracing::error!("expected at least 1 row affected but got {}", affected);
            return Err(anyhow::anyhow!(
                "expected at least 1 row affected but got {}",
                affected
            ));
        }

        if self.remote {
            let _sync = self.db.sync().await?;
        }

        Ok(affected)
    }

    pub async fn query_opt<T>(
        &self,
        statement: &str,
        params: impl IntoParams,
    ) -> anyhow::Result<Option<T>>
    where
        T: de::DeserializeOwned,
        T: Debug,
        T: Clone,
    {
        let connection = self.db.connect().context("Failed to connect to db")?;
        let mut result_set = connection
            .query(statement, params)
            .await
            .context("Failed to get data from database")?;

        match result_set.next().await? {
            Some(row) => Ok(Some(from_row::<T>(&row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DepositStore for DbService {
    async fn find_user_by_cpf(&self, cpf: &str) -> anyhow::Result<Option<i64>> {
        #[derive(Debug, serde::Deserialize, Clone)]
        struct UsuarioRow {
            id: i64,
        }

        let row = self
            .query_opt::<UsuarioRow>(
                "SELECT id FROM usuarios WHERE cpf = ? LIMIT 1",
                libsql::params!(cpf),
            )
            .await?;

        Ok(row.map(|row| row.id))
    }

    async fn insert_deposit(&self, usuario_id: i64, valor: f64) -> anyhow::Result<()> {
        let _ = self
            .execute(
                "INSERT INTO saldo (usuario_id, valor, tipo) VALUES (?, ?, ?)",
                libsql::params!(usuario_id, valor, "deposito"),
            )
            .await?;

        Ok(())
    }
}
