use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio::fs;
use tokio_postgres::{Client, Config as PgConfig, NoTls, Row};
use tracing::info;

use crate::models::order::{NewOrder, Order, OrderStatus, INITIAL_VERSION};
use crate::store::{OrderStore, StoreError, UpdateOutcome};

const ORDER_COLUMNS: &str = "id, distance, status, version";

/// Postgres adapter. Claims rely on the row lock Postgres takes for a single
/// `UPDATE ... WHERE id = $2 AND version = $3`.
pub struct PgOrderStore {
    pool: Pool,
}

impl PgOrderStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Builds the connection pool and applies the `.sql` files found in
    /// `migrations_dir`, in file name order.
    pub async fn connect(
        database_url: &str,
        pool_size: usize,
        migrations_dir: &str,
    ) -> Result<Self, StoreError> {
        let pg_config: PgConfig = database_url.parse()?;

        let mgr = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(mgr)
            .max_size(pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|err| StoreError::Unavailable(format!("failed to build pool: {err}")))?;

        let client = pool.get().await?;
        run_migrations(&client, migrations_dir).await?;

        Ok(Self::new(pool))
    }
}

pub async fn run_migrations(client: &Client, migrations_dir: &str) -> Result<(), StoreError> {
    let mut entries = fs::read_dir(migrations_dir)
        .await
        .map_err(|err| StoreError::Migration(format!("cannot read {migrations_dir}: {err}")))?;

    let mut scripts = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| StoreError::Migration(err.to_string()))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "sql") {
            scripts.push(path);
        }
    }
    scripts.sort();

    for path in scripts {
        let file_name = path.display().to_string();
        info!(migration = %file_name, "applying migration");

        let content = fs::read_to_string(&path)
            .await
            .map_err(|err| StoreError::Migration(format!("{file_name}: {err}")))?;
        client
            .batch_execute(&content)
            .await
            .map_err(|err| StoreError::Migration(format!("{file_name}: {err}")))?;
    }

    Ok(())
}

fn order_from_row(row: &Row) -> Result<Order, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        distance: row.try_get("distance")?,
        status: status.parse::<OrderStatus>().map_err(StoreError::CorruptRow)?,
        version: row.try_get("version")?,
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let client = self.pool.get().await?;
        let query = format!(
            "INSERT INTO orders (distance, status, version) VALUES ($1, $2, $3) RETURNING {ORDER_COLUMNS}"
        );
        let row = client
            .query_one(
                &query,
                &[
                    &order.distance,
                    &OrderStatus::Unassigned.as_str(),
                    &INITIAL_VERSION,
                ],
            )
            .await?;
        order_from_row(&row)
    }

    async fn fetch(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        client
            .query_opt(&query, &[&id])
            .await?
            .as_ref()
            .map(order_from_row)
            .transpose()
    }

    async fn conditional_update(
        &self,
        id: i64,
        expected_version: i64,
        new_status: OrderStatus,
    ) -> Result<UpdateOutcome, StoreError> {
        let client = self.pool.get().await?;
        let query = format!(
            "UPDATE orders SET status = $1, version = version + 1 \
             WHERE id = $2 AND version = $3 RETURNING {ORDER_COLUMNS}"
        );
        let updated = client
            .query_opt(&query, &[&new_status.as_str(), &id, &expected_version])
            .await?;

        if let Some(row) = updated {
            return Ok(UpdateOutcome::Updated(order_from_row(&row)?));
        }

        let exists: bool = client
            .query_one("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)", &[&id])
            .await?
            .try_get(0)?;

        Ok(if exists {
            UpdateOutcome::VersionConflict
        } else {
            UpdateOutcome::NotFound
        })
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError> {
        let client = self.pool.get().await?;
        let query =
            format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id ASC LIMIT $1 OFFSET $2");
        client
            .query(&query, &[&limit, &offset])
            .await?
            .iter()
            .map(order_from_row)
            .collect()
    }
}
