#![deny(warnings)]

//! Persistence layer: SQLite schema and read-only access to historical sales.

use async_trait::async_trait;
use launch_core::{
    ComparableQuery, ComparableRecord, GatewayError, HistoricalData, Retailer, RetailerId,
    RetailerYearAgreement,
};
use rust_decimal::Decimal;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::str::FromStr;
use tracing::debug;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Returns the default SQLite URL of the historical store.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./data/history.db"
}

/// Integer cents as a dollar amount.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn store_error(err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            GatewayError::Unavailable(err.to_string())
        }
        other => GatewayError::Query(other.to_string()),
    }
}

/// Open (creating if missing) the database at `url` and apply migrations.
///
/// In-memory databases get a single connection so every query sees the same
/// data.
pub async fn init_db(url: &str) -> Result<SqlitePool, GatewayError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(store_error)?
        .create_if_missing(true)
        .foreign_keys(true);
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(store_error)?;
    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| GatewayError::Unavailable(format!("migration failed: {e}")))?;
    Ok(pool)
}

#[derive(FromRow)]
struct RetailerRow {
    id: i64,
    name: String,
}

#[derive(FromRow)]
struct ComparableRow {
    retailer_id: i64,
    product_id: i64,
    year: i64,
    volume_sold: i64,
    list_price: f64,
    contribution_margin: f64,
}

#[derive(FromRow)]
struct AgreementRow {
    retailer_id: i64,
    year: i64,
    retailer_markup: f64,
    display_costs: i64,
    priority_shelving_costs: i64,
    preferred_vendor_agreement_costs: i64,
}

fn year_from_row(year: i64) -> Result<u32, GatewayError> {
    u32::try_from(year).map_err(|_| GatewayError::Query(format!("invalid year {year} in store")))
}

impl TryFrom<ComparableRow> for ComparableRecord {
    type Error = GatewayError;

    fn try_from(r: ComparableRow) -> Result<Self, Self::Error> {
        Ok(ComparableRecord {
            retailer_id: RetailerId(r.retailer_id),
            product_id: r.product_id,
            year: year_from_row(r.year)?,
            volume_sold: r.volume_sold,
            list_price: r.list_price,
            contribution_margin: r.contribution_margin,
        })
    }
}

impl TryFrom<AgreementRow> for RetailerYearAgreement {
    type Error = GatewayError;

    fn try_from(r: AgreementRow) -> Result<Self, Self::Error> {
        Ok(RetailerYearAgreement {
            retailer_id: RetailerId(r.retailer_id),
            year: year_from_row(r.year)?,
            retailer_markup: r.retailer_markup,
            display_costs: cents_to_decimal(r.display_costs),
            priority_shelving_costs: cents_to_decimal(r.priority_shelving_costs),
            preferred_vendor_costs: cents_to_decimal(r.preferred_vendor_agreement_costs),
        })
    }
}

const COMPARABLES_SQL: &str = "\
SELECT pry.retailer_id, pry.product_id, pry.year, pry.volume_sold,
       pry.list_price, pry.contribution_margin
FROM product_retailer_year pry
JOIN product p ON p.id = pry.product_id
WHERE pry.retailer_id = ?
  AND pry.year = ?
  AND pry.contribution_margin BETWEEN ? AND ?
  AND pry.list_price BETWEEN ? AND ?
  AND p.brand_name = ?
  AND p.category = ?";

const AGREEMENT_SQL: &str = "\
SELECT retailer_id, year, retailer_markup, display_costs,
       priority_shelving_costs, preferred_vendor_agreement_costs
FROM retailer_year
WHERE retailer_id = ? AND year = ?";

/// Historical store backed by a SQLite pool.
#[derive(Clone, Debug)]
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open an existing store at `url` without creating or migrating it.
    ///
    /// A missing database file is reported as [`GatewayError::Unavailable`].
    pub async fn connect(url: &str) -> Result<Self, GatewayError> {
        let unavailable = |e: sqlx::Error| GatewayError::Unavailable(format!("{url}: {e}"));
        let options = SqliteConnectOptions::from_str(url)
            .map_err(unavailable)?
            .create_if_missing(false)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(unavailable)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl HistoricalData for SqliteHistory {
    async fn find_retailers(&self, names: &[&str]) -> Result<Vec<Retailer>, GatewayError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, name FROM retailer WHERE name IN (");
        let mut list = qb.separated(", ");
        for name in names {
            list.push_bind(name.to_string());
        }
        list.push_unseparated(") ORDER BY id");
        let rows: Vec<RetailerRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|r| Retailer {
                id: RetailerId(r.id),
                name: r.name,
            })
            .collect())
    }

    async fn find_comparables(
        &self,
        query: &ComparableQuery,
    ) -> Result<Vec<ComparableRecord>, GatewayError> {
        let rows: Vec<ComparableRow> = sqlx::query_as(COMPARABLES_SQL)
            .bind(query.retailer_id.0)
            .bind(i64::from(query.year))
            .bind(query.margin.low)
            .bind(query.margin.high)
            .bind(query.price.low)
            .bind(query.price.high)
            .bind(query.brand.as_str())
            .bind(query.category.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        debug!(
            retailer = query.retailer_id.0,
            year = query.year,
            matches = rows.len(),
            "comparables query"
        );
        rows.into_iter().map(ComparableRecord::try_from).collect()
    }

    async fn find_agreement(
        &self,
        retailer: RetailerId,
        year: u32,
    ) -> Result<RetailerYearAgreement, GatewayError> {
        let mut rows: Vec<AgreementRow> = sqlx::query_as(AGREEMENT_SQL)
            .bind(retailer.0)
            .bind(i64::from(year))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        match rows.len() {
            0 => Err(GatewayError::MissingAgreement {
                retailer_id: retailer.0,
                year,
            }),
            1 => rows.remove(0).try_into(),
            count => Err(GatewayError::DuplicateAgreement {
                retailer_id: retailer.0,
                year,
                count,
            }),
        }
    }
}
