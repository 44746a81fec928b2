use super::model::RestaurantWithTables;
use crate::model::{valid_hours, Booking, NewBooking, Restaurant, Table};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open database {normalized}"))?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For a file-backed SQLite URL, expand a leading `~/` and create the parent
/// directory of the database file. In-memory and non-sqlite URLs pass through.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{path}?{q}"),
        None => format!("sqlite://{path}"),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn restaurant_from_row(row: &SqliteRow) -> Result<Restaurant> {
    Ok(Restaurant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        opening_hour: row.try_get("opening_hour")?,
        closing_hour: row.try_get("closing_hour")?,
    })
}

fn table_from_row(row: &SqliteRow) -> Result<Table> {
    Ok(Table {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        capacity: row.try_get("capacity")?,
    })
}

fn booking_from_row(row: &SqliteRow) -> Result<Booking> {
    Ok(Booking {
        id: row.try_get("id")?,
        table_id: row.try_get("table_id")?,
        people: row.try_get("people")?,
        start_at: row.try_get("start_at")?,
        end_at: row.try_get("end_at")?,
    })
}

#[instrument(skip_all)]
pub async fn create_restaurant(
    pool: &Pool,
    name: &str,
    opening_hour: u32,
    closing_hour: u32,
) -> Result<Restaurant> {
    if name.trim().is_empty() {
        return Err(anyhow!("restaurant name must be non-empty"));
    }
    if !valid_hours(opening_hour, closing_hour) {
        return Err(anyhow!(
            "invalid opening hours {}..{}",
            opening_hour,
            closing_hour
        ));
    }
    let row = sqlx::query(
        "INSERT INTO restaurants (name, opening_hour, closing_hour) VALUES (?, ?, ?) \
         RETURNING id, name, opening_hour, closing_hour",
    )
    .bind(name.trim())
    .bind(opening_hour)
    .bind(closing_hour)
    .fetch_one(pool)
    .await?;
    restaurant_from_row(&row)
}

#[instrument(skip_all)]
pub async fn get_restaurant(pool: &Pool, restaurant_id: i64) -> Result<Option<Restaurant>> {
    let row = sqlx::query(
        "SELECT id, name, opening_hour, closing_hour FROM restaurants WHERE id = ?",
    )
    .bind(restaurant_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(restaurant_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn list_restaurants(pool: &Pool) -> Result<Vec<RestaurantWithTables>> {
    let rows = sqlx::query("SELECT id, name, opening_hour, closing_hour FROM restaurants ORDER BY id")
        .fetch_all(pool)
        .await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let restaurant = restaurant_from_row(row)?;
        let tables = list_tables(pool, restaurant.id).await?;
        out.push(RestaurantWithTables { restaurant, tables });
    }
    Ok(out)
}

#[instrument(skip_all)]
pub async fn create_table(pool: &Pool, restaurant_id: i64, capacity: u32) -> Result<Table> {
    if capacity == 0 {
        return Err(anyhow!("table capacity must be > 0"));
    }
    let mut tx = pool.begin().await?;
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM restaurants WHERE id = ?")
        .bind(restaurant_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(anyhow!("restaurant {} not found", restaurant_id));
    }
    let row = sqlx::query(
        "INSERT INTO dining_tables (restaurant_id, capacity) VALUES (?, ?) \
         RETURNING id, restaurant_id, capacity",
    )
    .bind(restaurant_id)
    .bind(capacity)
    .fetch_one(&mut *tx)
    .await?;
    let table = table_from_row(&row)?;
    tx.commit().await?;
    Ok(table)
}

#[instrument(skip_all)]
pub async fn list_tables(pool: &Pool, restaurant_id: i64) -> Result<Vec<Table>> {
    let rows = sqlx::query(
        "SELECT id, restaurant_id, capacity FROM dining_tables WHERE restaurant_id = ? ORDER BY id",
    )
    .bind(restaurant_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(table_from_row).collect()
}

/// Bookings on the restaurant's tables whose interval intersects `[from, to)`.
#[instrument(skip_all)]
pub async fn bookings_between(
    pool: &Pool,
    restaurant_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Booking>> {
    // julianday keeps sub-second precision, datetime() would truncate it.
    let rows = sqlx::query(
        "SELECT b.id, b.table_id, b.people, b.start_at, b.end_at \
         FROM bookings b \
         JOIN dining_tables t ON t.id = b.table_id \
         WHERE t.restaurant_id = ? \
           AND julianday(b.start_at) < julianday(?) \
           AND julianday(b.end_at) > julianday(?) \
         ORDER BY julianday(b.start_at) ASC, b.table_id ASC",
    )
    .bind(restaurant_id)
    .bind(to)
    .bind(from)
    .fetch_all(pool)
    .await?;
    rows.iter().map(booking_from_row).collect()
}

#[instrument(skip_all)]
pub async fn insert_booking(pool: &Pool, booking: &NewBooking) -> Result<Booking> {
    if booking.end_at <= booking.start_at {
        return Err(anyhow!("booking must end after it starts"));
    }
    let row = sqlx::query(
        "INSERT INTO bookings (table_id, people, start_at, end_at) VALUES (?, ?, ?, ?) \
         RETURNING id, table_id, people, start_at, end_at",
    )
    .bind(booking.table_id)
    .bind(booking.people)
    .bind(booking.start_at)
    .bind(booking.end_at)
    .fetch_one(pool)
    .await
    .context("failed to persist booking")?;
    booking_from_row(&row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[test]
    fn memory_url_untouched() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            prepare_sqlite_url("postgres://localhost/db"),
            "postgres://localhost/db"
        );
    }

    #[test]
    fn file_url_normalized_and_parent_created() {
        let td = tempfile::tempdir().unwrap();
        let db_path = td.path().join("nested").join("booking.db");
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let normalized = prepare_sqlite_url(&url);
        assert_eq!(normalized, format!("sqlite://{}?mode=rwc", db_path.display()));
        assert!(td.path().join("nested").exists());
    }

    #[tokio::test]
    async fn restaurant_and_tables_round_trip() {
        let pool = setup_pool().await;
        let r = create_restaurant(&pool, "Trattoria", 18, 23).await.unwrap();
        assert_eq!(get_restaurant(&pool, r.id).await.unwrap(), Some(r.clone()));
        assert!(get_restaurant(&pool, r.id + 100).await.unwrap().is_none());

        let t1 = create_table(&pool, r.id, 2).await.unwrap();
        let t2 = create_table(&pool, r.id, 4).await.unwrap();
        let tables = list_tables(&pool, r.id).await.unwrap();
        assert_eq!(tables, vec![t1, t2]);

        let listing = list_restaurants(&pool).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].total_seats(), 6);
    }

    #[tokio::test]
    async fn rejects_bad_reference_data() {
        let pool = setup_pool().await;
        assert!(create_restaurant(&pool, "Late", 23, 18).await.is_err());
        assert!(create_restaurant(&pool, "  ", 18, 23).await.is_err());
        let r = create_restaurant(&pool, "Trattoria", 18, 23).await.unwrap();
        assert!(create_table(&pool, r.id, 0).await.is_err());
        assert!(create_table(&pool, r.id + 1, 2).await.is_err());
    }

    #[tokio::test]
    async fn bookings_between_uses_half_open_intervals() {
        let pool = setup_pool().await;
        let r = create_restaurant(&pool, "Trattoria", 18, 23).await.unwrap();
        let table = create_table(&pool, r.id, 4).await.unwrap();
        let start = Utc.with_ymd_and_hms(2015, 2, 14, 19, 0, 0).unwrap();
        let stored = insert_booking(
            &pool,
            &NewBooking {
                table_id: table.id,
                people: 4,
                start_at: start,
                end_at: start + Duration::minutes(90),
            },
        )
        .await
        .unwrap();
        assert_eq!(stored.start_at, start);

        let hit = bookings_between(&pool, r.id, start + Duration::minutes(30), start + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(hit, vec![stored.clone()]);

        let touching_after = bookings_between(&pool, r.id, stored.end_at, stored.end_at + Duration::hours(1))
            .await
            .unwrap();
        assert!(touching_after.is_empty());

        let touching_before = bookings_between(&pool, r.id, start - Duration::hours(1), start)
            .await
            .unwrap();
        assert!(touching_before.is_empty());
    }
}
