//! Table availability and booking.
//!
//! The lookup itself is [`first_available_table`], which works on data already
//! in memory. The async operations fetch that data through a [`BookingStore`]
//! and are what callers normally use.

use crate::model::{Booking, BookingConfirmation, NewBooking, Restaurant, Table};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Slot length used when the caller does not ask for one.
pub const DEFAULT_SLOT_MINUTES: i64 = 90;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Source of tables and bookings, and sink for new bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Tables of the restaurant, ordered by id.
    async fn tables(&self, restaurant_id: i64) -> Result<Vec<Table>>;

    /// Bookings on the restaurant's tables that intersect `[from, to)`.
    async fn bookings_between(
        &self,
        restaurant_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;

    async fn insert_booking(&self, booking: &NewBooking) -> Result<Booking>;
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("no table available")]
    Unavailable,
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// `[start, start + slot)`, or `None` for a slot that can never be served.
pub fn requested_interval(
    start: DateTime<Utc>,
    slot_minutes: Option<i64>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let minutes = slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
    if minutes <= 0 || minutes > MINUTES_PER_DAY {
        return None;
    }
    let end = start.checked_add_signed(Duration::minutes(minutes))?;
    Some((start, end))
}

/// First table, by id, that seats `party_size` and has no booking overlapping
/// `[start, end)`. Nothing qualifies for an empty party or unless the interval
/// sits inside the restaurant's opening hours.
pub fn first_available_table<'a>(
    restaurant: &Restaurant,
    tables: &'a [Table],
    bookings: &[Booking],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    party_size: u32,
) -> Option<&'a Table> {
    if party_size == 0 || !restaurant.is_open_for(start, end) {
        return None;
    }
    let mut candidates: Vec<&Table> = tables
        .iter()
        .filter(|t| t.restaurant_id == restaurant.id && t.fits(party_size))
        .collect();
    candidates.sort_by_key(|t| t.id);
    candidates.into_iter().find(|table| {
        !bookings
            .iter()
            .any(|b| b.table_id == table.id && b.overlaps(start, end))
    })
}

async fn find_table(
    store: &dyn BookingStore,
    restaurant: &Restaurant,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    party_size: u32,
) -> Result<Option<Table>> {
    // Same checks as first_available_table; here they only avoid the store round-trip.
    if party_size == 0 || !restaurant.is_open_for(start, end) {
        debug!(%start, %end, party_size, "request cannot be seated");
        return Ok(None);
    }
    let tables = store.tables(restaurant.id).await?;
    let bookings = store.bookings_between(restaurant.id, start, end).await?;
    let table = first_available_table(restaurant, &tables, &bookings, start, end, party_size);
    debug!(
        tables = tables.len(),
        bookings = bookings.len(),
        table_id = table.map(|t| t.id),
        "availability checked"
    );
    Ok(table.cloned())
}

#[instrument(skip_all, fields(restaurant_id = restaurant.id, party_size = party_size))]
pub async fn get_first_table_available(
    store: &dyn BookingStore,
    restaurant: &Restaurant,
    requested_start: DateTime<Utc>,
    party_size: u32,
    slot_minutes: Option<i64>,
) -> Result<Option<Table>> {
    let Some((start, end)) = requested_interval(requested_start, slot_minutes) else {
        debug!(?slot_minutes, "slot length cannot be served");
        return Ok(None);
    };
    find_table(store, restaurant, start, end, party_size).await
}

#[instrument(skip_all, fields(restaurant_id = restaurant.id, party_size = party_size))]
pub async fn book_restaurant_table(
    store: &dyn BookingStore,
    restaurant: &Restaurant,
    requested_start: DateTime<Utc>,
    party_size: u32,
    slot_minutes: Option<i64>,
) -> Result<BookingConfirmation, BookingError> {
    let (start_at, end_at) =
        requested_interval(requested_start, slot_minutes).ok_or(BookingError::Unavailable)?;
    let table = find_table(store, restaurant, start_at, end_at, party_size)
        .await?
        .ok_or(BookingError::Unavailable)?;

    let booking = store
        .insert_booking(&NewBooking {
            table_id: table.id,
            people: party_size,
            start_at,
            end_at,
        })
        .await?;
    info!(booking_id = booking.id, table_id = table.id, %start_at, "table booked");

    Ok(BookingConfirmation {
        booking: booking.id,
        restaurant: restaurant.id,
        table: table.id,
        people: booking.people,
        start_at: booking.start_at,
        end_at: booking.end_at,
    })
}

/// Bookings of the restaurant that start on `day`, ordered by start then table.
#[instrument(skip_all, fields(restaurant_id = restaurant.id, day = %day))]
pub async fn list_day_bookings(
    store: &dyn BookingStore,
    restaurant: &Restaurant,
    day: NaiveDate,
) -> Result<Vec<Booking>> {
    let Some(from) = day.and_hms_opt(0, 0, 0).map(|t| t.and_utc()) else {
        return Ok(Vec::new());
    };
    let Some(to) = from.checked_add_signed(Duration::days(1)) else {
        return Ok(Vec::new());
    };
    let mut bookings: Vec<Booking> = store
        .bookings_between(restaurant.id, from, to)
        .await?
        .into_iter()
        .filter(|b| b.start_at.date_naive() == day)
        .collect();
    bookings.sort_by_key(|b| (b.start_at, b.table_id));
    Ok(bookings)
}

/// Headcount for `day`: the party sizes of every booking starting that day.
pub async fn get_expected_diners(
    store: &dyn BookingStore,
    restaurant: &Restaurant,
    day: NaiveDate,
) -> Result<u64> {
    let bookings = list_day_bookings(store, restaurant, day).await?;
    Ok(bookings.iter().map(|b| u64::from(b.people)).sum())
}
