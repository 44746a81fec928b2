use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    /// Hour of the day (UTC) the restaurant opens, `0..24`.
    pub opening_hour: u32,
    /// Hour of the day (UTC) the restaurant closes, `opening_hour + 1..=24`.
    pub closing_hour: u32,
}

impl Restaurant {
    /// Opening and closing instants on `day`. A closing hour of 24 is midnight
    /// at the end of that day.
    pub fn opening_window(&self, day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let midnight = day.and_hms_opt(0, 0, 0)?.and_utc();
        let open = midnight.checked_add_signed(Duration::hours(i64::from(self.opening_hour)))?;
        let close = midnight.checked_add_signed(Duration::hours(i64::from(self.closing_hour)))?;
        Some((open, close))
    }

    /// Whether `[start, end)` lies inside the opening hours of the day `start` falls on.
    pub fn is_open_for(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match self.opening_window(start.date_naive()) {
            Some((open, close)) => open <= start && end <= close,
            None => false,
        }
    }
}

pub fn valid_hours(opening_hour: u32, closing_hour: u32) -> bool {
    opening_hour < 24 && opening_hour < closing_hour && closing_hour <= 24
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    pub id: i64,
    pub restaurant_id: i64,
    pub capacity: u32,
}

impl Table {
    pub fn fits(&self, party_size: u32) -> bool {
        self.capacity >= party_size
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: i64,
    pub table_id: i64,
    pub people: u32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Booking {
    /// Half-open overlap: bookings that only touch at an edge do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_at < end && start < self.end_at
    }
}

/// A booking that has been assigned a table but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub table_id: i64,
    pub people: u32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Returned to the caller once a booking has been stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingConfirmation {
    pub booking: i64,
    pub restaurant: i64,
    pub table: i64,
    pub people: u32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}
