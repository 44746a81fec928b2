use super::repo::{self, Pool};
use crate::booking::BookingStore;
use crate::model::{Booking, NewBooking, Table};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl BookingStore for Pool {
    async fn tables(&self, restaurant_id: i64) -> Result<Vec<Table>> {
        repo::list_tables(self, restaurant_id).await
    }

    async fn bookings_between(
        &self,
        restaurant_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        repo::bookings_between(self, restaurant_id, from, to).await
    }

    async fn insert_booking(&self, booking: &NewBooking) -> Result<Booking> {
        repo::insert_booking(self, booking).await
    }
}
