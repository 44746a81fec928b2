//! View models returned by repositories.
//!
//! Keep these structs focused on the data returned by queries. Booking rules
//! live in `crate::booking`.

use crate::model::{Restaurant, Table};
use serde::Serialize;

/// A restaurant together with its table inventory, in table id order.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantWithTables {
    pub restaurant: Restaurant,
    pub tables: Vec<Table>,
}

impl RestaurantWithTables {
    pub fn total_seats(&self) -> u64 {
        self.tables.iter().map(|t| u64::from(t.capacity)).sum()
    }
}
