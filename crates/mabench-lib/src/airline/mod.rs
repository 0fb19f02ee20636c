//! # Airline Domain
//!
//! A deterministic, in-memory airline backend: passengers, flights and
//! bookings, plus the closed set of operations a customer-service agent may
//! call against them. Every run gets its own [`AirlineDb`], loaded from the
//! task's `initial_state`.

pub mod db;
pub mod tools;

pub use db::{
    AirlineDb, Booking, BookingStatus, Cabin, Flight, FlightStatus, Membership, Passenger,
    MAX_BAGS,
};
pub use tools::{names, registry, BAG_FEE};

use crate::error::RegistryError;
use crate::task_env::Environment;
use std::sync::Arc;

/// Domain name tasks use to target this backend.
pub const DOMAIN: &str = "airline";

/// Create a fresh airline environment with its own empty database.
pub fn new_env(max_turns: u32) -> Result<Environment<AirlineDb>, RegistryError> {
    Ok(Environment::new(
        DOMAIN,
        AirlineDb::default(),
        Arc::new(registry()?),
        max_turns,
    ))
}
