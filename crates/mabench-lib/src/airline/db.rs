use crate::backend::StateStore;
use crate::error::{BackendError, DomainError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

/// Maximum checked bags on a single booking.
pub const MAX_BAGS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Membership {
    #[default]
    Regular,
    Silver,
    Gold,
}

impl Membership {
    /// Bags included free of charge for the membership tier.
    pub fn free_bags(&self) -> u32 {
        match self {
            Membership::Regular => 0,
            Membership::Silver => 1,
            Membership::Gold => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub membership: Membership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlightStatus {
    #[default]
    Available,
    Delayed,
    Cancelled,
    Landed,
}

impl FlightStatus {
    pub fn is_bookable(&self) -> bool {
        matches!(self, FlightStatus::Available | FlightStatus::Delayed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub number: String,
    pub origin: String,
    pub destination: String,
    /// Departure date, `YYYY-MM-DD`.
    pub date: String,
    #[serde(default)]
    pub status: FlightStatus,
    pub seats_available: u32,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Cabin {
    #[default]
    Economy,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub passenger_id: u64,
    pub flight: String,
    #[serde(default)]
    pub cabin: Cabin,
    #[serde(default)]
    pub bags: u32,
    #[serde(default)]
    pub status: BookingStatus,
}

/// In-memory airline database.
///
/// Collections are plain vectors so the snapshot keeps the authoring order
/// and two loads of the same seed are indistinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlineDb {
    #[serde(default)]
    pub passengers: Vec<Passenger>,
    #[serde(default)]
    pub flights: Vec<Flight>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    /// Sequence number of the next booking id.
    #[serde(default = "default_next_booking")]
    pub next_booking: u32,
}

fn default_next_booking() -> u32 {
    1
}

impl Default for AirlineDb {
    fn default() -> Self {
        Self {
            passengers: Vec::new(),
            flights: Vec::new(),
            bookings: Vec::new(),
            next_booking: default_next_booking(),
        }
    }
}

impl AirlineDb {
    pub fn passenger(&self, id: u64) -> Result<&Passenger, DomainError> {
        self.passengers
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::new(format!("passenger {id} not found")))
    }

    pub fn flight(&self, number: &str) -> Result<&Flight, DomainError> {
        self.flights
            .iter()
            .find(|f| f.number.eq_ignore_ascii_case(number))
            .ok_or_else(|| DomainError::new(format!("flight {number} not found")))
    }

    pub(crate) fn flight_mut(&mut self, number: &str) -> Result<&mut Flight, DomainError> {
        self.flights
            .iter_mut()
            .find(|f| f.number.eq_ignore_ascii_case(number))
            .ok_or_else(|| DomainError::new(format!("flight {number} not found")))
    }

    pub fn booking(&self, id: &str) -> Result<&Booking, DomainError> {
        self.bookings
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| DomainError::new(format!("booking {id} not found")))
    }

    pub(crate) fn booking_mut(&mut self, id: &str) -> Result<&mut Booking, DomainError> {
        self.bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| DomainError::new(format!("booking {id} not found")))
    }

    /// Allocate the next sequential booking id.
    pub(crate) fn allocate_booking_id(&mut self) -> Result<String, DomainError> {
        let next = self
            .next_booking
            .checked_add(1)
            .ok_or_else(|| DomainError::new("booking id sequence exhausted"))?;
        let id = format!("BK{:04}", self.next_booking);
        self.next_booking = next;
        Ok(id)
    }

    fn check_consistency(&self) -> Result<(), BackendError> {
        for booking in &self.bookings {
            if !self.passengers.iter().any(|p| p.id == booking.passenger_id) {
                return Err(BackendError::InvalidSnapshot(format!(
                    "booking {} references unknown passenger {}",
                    booking.id, booking.passenger_id
                )));
            }
            if !self
                .flights
                .iter()
                .any(|f| f.number.eq_ignore_ascii_case(&booking.flight))
            {
                return Err(BackendError::InvalidSnapshot(format!(
                    "booking {} references unknown flight {}",
                    booking.id, booking.flight
                )));
            }
        }
        Ok(())
    }
}

impl StateStore for AirlineDb {
    fn load(&mut self, snapshot: &Value) -> Result<(), BackendError> {
        let mut db = if snapshot.is_null() {
            AirlineDb::default()
        } else {
            serde_json::from_value::<AirlineDb>(snapshot.clone())
                .map_err(|e| BackendError::InvalidSnapshot(e.to_string()))?
        };
        db.check_consistency()?;
        let highest = db
            .bookings
            .iter()
            .filter_map(|b| b.id.strip_prefix("BK")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        let after_highest = highest.checked_add(1).ok_or_else(|| {
            BackendError::InvalidSnapshot(format!("booking id BK{highest} leaves no room to allocate"))
        })?;
        db.next_booking = db.next_booking.max(after_highest);
        *self = db;
        Ok(())
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
