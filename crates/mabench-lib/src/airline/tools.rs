//! Airline operations and their typed arguments.

use super::db::{AirlineDb, BookingStatus, Cabin, FlightStatus, MAX_BAGS};
use crate::backend::{ToolKind, ToolRegistry};
use crate::error::{DomainError, RegistryError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Fee per checked bag beyond the membership allowance.
pub const BAG_FEE: u32 = 35;

/// Operation names of the airline domain.
pub mod names {
    pub const GET_PASSENGER_DETAILS: &str = "get_passenger_details";
    pub const SEARCH_FLIGHTS: &str = "search_flights";
    pub const GET_FLIGHT_STATUS: &str = "get_flight_status";
    pub const GET_BOOKING_DETAILS: &str = "get_booking_details";
    pub const BOOK_FLIGHT: &str = "book_flight";
    pub const CANCEL_BOOKING: &str = "cancel_booking";
    pub const UPDATE_BAGGAGE: &str = "update_baggage";
    pub const THINK: &str = "think";
    pub const TRANSFER_TO_HUMAN_AGENTS: &str = "transfer_to_human_agents";
}

#[derive(Debug, Deserialize)]
pub struct PassengerArgs {
    pub passenger_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct SearchFlightsArgs {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FlightArgs {
    pub flight: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingArgs {
    pub booking_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BookFlightArgs {
    pub passenger_id: u64,
    pub flight: String,
    #[serde(default)]
    pub cabin: Cabin,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBaggageArgs {
    pub booking_id: String,
    pub bags: u32,
}

#[derive(Debug, Deserialize)]
pub struct ThinkArgs {
    pub thought: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferArgs {
    pub summary: String,
}

/// Build the closed registry of airline operations.
pub fn registry() -> Result<ToolRegistry<AirlineDb>, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            names::GET_PASSENGER_DETAILS,
            ToolKind::Read,
            "Get a passenger profile and their bookings.",
            get_passenger_details,
        )?
        .register(
            names::SEARCH_FLIGHTS,
            ToolKind::Read,
            "Search direct flights between two airports, optionally on a date.",
            search_flights,
        )?
        .register(
            names::GET_FLIGHT_STATUS,
            ToolKind::Read,
            "Get the status and remaining seats of a flight.",
            get_flight_status,
        )?
        .register(
            names::GET_BOOKING_DETAILS,
            ToolKind::Read,
            "Get the details of a booking.",
            get_booking_details,
        )?
        .register(
            names::BOOK_FLIGHT,
            ToolKind::Write,
            "Book a seat on a flight for a passenger.",
            book_flight,
        )?
        .register(
            names::CANCEL_BOOKING,
            ToolKind::Write,
            "Cancel a confirmed booking and release its seat.",
            cancel_booking,
        )?
        .register(
            names::UPDATE_BAGGAGE,
            ToolKind::Write,
            "Set the number of checked bags on a booking.",
            update_baggage,
        )?
        .register(
            names::THINK,
            ToolKind::Read,
            "Reason about the conversation. Does not change anything.",
            |_: &mut AirlineDb, _: ThinkArgs| Ok(json!("")),
        )?
        .register(
            names::TRANSFER_TO_HUMAN_AGENTS,
            ToolKind::Terminal,
            "Hand the conversation over to a human agent. Ends the session.",
            |_: &mut AirlineDb, args: TransferArgs| {
                debug!(summary = %args.summary, "Transferring to human agents");
                Ok(json!("Transfer successful"))
            },
        )?;
    Ok(registry)
}

fn get_passenger_details(db: &mut AirlineDb, args: PassengerArgs) -> Result<Value, DomainError> {
    let passenger = db.passenger(args.passenger_id)?;
    let bookings: Vec<&str> = db
        .bookings
        .iter()
        .filter(|b| b.passenger_id == passenger.id)
        .map(|b| b.id.as_str())
        .collect();
    Ok(json!({
        "passenger_id": passenger.id,
        "name": passenger.name,
        "email": passenger.email,
        "membership": passenger.membership,
        "bookings": bookings,
    }))
}

fn search_flights(db: &mut AirlineDb, args: SearchFlightsArgs) -> Result<Value, DomainError> {
    let flights: Vec<Value> = db
        .flights
        .iter()
        .filter(|f| f.origin.eq_ignore_ascii_case(&args.origin))
        .filter(|f| f.destination.eq_ignore_ascii_case(&args.destination))
        .filter(|f| args.date.as_deref().map_or(true, |date| f.date == date))
        .map(|f| {
            json!({
                "flight": f.number,
                "date": f.date,
                "status": f.status,
                "seats_available": f.seats_available,
                "price": f.price,
            })
        })
        .collect();
    Ok(Value::Array(flights))
}

fn get_flight_status(db: &mut AirlineDb, args: FlightArgs) -> Result<Value, DomainError> {
    let flight = db.flight(&args.flight)?;
    Ok(json!({
        "flight": flight.number,
        "status": flight.status,
        "seats_available": flight.seats_available,
    }))
}

fn get_booking_details(db: &mut AirlineDb, args: BookingArgs) -> Result<Value, DomainError> {
    let booking = db.booking(&args.booking_id)?;
    serde_json::to_value(booking).map_err(|e| DomainError::new(e.to_string()))
}

fn book_flight(db: &mut AirlineDb, args: BookFlightArgs) -> Result<Value, DomainError> {
    // All checks happen before the first write.
    let passenger_id = db.passenger(args.passenger_id)?.id;
    let flight = db.flight(&args.flight)?;
    if !flight.status.is_bookable() {
        return Err(DomainError::new(format!(
            "flight {} is {} and cannot be booked",
            flight.number, flight.status
        )));
    }
    if flight.seats_available == 0 {
        return Err(DomainError::new(format!(
            "no seats left on flight {}",
            flight.number
        )));
    }
    let number = flight.number.clone();
    if db.bookings.iter().any(|b| {
        b.passenger_id == passenger_id
            && b.flight.eq_ignore_ascii_case(&number)
            && b.status == BookingStatus::Confirmed
    }) {
        return Err(DomainError::new(format!(
            "passenger {passenger_id} already has a booking on flight {number}"
        )));
    }

    let id = db.allocate_booking_id()?;
    db.flight_mut(&number)?.seats_available -= 1;
    db.bookings.push(super::db::Booking {
        id: id.clone(),
        passenger_id,
        flight: number.clone(),
        cabin: args.cabin,
        bags: 0,
        status: BookingStatus::Confirmed,
    });
    debug!(booking_id = %id, flight = %number, passenger_id, "Booked flight");

    Ok(json!({
        "booking_id": id,
        "status": "confirmed",
        "passenger_id": passenger_id,
        "flight": number,
        "cabin": args.cabin,
    }))
}

fn cancel_booking(db: &mut AirlineDb, args: BookingArgs) -> Result<Value, DomainError> {
    let booking = db.booking(&args.booking_id)?;
    if booking.status == BookingStatus::Cancelled {
        return Err(DomainError::new(format!(
            "booking {} is already cancelled",
            booking.id
        )));
    }
    let number = booking.flight.clone();
    if db.flight(&number)?.status == FlightStatus::Landed {
        return Err(DomainError::new(format!(
            "flight {number} has landed; booking {} cannot be cancelled",
            args.booking_id
        )));
    }

    db.booking_mut(&args.booking_id)?.status = BookingStatus::Cancelled;
    db.flight_mut(&number)?.seats_available += 1;
    debug!(booking_id = %args.booking_id, "Cancelled booking");

    Ok(json!({
        "booking_id": args.booking_id,
        "status": "cancelled",
    }))
}

fn update_baggage(db: &mut AirlineDb, args: UpdateBaggageArgs) -> Result<Value, DomainError> {
    let booking = db.booking(&args.booking_id)?;
    if booking.status != BookingStatus::Confirmed {
        return Err(DomainError::new(format!(
            "booking {} is not active",
            booking.id
        )));
    }
    if args.bags > MAX_BAGS {
        return Err(DomainError::new(format!(
            "at most {MAX_BAGS} bags are allowed per booking"
        )));
    }
    let free = db.passenger(booking.passenger_id)?.membership.free_bags();
    let fee = args.bags.saturating_sub(free) * BAG_FEE;

    db.booking_mut(&args.booking_id)?.bags = args.bags;

    Ok(json!({
        "booking_id": args.booking_id,
        "bags": args.bags,
        "fee": fee,
    }))
}
