// Trip request and booking outcome records shared by the orchestrator and the estimator

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::orchestrator::BookingFailure;
use crate::providers::ConfirmationCode;

// Monetary amount. Always an exact decimal, never a float.
pub type Money = Decimal;

// Validation errors for a trip request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TripError {
    #[error("required field is blank: {0}")]
    BlankField(&'static str),

    #[error("departure {departure} must be before return {return_date}")]
    DatesOutOfOrder {
        departure: NaiveDate,
        return_date: NaiveDate,
    },
}

// What the caller wants booked. Read-only to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDate,
    pub return_date: NaiveDate,
    pub needs_hotel: bool,
    pub needs_car: bool,
}

impl TripRequest {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure: NaiveDate,
        return_date: NaiveDate,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure,
            return_date,
            needs_hotel: false,
            needs_car: false,
        }
    }

    pub fn with_hotel(mut self, needs_hotel: bool) -> Self {
        self.needs_hotel = needs_hotel;
        self
    }

    pub fn with_car(mut self, needs_car: bool) -> Self {
        self.needs_car = needs_car;
        self
    }

    // Checks the request before any provider is contacted.
    pub fn validate(&self) -> Result<(), TripError> {
        if self.origin.trim().is_empty() {
            return Err(TripError::BlankField("origin"));
        }
        if self.destination.trim().is_empty() {
            return Err(TripError::BlankField("destination"));
        }
        if self.departure >= self.return_date {
            return Err(TripError::DatesOutOfOrder {
                departure: self.departure,
                return_date: self.return_date,
            });
        }
        Ok(())
    }

    pub fn route(&self) -> Route<'_> {
        Route {
            origin: &self.origin,
            destination: &self.destination,
        }
    }

    pub fn dates(&self) -> DateRange {
        DateRange {
            start: self.departure,
            end: self.return_date,
        }
    }

    pub fn stay_duration(&self) -> StayDuration {
        self.dates().stay_duration()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
}

impl fmt::Display for Route<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn stay_duration(&self) -> StayDuration {
        StayDuration::between(self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// Whole days between departure and return, used to price both hotel and car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StayDuration(u32);

impl StayDuration {
    // Never less than one day; an inverted range is caught by `TripRequest::validate`.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        let days = (end - start).num_days().max(1);
        Self(u32::try_from(days).unwrap_or(u32::MAX))
    }

    pub fn from_days(days: u32) -> Self {
        Self(days.max(1))
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for StayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.0)
    }
}

// Result of one orchestration run, handed to the caller once the run completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookingOutcome {
    pub success: bool,
    pub message: String,
    pub failure: Option<BookingFailure>,
    pub flight_confirmation: Option<ConfirmationCode>,
    pub hotel_confirmation: Option<ConfirmationCode>,
    pub car_confirmation: Option<ConfirmationCode>,
    pub total_price: Money,
}

impl BookingOutcome {
    pub(crate) fn succeed(&mut self, total: Money) {
        self.success = true;
        self.message.clear();
        self.failure = None;
        self.total_price = total;
    }

    // Acquired codes stay; the total is zeroed so a failed run never implies a charge.
    pub(crate) fn fail(&mut self, failure: BookingFailure) {
        self.success = false;
        self.message = failure.to_string();
        self.failure = Some(failure);
        self.total_price = Money::ZERO;
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
