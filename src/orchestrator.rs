// Booking orchestrator: reserves flight, hotel and car in a fixed order, then settles payment.
//
// Steps run strictly one after another and the first failing step ends the run.
// Reservations made before a later failure are NOT cancelled: there is no compensation step.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::estimator::{EstimateMode, QuoteEstimator};
use crate::providers::{PaymentProcessor, ProviderError, ResourceProviders};
use crate::trip::{BookingOutcome, Money, TripError, TripRequest};

// Why an orchestration run ended without a booking. `Display` is the caller-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum BookingFailure {
    #[error("invalid trip request: {0}")]
    InvalidRequest(String),

    #[error("no flights available")]
    FlightUnavailable,

    #[error("no hotel rooms available for the given dates")]
    HotelUnavailable,

    #[error("no cars available for rental on the given dates")]
    CarUnavailable,

    #[error("payment processing failed")]
    PaymentDeclined,

    #[error("unexpected error during booking: {0}")]
    UnexpectedFault(String),
}

impl From<TripError> for BookingFailure {
    fn from(err: TripError) -> Self {
        BookingFailure::InvalidRequest(err.to_string())
    }
}

// Wraps a provider fault with the step it happened in
fn fault(step: &'static str) -> impl FnOnce(ProviderError) -> BookingFailure {
    move |err| {
        error!(step, error = %err, "provider fault during booking");
        BookingFailure::UnexpectedFault(format!("{} failed: {}", step, err))
    }
}

pub struct BookingOrchestrator {
    resources: ResourceProviders,
    payment: Arc<dyn PaymentProcessor>,
}

impl BookingOrchestrator {
    pub fn new(resources: ResourceProviders, payment: Arc<dyn PaymentProcessor>) -> Self {
        Self { resources, payment }
    }

    // A read-only estimator over the same resource providers. It cannot reach the payment processor.
    pub fn estimator(&self, mode: EstimateMode) -> QuoteEstimator {
        QuoteEstimator::new(self.resources.clone(), mode)
    }

    /// Runs one booking to completion. Never panics and never returns a raw fault:
    /// every failure, including a provider panic, is folded into the outcome.
    #[tracing::instrument(
        skip(self, request),
        fields(origin = %request.origin, destination = %request.destination)
    )]
    pub async fn book(&self, request: &TripRequest) -> BookingOutcome {
        info!(
            needs_hotel = request.needs_hotel,
            needs_car = request.needs_car,
            "starting trip booking"
        );

        let mut outcome = BookingOutcome::default();
        let mut running_total = Money::ZERO;

        let result = AssertUnwindSafe(self.run(request, &mut outcome, &mut running_total))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                info!(total = %running_total, "trip booked");
                outcome.succeed(running_total);
            }
            Ok(Err(failure)) => {
                warn!(%failure, accumulated = %running_total, "trip booking failed");
                outcome.fail(failure);
            }
            Err(_) => {
                error!(accumulated = %running_total, "provider panicked during booking");
                outcome.fail(BookingFailure::UnexpectedFault(
                    "a provider stopped responding".to_string(),
                ));
            }
        }

        outcome
    }

    async fn run(
        &self,
        request: &TripRequest,
        outcome: &mut BookingOutcome,
        total: &mut Money,
    ) -> Result<(), BookingFailure> {
        request.validate()?;

        let route = request.route();
        let dates = request.dates();

        // 1. Flight
        debug!(%route, %dates, "checking flight availability");
        let flights = &self.resources.flights;
        if !flights
            .check_availability(&route, &dates)
            .await
            .map_err(fault("flight availability check"))?
        {
            return Err(BookingFailure::FlightUnavailable);
        }
        let code = flights
            .reserve(&route, &dates)
            .await
            .map_err(fault("flight reservation"))?;
        info!(confirmation = %code, "flight reserved");
        outcome.flight_confirmation = Some(code);
        *total += flights
            .quote_price(&route)
            .await
            .map_err(fault("flight pricing"))?;

        // 2. Hotel
        if request.needs_hotel {
            let hotels = &self.resources.hotels;
            debug!(location = %request.destination, %dates, "checking hotel availability");
            if !hotels
                .check_availability(&request.destination, &dates)
                .await
                .map_err(fault("hotel availability check"))?
            {
                return Err(BookingFailure::HotelUnavailable);
            }
            let code = hotels
                .reserve(&request.destination, &dates)
                .await
                .map_err(fault("hotel reservation"))?;
            info!(confirmation = %code, "hotel reserved");
            outcome.hotel_confirmation = Some(code);
            let stay = request.stay_duration();
            *total += hotels
                .quote_price(&request.destination, stay)
                .await
                .map_err(fault("hotel pricing"))?;
        }

        // 3. Car
        if request.needs_car {
            let cars = &self.resources.cars;
            debug!(location = %request.destination, %dates, "checking car availability");
            if !cars
                .check_availability(&request.destination, &dates)
                .await
                .map_err(fault("car availability check"))?
            {
                return Err(BookingFailure::CarUnavailable);
            }
            let code = cars
                .reserve(&request.destination, &dates)
                .await
                .map_err(fault("car reservation"))?;
            info!(confirmation = %code, "car reserved");
            outcome.car_confirmation = Some(code);
            let stay = request.stay_duration();
            *total += cars
                .quote_price(&request.destination, stay)
                .await
                .map_err(fault("car rental pricing"))?;
        }

        // 4. Payment, only once every requested resource is held
        info!(amount = %total, "settling payment");
        if !self
            .payment
            .settle(*total)
            .await
            .map_err(fault("payment settlement"))?
        {
            return Err(BookingFailure::PaymentDeclined);
        }

        Ok(())
    }
}
