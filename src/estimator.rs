// Quote estimator: prices a trip without reserving anything or touching payment.
// Unavailable resources are left out of the estimate instead of failing it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::providers::{ProviderError, ResourceKind, ResourceProviders};
use crate::trip::{Money, StayDuration, TripError, TripRequest};

#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("invalid trip request: {0}")]
    InvalidRequest(#[from] TripError),

    #[error("{resource} provider failed while estimating: {source}")]
    Provider {
        resource: ResourceKind,
        #[source]
        source: ProviderError,
    },
}

// How the per-resource queries are issued. Both modes aggregate identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateMode {
    #[default]
    Sequential,
    Concurrent,
}

// Per-resource line items. `None` means not requested or not available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripQuote {
    pub flight: Option<Money>,
    pub hotel: Option<Money>,
    pub car: Option<Money>,
    pub stay: StayDuration,
}

impl TripQuote {
    pub fn total(&self) -> Money {
        [self.flight, self.hotel, self.car]
            .into_iter()
            .flatten()
            .sum()
    }
}

pub struct QuoteEstimator {
    resources: ResourceProviders,
    mode: EstimateMode,
}

impl QuoteEstimator {
    pub fn new(resources: ResourceProviders, mode: EstimateMode) -> Self {
        Self { resources, mode }
    }

    pub fn mode(&self) -> EstimateMode {
        self.mode
    }

    pub async fn estimate(&self, request: &TripRequest) -> Result<Money, EstimateError> {
        Ok(self.quote(request).await?.total())
    }

    #[tracing::instrument(
        skip(self, request),
        fields(origin = %request.origin, destination = %request.destination, mode = ?self.mode)
    )]
    pub async fn quote(&self, request: &TripRequest) -> Result<TripQuote, EstimateError> {
        request.validate()?;

        let (flight, hotel, car) = match self.mode {
            EstimateMode::Sequential => (
                self.flight_line(request).await?,
                self.hotel_line(request).await?,
                self.car_line(request).await?,
            ),
            EstimateMode::Concurrent => {
                let (flight, hotel, car) = futures::join!(
                    self.flight_line(request),
                    self.hotel_line(request),
                    self.car_line(request)
                );
                (flight?, hotel?, car?)
            }
        };

        let quote = TripQuote {
            flight,
            hotel,
            car,
            stay: request.stay_duration(),
        };
        info!(total = %quote.total(), "trip estimate ready");
        Ok(quote)
    }

    async fn flight_line(&self, request: &TripRequest) -> Result<Option<Money>, EstimateError> {
        let provider_err = |source| EstimateError::Provider {
            resource: ResourceKind::Flight,
            source,
        };
        let route = request.route();
        let flights = &self.resources.flights;

        if !flights
            .check_availability(&route, &request.dates())
            .await
            .map_err(provider_err)?
        {
            debug!(%route, "flight unavailable, left out of estimate");
            return Ok(None);
        }
        let price = flights.quote_price(&route).await.map_err(provider_err)?;
        debug!(%route, %price, "flight priced");
        Ok(Some(price))
    }

    async fn hotel_line(&self, request: &TripRequest) -> Result<Option<Money>, EstimateError> {
        if !request.needs_hotel {
            return Ok(None);
        }
        let provider_err = |source| EstimateError::Provider {
            resource: ResourceKind::Hotel,
            source,
        };
        let hotels = &self.resources.hotels;

        if !hotels
            .check_availability(&request.destination, &request.dates())
            .await
            .map_err(provider_err)?
        {
            debug!(location = %request.destination, "hotel unavailable, left out of estimate");
            return Ok(None);
        }
        let stay = request.stay_duration();
        let price = hotels
            .quote_price(&request.destination, stay)
            .await
            .map_err(provider_err)?;
        debug!(%stay, %price, "hotel priced");
        Ok(Some(price))
    }

    async fn car_line(&self, request: &TripRequest) -> Result<Option<Money>, EstimateError> {
        if !request.needs_car {
            return Ok(None);
        }
        let provider_err = |source| EstimateError::Provider {
            resource: ResourceKind::Car,
            source,
        };
        let cars = &self.resources.cars;

        if !cars
            .check_availability(&request.destination, &request.dates())
            .await
            .map_err(provider_err)?
        {
            debug!(location = %request.destination, "car unavailable, left out of estimate");
            return Ok(None);
        }
        let stay = request.stay_duration();
        let price = cars
            .quote_price(&request.destination, stay)
            .await
            .map_err(provider_err)?;
        debug!(%stay, %price, "car rental priced");
        Ok(Some(price))
    }
}
