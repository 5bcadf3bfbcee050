// Simulated providers standing in for real flight, hotel, car-rental and payment backends.
// Randomness and latency come from SimulationConfig so runs can be seeded and made instant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::ConfigError;
use crate::providers::{
    CarRentalProvider, ConfirmationCode, FlightProvider, HotelProvider, PaymentProcessor,
    ProviderError, ResourceKind, ResourceProviders,
};
use crate::trip::{DateRange, Money, Route, StayDuration};

// Price = base + per_day * days + uniform jitter in whole cents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingModel {
    pub base: Money,
    pub per_day: Money,
    pub jitter: Money,
}

impl PricingModel {
    fn price(&self, days: u32, rng: &mut StdRng) -> Money {
        let jitter_cents = (self.jitter * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .unwrap_or(0)
            .max(0);
        let jitter = Money::new(rng.gen_range(0..=jitter_cents), 2);
        (self.base + self.per_day * Money::from(days) + jitter).round_dp(2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSimulation {
    // Probability in [0, 1] that an availability check succeeds.
    pub availability: f64,
    pub pricing: PricingModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub flight_reserve_ms: u64,
    pub hotel_reserve_ms: u64,
    pub car_reserve_ms: u64,
    pub payment_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            flight_reserve_ms: 0,
            hotel_reserve_ms: 1000,
            car_reserve_ms: 1000,
            payment_ms: 1000,
        }
    }
}

impl LatencyConfig {
    pub fn none() -> Self {
        Self {
            flight_reserve_ms: 0,
            hotel_reserve_ms: 0,
            car_reserve_ms: 0,
            payment_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
    pub flight: ResourceSimulation,
    pub hotel: ResourceSimulation,
    pub car: ResourceSimulation,
    pub payment_approval: f64,
    pub latency: LatencyConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            flight: ResourceSimulation {
                availability: 0.9,
                pricing: PricingModel {
                    base: Money::new(300, 0),
                    per_day: Money::ZERO,
                    jitter: Money::new(500, 0),
                },
            },
            hotel: ResourceSimulation {
                availability: 0.85,
                pricing: PricingModel {
                    base: Money::ZERO,
                    per_day: Money::new(200, 0),
                    jitter: Money::new(300, 0),
                },
            },
            car: ResourceSimulation {
                availability: 0.8,
                pricing: PricingModel {
                    base: Money::new(40, 0),
                    per_day: Money::new(12, 0),
                    jitter: Money::new(200, 0),
                },
            },
            payment_approval: 0.95,
            latency: LatencyConfig::default(),
        }
    }
}

impl SimulationConfig {
    // Default odds and prices with every delay removed.
    pub fn instant() -> Self {
        Self {
            latency: LatencyConfig::none(),
            ..Default::default()
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    // NaN fails the range check too, so gen_bool never sees it
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("simulation.flight.availability", self.flight.availability)?;
        check_probability("simulation.hotel.availability", self.hotel.availability)?;
        check_probability("simulation.car.availability", self.car.availability)?;
        check_probability("simulation.payment_approval", self.payment_approval)?;
        check_pricing("simulation.flight.pricing", &self.flight.pricing)?;
        check_pricing("simulation.hotel.pricing", &self.hotel.pricing)?;
        check_pricing("simulation.car.pricing", &self.car.pricing)?;
        Ok(())
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("probability must be within [0, 1], got {}", value),
        });
    }
    Ok(())
}

fn check_pricing(field: &'static str, pricing: &PricingModel) -> Result<(), ConfigError> {
    let amounts = [pricing.base, pricing.per_day, pricing.jitter];
    if amounts.iter().any(|amount| amount.is_sign_negative()) {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "prices cannot be negative".into(),
        });
    }
    Ok(())
}

// Shared random source. One lock guards the generator so a seeded run replays exactly.
pub struct SimulationSource {
    rng: Mutex<StdRng>,
}

impl SimulationSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn chance(&self, probability: f64) -> bool {
        self.rng.lock().gen_bool(probability)
    }

    fn price(&self, model: &PricingModel, days: u32) -> Money {
        model.price(days, &mut self.rng.lock())
    }

    fn code_number(&self) -> u32 {
        self.rng.lock().gen_range(1000..=9999)
    }
}

async fn simulate_latency(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationRecord {
    pub resource: ResourceKind,
    pub location: String,
    pub dates: DateRange,
    pub reserved_at: DateTime<Utc>,
}

// Every reservation the simulated providers have issued, keyed by confirmation code.
#[derive(Default)]
pub struct ReservationLedger {
    records: DashMap<ConfirmationCode, ReservationRecord>,
}

impl ReservationLedger {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, code: &ConfirmationCode) -> Option<ReservationRecord> {
        self.records.get(code).map(|r| r.value().clone())
    }

    pub fn count(&self, resource: ResourceKind) -> usize {
        self.records
            .iter()
            .filter(|r| r.value().resource == resource)
            .count()
    }

    // Draws codes until one is free; codes stay unique within a ledger
    fn issue(
        &self,
        source: &SimulationSource,
        prefix: &str,
        record: ReservationRecord,
    ) -> Result<ConfirmationCode, ProviderError> {
        const MAX_ATTEMPTS: usize = 64;
        for _ in 0..MAX_ATTEMPTS {
            let code = ConfirmationCode::new(format!("{}{}", prefix, source.code_number()));
            if let Entry::Vacant(slot) = self.records.entry(code.clone()) {
                slot.insert(record);
                return Ok(code);
            }
        }
        Err(ProviderError::Rejected(format!(
            "no free {} confirmation codes",
            record.resource
        )))
    }
}

struct Shared {
    config: SimulationConfig,
    source: SimulationSource,
    ledger: Arc<ReservationLedger>,
}

impl Shared {
    fn record(&self, resource: ResourceKind, location: &str, dates: &DateRange) -> ReservationRecord {
        ReservationRecord {
            resource,
            location: location.to_string(),
            dates: *dates,
            reserved_at: Utc::now(),
        }
    }
}

pub struct SimulatedFlights {
    shared: Arc<Shared>,
}

#[async_trait]
impl FlightProvider for SimulatedFlights {
    async fn check_availability(
        &self,
        route: &Route<'_>,
        dates: &DateRange,
    ) -> Result<bool, ProviderError> {
        let available = self.shared.source.chance(self.shared.config.flight.availability);
        debug!(%route, %dates, available, "flight availability");
        Ok(available)
    }

    async fn reserve(
        &self,
        route: &Route<'_>,
        dates: &DateRange,
    ) -> Result<ConfirmationCode, ProviderError> {
        simulate_latency(self.shared.config.latency.flight_reserve_ms).await;
        let record = self
            .shared
            .record(ResourceKind::Flight, &route.to_string(), dates);
        self.shared
            .ledger
            .issue(&self.shared.source, "FLT", record)
    }

    async fn quote_price(&self, route: &Route<'_>) -> Result<Money, ProviderError> {
        let price = self.shared.source.price(&self.shared.config.flight.pricing, 0);
        debug!(%route, %price, "flight quote");
        Ok(price)
    }
}

pub struct SimulatedHotels {
    shared: Arc<Shared>,
}

#[async_trait]
impl HotelProvider for SimulatedHotels {
    async fn check_availability(
        &self,
        location: &str,
        dates: &DateRange,
    ) -> Result<bool, ProviderError> {
        let available = self.shared.source.chance(self.shared.config.hotel.availability);
        debug!(location, %dates, available, "hotel availability");
        Ok(available)
    }

    async fn reserve(
        &self,
        location: &str,
        dates: &DateRange,
    ) -> Result<ConfirmationCode, ProviderError> {
        simulate_latency(self.shared.config.latency.hotel_reserve_ms).await;
        let record = self.shared.record(ResourceKind::Hotel, location, dates);
        self.shared
            .ledger
            .issue(&self.shared.source, "HTL", record)
    }

    async fn quote_price(
        &self,
        location: &str,
        stay: StayDuration,
    ) -> Result<Money, ProviderError> {
        let price = self
            .shared
            .source
            .price(&self.shared.config.hotel.pricing, stay.days());
        debug!(location, %stay, %price, "hotel quote");
        Ok(price)
    }
}

pub struct SimulatedCars {
    shared: Arc<Shared>,
}

#[async_trait]
impl CarRentalProvider for SimulatedCars {
    async fn check_availability(
        &self,
        location: &str,
        dates: &DateRange,
    ) -> Result<bool, ProviderError> {
        let available = self.shared.source.chance(self.shared.config.car.availability);
        debug!(location, %dates, available, "car availability");
        Ok(available)
    }

    async fn reserve(
        &self,
        location: &str,
        dates: &DateRange,
    ) -> Result<ConfirmationCode, ProviderError> {
        simulate_latency(self.shared.config.latency.car_reserve_ms).await;
        let record = self.shared.record(ResourceKind::Car, location, dates);
        self.shared
            .ledger
            .issue(&self.shared.source, "CAR", record)
    }

    async fn quote_price(
        &self,
        location: &str,
        stay: StayDuration,
    ) -> Result<Money, ProviderError> {
        let price = self
            .shared
            .source
            .price(&self.shared.config.car.pricing, stay.days());
        debug!(location, %stay, %price, "car rental quote");
        Ok(price)
    }
}

pub struct SimulatedPayments {
    shared: Arc<Shared>,
    charges: Mutex<Vec<Money>>,
}

impl SimulatedPayments {
    // Amounts that were approved, in settlement order.
    pub fn charges(&self) -> Vec<Money> {
        self.charges.lock().clone()
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedPayments {
    async fn settle(&self, amount: Money) -> Result<bool, ProviderError> {
        simulate_latency(self.shared.config.latency.payment_ms).await;
        let approved = self.shared.source.chance(self.shared.config.payment_approval);
        if approved {
            self.charges.lock().push(amount);
        }
        debug!(%amount, approved, "payment settlement");
        Ok(approved)
    }
}

// All four simulated backends sharing one random source and one reservation ledger.
pub struct SimulatedSuite {
    pub flights: Arc<SimulatedFlights>,
    pub hotels: Arc<SimulatedHotels>,
    pub cars: Arc<SimulatedCars>,
    pub payments: Arc<SimulatedPayments>,
    ledger: Arc<ReservationLedger>,
}

impl SimulatedSuite {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let ledger = Arc::new(ReservationLedger::default());
        let shared = Arc::new(Shared {
            source: SimulationSource::new(config.seed),
            config,
            ledger: ledger.clone(),
        });

        Ok(Self {
            flights: Arc::new(SimulatedFlights {
                shared: shared.clone(),
            }),
            hotels: Arc::new(SimulatedHotels {
                shared: shared.clone(),
            }),
            cars: Arc::new(SimulatedCars {
                shared: shared.clone(),
            }),
            payments: Arc::new(SimulatedPayments {
                shared,
                charges: Mutex::new(Vec::new()),
            }),
            ledger,
        })
    }

    pub fn resources(&self) -> ResourceProviders {
        ResourceProviders::new(
            self.flights.clone(),
            self.hotels.clone(),
            self.cars.clone(),
        )
    }

    pub fn payment(&self) -> Arc<dyn PaymentProcessor> {
        self.payments.clone()
    }

    pub fn ledger(&self) -> &ReservationLedger {
        &self.ledger
    }
}
