// Capability contracts for the flight, hotel and car-rental providers and the payment processor.
// The orchestration core only ever sees these traits, never a concrete provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::trip::{DateRange, Money, Route, StayDuration};

// Faults raised by a provider. "Not available" is never a fault, it is `Ok(false)`.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("provider rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Flight,
    Hotel,
    Car,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Flight => "flight",
            ResourceKind::Hotel => "hotel",
            ResourceKind::Car => "car",
        };
        f.write_str(name)
    }
}

// Opaque identifier proving a reservation was made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationCode(String);

impl ConfirmationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait FlightProvider: Send + Sync + 'static {
    // Pure query, no side effects
    async fn check_availability(
        &self,
        route: &Route<'_>,
        dates: &DateRange,
    ) -> Result<bool, ProviderError>;

    // Only called after check_availability returned true
    async fn reserve(
        &self,
        route: &Route<'_>,
        dates: &DateRange,
    ) -> Result<ConfirmationCode, ProviderError>;

    // Depends on the route only
    async fn quote_price(&self, route: &Route<'_>) -> Result<Money, ProviderError>;
}

#[async_trait]
pub trait HotelProvider: Send + Sync + 'static {
    async fn check_availability(
        &self,
        location: &str,
        dates: &DateRange,
    ) -> Result<bool, ProviderError>;

    async fn reserve(
        &self,
        location: &str,
        dates: &DateRange,
    ) -> Result<ConfirmationCode, ProviderError>;

    async fn quote_price(&self, location: &str, stay: StayDuration)
        -> Result<Money, ProviderError>;
}

#[async_trait]
pub trait CarRentalProvider: Send + Sync + 'static {
    async fn check_availability(
        &self,
        location: &str,
        dates: &DateRange,
    ) -> Result<bool, ProviderError>;

    async fn reserve(
        &self,
        location: &str,
        dates: &DateRange,
    ) -> Result<ConfirmationCode, ProviderError>;

    async fn quote_price(&self, location: &str, stay: StayDuration)
        -> Result<Money, ProviderError>;
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync + 'static {
    // true = settled, false = declined. No partial payment, no retry.
    async fn settle(&self, amount: Money) -> Result<bool, ProviderError>;
}

// The three resource providers a trip is assembled from.
#[derive(Clone)]
pub struct ResourceProviders {
    pub flights: Arc<dyn FlightProvider>,
    pub hotels: Arc<dyn HotelProvider>,
    pub cars: Arc<dyn CarRentalProvider>,
}

impl ResourceProviders {
    pub fn new(
        flights: Arc<dyn FlightProvider>,
        hotels: Arc<dyn HotelProvider>,
        cars: Arc<dyn CarRentalProvider>,
    ) -> Self {
        Self {
            flights,
            hotels,
            cars,
        }
    }
}

impl fmt::Debug for ResourceProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceProviders").finish_non_exhaustive()
    }
}

// Deterministic test doubles shared by the orchestrator and estimator tests
#[cfg(test)]
pub mod mock_providers {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockFault {
        None,
        OnCheck,
        OnReserve,
        OnQuote,
        PanicOnReserve,
    }

    // Implements all three resource contracts with a fixed price and call counters.
    pub struct MockResource {
        prefix: &'static str,
        price: Money,
        available: AtomicBool,
        fault: Mutex<MockFault>,
        pub checks: AtomicUsize,
        pub reserves: AtomicUsize,
        pub quotes: AtomicUsize,
    }

    impl MockResource {
        pub fn new(prefix: &'static str, price: Money) -> Self {
            Self {
                prefix,
                price,
                available: AtomicBool::new(true),
                fault: Mutex::new(MockFault::None),
                checks: AtomicUsize::new(0),
                reserves: AtomicUsize::new(0),
                quotes: AtomicUsize::new(0),
            }
        }

        pub fn set_available(&self, available: bool) {
            self.available.store(available, Ordering::SeqCst);
        }

        pub fn set_fault(&self, fault: MockFault) {
            *self.fault.lock() = fault;
        }

        pub fn calls(&self) -> usize {
            self.checks.load(Ordering::SeqCst)
                + self.reserves.load(Ordering::SeqCst)
                + self.quotes.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<bool, ProviderError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            if *self.fault.lock() == MockFault::OnCheck {
                return Err(ProviderError::Unreachable(format!("{} backend down", self.prefix)));
            }
            Ok(self.available.load(Ordering::SeqCst))
        }

        fn book(&self) -> Result<ConfirmationCode, ProviderError> {
            let n = self.reserves.fetch_add(1, Ordering::SeqCst);
            match *self.fault.lock() {
                MockFault::OnReserve => {
                    return Err(ProviderError::Timeout {
                        operation: "reservation",
                    })
                }
                MockFault::PanicOnReserve => panic!("{} reservation exploded", self.prefix),
                _ => {}
            }
            Ok(ConfirmationCode::new(format!("{}{:04}", self.prefix, 1000 + n)))
        }

        fn quote(&self) -> Result<Money, ProviderError> {
            self.quotes.fetch_add(1, Ordering::SeqCst);
            if *self.fault.lock() == MockFault::OnQuote {
                return Err(ProviderError::Other(anyhow::anyhow!("pricing engine failure")));
            }
            Ok(self.price)
        }
    }

    #[async_trait]
    impl FlightProvider for MockResource {
        async fn check_availability(
            &self,
            _route: &Route<'_>,
            _dates: &DateRange,
        ) -> Result<bool, ProviderError> {
            self.check()
        }

        async fn reserve(
            &self,
            _route: &Route<'_>,
            _dates: &DateRange,
        ) -> Result<ConfirmationCode, ProviderError> {
            self.book()
        }

        async fn quote_price(&self, _route: &Route<'_>) -> Result<Money, ProviderError> {
            self.quote()
        }
    }

    #[async_trait]
    impl HotelProvider for MockResource {
        async fn check_availability(
            &self,
            _location: &str,
            _dates: &DateRange,
        ) -> Result<bool, ProviderError> {
            self.check()
        }

        async fn reserve(
            &self,
            _location: &str,
            _dates: &DateRange,
        ) -> Result<ConfirmationCode, ProviderError> {
            self.book()
        }

        async fn quote_price(
            &self,
            _location: &str,
            _stay: StayDuration,
        ) -> Result<Money, ProviderError> {
            self.quote()
        }
    }

    #[async_trait]
    impl CarRentalProvider for MockResource {
        async fn check_availability(
            &self,
            _location: &str,
            _dates: &DateRange,
        ) -> Result<bool, ProviderError> {
            self.check()
        }

        async fn reserve(
            &self,
            _location: &str,
            _dates: &DateRange,
        ) -> Result<ConfirmationCode, ProviderError> {
            self.book()
        }

        async fn quote_price(
            &self,
            _location: &str,
            _stay: StayDuration,
        ) -> Result<Money, ProviderError> {
            self.quote()
        }
    }

    pub struct MockPayment {
        approve: AtomicBool,
        fail: AtomicBool,
        pub settled: Mutex<Vec<Money>>,
    }

    impl MockPayment {
        pub fn new() -> Self {
            Self {
                approve: AtomicBool::new(true),
                fail: AtomicBool::new(false),
                settled: Mutex::new(Vec::new()),
            }
        }

        pub fn set_approve(&self, approve: bool) {
            self.approve.store(approve, Ordering::SeqCst);
        }

        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn calls(&self) -> usize {
            self.settled.lock().len()
        }
    }

    #[async_trait]
    impl PaymentProcessor for MockPayment {
        async fn settle(&self, amount: Money) -> Result<bool, ProviderError> {
            self.settled.lock().push(amount);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProviderError::Rejected("card network error".to_string()));
            }
            Ok(self.approve.load(Ordering::SeqCst))
        }
    }

    // Flight 500.00, hotel 1200.00, car 250.00, payment approving.
    pub struct MockSuite {
        pub flights: Arc<MockResource>,
        pub hotels: Arc<MockResource>,
        pub cars: Arc<MockResource>,
        pub payment: Arc<MockPayment>,
    }

    impl MockSuite {
        pub fn new() -> Self {
            Self {
                flights: Arc::new(MockResource::new("FLT", Money::new(50000, 2))),
                hotels: Arc::new(MockResource::new("HTL", Money::new(120000, 2))),
                cars: Arc::new(MockResource::new("CAR", Money::new(25000, 2))),
                payment: Arc::new(MockPayment::new()),
            }
        }

        pub fn resources(&self) -> ResourceProviders {
            ResourceProviders::new(
                self.flights.clone(),
                self.hotels.clone(),
                self.cars.clone(),
            )
        }

        pub fn reserves(&self) -> usize {
            self.flights.reserves.load(Ordering::SeqCst)
                + self.hotels.reserves.load(Ordering::SeqCst)
                + self.cars.reserves.load(Ordering::SeqCst)
        }
    }
}
