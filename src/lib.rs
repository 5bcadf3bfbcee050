// Trip booking coordinator: books flight, hotel and car rental and settles payment as one operation

pub mod config;
pub mod estimator;
pub mod orchestrator;
pub mod providers;
pub mod simulated;
pub mod trip;

// Re-export key types for convenience
pub use config::{ConfigError, CoordinatorConfig, EstimatorConfig, LoggingConfig};
pub use estimator::{EstimateError, EstimateMode, QuoteEstimator, TripQuote};
pub use orchestrator::{BookingFailure, BookingOrchestrator};
pub use providers::{
    CarRentalProvider, ConfirmationCode, FlightProvider, HotelProvider, PaymentProcessor,
    ProviderError, ResourceKind, ResourceProviders,
};
pub use simulated::{SimulatedSuite, SimulationConfig};
pub use trip::{BookingOutcome, DateRange, Money, Route, StayDuration, TripError, TripRequest};
