pub mod registry;
pub mod traits;

// Market data implementations
pub mod coingecko;
pub mod mock;
