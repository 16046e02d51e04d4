// Vendpay - vending-machine payments on an Algorand-style chain

pub mod config;
pub mod models;
pub mod chain;     // Addresses, transactions and the algod client
pub mod wallet;    // Connected account and signing capability
pub mod machines;  // Machine directory (HTTP and static catalog)
pub mod payment;   // Keypad, unit conversion and the submission workflow
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::{AppState, MachineRecord};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
