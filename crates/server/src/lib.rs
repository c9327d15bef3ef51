pub mod routes;
pub mod startup;
pub mod errors;

pub use routes::{build_router, AppState};
pub use startup::{run_with_config, serve, shutdown_signal};
