pub mod bridge;
pub mod config;
pub mod console;
pub mod error;
pub mod kernel;
pub mod logging;
pub mod persistence;
pub mod planner;
pub mod robot;
pub mod vision;

// Re-export specific items if needed for convenient access
pub use config::Config;
pub use kernel::action::Action;
pub use kernel::event::Telemetry;
pub use kernel::reactor::Reactor;
pub use kernel::state::SessionContext;
