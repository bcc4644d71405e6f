pub mod commands;
pub mod config;
pub mod controller;
pub mod facade;
pub mod persist;
pub mod reconcile;
pub mod state;
pub mod ticker;

pub use config::TimerConfig;
pub use controller::{TimerController, TimerEvent};
pub use facade::{SquareStatus, TimerSnapshot};
pub use state::{Phase, TimerState, TimerStatus};
