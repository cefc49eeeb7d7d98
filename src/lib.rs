pub mod common;
pub mod config;
pub mod coordinator;
pub mod director;
pub mod error;
pub mod input;
pub mod snapshot;

pub use crate::config::Settings;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use director::{Director, TickReport};
pub use error::{AppError, ConfigError, InjectorError, SnapshotError};
pub use input::{InputInjector, MovementIntent};
