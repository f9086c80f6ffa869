pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;

pub use config::{Config, SessionConfig};
pub use error::{AppError, AppResult};
pub use models::{Direction, Item, ItemId, SessionIdentity};
pub use session::{DecisionOutcome, RefillOutcome, Session, SessionView};
