pub mod availability;
pub mod error;
pub mod resolver;

pub use availability::{ensure_provider_availability, ModeDecision};
pub use error::ModeError;
pub use resolver::{resolve, select_mode, selection_reason, ModeSelection, QueryCategory};
