pub mod api;
pub mod catalog;
pub mod core;
pub mod progression;

pub use crate::core::{
    SimulationKind, SimulationOutcome, SimulationParameters, ValidationError, compute_simulation,
};
pub use catalog::{Catalog, CatalogError};
pub use progression::{
    CompletionEvent, ProgressionError, ProgressionEvent, ProgressionState, apply_completion,
};
