//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, StandCatalog, ChartRenderer)
//! but are themselves concrete structs, not traits.

mod tpa;

pub use tpa::{parse_stand_list, RunOptions, StandDescription, StandEstimate, StandOutcome, TpaService};
