//! Stream utilities for snapshot consumers

mod coalesce;

pub use coalesce::{Coalesce, CoalesceExt};
