//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod flight;

pub(crate) use circular::{ResolutionStack, MAX_DEPTH};
pub(crate) use flight::FlightTable;
