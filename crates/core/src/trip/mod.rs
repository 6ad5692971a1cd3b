//! Trip domain types: traveler preferences, outlines, detailed days and the
//! finished itinerary.

mod duration;
mod types;

pub use duration::TripDuration;
pub use types::*;
