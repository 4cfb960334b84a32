pub mod instrument;

pub use instrument::{instrument, track_active_caller, CallerId};
