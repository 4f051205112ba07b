pub mod decoder;
pub mod filter;

pub use decoder::{decode_ibeacon, manufacturer_data, NotIBeacon};
pub use filter::{accept, evaluate, FilterDecision};
