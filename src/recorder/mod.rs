pub mod controller;
pub mod error;
pub mod state;

pub use controller::{RecorderSnapshot, SessionRecorder};
pub use error::RecorderError;
pub use state::{RecorderState, RecorderStatus};
