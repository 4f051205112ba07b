pub mod controller;
pub mod loop_worker;

pub use controller::ScanController;
pub use loop_worker::ScanStats;
