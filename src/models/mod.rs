pub mod advertisement;
pub mod criteria;
pub mod session;

pub use advertisement::{BeaconAdvertisement, DiscoveryEvent};
pub use criteria::FilterCriteria;
pub use session::{BeaconRead, Session, SessionInfo};
