//! Filter engine: decides whether a decoded advertisement gets recorded.
//!
//! Both conditions must hold. The UUID comparison is case-insensitive and the
//! RSSI bound is inclusive. Criteria are assumed to be validated already.

use crate::models::{BeaconAdvertisement, FilterCriteria};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accepted,
    UuidMismatch,
    BelowThreshold,
}

impl FilterDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterDecision::Accepted => "accepted",
            FilterDecision::UuidMismatch => "uuid_mismatch",
            FilterDecision::BelowThreshold => "below_threshold",
        }
    }
}

pub fn evaluate(advertisement: &BeaconAdvertisement, criteria: &FilterCriteria) -> FilterDecision {
    if !advertisement
        .uuid
        .eq_ignore_ascii_case(&criteria.target_uuid)
    {
        return FilterDecision::UuidMismatch;
    }

    if advertisement.rssi < criteria.rssi_threshold {
        return FilterDecision::BelowThreshold;
    }

    FilterDecision::Accepted
}

pub fn accept(advertisement: &BeaconAdvertisement, criteria: &FilterCriteria) -> bool {
    evaluate(advertisement, criteria) == FilterDecision::Accepted
}
