//! Capability wrappers.

pub mod rate_limited;

pub use rate_limited::{CapabilityExt, RateLimitedCapability, RateLimitedCapabilityBuilder};
