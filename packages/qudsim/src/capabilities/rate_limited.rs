//! Rate-limited capability wrapper.
//!
//! Wraps any Capability implementation with rate limiting using the
//! governor crate. Every request waits for a permit before it is sent.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::{QudSimError, Result};
use crate::traits::capability::{Capability, CompletionRequest};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A capability wrapper that enforces rate limits.
///
/// The limiter is shared between clones, so a single quota covers every
/// concurrent caller.
#[derive(Clone)]
pub struct RateLimitedCapability<C: Capability> {
    inner: C,
    limiter: Arc<DefaultRateLimiter>,
}

impl<C: Capability> RateLimitedCapability<C> {
    /// Create a new rate-limited capability.
    pub fn new(capability: C, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(capability, Quota::per_second(requests_per_second))
    }

    /// Like [`new`](Self::new), rejecting a zero rate.
    pub fn try_new(capability: C, requests_per_second: u32) -> Result<Self> {
        let rate = NonZeroU32::new(requests_per_second)
            .ok_or_else(|| QudSimError::config("requests_per_second", "must be greater than 0"))?;
        Ok(Self::new(capability, rate))
    }

    /// Create with a custom quota.
    pub fn with_quota(capability: C, quota: Quota) -> Self {
        Self {
            inner: capability,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with burst support.
    pub fn with_burst(capability: C, requests_per_second: NonZeroU32, burst: NonZeroU32) -> Self {
        Self::with_quota(
            capability,
            Quota::per_second(requests_per_second).allow_burst(burst),
        )
    }

    /// The wrapped capability.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Capability> Capability for RateLimitedCapability<C> {
    async fn complete(&self, request: &CompletionRequest) -> Result<serde_json::Value> {
        self.limiter.until_ready().await;
        self.inner.complete(request).await
    }
}

/// Builder for RateLimitedCapability.
pub struct RateLimitedCapabilityBuilder<C: Capability> {
    capability: C,
    requests_per_second: NonZeroU32,
    burst: Option<NonZeroU32>,
}

impl<C: Capability> RateLimitedCapabilityBuilder<C> {
    /// Create a new builder. Defaults to one request per second.
    pub fn new(capability: C) -> Self {
        Self {
            capability,
            requests_per_second: nonzero!(1u32),
            burst: None,
        }
    }

    /// Set requests per second.
    pub fn requests_per_second(mut self, rps: NonZeroU32) -> Self {
        self.requests_per_second = rps;
        self
    }

    /// Set burst size.
    pub fn burst(mut self, burst: NonZeroU32) -> Self {
        self.burst = Some(burst);
        self
    }

    /// Build the rate-limited capability.
    pub fn build(self) -> RateLimitedCapability<C> {
        match self.burst {
            Some(burst) => {
                RateLimitedCapability::with_burst(self.capability, self.requests_per_second, burst)
            }
            None => RateLimitedCapability::new(self.capability, self.requests_per_second),
        }
    }
}

/// Extension trait for easy rate limiting.
pub trait CapabilityExt: Capability + Sized {
    /// Wrap this capability with rate limiting.
    fn rate_limited(self, requests_per_second: NonZeroU32) -> RateLimitedCapability<Self> {
        RateLimitedCapability::new(self, requests_per_second)
    }
}

impl<C: Capability + Sized> CapabilityExt for C {}
