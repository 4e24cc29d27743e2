//! SDK session configuration.

use crate::error::{SdkError, SdkResult};
use crate::native::{RawConfig, RawNetwork};
use serde::{Deserialize, Serialize};
use std::ffi::CStr;
use std::time::Duration;

/// Platform network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network.
    Mainnet,
    /// Public test network.
    #[default]
    Testnet,
    /// Development network.
    Devnet,
    /// Local network.
    Local,
}

impl Network {
    pub(crate) fn to_raw(self) -> RawNetwork {
        match self {
            Network::Mainnet => RawNetwork::Mainnet,
            Network::Testnet => RawNetwork::Testnet,
            Network::Devnet => RawNetwork::Devnet,
            Network::Local => RawNetwork::Local,
        }
    }
}

/// Configuration for opening an SDK session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SdkConfig {
    /// Network to connect to.
    pub network: Network,
    /// Endpoint addresses. Empty selects the network's defaults.
    pub endpoints: Vec<String>,
    /// Retries per request.
    pub request_retry_count: u32,
    /// Connection timeout.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
    /// Request timeout.
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    /// How long `*_and_wait` operations wait for confirmation.
    #[serde(with = "duration_ms")]
    pub wait_timeout: Duration,
    /// Fee multiplier increase in percent.
    pub user_fee_increase: u16,
    /// Sign with keys of any security level.
    pub allow_signing_with_any_security_level: bool,
    /// Sign with keys of any purpose.
    pub allow_signing_with_any_purpose: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            endpoints: Vec::new(),
            request_retry_count: 3,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            wait_timeout: Duration::from_secs(60),
            user_fee_increase: 0,
            allow_signing_with_any_security_level: false,
            allow_signing_with_any_purpose: false,
        }
    }
}

impl SdkConfig {
    /// Largest accepted fee increase, in percent.
    pub const MAX_USER_FEE_INCREASE: u16 = 100;

    /// Creates a configuration for `network` with default settings.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> SdkResult<Self> {
        serde_json::from_str(json).map_err(|e| SdkError::serialization("invalid SDK config", e.to_string()))
    }

    /// Sets the network.
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Adds an endpoint address.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// Sets retries per request.
    pub fn with_request_retry_count(mut self, retries: u32) -> Self {
        self.request_retry_count = retries;
        self
    }

    /// Sets the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the confirmation wait timeout.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sets the fee increase in percent.
    pub fn with_user_fee_increase(mut self, percent: u16) -> Self {
        self.user_fee_increase = percent;
        self
    }

    /// Allows signing with keys of any security level.
    pub fn with_any_security_level(mut self, allow: bool) -> Self {
        self.allow_signing_with_any_security_level = allow;
        self
    }

    /// Allows signing with keys of any purpose.
    pub fn with_any_purpose(mut self, allow: bool) -> Self {
        self.allow_signing_with_any_purpose = allow;
        self
    }

    /// Checks the configuration before it reaches the native core.
    pub fn validate(&self) -> SdkResult<()> {
        for endpoint in &self.endpoints {
            let trimmed = endpoint.trim();
            if trimmed.is_empty() {
                return Err(SdkError::validation("endpoint address must not be empty"));
            }
            if trimmed.contains(',') {
                return Err(SdkError::validation(format!(
                    "endpoint address must not contain ',': {trimmed}"
                )));
            }
        }
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() || self.wait_timeout.is_zero() {
            return Err(SdkError::validation("timeouts must be greater than zero"));
        }
        if self.user_fee_increase > Self::MAX_USER_FEE_INCREASE {
            return Err(SdkError::validation(format!(
                "user fee increase must be at most {}%, got {}%",
                Self::MAX_USER_FEE_INCREASE,
                self.user_fee_increase
            )));
        }
        Ok(())
    }

    /// Endpoint list in the form the core expects.
    pub(crate) fn joined_endpoints(&self) -> String {
        self.endpoints
            .iter()
            .map(|e| e.trim())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub(crate) fn to_raw<'a>(&self, dapi_addresses: &'a CStr) -> RawConfig<'a> {
        RawConfig {
            network: self.network.to_raw(),
            dapi_addresses,
            request_retry_count: self.request_retry_count,
            connect_timeout_ms: millis(self.connect_timeout),
            request_timeout_ms: millis(self.request_timeout),
            wait_timeout_ms: millis(self.wait_timeout),
            user_fee_increase: self.user_fee_increase,
            allow_signing_with_any_security_level: self.allow_signing_with_any_security_level,
            allow_signing_with_any_purpose: self.allow_signing_with_any_purpose,
        }
    }
}

/// Saturating conversion to whole milliseconds.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::millis(*d))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
