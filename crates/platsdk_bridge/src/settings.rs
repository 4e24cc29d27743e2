//! Per-call broadcast settings and token payments.

use crate::config::millis;
use crate::error::{SdkError, SdkResult};
use crate::id::ContractId;
use crate::native::{RawGasFeesPaidBy, RawPutSettings, RawTokenPaymentInfo};
use std::time::Duration;

/// Settings for one state transition. Unset fields use the core defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutSettings {
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Retries.
    pub retries: Option<u32>,
    /// Ban addresses that failed.
    pub ban_failed_address: bool,
    /// Identity nonce stale time.
    pub identity_nonce_stale_time: Option<Duration>,
    /// Fee multiplier increase in percent.
    pub user_fee_increase: u16,
    /// Sign with keys of any security level.
    pub allow_signing_with_any_security_level: bool,
    /// Sign with keys of any purpose.
    pub allow_signing_with_any_purpose: bool,
    /// Confirmation wait timeout.
    pub wait_timeout: Option<Duration>,
}

impl PutSettings {
    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets retries.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Bans failed addresses.
    pub fn with_ban_failed_address(mut self, ban: bool) -> Self {
        self.ban_failed_address = ban;
        self
    }

    /// Sets the confirmation wait timeout.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Sets the fee increase in percent.
    pub fn with_user_fee_increase(mut self, percent: u16) -> Self {
        self.user_fee_increase = percent;
        self
    }

    pub(crate) fn to_raw(self) -> RawPutSettings {
        RawPutSettings {
            connect_timeout_ms: self.connect_timeout.map_or(0, millis),
            timeout_ms: self.timeout.map_or(0, millis),
            retries: self.retries.unwrap_or(0),
            ban_failed_address: self.ban_failed_address,
            identity_nonce_stale_time_s: self.identity_nonce_stale_time.map_or(0, |d| d.as_secs()),
            user_fee_increase: self.user_fee_increase,
            allow_signing_with_any_security_level: self.allow_signing_with_any_security_level,
            allow_signing_with_any_purpose: self.allow_signing_with_any_purpose,
            wait_timeout_ms: self.wait_timeout.map_or(0, millis),
        }
    }
}

/// Converts optional settings, defaulting to all zeros.
pub(crate) fn raw_settings(settings: Option<&PutSettings>) -> RawPutSettings {
    settings.map(|s| s.to_raw()).unwrap_or_default()
}

/// Who pays gas fees for a token-priced operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GasFeesPaidBy {
    /// The document owner.
    #[default]
    DocumentOwner,
    /// The contract owner.
    ContractOwner,
    /// The contract owner if possible, otherwise the document owner.
    PreferContractOwner,
}

/// Token payment attached to a document operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenPaymentInfo {
    /// Contract of the payment token. `None` means the document's contract.
    pub payment_token_contract_id: Option<ContractId>,
    /// Token position within its contract.
    pub token_contract_position: u16,
    /// Minimum accepted cost.
    pub minimum_token_cost: Option<u64>,
    /// Maximum accepted cost.
    pub maximum_token_cost: Option<u64>,
    /// Who pays gas fees.
    pub gas_fees_paid_by: GasFeesPaidBy,
}

impl TokenPaymentInfo {
    /// Checks that the cost bounds are consistent.
    pub fn validate(&self) -> SdkResult<()> {
        if let (Some(min), Some(max)) = (self.minimum_token_cost, self.maximum_token_cost) {
            if min > max {
                return Err(SdkError::validation(format!(
                    "minimum token cost {min} exceeds maximum token cost {max}"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn to_raw(self) -> RawTokenPaymentInfo {
        RawTokenPaymentInfo {
            payment_token_contract_id: self.payment_token_contract_id.map(ContractId::into_bytes),
            token_contract_position: self.token_contract_position,
            minimum_token_cost: self.minimum_token_cost.unwrap_or(0),
            maximum_token_cost: self.maximum_token_cost.unwrap_or(0),
            gas_fees_paid_by: match self.gas_fees_paid_by {
                GasFeesPaidBy::DocumentOwner => RawGasFeesPaidBy::DocumentOwner,
                GasFeesPaidBy::ContractOwner => RawGasFeesPaidBy::ContractOwner,
                GasFeesPaidBy::PreferContractOwner => RawGasFeesPaidBy::PreferContractOwner,
            },
        }
    }
}

/// Validates and converts an optional payment.
pub(crate) fn raw_payment(payment: Option<&TokenPaymentInfo>) -> SdkResult<Option<RawTokenPaymentInfo>> {
    payment
        .map(|p| {
            p.validate()?;
            Ok(p.to_raw())
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_settings_are_zero() {
        assert_eq!(raw_settings(None), RawPutSettings::default());
        assert_eq!(PutSettings::default().to_raw(), RawPutSettings::default());
    }

    #[test]
    fn durations_become_millis() {
        let raw = PutSettings::default()
            .with_timeout(Duration::from_secs(2))
            .with_wait_timeout(Duration::from_millis(1500))
            .with_retries(4)
            .to_raw();
        assert_eq!(raw.timeout_ms, 2_000);
        assert_eq!(raw.wait_timeout_ms, 1_500);
        assert_eq!(raw.retries, 4);
        assert_eq!(raw.connect_timeout_ms, 0);
    }

    #[test]
    fn payment_bounds_are_checked() {
        let bad = TokenPaymentInfo {
            minimum_token_cost: Some(10),
            maximum_token_cost: Some(5),
            ..TokenPaymentInfo::default()
        };
        assert!(raw_payment(Some(&bad)).is_err());
        assert_eq!(raw_payment(None).unwrap(), None);

        let good = TokenPaymentInfo {
            payment_token_contract_id: Some(ContractId::from_bytes([3; 32])),
            maximum_token_cost: Some(50),
            gas_fees_paid_by: GasFeesPaidBy::ContractOwner,
            ..TokenPaymentInfo::default()
        };
        let raw = raw_payment(Some(&good)).unwrap().unwrap();
        assert_eq!(raw.payment_token_contract_id, Some([3; 32]));
        assert_eq!(raw.minimum_token_cost, 0);
        assert_eq!(raw.maximum_token_cost, 50);
        assert_eq!(raw.gas_fees_paid_by, RawGasFeesPaidBy::ContractOwner);
    }
}
