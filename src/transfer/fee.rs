//! Fee policy applied to the network's suggested gas price

use crate::core::{AgentError, AgentResult};

const BPS_SCALE: u128 = 10_000;

/// How much to pay over the suggested gas price, and the gas limit to use
///
/// The multiplier is kept in basis points so prices stay exact integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    multiplier_bps: u32,
    gas_limit: u64,
}

impl FeePolicy {
    /// 1.1x the suggested price
    pub const DEFAULT_MULTIPLIER_BPS: u32 = 11_000;

    /// Gas limit for an ERC-20 transfer
    pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

    /// Policy from a decimal multiplier such as `1.1`
    ///
    /// The multiplier must be at least 1; paying under the suggested price
    /// is not supported.
    pub fn from_multiplier(multiplier: f64) -> AgentResult<Self> {
        if !multiplier.is_finite() || multiplier < 1.0 || multiplier > 1_000.0 {
            return Err(AgentError::invalid_config(format!(
                "fee multiplier must be between 1 and 1000, got {}",
                multiplier
            )));
        }
        Ok(Self {
            multiplier_bps: (multiplier * BPS_SCALE as f64).round() as u32,
            gas_limit: Self::DEFAULT_GAS_LIMIT,
        })
    }

    /// Override the gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Multiplier in basis points
    pub fn multiplier_bps(&self) -> u32 {
        self.multiplier_bps
    }

    /// Gas limit for transfer transactions
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Gas price to pay given the network's suggestion
    pub fn apply(&self, suggested: u128) -> u128 {
        let bps = u128::from(self.multiplier_bps);
        (suggested / BPS_SCALE)
            .saturating_mul(bps)
            .saturating_add(suggested % BPS_SCALE * bps / BPS_SCALE)
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            multiplier_bps: Self::DEFAULT_MULTIPLIER_BPS,
            gas_limit: Self::DEFAULT_GAS_LIMIT,
        }
    }
}
