//! # Asset Registry & Decimal Normalization
//!
//! Deposits arrive in whatever precision the asset natively uses -- six
//! fractional digits for the big dollar stables, eighteen for most others.
//! Internally the ledger accounts in exactly one unit: 18 fractional
//! digits ([`crate::math::SCALE`]). This module owns the conversion in
//! both directions and the registry that says which assets are accepted
//! for deposit at all.
//!
//! ## Rounding Contract
//!
//! - `to_internal` is exact for assets with 18 or fewer native digits
//!   (it only multiplies by a power of ten).
//! - `to_native` floors. For an internal amount that is not an exact
//!   multiple of the native unit, the sub-unit remainder is dropped:
//!   bounded, accepted dust that stays in the pool rather than being paid
//!   out. `to_native(to_internal(x)) == x` always holds for raw `x`.
//!
//! ## Enable vs Register
//!
//! Disabling an asset gates *new deposits only*. Claims already issued
//! stay redeemable in that asset: redemption needs the asset's decimals,
//! which registration provides, not its enabled flag.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::config::INTERNAL_DECIMALS;
use crate::math::{self, MathError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from registry lookups and decimal conversion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The asset has never been registered. Without a decimals entry we
    /// cannot even interpret an amount, so this gates every conversion.
    #[error("unsupported asset: {0}")]
    UnsupportedAsset(AssetId),

    /// The asset is registered but currently disabled for deposits.
    #[error("asset {0} is not enabled for deposits")]
    AssetNotEnabled(AssetId),

    /// The asset is already present in the registry.
    #[error("asset {0} is already registered")]
    AlreadyRegistered(AssetId),

    /// Conversion arithmetic overflowed.
    #[error("normalization arithmetic failed: {0}")]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Identifier for a registered asset.
///
/// A plain symbol string ("USDC", "DAI"). Uniqueness is enforced by the
/// registry at registration time, which is the only place identifiers are
/// minted into the system.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Creates an asset id from a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Returns the symbol as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// AssetInfo
// ---------------------------------------------------------------------------

/// Registry entry for one asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Whether the asset currently accepts new deposits.
    pub enabled: bool,

    /// Native fractional digits of the asset. 6 for USDC/USDT, 18 for DAI.
    pub decimals: u32,
}

// ---------------------------------------------------------------------------
// AssetRegistry
// ---------------------------------------------------------------------------

/// The set of assets the pool knows about, with their deposit eligibility
/// and native precision.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssetRegistry {
    /// Registered assets keyed by identifier.
    assets: HashMap<AssetId, AssetInfo>,
}

impl AssetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new asset.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AlreadyRegistered`] if the id is taken.
    /// Re-registering to change decimals is not a thing; decimals are a
    /// property of the asset, not a knob.
    pub fn register(
        &mut self,
        asset: AssetId,
        decimals: u32,
        enabled: bool,
    ) -> Result<(), AssetError> {
        if self.assets.contains_key(&asset) {
            return Err(AssetError::AlreadyRegistered(asset));
        }
        self.assets.insert(asset, AssetInfo { enabled, decimals });
        Ok(())
    }

    /// Toggles deposit eligibility. Returns the previous flag.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::UnsupportedAsset`] for unknown assets.
    pub fn set_status(&mut self, asset: &AssetId, enabled: bool) -> Result<bool, AssetError> {
        let info = self
            .assets
            .get_mut(asset)
            .ok_or_else(|| AssetError::UnsupportedAsset(asset.clone()))?;
        let old = info.enabled;
        info.enabled = enabled;
        Ok(old)
    }

    /// Returns the registry entry for an asset, if registered.
    pub fn info(&self, asset: &AssetId) -> Option<AssetInfo> {
        self.assets.get(asset).copied()
    }

    /// Returns all registered assets as `(id, info)` pairs, sorted by id
    /// for stable output.
    pub fn all(&self) -> Vec<(AssetId, AssetInfo)> {
        let mut out: Vec<_> = self.assets.iter().map(|(k, v)| (k.clone(), *v)).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Fails unless the asset is registered *and* enabled for deposits.
    pub fn require_enabled(&self, asset: &AssetId) -> Result<AssetInfo, AssetError> {
        let info = self
            .assets
            .get(asset)
            .ok_or_else(|| AssetError::UnsupportedAsset(asset.clone()))?;
        if !info.enabled {
            return Err(AssetError::AssetNotEnabled(asset.clone()));
        }
        Ok(*info)
    }

    /// Fails unless the asset is registered. Enabled or not is irrelevant
    /// here: this is the redemption-side check.
    pub fn require_registered(&self, asset: &AssetId) -> Result<AssetInfo, AssetError> {
        self.assets
            .get(asset)
            .copied()
            .ok_or_else(|| AssetError::UnsupportedAsset(asset.clone()))
    }

    /// Scales a raw native amount up to the internal 18-digit unit.
    ///
    /// Exact for assets with up to 18 native digits. For the exotic case
    /// of more than 18 digits the conversion floors, dropping precision
    /// the internal unit cannot represent.
    pub fn to_internal(&self, asset: &AssetId, raw_amount: u128) -> Result<u128, AssetError> {
        let info = self.require_registered(asset)?;
        let internal = u32::from(INTERNAL_DECIMALS);
        if info.decimals <= internal {
            let factor = math::pow10(internal - info.decimals)?;
            raw_amount
                .checked_mul(factor)
                .ok_or(AssetError::Math(MathError::Overflow))
        } else {
            let factor = math::pow10(info.decimals - internal)?;
            Ok(raw_amount / factor)
        }
    }

    /// Scales an internal amount down to the asset's native unit, flooring.
    ///
    /// Exact algebraic inverse of [`to_internal`](Self::to_internal) for
    /// amounts that are whole multiples of the native unit; otherwise the
    /// sub-native remainder is dropped.
    pub fn to_native(&self, asset: &AssetId, internal_amount: u128) -> Result<u128, AssetError> {
        let info = self.require_registered(asset)?;
        let internal = u32::from(INTERNAL_DECIMALS);
        if info.decimals <= internal {
            let factor = math::pow10(internal - info.decimals)?;
            Ok(internal_amount / factor)
        } else {
            let factor = math::pow10(info.decimals - internal)?;
            internal_amount
                .checked_mul(factor)
                .ok_or(AssetError::Math(MathError::Overflow))
        }
    }
}
