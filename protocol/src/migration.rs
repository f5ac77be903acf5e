//! # Legacy Balance Migration
//!
//! Earlier generations of the pool accrued interest *per balance*: each
//! account's stored amount already included its earned yield. The current
//! design stores principal and scales through the growing ratio instead.
//! Moving between the two models is a one-time state transformation,
//! executed under governance authority and refused on any second attempt.
//!
//! The conversion is value-preserving by construction: for each legacy
//! account, the accrued value V becomes principal `V / ratio`, so the
//! account's redeemable value immediately after migration is
//! `floor(V / ratio) * ratio <= V`, with the difference bounded by one
//! floor step.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{Address, Ledger, LedgerError};
use crate::math::{self, MathError};
use crate::rate::RateController;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the legacy migration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// The migration already ran. It is one-shot by design.
    #[error("legacy migration has already been executed")]
    AlreadyMigrated,

    /// Conversion arithmetic failed.
    #[error("migration arithmetic failed: {0}")]
    Math(#[from] MathError),

    /// Minting the converted principal failed (zero account, overflow).
    #[error("migration mint failed: {0}")]
    Ledger(#[from] LedgerError),
}

// ---------------------------------------------------------------------------
// LegacyBalance
// ---------------------------------------------------------------------------

/// One account's balance under the old per-balance accrual model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyBalance {
    /// The account being migrated.
    pub account: Address,

    /// The account's full accrued value (principal plus earned yield)
    /// under the old model, in internal units.
    pub accrued_value: u128,
}

/// Converts legacy accrued-value balances into principal at the current
/// persisted ratio, minting onto `ledger`.
///
/// Returns the total principal minted. Entries with zero accrued value
/// are skipped rather than rejected; dead accounts are common in old
/// snapshots.
///
/// The caller owns the one-shot guard and the governance check; this
/// function is the pure transformation, testable in isolation.
pub fn migrate_legacy(
    ledger: &mut Ledger,
    rate: &RateController,
    entries: &[LegacyBalance],
) -> Result<u128, MigrationError> {
    let ratio = rate.growing_ratio();
    let mut minted_total: u128 = 0;

    for entry in entries {
        if entry.accrued_value == 0 {
            continue;
        }
        let principal = math::div_floor(entry.accrued_value, ratio)?;
        if principal == 0 {
            // Below one principal unit at the current ratio: pure dust.
            continue;
        }
        ledger.mint(&entry.account, principal)?;
        minted_total += principal;
    }

    Ok(minted_total)
}
