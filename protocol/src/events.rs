//! # Event Records
//!
//! Every balance-affecting or governance operation appends a typed record
//! to the engine's event log. The log exists for external observers --
//! indexers, dashboards, reconciliation jobs -- and is never read back by
//! the core logic itself. Records carry the pre/post values an indexer
//! needs so it does not have to reconstruct state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assets::AssetId;
use crate::governance::Role;
use crate::ledger::Address;

/// A protocol event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A deposit was accepted and principal minted.
    Deposited {
        account: Address,
        asset: AssetId,
        /// Raw amount in the asset's native units.
        raw_amount: u128,
        /// The same amount in internal units.
        internal_amount: u128,
        /// Principal credited at the persisted ratio.
        minted_principal: u128,
    },
    /// Principal was burned to honor a withdrawal.
    BurnedForWithdraw {
        account: Address,
        asset: AssetId,
        /// Redeemable value withdrawn, internal units.
        amount: u128,
        /// Principal burned.
        burned_principal: u128,
    },
    /// Principal moved between accounts.
    Transferred {
        from: Address,
        to: Address,
        principal: u128,
    },
    /// An allowance was set.
    Approved {
        owner: Address,
        spender: Address,
        principal: u128,
    },
    /// The interest rate pair changed.
    InterestChanged {
        old_annual_bps: u32,
        new_annual_bps: u32,
        old_interest_per_second: u128,
        new_interest_per_second: u128,
    },
    /// The ratio-update throttle window changed.
    UpdateTimeLimitChanged { old_secs: i64, new_secs: i64 },
    /// The governance wallet rotated.
    WalletChanged { old: Address, new: Address },
    /// An asset was added to the registry.
    AssetRegistered {
        asset: AssetId,
        decimals: u32,
        enabled: bool,
    },
    /// An asset's deposit eligibility toggled.
    AssetStatusChanged { asset: AssetId, enabled: bool },
    /// A role was granted.
    RoleGranted { role: Role, account: Address },
    /// A role was revoked.
    RoleRevoked { role: Role, account: Address },
    /// The ledger was paused.
    Paused,
    /// The ledger was unpaused.
    Unpaused,
    /// A withdrawal could not be fully covered and was queued.
    WithdrawalQueued {
        request_id: Uuid,
        account: Address,
        asset: AssetId,
        /// Queued amount, internal units.
        amount: u128,
    },
    /// A settlement pass paid toward a queued withdrawal.
    WithdrawalSettled {
        request_id: Uuid,
        account: Address,
        asset: AssetId,
        /// Amount paid in this pass, internal units.
        amount: u128,
        /// Whether the request is now fully paid.
        completed: bool,
    },
    /// External liquidity was recognized into the buffer.
    LiquidityDonated {
        asset: AssetId,
        /// Recognized amount, internal units.
        internal_amount: u128,
    },
    /// The one-shot legacy balance migration ran.
    LegacyMigrated {
        /// Number of accounts converted.
        accounts: usize,
        /// Total principal minted by the conversion.
        minted_principal: u128,
    },
}

/// An event plus its position and time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Zero-based sequence number, dense and strictly increasing.
    pub seq: u64,

    /// When the operation that emitted this event executed.
    pub at: DateTime<Utc>,

    /// The event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_serializes_with_snake_case_tag() {
        let record = EventRecord {
            seq: 7,
            at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            event: Event::InterestChanged {
                old_annual_bps: 800,
                new_annual_bps: 500,
                old_interest_per_second: 1_000_000_002_440_410_000,
                new_interest_per_second: 1_000_000_001_547_125_950,
            },
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("interest_changed"));

        let recovered: EventRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered, record);
    }
}
