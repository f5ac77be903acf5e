//! # Liquidity Buffer & Withdrawal Queue
//!
//! The buffer is where settlement money lives. Deposited assets are held
//! on hand; withdrawals are paid from on-hand funds immediately when
//! possible, and anything that cannot be covered right now is queued as a
//! [`WithdrawalRequest`] and settled later as liquidity arrives.
//!
//! ## Sourcing Order
//!
//! A settlement pass sources each request from, in order:
//!
//! 1. the on-hand balance of the requested asset, then
//! 2. the external liquidity source ([`LiquiditySource`]), up to whatever
//!    it can provide without failing.
//!
//! ## Pass Semantics
//!
//! The queue is strictly FIFO. A pass walks it front to back, pays each
//! request as far as current liquidity allows, removes requests that are
//! fully paid, and *continues* past requests it could only partially pay:
//! one dry asset must not block settlement of later requests in other
//! assets. A pass with no new liquidity since the last one pays nothing
//! and changes nothing, so repeated calls are harmless.
//!
//! All amounts in this module are internal 18-digit units. The engine
//! converts to native units at the system boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::assets::AssetId;
use crate::ledger::Address;

// ---------------------------------------------------------------------------
// LiquiditySource
// ---------------------------------------------------------------------------

/// The external pooled position the buffer can draw on when its own funds
/// fall short. Deliberately narrow: the buffer neither knows nor cares
/// what the pool does with the money, only what it can give back.
pub trait LiquiditySource {
    /// How much of `asset` the source could currently provide, in internal
    /// units.
    fn available(&self, asset: &AssetId) -> u128;

    /// Withdraws up to `want` internal units of `asset` from the source.
    /// Returns the amount actually provided, which may be anything from
    /// zero to `want`. Never fails: a dry source provides zero.
    fn withdraw_up_to(&mut self, asset: &AssetId, want: u128) -> u128;
}

/// A plain in-memory liquidity source: a per-asset reserve that hands out
/// funds until empty. Backs tests and single-node deployments; production
/// pools implement [`LiquiditySource`] over their own position.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReservePool {
    reserves: HashMap<AssetId, u128>,
}

impl ReservePool {
    /// Creates an empty reserve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` internal units of `asset` to the reserve.
    pub fn fund(&mut self, asset: AssetId, amount: u128) {
        *self.reserves.entry(asset).or_insert(0) += amount;
    }
}

impl LiquiditySource for ReservePool {
    fn available(&self, asset: &AssetId) -> u128 {
        self.reserves.get(asset).copied().unwrap_or(0)
    }

    fn withdraw_up_to(&mut self, asset: &AssetId, want: u128) -> u128 {
        let Some(reserve) = self.reserves.get_mut(asset) else {
            return 0;
        };
        let provided = want.min(*reserve);
        *reserve -= provided;
        provided
    }
}

// ---------------------------------------------------------------------------
// WithdrawalRequest
// ---------------------------------------------------------------------------

/// A withdrawal the buffer could not fully cover at burn time.
///
/// The amount is fixed in internal units when the principal is burned;
/// queued value does not keep accruing interest (the claim on the pool
/// ended with the burn).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Unique request identifier.
    pub id: Uuid,

    /// The account owed the payout.
    pub account: Address,

    /// The asset the payout is denominated in.
    pub asset: AssetId,

    /// Outstanding amount still owed, in internal units. Shrinks as
    /// settlement passes pay it down; the request is removed at zero.
    pub amount: u128,

    /// When the request entered the queue.
    pub enqueued_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Payout & Settlement Results
// ---------------------------------------------------------------------------

/// Outcome of an immediate payout attempt at withdrawal time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayoutOutcome {
    /// The full amount was covered on hand.
    Paid {
        /// Amount paid, internal units.
        amount: u128,
    },
    /// On-hand funds fell short. Whatever was available was paid out and
    /// the shortfall was queued. Not an error: the claim is honored, just
    /// not instantly.
    Queued {
        /// Amount paid immediately from on-hand funds, internal units.
        paid: u128,
        /// Amount queued for later settlement, internal units.
        queued: u128,
        /// Id of the queued request.
        request_id: Uuid,
    },
}

/// One payment made during a settlement pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPayment {
    /// The request this payment went toward.
    pub request_id: Uuid,
    /// The account paid.
    pub account: Address,
    /// The asset paid in.
    pub asset: AssetId,
    /// Amount paid in this pass, internal units.
    pub amount: u128,
    /// Whether the request was fully paid and removed.
    pub completed: bool,
}

/// Summary of a settlement pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Payments made, in queue order.
    pub payments: Vec<SettlementPayment>,
    /// Requests still pending after the pass.
    pub remaining: usize,
}

impl SettlementReport {
    /// Total amount paid across the pass, internal units.
    pub fn total_paid(&self) -> u128 {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

// ---------------------------------------------------------------------------
// BufferVault
// ---------------------------------------------------------------------------

/// On-hand settlement liquidity plus the pending withdrawal queue.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BufferVault {
    /// On-hand liquidity per asset, internal units.
    on_hand: HashMap<AssetId, u128>,

    /// Pending withdrawal requests, FIFO.
    queue: VecDeque<WithdrawalRequest>,
}

impl BufferVault {
    /// Creates an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// On-hand liquidity for `asset`, internal units.
    pub fn on_hand(&self, asset: &AssetId) -> u128 {
        self.on_hand.get(asset).copied().unwrap_or(0)
    }

    /// The pending queue, front first.
    pub fn pending(&self) -> impl Iterator<Item = &WithdrawalRequest> {
        self.queue.iter()
    }

    /// Number of pending requests.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Total outstanding amount queued for `asset`, internal units.
    pub fn pending_total(&self, asset: &AssetId) -> u128 {
        self.queue
            .iter()
            .filter(|r| &r.asset == asset)
            .map(|r| r.amount)
            .sum()
    }

    /// Credits deposited or donated liquidity to the on-hand balance.
    pub fn credit(&mut self, asset: AssetId, amount: u128) {
        *self.on_hand.entry(asset).or_insert(0) += amount;
    }

    /// Pays `amount` of `asset` to `account`, as far as on-hand funds
    /// reach; the shortfall, if any, is queued.
    ///
    /// The external source is *not* consulted here: immediate payout is an
    /// on-hand fast path, and pulling from the pool is the settlement
    /// pass's job.
    pub fn pay_out(
        &mut self,
        account: &str,
        asset: &AssetId,
        amount: u128,
        now: DateTime<Utc>,
    ) -> PayoutOutcome {
        let available = self.on_hand(asset);

        if available >= amount {
            self.on_hand.insert(asset.clone(), available - amount);
            return PayoutOutcome::Paid { amount };
        }

        let paid = available;
        let queued = amount - paid;
        if paid > 0 {
            self.on_hand.insert(asset.clone(), 0);
        }

        let request = WithdrawalRequest {
            id: Uuid::new_v4(),
            account: account.to_string(),
            asset: asset.clone(),
            amount: queued,
            enqueued_at: now,
        };
        let request_id = request.id;
        tracing::debug!(%request_id, asset = %asset, %queued, "withdrawal queued");
        self.queue.push_back(request);

        PayoutOutcome::Queued {
            paid,
            queued,
            request_id,
        }
    }

    /// Runs one settlement pass over the pending queue.
    ///
    /// Walks the queue FIFO, sourcing each request from on-hand funds and
    /// then from `source`. Fully paid requests are removed; partially paid
    /// ones shrink and stay. The pass never fails: with nothing payable it
    /// simply reports zero payments.
    pub fn satisfy_withdrawals(&mut self, source: &mut dyn LiquiditySource) -> SettlementReport {
        let mut report = SettlementReport::default();

        let mut index = 0;
        while index < self.queue.len() {
            let need = self.queue[index].amount;
            let asset = self.queue[index].asset.clone();

            let on_hand = self.on_hand(&asset);
            let from_buffer = on_hand.min(need);
            let from_source = if from_buffer < need {
                // Clamp: a source must not pay a request past its amount,
                // whatever it claims to have provided.
                source
                    .withdraw_up_to(&asset, need - from_buffer)
                    .min(need - from_buffer)
            } else {
                0
            };
            let paid = from_buffer + from_source;

            if paid == 0 {
                // Nothing available for this asset; move on so requests in
                // other assets still settle.
                index += 1;
                continue;
            }

            if from_buffer > 0 {
                self.on_hand.insert(asset.clone(), on_hand - from_buffer);
            }

            if paid == need {
                // remove(index) preserves the order of the rest.
                let request = self
                    .queue
                    .remove(index)
                    .expect("index bounded by queue length");
                report.payments.push(SettlementPayment {
                    request_id: request.id,
                    account: request.account,
                    asset,
                    amount: paid,
                    completed: true,
                });
            } else {
                let request = &mut self.queue[index];
                request.amount = need - paid;
                report.payments.push(SettlementPayment {
                    request_id: request.id,
                    account: request.account.clone(),
                    asset,
                    amount: paid,
                    completed: false,
                });
                index += 1;
            }
        }

        report.remaining = self.queue.len();
        report
    }
}
