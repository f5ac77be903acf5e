//! # Liquidity Engine
//!
//! The engine owns the entire protocol state in one place and exposes
//! every external operation: deposits, withdrawals, transfers, the ratio
//! update, the settlement pass, and the governance command dispatch.
//! Nothing else in the crate holds a mutable alias to any of it.
//!
//! ## Transaction Boundary
//!
//! Each mutating entry point runs against a staged copy of the state. If
//! the operation returns `Ok`, the staged copy becomes the state; if it
//! returns `Err`, the staged copy is dropped and the previous state is
//! untouched. That gives every call the all-or-nothing semantics the
//! error contract promises, without sprinkling manual undo logic through
//! the operations.
//!
//! ## One Ratio Per Call
//!
//! `deposit` and `withdraw` first run the *throttled* persisted ratio
//! update and then price against the persisted value. There is exactly
//! one ratio inside any one call, it is the same one
//! `get_balance_for_withdraw` reports, and the projecting `get_balance`
//! view is the only place a fresher number ever appears.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::{AssetError, AssetId, AssetInfo, AssetRegistry};
use crate::buffer::{BufferVault, LiquiditySource, PayoutOutcome, SettlementReport};
use crate::events::{Event, EventRecord};
use crate::governance::{Command, ContractRegistry, GovernanceError, GovernanceGate};
use crate::ledger::{Address, Ledger, LedgerError};
use crate::math::{self, MathError};
use crate::migration::{self, MigrationError};
use crate::rate::{RateController, RateError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Any failure an external operation can surface. Every variant maps to
/// a distinguishable reason; nothing is swallowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Asset registry or normalization failure.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Principal bookkeeping failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Rate configuration or compounding failure.
    #[error("rate error: {0}")]
    Rate(#[from] RateError),

    /// Authorization or pause failure.
    #[error("governance error: {0}")]
    Governance(#[from] GovernanceError),

    /// Legacy migration failure.
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),

    /// Raw fixed-point failure outside the modules above.
    #[error("arithmetic error: {0}")]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a withdrawal did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalOutcome {
    /// Principal burned.
    pub burned_principal: u128,

    /// Amount paid immediately, in the asset's native units.
    pub paid_native: u128,

    /// Amount queued for later settlement, internal units. Zero when the
    /// buffer covered everything.
    pub queued: u128,

    /// Id of the queued request, when one was created.
    pub request_id: Option<uuid::Uuid>,
}

// ---------------------------------------------------------------------------
// EngineState
// ---------------------------------------------------------------------------

/// The complete protocol state. One owned value, serializable as a single
/// blob, cloneable for the staged-commit transaction boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineState {
    /// Authorization state and the pause flag.
    pub governance: GovernanceGate,

    /// Verified contract identities.
    pub contracts: ContractRegistry,

    /// Registered assets and their precision.
    pub assets: AssetRegistry,

    /// The growing ratio and rate parameters.
    pub rate: RateController,

    /// Principal balances and allowances.
    pub ledger: Ledger,

    /// Settlement liquidity and the withdrawal queue.
    pub buffer: BufferVault,

    /// Append-only event log.
    pub events: Vec<EventRecord>,

    /// Whether the one-shot legacy migration has run.
    pub legacy_migrated: bool,
}

impl EngineState {
    fn record(&mut self, at: DateTime<Utc>, event: Event) {
        let seq = self.events.len() as u64;
        self.events.push(EventRecord { seq, at, event });
    }
}

// ---------------------------------------------------------------------------
// LiquidityEngine
// ---------------------------------------------------------------------------

/// The protocol facade. See the module docs for the execution model.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiquidityEngine {
    state: EngineState,
}

impl LiquidityEngine {
    /// Creates an engine at genesis.
    ///
    /// The governance `wallet` must already be registered in `contracts`:
    /// the governance identity is a contract account from the first block,
    /// not eventually.
    pub fn new(
        wallet: Address,
        contracts: ContractRegistry,
        genesis: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        if !contracts.is_contract(&wallet) {
            return Err(GovernanceError::NotContract { account: wallet }.into());
        }
        Ok(Self {
            state: EngineState {
                governance: GovernanceGate::new(wallet),
                contracts,
                assets: AssetRegistry::new(),
                rate: RateController::new(genesis),
                ledger: Ledger::new(),
                buffer: BufferVault::new(),
                events: Vec::new(),
                legacy_migrated: false,
            },
        })
    }

    /// Rebuilds an engine from a previously serialized state.
    pub fn from_state(state: EngineState) -> Self {
        Self { state }
    }

    /// Read access to the full state, for snapshots and inspection.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Runs `op` against a staged copy of the state, committing on `Ok`.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut EngineState) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut staged = self.state.clone();
        let value = op(&mut staged)?;
        self.state = staged;
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Raw principal held by `account`. The ERC20-compatible view.
    pub fn balance_of(&self, account: &str) -> u128 {
        self.state.ledger.balance_of(account)
    }

    /// Redeemable value of `account` right now: principal times the
    /// *projected* ratio. Pure; reflects real-time accrual between
    /// throttled writes.
    pub fn get_balance(&self, account: &str, now: DateTime<Utc>) -> Result<u128, EngineError> {
        let principal = self.state.ledger.balance_of(account);
        if principal == 0 {
            return Ok(0);
        }
        let ratio = self.state.rate.projected_ratio(now)?;
        Ok(math::mul_floor(principal, ratio)?)
    }

    /// Redeemable value at the *persisted* ratio: exactly what a withdraw
    /// in the same transaction would honor.
    pub fn get_balance_for_withdraw(&self, account: &str) -> Result<u128, EngineError> {
        let principal = self.state.ledger.balance_of(account);
        if principal == 0 {
            return Ok(0);
        }
        Ok(math::mul_floor(principal, self.state.rate.growing_ratio())?)
    }

    /// Total principal in existence.
    pub fn total_supply(&self) -> u128 {
        self.state.ledger.total_supply()
    }

    /// Remaining allowance from `owner` to `spender`.
    pub fn allowance(&self, owner: &str, spender: &str) -> u128 {
        self.state.ledger.allowance(owner, spender)
    }

    /// The persisted growing ratio.
    pub fn growing_ratio(&self) -> u128 {
        self.state.rate.growing_ratio()
    }

    /// The advertised annual rate in basis points.
    pub fn annual_interest_bps(&self) -> u32 {
        self.state.rate.annual_interest_bps()
    }

    /// Whether the ledger is paused.
    pub fn is_paused(&self) -> bool {
        self.state.governance.is_paused()
    }

    /// Registry entry for `asset`.
    pub fn asset_info(&self, asset: &AssetId) -> Option<AssetInfo> {
        self.state.assets.info(asset)
    }

    /// The event log.
    pub fn events(&self) -> &[EventRecord] {
        &self.state.events
    }

    // -----------------------------------------------------------------------
    // User Operations
    // -----------------------------------------------------------------------

    /// Deposits `raw_amount` native units of `asset` from `caller`.
    ///
    /// Normalizes to internal units, converts to principal at the
    /// persisted ratio, credits the account, and takes the funds into
    /// buffer custody. Returns the minted principal.
    pub fn deposit(
        &mut self,
        caller: &str,
        asset: &AssetId,
        raw_amount: u128,
        now: DateTime<Utc>,
    ) -> Result<u128, EngineError> {
        self.transact(|state| {
            state.governance.require_not_paused()?;
            if raw_amount == 0 {
                return Err(LedgerError::ZeroAmount.into());
            }
            state.assets.require_enabled(asset)?;

            state.rate.update_ratio(now)?;
            let internal = state.assets.to_internal(asset, raw_amount)?;
            let minted = math::div_floor(internal, state.rate.growing_ratio())?;

            state.ledger.mint(caller, minted)?;
            state.buffer.credit(asset.clone(), internal);

            state.record(
                now,
                Event::Deposited {
                    account: caller.to_string(),
                    asset: asset.clone(),
                    raw_amount,
                    internal_amount: internal,
                    minted_principal: minted,
                },
            );
            tracing::debug!(account = caller, asset = %asset, %raw_amount, %minted, "deposit");
            Ok(minted)
        })
    }

    /// Withdraws `amount` (redeemable value, internal units) of `asset`
    /// to `caller`.
    ///
    /// Burns `amount / ratio` principal at the persisted ratio, then asks
    /// the buffer to pay; what the buffer cannot cover is queued. The
    /// asset must be registered but need not be enabled: disabling gates
    /// deposits, never redemptions.
    pub fn withdraw(
        &mut self,
        caller: &str,
        asset: &AssetId,
        amount: u128,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalOutcome, EngineError> {
        self.transact(|state| {
            state.governance.require_not_paused()?;
            if amount == 0 {
                return Err(LedgerError::ZeroAmount.into());
            }
            state.assets.require_registered(asset)?;

            state.rate.update_ratio(now)?;
            let burned = math::div_floor(amount, state.rate.growing_ratio())?;
            state.ledger.burn(caller, burned)?;

            state.record(
                now,
                Event::BurnedForWithdraw {
                    account: caller.to_string(),
                    asset: asset.clone(),
                    amount,
                    burned_principal: burned,
                },
            );

            let outcome = state.buffer.pay_out(caller, asset, amount, now);
            let (paid_internal, queued, request_id) = match outcome {
                PayoutOutcome::Paid { amount } => (amount, 0, None),
                PayoutOutcome::Queued {
                    paid,
                    queued,
                    request_id,
                } => {
                    state.record(
                        now,
                        Event::WithdrawalQueued {
                            request_id,
                            account: caller.to_string(),
                            asset: asset.clone(),
                            amount: queued,
                        },
                    );
                    (paid, queued, Some(request_id))
                }
            };

            let paid_native = state.assets.to_native(asset, paid_internal)?;
            tracing::debug!(
                account = caller,
                asset = %asset,
                %amount,
                %burned,
                %paid_native,
                %queued,
                "withdraw"
            );
            Ok(WithdrawalOutcome {
                burned_principal: burned,
                paid_native,
                queued,
                request_id,
            })
        })
    }

    /// Transfers principal from `caller` to `to`.
    pub fn transfer(
        &mut self,
        caller: &str,
        to: &str,
        principal: u128,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.transact(|state| {
            state.governance.require_not_paused()?;
            state.ledger.transfer(caller, to, principal)?;
            state.record(
                now,
                Event::Transferred {
                    from: caller.to_string(),
                    to: to.to_string(),
                    principal,
                },
            );
            Ok(())
        })
    }

    /// Transfers principal from `owner` to `to`, spending `caller`'s
    /// allowance.
    pub fn transfer_from(
        &mut self,
        caller: &str,
        owner: &str,
        to: &str,
        principal: u128,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.transact(|state| {
            state.governance.require_not_paused()?;
            state.ledger.transfer_from(caller, owner, to, principal)?;
            state.record(
                now,
                Event::Transferred {
                    from: owner.to_string(),
                    to: to.to_string(),
                    principal,
                },
            );
            Ok(())
        })
    }

    /// Sets the allowance from `caller` to `spender`.
    pub fn approve(
        &mut self,
        caller: &str,
        spender: &str,
        principal: u128,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.transact(|state| {
            state.governance.require_not_paused()?;
            state.ledger.approve(caller, spender, principal)?;
            state.record(
                now,
                Event::Approved {
                    owner: caller.to_string(),
                    spender: spender.to_string(),
                    principal,
                },
            );
            Ok(())
        })
    }

    /// Raises the allowance from `caller` to `spender` by `delta`.
    pub fn increase_allowance(
        &mut self,
        caller: &str,
        spender: &str,
        delta: u128,
        now: DateTime<Utc>,
    ) -> Result<u128, EngineError> {
        self.transact(|state| {
            state.governance.require_not_paused()?;
            let new = state.ledger.increase_allowance(caller, spender, delta)?;
            state.record(
                now,
                Event::Approved {
                    owner: caller.to_string(),
                    spender: spender.to_string(),
                    principal: new,
                },
            );
            Ok(new)
        })
    }

    /// Lowers the allowance from `caller` to `spender` by `delta`.
    pub fn decrease_allowance(
        &mut self,
        caller: &str,
        spender: &str,
        delta: u128,
        now: DateTime<Utc>,
    ) -> Result<u128, EngineError> {
        self.transact(|state| {
            state.governance.require_not_paused()?;
            let new = state.ledger.decrease_allowance(caller, spender, delta)?;
            state.record(
                now,
                Event::Approved {
                    owner: caller.to_string(),
                    spender: spender.to_string(),
                    principal: new,
                },
            );
            Ok(new)
        })
    }

    /// Recomputes the persisted ratio if the throttle window has elapsed.
    /// Callable by anyone; rejected while paused.
    pub fn update_ratio(&mut self, now: DateTime<Utc>) -> Result<bool, EngineError> {
        self.transact(|state| {
            state.governance.require_not_paused()?;
            Ok(state.rate.update_ratio(now)?)
        })
    }

    /// Recognizes external liquidity into the buffer without minting any
    /// claim: the settlement-side top-up path (position tokens moved into
    /// the vault, treasury refills). Not pause-gated; adding liquidity is
    /// never the dangerous direction.
    pub fn donate_liquidity(
        &mut self,
        asset: &AssetId,
        raw_amount: u128,
        now: DateTime<Utc>,
    ) -> Result<u128, EngineError> {
        self.transact(|state| {
            if raw_amount == 0 {
                return Err(LedgerError::ZeroAmount.into());
            }
            let internal = state.assets.to_internal(asset, raw_amount)?;
            state.buffer.credit(asset.clone(), internal);
            state.record(
                now,
                Event::LiquidityDonated {
                    asset: asset.clone(),
                    internal_amount: internal,
                },
            );
            Ok(internal)
        })
    }

    /// Runs one settlement pass: drains the withdrawal queue as far as
    /// on-hand funds plus the external `source` allow. Never fails; with
    /// nothing payable it reports zero payments.
    pub fn satisfy_withdrawals(
        &mut self,
        source: &mut dyn LiquiditySource,
        now: DateTime<Utc>,
    ) -> Result<SettlementReport, EngineError> {
        // No transact() here: the pass cannot fail mid-way (it pays what
        // it can and stops), and the external source's state could not be
        // rolled back anyway.
        let report = self.state.buffer.satisfy_withdrawals(source);
        for payment in &report.payments {
            self.state.record(
                now,
                Event::WithdrawalSettled {
                    request_id: payment.request_id,
                    account: payment.account.clone(),
                    asset: payment.asset.clone(),
                    amount: payment.amount,
                    completed: payment.completed,
                },
            );
        }
        if !report.payments.is_empty() {
            tracing::debug!(
                payments = report.payments.len(),
                total_paid = %report.total_paid(),
                remaining = report.remaining,
                "settlement pass"
            );
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Governance Dispatch
    // -----------------------------------------------------------------------

    /// Executes a privileged command. Only the governance wallet may call;
    /// individual commands add their own constraints (contract-account
    /// rule, one-shot migration guard).
    ///
    /// Governance is deliberately *not* pause-gated: pausing must never
    /// lock governance out of unpausing.
    pub fn execute(
        &mut self,
        caller: &str,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.transact(|state| {
            state.governance.require_wallet(caller)?;

            match command {
                Command::SetInterest {
                    annual_bps,
                    interest_per_second,
                } => {
                    let (old_bps, old_ps) =
                        state.rate.set_interest(annual_bps, interest_per_second, now)?;
                    state.record(
                        now,
                        Event::InterestChanged {
                            old_annual_bps: old_bps,
                            new_annual_bps: annual_bps,
                            old_interest_per_second: old_ps,
                            new_interest_per_second: interest_per_second,
                        },
                    );
                }
                Command::SetUpdateTimeLimit { secs } => {
                    let old = state.rate.set_update_time_limit(secs)?;
                    state.record(
                        now,
                        Event::UpdateTimeLimitChanged {
                            old_secs: old,
                            new_secs: secs,
                        },
                    );
                }
                Command::SetWallet { wallet } => {
                    let old = state
                        .governance
                        .set_wallet(wallet.clone(), &state.contracts)?;
                    state.record(now, Event::WalletChanged { old, new: wallet });
                }
                Command::RegisterAsset {
                    asset,
                    decimals,
                    enabled,
                } => {
                    state.assets.register(asset.clone(), decimals, enabled)?;
                    state.record(
                        now,
                        Event::AssetRegistered {
                            asset,
                            decimals,
                            enabled,
                        },
                    );
                }
                Command::ChangeAssetStatus { asset, enabled } => {
                    state.assets.set_status(&asset, enabled)?;
                    state.record(now, Event::AssetStatusChanged { asset, enabled });
                }
                Command::GrantRole { role, account } => {
                    state
                        .governance
                        .grant_role(role, &account, &state.contracts)?;
                    state.record(now, Event::RoleGranted { role, account });
                }
                Command::RevokeRole { role, account } => {
                    state.governance.revoke_role(role, &account);
                    state.record(now, Event::RoleRevoked { role, account });
                }
                Command::Pause => {
                    state.governance.pause()?;
                    state.record(now, Event::Paused);
                }
                Command::Unpause => {
                    state.governance.unpause()?;
                    state.record(now, Event::Unpaused);
                }
                Command::MigrateLegacy { entries } => {
                    if state.legacy_migrated {
                        return Err(MigrationError::AlreadyMigrated.into());
                    }
                    state.rate.update_ratio(now)?;
                    let minted =
                        migration::migrate_legacy(&mut state.ledger, &state.rate, &entries)?;
                    state.legacy_migrated = true;
                    state.record(
                        now,
                        Event::LegacyMigrated {
                            accounts: entries.len(),
                            minted_principal: minted,
                        },
                    );
                }
            }

            tracing::info!(caller, "governance command executed");
            Ok(())
        })
    }
}
