//! # Principal Ledger
//!
//! Fungible balance and allowance bookkeeping in *principal* units: the
//! raw deposited-value share, not the time-adjusted redeemable value.
//! Principal is what transfers; yield rides along for free because every
//! holder's redeemable value is `principal * growing_ratio`.
//!
//! This module is deliberately ratio-blind. Converting between principal
//! and redeemable value is the engine's job; here a unit is a unit, and
//! the only invariants are the accounting ones:
//!
//! - no balance ever goes negative,
//! - `total_supply` always equals the sum of all balances,
//! - allowances never underflow, and nothing is owned by the zero identity.
//!
//! The API is ERC20-shaped (`mint`/`burn`/`transfer`/`approve` plus the
//! allowance increments) because every wallet and indexer on the planet
//! already speaks that dialect.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::config::{TOKEN_DECIMALS, TOKEN_NAME, TOKEN_SYMBOL};

/// An account identity. The empty string is the zero identity, which can
/// own nothing and receive nothing.
pub type Address = String;

/// Returns `true` for the zero identity.
pub fn is_zero_address(address: &str) -> bool {
    address.is_empty()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from principal bookkeeping.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The zero identity appeared where a real account is required.
    #[error("the zero address cannot take part in this operation")]
    ZeroAddress,

    /// A zero amount is a no-op and almost certainly a caller bug.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// Attempted to move or burn more principal than the account holds.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The account's current principal.
        available: u128,
        /// The principal the operation needed.
        requested: u128,
    },

    /// Attempted to spend or decrease more allowance than was granted.
    #[error("insufficient allowance: available {available}, requested {requested}")]
    InsufficientAllowance {
        /// The current allowance.
        available: u128,
        /// The amount the operation needed.
        requested: u128,
    },

    /// A credit would overflow u128. Nobody holds 3.4e38 attounits; this
    /// is a bug or an attack, either way it aborts.
    #[error("balance overflow: current {current}, credit {credit}")]
    Overflow {
        /// Balance before the failed credit.
        current: u128,
        /// The amount that caused the overflow.
        credit: u128,
    },
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Principal balances, allowances, and token metadata for the pool claim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ledger {
    /// Token name, for display and indexing.
    name: String,

    /// Token symbol.
    symbol: String,

    /// Fractional digits of the claim token (always the internal 18).
    decimals: u8,

    /// Principal balances. Accounts with zero balance may be absent.
    accounts: HashMap<Address, u128>,

    /// Allowances: owner -> spender -> amount.
    allowances: HashMap<Address, HashMap<Address, u128>>,

    /// Sum of all principal balances.
    total_supply: u128,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Creates an empty ledger with the protocol token metadata.
    pub fn new() -> Self {
        Self {
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            accounts: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
        }
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Token decimals.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Principal held by `account`. Zero for unknown accounts.
    pub fn balance_of(&self, account: &str) -> u128 {
        self.accounts.get(account).copied().unwrap_or(0)
    }

    /// Total principal in existence.
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Remaining allowance from `owner` to `spender`.
    pub fn allowance(&self, owner: &str, spender: &str) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|per_spender| per_spender.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Number of accounts with a balance entry.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    // -----------------------------------------------------------------------
    // Supply Changes
    // -----------------------------------------------------------------------

    /// Credits freshly minted principal to `to`.
    pub fn mint(&mut self, to: &str, principal: u128) -> Result<u128, LedgerError> {
        if is_zero_address(to) {
            return Err(LedgerError::ZeroAddress);
        }
        if principal == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let balance = self.accounts.entry(to.to_string()).or_insert(0);
        let new_balance = balance
            .checked_add(principal)
            .ok_or(LedgerError::Overflow {
                current: *balance,
                credit: principal,
            })?;
        *balance = new_balance;

        // total_supply == sum of balances, so if the balance fit, this fits.
        self.total_supply += principal;
        Ok(new_balance)
    }

    /// Burns principal from `from`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if the burn exceeds
    /// the account's balance.
    pub fn burn(&mut self, from: &str, principal: u128) -> Result<u128, LedgerError> {
        if is_zero_address(from) {
            return Err(LedgerError::ZeroAddress);
        }
        if principal == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let balance = self.accounts.get_mut(from).ok_or(
            LedgerError::InsufficientBalance {
                available: 0,
                requested: principal,
            },
        )?;
        if *balance < principal {
            return Err(LedgerError::InsufficientBalance {
                available: *balance,
                requested: principal,
            });
        }

        *balance -= principal;
        let remaining = *balance;
        self.total_supply -= principal;
        Ok(remaining)
    }

    // -----------------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------------

    /// Moves principal from `from` to `to`. Ratio-neutral: the receiver
    /// inherits the proportional future yield along with the principal.
    pub fn transfer(&mut self, from: &str, to: &str, principal: u128) -> Result<(), LedgerError> {
        if is_zero_address(from) || is_zero_address(to) {
            return Err(LedgerError::ZeroAddress);
        }
        if principal == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let from_balance = self.balance_of(from);
        if from_balance < principal {
            return Err(LedgerError::InsufficientBalance {
                available: from_balance,
                requested: principal,
            });
        }

        let to_balance = self.balance_of(to);
        let new_to = to_balance
            .checked_add(principal)
            .ok_or(LedgerError::Overflow {
                current: to_balance,
                credit: principal,
            })?;

        // All checks passed; both writes or neither.
        self.accounts.insert(from.to_string(), from_balance - principal);
        self.accounts.insert(to.to_string(), new_to);
        Ok(())
    }

    /// Consumes allowance and then moves principal. The standard
    /// `transferFrom` split: `spender` acts, `owner` pays.
    pub fn transfer_from(
        &mut self,
        spender: &str,
        owner: &str,
        to: &str,
        principal: u128,
    ) -> Result<(), LedgerError> {
        let allowed = self.allowance(owner, spender);
        if allowed < principal {
            return Err(LedgerError::InsufficientAllowance {
                available: allowed,
                requested: principal,
            });
        }

        self.transfer(owner, to, principal)?;

        // Transfer succeeded; burn the allowance.
        self.set_allowance(owner, spender, allowed - principal);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Allowances
    // -----------------------------------------------------------------------

    /// Sets the allowance from `owner` to `spender` to exactly `amount`.
    pub fn approve(&mut self, owner: &str, spender: &str, amount: u128) -> Result<(), LedgerError> {
        if is_zero_address(owner) || is_zero_address(spender) {
            return Err(LedgerError::ZeroAddress);
        }
        self.set_allowance(owner, spender, amount);
        Ok(())
    }

    /// Raises the allowance by `delta`. The increment form avoids the
    /// classic approve-race where a spender front-runs a re-approval.
    pub fn increase_allowance(
        &mut self,
        owner: &str,
        spender: &str,
        delta: u128,
    ) -> Result<u128, LedgerError> {
        if is_zero_address(owner) || is_zero_address(spender) {
            return Err(LedgerError::ZeroAddress);
        }
        let current = self.allowance(owner, spender);
        let new = current.checked_add(delta).ok_or(LedgerError::Overflow {
            current,
            credit: delta,
        })?;
        self.set_allowance(owner, spender, new);
        Ok(new)
    }

    /// Lowers the allowance by `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientAllowance`] if the decrease
    /// would drive the allowance below zero.
    pub fn decrease_allowance(
        &mut self,
        owner: &str,
        spender: &str,
        delta: u128,
    ) -> Result<u128, LedgerError> {
        if is_zero_address(owner) || is_zero_address(spender) {
            return Err(LedgerError::ZeroAddress);
        }
        let current = self.allowance(owner, spender);
        if current < delta {
            return Err(LedgerError::InsufficientAllowance {
                available: current,
                requested: delta,
            });
        }
        let new = current - delta;
        self.set_allowance(owner, spender, new);
        Ok(new)
    }

    fn set_allowance(&mut self, owner: &str, spender: &str, amount: u128) {
        if amount == 0 {
            if let Some(per_spender) = self.allowances.get_mut(owner) {
                per_spender.remove(spender);
                if per_spender.is_empty() {
                    self.allowances.remove(owner);
                }
            }
        } else {
            self.allowances
                .entry(owner.to_string())
                .or_default()
                .insert(spender.to_string(), amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "swell:alice";
    const BOB: &str = "swell:bob";
    const CAROL: &str = "swell:carol";

    #[test]
    fn new_ledger_is_empty() {
        let ledger = Ledger::new();
        assert_eq!(ledger.total_supply(), 0);
        assert_eq!(ledger.balance_of(ALICE), 0);
        assert_eq!(ledger.name(), TOKEN_NAME);
        assert_eq!(ledger.symbol(), TOKEN_SYMBOL);
        assert_eq!(ledger.decimals(), 18);
    }

    #[test]
    fn mint_credits_balance_and_supply() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.mint(ALICE, 5_000).unwrap(), 5_000);
        assert_eq!(ledger.balance_of(ALICE), 5_000);
        assert_eq!(ledger.total_supply(), 5_000);
    }

    #[test]
    fn mint_to_zero_address_rejected() {
        let mut ledger = Ledger::new();
        assert!(matches!(ledger.mint("", 100), Err(LedgerError::ZeroAddress)));
    }

    #[test]
    fn burn_exceeding_balance_rejected() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 100).unwrap();
        let result = ledger.burn(ALICE, 200);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance {
                available: 100,
                requested: 200
            })
        ));
        // Failed burn must not change state.
        assert_eq!(ledger.balance_of(ALICE), 100);
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn supply_tracks_mints_and_burns() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 1_000).unwrap();
        ledger.mint(BOB, 2_000).unwrap();
        ledger.burn(ALICE, 400).unwrap();
        assert_eq!(ledger.total_supply(), 2_600);
        assert_eq!(
            ledger.balance_of(ALICE) + ledger.balance_of(BOB),
            ledger.total_supply()
        );
    }

    #[test]
    fn transfer_moves_principal() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 50).unwrap();
        ledger.transfer(ALICE, BOB, 25).unwrap();
        assert_eq!(ledger.balance_of(ALICE), 25);
        assert_eq!(ledger.balance_of(BOB), 25);
        assert_eq!(ledger.total_supply(), 50);
    }

    #[test]
    fn transfer_to_zero_address_rejected() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 100).unwrap();
        assert!(matches!(
            ledger.transfer(ALICE, "", 10),
            Err(LedgerError::ZeroAddress)
        ));
    }

    #[test]
    fn transfer_exceeding_balance_rejected() {
        let mut ledger = Ledger::new();
        let result = ledger.transfer(ALICE, BOB, 100);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn approve_and_transfer_from() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 100).unwrap();
        ledger.approve(ALICE, BOB, 50).unwrap();
        assert_eq!(ledger.allowance(ALICE, BOB), 50);

        ledger.transfer_from(BOB, ALICE, BOB, 50).unwrap();
        assert_eq!(ledger.balance_of(ALICE), 50);
        assert_eq!(ledger.balance_of(BOB), 50);
        assert_eq!(ledger.allowance(ALICE, BOB), 0);
    }

    #[test]
    fn transfer_from_exceeding_allowance_rejected() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 100).unwrap();
        let result = ledger.transfer_from(BOB, ALICE, BOB, 100);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn failed_transfer_from_keeps_allowance() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 10).unwrap();
        ledger.approve(ALICE, BOB, 100).unwrap();

        // Allowance is fine, balance is not.
        let result = ledger.transfer_from(BOB, ALICE, CAROL, 50);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.allowance(ALICE, BOB), 100);
    }

    #[test]
    fn approve_to_zero_address_rejected() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.approve(ALICE, "", 100),
            Err(LedgerError::ZeroAddress)
        ));
    }

    #[test]
    fn increase_and_decrease_allowance() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 100).unwrap();
        ledger.increase_allowance(ALICE, BOB, 50).unwrap();
        ledger.increase_allowance(ALICE, BOB, 20).unwrap();
        assert_eq!(ledger.allowance(ALICE, BOB), 70);

        ledger.decrease_allowance(ALICE, BOB, 10).unwrap();
        assert_eq!(ledger.allowance(ALICE, BOB), 60);
    }

    #[test]
    fn decrease_allowance_below_zero_rejected() {
        let mut ledger = Ledger::new();
        ledger.increase_allowance(ALICE, BOB, 10).unwrap();
        let result = ledger.decrease_allowance(ALICE, BOB, 50);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientAllowance {
                available: 10,
                requested: 50
            })
        ));
    }

    #[test]
    fn zero_amount_transfer_rejected() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 100).unwrap();
        assert!(matches!(
            ledger.transfer(ALICE, BOB, 0),
            Err(LedgerError::ZeroAmount)
        ));
    }

    #[test]
    fn ledger_serialization_roundtrip() {
        let mut ledger = Ledger::new();
        ledger.mint(ALICE, 42_000).unwrap();
        ledger.approve(ALICE, BOB, 1_000).unwrap();

        let json = serde_json::to_string(&ledger).expect("serialize");
        let recovered: Ledger = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(recovered.balance_of(ALICE), 42_000);
        assert_eq!(recovered.allowance(ALICE, BOB), 1_000);
        assert_eq!(recovered.total_supply(), 42_000);
    }
}
