//! # Governance Gate
//!
//! Every privileged state change in SWELL flows through this module as a
//! typed [`Command`]: one variant per privileged operation, dispatched
//! through a single authorization check. No opaque calldata blobs to
//! decode, no dynamic dispatch on byte payloads.
//!
//! ## The Contract-Account Rule
//!
//! The top administrative role concentrates enough power that it must
//! never sit on an individually-controlled key. Two checks enforce this:
//!
//! - granting [`Role::Admin`] to an identity not known to be a contract
//!   account fails with `NotContract`;
//! - rotating the governance wallet to a non-contract identity fails the
//!   same way. The wallet *is* the admin path, so the rule applies to it
//!   first.
//!
//! Whether an identity is a contract account is answered by the
//! [`ContractRegistry`], the in-process stand-in for a code-presence
//! probe: deployment tooling registers contract identities as it creates
//! them.
//!
//! ## Pause
//!
//! The global halt flag lives here because pausing is itself a privileged
//! operation. The engine consults [`GovernanceGate::require_not_paused`]
//! at the top of every state-mutating entry point; queries never check it.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::assets::AssetId;
use crate::ledger::Address;
use crate::migration::LegacyBalance;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from authorization and privileged-state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    /// The caller is not the governance wallet.
    #[error("caller {caller} is not the governance wallet")]
    NotWallet {
        /// The identity that attempted the call.
        caller: Address,
    },

    /// The target of an admin grant or wallet rotation is not a verified
    /// contract account.
    #[error("{account} is not a contract account")]
    NotContract {
        /// The offending identity.
        account: Address,
    },

    /// The ledger is paused; state-mutating calls are rejected.
    #[error("ledger is paused")]
    Paused,

    /// Pause requested while already paused.
    #[error("ledger is already paused")]
    AlreadyPaused,

    /// Unpause requested while not paused.
    #[error("ledger is not paused")]
    NotPaused,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Privileged roles on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Unrestricted administrative power. May only be held by contract
    /// accounts.
    Admin,

    /// Operational role (maintenance tasks, migrations tooling). Carries
    /// no contract-account restriction.
    Operator,
}

impl Role {
    /// Whether this role may only be held by contract accounts.
    pub fn contract_only(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

// ---------------------------------------------------------------------------
// ContractRegistry
// ---------------------------------------------------------------------------

/// The set of identities verified to be contract accounts.
///
/// Stand-in for an on-chain code-presence probe: instead of checking
/// deployed bytecode, deployment tooling registers contract identities
/// here and the gate consults the set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContractRegistry {
    contracts: HashSet<Address>,
}

impl ContractRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `account` as a verified contract identity.
    pub fn register(&mut self, account: impl Into<Address>) {
        self.contracts.insert(account.into());
    }

    /// Whether `account` is a verified contract identity.
    pub fn is_contract(&self, account: &str) -> bool {
        self.contracts.contains(account)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// The privileged operations, one variant each.
///
/// Serializable so governance tooling can prepare, review, and replay
/// command payloads out of band.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Replace the interest rate pair, flushing accrual under the old
    /// rate first.
    SetInterest {
        /// New advertised annual rate in basis points.
        annual_bps: u32,
        /// New per-second compound factor, 1e18 scale.
        interest_per_second: u128,
    },
    /// Change the ratio-update throttle window.
    SetUpdateTimeLimit {
        /// New window in seconds.
        secs: i64,
    },
    /// Rotate the governance wallet identity.
    SetWallet {
        /// The new wallet. Must be a contract account.
        wallet: Address,
    },
    /// Add an asset to the registry.
    RegisterAsset {
        /// Asset identifier.
        asset: AssetId,
        /// Native fractional digits.
        decimals: u32,
        /// Whether deposits are accepted immediately.
        enabled: bool,
    },
    /// Toggle an asset's deposit eligibility.
    ChangeAssetStatus {
        /// Asset identifier.
        asset: AssetId,
        /// New eligibility flag.
        enabled: bool,
    },
    /// Grant a role. Admin grants require a contract-account grantee.
    GrantRole {
        /// The role to grant.
        role: Role,
        /// The grantee.
        account: Address,
    },
    /// Revoke a role. Revoking a role the account does not hold is a
    /// no-op.
    RevokeRole {
        /// The role to revoke.
        role: Role,
        /// The holder.
        account: Address,
    },
    /// Halt all state-mutating user operations.
    Pause,
    /// Lift the halt.
    Unpause,
    /// One-shot conversion of legacy accrued-value balances into
    /// principal at the current ratio.
    MigrateLegacy {
        /// The legacy balances to convert.
        entries: Vec<LegacyBalance>,
    },
}

// ---------------------------------------------------------------------------
// GovernanceGate
// ---------------------------------------------------------------------------

/// Authorization state: the wallet identity, role grants, and the pause
/// flag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceGate {
    /// The governance wallet. Always a contract account.
    wallet: Address,

    /// Role grants.
    roles: HashMap<Role, HashSet<Address>>,

    /// Global halt flag.
    paused: bool,
}

impl GovernanceGate {
    /// Creates a gate with `wallet` as the governance identity, holding
    /// the admin role. The caller (the engine constructor) is responsible
    /// for verifying the wallet against the contract registry first.
    pub fn new(wallet: Address) -> Self {
        let mut roles: HashMap<Role, HashSet<Address>> = HashMap::new();
        roles.entry(Role::Admin).or_default().insert(wallet.clone());
        Self {
            wallet,
            roles,
            paused: false,
        }
    }

    /// The current governance wallet.
    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    /// Whether the ledger is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether `account` holds `role`.
    pub fn has_role(&self, role: Role, account: &str) -> bool {
        self.roles
            .get(&role)
            .map(|holders| holders.contains(account))
            .unwrap_or(false)
    }

    /// Fails unless `caller` is the governance wallet.
    pub fn require_wallet(&self, caller: &str) -> Result<(), GovernanceError> {
        if caller != self.wallet {
            return Err(GovernanceError::NotWallet {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }

    /// Fails if the ledger is paused.
    pub fn require_not_paused(&self) -> Result<(), GovernanceError> {
        if self.paused {
            return Err(GovernanceError::Paused);
        }
        Ok(())
    }

    /// Grants `role` to `account`, enforcing the contract-account rule
    /// for contract-only roles.
    pub fn grant_role(
        &mut self,
        role: Role,
        account: &str,
        contracts: &ContractRegistry,
    ) -> Result<(), GovernanceError> {
        if role.contract_only() && !contracts.is_contract(account) {
            return Err(GovernanceError::NotContract {
                account: account.to_string(),
            });
        }
        self.roles
            .entry(role)
            .or_default()
            .insert(account.to_string());
        Ok(())
    }

    /// Revokes `role` from `account`. Revoking an absent grant is a no-op.
    pub fn revoke_role(&mut self, role: Role, account: &str) {
        if let Some(holders) = self.roles.get_mut(&role) {
            holders.remove(account);
        }
    }

    /// Rotates the governance wallet. The new wallet must be a contract
    /// account; it receives the admin role, and the old wallet keeps
    /// nothing.
    ///
    /// Returns the old wallet for event emission.
    pub fn set_wallet(
        &mut self,
        new_wallet: Address,
        contracts: &ContractRegistry,
    ) -> Result<Address, GovernanceError> {
        if !contracts.is_contract(&new_wallet) {
            return Err(GovernanceError::NotContract {
                account: new_wallet,
            });
        }
        let old = std::mem::replace(&mut self.wallet, new_wallet.clone());
        let admins = self.roles.entry(Role::Admin).or_default();
        admins.remove(&old);
        admins.insert(new_wallet);
        Ok(old)
    }

    /// Sets the pause flag.
    pub fn pause(&mut self) -> Result<(), GovernanceError> {
        if self.paused {
            return Err(GovernanceError::AlreadyPaused);
        }
        self.paused = true;
        Ok(())
    }

    /// Clears the pause flag.
    pub fn unpause(&mut self) -> Result<(), GovernanceError> {
        if !self.paused {
            return Err(GovernanceError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }
}
