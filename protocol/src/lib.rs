// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # SWELL Protocol — Core Library
//!
//! SWELL is a pooled-liquidity ledger: users deposit whitelisted stable
//! assets, receive a fungible claim denominated in *principal* units, and
//! the redeemable value of that claim grows over time according to a
//! governed interest rate. Redemptions are paid from an on-hand buffer,
//! topped up from an external liquidity source, and queued when neither
//! can cover them right now.
//!
//! ## Architecture
//!
//! The library is split into modules that mirror the actual concerns of a
//! yield-bearing settlement ledger:
//!
//! - **math** -- u128 fixed-point arithmetic. Floor rounding, no floats.
//! - **assets** -- asset registry and decimal normalization (6 vs 18 digits).
//! - **rate** -- the growing ratio: throttled compounding, pure projection,
//!   governed rate swaps.
//! - **ledger** -- principal balances and allowances. ERC20-shaped and
//!   ratio-neutral: transferring principal transfers future yield with it.
//! - **buffer** -- settlement liquidity, the withdrawal queue, and the
//!   external liquidity source interface.
//! - **governance** -- who may change what, and the contract-account rule.
//! - **events** -- the append-only record external indexers consume.
//! - **migration** -- the one-shot legacy balance conversion.
//! - **engine** -- the single owned store and every external operation.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over performance. This code moves money.
//! 2. Every mutating call commits wholesale or not at all.
//! 3. Rounding never pays out more than was deposited: floor in the pool's
//!    favor and call the remainder dust.
//! 4. If it touches money, it has tests. Plural.

pub mod assets;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod events;
pub mod governance;
pub mod ledger;
pub mod math;
pub mod migration;
pub mod rate;
