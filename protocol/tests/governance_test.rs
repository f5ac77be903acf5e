//! Integration tests for governance: the command dispatch, the
//! contract-account rule, pause semantics, and the one-shot migration.

use chrono::{DateTime, Duration, TimeZone, Utc};
use swell_protocol::assets::{AssetError, AssetId};
use swell_protocol::buffer::ReservePool;
use swell_protocol::engine::{EngineError, LiquidityEngine};
use swell_protocol::events::Event;
use swell_protocol::governance::{Command, ContractRegistry, GovernanceError, Role};
use swell_protocol::ledger::LedgerError;
use swell_protocol::math::SCALE;
use swell_protocol::migration::{LegacyBalance, MigrationError};

const MULTISIG: &str = "swell:multisig";
const TIMELOCK: &str = "swell:timelock";
const ALICE: &str = "swell:alice";
const BOB: &str = "swell:bob";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn dai() -> AssetId {
    AssetId::from("DAI")
}

fn usdt() -> AssetId {
    AssetId::from("USDT")
}

fn setup() -> LiquidityEngine {
    let mut contracts = ContractRegistry::new();
    contracts.register(MULTISIG);
    contracts.register(TIMELOCK);
    let mut engine = LiquidityEngine::new(MULTISIG.to_string(), contracts, t0()).unwrap();
    engine
        .execute(
            MULTISIG,
            Command::RegisterAsset {
                asset: dai(),
                decimals: 18,
                enabled: true,
            },
            t0(),
        )
        .unwrap();
    engine
        .execute(
            MULTISIG,
            Command::RegisterAsset {
                asset: usdt(),
                decimals: 6,
                enabled: false,
            },
            t0(),
        )
        .unwrap();
    engine
}

fn is_paused_err(result: Result<impl std::fmt::Debug, EngineError>) -> bool {
    matches!(
        result,
        Err(EngineError::Governance(GovernanceError::Paused))
    )
}

// ---------------------------------------------------------------------------
// The Contract-Account Rule
// ---------------------------------------------------------------------------

#[test]
fn admin_role_cannot_go_to_an_eoa() {
    let mut engine = setup();
    let result = engine.execute(
        MULTISIG,
        Command::GrantRole {
            role: Role::Admin,
            account: ALICE.to_string(),
        },
        t0(),
    );
    assert!(matches!(
        result,
        Err(EngineError::Governance(GovernanceError::NotContract { .. }))
    ));
    assert!(!engine.state().governance.has_role(Role::Admin, ALICE));
}

#[test]
fn admin_role_goes_to_a_contract() {
    let mut engine = setup();
    engine
        .execute(
            MULTISIG,
            Command::GrantRole {
                role: Role::Admin,
                account: TIMELOCK.to_string(),
            },
            t0(),
        )
        .unwrap();
    assert!(engine.state().governance.has_role(Role::Admin, TIMELOCK));
}

#[test]
fn operator_role_goes_to_anyone() {
    let mut engine = setup();
    engine
        .execute(
            MULTISIG,
            Command::GrantRole {
                role: Role::Operator,
                account: ALICE.to_string(),
            },
            t0(),
        )
        .unwrap();
    assert!(engine.state().governance.has_role(Role::Operator, ALICE));
}

#[test]
fn wallet_rotation_respects_the_rule_and_moves_authority() {
    let mut engine = setup();

    // To an EOA: refused.
    let result = engine.execute(
        MULTISIG,
        Command::SetWallet {
            wallet: ALICE.to_string(),
        },
        t0(),
    );
    assert!(matches!(
        result,
        Err(EngineError::Governance(GovernanceError::NotContract { .. }))
    ));

    // To a contract: accepted, and authority moves wholesale.
    engine
        .execute(
            MULTISIG,
            Command::SetWallet {
                wallet: TIMELOCK.to_string(),
            },
            t0(),
        )
        .unwrap();

    let last = &engine.events().last().unwrap().event;
    assert_eq!(
        *last,
        Event::WalletChanged {
            old: MULTISIG.to_string(),
            new: TIMELOCK.to_string(),
        }
    );

    // The old wallet is out, the new one is in.
    assert!(matches!(
        engine.execute(MULTISIG, Command::Pause, t0()),
        Err(EngineError::Governance(GovernanceError::NotWallet { .. }))
    ));
    engine.execute(TIMELOCK, Command::Pause, t0()).unwrap();
    assert!(engine.is_paused());
}

// ---------------------------------------------------------------------------
// Pause
// ---------------------------------------------------------------------------

#[test]
fn pause_rejects_every_mutation_and_no_query() {
    let mut engine = setup();
    engine.deposit(ALICE, &dai(), 100 * SCALE, t0()).unwrap();
    engine.execute(MULTISIG, Command::Pause, t0()).unwrap();

    let now = t0() + Duration::seconds(120);
    assert!(is_paused_err(engine.deposit(ALICE, &dai(), SCALE, now)));
    assert!(is_paused_err(engine.withdraw(ALICE, &dai(), SCALE, now)));
    assert!(is_paused_err(engine.transfer(ALICE, BOB, SCALE, now)));
    assert!(is_paused_err(engine.transfer_from(BOB, ALICE, BOB, SCALE, now)));
    assert!(is_paused_err(engine.approve(ALICE, BOB, SCALE, now)));
    assert!(is_paused_err(engine.increase_allowance(ALICE, BOB, SCALE, now)));
    assert!(is_paused_err(engine.decrease_allowance(ALICE, BOB, SCALE, now)));
    assert!(is_paused_err(engine.update_ratio(now)));

    // Queries keep answering while paused.
    assert_eq!(engine.balance_of(ALICE), 100 * SCALE);
    assert!(engine.get_balance(ALICE, now).unwrap() > 0);
    assert_eq!(engine.allowance(ALICE, BOB), 0);
    assert_eq!(engine.growing_ratio(), SCALE);

    // Settlement is not pause-gated: draining existing obligations stays
    // possible even during a halt.
    let mut pool = ReservePool::new();
    assert!(engine.satisfy_withdrawals(&mut pool, now).is_ok());

    // Unpause restores the lot.
    engine.execute(MULTISIG, Command::Unpause, now).unwrap();
    engine.deposit(ALICE, &dai(), SCALE, now).unwrap();
}

// ---------------------------------------------------------------------------
// Rate Governance
// ---------------------------------------------------------------------------

#[test]
fn set_interest_records_old_and_new_pairs() {
    let mut engine = setup();
    let new_per_second: u128 = 1_000_000_004_706_367_490;
    engine
        .execute(
            MULTISIG,
            Command::SetInterest {
                annual_bps: 1_600,
                interest_per_second: new_per_second,
            },
            t0(),
        )
        .unwrap();

    let last = &engine.events().last().unwrap().event;
    assert_eq!(
        *last,
        Event::InterestChanged {
            old_annual_bps: 800,
            new_annual_bps: 1_600,
            old_interest_per_second: 1_000_000_002_440_410_000,
            new_interest_per_second: new_per_second,
        }
    );
    assert_eq!(engine.annual_interest_bps(), 1_600);
}

#[test]
fn set_update_time_limit_widens_the_throttle() {
    let mut engine = setup();
    engine
        .execute(MULTISIG, Command::SetUpdateTimeLimit { secs: 120 }, t0())
        .unwrap();

    let last = &engine.events().last().unwrap().event;
    assert_eq!(
        *last,
        Event::UpdateTimeLimitChanged {
            old_secs: 60,
            new_secs: 120,
        }
    );

    // 70 seconds in: would have updated under the old 60-second window,
    // stays throttled under the new one.
    assert!(!engine.update_ratio(t0() + Duration::seconds(70)).unwrap());
    assert!(engine.update_ratio(t0() + Duration::seconds(120)).unwrap());
}

// ---------------------------------------------------------------------------
// Asset Status
// ---------------------------------------------------------------------------

#[test]
fn enabling_an_asset_opens_deposits() {
    let mut engine = setup();

    let result = engine.deposit(ALICE, &usdt(), 135_300_000, t0());
    assert!(matches!(
        result,
        Err(EngineError::Asset(AssetError::AssetNotEnabled(_)))
    ));

    engine
        .execute(
            MULTISIG,
            Command::ChangeAssetStatus {
                asset: usdt(),
                enabled: true,
            },
            t0(),
        )
        .unwrap();

    let minted = engine.deposit(ALICE, &usdt(), 135_300_000, t0()).unwrap();
    assert_eq!(minted, 1_353 * SCALE / 10);
    assert_eq!(engine.balance_of(ALICE), 1_353 * SCALE / 10);
}

// ---------------------------------------------------------------------------
// ERC20 Failure Modes Through the Engine
// ---------------------------------------------------------------------------

#[test]
fn zero_address_and_balance_failures_surface_typed_errors() {
    let mut engine = setup();
    engine.deposit(ALICE, &dai(), 100 * SCALE, t0()).unwrap();

    assert!(matches!(
        engine.transfer(ALICE, "", 10 * SCALE, t0()),
        Err(EngineError::Ledger(LedgerError::ZeroAddress))
    ));
    assert!(matches!(
        engine.transfer(BOB, ALICE, 10 * SCALE, t0()),
        Err(EngineError::Ledger(LedgerError::InsufficientBalance { .. }))
    ));
    assert!(matches!(
        engine.transfer_from(BOB, ALICE, BOB, 10 * SCALE, t0()),
        Err(EngineError::Ledger(LedgerError::InsufficientAllowance { .. }))
    ));
    assert!(matches!(
        engine.withdraw(ALICE, &dai(), 200 * SCALE, t0()),
        Err(EngineError::Ledger(LedgerError::InsufficientBalance { .. }))
    ));

    // The full allowance dance: grant, overdraw, top up, spend, then an
    // over-decrease is refused.
    engine.increase_allowance(ALICE, BOB, 50 * SCALE, t0()).unwrap();
    assert!(matches!(
        engine.transfer_from(BOB, ALICE, BOB, 60 * SCALE, t0()),
        Err(EngineError::Ledger(LedgerError::InsufficientAllowance { .. }))
    ));
    engine.increase_allowance(ALICE, BOB, 20 * SCALE, t0()).unwrap();
    engine.decrease_allowance(ALICE, BOB, 10 * SCALE, t0()).unwrap();
    engine
        .transfer_from(BOB, ALICE, BOB, 60 * SCALE, t0())
        .unwrap();
    assert!(matches!(
        engine.decrease_allowance(ALICE, BOB, 50 * SCALE, t0()),
        Err(EngineError::Ledger(LedgerError::InsufficientAllowance { .. }))
    ));
    assert_eq!(engine.balance_of(ALICE), 40 * SCALE);
    assert_eq!(engine.balance_of(BOB), 60 * SCALE);
}

// ---------------------------------------------------------------------------
// Legacy Migration
// ---------------------------------------------------------------------------

#[test]
fn migration_mints_principal_at_current_ratio_exactly_once() {
    let mut engine = setup();
    let one_year = t0() + Duration::days(365);

    // Legacy accrued values arrive after a year of ratio growth.
    engine
        .execute(
            MULTISIG,
            Command::MigrateLegacy {
                entries: vec![
                    LegacyBalance {
                        account: ALICE.to_string(),
                        accrued_value: 108 * SCALE,
                    },
                    LegacyBalance {
                        account: BOB.to_string(),
                        accrued_value: 54 * SCALE,
                    },
                ],
            },
            one_year,
        )
        .unwrap();

    // Alice's 108 at ratio ~1.08 is ~100 principal; her redeemable value
    // stays ~108.
    let alice_principal = engine.balance_of(ALICE);
    assert!(alice_principal > 99_900_000_000_000_000_000);
    assert!(alice_principal < 100_100_000_000_000_000_000);

    let alice_value = engine.get_balance_for_withdraw(ALICE).unwrap();
    assert!(alice_value > 107_900_000_000_000_000_000);
    assert!(alice_value < 108_100_000_000_000_000_000);

    assert_eq!(
        engine.total_supply(),
        engine.balance_of(ALICE) + engine.balance_of(BOB)
    );

    // One-shot: a second migration is refused.
    let again = engine.execute(
        MULTISIG,
        Command::MigrateLegacy { entries: vec![] },
        one_year,
    );
    assert!(matches!(
        again,
        Err(EngineError::Migration(MigrationError::AlreadyMigrated))
    ));
}

#[test]
fn migration_is_wallet_gated() {
    let mut engine = setup();
    let result = engine.execute(
        ALICE,
        Command::MigrateLegacy { entries: vec![] },
        t0(),
    );
    assert!(matches!(
        result,
        Err(EngineError::Governance(GovernanceError::NotWallet { .. }))
    ));
}
