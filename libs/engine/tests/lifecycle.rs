//! Pool lifecycle: create, margin, liquidity and swaps

mod common;

use common::*;
use rmm_engine::{EngineError, EngineEvent, Margin, PoolState};
use rmm_types::FixedPoint64x64;

#[test]
fn test_create_reference_pool() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");

    let outcome = fixture.create_pool(&alice);

    assert_eq!(outcome.pool_id, fixture.pool_id());
    assert_eq!(outcome.delta_risky, WAD / 2);
    // 1000 · Φ(−σ√τ) with τ = 31_536_000 / 31_556_952 years
    assert!(
        outcome.delta_stable > 158_730 * WAD / 1_000 && outcome.delta_stable < 158_740 * WAD / 1_000,
        "delta_stable = {}",
        outcome.delta_stable
    );
    assert_eq!(outcome.liquidity, LIQUIDITY);

    let pool_id = outcome.pool_id;
    let reserve = fixture.engine.reserve(&pool_id).unwrap();
    assert_eq!(reserve.reserve_risky, outcome.delta_risky);
    assert_eq!(reserve.reserve_stable, outcome.delta_stable);
    assert_eq!(reserve.liquidity, LIQUIDITY);

    let calibration = fixture.engine.calibration(&pool_id).unwrap();
    assert_eq!(calibration.last_timestamp, START);
    assert_eq!(calibration.tau(), TERM);

    let position = fixture.engine.position(alice.address, pool_id);
    assert_eq!(position.liquidity, LIQUIDITY - 1_000);

    assert_eq!(
        fixture.engine_balances(),
        (outcome.delta_risky, outcome.delta_stable)
    );
    assert_eq!(fixture.engine.pool_ids(), vec![pool_id]);

    // Freshly created pools sit on the curve
    let invariant = fixture.engine.invariant_of(&pool_id).unwrap();
    assert!(invariant.to_f64().abs() < 1e-6, "k = {invariant}");
}

#[test]
fn test_create_rejects_duplicates_and_bad_calibrations() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;

    let engine = &fixture.engine;
    assert!(matches!(
        engine.create(&alice, STRIKE, SIGMA, MATURITY, DELTA, LIQUIDITY, &[]),
        Err(EngineError::PoolDuplicate { pool_id: id }) if id == pool_id
    ));
    assert!(matches!(
        engine.create(&alice, 0, SIGMA, MATURITY, DELTA, LIQUIDITY, &[]),
        Err(EngineError::Calibration { .. })
    ));
    assert!(matches!(
        engine.create(&alice, STRIKE, 0, MATURITY, DELTA, LIQUIDITY, &[]),
        Err(EngineError::Calibration { .. })
    ));
    assert!(matches!(
        engine.create(&alice, STRIKE, SIGMA, START, DELTA, LIQUIDITY, &[]),
        Err(EngineError::Calibration { .. })
    ));
    assert!(matches!(
        engine.create(&alice, STRIKE, SIGMA, MATURITY + 1, WAD, LIQUIDITY, &[]),
        Err(EngineError::Calibration { .. })
    ));
    assert!(matches!(
        engine.create(&alice, STRIKE, SIGMA, MATURITY + 1, DELTA, 1_000, &[]),
        Err(EngineError::ZeroLiquidity)
    ));
    assert_eq!(engine.pool_ids().len(), 1);
}

#[test]
fn test_underpaying_creator_is_rolled_back() {
    let fixture = Fixture::new();
    let mallory = fixture.trader("mallory").underpaying(1);

    let result = fixture
        .engine
        .create(&mallory, STRIKE, SIGMA, MATURITY, DELTA, LIQUIDITY, &[]);

    assert!(matches!(
        result,
        Err(EngineError::RiskyBalance { expected, actual }) if actual + 1 == expected
    ));
    assert!(fixture.engine.pool_ids().is_empty());
    assert_eq!(fixture.engine_balances(), (0, 0));
    assert_eq!(fixture.balances(mallory.address), (FUNDING, FUNDING));
    assert!(fixture.events.events().is_empty());
    assert!(!fixture.engine.is_locked());
}

#[test]
fn test_underpaid_deposit_is_rolled_back() {
    let fixture = Fixture::new();
    let mallory = fixture.trader("mallory").underpaying(1);

    let result = fixture
        .engine
        .deposit(&mallory, mallory.address, WAD, WAD, &[]);

    assert!(matches!(
        result,
        Err(EngineError::RiskyBalance { expected, actual }) if expected == WAD && actual == WAD - 1
    ));
    assert_eq!(fixture.engine.margin(mallory.address), Margin::default());
    assert_eq!(fixture.engine_balances(), (0, 0));
    assert_eq!(fixture.balances(mallory.address), (FUNDING, FUNDING));
    assert!(fixture.events.events().is_empty());
}

#[test]
fn test_underpaid_allocate_is_rolled_back() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let mallory = fixture.trader("mallory").underpaying(1);
    let pool_id = fixture.create_pool(&alice).pool_id;
    let reserve_before = fixture.engine.reserve(&pool_id).unwrap();
    let engine_before = fixture.engine_balances();
    fixture.events.take();

    let result = fixture
        .engine
        .allocate(&mallory, pool_id, mallory.address, WAD, false, &[]);

    assert!(matches!(result, Err(EngineError::RiskyBalance { .. })));
    assert_eq!(fixture.engine.reserve(&pool_id).unwrap(), reserve_before);
    assert_eq!(fixture.engine.position(mallory.address, pool_id).liquidity, 0);
    assert_eq!(fixture.engine_balances(), engine_before);
    assert_eq!(fixture.balances(mallory.address), (FUNDING, FUNDING));
    assert!(fixture.events.events().is_empty());
}

#[test]
fn test_allocate_zero_liquidity_fails() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;

    assert!(matches!(
        fixture
            .engine
            .allocate(&alice, pool_id, alice.address, 0, false, &[]),
        Err(EngineError::ZeroDeltas)
    ));
}

#[test]
fn test_allocate_requires_initialized_pool() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");

    assert!(matches!(
        fixture
            .engine
            .allocate(&alice, fixture.pool_id(), alice.address, WAD, false, &[]),
        Err(EngineError::Uninitialized { .. })
    ));
}

#[test]
fn test_allocate_then_remove_returns_at_most_what_was_paid() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let bob = fixture.trader("bob");
    let pool_id = fixture.create_pool(&alice).pool_id;
    let engine = &fixture.engine;
    let reserve_before = engine.reserve(&pool_id).unwrap();

    let allocated = engine
        .allocate(&bob, pool_id, bob.address, 3 * WAD, false, &[])
        .unwrap();
    assert_eq!(allocated.delta_risky, 3 * WAD / 2);
    assert_eq!(engine.position(bob.address, pool_id).liquidity, 3 * WAD);
    assert_eq!(
        fixture.balances(bob.address),
        (FUNDING - allocated.delta_risky, FUNDING - allocated.delta_stable)
    );

    let removed = engine.remove(bob.address, pool_id, 3 * WAD).unwrap();
    assert!(removed.delta_risky <= allocated.delta_risky);
    assert!(removed.delta_stable <= allocated.delta_stable);
    assert!(allocated.delta_stable - removed.delta_stable <= 1);
    assert_eq!(engine.position(bob.address, pool_id).liquidity, 0);

    let margin = engine.margin(bob.address);
    assert_eq!(margin.balance_risky, removed.delta_risky);
    assert_eq!(margin.balance_stable, removed.delta_stable);

    let reserve_after = engine.reserve(&pool_id).unwrap();
    assert_eq!(reserve_after.liquidity, reserve_before.liquidity);
    assert!(reserve_after.reserve_risky >= reserve_before.reserve_risky);
    assert!(reserve_after.reserve_stable >= reserve_before.reserve_stable);
    assert!(reserve_after.reserve_stable - reserve_before.reserve_stable <= 1);
}

#[test]
fn test_allocate_from_margin() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;
    let engine = &fixture.engine;

    engine
        .deposit(&alice, alice.address, 10 * WAD, 2_000 * WAD, &[])
        .unwrap();
    let allocated = engine
        .allocate(&alice, pool_id, alice.address, WAD, true, &[])
        .unwrap();

    let margin = engine.margin(alice.address);
    assert_eq!(margin.balance_risky, 10 * WAD - allocated.delta_risky);
    assert_eq!(margin.balance_stable, 2_000 * WAD - allocated.delta_stable);
    assert_eq!(
        engine.position(alice.address, pool_id).liquidity,
        2 * LIQUIDITY - 1_000
    );

    // Not enough margin for another hundred units
    assert!(matches!(
        engine.allocate(&alice, pool_id, alice.address, 100 * WAD, true, &[]),
        Err(EngineError::MarginUnderflow { .. })
    ));
}

#[test]
fn test_remove_more_than_owned_fails() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;

    assert!(matches!(
        fixture.engine.remove(alice.address, pool_id, LIQUIDITY),
        Err(EngineError::PositionUnderflow { field: "liquidity", .. })
    ));
    assert!(matches!(
        fixture.engine.remove(alice.address, pool_id, 0),
        Err(EngineError::ZeroLiquidity)
    ));
}

#[test]
fn test_deposit_withdraw_round_trip() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let bob = fixture.trader("bob");
    let engine = &fixture.engine;

    engine
        .deposit(&alice, alice.address, 7 * WAD, 3 * WAD, &[])
        .unwrap();
    assert_eq!(engine.margin(alice.address).balance_risky, 7 * WAD);
    assert_eq!(engine.margin(alice.address).balance_stable, 3 * WAD);
    assert_eq!(fixture.engine_balances(), (7 * WAD, 3 * WAD));

    assert!(matches!(
        engine.withdraw(bob.address, bob.address, 1, 0),
        Err(EngineError::MarginUnderflow { .. })
    ));
    assert!(matches!(
        engine.withdraw(alice.address, alice.address, 8 * WAD, 0),
        Err(EngineError::MarginUnderflow { .. })
    ));

    engine
        .withdraw(alice.address, alice.address, 7 * WAD, 3 * WAD)
        .unwrap();
    assert_eq!(engine.margin(alice.address).balance_risky, 0);
    assert_eq!(engine.margin(alice.address).balance_stable, 0);
    assert_eq!(fixture.balances(alice.address), (FUNDING, FUNDING));
    assert_eq!(fixture.engine_balances(), (0, 0));

    assert!(matches!(
        engine.deposit(&alice, alice.address, 0, 0, &[]),
        Err(EngineError::ZeroDeltas)
    ));
}

#[test]
fn test_swap_risky_for_stable() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let bob = fixture.trader("bob");
    let pool_id = fixture.create_pool(&alice).pool_id;
    let engine = &fixture.engine;
    let reserve_before = engine.reserve(&pool_id).unwrap();
    let invariant_before = engine.invariant_of(&pool_id).unwrap();

    let outcome = engine
        .swap(&bob, pool_id, true, WAD / 100, false, &[])
        .unwrap();

    // Marginal price at x = 0.5 is K·φ(σ√τ)/φ(0) ≈ 606 stable per risky
    assert!(
        outcome.delta_out > 59 * WAD / 10 && outcome.delta_out < 61 * WAD / 10,
        "delta_out = {}",
        outcome.delta_out
    );
    let reserve_after = engine.reserve(&pool_id).unwrap();
    assert_eq!(reserve_after.reserve_risky, reserve_before.reserve_risky + WAD / 100);
    assert_eq!(
        reserve_after.reserve_stable,
        reserve_before.reserve_stable - outcome.delta_out
    );
    assert_eq!(
        fixture.balances(bob.address),
        (FUNDING - WAD / 100, FUNDING + outcome.delta_out)
    );

    let invariant_after = engine.invariant_of(&pool_id).unwrap();
    assert_eq!(invariant_after, outcome.invariant_after);
    assert!(invariant_after > invariant_before);
}

#[test]
fn test_swap_stable_for_risky_from_margin() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let bob = fixture.trader("bob");
    let pool_id = fixture.create_pool(&alice).pool_id;
    let engine = &fixture.engine;

    engine.deposit(&bob, bob.address, 0, 10 * WAD, &[]).unwrap();
    let outcome = engine
        .swap(&bob, pool_id, false, 10 * WAD, true, &[])
        .unwrap();

    assert!(
        outcome.delta_out > 15 * WAD / 1_000 && outcome.delta_out < 175 * WAD / 10_000,
        "delta_out = {}",
        outcome.delta_out
    );
    assert_eq!(engine.margin(bob.address).balance_stable, 0);
    assert_eq!(fixture.balances(bob.address).0, FUNDING + outcome.delta_out);
    assert!(outcome.invariant_after >= outcome.invariant_before);
}

#[test]
fn test_small_stable_swaps_keep_the_invariant() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let bob = fixture.trader("bob");
    let pool_id = fixture.create_pool(&alice).pool_id;
    let engine = &fixture.engine;

    for delta_in in [WAD / 1_000_000, WAD / 10_000, WAD / 1_000, WAD / 100] {
        let reserve_before = engine.reserve(&pool_id).unwrap();
        let outcome = engine
            .swap(&bob, pool_id, false, delta_in, false, &[])
            .unwrap_or_else(|err| panic!("swap of {delta_in} failed: {err}"));

        assert!(outcome.delta_out > 0);
        // Roughly 1 risky per 606 stable near x = 0.5
        assert!(outcome.delta_out < delta_in / 500, "delta_out = {}", outcome.delta_out);
        assert!(outcome.invariant_after >= outcome.invariant_before);

        let reserve_after = engine.reserve(&pool_id).unwrap();
        assert_eq!(reserve_after.reserve_stable, reserve_before.reserve_stable + delta_in);
        assert_eq!(
            reserve_after.reserve_risky,
            reserve_before.reserve_risky - outcome.delta_out
        );
    }
}

#[test]
fn test_swap_ages_the_option() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;

    fixture.clock.advance(86_400);
    fixture
        .engine
        .swap(&alice, pool_id, true, WAD / 100, false, &[])
        .unwrap();

    let calibration = fixture.engine.calibration(&pool_id).unwrap();
    assert_eq!(calibration.last_timestamp, START + 86_400);
    assert_eq!(calibration.tau(), TERM - 86_400);
    assert_eq!(
        fixture.engine.reserve(&pool_id).unwrap().last_timestamp,
        START + 86_400
    );
}

#[test]
fn test_swap_rejects_zero_input_and_unknown_pool() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;

    assert!(matches!(
        fixture.engine.swap(&alice, pool_id, true, 0, false, &[]),
        Err(EngineError::DeltaIn)
    ));
    let unknown = rmm_types::PoolId::derive(fixture.engine.address(), 1, 2, 3);
    assert!(matches!(
        fixture.engine.swap(&alice, unknown, true, WAD, false, &[]),
        Err(EngineError::Uninitialized { .. })
    ));
}

#[test]
fn test_swap_expires_after_grace_period() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;

    fixture.clock.set(MATURITY + 121);
    let result = fixture
        .engine
        .swap(&alice, pool_id, true, WAD / 100, false, &[]);
    assert!(matches!(
        result,
        Err(EngineError::PoolExpired {
            maturity: MATURITY,
            grace_end,
            now,
        }) if grace_end == MATURITY + 120 && now == MATURITY + 121
    ));

    // Last second of grace still trades, at zero time to maturity
    fixture.clock.set(MATURITY + 120);
    fixture
        .engine
        .swap(&alice, pool_id, true, WAD / 100, false, &[])
        .unwrap();
    let calibration = fixture.engine.calibration(&pool_id).unwrap();
    assert_eq!(calibration.last_timestamp, MATURITY);
    assert_eq!(calibration.tau(), 0);
}

#[test]
fn test_underpaid_swap_is_rolled_back() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let mallory = fixture.trader("mallory").underpaying(1);
    let pool_id = fixture.create_pool(&alice).pool_id;
    let reserve_before = fixture.engine.reserve(&pool_id).unwrap();
    let engine_before = fixture.engine_balances();

    let result = fixture
        .engine
        .swap(&mallory, pool_id, false, 10 * WAD, false, &[]);

    assert!(matches!(result, Err(EngineError::StableBalance { .. })));
    assert_eq!(fixture.engine.reserve(&pool_id).unwrap(), reserve_before);
    assert_eq!(fixture.engine_balances(), engine_before);
    // The payout made before the failed collection is undone too
    assert_eq!(fixture.balances(mallory.address), (FUNDING, FUNDING));
}

#[test]
fn test_views_follow_the_curve() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;
    let engine = &fixture.engine;

    let stable = engine
        .get_stable_given_risky(&pool_id, FixedPoint64x64::HALF)
        .unwrap();
    let reserve = engine.reserve(&pool_id).unwrap();
    let expected = reserve.reserve_stable as f64 / reserve.liquidity as f64;
    assert!((stable.to_f64() - expected).abs() < 1e-6);

    let risky = engine.get_risky_given_stable(&pool_id, stable).unwrap();
    assert!((risky.to_f64() - 0.5).abs() < 1e-6);

    let unknown = rmm_types::PoolId::derive(engine.address(), 1, 2, 3);
    assert!(matches!(
        engine.invariant_of(&unknown),
        Err(EngineError::Uninitialized { .. })
    ));
}

#[test]
fn test_events_are_published_in_commit_order() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;
    let engine = &fixture.engine;

    engine.deposit(&alice, alice.address, WAD, 0, &[]).unwrap();
    let _ = engine.withdraw(alice.address, alice.address, 2 * WAD, 0);
    engine
        .swap(&alice, pool_id, true, WAD / 100, true, &[])
        .unwrap();

    let names: Vec<_> = fixture.events.take().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["created", "deposited", "swapped"]);
    assert!(fixture.events.events().is_empty());

    engine.withdraw(alice.address, alice.address, WAD / 2, 0).unwrap();
    let events = fixture.events.events();
    assert_eq!(
        events,
        vec![EngineEvent::Withdrawn {
            caller: alice.address,
            recipient: alice.address,
            delta_risky: WAD / 2,
            delta_stable: 0,
        }]
    );

    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["Withdrawn"]["recipient"], alice.address.to_hex());
}

#[test]
fn test_events_carry_the_resulting_pool_state() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let bob = fixture.trader("bob");
    let pool_id = fixture.create_pool(&alice).pool_id;
    let engine = &fixture.engine;

    let expected_state = || {
        let reserve = engine.reserve(&pool_id).unwrap();
        PoolState::new(&reserve, engine.invariant_of(&pool_id).unwrap())
    };

    engine
        .allocate(&bob, pool_id, bob.address, WAD, false, &[])
        .unwrap();
    let after_allocate = expected_state();
    engine
        .swap(&bob, pool_id, true, WAD / 100, false, &[])
        .unwrap();
    let after_swap = expected_state();
    engine.remove(bob.address, pool_id, WAD / 2).unwrap();
    let after_remove = expected_state();

    let states: Vec<PoolState> = fixture
        .events
        .take()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::Allocated { state, .. }
            | EngineEvent::Swapped { state, .. }
            | EngineEvent::Removed { state, .. } => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![after_allocate, after_swap, after_remove]);
    assert_eq!(after_remove.liquidity, LIQUIDITY + WAD / 2);

    let json = serde_json::to_string(&EngineEvent::Removed {
        caller: bob.address,
        pool_id,
        delta_risky: 1,
        delta_stable: 2,
        delta_liquidity: 3,
        state: after_remove,
    })
    .unwrap();
    assert!(json.contains(&format!(
        "\"state\":{{\"reserve_risky\":{},",
        after_remove.reserve_risky
    )));
}

#[test]
fn test_state_snapshot_round_trip() {
    let fixture = Fixture::new();
    let alice = fixture.trader("alice");
    let pool_id = fixture.create_pool(&alice).pool_id;
    fixture
        .engine
        .deposit(&alice, alice.address, WAD, WAD, &[])
        .unwrap();

    let snapshot = fixture.engine.export_state().unwrap();

    let restored = Fixture::new();
    restored.engine.import_state(&snapshot).unwrap();
    assert_eq!(restored.engine.pool_ids(), vec![pool_id]);
    assert_eq!(
        restored.engine.reserve(&pool_id).unwrap(),
        fixture.engine.reserve(&pool_id).unwrap()
    );
    assert_eq!(
        restored.engine.position(alice.address, pool_id),
        fixture.engine.position(alice.address, pool_id)
    );
    assert_eq!(
        restored.engine.margin(alice.address),
        fixture.engine.margin(alice.address)
    );

    assert!(matches!(
        restored.engine.import_state(&[0xff]),
        Err(EngineError::Snapshot(_))
    ));
}
