//! Multi-step staking and lockup scenarios driven through the public API
//! with an in-memory token ledger and a manual clock.

use attoledger_core::lockup::{Lockup, LockupParams};
use attoledger_core::staking::{check_invariants, StakeStatus, StakingParams, StakingPool};
use attoledger_core::{
    Address, Amount, Clock, Env, Event, EventLog, InMemoryTokenLedger, LedgerError, ManualClock,
    TokenLedger, SECONDS_PER_DAY, SECONDS_PER_WEEK,
};

const E18: Amount = 1_000_000_000_000_000_000;
const START: u64 = 1_700_000_000;

// =============================================================================
// Fixture
// =============================================================================

struct World {
    token: Address,
    owner: Address,
    ledger: InMemoryTokenLedger,
    events: EventLog,
    clock: ManualClock,
}

impl World {
    fn new() -> Self {
        Self {
            token: Address::from_label("token"),
            owner: Address::from_label("owner"),
            ledger: InMemoryTokenLedger::new(),
            events: EventLog::new(),
            clock: ManualClock::new(START),
        }
    }

    fn pool(&self, params: StakingParams) -> StakingPool {
        StakingPool::new(
            self.owner,
            self.token,
            Address::from_label("staking-pool"),
            params,
        )
        .expect("pool")
    }

    fn fund(&mut self, account: Address, spender: Address, amount: Amount) {
        self.ledger
            .mint(self.token, account, amount)
            .expect("mint");
        self.ledger
            .approve(self.token, account, spender, amount)
            .expect("approve");
    }

    fn env(&mut self) -> Env<'_> {
        Env::new(&mut self.ledger, &mut self.events)
    }

    fn event_names(&self) -> Vec<&'static str> {
        self.events.events().map(Event::name).collect()
    }
}

// =============================================================================
// Interval staking
// =============================================================================

#[test]
fn interval_stake_vests_linearly_then_pays_principal() {
    let mut w = World::new();
    let mut pool = w.pool(StakingParams::interval(15, 5, 1, 1_000 * E18).expect("params"));
    let staker = Address::from_label("staker");

    w.fund(w.owner, pool.address(), E18);
    let owner = w.owner;
    pool.increase_reward_pool(&mut w.env(), owner, E18)
        .expect("increase");

    let amount = 15 * E18 / 10;
    w.fund(staker, pool.address(), amount);
    let now = w.clock.now();
    let id = pool.stake(&mut w.env(), staker, amount, now).expect("stake");
    assert_eq!(id, 0);

    // amount * (revenue + 100) / 100
    let stake = pool.get_stake(&staker, id).expect("stake").clone();
    assert_eq!(stake.rewards, 1_725 * E18 / 1000);
    assert_eq!(pool.promised_rewards(), 225 * E18 / 1000);
    assert_eq!(pool.free_size().expect("free size"), 1_000 * E18 - amount);
    assert_eq!(pool.available_to_withdraw(&staker, id, now).expect("view"), 0);

    let now = w.clock.advance(2 * SECONDS_PER_DAY);
    let vested = pool.available_to_withdraw(&staker, id, now).expect("view");
    assert_eq!(vested, 690 * E18 / 1000);

    pool.withdraw(&mut w.env(), staker, id, vested, now)
        .expect("partial withdraw");
    assert_eq!(pool.total_staked(), 900 * E18 / 1000);
    assert_eq!(pool.reward_pool(), E18 - 90 * E18 / 1000);
    let stake = pool.get_stake(&staker, id).expect("stake");
    assert_eq!(stake.principal_withdrawn, 600 * E18 / 1000);
    assert_eq!(
        stake.status(pool.total_payout(stake).expect("payout")),
        StakeStatus::PartiallyWithdrawn
    );

    let now = w.clock.advance(3 * SECONDS_PER_DAY);
    let rest = pool.available_to_withdraw(&staker, id, now).expect("view");
    assert_eq!(rest, 1_035 * E18 / 1000);
    pool.withdraw(&mut w.env(), staker, id, rest, now)
        .expect("final withdraw");

    assert_eq!(pool.total_staked(), 0);
    assert_eq!(pool.promised_rewards(), 0);
    assert_eq!(pool.reward_pool(), E18 - 225 * E18 / 1000);
    assert_eq!(w.ledger.balance_of(w.token, staker), 1_725 * E18 / 1000);
    let stake = pool.get_stake(&staker, id).expect("stake");
    assert_eq!(
        stake.status(pool.total_payout(stake).expect("payout")),
        StakeStatus::Exhausted
    );
    check_invariants(&pool).expect("invariants");

    assert_eq!(
        w.event_names(),
        vec!["RewardPoolIncreased", "Staked", "Withdrawn", "Withdrawn"]
    );
}

#[test]
fn interval_pool_guards_capacity_and_reserve() {
    let mut w = World::new();
    let mut pool = w.pool(StakingParams::interval(50, 2, 7, 1_000).expect("params"));
    let staker = Address::from_label("staker");
    let owner = w.owner;
    let now = w.clock.now();

    w.fund(staker, pool.address(), 2_000);
    assert_eq!(
        pool.stake(&mut w.env(), staker, 100, now),
        Err(LedgerError::NotEnoughRewards)
    );

    w.fund(owner, pool.address(), 100);
    pool.increase_reward_pool(&mut w.env(), owner, 100)
        .expect("increase");
    assert_eq!(
        pool.stake(&mut w.env(), staker, 1_001, now),
        Err(LedgerError::CapacityExceeded)
    );

    pool.stake(&mut w.env(), staker, 200, now).expect("stake");
    assert_eq!(pool.unpromised_rewards(), 0);
    assert_eq!(
        pool.decrease_reward_pool(&mut w.env(), owner, 1),
        Err(LedgerError::NoTokensToDecrease)
    );
    assert_eq!(
        pool.stake(&mut w.env(), staker, 2, now),
        Err(LedgerError::NotEnoughRewards)
    );

    pool.set_min_stake_amount(&mut w.env(), owner, 10)
        .expect("min");
    assert_eq!(
        pool.stake(&mut w.env(), staker, 9, now),
        Err(LedgerError::AmountBelowMinimum)
    );
    assert_eq!(
        pool.withdraw(&mut w.env(), staker, 1, 1, now),
        Err(LedgerError::InvalidStakeId)
    );
    assert_eq!(
        pool.withdraw(&mut w.env(), staker, 0, 1, now),
        Err(LedgerError::InsufficientAvailable)
    );
}

#[test]
fn get_stakes_pages_newest_first() {
    let mut w = World::new();
    let mut pool = w.pool(StakingParams::interval(10, 1, 1, 10_000).expect("params"));
    let staker = Address::from_label("staker");
    let owner = w.owner;

    w.fund(owner, pool.address(), 1_000);
    pool.increase_reward_pool(&mut w.env(), owner, 1_000)
        .expect("increase");
    w.fund(staker, pool.address(), 600);
    for amount in [100, 200, 300] {
        let now = w.clock.advance(1);
        pool.stake(&mut w.env(), staker, amount, now).expect("stake");
    }

    let amounts: Vec<_> = pool
        .get_stakes(&staker, 0, 10)
        .iter()
        .map(|s| s.amount)
        .collect();
    assert_eq!(amounts, vec![300, 200, 100]);
    let page: Vec<_> = pool
        .get_stakes(&staker, 1, 1)
        .iter()
        .map(|s| s.amount)
        .collect();
    assert_eq!(page, vec![200]);
    assert!(pool.get_stakes(&staker, 3, 10).is_empty());
}

// =============================================================================
// Monthly staking
// =============================================================================

#[test]
fn monthly_stake_pays_out_once_after_interval() {
    let mut w = World::new();
    let mut pool = w.pool(StakingParams::monthly(15, 30).expect("params"));
    let staker = Address::from_label("staker");
    let owner = w.owner;

    w.fund(owner, pool.address(), 150);
    pool.increase_reward_pool(&mut w.env(), owner, 150)
        .expect("increase");
    assert_eq!(pool.free_size().expect("free size"), 1_000);

    w.fund(staker, pool.address(), 2_000);
    let now = w.clock.now();
    pool.stake(&mut w.env(), staker, 1_000, now).expect("stake");
    assert_eq!(pool.free_size().expect("free size"), 0);
    assert_eq!(pool.get_stake(&staker, 0).expect("stake").rewards, 150);

    let now = w.clock.advance(30 * SECONDS_PER_DAY - 1);
    assert_eq!(pool.available_to_withdraw(&staker, 0, now).expect("view"), 0);
    assert_eq!(
        pool.stake(&mut w.env(), staker, 1, now),
        Err(LedgerError::PreviousStakeNotOver)
    );

    let now = w.clock.advance(1);
    assert_eq!(
        pool.available_to_withdraw(&staker, 0, now).expect("view"),
        1_150
    );
    pool.withdraw(&mut w.env(), staker, 0, 1_150, now)
        .expect("withdraw");
    assert_eq!(pool.reward_pool(), 0);
    assert_eq!(pool.total_staked(), 0);
    check_invariants(&pool).expect("invariants");
}

// =============================================================================
// Lockup
// =============================================================================

#[test]
fn lockup_releases_in_steps_after_cliff() {
    let mut w = World::new();
    let owner = w.owner;
    let mut lockup = Lockup::new(
        owner,
        w.token,
        Address::from_label("lockup"),
        LockupParams::new(1, 4, 4).expect("params"),
    )
    .expect("lockup");

    w.fund(owner, lockup.address(), 1_000);
    let stranger = Address::from_label("stranger");
    let now = w.clock.now();
    assert_eq!(
        lockup.deposit(&mut w.env(), stranger, 1_000, now),
        Err(LedgerError::NotOwner)
    );
    let id = lockup.deposit(&mut w.env(), owner, 1_000, now).expect("deposit");

    let now = w.clock.advance(SECONDS_PER_WEEK);
    assert_eq!(lockup.available_to_withdraw(id, now).expect("view"), 0);

    let now = w.clock.advance(SECONDS_PER_WEEK);
    assert_eq!(lockup.available_to_withdraw(id, now).expect("view"), 250);
    lockup
        .withdraw(&mut w.env(), owner, id, 250, now)
        .expect("withdraw");
    assert_eq!(lockup.total_deposit(), 750);

    let now = w.clock.advance(10 * SECONDS_PER_WEEK);
    assert_eq!(lockup.available_to_withdraw(id, now).expect("view"), 750);
    assert_eq!(
        lockup.withdraw(&mut w.env(), owner, id, 751, now),
        Err(LedgerError::InsufficientAvailable)
    );
    lockup
        .withdraw(&mut w.env(), owner, id, 750, now)
        .expect("withdraw rest");
    assert_eq!(w.ledger.balance_of(w.token, owner), 1_000);
    assert_eq!(
        w.event_names(),
        vec!["Deposited", "DepositWithdrawn", "DepositWithdrawn"]
    );
}

#[test]
fn pool_ownership_moves_in_two_steps() {
    let mut w = World::new();
    let mut pool = w.pool(StakingParams::monthly(10, 30).expect("params"));
    let owner = w.owner;
    let next = Address::from_label("next-owner");

    assert_eq!(
        pool.accept_ownership(&mut w.events, next),
        Err(LedgerError::NotNominated)
    );
    pool.nominate_new_owner(&mut w.events, owner, next)
        .expect("nominate");
    assert_eq!(pool.nominated_owner(), Some(next));
    pool.accept_ownership(&mut w.events, next).expect("accept");
    assert_eq!(pool.owner(), next);
    assert_eq!(pool.nominated_owner(), None);
    assert_eq!(
        w.events.last(),
        Some(&Event::OwnershipTransferred {
            previous_owner: owner,
            new_owner: next
        })
    );
}
