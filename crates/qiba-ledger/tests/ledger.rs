//! Cross-module tests: referrals feeding eligibility, under concurrency.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;

use chrono::TimeDelta;
use qiba_ledger::{
    EligibilityConfig, EligibilityLedger, LedgerError, ReferralLedger, ReferralOutcome,
};
use qiba_protocol::{Profile, Session, User, UserId};
use qiba_store::{
    Clock, GameStore, ManualClock, MemoryGameStore, MemoryReferralStore,
    MemoryUserStore, ReferralStore, StoreError, UserStore,
};

// =========================================================================
// Helpers
// =========================================================================

struct World {
    eligibility: Arc<EligibilityLedger>,
    referrals: Arc<ReferralLedger>,
    games: Arc<MemoryGameStore>,
    clock: Arc<ManualClock>,
}

fn world(players: &[i64]) -> World {
    let games = Arc::new(MemoryGameStore::new());
    let users = Arc::new(MemoryUserStore::new());
    let clock = Arc::new(ManualClock::default());
    for &id in players {
        users
            .create(&User::new(Profile::anonymous(UserId(id))))
            .unwrap();
    }
    let eligibility = Arc::new(EligibilityLedger::new(
        games.clone(),
        users.clone(),
        clock.clone(),
        EligibilityConfig { cooldown_secs: 60 },
    ));
    let referrals = Arc::new(ReferralLedger::new(
        Arc::new(MemoryReferralStore::new()),
        users,
        eligibility.clone(),
        clock.clone(),
    ));
    World {
        eligibility,
        referrals,
        games,
        clock,
    }
}

/// A user store whose next `modify` fails once when armed.
#[derive(Default)]
struct FlakyUsers {
    inner: MemoryUserStore,
    fail_next_modify: AtomicBool,
}

impl UserStore for FlakyUsers {
    fn get(&self, id: UserId) -> Result<User, StoreError> {
        self.inner.get(id)
    }

    fn create(&self, user: &User) -> Result<(), StoreError> {
        self.inner.create(user)
    }

    fn update(&self, user: &User) -> Result<(), StoreError> {
        self.inner.update(user)
    }

    fn modify(
        &self,
        id: UserId,
        apply: &mut dyn FnMut(&mut User),
    ) -> Result<User, StoreError> {
        if self.fail_next_modify.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.modify(id, apply)
    }
}

struct FlakyWorld {
    users: Arc<FlakyUsers>,
    store: Arc<MemoryReferralStore>,
    eligibility: Arc<EligibilityLedger>,
    referrals: ReferralLedger,
}

fn flaky_world() -> FlakyWorld {
    let users = Arc::new(FlakyUsers::default());
    let store = Arc::new(MemoryReferralStore::new());
    let clock = Arc::new(ManualClock::default());
    for id in [1, 2] {
        users
            .create(&User::new(Profile::anonymous(UserId(id))))
            .unwrap();
    }
    let eligibility = Arc::new(EligibilityLedger::new(
        Arc::new(MemoryGameStore::new()),
        users.clone(),
        clock.clone(),
        EligibilityConfig::default(),
    ));
    let referrals = ReferralLedger::new(store.clone(), users.clone(), eligibility.clone(), clock);
    referrals.ensure_referral_record(UserId(1)).unwrap();
    FlakyWorld {
        users,
        store,
        eligibility,
        referrals,
    }
}

fn finished_session(w: &World, owner: i64) {
    let now = w.clock.now();
    let mut session = Session::new(UserId(owner), now);
    session.end_time = Some(now);
    w.games.create(&session).unwrap();
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn test_referral_credit_skips_cooldown_exactly_once() {
    let w = world(&[1, 2]);
    finished_session(&w, 1);
    w.referrals.ensure_referral_record(UserId(1)).unwrap();
    assert!(!w.eligibility.can_start(UserId(1)).unwrap());

    w.referrals.record_referral(UserId(1), UserId(2)).unwrap();

    assert!(w.eligibility.can_start(UserId(1)).unwrap());
    assert!(!w.eligibility.can_start(UserId(1)).unwrap());

    w.clock.advance(TimeDelta::seconds(60));
    assert!(w.eligibility.can_start(UserId(1)).unwrap());
}

#[test]
fn test_concurrent_can_start_spends_each_credit_once() {
    let w = world(&[1]);
    finished_session(&w, 1);
    for _ in 0..25 {
        w.eligibility.grant_bonus_credit(UserId(1)).unwrap();
    }

    let allowed = Arc::new(AtomicU32::new(0));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let eligibility = Arc::clone(&w.eligibility);
            let allowed = Arc::clone(&allowed);
            thread::spawn(move || {
                for _ in 0..10 {
                    if eligibility.can_start(UserId(1)).unwrap() {
                        allowed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(allowed.load(Ordering::SeqCst), 25);
    assert_eq!(w.eligibility.bonus_credits(UserId(1)).unwrap(), 0);
}

#[test]
fn test_concurrent_duplicate_referrals_grant_one_credit() {
    let w = world(&[1, 2]);
    w.referrals.ensure_referral_record(UserId(1)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let referrals = Arc::clone(&w.referrals);
            thread::spawn(move || {
                referrals.record_referral(UserId(1), UserId(2)).unwrap()
            })
        })
        .collect();
    let recorded = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|o| *o == ReferralOutcome::Recorded)
        .count();

    assert_eq!(recorded, 1);
    assert_eq!(w.eligibility.bonus_credits(UserId(1)).unwrap(), 1);
}

#[test]
fn test_counts_never_negative_across_states() {
    let w = world(&[1]);
    let check = |w: &World| {
        let remaining = w.eligibility.plays_remaining_today(UserId(1)).unwrap();
        let max = w.eligibility.max_plays_allowed(UserId(1)).unwrap();
        assert!(max >= 1);
        assert!(remaining <= max);
    };

    check(&w);
    finished_session(&w, 1);
    check(&w);
    w.eligibility.grant_bonus_credit(UserId(1)).unwrap();
    check(&w);
    w.eligibility.consume_if_available(UserId(1)).unwrap();
    w.eligibility.consume_if_available(UserId(1)).unwrap();
    check(&w);
    assert_eq!(w.eligibility.bonus_credits(UserId(1)).unwrap(), 0);
}

#[test]
fn test_record_referral_failed_grant_is_retried_and_paid_once() {
    let w = flaky_world();
    w.users.fail_next_modify.store(true, Ordering::SeqCst);

    let first = w.referrals.record_referral(UserId(1), UserId(2));
    assert!(matches!(first, Err(LedgerError::Store(StoreError::Unavailable(_)))));
    assert_eq!(w.eligibility.bonus_credits(UserId(1)).unwrap(), 0);
    assert_eq!(w.referrals.count_referrals(UserId(1)).unwrap(), 0);

    let retry = w.referrals.record_referral(UserId(1), UserId(2)).unwrap();
    assert_eq!(retry, ReferralOutcome::Recorded);
    let again = w.referrals.record_referral(UserId(1), UserId(2)).unwrap();
    assert_eq!(again, ReferralOutcome::Duplicate);
    assert_eq!(w.eligibility.bonus_credits(UserId(1)).unwrap(), 1);
}

#[test]
fn test_record_referral_failed_grant_leaves_invite_pending() {
    let w = flaky_world();
    assert!(w.referrals.invite(UserId(1), UserId(2)).unwrap());
    w.users.fail_next_modify.store(true, Ordering::SeqCst);

    assert!(w.referrals.record_referral(UserId(1), UserId(2)).is_err());

    let record = w.store.get(UserId(1)).unwrap();
    assert_eq!(record.edges.len(), 1);
    assert!(!record.edges[0].accepted);
    assert!(record.edges[0].accept_time.is_none());

    let retry = w.referrals.record_referral(UserId(1), UserId(2)).unwrap();
    assert_eq!(retry, ReferralOutcome::Recorded);
    assert_eq!(w.eligibility.bonus_credits(UserId(1)).unwrap(), 1);
}
