// crates/keel-queue/tests/exit_flow.rs
//
// End-to-end exit flow: stake, unstake into the queue, wait out epochs,
// withdraw or restake — with and without the acceleration overlay.

use keel_core::{AccountId, AuthContext, KeelError, Ledger, TokenId, WAD};
use keel_queue::{AcceleratedExitQueue, ExitQueue, StakeBook};

fn admin() -> AccountId {
    AccountId::from_label("admin")
}

fn admin_ctx() -> AuthContext {
    AuthContext::new(admin())
}

fn holder() -> AccountId {
    AccountId::from_label("holder")
}

fn token() -> TokenId {
    TokenId::from_label("keel")
}

/// Queue with 10-block epochs, 100-per-epoch caps, funded holder.
fn setup() -> (StakeBook, ExitQueue, Ledger) {
    let mut ledger = Ledger::new();
    ledger.register_token(token());
    ledger.mint(token(), holder(), 10_000 * WAD).unwrap();
    let book = StakeBook::new(token(), AccountId::from_label("staking"));
    let queue = ExitQueue::new(
        admin(),
        token(),
        AccountId::from_label("exit-queue"),
        0,
        10,
        100 * WAD,
        100 * WAD,
    )
    .unwrap();
    (book, queue, ledger)
}

#[test]
fn full_drain_returns_exact_amount() {
    let (mut book, mut queue, mut ledger) = setup();
    let start = ledger.balance(token(), holder());

    book.stake(&mut ledger, holder(), 300 * WAD).unwrap();
    book.unstake(&mut ledger, &mut queue, holder(), 300 * WAD, 0)
        .unwrap();

    // 300 across epochs 0..3 at 100 per epoch.
    let entry = queue.exit_entry(holder()).unwrap();
    assert_eq!(entry.first_exit_epoch, 0);
    assert_eq!(entry.last_exit_epoch, 2);

    // Nothing withdrawable while epoch 0 is open.
    assert_eq!(
        queue.withdraw_epochs(&mut ledger, holder(), &[0], queue.current_epoch(5)),
        Err(KeelError::NotYetProcessed { epoch: 0 })
    );

    // Claim epoch by epoch as each closes.
    let mut withdrawn = 0;
    for (block, epoch) in [(10, 0u64), (20, 1), (30, 2)] {
        withdrawn += queue
            .withdraw_epochs(&mut ledger, holder(), &[epoch], queue.current_epoch(block))
            .unwrap();
    }
    assert_eq!(withdrawn, 300 * WAD);
    assert_eq!(ledger.balance(token(), holder()), start);
    assert!(queue.exit_entry(holder()).is_none());

    // Every epoch is spent: claiming again fails.
    assert_eq!(
        queue.withdraw_epochs(&mut ledger, holder(), &[0, 1, 2], queue.current_epoch(40)),
        Err(KeelError::NothingToWithdraw)
    );
}

#[test]
fn claimable_epochs_tracks_the_clock() {
    let (mut book, mut queue, mut ledger) = setup();
    book.stake(&mut ledger, holder(), 300 * WAD).unwrap();
    book.unstake(&mut ledger, &mut queue, holder(), 300 * WAD, 0)
        .unwrap();

    assert!(queue.claimable_epochs(holder(), queue.current_epoch(0)).is_empty());
    assert_eq!(
        queue.claimable_epochs(holder(), queue.current_epoch(20)),
        vec![(0, 100 * WAD), (1, 100 * WAD)]
    );
    assert_eq!(
        queue.claimable_epochs(holder(), queue.current_epoch(35)).len(),
        3
    );
}

#[test]
fn mixed_withdraw_and_restake_split_the_entry() {
    let (mut book, mut queue, mut ledger) = setup();
    book.stake(&mut ledger, holder(), 300 * WAD).unwrap();
    book.unstake(&mut ledger, &mut queue, holder(), 300 * WAD, 0)
        .unwrap();

    let now = queue.current_epoch(30);
    let out = queue
        .withdraw_epochs(&mut ledger, holder(), &[0], now)
        .unwrap();
    let restaked = queue
        .restake(&mut ledger, &mut book, holder(), &[1], now)
        .unwrap();
    assert_eq!(out, 100 * WAD);
    assert_eq!(restaked, 100 * WAD);
    assert_eq!(book.staked_of(holder()), 100 * WAD);

    // A claimed epoch cannot be claimed the other way either.
    assert_eq!(
        queue.restake(&mut ledger, &mut book, holder(), &[0], now),
        Err(KeelError::NothingToStake)
    );
    // The final epoch remains.
    assert_eq!(queue.exit_entry(holder()).unwrap().total_amount, 100 * WAD);
}

#[test]
fn acceleration_compresses_the_wait() {
    let (mut book, queue, mut ledger) = setup();
    let mut overlay = AcceleratedExitQueue::new(admin(), queue);
    let mut book_holder_staked = 0;

    book.stake(&mut ledger, holder(), 400 * WAD).unwrap();
    book_holder_staked += 400 * WAD;

    // Unstake on the overlay clock (no policy yet: identical to base).
    let now_epoch = overlay.current_epoch(0);
    book.unstake_at_epoch(
        &mut ledger,
        overlay.base_mut(),
        holder(),
        400 * WAD,
        now_epoch,
    )
    .unwrap();
    book_holder_staked -= 400 * WAD;

    // Scheduled across epochs 0..4. On the base clock, epoch 3 closes at
    // block 40. Doubling from epoch 0 makes block 20 read as epoch 4.
    overlay.set_policy(&admin_ctx(), 1, 1, 0).unwrap();
    assert_eq!(overlay.current_epoch(20), 4);

    let out = overlay
        .withdraw_epochs(&mut ledger, holder(), &[0, 1, 2, 3], 20)
        .unwrap();
    assert_eq!(out, 400 * WAD);
    assert_eq!(book.staked_of(holder()), book_holder_staked);
}

#[test]
fn disabled_overlay_hands_back_to_base_clock() {
    let (mut book, queue, mut ledger) = setup();
    let mut overlay = AcceleratedExitQueue::new(admin(), queue);
    book.stake(&mut ledger, holder(), 200 * WAD).unwrap();
    book.unstake_at_epoch(&mut ledger, overlay.base_mut(), holder(), 200 * WAD, 0)
        .unwrap();

    overlay.set_policy(&admin_ctx(), 1, 1, 0).unwrap();
    overlay.disable(&admin_ctx()).unwrap();

    // Accelerated withdrawal is no longer reachable through the overlay.
    assert_eq!(
        overlay.withdraw_epochs(&mut ledger, holder(), &[0, 1], 20),
        Err(KeelError::AccelerationDisabled)
    );

    // The base queue's unstretched clock governs again: at block 20 only
    // epochs 0 and 1 have closed, and they pay out normally.
    let base = overlay.base_mut();
    let now = base.current_epoch(20);
    let out = base
        .withdraw_epochs(&mut ledger, holder(), &[0, 1], now)
        .unwrap();
    assert_eq!(out, 200 * WAD);
}

#[test]
fn owed_migration_is_withdrawable_once_funded() {
    let (_, mut queue, mut ledger) = setup();
    let migrated = AccountId::from_label("migrated-holder");

    queue.set_owed(&admin_ctx(), migrated, 150 * WAD, 0).unwrap();

    // Custody was never funded: the claim is rejected without corrupting
    // the schedule.
    let now = queue.current_epoch(20);
    assert!(matches!(
        queue.withdraw_epochs(&mut ledger, migrated, &[0, 1], now),
        Err(KeelError::InsufficientBalance { .. })
    ));
    assert_eq!(queue.exit_entry(migrated).unwrap().total_amount, 150 * WAD);

    // The administrator tops up custody; the claim then succeeds.
    ledger
        .mint(token(), queue.account(), 150 * WAD)
        .unwrap();
    let out = queue
        .withdraw_epochs(&mut ledger, migrated, &[0, 1], now)
        .unwrap();
    assert_eq!(out, 150 * WAD);
}
