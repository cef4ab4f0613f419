mod support;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;
use tokio_test::{assert_err, assert_ok};

use stakehouse::error::{Error, WagerRejection};
use stakehouse::notify::Event;
use stakehouse::placement::{PlaceWager, WagerDesk};
use stakehouse::store::{LedgerStore, MarketStore};
use stakehouse::types::{WagerFilter, WagerStatus};

use support::{red_blue_market, Harness};

fn request(user_id: i64, side: &str, stake: Decimal) -> PlaceWager {
    PlaceWager {
        user_id,
        market_id: "odds_1".into(),
        stake_amount: stake,
        selected_side: side.into(),
    }
}

async fn desk_with_market(h: &Harness) -> WagerDesk {
    h.store.upsert_market(&red_blue_market()).await.unwrap();
    WagerDesk::new(h.markets(), h.ledger(), h.events())
}

#[tokio::test]
async fn placing_debits_stake_and_locks_current_odds() {
    let h = Harness::new();
    let desk = desk_with_market(&h).await;
    let account = h.store.open_account(dec!(100)).await.unwrap();

    let wager = assert_ok!(desk.place(request(account.id, "Red", dec!(40))).await);

    assert_eq!(wager.status, WagerStatus::Pending);
    assert_eq!(wager.odds, dec!(2.0));
    assert_eq!(wager.market_id, "odds_1");
    assert_eq!(wager.market_name, "Red vs Blue");
    assert_eq!(h.balance(account.id).await, dec!(60));

    // Later odds moves do not touch the placed wager.
    let mut moved = red_blue_market();
    moved.odds_a = dec!(3.5);
    h.store.upsert_market(&moved).await.unwrap();
    let stored = h.store.get_wager(wager.id).await.unwrap().unwrap();
    assert_eq!(stored.odds, dec!(2.0));
}

#[tokio::test]
async fn placing_notifies_the_user() {
    let h = Harness::new();
    let desk = desk_with_market(&h).await;
    let account = h.store.open_account(dec!(100)).await.unwrap();

    desk.place(request(account.id, "Blue", dec!(10))).await.unwrap();

    assert_eq!(
        h.notifier.events(),
        vec![
            Event::WagersChanged { user_id: Some(account.id) },
            Event::BalancesChanged { user_id: Some(account.id) },
        ]
    );
}

#[tokio::test]
async fn stake_above_balance_is_rejected_without_side_effects() {
    let h = Harness::new();
    let desk = desk_with_market(&h).await;
    let account = h.store.open_account(dec!(100)).await.unwrap();

    let err = assert_err!(desk.place(request(account.id, "Red", dec!(150))).await);

    assert!(matches!(
        err,
        Error::Rejected(WagerRejection::InsufficientBalance { .. })
    ));
    assert_eq!(h.balance(account.id).await, dec!(100));
    assert!(desk.wagers_for(account.id).await.unwrap().is_empty());
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn validation_failures_write_nothing() {
    let h = Harness::new();
    let desk = desk_with_market(&h).await;
    let account = h.store.open_account(dec!(100)).await.unwrap();

    let zero = desk.place(request(account.id, "Red", Decimal::ZERO)).await;
    assert!(matches!(zero, Err(Error::Rejected(WagerRejection::NonPositiveStake(_)))));

    let negative = desk.place(request(account.id, "Red", dec!(-5))).await;
    assert!(matches!(negative, Err(Error::Rejected(WagerRejection::NonPositiveStake(_)))));

    let mut unknown_market = request(account.id, "Red", dec!(10));
    unknown_market.market_id = "odds_404".into();
    assert!(matches!(desk.place(unknown_market).await, Err(Error::MarketNotFound(_))));

    let unknown_side = desk.place(request(account.id, "Green", dec!(10))).await;
    assert!(matches!(unknown_side, Err(Error::Rejected(WagerRejection::UnknownSide { .. }))));

    let draw = desk.place(request(account.id, "Draw", dec!(10))).await;
    assert!(matches!(draw, Err(Error::Rejected(WagerRejection::DrawUnavailable(_)))));

    let no_account = desk.place(request(999, "Red", dec!(10))).await;
    assert!(matches!(no_account, Err(Error::AccountNotFound(999))));

    assert_eq!(h.balance(account.id).await, dec!(100));
    assert!(h
        .store
        .list_wagers(&WagerFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn stake_check_runs_before_market_lookup() {
    let h = Harness::new();
    let desk = WagerDesk::new(h.markets(), h.ledger(), h.events());

    let err = desk.place(request(1, "Red", dec!(-1))).await.unwrap_err();

    assert!(matches!(err, Error::Rejected(WagerRejection::NonPositiveStake(_))));
}

#[tokio::test]
async fn stakes_finer_than_the_coin_scale_are_rejected() {
    let h = Harness::new();
    let desk = desk_with_market(&h).await;
    let account = h.store.open_account(dec!(100)).await.unwrap();

    let err = assert_err!(desk.place(request(account.id, "Red", dec!(0.000000001))).await);

    assert!(matches!(
        err,
        Error::Rejected(WagerRejection::StakeTooPrecise { max_scale: 8, .. })
    ));
    assert_eq!(h.balance(account.id).await, dec!(100));
    assert!(desk.wagers_for(account.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn stakes_at_the_coin_scale_are_kept_exactly() {
    let h = Harness::new();
    let desk = desk_with_market(&h).await;
    let account = h.store.open_account(dec!(100)).await.unwrap();

    let fine = desk.place(request(account.id, "Red", dec!(0.12345678))).await.unwrap();
    // Trailing zeros do not count as precision.
    let padded = desk.place(request(account.id, "Red", dec!(10.000000000))).await.unwrap();

    assert_eq!(fine.stake_amount, dec!(0.12345678));
    assert_eq!(padded.stake_amount, dec!(10));
    assert_eq!(h.balance(account.id).await, dec!(89.87654322));
}

#[tokio::test]
async fn locked_odds_use_the_stored_odds_scale() {
    let h = Harness::new();
    let mut market = red_blue_market();
    market.odds_a = dec!(2.123456);
    h.store.upsert_market(&market).await.unwrap();
    let desk = WagerDesk::new(h.markets(), h.ledger(), h.events());
    let account = h.store.open_account(dec!(100)).await.unwrap();

    let wager = desk.place(request(account.id, "Red", dec!(10))).await.unwrap();

    assert_eq!(wager.odds, dec!(2.1235));
}

#[tokio::test]
async fn draw_is_accepted_when_priced() {
    let h = Harness::new();
    let mut market = red_blue_market();
    market.odds_draw = Some(dec!(3.2));
    h.store.upsert_market(&market).await.unwrap();
    let desk = WagerDesk::new(h.markets(), h.ledger(), h.events());
    let account = h.store.open_account(dec!(50)).await.unwrap();

    let wager = desk.place(request(account.id, "draw", dec!(50))).await.unwrap();

    assert_eq!(wager.selected_side, "Draw");
    assert_eq!(wager.odds, dec!(3.2));
    assert_eq!(h.balance(account.id).await, Decimal::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placements_never_overdraw() {
    const ATTEMPTS: usize = 20;

    let h = Harness::new();
    let desk = Arc::new(desk_with_market(&h).await);
    let user_id = h.store.open_account(dec!(100)).await.unwrap().id;
    let barrier = Arc::new(Barrier::new(ATTEMPTS));

    let mut handles = Vec::with_capacity(ATTEMPTS);
    for _ in 0..ATTEMPTS {
        let desk = desk.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            desk.place(request(user_id, "Red", dec!(30))).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(Error::Rejected(WagerRejection::InsufficientBalance { .. })) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(placed, 3);
    assert_eq!(h.balance(user_id).await, dec!(10));
    assert_eq!(desk.wagers_for(user_id).await.unwrap().len(), 3);
}
