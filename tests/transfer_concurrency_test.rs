use cardvault::domain::card::OwnerId;
use cardvault::domain::lifecycle::Identity;
use cardvault::error::CardError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_never_overdraw() {
    const N: usize = 10;
    let amount = dec!(7.50);

    for _round in 0..20 {
        let (engine, _) = common::in_memory_engine();
        let engine = Arc::new(engine);
        let user = Identity::user(OwnerId::new());

        let source = common::issue_funded(&engine, user.id, amount * Decimal::from(N - 1)).await;
        let destination = common::issue_funded(&engine, user.id, dec!(0)).await;

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(
                    async move { engine.transfer(&user, source, destination, amount).await },
                )
            })
            .collect();

        let mut successes = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(CardError::InsufficientFunds(id)) => {
                    assert_eq!(id, source);
                    insufficient += 1;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(successes, N - 1);
        assert_eq!(insufficient, 1);
        assert_eq!(engine.get_balance(&user, source).await.unwrap().value(), dec!(0));
        assert_eq!(
            engine.get_balance(&user, destination).await.unwrap().value(),
            amount * Decimal::from(N - 1)
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crossing_transfers_preserve_total() {
    let (engine, _) = common::in_memory_engine();
    let engine = Arc::new(engine);
    let user = Identity::user(OwnerId::new());

    let cards = [
        common::issue_funded(&engine, user.id, dec!(30.00)).await,
        common::issue_funded(&engine, user.id, dec!(20.00)).await,
        common::issue_funded(&engine, user.id, dec!(10.00)).await,
    ];

    // Every ordered pair, many times over, in both directions at once.
    let mut handles = Vec::new();
    for i in 0..60 {
        let from = cards[i % 3];
        let to = cards[(i + 1 + i / 3 % 2) % 3];
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.transfer(&user, from, to, dec!(3.33)).await
        }));
    }

    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) | Err(CardError::InsufficientFunds(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    let mut total = Decimal::ZERO;
    for card in cards {
        let balance = engine.get_balance(&user, card).await.unwrap().value();
        assert!(balance >= Decimal::ZERO);
        total += balance;
    }
    assert_eq!(total, dec!(60.00));
    assert_eq!(
        engine.get_total_balance(&user).await.unwrap().value(),
        dec!(60.00)
    );
}
