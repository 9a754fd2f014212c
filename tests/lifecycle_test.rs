use cardvault::domain::card::{CardId, OwnerId};
use cardvault::domain::lifecycle::{CardStatus, Identity};
use cardvault::domain::ports::CardRepository;
use cardvault::error::CardError;
use cardvault::infrastructure::in_memory::InMemoryCardRepository;
use rust_decimal_macros::dec;

mod common;

async fn expire(repository: &InMemoryCardRepository, id: CardId) {
    let mut card = repository.find_by_id(id).await.unwrap().unwrap();
    card.status = CardStatus::Expired;
    repository.save(card).await.unwrap();
}

#[tokio::test]
async fn test_expired_card_cannot_be_reactivated() {
    let (engine, repository) = common::in_memory_engine();
    let admin = common::admin();
    let owner = OwnerId::new();
    let card = common::issue_funded(&engine, owner, dec!(10.00)).await;
    expire(&repository, card).await;

    for target in [CardStatus::Active, CardStatus::Expired] {
        assert!(matches!(
            engine.set_status(&admin, card, target).await,
            Err(CardError::InvalidTransition(_))
        ));
    }
    assert_eq!(
        engine.get_card(&admin, card).await.unwrap().status,
        CardStatus::Expired
    );
}

#[tokio::test]
async fn test_expired_card_blocked_by_admin_only() {
    let (engine, repository) = common::in_memory_engine();
    let admin = common::admin();
    let user = Identity::user(OwnerId::new());
    let card = common::issue_funded(&engine, user.id, dec!(10.00)).await;
    expire(&repository, card).await;

    assert!(matches!(
        engine.set_status(&user, card, CardStatus::Blocked).await,
        Err(CardError::OperationConflict(_))
    ));
    assert_eq!(
        engine.get_card(&admin, card).await.unwrap().status,
        CardStatus::Expired
    );

    let blocked = engine.set_status(&admin, card, CardStatus::Blocked).await.unwrap();
    assert_eq!(blocked.status, CardStatus::Blocked);
    assert_eq!(
        engine.get_card(&user, card).await.unwrap().status,
        CardStatus::Blocked
    );
}

#[tokio::test]
async fn test_expired_cards_cannot_move_funds() {
    let (engine, repository) = common::in_memory_engine();
    let user = Identity::user(OwnerId::new());
    let live = common::issue_funded(&engine, user.id, dec!(10.00)).await;
    let stale = common::issue_funded(&engine, user.id, dec!(10.00)).await;
    expire(&repository, stale).await;

    assert!(matches!(
        engine.transfer(&user, stale, live, dec!(1.00)).await,
        Err(CardError::OperationConflict(_))
    ));
    assert!(matches!(
        engine.transfer(&user, live, stale, dec!(1.00)).await,
        Err(CardError::OperationConflict(_))
    ));
    assert_eq!(engine.get_balance(&user, live).await.unwrap().value(), dec!(10.00));
    assert_eq!(engine.get_balance(&user, stale).await.unwrap().value(), dec!(10.00));
}

#[tokio::test]
async fn test_block_and_reactivate_round_trip() {
    let (engine, _) = common::in_memory_engine();
    let admin = common::admin();
    let user = Identity::user(OwnerId::new());
    let card = common::issue_funded(&engine, user.id, dec!(5.00)).await;

    let blocked = engine.set_status(&user, card, CardStatus::Blocked).await.unwrap();
    assert_eq!(blocked.status, CardStatus::Blocked);

    // Blocking twice is a no-op, not an error.
    let again = engine.set_status(&user, card, CardStatus::Blocked).await.unwrap();
    assert_eq!(again.version, blocked.version);

    assert!(matches!(
        engine.set_status(&user, card, CardStatus::Active).await,
        Err(CardError::Forbidden(_))
    ));

    let active = engine.set_status(&admin, card, CardStatus::Active).await.unwrap();
    assert_eq!(active.status, CardStatus::Active);
    assert_eq!(active.balance.value(), dec!(5.00));
}

#[tokio::test]
async fn test_unknown_card_status_change() {
    let (engine, _) = common::in_memory_engine();
    assert!(matches!(
        engine
            .set_status(&common::admin(), CardId::new(), CardStatus::Blocked)
            .await,
        Err(CardError::NotFound(_))
    ));
}
