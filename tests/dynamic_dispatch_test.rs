use cardvault::domain::balance::Balance;
use cardvault::domain::card::{Card, CardNumber, Expiry, OwnerId};
use cardvault::domain::luhn;
use cardvault::domain::ports::{CardFilter, CardRepository, CardRepositoryBox};
use cardvault::infrastructure::in_memory::InMemoryCardRepository;
use rust_decimal_macros::dec;

mod common;

#[tokio::test]
async fn test_repository_as_trait_object() {
    let cipher = common::cipher();
    let repository: CardRepositoryBox = Box::new(InMemoryCardRepository::new(cipher.clone()));

    let owner = OwnerId::new();
    let number = CardNumber::parse(&luhn::complete("400000000000123").unwrap()).unwrap();
    let sealed = cipher.encrypt(number.as_str()).unwrap().unwrap();
    let card = Card::issue(
        owner,
        number,
        Expiry::parse("03/31").unwrap(),
        Balance::new(dec!(12.50)).unwrap(),
    );
    let id = card.id;

    // Verify Send + Sync by moving the boxed port into a task
    let handle = tokio::spawn(async move {
        repository.insert(card, sealed).await.unwrap();
        let found = repository.find_by_id(id).await.unwrap().unwrap();
        let owned = repository.find_all(&CardFilter::default().owned_by(owner)).await.unwrap();
        let total = repository.sum_balance_by_owner(owner).await.unwrap();
        (found, owned.len(), total)
    });

    let (found, owned, total) = handle.await.unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.number.as_str(), luhn::complete("400000000000123").unwrap());
    assert_eq!(owned, 1);
    assert_eq!(total.value(), dec!(12.50));
}
