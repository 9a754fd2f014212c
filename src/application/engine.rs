use super::generator::NumberGenerator;
use super::locks::CardLocks;
use crate::config::EngineConfig;
use crate::crypto::CardCipher;
use crate::domain::balance::{Amount, Balance};
use crate::domain::card::{Card, CardId, CardView, Expiry, OwnerId};
use crate::domain::lifecycle::{CardStatus, Identity, Transition};
use crate::domain::ports::{CardFilter, CardRepositoryBox};
use crate::error::{CardError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The entry point for card issuance, lifecycle changes and transfers.
///
/// `CardEngine` owns the storage backend and is meant to be shared (behind an
/// `Arc`) by every concurrent caller. Capability checks happen here, once,
/// against the `Identity` supplied with each call.
pub struct CardEngine {
    repository: CardRepositoryBox,
    generator: NumberGenerator,
    locks: CardLocks,
    config: EngineConfig,
}

fn card_not_found(id: CardId) -> CardError {
    CardError::NotFound(format!("Card not found with id: {id}"))
}

impl CardEngine {
    /// Creates a new `CardEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `repository` - The store for cards. It must seal numbers with the same `cipher`.
    /// * `cipher` - The process-wide cipher handle.
    /// * `config` - Generation and retry policy.
    pub fn new(
        repository: CardRepositoryBox,
        cipher: Arc<CardCipher>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            repository,
            generator: NumberGenerator::new(cipher, config.max_generation_attempts),
            locks: CardLocks::new(),
            config,
        })
    }

    /// Issues a new `Active` card with a zero balance to `owner`.
    pub async fn issue_card(
        &self,
        actor: &Identity,
        owner: OwnerId,
        expiry: Expiry,
    ) -> Result<Card> {
        self.issue_card_with_balance(actor, owner, expiry, Balance::ZERO)
            .await
    }

    /// Issues a new `Active` card seeded with `opening` funds.
    pub async fn issue_card_with_balance(
        &self,
        actor: &Identity,
        owner: OwnerId,
        expiry: Expiry,
        opening: Balance,
    ) -> Result<Card> {
        actor.require_admin("Issuing a card")?;
        tracing::info!(%owner, "Issuing card");

        let generated = self
            .generator
            .generate_unique_number(self.repository.as_ref())
            .await?;
        let card = Card::issue(owner, generated.number, expiry, opening);

        // The blob checked by the generator is the one persisted.
        let card = self.repository.insert(card, generated.sealed).await?;
        tracing::info!(card = %card.id, %owner, "Card issued");
        Ok(card)
    }

    /// Moves a card to `target`, subject to the lifecycle rules.
    ///
    /// Admins may act on any card; other callers only on their own, and a
    /// foreign card is reported as missing.
    pub async fn set_status(
        &self,
        actor: &Identity,
        id: CardId,
        target: CardStatus,
    ) -> Result<Card> {
        tracing::info!(card = %id, %target, role = ?actor.role, "Status change requested");
        if target == CardStatus::Expired {
            return Err(CardError::InvalidTransition(
                "Status cannot be set to expired manually".to_string(),
            ));
        }

        let _guard = self.locks.lock(id).await;
        let mut card = self.load_for(actor, id).await?;

        match card.status.transition(target, actor.role)? {
            Transition::Unchanged => {
                tracing::warn!(
                    card = %id,
                    status = %card.status,
                    "Card already has requested status"
                );
                Ok(card)
            }
            Transition::Changed(status) => {
                card.status = status;
                let card = self.repository.save(card).await?;
                tracing::info!(card = %id, %status, "Card status updated");
                Ok(card)
            }
        }
    }

    /// Moves `amount` from one of the caller's cards to another.
    ///
    /// Checks run in a fixed order and the first failure wins: distinct
    /// cards, positive amount, ownership, both cards active, sufficient
    /// funds. Both balances are written as one unit or not at all.
    pub async fn transfer(
        &self,
        actor: &Identity,
        from: CardId,
        to: CardId,
        amount: Decimal,
    ) -> Result<()> {
        tracing::info!(%from, %to, %amount, owner = %actor.id, "Transfer requested");
        if from == to {
            return Err(CardError::InvalidRequest(
                "Cannot transfer funds to the same card".to_string(),
            ));
        }
        let amount = Amount::new(amount)?;

        let _guard = self.locks.lock_pair(from, to).await;
        let mut retries = 0;
        loop {
            match self.try_transfer(actor.id, from, to, amount).await {
                Err(CardError::ConcurrentModification(card))
                    if retries < self.config.max_transfer_retries =>
                {
                    retries += 1;
                    tracing::warn!(%card, retries, "Concurrent update during transfer, retrying");
                }
                Ok(()) => {
                    tracing::info!(%from, %to, %amount, "Transfer completed");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_transfer(
        &self,
        owner: OwnerId,
        from: CardId,
        to: CardId,
        amount: Amount,
    ) -> Result<()> {
        let source = self
            .repository
            .find_by_id_and_owner(from, owner)
            .await?
            .ok_or_else(|| card_not_found(from))?;
        let destination = self
            .repository
            .find_by_id_and_owner(to, owner)
            .await?
            .ok_or_else(|| card_not_found(to))?;

        if !source.status.allows_funds_movement() {
            return Err(CardError::OperationConflict(format!(
                "Source card {from} is not active"
            )));
        }
        if !destination.status.allows_funds_movement() {
            return Err(CardError::OperationConflict(format!(
                "Destination card {to} is not active"
            )));
        }

        let debited = source
            .balance
            .debit(amount)
            .ok_or(CardError::InsufficientFunds(from))?;
        let credited = destination.balance.credit(amount)?;

        self.repository
            .save_atomically(
                Card {
                    balance: debited,
                    ..source
                },
                Card {
                    balance: credited,
                    ..destination
                },
            )
            .await?;
        Ok(())
    }

    pub async fn get_balance(&self, actor: &Identity, id: CardId) -> Result<Balance> {
        tracing::debug!(card = %id, owner = %actor.id, "Balance requested");
        let card = self
            .repository
            .find_by_id_and_owner(id, actor.id)
            .await?
            .ok_or_else(|| card_not_found(id))?;
        Ok(card.balance)
    }

    pub async fn get_total_balance(&self, actor: &Identity) -> Result<Balance> {
        tracing::debug!(owner = %actor.id, "Total balance requested");
        self.repository.sum_balance_by_owner(actor.id).await
    }

    pub async fn get_card(&self, actor: &Identity, id: CardId) -> Result<CardView> {
        tracing::debug!(card = %id, "Card requested");
        Ok(self.load_for(actor, id).await?.view())
    }

    /// Lists cards matching `filter`. Non-admin callers only ever see their
    /// own cards, whatever owner the filter names.
    pub async fn list_cards(&self, actor: &Identity, filter: CardFilter) -> Result<Vec<CardView>> {
        let filter = if actor.is_admin() {
            filter
        } else {
            filter.owned_by(actor.id)
        };
        tracing::debug!(?filter, "Cards requested");
        let cards = self.repository.find_all(&filter).await?;
        Ok(cards.iter().map(Card::view).collect())
    }

    pub async fn delete_card(&self, actor: &Identity, id: CardId) -> Result<()> {
        actor.require_admin("Deleting a card")?;
        tracing::warn!(card = %id, "Card deletion requested");

        let _guard = self.locks.lock(id).await;
        if !self.repository.delete(id).await? {
            return Err(card_not_found(id));
        }
        tracing::info!(card = %id, "Card deleted");
        Ok(())
    }

    async fn load_for(&self, actor: &Identity, id: CardId) -> Result<Card> {
        let card = if actor.is_admin() {
            self.repository.find_by_id(id).await?
        } else {
            self.repository.find_by_id_and_owner(id, actor.id).await?
        };
        card.ok_or_else(|| card_not_found(id))
    }
}
