use super::card_writer::CardRow;
use super::command_reader::{Command, CommandType};
use crate::application::engine::CardEngine;
use crate::domain::balance::Balance;
use crate::domain::card::{CardId, Expiry, OwnerId};
use crate::domain::lifecycle::{CardStatus, Identity, Role};
use crate::domain::ports::CardFilter;
use crate::error::{CardError, Result};
use std::collections::HashMap;
use uuid::Uuid;

/// Namespace for deriving stable owner ids from user labels, so the same
/// label refers to the same owner across runs against one database.
const OWNER_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a3e_8d4b_4f0a_9b7e_5c2d_1e8f_3a60);

fn owner_id(label: &str) -> OwnerId {
    OwnerId::from_uuid(Uuid::new_v5(&OWNER_NAMESPACE, label.as_bytes()))
}

/// Drives a [`CardEngine`] from scripted commands.
pub struct CommandRunner<'a> {
    engine: &'a CardEngine,
    owners: HashMap<OwnerId, String>,
    cards: HashMap<String, CardId>,
}

impl<'a> CommandRunner<'a> {
    pub fn new(engine: &'a CardEngine) -> Self {
        Self {
            engine,
            owners: HashMap::new(),
            cards: HashMap::new(),
        }
    }

    fn identity(&mut self, label: &str, role: Role) -> Identity {
        let id = self.owner(label);
        Identity { id, role }
    }

    fn owner(&mut self, label: &str) -> OwnerId {
        let id = owner_id(label);
        self.owners.entry(id).or_insert_with(|| label.to_string());
        id
    }

    fn card(&self, label: &str) -> Result<CardId> {
        if let Some(id) = self.cards.get(label) {
            return Ok(*id);
        }
        Uuid::parse_str(label)
            .map(CardId::from_uuid)
            .map_err(|_| CardError::NotFound(format!("Unknown card '{label}'")))
    }

    pub async fn apply(&mut self, command: Command) -> Result<()> {
        let actor = self.identity(&command.user, command.role);

        match command.op {
            CommandType::Issue => {
                if self.cards.contains_key(&command.card) {
                    return Err(CardError::InvalidRequest(format!(
                        "Card label '{}' is already in use",
                        command.card
                    )));
                }
                let owner_label = command.owner.as_deref().ok_or_else(|| missing("owner"))?;
                let owner = self.owner(owner_label);
                let expiry = command.expiry.as_deref().ok_or_else(|| missing("expiry"))?;
                let expiry = Expiry::parse(expiry)?;
                let opening = match command.amount {
                    Some(amount) => Balance::new(amount)?,
                    None => Balance::ZERO,
                };

                let card = self
                    .engine
                    .issue_card_with_balance(&actor, owner, expiry, opening)
                    .await?;
                self.cards.insert(command.card, card.id);
            }
            CommandType::Block => {
                let card = self.card(&command.card)?;
                self.engine.set_status(&actor, card, CardStatus::Blocked).await?;
            }
            CommandType::Activate => {
                let card = self.card(&command.card)?;
                self.engine.set_status(&actor, card, CardStatus::Active).await?;
            }
            CommandType::Transfer => {
                let from = self.card(&command.card)?;
                let to = self.card(command.to.as_deref().ok_or_else(|| missing("to"))?)?;
                let amount = command.amount.ok_or_else(|| missing("amount"))?;
                self.engine.transfer(&actor, from, to, amount).await?;
            }
            CommandType::Delete => {
                let card = self.card(&command.card)?;
                self.engine.delete_card(&actor, card).await?;
                self.cards.retain(|_, id| *id != card);
            }
        }
        Ok(())
    }

    /// Every stored card, labelled where this run knows a label, ordered by
    /// card label.
    pub async fn report(&self) -> Result<Vec<CardRow>> {
        let auditor = Identity::admin(OwnerId::from_uuid(Uuid::nil()));
        let labels: HashMap<CardId, &str> = self
            .cards
            .iter()
            .map(|(label, id)| (*id, label.as_str()))
            .collect();

        let mut rows: Vec<CardRow> = self
            .engine
            .list_cards(&auditor, CardFilter::default())
            .await?
            .into_iter()
            .map(|view| CardRow {
                card: labels
                    .get(&view.id)
                    .map(|label| label.to_string())
                    .unwrap_or_else(|| view.id.to_string()),
                owner: self
                    .owners
                    .get(&view.owner)
                    .cloned()
                    .unwrap_or_else(|| view.owner.to_string()),
                number: view.masked_number,
                expiry: view.expiry.to_string(),
                status: view.status.to_string(),
                balance: view.balance.to_string(),
            })
            .collect();
        rows.sort_by(|a, b| a.card.cmp(&b.card));
        Ok(rows)
    }
}

fn missing(field: &str) -> CardError {
    CardError::InvalidRequest(format!("Missing '{field}' column"))
}
