//! Card status state machine and the capability model guarding it.
//!
//! `Expired` is set by an external time-driven process. No operation here
//! ever enters it; cards in that state are only observed.

use super::card::OwnerId;
use crate::error::{CardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Blocked,
    Expired,
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardStatus::Active => "active",
            CardStatus::Blocked => "blocked",
            CardStatus::Expired => "expired",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// The authenticated caller, resolved by the surrounding layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: OwnerId,
    pub role: Role,
}

impl Identity {
    pub fn user(id: OwnerId) -> Self {
        Self { id, role: Role::User }
    }

    pub fn admin(id: OwnerId) -> Self {
        Self { id, role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self, operation: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CardError::Forbidden(format!("{operation} requires the admin role")))
        }
    }
}

/// Outcome of a permitted status change request.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Transition {
    /// The card moves to the given status.
    Changed(CardStatus),
    /// The card already has the requested status.
    Unchanged,
}

impl CardStatus {
    /// Whether funds may flow into or out of a card in this status.
    pub fn allows_funds_movement(self) -> bool {
        self == CardStatus::Active
    }

    /// Decides whether `role` may move a card from `self` to `target`.
    pub fn transition(self, target: CardStatus, role: Role) -> Result<Transition> {
        use CardStatus::*;

        match (self, target) {
            (_, Expired) => Err(CardError::InvalidTransition(
                "Status cannot be set to expired manually".to_string(),
            )),
            (Expired, Active) => Err(CardError::InvalidTransition(
                "Cannot activate an expired card".to_string(),
            )),
            (Expired, Blocked) => match role {
                Role::Admin => Ok(Transition::Changed(Blocked)),
                Role::User => Err(CardError::OperationConflict(
                    "Only an active card can be blocked by its owner".to_string(),
                )),
            },
            (Active, Active) | (Blocked, Blocked) => Ok(Transition::Unchanged),
            (Active, Blocked) => Ok(Transition::Changed(Blocked)),
            (Blocked, Active) => match role {
                Role::Admin => Ok(Transition::Changed(Active)),
                Role::User => Err(CardError::Forbidden(
                    "Only an admin can activate a card".to_string(),
                )),
            },
        }
    }
}
