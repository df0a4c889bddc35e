//! Card drawing: a local weighted draw over a pooled card deck. No provider
//! round-trip; the draw is seeded by the task id so one invocation is
//! reproducible.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::TaskId;
use crate::error::{ForgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One drawable card face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardFace {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    /// Draw weight; higher is more common.
    pub weight: u32,
    /// Pre-rendered card artwork reference.
    pub image: String,
    pub blessing: String,
}

#[derive(Debug, Clone)]
pub struct CardDraw {
    pub card: CardFace,
    /// Display tags describing the draw.
    pub tags: Vec<String>,
}

pub struct CardDrawStage<'a> {
    cards: &'a [CardFace],
}

impl<'a> CardDrawStage<'a> {
    pub fn new(cards: &'a [CardFace]) -> Self {
        Self { cards }
    }

    /// Weighted draw over the pool, deterministic per task id.
    pub fn draw(&self, task_id: &TaskId) -> Result<CardDraw> {
        if self.cards.is_empty() {
            return Err(ForgeError::Config("card pool is empty".into()));
        }

        let total: u64 = self.cards.iter().map(|c| u64::from(c.weight.max(1))).sum();
        let mut pick = task_id.hash_index(total as usize) as u64;

        for card in self.cards {
            let weight = u64::from(card.weight.max(1));
            if pick < weight {
                debug!(card = %card.id, rarity = %card.rarity, "card drawn");
                return Ok(CardDraw {
                    tags: vec![
                        format!("fortune: {}", card.name),
                        format!("rarity: {}", card.rarity),
                        format!("blessing: {}", card.blessing),
                    ],
                    card: card.clone(),
                });
            }
            pick -= weight;
        }

        // Unreachable while pick < total; keep the last card as a guard.
        let card = self.cards[self.cards.len() - 1].clone();
        Ok(CardDraw {
            tags: vec![
                format!("fortune: {}", card.name),
                format!("rarity: {}", card.rarity),
                format!("blessing: {}", card.blessing),
            ],
            card,
        })
    }
}
