//! Shop offers and purchase rules
use serde::{Deserialize, Serialize};

use crate::session::Rejection;
use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferCategory {
    Weapon,
    Armor,
    Consumable,
}

/// A single item available in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOffer {
    pub id: String,
    pub name: String,
    pub category: OfferCategory,
    /// Attack for weapons, defense for armor, heal amount for consumables.
    #[serde(default)]
    pub bonus: u32,
    pub price: u32,
    /// Permanent for weapons and armor; consumables never set it.
    #[serde(default)]
    pub bought: bool,
}

impl ShopOffer {
    /// Whether the offer can still be bought at all, ignoring gold.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !(self.bought && !matches!(self.category, OfferCategory::Consumable))
    }
}

/// What a successful purchase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub offer_name: String,
    pub category: OfferCategory,
    pub bonus: u32,
    pub price: u32,
}

impl Receipt {
    #[must_use]
    pub fn log_line(&self) -> String {
        match self.category {
            OfferCategory::Weapon => {
                format!("购买 {}，攻击力 +{}！", self.offer_name, self.bonus)
            }
            OfferCategory::Armor => {
                format!("购买 {}，防御力 +{}！", self.offer_name, self.bonus)
            }
            OfferCategory::Consumable => format!("购买 {}！", self.offer_name),
        }
    }
}

/// Buy `offer_id`, charging gold and applying its effect.
///
/// # Errors
///
/// Rejects unknown offers, equipment already bought, consumables already held,
/// and purchases the player cannot afford. Nothing is mutated on rejection.
pub fn purchase(state: &mut GameState, offer_id: &str) -> Result<Receipt, Rejection> {
    let Some(index) = state.shop_offers.iter().position(|offer| offer.id == offer_id) else {
        return Err(Rejection::UnknownOffer(offer_id.to_string()));
    };
    let offer = &state.shop_offers[index];
    if !offer.is_available() {
        return Err(Rejection::AlreadyBought);
    }
    if offer.category == OfferCategory::Consumable && state.inventory.contains(&offer.name) {
        return Err(Rejection::AlreadyHeld(offer.name.clone()));
    }
    if state.player_stats.gold < offer.price {
        return Err(Rejection::InsufficientGold);
    }

    let receipt = Receipt {
        offer_name: offer.name.clone(),
        category: offer.category,
        bonus: offer.bonus,
        price: offer.price,
    };
    state.player_stats.gold -= receipt.price;
    match receipt.category {
        OfferCategory::Weapon => {
            state.player_stats.attack += receipt.bonus;
            state.shop_offers[index].bought = true;
        }
        OfferCategory::Armor => {
            state.player_stats.defense += receipt.bonus;
            state.shop_offers[index].bought = true;
        }
        OfferCategory::Consumable => {
            state.inventory.add(&receipt.offer_name);
        }
    }
    log::debug!(
        "purchased {} for {} gold ({} left)",
        offer_id,
        receipt.price,
        state.player_stats.gold
    );
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ITEM_POTION;

    #[test]
    fn weapon_purchase_is_permanent() {
        let mut state = GameState::default();
        state.player_stats.gold = 200;
        let receipt = purchase(&mut state, "sword1").unwrap();
        assert_eq!(receipt.log_line(), "购买 铁剑，攻击力 +5！");
        assert_eq!(state.player_stats.attack, 20);
        assert_eq!(state.player_stats.gold, 120);
        assert_eq!(purchase(&mut state, "sword1"), Err(Rejection::AlreadyBought));
        assert_eq!(state.player_stats.gold, 120);
    }

    #[test]
    fn armor_adds_defense() {
        let mut state = GameState::default();
        state.player_stats.gold = 70;
        purchase(&mut state, "armor1").unwrap();
        assert_eq!(state.player_stats.defense, 11);
        assert_eq!(state.player_stats.gold, 0);
        assert!(state.shop_offers.iter().any(|offer| offer.id == "armor1" && offer.bought));
    }

    #[test]
    fn insufficient_gold_changes_nothing() {
        let mut state = GameState::default();
        let before = state.clone();
        assert_eq!(purchase(&mut state, "sword2"), Err(Rejection::InsufficientGold));
        assert_eq!(state, before);
    }

    #[test]
    fn consumable_is_repurchasable_but_never_stacks() {
        let mut state = GameState::default();
        state.player_stats.gold = 200;
        purchase(&mut state, "potion").unwrap();
        assert!(state.inventory.contains(ITEM_POTION));
        assert!(state.shop_offers.iter().all(|offer| !offer.bought));
        assert_eq!(
            purchase(&mut state, "potion"),
            Err(Rejection::AlreadyHeld(ITEM_POTION.to_string()))
        );
        assert_eq!(state.player_stats.gold, 160);

        state.inventory.remove(ITEM_POTION);
        purchase(&mut state, "potion").unwrap();
        assert_eq!(state.player_stats.gold, 120);
        assert_eq!(state.inventory.len(), 1);
    }

    #[test]
    fn unknown_offer_is_rejected() {
        let mut state = GameState::default();
        assert_eq!(
            purchase(&mut state, "dragon"),
            Err(Rejection::UnknownOffer("dragon".into()))
        );
    }
}
