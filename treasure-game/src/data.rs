//! Static content: shop offers, enemy templates and random-event tables.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::battle::EnemyTemplate;
use crate::events::EventTables;
use crate::store::ShopOffer;

const DEFAULT_SHOP_DATA: &str = include_str!("../assets/data/shop.json");
const DEFAULT_ENEMY_DATA: &str = include_str!("../assets/data/enemies.json");
const DEFAULT_EVENT_DATA: &str = include_str!("../assets/data/events.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShopData {
    #[serde(default)]
    pub offers: Vec<ShopOffer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnemyData {
    #[serde(default)]
    pub enemies: Vec<EnemyTemplate>,
}

impl EnemyData {
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&EnemyTemplate> {
        self.enemies.iter().find(|enemy| enemy.id == id)
    }
}

/// Container for all content the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameCatalog {
    pub shop: ShopData,
    pub enemies: EnemyData,
    pub events: EventTables,
}

impl GameCatalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a catalog from its three JSON documents.
    ///
    /// # Errors
    ///
    /// Returns an error if any document cannot be parsed.
    pub fn from_json(shop: &str, enemies: &str, events: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            shop: serde_json::from_str(shop)?,
            enemies: serde_json::from_str(enemies)?,
            events: serde_json::from_str(events)?,
        })
    }

    /// Load the catalog bundled with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_SHOP_DATA, DEFAULT_ENEMY_DATA, DEFAULT_EVENT_DATA).unwrap_or_else(
            |err| {
                log::error!("bundled game data failed to parse: {err}");
                Self::empty()
            },
        )
    }
}

/// Process-wide bundled catalog.
#[must_use]
pub fn catalog() -> &'static GameCatalog {
    static CATALOG: OnceLock<GameCatalog> = OnceLock::new();
    CATALOG.get_or_init(GameCatalog::load_from_static)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OfferCategory;

    #[test]
    fn bundled_catalog_parses() {
        let catalog =
            GameCatalog::from_json(DEFAULT_SHOP_DATA, DEFAULT_ENEMY_DATA, DEFAULT_EVENT_DATA)
                .expect("bundled data parses");
        assert_eq!(catalog.shop.offers.len(), 5);
        assert_eq!(catalog.events.temple.len(), 5);
        assert_eq!(catalog.events.common.len(), 6);
        let guard = catalog.enemies.find("temple_guard").expect("guard template");
        assert!(guard.guard);
        assert_eq!(guard.health, 70);
        let trap = catalog.enemies.find("trap_monster").expect("trap template");
        assert!(!trap.guard);
    }

    #[test]
    fn temple_table_has_no_item_drops() {
        assert!(catalog().events.temple.iter().all(|event| event.item.is_none()));
        assert!(catalog().events.common.iter().any(|event| event.item.is_some()));
    }

    #[test]
    fn only_potion_is_consumable() {
        let consumables: Vec<_> = catalog()
            .shop
            .offers
            .iter()
            .filter(|offer| offer.category == OfferCategory::Consumable)
            .map(|offer| offer.id.as_str())
            .collect();
        assert_eq!(consumables, ["potion"]);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(GameCatalog::from_json("{", "{}", "{}").is_err());
    }
}
