//! Intents dispatched by the UI layer.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::Location;

/// A request to mutate the active game, serialized as `{"type": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Intent {
    Navigate {
        location: Location,
    },
    BuyItem {
        #[serde(rename = "offerId")]
        offer_id: String,
    },
    SearchClue,
    DecodeScript,
    FindBoat,
    CrossRiver,
    SearchTemple,
    OpenBox,
    TriggerRandomEvent,
    Attack,
    UsePotion,
    Flee,
    ResetGame,
}

impl Intent {
    /// Wire name of the intent.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::BuyItem { .. } => "buyItem",
            Self::SearchClue => "searchClue",
            Self::DecodeScript => "decodeScript",
            Self::FindBoat => "findBoat",
            Self::CrossRiver => "crossRiver",
            Self::SearchTemple => "searchTemple",
            Self::OpenBox => "openBox",
            Self::TriggerRandomEvent => "triggerRandomEvent",
            Self::Attack => "attack",
            Self::UsePotion => "usePotion",
            Self::Flee => "flee",
            Self::ResetGame => "resetGame",
        }
    }

    /// Player-facing action name used in rejection lines.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "前往",
            Self::BuyItem { .. } => "购买",
            Self::SearchClue => "寻找线索",
            Self::DecodeScript => "解密古文",
            Self::FindBoat => "寻找小船",
            Self::CrossRiver => "渡河",
            Self::SearchTemple => "搜索神庙",
            Self::OpenBox => "打开宝箱",
            Self::TriggerRandomEvent => "触发随机事件",
            Self::Attack => "攻击",
            Self::UsePotion => "使用药水",
            Self::Flee => "逃跑",
            Self::ResetGame => "重新开始",
        }
    }

    /// Intents that are only meaningful inside a battle.
    #[must_use]
    pub const fn is_battle_action(&self) -> bool {
        matches!(self, Self::Attack | Self::UsePotion | Self::Flee)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { location } => write!(f, "navigate({location})"),
            Self::BuyItem { offer_id } => write!(f, "buyItem({offer_id})"),
            other => f.write_str(other.name()),
        }
    }
}
