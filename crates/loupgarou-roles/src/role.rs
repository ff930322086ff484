//! Roles and the night actions they grant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RoleError;

/// A hidden label dealt to each participant.
///
/// Serialized with the French names the clients display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Loup-garou")]
    Werewolf,
    #[serde(rename = "Corbeau")]
    Raven,
    #[serde(rename = "Salvateur")]
    Savior,
    #[serde(rename = "Voyante")]
    Seer,
    #[serde(rename = "Sorcière")]
    Witch,
    #[serde(rename = "Ancien")]
    Elder,
    #[serde(rename = "Chasseur")]
    Hunter,
    #[serde(rename = "Villageois")]
    Villager,
}

impl Role {
    /// The display name, identical to the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            Self::Werewolf => "Loup-garou",
            Self::Raven => "Corbeau",
            Self::Savior => "Salvateur",
            Self::Seer => "Voyante",
            Self::Witch => "Sorcière",
            Self::Elder => "Ancien",
            Self::Hunter => "Chasseur",
            Self::Villager => "Villageois",
        }
    }

    /// The night actions this role may submit.
    pub fn night_actions(self) -> &'static [NightActionKind] {
        match self {
            Self::Werewolf => &[NightActionKind::Kill],
            Self::Savior => &[NightActionKind::Protect],
            Self::Seer => &[NightActionKind::Inspect],
            Self::Witch => &[NightActionKind::Heal, NightActionKind::Poison],
            Self::Raven => &[NightActionKind::Mark],
            Self::Elder | Self::Hunter | Self::Villager => &[],
        }
    }

    /// Returns `true` if this role may submit `action` at night.
    pub fn grants(self, action: NightActionKind) -> bool {
        self.night_actions().contains(&action)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A private action submitted during the night phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightActionKind {
    /// Werewolves vote on a victim.
    Kill,
    /// The savior shields one participant from the werewolves.
    Protect,
    /// The seer learns one participant's role.
    Inspect,
    /// The witch saves the werewolves' victim.
    Heal,
    /// The witch kills one participant outright.
    Poison,
    /// The raven marks a suspect for the next day.
    Mark,
}

impl NightActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kill => "kill",
            Self::Protect => "protect",
            Self::Inspect => "inspect",
            Self::Heal => "heal",
            Self::Poison => "poison",
            Self::Mark => "mark",
        }
    }
}

impl fmt::Display for NightActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NightActionKind {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kill" => Ok(Self::Kill),
            "protect" => Ok(Self::Protect),
            "inspect" => Ok(Self::Inspect),
            "heal" => Ok(Self::Heal),
            "poison" => Ok(Self::Poison),
            "mark" => Ok(Self::Mark),
            other => Err(RoleError::UnknownAction(other.to_string())),
        }
    }
}
