//! Per-session game settings.

use loupgarou_roles::RoleCatalog;
use serde::{Deserialize, Serialize};

/// Participants needed before roles are dealt.
pub const DEFAULT_MIN_PLAYERS: usize = 9;

/// Participant slots per session.
pub const DEFAULT_MAX_PLAYERS: usize = 18;

/// Configuration shared by every session a coordinator runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Roles are dealt, and the first night starts, when the roster
    /// reaches this size.
    pub min_players: usize,

    /// Joins beyond this size fail with `SessionFull`.
    pub max_players: usize,

    /// Which roles get dealt.
    pub catalog: RoleCatalog,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            catalog: RoleCatalog::default(),
        }
    }
}

impl GameConfig {
    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// - `min_players` raised to at least 1.
    /// - `max_players` raised to at least `min_players`.
    /// - `catalog.werewolf_ratio` raised to at least 1.
    pub fn validated(mut self) -> Self {
        if self.min_players == 0 {
            tracing::warn!("min_players is 0, using 1");
            self.min_players = 1;
        }
        if self.max_players < self.min_players {
            tracing::warn!(
                max = self.max_players,
                min = self.min_players,
                "max_players below min_players, raising"
            );
            self.max_players = self.min_players;
        }
        if self.catalog.werewolf_ratio == 0 {
            tracing::warn!("werewolf_ratio is 0, using 1");
            self.catalog.werewolf_ratio = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default() {
        let config = GameConfig::default();
        assert_eq!(config.min_players, 9);
        assert_eq!(config.max_players, 18);
        assert_eq!(config.catalog.essential.len(), 7);
        assert_eq!(config.catalog.werewolf_ratio, 4);
    }

    #[test]
    fn test_validated_clamps_bad_values() {
        let config = GameConfig {
            min_players: 0,
            max_players: 0,
            catalog: RoleCatalog {
                essential: vec![],
                werewolf_ratio: 0,
            },
        }
        .validated();

        assert_eq!(config.min_players, 1);
        assert_eq!(config.max_players, 1);
        assert_eq!(config.catalog.werewolf_ratio, 1);
    }

    #[test]
    fn test_validated_keeps_sane_values() {
        let config = GameConfig {
            min_players: 5,
            max_players: 10,
            ..GameConfig::default()
        };
        assert_eq!(config.clone().validated(), config);
    }
}
