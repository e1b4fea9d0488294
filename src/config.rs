use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AGENT_BASE_SPEED, AGENT_HOME_CORNERS, AGENT_RESET_POSITIONS, BONUS_DOT_COUNTS,
    BONUS_LIFETIME_MS, BONUS_POSITION, CAGE_EXIT_POINT, CAGE_RETURN_POINT, COLLISION_DISTANCE,
    FOURTH_AGENT_RELEASE_DOTS, FRIGHTEN_DURATION_MS, PLAYER_BASE_SPEED, PLAYER_START,
    STARTING_LIVES, THIRD_AGENT_RELEASE_DOTS, TILE_SIZE,
};
use crate::error::{ConfigError, Result};
use crate::types::Point;

/// Tuning block for one round. Missing JSON fields fall back to the stock values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub tile_size: u32,
    pub agent_speed: f32,
    pub player_speed: f32,
    pub frighten_duration_ms: u64,
    pub starting_lives: u32,
    pub collision_distance: f32,
    pub third_agent_release_dots: u32,
    pub fourth_agent_release_dots: u32,
    pub bonus_dot_counts: Vec<u32>,
    pub bonus_lifetime_ms: u64,
    pub cage_exit: Point,
    pub cage_return: Point,
    pub player_start: Point,
    pub bonus_position: Point,
    pub reset_positions: [Point; 4],
    pub home_corners: [Point; 4],
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            agent_speed: AGENT_BASE_SPEED,
            player_speed: PLAYER_BASE_SPEED,
            frighten_duration_ms: FRIGHTEN_DURATION_MS,
            starting_lives: STARTING_LIVES,
            collision_distance: COLLISION_DISTANCE,
            third_agent_release_dots: THIRD_AGENT_RELEASE_DOTS,
            fourth_agent_release_dots: FOURTH_AGENT_RELEASE_DOTS,
            bonus_dot_counts: BONUS_DOT_COUNTS.to_vec(),
            bonus_lifetime_ms: BONUS_LIFETIME_MS,
            cage_exit: CAGE_EXIT_POINT.into(),
            cage_return: CAGE_RETURN_POINT.into(),
            player_start: PLAYER_START.into(),
            bonus_position: BONUS_POSITION.into(),
            reset_positions: AGENT_RESET_POSITIONS.map(Point::from),
            home_corners: AGENT_HOME_CORNERS.map(Point::from),
        }
    }
}

impl GameConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects values that would make the round meaningless before any grid exists.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size < 2 {
            return Err(ConfigError::Invalid(format!(
                "tileSize must be at least 2, got {}",
                self.tile_size
            )));
        }
        if self.agent_speed <= 0.0 || self.player_speed <= 0.0 {
            return Err(ConfigError::Invalid("speeds must be positive".to_string()));
        }
        if self.third_agent_release_dots > self.fourth_agent_release_dots {
            return Err(ConfigError::Invalid(format!(
                "third agent release ({}) comes after fourth ({})",
                self.third_agent_release_dots, self.fourth_agent_release_dots
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_stock_defaults() {
        let config =
            GameConfig::from_json_str(r#"{"startingLives": 5, "agentSpeed": 72.5}"#).unwrap();
        assert_eq!(config.starting_lives, 5);
        assert_eq!(config.agent_speed, 72.5);
        assert_eq!(config.frighten_duration_ms, FRIGHTEN_DURATION_MS);
        assert_eq!(config.cage_exit, Point::new(140.0, 115.0));
        assert_eq!(config.bonus_dot_counts, vec![70, 170]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = GameConfig::from_json_str(r#"{"tileSize": 1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GameConfig::from_json_str(
            r#"{"thirdAgentReleaseDots": 90, "fourthAgentReleaseDots": 60}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("third agent release"));
    }

    #[test]
    fn malformed_json_surfaces_as_json_error() {
        let err = GameConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn missing_file_surfaces_as_io_error() {
        let err = GameConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
