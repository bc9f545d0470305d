//! Game configuration
//!
//! Lookup tables that would otherwise be ambient globals (level-type rule,
//! sound cue names) plus tunables and external stage overrides. Built once
//! and passed into the game state.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::SoundCue;
use crate::error::GameError;
use crate::sim::level::{LevelType, StageKey};

/// Which (world, stage) pairs map to which level type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTypeRule {
    /// Stage index that is always a castle
    pub castle_stage: u8,
    /// Stage index that is underground in `underground_worlds`
    pub underground_stage: u8,
    pub underground_worlds: Vec<u8>,
    /// Stage index that is underwater in `underwater_worlds`
    pub underwater_stage: u8,
    pub underwater_worlds: Vec<u8>,
}

impl Default for LevelTypeRule {
    fn default() -> Self {
        Self {
            castle_stage: 4,
            underground_stage: 2,
            underground_worlds: vec![1, 3, 5, 7],
            underwater_stage: 3,
            underwater_worlds: vec![2, 4, 6, 8],
        }
    }
}

impl LevelTypeRule {
    /// Total over every key: the castle check wins, anything unmatched is overworld
    pub fn level_type(&self, key: StageKey) -> LevelType {
        if key.stage == self.castle_stage {
            LevelType::Castle
        } else if key.stage == self.underground_stage && self.underground_worlds.contains(&key.world)
        {
            LevelType::Underground
        } else if key.stage == self.underwater_stage && self.underwater_worlds.contains(&key.world) {
            LevelType::Underwater
        } else {
            LevelType::Overworld
        }
    }
}

/// Game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Lives at the start of a run
    pub starting_lives: u8,
    /// Stage countdown in seconds
    pub stage_time_secs: f32,
    /// Width of the render viewport in pixels (drives camera and visible columns)
    pub view_width: f32,
    /// Death timer value after which the stage reloads
    pub death_reload_ticks: u32,

    pub level_types: LevelTypeRule,

    /// Cue renames; missing cues fall back to their built-in names
    pub cue_names: BTreeMap<SoundCue, String>,

    /// External stage overrides keyed "world-stage", row-major tile codes
    pub stage_overrides: BTreeMap<String, Vec<Vec<u8>>>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_lives: 3,
            stage_time_secs: 400.0,
            view_width: 800.0,
            death_reload_ticks: 90,
            level_types: LevelTypeRule::default(),
            cue_names: SoundCue::ALL
                .iter()
                .map(|c| (*c, c.default_name().to_string()))
                .collect(),
            stage_overrides: BTreeMap::new(),
        }
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, GameError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file, falling back to defaults when missing or unparseable
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_json_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn level_type(&self, key: StageKey) -> LevelType {
        self.level_types.level_type(key)
    }

    pub fn cue_name(&self, cue: SoundCue) -> &str {
        self.cue_names
            .get(&cue)
            .map(String::as_str)
            .unwrap_or_else(|| cue.default_name())
    }

    /// Register an override for a stage (replaces generation for that key)
    pub fn set_override(&mut self, key: StageKey, rows: Vec<Vec<u8>>) {
        self.stage_overrides.insert(key.to_string(), rows);
    }

    pub fn stage_override(&self, key: StageKey) -> Option<&Vec<Vec<u8>>> {
        self.stage_overrides.get(&key.to_string())
    }

    /// Read every `level_<w>-<s>.json` in `dir` as a stage override.
    /// Other files are ignored. Returns how many overrides were registered.
    pub fn load_overrides_dir(&mut self, dir: &Path) -> Result<usize, GameError> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(key) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(override_key)
            else {
                continue;
            };
            let rows: Vec<Vec<u8>> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
            log::info!("Override for stage {} from {}", key, path.display());
            self.set_override(key, rows);
            loaded += 1;
        }
        Ok(loaded)
    }
}

/// Stage key from an override file name like `level_3-2.json`
fn override_key(file_name: &str) -> Option<StageKey> {
    let (world, stage) = file_name
        .strip_prefix("level_")?
        .strip_suffix(".json")?
        .split_once('-')?;
    StageKey::new(world.parse().ok()?, stage.parse().ok()?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_type_table() {
        let rule = LevelTypeRule::default();
        let key = |world, stage| StageKey { world, stage };
        assert_eq!(rule.level_type(key(1, 1)), LevelType::Overworld);
        assert_eq!(rule.level_type(key(1, 2)), LevelType::Underground);
        assert_eq!(rule.level_type(key(2, 2)), LevelType::Overworld);
        assert_eq!(rule.level_type(key(2, 3)), LevelType::Underwater);
        assert_eq!(rule.level_type(key(3, 3)), LevelType::Overworld);
        assert_eq!(rule.level_type(key(8, 4)), LevelType::Castle);
        assert_eq!(rule.level_type(key(7, 2)), LevelType::Underground);
    }

    #[test]
    fn test_level_type_total_and_exclusive() {
        let rule = LevelTypeRule::default();
        let mut counts = [0usize; 4];
        for world in 1..=8u8 {
            for stage in 1..=4u8 {
                let lt = rule.level_type(StageKey { world, stage });
                // Pure: same answer twice
                assert_eq!(lt, rule.level_type(StageKey { world, stage }));
                let expected = if stage == 4 {
                    LevelType::Castle
                } else if stage == 2 && world % 2 == 1 {
                    LevelType::Underground
                } else if stage == 3 && world % 2 == 0 {
                    LevelType::Underwater
                } else {
                    LevelType::Overworld
                };
                assert_eq!(lt, expected, "world {} stage {}", world, stage);
                counts[lt as usize] += 1;
            }
        }
        assert_eq!(counts.iter().sum::<usize>(), 32);
        assert_eq!(counts[LevelType::Castle as usize], 8);
        assert_eq!(counts[LevelType::Underground as usize], 4);
        assert_eq!(counts[LevelType::Underwater as usize], 4);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(r#"{ "starting_lives": 5 }"#).unwrap();
        assert_eq!(config.starting_lives, 5);
        assert_eq!(config.stage_time_secs, 400.0);
        assert_eq!(config.cue_name(SoundCue::OneUp), "1-up");
    }

    #[test]
    fn test_cue_rename_and_override_roundtrip() {
        let json = r#"{
            "cue_names": { "Stomp": "squish" },
            "stage_overrides": { "2-1": [[0, 0], [1, 1]] }
        }"#;
        let config = GameConfig::from_json_str(json).unwrap();
        assert_eq!(config.cue_name(SoundCue::Stomp), "squish");
        // Renamed map replaces the default table, missing cues fall back
        assert_eq!(config.cue_name(SoundCue::Kick), "kick");
        let rows = config.stage_override(StageKey { world: 2, stage: 1 }).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = GameConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, GameError::Config(_)));
    }

    #[test]
    fn test_override_file_names() {
        assert_eq!(override_key("level_3-2.json"), Some(StageKey { world: 3, stage: 2 }));
        assert_eq!(override_key("level_9-1.json"), None);
        assert_eq!(override_key("level_1-1.txt"), None);
        assert_eq!(override_key("notes.json"), None);
    }

    #[test]
    fn test_load_overrides_dir() {
        let dir = std::env::temp_dir().join(format!("tilerun-overrides-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("level_4-3.json"), "[[0, 0, 0], [1, 1, 1]]").unwrap();
        std::fs::write(dir.join("readme.md"), "ignored").unwrap();

        let mut config = GameConfig::default();
        assert_eq!(config.load_overrides_dir(&dir).unwrap(), 1);
        let rows = config.stage_override(StageKey { world: 4, stage: 3 }).unwrap();
        assert_eq!(rows[1], vec![1, 1, 1]);
        std::fs::remove_dir_all(&dir).unwrap();

        let err = config.load_overrides_dir(&dir).unwrap_err();
        assert!(matches!(err, GameError::Io(_)));
    }
}
