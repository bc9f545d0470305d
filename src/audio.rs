//! Sound cue contract
//!
//! The simulation only names cues; synthesis and playback belong to whatever
//! sink the host plugs in. Cues are fire-and-forget.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Player left the ground
    Jump,
    /// Enemy stomped
    Stomp,
    /// Coin collected (also plays when a block releases a power-up)
    Coin,
    /// Mushroom or flower collected
    PowerUp,
    /// Player died
    Death,
    /// Flagpole grabbed
    Flagpole,
    /// Brick hit from below (broken or not)
    BrickBreak,
    /// Fireball thrown
    Fire,
    /// Star collected
    Star,
    /// Extra life
    OneUp,
    /// Shell kicked
    Kick,
    /// Boss lost a hit point
    BossHit,
    /// Stage clear fanfare
    Clear,
}

impl SoundCue {
    pub const ALL: [SoundCue; 13] = [
        SoundCue::Jump,
        SoundCue::Stomp,
        SoundCue::Coin,
        SoundCue::PowerUp,
        SoundCue::Death,
        SoundCue::Flagpole,
        SoundCue::BrickBreak,
        SoundCue::Fire,
        SoundCue::Star,
        SoundCue::OneUp,
        SoundCue::Kick,
        SoundCue::BossHit,
        SoundCue::Clear,
    ];

    /// Built-in cue name, used when the config does not rename it
    pub fn default_name(&self) -> &'static str {
        match self {
            SoundCue::Jump => "jump",
            SoundCue::Stomp => "stomp",
            SoundCue::Coin => "coin",
            SoundCue::PowerUp => "power-up",
            SoundCue::Death => "death",
            SoundCue::Flagpole => "flagpole",
            SoundCue::BrickBreak => "brick-break",
            SoundCue::Fire => "fire",
            SoundCue::Star => "star",
            SoundCue::OneUp => "1-up",
            SoundCue::Kick => "kick",
            SoundCue::BossHit => "boss-hit",
            SoundCue::Clear => "clear",
        }
    }
}

/// Receives cues after each simulation pass. Must not block.
pub trait CueSink {
    fn play(&mut self, cue: SoundCue, name: &str);

    /// Forward every cue raised by the last tick
    fn play_all(&mut self, cues: &[SoundCue], config: &GameConfig) {
        for &cue in cues {
            self.play(cue, config.cue_name(cue));
        }
    }
}

/// Sink that only logs cue names (headless runs)
#[derive(Debug, Default)]
pub struct LogCueSink {
    pub played: u64,
}

impl CueSink for LogCueSink {
    fn play(&mut self, cue: SoundCue, name: &str) {
        self.played += 1;
        log::trace!("cue {:?} -> {}", cue, name);
    }
}

/// Collecting sink, handy for hosts that batch cues per frame
impl CueSink for Vec<String> {
    fn play(&mut self, _cue: SoundCue, name: &str) {
        self.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names_are_unique() {
        let mut names: Vec<_> = SoundCue::ALL.iter().map(|c| c.default_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SoundCue::ALL.len());
    }

    #[test]
    fn test_play_all_uses_config_names() {
        let mut config = GameConfig::default();
        config
            .cue_names
            .insert(SoundCue::Jump, "boing".to_string());
        let mut sink: Vec<String> = Vec::new();
        sink.play_all(&[SoundCue::Jump, SoundCue::Coin], &config);
        assert_eq!(sink, vec!["boing".to_string(), "coin".to_string()]);
    }
}
