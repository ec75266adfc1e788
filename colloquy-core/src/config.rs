//! Configuration for the conversation engine.
//!
//! Maps directly to `colloquy.toml`. Every table is optional; missing keys
//! fall back to the stock tuning.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TalkConfig {
    /// Rumor mill seeding.
    #[serde(default)]
    pub rumors: RumorConfig,
    /// NPC topic knowledge.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    /// Location hint behavior.
    #[serde(default)]
    pub hints: HintConfig,
    /// Conversation gate.
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Work questor pool.
    #[serde(default)]
    pub work: WorkConfig,
}

impl TalkConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `TalkError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::TalkError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Rumor mill settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RumorConfig {
    /// How many common rumors to seed into an empty mill.
    #[serde(default = "default_10")]
    pub common_rumor_count: usize,
}

impl Default for RumorConfig {
    fn default() -> Self {
        Self {
            common_rumor_count: 10,
        }
    }
}

/// Topic knowledge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Probability that an NPC knows about a topic the first time it is asked.
    #[serde(default = "default_0_5")]
    pub knows_chance: f64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self { knows_chance: 0.5 }
    }
}

/// Location hint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintConfig {
    /// Probability of marking the location on the map instead of giving a
    /// directional hint. Ignored while the player is indoors.
    #[serde(default = "default_0_25")]
    pub map_reveal_chance: f64,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            map_reveal_chance: 0.25,
        }
    }
}

/// Conversation gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Lowest disposition at which an NPC agrees to talk.
    #[serde(default = "default_refusal_threshold")]
    pub refusal_threshold: i32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            refusal_threshold: -20,
        }
    }
}

/// Work questor pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkConfig {
    /// Probability that an eligible building occupant offers work.
    #[serde(default = "default_0_25")]
    pub offer_chance: f64,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self { offer_chance: 0.25 }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde requires named functions)
// ---------------------------------------------------------------------------

fn default_10() -> usize {
    10
}
fn default_0_5() -> f64 {
    0.5
}
fn default_0_25() -> f64 {
    0.25
}
fn default_refusal_threshold() -> i32 {
    -20
}
