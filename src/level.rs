//! Level configuration: authored layout, loading and validation
//!
//! A level is plain JSON. Platforms carry their kind inline:
//!
//! ```json
//! { "x": 0, "y": 400, "width": 600, "height": 40, "type": "solid" }
//! { "id": 7, "x": 900, "y": 300, "width": 40, "height": 40,
//!   "type": "teleporter", "link": 8 }
//! ```

use std::collections::HashSet;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::LevelError;
use crate::sim::platform::{Platform, PlatformKind};
use crate::sim::rect::Rect;

fn default_name() -> String {
    "Untitled".to_string()
}

fn default_death_plane() -> f32 {
    DEATH_PLANE_Y
}

fn default_kill_ceiling() -> f32 {
    KILL_CEILING_Y
}

fn default_one() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

/// One authored platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Stable id; defaults to the platform's position in the list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(flatten)]
    pub kind: PlatformKind,
}

impl PlatformConfig {
    pub fn new(rect: Rect, kind: PlatformKind) -> Self {
        Self {
            id: None,
            rect,
            kind,
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }
}

/// A complete level as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Seeds the glitch platforms' RNG
    #[serde(default)]
    pub seed: u64,
    pub player_start: Vec2,
    #[serde(default)]
    pub platforms: Vec<PlatformConfig>,
    /// Reaching this box completes the level
    #[serde(default)]
    pub goal: Option<Rect>,
    /// Falling below this Y kills
    #[serde(default = "default_death_plane")]
    pub death_plane_y: f32,
    /// Rising above this Y kills (flipped gravity runs)
    #[serde(default = "default_kill_ceiling")]
    pub kill_ceiling_y: f32,
    #[serde(default = "default_one")]
    pub speed_multiplier: f32,
    #[serde(default = "default_true")]
    pub allow_air_jumps: bool,
    /// Overrides the settings' air-jump allowance for this level
    #[serde(default)]
    pub max_air_jumps: Option<u32>,
    /// Level default gravity scale
    #[serde(default = "default_one")]
    pub gravity_scale: f32,
    /// Ship section: thrust instead of jumps for the whole level
    #[serde(default)]
    pub flying: bool,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: 0,
            player_start: Vec2::ZERO,
            platforms: Vec::new(),
            goal: None,
            death_plane_y: DEATH_PLANE_Y,
            kill_ceiling_y: KILL_CEILING_Y,
            speed_multiplier: 1.0,
            allow_air_jumps: true,
            max_air_jumps: None,
            gravity_scale: 1.0,
            flying: false,
        }
    }
}

impl LevelConfig {
    /// Parse and validate a level
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a level file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!(
            "Loaded level '{}' from {} ({} platforms)",
            config.name,
            path.display(),
            config.platforms.len()
        );
        Ok(config)
    }

    /// Reject authoring defects the simulation assumes away
    pub fn validate(&self) -> Result<(), LevelError> {
        let mut ids = HashSet::new();
        for (index, platform) in self.platforms.iter().enumerate() {
            let rect = platform.rect;
            if !rect.is_finite() {
                return Err(LevelError::NonFiniteGeometry { index });
            }
            if rect.width <= 0.0 || rect.height <= 0.0 {
                return Err(LevelError::InvalidGeometry {
                    index,
                    width: rect.width,
                    height: rect.height,
                });
            }
            let id = platform.id.unwrap_or(index as u32);
            if !ids.insert(id) {
                return Err(LevelError::DuplicatePlatformId(id));
            }
        }

        let start = self.player_start;
        let in_band = start.is_finite()
            && start.y < self.death_plane_y
            && start.y > self.kill_ceiling_y;
        if !in_band {
            return Err(LevelError::SpawnOutOfBounds {
                x: start.x,
                y: start.y,
                death_plane_y: self.death_plane_y,
            });
        }

        // Dangling links are legal (the portal does nothing) but worth a warning
        for platform in &self.platforms {
            if let PlatformKind::Teleporter { link: Some(link) } = platform.kind {
                if !ids.contains(&link) {
                    log::warn!("Teleporter links to unknown platform id {link}");
                }
            }
        }

        Ok(())
    }

    /// Fresh runtime platforms in authored order
    pub fn instantiate_platforms(&self) -> Vec<Platform> {
        self.platforms
            .iter()
            .enumerate()
            .map(|(index, p)| Platform::new(p.id.unwrap_or(index as u32), p.rect, p.kind))
            .collect()
    }
}
