//! Level runtime state
//!
//! Owns everything a run mutates: the player, the live platform list, the
//! broad-phase grid and the seeded RNG. The authored `LevelConfig` stays
//! alongside so the level can be reset without reloading.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::grid::SpatialGrid;
use super::platform::Platform;
use super::player::{Player, PlayerEvent};
use crate::error::LevelError;
use crate::level::LevelConfig;
use crate::settings::PhysicsSettings;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelPhase {
    Playing,
    /// Player died; waiting for `respawn` or `reset`
    Dead,
    /// Goal reached
    Complete,
}

/// Things collaborators may react to (audio, UI, stats)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Player(PlayerEvent),
    /// Crumble platform finished decaying
    PlatformDestroyed { platform: u32 },
    GoalReached,
}

/// A level being played
#[derive(Debug, Clone)]
pub struct LevelState {
    pub config: LevelConfig,
    pub settings: PhysicsSettings,
    pub player: Player,
    /// Same order as `config.platforms`; destroyed entries stay in place
    pub platforms: Vec<Platform>,
    pub grid: SpatialGrid,
    pub rng: Pcg32,
    /// Simulated time since the last reset
    pub time_ms: f64,
    pub time_ticks: u64,
    /// 1-based attempt counter (incremented by `respawn`)
    pub attempts: u32,
    pub phase: LevelPhase,
    /// Events from the most recent tick
    pub events: Vec<GameEvent>,
}

impl LevelState {
    /// Build a runnable level. Assumes `config` and `settings` are valid.
    pub fn new(config: LevelConfig, settings: PhysicsSettings) -> Self {
        let platforms = config.instantiate_platforms();
        let grid = SpatialGrid::from_items(settings.cell_size, &platforms);
        let player = spawn_player(&config, settings);
        let rng = Pcg32::seed_from_u64(config.seed);
        Self {
            config,
            settings,
            player,
            platforms,
            grid,
            rng,
            time_ms: 0.0,
            time_ticks: 0,
            attempts: 1,
            phase: LevelPhase::Playing,
            events: Vec::new(),
        }
    }

    /// Validate both inputs, then build
    pub fn try_new(config: LevelConfig, settings: PhysicsSettings) -> Result<Self, LevelError> {
        settings.validate()?;
        config.validate()?;
        Ok(Self::new(config, settings))
    }

    /// Restart from scratch: fresh platforms, player and RNG
    pub fn reset(&mut self) {
        self.platforms = self.config.instantiate_platforms();
        self.grid.build(&self.platforms);
        self.player = spawn_player(&self.config, self.settings);
        self.rng = Pcg32::seed_from_u64(self.config.seed);
        self.time_ms = 0.0;
        self.time_ticks = 0;
        self.attempts = 1;
        self.phase = LevelPhase::Playing;
        self.events.clear();
        log::debug!("level '{}' reset", self.config.name);
    }

    /// New player at the spawn point; platform state carries over
    pub fn respawn(&mut self) {
        self.player = spawn_player(&self.config, self.settings);
        self.attempts += 1;
        self.phase = LevelPhase::Playing;
        self.events.clear();
        log::debug!("attempt {} on '{}'", self.attempts, self.config.name);
    }

    /// Indices of live platforms near the camera (render culling)
    pub fn visible_platforms(
        &self,
        camera_x: f32,
        viewport_width: f32,
        viewport_height: f32,
        margin: f32,
    ) -> Vec<usize> {
        self.grid
            .query_viewport(camera_x, viewport_width, viewport_height, margin)
            .into_iter()
            .filter(|&i| self.platforms.get(i).is_some_and(|p| !p.destroyed))
            .collect()
    }

    /// Horizontal distance covered since spawn
    pub fn distance(&self) -> f32 {
        self.player.position.x - self.config.player_start.x
    }

    pub fn is_over(&self) -> bool {
        self.phase != LevelPhase::Playing
    }

    pub fn platform_by_id(&self, id: u32) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }
}

fn spawn_player(config: &LevelConfig, settings: PhysicsSettings) -> Player {
    let mut player = Player::new(config.player_start, settings)
        .with_gravity_scale(config.gravity_scale)
        .with_flying(config.flying);
    if let Some(max) = config.max_air_jumps {
        player.max_air_jumps = max;
    }
    player
}
