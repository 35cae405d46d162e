//! Physics tuning and assist presets
//!
//! Loaded from JSON alongside a level; any field left out keeps its default.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::LevelError;

/// Input forgiveness presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AssistPreset {
    Relaxed,
    #[default]
    Standard,
    Strict,
}

impl AssistPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistPreset::Relaxed => "Relaxed",
            AssistPreset::Standard => "Standard",
            AssistPreset::Strict => "Strict",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relaxed" | "easy" => Some(AssistPreset::Relaxed),
            "standard" | "normal" => Some(AssistPreset::Standard),
            "strict" | "hard" => Some(AssistPreset::Strict),
            _ => None,
        }
    }

    /// Multiplier applied to the coyote and jump-buffer windows
    pub fn window_scale(&self) -> f32 {
        match self {
            AssistPreset::Relaxed => 1.75,
            AssistPreset::Standard => 1.0,
            AssistPreset::Strict => 0.5,
        }
    }

    /// Air jumps granted by this preset
    pub fn air_jumps(&self) -> u32 {
        match self {
            AssistPreset::Relaxed => MAX_AIR_JUMPS + 1,
            AssistPreset::Standard => MAX_AIR_JUMPS,
            AssistPreset::Strict => 0,
        }
    }
}

/// Tunable physics parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub assist: AssistPreset,

    // === Vertical ===
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_force: f32,
    pub bounce_multiplier: f32,
    pub max_air_jumps: u32,

    // === Horizontal ===
    pub base_speed: f32,
    pub ground_friction: f32,
    pub ice_friction: f32,
    pub air_friction: f32,

    // === Timing windows (ms) ===
    pub coyote_ms: f32,
    pub jump_buffer_ms: f32,

    // === Dash ===
    pub dash_speed: f32,
    pub dash_duration_ms: f32,
    pub dash_cooldown_ms: f32,

    // === Walls ===
    pub wall_slide_speed: f32,
    pub wall_jump_push: f32,

    // === Environments ===
    pub underwater_gravity_scale: f32,
    pub underwater_max_fall: f32,
    pub swim_force: f32,
    pub fly_thrust: f32,
    pub fly_gravity_scale: f32,
    pub fly_max_speed: f32,

    pub rotation_speed: f32,
    pub player_size: f32,

    // === Platforms ===
    pub cell_size: f32,
    pub crumble_delay_ms: f32,
    pub crumble_fall_ms: f32,
    pub portal_cooldown_ms: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            assist: AssistPreset::Standard,

            gravity: GRAVITY,
            max_fall_speed: MAX_FALL_SPEED,
            jump_force: JUMP_FORCE,
            bounce_multiplier: BOUNCE_MULTIPLIER,
            max_air_jumps: MAX_AIR_JUMPS,

            base_speed: BASE_SPEED,
            ground_friction: GROUND_FRICTION,
            ice_friction: ICE_FRICTION,
            air_friction: AIR_FRICTION,

            coyote_ms: COYOTE_MS,
            jump_buffer_ms: JUMP_BUFFER_MS,

            dash_speed: DASH_SPEED,
            dash_duration_ms: DASH_DURATION_MS,
            dash_cooldown_ms: DASH_COOLDOWN_MS,

            wall_slide_speed: WALL_SLIDE_SPEED,
            wall_jump_push: WALL_JUMP_PUSH,

            underwater_gravity_scale: UNDERWATER_GRAVITY_SCALE,
            underwater_max_fall: UNDERWATER_MAX_FALL,
            swim_force: SWIM_FORCE,
            fly_thrust: FLY_THRUST,
            fly_gravity_scale: FLY_GRAVITY_SCALE,
            fly_max_speed: FLY_MAX_SPEED,

            rotation_speed: ROTATION_SPEED,
            player_size: PLAYER_SIZE,

            cell_size: CELL_SIZE,
            crumble_delay_ms: CRUMBLE_DELAY_MS,
            crumble_fall_ms: CRUMBLE_FALL_MS,
            portal_cooldown_ms: PORTAL_COOLDOWN_MS,
        }
    }
}

impl PhysicsSettings {
    /// Create settings from an assist preset (applies preset windows)
    pub fn from_preset(preset: AssistPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply an assist preset on top of the default windows
    pub fn apply_preset(&mut self, preset: AssistPreset) {
        self.assist = preset;
        self.coyote_ms = COYOTE_MS * preset.window_scale();
        self.jump_buffer_ms = JUMP_BUFFER_MS * preset.window_scale();
        self.max_air_jumps = preset.air_jumps();
    }

    /// Parse settings JSON; missing fields keep their defaults.
    ///
    /// A named `assist` preset sets the forgiveness windows and air jumps,
    /// unless the same file spells those fields out.
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let parsed: Self = serde_json::from_value(value.clone())?;
        let mut settings = parsed;

        if value.get("assist").is_some() {
            settings.apply_preset(parsed.assist);
            if value.get("coyote_ms").is_some() {
                settings.coyote_ms = parsed.coyote_ms;
            }
            if value.get("jump_buffer_ms").is_some() {
                settings.jump_buffer_ms = parsed.jump_buffer_ms;
            }
            if value.get("max_air_jumps").is_some() {
                settings.max_air_jumps = parsed.max_air_jumps;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), LevelError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(LevelError::InvalidSettings(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if !(self.player_size.is_finite() && self.player_size > 0.0) {
            return Err(LevelError::InvalidSettings(format!(
                "player_size must be positive, got {}",
                self.player_size
            )));
        }

        let rates = [
            ("gravity", self.gravity),
            ("max_fall_speed", self.max_fall_speed),
            ("jump_force", self.jump_force),
            ("base_speed", self.base_speed),
            ("coyote_ms", self.coyote_ms),
            ("jump_buffer_ms", self.jump_buffer_ms),
            ("dash_duration_ms", self.dash_duration_ms),
            ("dash_cooldown_ms", self.dash_cooldown_ms),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(LevelError::InvalidSettings(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
