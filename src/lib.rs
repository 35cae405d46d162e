//! Rhythm Dash - physics and collision core for an auto-scrolling platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (player state machine, platforms, spatial grid)
//! - `level`: Level configuration, loading and validation
//! - `settings`: Tunable physics parameters and assist presets
//! - `error`: Errors raised while loading levels and settings

pub mod error;
pub mod level;
pub mod settings;
pub mod sim;

pub use error::LevelError;
pub use level::{LevelConfig, PlatformConfig};
pub use settings::{AssistPreset, PhysicsSettings};

/// Game configuration constants
///
/// World units grow downward on Y. Velocities are in units per second,
/// accelerations in units per second squared, timers in milliseconds.
pub mod consts {
    /// Reference frame length used by the headless runner (60 Hz)
    pub const FRAME_MS: f32 = 1000.0 / 60.0;

    /// Downward acceleration at gravity scale 1.0
    pub const GRAVITY: f32 = 2600.0;
    /// Terminal velocity along the gravity direction
    pub const MAX_FALL_SPEED: f32 = 1100.0;
    /// Automatic horizontal advance at speed multiplier 1.0
    pub const BASE_SPEED: f32 = 360.0;
    /// Upward velocity applied by a jump
    pub const JUMP_FORCE: f32 = 760.0;
    /// Bounce pad impulse relative to `JUMP_FORCE`
    pub const BOUNCE_MULTIPLIER: f32 = 1.45;
    /// Air jumps available after leaving the ground
    pub const MAX_AIR_JUMPS: u32 = 1;

    /// Grace window after walking off a ledge
    pub const COYOTE_MS: f32 = 100.0;
    /// A jump pressed this long before landing still fires
    pub const JUMP_BUFFER_MS: f32 = 120.0;

    /// Dash burst speed (added to the auto-scroll)
    pub const DASH_SPEED: f32 = 900.0;
    pub const DASH_DURATION_MS: f32 = 150.0;
    pub const DASH_COOLDOWN_MS: f32 = 600.0;

    /// Fall speed cap while pressed against a wall
    pub const WALL_SLIDE_SPEED: f32 = 180.0;
    /// Horizontal kick away from the wall on a wall jump
    pub const WALL_JUMP_PUSH: f32 = 420.0;

    /// Exponential decay rates (per second) for extra horizontal momentum
    pub const GROUND_FRICTION: f32 = 10.0;
    pub const ICE_FRICTION: f32 = 0.8;
    pub const AIR_FRICTION: f32 = 2.0;

    /// Underwater tuning
    pub const UNDERWATER_GRAVITY_SCALE: f32 = 0.35;
    pub const UNDERWATER_MAX_FALL: f32 = 260.0;
    pub const SWIM_FORCE: f32 = 420.0;

    /// Default gravity scale inside a low-gravity zone
    pub const LOW_GRAVITY_SCALE: f32 = 0.4;

    /// Flying mode tuning
    pub const FLY_THRUST: f32 = 4200.0;
    pub const FLY_GRAVITY_SCALE: f32 = 0.6;
    pub const FLY_MAX_SPEED: f32 = 520.0;

    /// Airborne spin rate (radians per second)
    pub const ROTATION_SPEED: f32 = 6.0;

    /// Player box edge length
    pub const PLAYER_SIZE: f32 = 20.0;

    /// Spatial grid cell edge length
    pub const CELL_SIZE: f32 = 256.0;

    /// Crumble platforms shake for this long after first contact...
    pub const CRUMBLE_DELAY_MS: f32 = 400.0;
    /// ...then fall away over this long before they stop colliding
    pub const CRUMBLE_FALL_MS: f32 = 250.0;

    /// Both ends of a teleporter link are disabled for this long after use
    pub const PORTAL_COOLDOWN_MS: f32 = 500.0;

    /// Default glitch platform jitter amplitude
    pub const GLITCH_JITTER: f32 = 2.0;

    /// Default speed-boost pad forward impulse
    pub const SPEED_BOOST: f32 = 600.0;

    /// Slack when deciding which side of a platform the player came from
    pub const CONTACT_TOLERANCE: f32 = 1.0;

    /// Default level kill bounds
    pub const DEATH_PLANE_Y: f32 = 2000.0;
    pub const KILL_CEILING_Y: f32 = -2000.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Snap an angle to the nearest quarter turn
#[inline]
pub fn snap_quarter_turn(angle: f32) -> f32 {
    use std::f32::consts::FRAC_PI_2;
    normalize_angle((angle / FRAC_PI_2).round() * FRAC_PI_2)
}
