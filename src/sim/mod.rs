//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only (no clocks)
//! - Seeded RNG only, passed explicitly
//! - Stable iteration order (platform list order, ascending grid results)
//! - No rendering or platform dependencies

pub mod collision;
pub mod grid;
pub mod platform;
pub mod player;
pub mod rect;
pub mod state;
pub mod tick;

pub use collision::{Contact, LandingResponse, Resolution, find_landing, resolve};
pub use grid::{Bounded, SpatialGrid};
pub use platform::{CollisionClass, MoveAxis, MovePattern, Platform, PlatformChange, PlatformKind};
pub use player::{
    DashState, DeathCause, EnvironmentFlags, Player, PlayerEvent, PlayerInput, StepReport,
    WallSide,
};
pub use rect::Rect;
pub use state::{GameEvent, LevelPhase, LevelState};
pub use tick::tick;
