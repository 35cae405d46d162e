//! Platform catalogue: kinds, payloads and per-tick behaviour
//!
//! A platform's kind never changes after creation. Only its position,
//! timers, contact counters and `destroyed` flag move.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid::Bounded;
use super::rect::Rect;
use crate::consts::*;

fn one() -> f32 {
    1.0
}

fn default_low_gravity() -> f32 {
    LOW_GRAVITY_SCALE
}

fn default_boost() -> f32 {
    SPEED_BOOST
}

fn default_jitter() -> f32 {
    GLITCH_JITTER
}

/// Motion path of a moving platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveAxis {
    Horizontal,
    Vertical,
    Circular,
}

/// Oscillation parameters for moving platforms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovePattern {
    pub axis: MoveAxis,
    /// Amplitude in world units
    pub distance: f32,
    /// Angular speed in radians per second
    pub speed: f32,
    /// Phase offset in radians, to de-synchronise neighbours
    #[serde(default)]
    pub start_offset: f32,
}

impl MovePattern {
    /// Offset from the platform's origin after `elapsed_ms`
    pub fn offset_at(&self, elapsed_ms: f32) -> Vec2 {
        let angle = self.speed * elapsed_ms / 1000.0 + self.start_offset;
        match self.axis {
            MoveAxis::Horizontal => Vec2::new(angle.sin() * self.distance, 0.0),
            MoveAxis::Vertical => Vec2::new(0.0, angle.sin() * self.distance),
            MoveAxis::Circular => Vec2::new(angle.cos(), angle.sin()) * self.distance,
        }
    }
}

/// Closed set of platform behaviours, with type-specific payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformKind {
    Solid,
    /// Launch pad; `strength` scales the configured bounce impulse
    Bounce {
        #[serde(default = "one")]
        strength: f32,
    },
    /// Low-friction surface
    Ice,
    Lava,
    Spike,
    /// Starts decaying on first landing
    Crumble,
    Moving(MovePattern),
    /// Solid for `on_ms`, intangible for `off_ms`
    Phase {
        on_ms: f32,
        off_ms: f32,
        #[serde(default)]
        offset_ms: f32,
    },
    /// Carries grounded players at `speed * direction`
    Conveyor {
        speed: f32,
        #[serde(default = "one")]
        direction: f32,
    },
    /// Volume: inverts gravity on entry
    GravityFlip,
    /// Volume: gravity points the other way while inside
    Reverse,
    /// Side contact slides instead of blocking
    Wall,
    /// Landing freezes the player until a jump or dash
    Sticky,
    /// Breaks on the second landing
    Glass,
    /// Volume: gravity scaled while inside
    LowGravity {
        #[serde(default = "default_low_gravity")]
        scale: f32,
    },
    /// Volume: constant acceleration while inside
    Wind { strength: f32, direction: Vec2 },
    /// One-way: land from above only
    Cloud,
    /// Deadly for `on_ms`, harmless and intangible for `off_ms`
    Lightning {
        on_ms: f32,
        off_ms: f32,
        #[serde(default)]
        offset_ms: f32,
    },
    /// Volume: relocates the player to the platform with id `link`
    Teleporter {
        #[serde(default)]
        link: Option<u32>,
    },
    /// Volume: forward impulse on entry
    SpeedBoost {
        #[serde(default = "default_boost")]
        speed: f32,
    },
    /// Solid, jitters randomly around its origin every tick
    Glitch {
        #[serde(default = "default_jitter")]
        amplitude: f32,
    },
    /// Volume: swimming physics while inside
    Water,
    /// Solid, hidden until first touched
    Secret,
}

/// How the collision pass treats a platform kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionClass {
    /// Overlap kills
    Hazard,
    /// Blocks from every side
    Surface,
    /// Blocks only when landed on from above
    OneWay,
    /// Affects the player by overlap, never blocks
    Volume,
}

impl PlatformKind {
    pub fn collision_class(&self) -> CollisionClass {
        match self {
            PlatformKind::Lava | PlatformKind::Spike | PlatformKind::Lightning { .. } => {
                CollisionClass::Hazard
            }
            PlatformKind::Solid
            | PlatformKind::Bounce { .. }
            | PlatformKind::Ice
            | PlatformKind::Crumble
            | PlatformKind::Moving(_)
            | PlatformKind::Phase { .. }
            | PlatformKind::Conveyor { .. }
            | PlatformKind::Wall
            | PlatformKind::Sticky
            | PlatformKind::Glass
            | PlatformKind::Glitch { .. }
            | PlatformKind::Secret => CollisionClass::Surface,
            PlatformKind::Cloud => CollisionClass::OneWay,
            PlatformKind::GravityFlip
            | PlatformKind::Reverse
            | PlatformKind::LowGravity { .. }
            | PlatformKind::Wind { .. }
            | PlatformKind::Teleporter { .. }
            | PlatformKind::SpeedBoost { .. }
            | PlatformKind::Water => CollisionClass::Volume,
        }
    }

    pub fn is_deadly(&self) -> bool {
        self.collision_class() == CollisionClass::Hazard
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlatformKind::Solid => "solid",
            PlatformKind::Bounce { .. } => "bounce",
            PlatformKind::Ice => "ice",
            PlatformKind::Lava => "lava",
            PlatformKind::Spike => "spike",
            PlatformKind::Crumble => "crumble",
            PlatformKind::Moving(_) => "moving",
            PlatformKind::Phase { .. } => "phase",
            PlatformKind::Conveyor { .. } => "conveyor",
            PlatformKind::GravityFlip => "gravity_flip",
            PlatformKind::Reverse => "reverse",
            PlatformKind::Wall => "wall",
            PlatformKind::Sticky => "sticky",
            PlatformKind::Glass => "glass",
            PlatformKind::LowGravity { .. } => "low_gravity",
            PlatformKind::Wind { .. } => "wind",
            PlatformKind::Cloud => "cloud",
            PlatformKind::Lightning { .. } => "lightning",
            PlatformKind::Teleporter { .. } => "teleporter",
            PlatformKind::SpeedBoost { .. } => "speed_boost",
            PlatformKind::Glitch { .. } => "glitch",
            PlatformKind::Water => "water",
            PlatformKind::Secret => "secret",
        }
    }
}

/// What a platform's own tick changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformChange {
    None,
    /// Geometry moved; the broad phase is stale
    Moved,
    /// Decay finished this tick
    Destroyed,
}

/// A static or dynamic obstacle
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub id: u32,
    kind: PlatformKind,
    pub rect: Rect,
    /// Rest position; moving and glitch platforms oscillate around it
    origin: Vec2,
    /// Displacement applied by the most recent tick
    pub last_delta: Vec2,
    /// Drives motion and on/off cycles
    pub elapsed_ms: f32,
    /// Time since first landing on a crumble platform
    pub crumble_elapsed: Option<f32>,
    /// Distinct landings (glass)
    pub landings: u32,
    /// Teleporter lockout remaining
    pub cooldown_ms: f32,
    /// Secret platforms become visible once touched
    pub revealed: bool,
    pub destroyed: bool,
}

impl Platform {
    pub fn new(id: u32, rect: Rect, kind: PlatformKind) -> Self {
        let mut platform = Self {
            id,
            kind,
            rect,
            origin: rect.position(),
            last_delta: Vec2::ZERO,
            elapsed_ms: 0.0,
            crumble_elapsed: None,
            landings: 0,
            cooldown_ms: 0.0,
            revealed: !matches!(kind, PlatformKind::Secret),
            destroyed: false,
        };
        // Moving platforms start on their path, not at the origin
        if let PlatformKind::Moving(pattern) = kind {
            platform.rect = Rect::from_pos_size(rect.position() + pattern.offset_at(0.0), rect.size());
        }
        platform
    }

    pub fn kind(&self) -> &PlatformKind {
        &self.kind
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// On/off cycle state for phase and lightning; always true for other kinds
    pub fn is_active(&self) -> bool {
        match self.kind {
            PlatformKind::Phase {
                on_ms,
                off_ms,
                offset_ms,
            }
            | PlatformKind::Lightning {
                on_ms,
                off_ms,
                offset_ms,
            } => {
                let cycle = on_ms + off_ms;
                if cycle <= 0.0 {
                    return true;
                }
                (self.elapsed_ms + offset_ms).rem_euclid(cycle) < on_ms
            }
            _ => true,
        }
    }

    /// Takes part in collision at all this tick
    pub fn is_collidable(&self) -> bool {
        !self.destroyed && self.is_active()
    }

    /// Advance timers and position by `delta_ms`.
    ///
    /// `rng` is only drawn from by glitch platforms; everything else is a
    /// pure function of elapsed time.
    pub fn tick<R: Rng>(
        &mut self,
        delta_ms: f32,
        crumble_total_ms: f32,
        rng: &mut R,
    ) -> PlatformChange {
        self.last_delta = Vec2::ZERO;
        if self.destroyed {
            return PlatformChange::None;
        }

        self.elapsed_ms += delta_ms;
        self.cooldown_ms = (self.cooldown_ms - delta_ms).max(0.0);

        match self.kind {
            PlatformKind::Moving(pattern) => {
                let target = self.origin + pattern.offset_at(self.elapsed_ms);
                self.move_to(target)
            }
            PlatformKind::Glitch { amplitude } => {
                let jitter = if amplitude > 0.0 {
                    Vec2::new(
                        rng.random_range(-amplitude..=amplitude),
                        rng.random_range(-amplitude..=amplitude),
                    )
                } else {
                    Vec2::ZERO
                };
                self.move_to(self.origin + jitter)
            }
            PlatformKind::Crumble => match self.crumble_elapsed {
                Some(elapsed) => {
                    let elapsed = elapsed + delta_ms;
                    self.crumble_elapsed = Some(elapsed);
                    if elapsed >= crumble_total_ms {
                        self.destroyed = true;
                        log::debug!("crumble platform {} gave way", self.id);
                        PlatformChange::Destroyed
                    } else {
                        PlatformChange::None
                    }
                }
                None => PlatformChange::None,
            },
            PlatformKind::Solid
            | PlatformKind::Bounce { .. }
            | PlatformKind::Ice
            | PlatformKind::Lava
            | PlatformKind::Spike
            | PlatformKind::Phase { .. }
            | PlatformKind::Conveyor { .. }
            | PlatformKind::GravityFlip
            | PlatformKind::Reverse
            | PlatformKind::Wall
            | PlatformKind::Sticky
            | PlatformKind::Glass
            | PlatformKind::LowGravity { .. }
            | PlatformKind::Wind { .. }
            | PlatformKind::Cloud
            | PlatformKind::Lightning { .. }
            | PlatformKind::Teleporter { .. }
            | PlatformKind::SpeedBoost { .. }
            | PlatformKind::Water
            | PlatformKind::Secret => PlatformChange::None,
        }
    }

    fn move_to(&mut self, target: Vec2) -> PlatformChange {
        let delta = target - self.rect.position();
        if delta == Vec2::ZERO {
            return PlatformChange::None;
        }
        self.rect = self.rect.translate(delta);
        self.last_delta = delta;
        PlatformChange::Moved
    }

    /// Begin the crumble countdown (no-op if already started or not crumble)
    pub fn start_crumble(&mut self) {
        if matches!(self.kind, PlatformKind::Crumble) && self.crumble_elapsed.is_none() {
            self.crumble_elapsed = Some(0.0);
        }
    }

    /// Record a fresh landing on glass; returns true if it shattered
    pub fn register_glass_landing(&mut self) -> bool {
        if !matches!(self.kind, PlatformKind::Glass) {
            return false;
        }
        self.landings += 1;
        if self.landings >= 2 {
            self.destroyed = true;
            log::debug!("glass platform {} shattered", self.id);
        }
        self.destroyed
    }

    /// Crumble platforms sink during their final fall window (render hint)
    pub fn crumble_progress(&self, delay_ms: f32, fall_ms: f32) -> f32 {
        match self.crumble_elapsed {
            Some(elapsed) if fall_ms > 0.0 => ((elapsed - delay_ms) / fall_ms).clamp(0.0, 1.0),
            Some(elapsed) if elapsed >= delay_ms => 1.0,
            _ => 0.0,
        }
    }
}

impl Bounded for Platform {
    fn bounds(&self) -> Rect {
        self.rect
    }

    fn is_indexed(&self) -> bool {
        !self.destroyed
    }
}
