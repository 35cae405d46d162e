//! Player kinetic state machine
//!
//! States: grounded, airborne, dead, with dashing layered on top of either.
//! One `update` call advances the player by a caller-supplied `delta_ms`;
//! nothing in here reads a clock, so identical inputs replay identically.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{self, LandingResponse};
use super::grid::SpatialGrid;
use super::platform::{Platform, PlatformKind};
use super::rect::Rect;
use crate::settings::PhysicsSettings;
use crate::{normalize_angle, snap_quarter_turn};

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Jump button currently down (drives flying thrust)
    pub jump_held: bool,
    /// Jump went down this tick
    pub jump_pressed: bool,
    pub dash_held: bool,
    /// Dash went down this tick
    pub dash_pressed: bool,
}

impl PlayerInput {
    /// Fresh jump press (held + pressed)
    pub fn jump() -> Self {
        Self {
            jump_held: true,
            jump_pressed: true,
            ..Default::default()
        }
    }

    /// Fresh dash press
    pub fn dash() -> Self {
        Self {
            dash_held: true,
            dash_pressed: true,
            ..Default::default()
        }
    }
}

/// Why the current attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Lava,
    Spike,
    Lightning,
    /// Fell past the level's death plane
    DeathPlane,
    /// Flew past the level's kill ceiling (flipped gravity)
    KillCeiling,
}

impl DeathCause {
    /// Cause for touching a deadly platform kind
    pub fn from_kind(kind: &PlatformKind) -> Option<Self> {
        match kind {
            PlatformKind::Lava => Some(DeathCause::Lava),
            PlatformKind::Spike => Some(DeathCause::Spike),
            PlatformKind::Lightning { .. } => Some(DeathCause::Lightning),
            _ => None,
        }
    }
}

/// Things that happened to the player during one update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    Jumped,
    AirJumped { used: u32 },
    WallJumped,
    Swam,
    Dashed,
    /// Touched down on a platform after being airborne or on another one
    Landed { platform: u32 },
    Bounced { platform: u32 },
    Stuck { platform: u32 },
    Teleported { from: u32, to: u32 },
    GravityFlipped { direction: f32 },
    SpeedBoosted { platform: u32 },
    PlatformShattered { platform: u32 },
    SecretFound { platform: u32 },
    Died { cause: DeathCause },
}

/// Events produced by one `Player::update`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub events: Vec<PlayerEvent>,
}

impl StepReport {
    pub fn died(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, PlayerEvent::Died { .. }))
    }

    pub fn landed(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, PlayerEvent::Landed { .. }))
    }

    pub fn contains(&self, event: &PlayerEvent) -> bool {
        self.events.contains(event)
    }
}

/// Which side of the player a wall is pressed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
}

/// Zone and surface modifiers currently acting on the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentFlags {
    pub underwater: bool,
    /// Level-wide flight mode (thrust instead of jumps)
    pub flying: bool,
    pub on_ice: bool,
    /// Horizontal carry while grounded on a conveyor
    pub conveyor_speed: Option<f32>,
    /// Summed acceleration of every overlapping wind zone
    pub wind: Option<Vec2>,
    /// Lowest gravity scale among overlapping low-gravity zones
    pub low_gravity: Option<f32>,
    /// Inside a reverse-gravity volume
    pub reversed: bool,
    /// Landed on sticky and not yet released
    pub stuck: bool,
}

/// Dash cooldown and burst state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashState {
    pub cooldown_ms: f32,
    /// Burst time left; the dash is active while positive
    pub active_ms: f32,
    pub speed_multiplier: f32,
    /// Scales the burst duration, and so the distance covered
    pub distance_multiplier: f32,
}

impl Default for DashState {
    fn default() -> Self {
        Self {
            cooldown_ms: 0.0,
            active_ms: 0.0,
            speed_multiplier: 1.0,
            distance_multiplier: 1.0,
        }
    }
}

impl DashState {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active_ms > 0.0
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.cooldown_ms <= 0.0 && !self.is_active()
    }

    fn start(&mut self, settings: &PhysicsSettings) {
        self.active_ms = settings.dash_duration_ms * self.distance_multiplier;
        self.cooldown_ms = settings.dash_cooldown_ms;
    }

    fn speed(&self, settings: &PhysicsSettings) -> f32 {
        settings.dash_speed * self.speed_multiplier
    }

    fn tick(&mut self, delta_ms: f32) {
        self.active_ms = (self.active_ms - delta_ms).max(0.0);
        self.cooldown_ms = (self.cooldown_ms - delta_ms).max(0.0);
    }
}

/// The simulated runner.
///
/// `velocity.x` is momentum on top of the automatic advance (dash carry,
/// boosts, wall-jump kicks); the auto-scroll itself is applied per tick and
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub rotation: f32,

    pub is_grounded: bool,
    pub is_dead: bool,
    pub death_cause: Option<DeathCause>,

    pub air_jumps_used: u32,
    pub max_air_jumps: u32,
    pub dash: DashState,

    pub coyote_ms: f32,
    pub jump_buffer_ms: f32,

    /// Effective values used by the next integration step
    pub gravity_scale: f32,
    pub gravity_direction: f32,
    /// Level default the effective scale is rebuilt from every tick
    pub default_gravity_scale: f32,
    /// Direction after discrete flips; reverse zones invert it temporarily
    pub base_gravity_direction: f32,

    pub env: EnvironmentFlags,
    pub wall_contact: Option<WallSide>,
    /// Index of the platform the player is standing on
    pub ground_platform: Option<usize>,
    /// Ids of volumes overlapped last tick (entry detection)
    pub touching: Vec<u32>,

    pub settings: PhysicsSettings,
}

impl Player {
    pub fn new(spawn: Vec2, settings: PhysicsSettings) -> Self {
        Self {
            position: spawn,
            velocity: Vec2::ZERO,
            size: Vec2::splat(settings.player_size),
            rotation: 0.0,
            is_grounded: false,
            is_dead: false,
            death_cause: None,
            air_jumps_used: 0,
            max_air_jumps: settings.max_air_jumps,
            dash: DashState::default(),
            coyote_ms: 0.0,
            jump_buffer_ms: 0.0,
            gravity_scale: 1.0,
            gravity_direction: 1.0,
            default_gravity_scale: 1.0,
            base_gravity_direction: 1.0,
            env: EnvironmentFlags::default(),
            wall_contact: None,
            ground_platform: None,
            touching: Vec::new(),
            settings,
        }
    }

    /// Set the level's default gravity scale and re-derive the effective one
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.default_gravity_scale = scale;
        self.refresh_gravity();
        self
    }

    pub fn with_flying(mut self, flying: bool) -> Self {
        self.env.flying = flying;
        self.refresh_gravity();
        self
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_pos_size(self.position, self.size)
    }

    pub fn is_dashing(&self) -> bool {
        self.dash.is_active()
    }

    /// Enter the terminal dead state; later updates do nothing
    pub fn kill(&mut self, cause: DeathCause) {
        if self.is_dead {
            return;
        }
        self.is_dead = true;
        self.death_cause = Some(cause);
        self.is_grounded = false;
        self.ground_platform = None;
        log::debug!(
            "player died ({:?}) at ({:.1}, {:.1})",
            cause,
            self.position.x,
            self.position.y
        );
    }

    /// Advance one tick.
    ///
    /// Order: forces, auto-scroll, integration, broad phase, collision
    /// resolution, timers. Dead players are not integrated.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        delta_ms: f32,
        input: &PlayerInput,
        platforms: &mut [Platform],
        grid: &SpatialGrid,
        speed_multiplier: f32,
        allow_air_jumps: bool,
    ) -> StepReport {
        let mut report = StepReport::default();
        if self.is_dead || delta_ms <= 0.0 {
            return report;
        }
        let settings = self.settings;
        let dt = delta_ms / 1000.0;

        self.ride_platform(platforms);

        // --- INPUT ---
        if input.dash_pressed && self.dash.is_ready() {
            self.dash.start(&settings);
            self.velocity.y = 0.0;
            self.env.stuck = false;
            report.events.push(PlayerEvent::Dashed);
        }

        let mut jumped = false;
        let mut buffer_armed = false;
        if self.env.flying {
            if input.jump_held {
                self.velocity.y -= settings.fly_thrust * self.gravity_direction * dt;
            }
        } else if input.jump_pressed {
            jumped = self.try_jump(allow_air_jumps, &mut report.events);
            if !jumped {
                self.jump_buffer_ms = settings.jump_buffer_ms;
                buffer_armed = true;
            }
        }

        // --- FORCES ---
        // An airborne dash holds altitude; a grounded one keeps contact
        if !self.dash.is_active() || self.is_grounded {
            self.velocity.y +=
                settings.gravity * self.gravity_scale * self.gravity_direction * dt;
        }
        if let Some(wind) = self.env.wind {
            self.velocity += wind * dt;
        }
        self.clamp_vertical_speed();

        let friction = if !self.is_grounded {
            settings.air_friction
        } else if self.env.on_ice {
            settings.ice_friction
        } else {
            settings.ground_friction
        };
        self.velocity.x *= (-friction * dt).exp();

        // --- AUTO-SCROLL + INTEGRATION ---
        let mut advance = if self.env.stuck {
            0.0
        } else {
            settings.base_speed * speed_multiplier
        };
        if let Some(carry) = self.env.conveyor_speed {
            advance += carry;
        }
        if self.dash.is_active() {
            advance += self.dash.speed(&settings);
        }

        let previous = self.bounds();
        self.position.x += (advance + self.velocity.x) * dt;
        self.position.y += self.velocity.y * dt;

        // --- COLLISION ---
        let swept = previous.union(&self.bounds());
        let candidates = grid.query_rect(swept);
        let was_grounded = self.is_grounded;
        let resolution =
            collision::resolve(self, previous, &candidates, platforms, &mut report.events);
        if self.is_dead {
            return report;
        }

        let mut coyote_armed = false;
        if self.is_grounded {
            if !was_grounded {
                self.rotation = snap_quarter_turn(self.rotation);
            }
            self.air_jumps_used = 0;
            self.coyote_ms = 0.0;
            if self.jump_buffer_ms > 0.0 && !jumped && !self.env.flying {
                self.perform_jump(settings.jump_force);
                report.events.push(PlayerEvent::Jumped);
            }
        } else {
            let launched = jumped
                || resolution.teleported
                || matches!(resolution.response, Some(LandingResponse::Bounced));
            if was_grounded && !launched {
                self.coyote_ms = settings.coyote_ms;
                coyote_armed = true;
            }
            self.spin(dt);
        }

        // --- TIMERS ---
        if !coyote_armed {
            self.coyote_ms = (self.coyote_ms - delta_ms).max(0.0);
        }
        if !buffer_armed {
            self.jump_buffer_ms = (self.jump_buffer_ms - delta_ms).max(0.0);
        }
        self.dash.tick(delta_ms);

        report
    }

    /// Jump request: grounded or coyote, swim stroke, wall jump, then air jump
    fn try_jump(&mut self, allow_air_jumps: bool, events: &mut Vec<PlayerEvent>) -> bool {
        let settings = self.settings;

        if self.is_grounded || self.coyote_ms > 0.0 {
            self.perform_jump(settings.jump_force);
            events.push(PlayerEvent::Jumped);
            return true;
        }

        if self.env.underwater {
            self.perform_jump(settings.swim_force);
            events.push(PlayerEvent::Swam);
            return true;
        }

        if let Some(side) = self.wall_contact {
            self.perform_jump(settings.jump_force);
            self.velocity.x = match side {
                WallSide::Right => -settings.wall_jump_push,
                WallSide::Left => settings.wall_jump_push,
            };
            events.push(PlayerEvent::WallJumped);
            return true;
        }

        if allow_air_jumps && self.air_jumps_used < self.max_air_jumps {
            self.air_jumps_used += 1;
            self.perform_jump(settings.jump_force);
            events.push(PlayerEvent::AirJumped {
                used: self.air_jumps_used,
            });
            return true;
        }

        false
    }

    fn perform_jump(&mut self, force: f32) {
        self.velocity.y = -force * self.gravity_direction;
        self.is_grounded = false;
        self.ground_platform = None;
        self.wall_contact = None;
        self.coyote_ms = 0.0;
        self.jump_buffer_ms = 0.0;
        self.env.stuck = false;
        self.env.on_ice = false;
        self.env.conveyor_speed = None;
    }

    /// Follow the displacement of the platform underfoot
    fn ride_platform(&mut self, platforms: &[Platform]) {
        if !self.is_grounded {
            return;
        }
        if let Some(platform) = self.ground_platform.and_then(|i| platforms.get(i)) {
            if !platform.destroyed {
                self.position += platform.last_delta;
            }
        }
    }

    fn clamp_vertical_speed(&mut self) {
        let settings = &self.settings;
        let dir = self.gravity_direction;
        let max_fall = if self.env.flying {
            settings.fly_max_speed
        } else if self.env.underwater {
            settings.underwater_max_fall
        } else if self.wall_contact.is_some() && !self.is_grounded {
            settings.wall_slide_speed
        } else {
            settings.max_fall_speed
        };

        let along = self.velocity.y * dir;
        if along > max_fall {
            self.velocity.y = max_fall * dir;
        } else if self.env.flying && along < -settings.fly_max_speed {
            self.velocity.y = -settings.fly_max_speed * dir;
        }
    }

    fn spin(&mut self, dt: f32) {
        if self.env.flying {
            // Ships tilt with their climb rate instead of tumbling
            let tilt = (self.velocity.y / self.settings.fly_max_speed).clamp(-1.0, 1.0);
            self.rotation = tilt * std::f32::consts::FRAC_PI_4;
        } else {
            self.rotation = normalize_angle(
                self.rotation + self.settings.rotation_speed * self.gravity_direction * dt,
            );
        }
    }

    /// Rebuild effective gravity from the level default and active zones
    pub(crate) fn refresh_gravity(&mut self) {
        let mut scale = self.default_gravity_scale;
        if let Some(zone) = self.env.low_gravity {
            scale *= zone;
        }
        if self.env.underwater {
            scale *= self.settings.underwater_gravity_scale;
        }
        if self.env.flying {
            scale *= self.settings.fly_gravity_scale;
        }
        self.gravity_scale = scale;
        self.gravity_direction = if self.env.reversed {
            -self.base_gravity_direction
        } else {
            self.base_gravity_direction
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::platform::{MoveAxis, MovePattern};

    const DT: f32 = 16.0;

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(Vec2::new(x, y), PhysicsSettings::default())
    }

    fn solid(id: u32, rect: Rect) -> Platform {
        Platform::new(id, rect, PlatformKind::Solid)
    }

    fn floor() -> Platform {
        solid(0, Rect::new(0.0, 120.0, 2000.0, 40.0))
    }

    fn step(player: &mut Player, platforms: &mut [Platform], input: PlayerInput) -> StepReport {
        step_with(player, platforms, input, true)
    }

    fn step_with(
        player: &mut Player,
        platforms: &mut [Platform],
        input: PlayerInput,
        allow_air_jumps: bool,
    ) -> StepReport {
        let grid = SpatialGrid::from_items(CELL_SIZE, &*platforms);
        player.update(DT, &input, platforms, &grid, 1.0, allow_air_jumps)
    }

    /// Player standing on `floor()` at x=100
    fn grounded_player(platforms: &mut [Platform]) -> Player {
        let mut player = player_at(100.0, 100.0);
        step(&mut player, platforms, PlayerInput::default());
        assert!(player.is_grounded);
        player
    }

    #[test]
    fn test_lands_on_solid() {
        let mut player = player_at(100.0, 100.0);
        player.velocity.y = 10.0;
        let mut platforms = vec![solid(0, Rect::new(0.0, 120.0, 400.0, 20.0))];

        let report = step(&mut player, &mut platforms, PlayerInput::default());

        assert!(player.is_grounded);
        assert_eq!(player.velocity.y, 0.0);
        assert_eq!(player.bounds().bottom(), 120.0);
        assert!(report.contains(&PlayerEvent::Landed { platform: 0 }));
    }

    #[test]
    fn test_spike_kills() {
        let mut player = player_at(100.0, 100.0);
        player.velocity.y = 10.0;
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 400.0, 20.0),
            PlatformKind::Spike,
        )];

        let report = step(&mut player, &mut platforms, PlayerInput::default());

        assert!(player.is_dead);
        assert!(!player.is_grounded);
        assert_eq!(player.death_cause, Some(DeathCause::Spike));
        assert!(report.died());
    }

    #[test]
    fn test_death_beats_landing() {
        let mut player = player_at(100.0, 100.0);
        player.velocity.y = 10.0;
        let mut platforms = vec![
            solid(0, Rect::new(0.0, 120.0, 400.0, 20.0)),
            Platform::new(1, Rect::new(110.0, 115.0, 10.0, 10.0), PlatformKind::Lava),
        ];

        step(&mut player, &mut platforms, PlayerInput::default());

        assert!(player.is_dead);
        assert!(!player.is_grounded);
        assert_eq!(player.death_cause, Some(DeathCause::Lava));
    }

    #[test]
    fn test_dead_player_is_frozen() {
        let mut player = player_at(100.0, 100.0);
        player.kill(DeathCause::DeathPlane);
        let before = player.clone();

        let report = step(&mut player, &mut [floor()], PlayerInput::jump());

        assert!(report.events.is_empty());
        assert_eq!(player, before);
    }

    #[test]
    fn test_bounce_exceeds_jump_force() {
        let mut player = player_at(100.0, 100.0);
        player.velocity.y = 200.0;
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 400.0, 20.0),
            PlatformKind::Bounce { strength: 1.0 },
        )];

        let report = step(&mut player, &mut platforms, PlayerInput::default());

        assert!(player.velocity.y < 0.0);
        assert!(player.velocity.y.abs() > JUMP_FORCE);
        assert!(!player.is_grounded);
        assert!(report.contains(&PlayerEvent::Bounced { platform: 0 }));
    }

    #[test]
    fn test_grounded_jump_is_upward() {
        let mut platforms = vec![floor()];
        let mut player = grounded_player(&mut platforms);

        let report = step(&mut player, &mut platforms, PlayerInput::jump());

        assert!(player.velocity.y < 0.0);
        assert!(!player.is_grounded);
        assert!(report.contains(&PlayerEvent::Jumped));
    }

    #[test]
    fn test_coyote_window() {
        let mut platforms = vec![floor()];
        let mut player = grounded_player(&mut platforms);

        // Ground vanishes: first airborne frame arms coyote time
        step_with(&mut player, &mut [], PlayerInput::default(), false);
        assert!(!player.is_grounded);
        assert!(player.coyote_ms > 0.0);

        let mut late = player.clone();

        step_with(&mut player, &mut [], PlayerInput::jump(), false);
        assert!(player.velocity.y < 0.0, "jump inside the coyote window");

        for _ in 0..8 {
            step_with(&mut late, &mut [], PlayerInput::default(), false);
        }
        assert_eq!(late.coyote_ms, 0.0);
        step_with(&mut late, &mut [], PlayerInput::jump(), false);
        assert!(late.velocity.y > 0.0, "window elapsed, still falling");
    }

    #[test]
    fn test_no_air_jump_when_disabled() {
        let mut jumper = player_at(100.0, 0.0);
        jumper.velocity.y = 100.0;
        let mut control = jumper.clone();

        step_with(&mut jumper, &mut [], PlayerInput::jump(), false);
        step_with(&mut control, &mut [], PlayerInput::default(), false);

        assert_eq!(jumper.velocity.y, control.velocity.y);
        assert!(jumper.jump_buffer_ms > 0.0);
    }

    #[test]
    fn test_air_jumps_are_bounded() {
        let mut player = player_at(100.0, 0.0);
        player.velocity.y = 100.0;

        let report = step(&mut player, &mut [], PlayerInput::jump());
        assert!(player.velocity.y < 0.0);
        assert!(report.contains(&PlayerEvent::AirJumped { used: 1 }));

        let before = player.velocity.y;
        step(&mut player, &mut [], PlayerInput::jump());
        assert!(player.velocity.y > before, "no credits left");
        assert_eq!(player.air_jumps_used, 1);
    }

    #[test]
    fn test_jump_buffer_fires_on_landing() {
        let mut player = player_at(100.0, 90.0);
        player.velocity.y = 300.0;
        let mut platforms = vec![floor()];

        step_with(&mut player, &mut platforms, PlayerInput::jump(), false);
        assert!(!player.is_grounded);
        assert!(player.velocity.y > 0.0);

        let report = step_with(&mut player, &mut platforms, PlayerInput::default(), false);
        assert!(report.landed());
        assert!(report.contains(&PlayerEvent::Jumped));
        assert!(player.velocity.y < 0.0);
        assert!(!player.is_grounded);
    }

    #[test]
    fn test_destroyed_platforms_are_ignored() {
        let mut platforms = vec![
            solid(0, Rect::new(0.0, 120.0, 400.0, 20.0)),
            Platform::new(1, Rect::new(0.0, 118.0, 400.0, 4.0), PlatformKind::Spike),
        ];
        // Grid built while they were alive: the filter must happen in resolution
        let grid = SpatialGrid::from_items(CELL_SIZE, &platforms);
        for platform in &mut platforms {
            platform.destroyed = true;
        }

        let mut player = player_at(100.0, 100.0);
        player.velocity.y = 10.0;
        player.update(DT, &PlayerInput::default(), &mut platforms, &grid, 1.0, true);

        assert!(!player.is_dead);
        assert!(!player.is_grounded);
    }

    #[test]
    fn test_auto_scroll_scales_with_multiplier() {
        let mut slow = player_at(0.0, 0.0);
        let mut fast = player_at(0.0, 0.0);
        let grid = SpatialGrid::new(CELL_SIZE);
        slow.update(DT, &PlayerInput::default(), &mut [], &grid, 1.0, true);
        fast.update(DT, &PlayerInput::default(), &mut [], &grid, 2.0, true);
        assert!((fast.position.x - 2.0 * slow.position.x).abs() < 1e-3);
    }

    #[test]
    fn test_sticky_freezes_until_jump() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 400.0, 20.0),
            PlatformKind::Sticky,
        )];
        let mut player = player_at(100.0, 100.0);
        let report = step(&mut player, &mut platforms, PlayerInput::default());
        assert!(report.contains(&PlayerEvent::Stuck { platform: 0 }));
        assert!(player.env.stuck);

        let x = player.position.x;
        step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.position.x, x);
        assert!(player.is_grounded);

        step(&mut player, &mut platforms, PlayerInput::jump());
        assert!(!player.env.stuck);
        assert!(player.position.x > x);
    }

    #[test]
    fn test_conveyor_carries_grounded_player() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 2000.0, 20.0),
            PlatformKind::Conveyor {
                speed: 200.0,
                direction: 1.0,
            },
        )];
        let mut player = player_at(100.0, 100.0);
        step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.env.conveyor_speed, Some(200.0));

        let x = player.position.x;
        step(&mut player, &mut platforms, PlayerInput::default());
        let moved = player.position.x - x;
        let scroll = BASE_SPEED * DT / 1000.0;
        assert!((moved - (scroll + 200.0 * DT / 1000.0)).abs() < 1e-3);
    }

    #[test]
    fn test_conveyor_releases_on_jump() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 2000.0, 20.0),
            PlatformKind::Conveyor {
                speed: 1000.0,
                direction: 1.0,
            },
        )];
        let mut player = player_at(100.0, 100.0);
        step(&mut player, &mut platforms, PlayerInput::default());
        assert!(player.is_grounded);

        let x = player.position.x;
        let report = step(&mut player, &mut platforms, PlayerInput::jump());
        assert!(report.contains(&PlayerEvent::Jumped));
        let moved = player.position.x - x;
        assert!((moved - BASE_SPEED * DT / 1000.0).abs() < 1e-3);
        assert_eq!(player.env.conveyor_speed, None);
    }

    #[test]
    fn test_long_frame_lands_like_short_frames() {
        let start = |platforms: &mut Vec<Platform>| {
            platforms.clear();
            platforms.push(floor());
            let mut player = player_at(100.0, 99.0);
            player.velocity.y = MAX_FALL_SPEED;
            player
        };

        let mut platforms = Vec::new();
        let mut long = start(&mut platforms);
        let grid = SpatialGrid::from_items(CELL_SIZE, &platforms);
        let report = long.update(100.0, &PlayerInput::default(), &mut platforms, &grid, 1.0, true);
        assert!(report.contains(&PlayerEvent::Landed { platform: 0 }));

        let mut short = start(&mut platforms);
        for _ in 0..6 {
            step(&mut short, &mut platforms, PlayerInput::default());
        }

        assert!(long.is_grounded);
        assert!(short.is_grounded);
        assert_eq!(long.position.y, 100.0);
        assert_eq!(long.position.y, short.position.y);
        assert_eq!(long.velocity.y, 0.0);
    }

    #[test]
    fn test_long_frame_cannot_skip_a_hazard() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 130.0, 400.0, 10.0),
            PlatformKind::Lava,
        )];
        let mut player = player_at(100.0, 99.0);
        player.velocity.y = MAX_FALL_SPEED;
        let grid = SpatialGrid::from_items(CELL_SIZE, &platforms);

        player.update(100.0, &PlayerInput::default(), &mut platforms, &grid, 1.0, true);

        assert!(player.is_dead);
        assert_eq!(player.death_cause, Some(DeathCause::Lava));
    }

    #[test]
    fn test_wall_slide_and_wall_jump() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(125.0, 0.0, 20.0, 400.0),
            PlatformKind::Wall,
        )];
        let mut player = player_at(100.0, 50.0);
        player.velocity.y = 500.0;

        step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.wall_contact, Some(WallSide::Right));
        assert_eq!(player.bounds().right(), 125.0);
        assert!(!player.is_grounded);

        step(&mut player, &mut platforms, PlayerInput::default());
        assert!(player.velocity.y <= WALL_SLIDE_SPEED + 1e-3);

        let report = step(&mut player, &mut platforms, PlayerInput::jump());
        assert!(report.contains(&PlayerEvent::WallJumped));
        assert!(player.velocity.y < 0.0);
        assert!(player.velocity.x < 0.0);
    }

    #[test]
    fn test_solid_side_blocks() {
        let mut platforms = vec![floor(), solid(1, Rect::new(123.0, 60.0, 50.0, 60.0))];
        let mut player = grounded_player(&mut platforms);
        step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.bounds().right(), 123.0);
        assert!(player.is_grounded);
    }

    #[test]
    fn test_ceiling_stops_ascent() {
        let mut platforms = vec![solid(0, Rect::new(0.0, 60.0, 400.0, 30.0))];
        let mut player = player_at(100.0, 92.0);
        player.velocity.y = -600.0;
        step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.position.y, 90.0);
        assert_eq!(player.velocity.y, 0.0);
    }

    #[test]
    fn test_cloud_is_one_way() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 100.0, 400.0, 10.0),
            PlatformKind::Cloud,
        )];
        let mut player = player_at(100.0, 105.0);
        player.velocity.y = -500.0;
        let y = player.position.y;
        step(&mut player, &mut platforms, PlayerInput::default());
        assert!(player.position.y < y, "passes up through");
        assert!(player.velocity.y < 0.0);

        let mut faller = player_at(100.0, 80.0);
        faller.velocity.y = 10.0;
        step(&mut faller, &mut platforms, PlayerInput::default());
        assert!(faller.is_grounded);
    }

    #[test]
    fn test_phase_off_is_intangible() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 400.0, 20.0),
            PlatformKind::Phase {
                on_ms: 100.0,
                off_ms: 100.0,
                offset_ms: 150.0,
            },
        )];
        let mut player = player_at(100.0, 100.0);
        player.velocity.y = 10.0;
        step(&mut player, &mut platforms, PlayerInput::default());
        assert!(!player.is_grounded);
    }

    #[test]
    fn test_inactive_lightning_is_harmless() {
        let lightning = |offset_ms| {
            vec![Platform::new(
                0,
                Rect::new(0.0, 110.0, 400.0, 20.0),
                PlatformKind::Lightning {
                    on_ms: 100.0,
                    off_ms: 100.0,
                    offset_ms,
                },
            )]
        };
        let mut player = player_at(100.0, 100.0);
        step(&mut player, &mut lightning(150.0), PlayerInput::default());
        assert!(!player.is_dead);

        let mut player = player_at(100.0, 100.0);
        step(&mut player, &mut lightning(0.0), PlayerInput::default());
        assert_eq!(player.death_cause, Some(DeathCause::Lightning));
    }

    #[test]
    fn test_crumble_starts_on_landing() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 400.0, 20.0),
            PlatformKind::Crumble,
        )];
        let mut player = player_at(100.0, 100.0);
        step(&mut player, &mut platforms, PlayerInput::default());
        assert!(player.is_grounded);
        assert_eq!(platforms[0].crumble_elapsed, Some(0.0));
    }

    #[test]
    fn test_glass_breaks_on_second_landing() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 2000.0, 20.0),
            PlatformKind::Glass,
        )];
        let mut player = player_at(100.0, 100.0);
        step(&mut player, &mut platforms, PlayerInput::default());
        assert!(player.is_grounded);
        // Resting on it is not a new landing
        step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(platforms[0].landings, 1);

        player.position.y = 95.0;
        player.velocity.y = 400.0;
        player.is_grounded = false;
        let report = step(&mut player, &mut platforms, PlayerInput::default());

        assert!(platforms[0].destroyed);
        assert!(!player.is_grounded);
        assert!(report.contains(&PlayerEvent::PlatformShattered { platform: 0 }));
    }

    #[test]
    fn test_gravity_flip_on_entry_only() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 0.0, 2000.0, 300.0),
            PlatformKind::GravityFlip,
        )];
        let mut player = player_at(100.0, 100.0);

        let report = step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.gravity_direction, -1.0);
        assert!(report.contains(&PlayerEvent::GravityFlipped { direction: -1.0 }));

        let report = step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.gravity_direction, -1.0);
        assert!(report.events.is_empty());

        // Leaving keeps the flipped direction
        step(&mut player, &mut [], PlayerInput::default());
        assert_eq!(player.gravity_direction, -1.0);
    }

    #[test]
    fn test_flipped_gravity_lands_on_ceiling() {
        let mut platforms = vec![solid(0, Rect::new(0.0, 60.0, 400.0, 40.0))];
        let mut player = player_at(100.0, 100.0);
        player.base_gravity_direction = -1.0;
        player.refresh_gravity();
        player.velocity.y = -10.0;

        step(&mut player, &mut platforms, PlayerInput::default());
        assert!(player.is_grounded);
        assert_eq!(player.position.y, 100.0);

        step(&mut player, &mut platforms, PlayerInput::jump());
        assert!(player.velocity.y > 0.0, "jumping pushes away from the ceiling");
    }

    #[test]
    fn test_reverse_zone_restores_on_exit() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 0.0, 2000.0, 300.0),
            PlatformKind::Reverse,
        )];
        let mut player = player_at(100.0, 100.0);
        step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.gravity_direction, -1.0);
        assert_eq!(player.base_gravity_direction, 1.0);

        step(&mut player, &mut [], PlayerInput::default());
        assert_eq!(player.gravity_direction, 1.0);
    }

    #[test]
    fn test_low_gravity_zone_restores_on_exit() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 0.0, 2000.0, 300.0),
            PlatformKind::LowGravity { scale: 0.4 },
        )];
        let mut player = Player::new(Vec2::new(100.0, 100.0), PhysicsSettings::default())
            .with_gravity_scale(0.8);
        step(&mut player, &mut platforms, PlayerInput::default());
        assert!((player.gravity_scale - 0.32).abs() < 1e-6);

        step(&mut player, &mut [], PlayerInput::default());
        assert_eq!(player.gravity_scale, 0.8);
    }

    #[test]
    fn test_water_allows_swimming() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 0.0, 2000.0, 300.0),
            PlatformKind::Water,
        )];
        let mut player = player_at(100.0, 100.0);
        step_with(&mut player, &mut platforms, PlayerInput::default(), false);
        assert!(player.env.underwater);

        let report = step_with(&mut player, &mut platforms, PlayerInput::jump(), false);
        assert!(report.contains(&PlayerEvent::Swam));
        assert!(player.velocity.y < 0.0);
    }

    #[test]
    fn test_wind_zone_pushes() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 0.0, 2000.0, 300.0),
            PlatformKind::Wind {
                strength: 1000.0,
                direction: Vec2::new(0.0, -1.0),
            },
        )];
        let mut player = player_at(100.0, 100.0);
        let mut control = player.clone();
        step(&mut player, &mut platforms, PlayerInput::default());
        step(&mut control, &mut [], PlayerInput::default());

        step(&mut player, &mut platforms, PlayerInput::default());
        step(&mut control, &mut [], PlayerInput::default());
        assert!(player.velocity.y < control.velocity.y);
    }

    #[test]
    fn test_speed_boost_once_per_entry() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(90.0, 0.0, 200.0, 300.0),
            PlatformKind::SpeedBoost { speed: 600.0 },
        )];
        let mut player = player_at(100.0, 100.0);
        let report = step(&mut player, &mut platforms, PlayerInput::default());
        assert!(report.contains(&PlayerEvent::SpeedBoosted { platform: 0 }));
        assert_eq!(player.velocity.x, 600.0);

        let report = step(&mut player, &mut platforms, PlayerInput::default());
        assert!(report.events.is_empty());
        assert!(player.velocity.x < 600.0);
    }

    #[test]
    fn test_teleporter_relocates_to_partner() {
        let mut platforms = vec![
            Platform::new(
                0,
                Rect::new(100.0, 100.0, 20.0, 20.0),
                PlatformKind::Teleporter { link: Some(1) },
            ),
            Platform::new(
                1,
                Rect::new(1000.0, 100.0, 20.0, 20.0),
                PlatformKind::Teleporter { link: Some(0) },
            ),
        ];
        let mut player = player_at(95.0, 100.0);

        let report = step(&mut player, &mut platforms, PlayerInput::default());

        assert!(report.contains(&PlayerEvent::Teleported { from: 0, to: 1 }));
        assert_eq!(player.position, Vec2::new(1000.0, 100.0));
        assert_eq!(platforms[0].cooldown_ms, PORTAL_COOLDOWN_MS);
        assert_eq!(platforms[1].cooldown_ms, PORTAL_COOLDOWN_MS);

        // Arrival portal is cooling down: no bounce back
        let report = step(&mut player, &mut platforms, PlayerInput::default());
        assert!(report.events.is_empty());
        assert!(player.position.x > 1000.0);
    }

    #[test]
    fn test_unlinked_teleporter_is_noop() {
        for link in [None, Some(99)] {
            let mut platforms = vec![Platform::new(
                0,
                Rect::new(100.0, 100.0, 20.0, 20.0),
                PlatformKind::Teleporter { link },
            )];
            let mut player = player_at(95.0, 100.0);
            let report = step(&mut player, &mut platforms, PlayerInput::default());
            assert!(report.events.is_empty());
            assert!(player.position.x < 110.0);
            assert_eq!(platforms[0].cooldown_ms, 0.0);
        }
    }

    #[test]
    fn test_dash_burst_and_cooldown() {
        let mut player = player_at(0.0, 0.0);
        let report = step(&mut player, &mut [], PlayerInput::dash());
        assert!(report.contains(&PlayerEvent::Dashed));
        assert!(player.is_dashing());
        assert_eq!(player.velocity.y, 0.0, "airborne dash holds altitude");
        let expected = (BASE_SPEED + DASH_SPEED) * DT / 1000.0;
        assert!((player.position.x - expected).abs() < 1e-3);

        let report = step(&mut player, &mut [], PlayerInput::dash());
        assert!(!report.contains(&PlayerEvent::Dashed));
    }

    #[test]
    fn test_rides_moving_platform() {
        let pattern = MovePattern {
            axis: MoveAxis::Horizontal,
            distance: 100.0,
            speed: 1.0,
            start_offset: 0.0,
        };
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 400.0, 20.0),
            PlatformKind::Moving(pattern),
        )];
        let mut player = player_at(100.0, 100.0);
        step(&mut player, &mut platforms, PlayerInput::default());
        assert_eq!(player.ground_platform, Some(0));

        platforms[0].last_delta = Vec2::new(10.0, 0.0);
        let x = player.position.x;
        step(&mut player, &mut platforms, PlayerInput::default());
        let scroll = BASE_SPEED * DT / 1000.0;
        assert!((player.position.x - (x + 10.0 + scroll)).abs() < 1e-3);
    }

    #[test]
    fn test_secret_revealed_on_landing() {
        let mut platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 120.0, 400.0, 20.0),
            PlatformKind::Secret,
        )];
        let mut player = player_at(100.0, 100.0);
        let report = step(&mut player, &mut platforms, PlayerInput::default());
        assert!(platforms[0].revealed);
        assert!(report.contains(&PlayerEvent::SecretFound { platform: 0 }));
    }

    #[test]
    fn test_flying_thrust() {
        let mut player = player_at(100.0, 100.0).with_flying(true);
        let held = PlayerInput {
            jump_held: true,
            ..Default::default()
        };
        step(&mut player, &mut [], held);
        assert!(player.velocity.y < 0.0);

        for _ in 0..100 {
            step(&mut player, &mut [], held);
        }
        assert!(player.velocity.y >= -FLY_MAX_SPEED - 1e-3);
    }

    #[test]
    fn test_rotation_snaps_on_landing() {
        let mut player = player_at(100.0, 50.0);
        player.velocity.y = 200.0;
        let mut platforms = vec![floor()];
        for _ in 0..30 {
            step(&mut player, &mut platforms, PlayerInput::default());
            if player.is_grounded {
                break;
            }
        }
        assert!(player.is_grounded);
        let quarters = player.rotation / std::f32::consts::FRAC_PI_2;
        assert!((quarters - quarters.round()).abs() < 1e-4);
    }
}
