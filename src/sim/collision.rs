//! Collision resolution between the player box and platforms
//!
//! Runs once per tick after integration. The grid hands over candidate
//! indices; everything here is exact AABB work against the player's box,
//! generalised over the gravity direction so flipped runs land on ceilings.
//!
//! Order matters: hazards end the tick, then the single best landing, then
//! side and ceiling contacts, then volumes, then teleporters.

use glam::Vec2;

use super::platform::{CollisionClass, Platform, PlatformKind};
use super::player::{DeathCause, Player, PlayerEvent, WallSide};
use super::rect::Rect;
use crate::consts::CONTACT_TOLERANCE;

/// Chosen landing surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Index into the platform slice
    pub index: usize,
    /// How far the feet sank past the surface this tick
    pub penetration: f32,
}

/// What the landing platform did to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingResponse {
    Grounded,
    Bounced,
    Stuck,
    /// Glass shattered underfoot
    FellThrough,
}

/// Summary of one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Resolution {
    pub landing: Option<Contact>,
    pub response: Option<LandingResponse>,
    pub teleported: bool,
}

/// Edge of `rect` facing along gravity
#[inline]
fn feet(rect: &Rect, dir: f32) -> f32 {
    if dir > 0.0 { rect.bottom() } else { rect.top() }
}

/// Edge of `rect` facing against gravity
#[inline]
fn head(rect: &Rect, dir: f32) -> f32 {
    if dir > 0.0 { rect.top() } else { rect.bottom() }
}

/// Resolve the player against the candidate platforms.
///
/// `previous` is the player's box before this tick's integration; it decides
/// which side a contact came from. Mutates the player (snaps, velocity,
/// flags) and the platforms it touches (crumble start, glass landings,
/// teleporter cooldowns, secret reveal).
pub fn resolve(
    player: &mut Player,
    previous: Rect,
    candidates: &[usize],
    platforms: &mut [Platform],
    events: &mut Vec<PlayerEvent>,
) -> Resolution {
    let mut resolution = Resolution::default();
    let bounds = player.bounds();
    let dir = player.gravity_direction;

    // Everything the box passed through this tick
    let swept = previous.union(&bounds);
    let reachable: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| {
            platforms
                .get(i)
                .is_some_and(|p| p.is_collidable() && p.rect.intersects(&swept))
        })
        .collect();

    let landing = find_landing(previous, bounds, player.velocity.y, dir, &reachable, platforms);
    let stop = landing.map_or(bounds, |c| {
        settled_on(bounds, &platforms[c.index].rect, dir)
    });
    let path = previous.union(&stop);

    // Hazards take priority over everything else this tick
    if let Some(cause) = reachable
        .iter()
        .filter(|&&i| platforms[i].rect.intersects(&path))
        .find_map(|&i| DeathCause::from_kind(platforms[i].kind()))
    {
        player.kill(cause);
        events.push(PlayerEvent::Died { cause });
        return resolution;
    }

    let previous_ground = if player.is_grounded {
        player.ground_platform
    } else {
        None
    };
    player.is_grounded = false;
    player.ground_platform = None;
    player.wall_contact = None;
    player.env.on_ice = false;
    player.env.conveyor_speed = None;

    if let Some(contact) = landing {
        let fresh = previous_ground != Some(contact.index);
        let response = apply_landing(player, contact.index, fresh, platforms, events);
        resolution.landing = Some(contact);
        resolution.response = Some(response);
    }

    let settled = player.bounds();
    let touching: Vec<usize> = reachable
        .iter()
        .copied()
        .filter(|&i| platforms[i].rect.intersects(&settled))
        .collect();

    for &i in &touching {
        if landing.is_some_and(|c| c.index == i) {
            continue;
        }
        let platform = &platforms[i];
        if platform.kind().collision_class() == CollisionClass::Surface && !platform.destroyed {
            resolve_blocking(player, previous, platform);
        }
    }

    apply_volumes(player, &touching, platforms, events);

    let launched = matches!(
        resolution.response,
        Some(LandingResponse::Bounced | LandingResponse::Stuck)
    );
    if !launched {
        resolution.teleported = apply_teleport(player, &touching, platforms, events);
    }

    resolution
}

/// Best landing candidate among surfaces the player reached this tick.
///
/// A surface qualifies when the player moves along gravity (or rests), its
/// feet were at or before the surface last tick and at or past it now, and
/// the boxes overlap horizontally. Smallest penetration wins; ties go to the lower index.
pub fn find_landing(
    previous: Rect,
    bounds: Rect,
    velocity_y: f32,
    dir: f32,
    touching: &[usize],
    platforms: &[Platform],
) -> Option<Contact> {
    if velocity_y * dir < 0.0 {
        return None;
    }

    let previous_feet = feet(&previous, dir);
    let current_feet = feet(&bounds, dir);
    let mut best: Option<Contact> = None;

    for &index in touching {
        let platform = &platforms[index];
        match platform.kind().collision_class() {
            CollisionClass::Surface | CollisionClass::OneWay => {}
            CollisionClass::Hazard | CollisionClass::Volume => continue,
        }
        if !bounds.overlaps_horizontally(&platform.rect) {
            continue;
        }

        let surface = head(&platform.rect, dir);
        if (surface - previous_feet) * dir < -CONTACT_TOLERANCE {
            continue;
        }
        let penetration = (current_feet - surface) * dir;
        if penetration < 0.0 {
            continue;
        }
        if best.is_none_or(|b| penetration < b.penetration) {
            best = Some(Contact { index, penetration });
        }
    }

    best
}

/// `bounds` moved along gravity so its feet rest on `rect`
fn settled_on(bounds: Rect, rect: &Rect, dir: f32) -> Rect {
    let y = if dir > 0.0 {
        rect.top() - bounds.height
    } else {
        rect.bottom()
    };
    Rect::new(bounds.x, y, bounds.width, bounds.height)
}

/// Put the player's feet on the platform's landing face
fn snap_to_surface(player: &mut Player, rect: &Rect) {
    if player.gravity_direction > 0.0 {
        player.position.y = rect.top() - player.size.y;
    } else {
        player.position.y = rect.bottom();
    }
}

fn ground(player: &mut Player, index: usize) {
    player.velocity.y = 0.0;
    player.is_grounded = true;
    player.ground_platform = Some(index);
}

fn apply_landing(
    player: &mut Player,
    index: usize,
    fresh: bool,
    platforms: &mut [Platform],
    events: &mut Vec<PlayerEvent>,
) -> LandingResponse {
    let settings = player.settings;
    let dir = player.gravity_direction;
    let platform = &mut platforms[index];
    let id = platform.id;

    if fresh && platform.register_glass_landing() {
        events.push(PlayerEvent::PlatformShattered { platform: id });
        return LandingResponse::FellThrough;
    }

    snap_to_surface(player, &platform.rect);

    let kind = *platform.kind();
    match kind {
        PlatformKind::Bounce { strength } => {
            player.velocity.y = -settings.jump_force * settings.bounce_multiplier * strength * dir;
            player.air_jumps_used = 0;
            events.push(PlayerEvent::Bounced { platform: id });
            return LandingResponse::Bounced;
        }
        PlatformKind::Sticky => {
            ground(player, index);
            player.velocity = Vec2::ZERO;
            player.env.stuck = true;
            if fresh {
                events.push(PlayerEvent::Stuck { platform: id });
            }
            return LandingResponse::Stuck;
        }
        PlatformKind::Ice => {
            ground(player, index);
            player.env.on_ice = true;
        }
        PlatformKind::Conveyor { speed, direction } => {
            ground(player, index);
            player.env.conveyor_speed = Some(speed * direction);
        }
        PlatformKind::Crumble => {
            ground(player, index);
            platform.start_crumble();
        }
        PlatformKind::Secret => {
            ground(player, index);
            if !platform.revealed {
                platform.revealed = true;
                events.push(PlayerEvent::SecretFound { platform: id });
            }
        }
        PlatformKind::Solid
        | PlatformKind::Moving(_)
        | PlatformKind::Phase { .. }
        | PlatformKind::Wall
        | PlatformKind::Glass
        | PlatformKind::Cloud
        | PlatformKind::Glitch { .. } => ground(player, index),
        // Never landing candidates
        PlatformKind::Lava
        | PlatformKind::Spike
        | PlatformKind::Lightning { .. }
        | PlatformKind::GravityFlip
        | PlatformKind::Reverse
        | PlatformKind::LowGravity { .. }
        | PlatformKind::Wind { .. }
        | PlatformKind::Teleporter { .. }
        | PlatformKind::SpeedBoost { .. }
        | PlatformKind::Water => return LandingResponse::Grounded,
    }

    if fresh {
        events.push(PlayerEvent::Landed { platform: id });
    }
    LandingResponse::Grounded
}

/// Side and ceiling contact against a surface that was not landed on
fn resolve_blocking(player: &mut Player, previous: Rect, platform: &Platform) {
    let bounds = player.bounds();
    let rect = &platform.rect;
    if !bounds.intersects(rect) {
        return;
    }
    let dir = player.gravity_direction;
    let is_wall = matches!(platform.kind(), PlatformKind::Wall);

    if previous.right() <= rect.left() + CONTACT_TOLERANCE {
        player.position.x = rect.left() - player.size.x;
        player.velocity.x = player.velocity.x.min(0.0);
        if is_wall {
            player.wall_contact = Some(WallSide::Right);
        }
    } else if previous.left() >= rect.right() - CONTACT_TOLERANCE {
        player.position.x = rect.right();
        player.velocity.x = player.velocity.x.max(0.0);
        if is_wall {
            player.wall_contact = Some(WallSide::Left);
        }
    } else if player.velocity.y * dir < 0.0
        && (head(&previous, dir) - feet(rect, dir)) * dir >= -CONTACT_TOLERANCE
    {
        // Bonked the underside (relative to gravity)
        if dir > 0.0 {
            player.position.y = rect.bottom();
        } else {
            player.position.y = rect.top() - player.size.y;
        }
        player.velocity.y = 0.0;
    }
}

/// Recompute zone modifiers from the volumes overlapped this tick
fn apply_volumes(
    player: &mut Player,
    touching: &[usize],
    platforms: &[Platform],
    events: &mut Vec<PlayerEvent>,
) {
    let previous = std::mem::take(&mut player.touching);
    let mut wind: Option<Vec2> = None;
    let mut low_gravity: Option<f32> = None;
    let mut underwater = false;
    let mut reversed = false;

    for &i in touching {
        let platform = &platforms[i];
        if platform.kind().collision_class() != CollisionClass::Volume {
            continue;
        }
        let entered = !previous.contains(&platform.id);
        player.touching.push(platform.id);

        match *platform.kind() {
            PlatformKind::Wind {
                strength,
                direction,
            } => {
                let push = direction.normalize_or_zero() * strength;
                wind = Some(wind.unwrap_or(Vec2::ZERO) + push);
            }
            PlatformKind::LowGravity { scale } => {
                low_gravity = Some(low_gravity.map_or(scale, |s| s.min(scale)));
            }
            PlatformKind::Water => underwater = true,
            PlatformKind::Reverse => reversed = true,
            PlatformKind::GravityFlip => {
                if entered {
                    player.base_gravity_direction = -player.base_gravity_direction;
                    events.push(PlayerEvent::GravityFlipped {
                        direction: player.base_gravity_direction,
                    });
                }
            }
            PlatformKind::SpeedBoost { speed } => {
                if entered {
                    player.velocity.x = player.velocity.x.max(speed);
                    events.push(PlayerEvent::SpeedBoosted {
                        platform: platform.id,
                    });
                }
            }
            _ => {}
        }
    }

    player.env.wind = wind;
    player.env.low_gravity = low_gravity;
    player.env.underwater = underwater;
    player.env.reversed = reversed;
    player.refresh_gravity();
}

/// Relocate through the first ready teleporter with a live partner
fn apply_teleport(
    player: &mut Player,
    touching: &[usize],
    platforms: &mut [Platform],
    events: &mut Vec<PlayerEvent>,
) -> bool {
    for &i in touching {
        let source = &platforms[i];
        let PlatformKind::Teleporter { link } = *source.kind() else {
            continue;
        };
        if source.cooldown_ms > 0.0 {
            continue;
        }
        let Some(link) = link else {
            continue;
        };
        let Some(target) = platforms
            .iter()
            .position(|p| p.id == link && !p.destroyed)
        else {
            log::debug!("teleporter {} links to missing platform {}", source.id, link);
            continue;
        };
        if target == i {
            continue;
        }

        let from = platforms[i].id;
        let cooldown = player.settings.portal_cooldown_ms;
        platforms[i].cooldown_ms = cooldown;
        platforms[target].cooldown_ms = cooldown;

        player.position = platforms[target].rect.center() - player.size / 2.0;
        player.is_grounded = false;
        player.ground_platform = None;
        events.push(PlayerEvent::Teleported { from, to: link });
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(id: u32, rect: Rect) -> Platform {
        Platform::new(id, rect, PlatformKind::Solid)
    }

    #[test]
    fn test_find_landing_prefers_shallowest() {
        let platforms = vec![
            surface(0, Rect::new(0.0, 118.0, 100.0, 10.0)),
            surface(1, Rect::new(0.0, 119.0, 100.0, 10.0)),
        ];
        let previous = Rect::new(10.0, 97.0, 20.0, 20.0);
        let bounds = Rect::new(10.0, 101.0, 20.0, 20.0);
        let contact = find_landing(previous, bounds, 100.0, 1.0, &[0, 1], &platforms);
        assert_eq!(contact.map(|c| c.index), Some(1));
    }

    #[test]
    fn test_find_landing_rejects_rising_player() {
        let platforms = vec![surface(0, Rect::new(0.0, 118.0, 100.0, 10.0))];
        let previous = Rect::new(10.0, 100.0, 20.0, 20.0);
        let bounds = Rect::new(10.0, 99.0, 20.0, 20.0);
        assert!(find_landing(previous, bounds, -50.0, 1.0, &[0], &platforms).is_none());
    }

    #[test]
    fn test_find_landing_rejects_side_entry() {
        // Feet were well below the top last tick: this is a side hit
        let platforms = vec![surface(0, Rect::new(30.0, 50.0, 100.0, 100.0))];
        let previous = Rect::new(5.0, 100.0, 20.0, 20.0);
        let bounds = Rect::new(12.0, 101.0, 20.0, 20.0);
        assert!(find_landing(previous, bounds, 60.0, 1.0, &[0], &platforms).is_none());
    }

    #[test]
    fn test_find_landing_ignores_volumes() {
        let platforms = vec![Platform::new(
            0,
            Rect::new(0.0, 118.0, 100.0, 10.0),
            PlatformKind::Water,
        )];
        let previous = Rect::new(10.0, 97.0, 20.0, 20.0);
        let bounds = Rect::new(10.0, 101.0, 20.0, 20.0);
        assert!(find_landing(previous, bounds, 100.0, 1.0, &[0], &platforms).is_none());
    }

    #[test]
    fn test_find_landing_flipped_gravity() {
        let platforms = vec![surface(0, Rect::new(0.0, 60.0, 100.0, 40.0))];
        let previous = Rect::new(10.0, 100.5, 20.0, 20.0);
        let bounds = Rect::new(10.0, 99.0, 20.0, 20.0);
        let contact = find_landing(previous, bounds, -80.0, -1.0, &[0], &platforms);
        assert_eq!(contact.map(|c| c.index), Some(0));
        assert!((contact.map_or(0.0, |c| c.penetration) - 1.0).abs() < 1e-6);
    }
}
