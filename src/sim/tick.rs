//! Fixed-step level update
//!
//! The only entry point that advances a run. Platform timers first, then the
//! broad phase, then the player, then level bounds and the goal.

use super::platform::PlatformChange;
use super::player::{DeathCause, PlayerEvent, PlayerInput};
use super::rect::Rect;
use super::state::{GameEvent, LevelPhase, LevelState};

/// Advance the level by `delta_ms`
pub fn tick(state: &mut LevelState, input: &PlayerInput, delta_ms: f32) {
    if state.phase != LevelPhase::Playing || state.player.is_dead || delta_ms <= 0.0 {
        return;
    }
    state.events.clear();
    state.time_ms += f64::from(delta_ms);
    state.time_ticks += 1;

    // Platforms
    let crumble_total_ms = state.settings.crumble_delay_ms + state.settings.crumble_fall_ms;
    let mut grid_stale = false;
    for platform in &mut state.platforms {
        match platform.tick(delta_ms, crumble_total_ms, &mut state.rng) {
            PlatformChange::None => {}
            PlatformChange::Moved => grid_stale = true,
            PlatformChange::Destroyed => {
                grid_stale = true;
                state.events.push(GameEvent::PlatformDestroyed {
                    platform: platform.id,
                });
            }
        }
    }
    if grid_stale {
        state.grid.build(&state.platforms);
    }

    // Player
    let report = state.player.update(
        delta_ms,
        input,
        &mut state.platforms,
        &state.grid,
        state.config.speed_multiplier,
        state.config.allow_air_jumps,
    );
    let shattered = report
        .events
        .iter()
        .any(|e| matches!(e, PlayerEvent::PlatformShattered { .. }));
    if shattered {
        state.grid.build(&state.platforms);
    }
    state
        .events
        .extend(report.events.into_iter().map(GameEvent::Player));

    // Level bounds
    if !state.player.is_dead {
        let bounds = state.player.bounds();
        let cause = if bounds.top() > state.config.death_plane_y {
            Some(DeathCause::DeathPlane)
        } else if bounds.bottom() < state.config.kill_ceiling_y {
            Some(DeathCause::KillCeiling)
        } else {
            None
        };
        if let Some(cause) = cause {
            state.player.kill(cause);
            state
                .events
                .push(GameEvent::Player(PlayerEvent::Died { cause }));
        }
    }

    if state.player.is_dead {
        state.phase = LevelPhase::Dead;
        log::info!(
            "Attempt {} ended after {:.0} units ({:?})",
            state.attempts,
            state.distance(),
            state.player.death_cause
        );
        return;
    }

    if let Some(goal) = state.config.goal {
        if reached_goal(&goal, &state.player.bounds()) {
            state.phase = LevelPhase::Complete;
            state.events.push(GameEvent::GoalReached);
            log::info!(
                "Level '{}' complete on attempt {} ({:.2}s)",
                state.config.name,
                state.attempts,
                state.time_ms / 1000.0
            );
        }
    }
}

/// Past the goal's leading edge while inside its vertical band
fn reached_goal(goal: &Rect, bounds: &Rect) -> bool {
    bounds.right() >= goal.left() && bounds.top() < goal.bottom() && bounds.bottom() > goal.top()
}
