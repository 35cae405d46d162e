//! Rhythm Dash headless runner
//!
//! Plays a level with a scripted "jump every N ms" input and logs how far the
//! runner got. Usage:
//!
//! ```text
//! rhythm-dash [LEVEL.json] [JUMP_INTERVAL_MS] [PRESET]
//! ```
//!
//! Without a level path the bundled demo level is used.

#[cfg(not(target_arch = "wasm32"))]
mod runner {
    use rhythm_dash::consts::FRAME_MS;
    use rhythm_dash::sim::{LevelPhase, LevelState, PlayerInput, tick};
    use rhythm_dash::{AssistPreset, LevelConfig, LevelError, PhysicsSettings};

    const DEMO_LEVEL: &str = include_str!("../levels/demo.json");
    const DEFAULT_JUMP_INTERVAL_MS: f32 = 600.0;
    const MAX_ATTEMPTS: u32 = 3;
    /// Simulated time limit per attempt
    const MAX_ATTEMPT_MS: f64 = 60_000.0;

    pub fn run() -> Result<(), LevelError> {
        let args: Vec<String> = std::env::args().skip(1).collect();

        let config = match args.first() {
            Some(path) => LevelConfig::load(path)?,
            None => LevelConfig::from_json(DEMO_LEVEL)?,
        };
        let interval_ms = args
            .get(1)
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|ms| *ms > 0.0)
            .unwrap_or(DEFAULT_JUMP_INTERVAL_MS);
        let preset = args
            .get(2)
            .and_then(|s| AssistPreset::from_str(s))
            .unwrap_or_default();

        let settings = PhysicsSettings::from_preset(preset);
        let mut state = LevelState::try_new(config, settings)?;
        log::info!(
            "Running '{}' ({} platforms, preset {}, jump every {} ms)",
            state.config.name,
            state.platforms.len(),
            preset.as_str(),
            interval_ms
        );

        let best_distance = play_attempts(&mut state, interval_ms);

        match state.phase {
            LevelPhase::Complete => log::info!(
                "Cleared '{}' in {} attempt(s), {:.2}s of play",
                state.config.name,
                state.attempts,
                state.time_ms / 1000.0
            ),
            _ => log::info!(
                "Gave up on '{}' after {} attempt(s); best run covered {:.0} units, last ended with {:?}",
                state.config.name,
                state.attempts,
                best_distance,
                state.player.death_cause
            ),
        }
        Ok(())
    }

    /// Play until cleared, out of attempts, or timed out; returns the
    /// furthest distance any attempt reached
    pub(crate) fn play_attempts(state: &mut LevelState, interval_ms: f32) -> f32 {
        let mut best_distance = f32::MIN;
        loop {
            play_attempt(state, interval_ms);
            best_distance = best_distance.max(state.distance());
            match state.phase {
                LevelPhase::Complete => break,
                LevelPhase::Dead if state.attempts < MAX_ATTEMPTS => state.respawn(),
                LevelPhase::Dead => break,
                LevelPhase::Playing => {
                    log::warn!("Attempt {} timed out", state.attempts);
                    break;
                }
            }
        }
        best_distance
    }

    fn play_attempt(state: &mut LevelState, interval_ms: f32) {
        let start_ms = state.time_ms;
        let mut until_jump = interval_ms;
        while state.phase == LevelPhase::Playing && state.time_ms - start_ms < MAX_ATTEMPT_MS {
            until_jump -= FRAME_MS;
            let input = if until_jump <= 0.0 {
                until_jump += interval_ms;
                PlayerInput::jump()
            } else {
                PlayerInput::default()
            };
            tick(state, &input, FRAME_MS);
        }
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Rhythm Dash (headless) starting...");

    if let Err(e) = runner::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation is embedded by a host on wasm; there is no runner
}
