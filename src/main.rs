/// Entry point and frame loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use config::GameConfig;
use sim::event::GameEvent;
use sim::level::{load_levels, LevelDef};
use sim::session::Session;
use ui::gamepad::GamepadState;
use ui::input::{Command, InputState};
use ui::renderer::Renderer;
use ui::sound::{pick_sfx, SoundEngine};

fn main() {
    // Logging first, so config and level warnings land in the log.
    let _log_guard = match logging::init() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e}");
            None
        }
    };

    let config = GameConfig::load();

    let levels = match load_levels(&config.levels_dir) {
        Ok(levels) => levels,
        Err(e) => {
            tracing::error!("no playable levels: {e}");
            eprintln!("No playable levels: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&levels, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    match result {
        Ok(()) => {
            tracing::info!("exit");
            println!("Thanks for playing Stairwell!");
        }
        Err(e) => {
            tracing::error!("game error: {e}");
            eprintln!("Game error: {e}");
            std::process::exit(1);
        }
    }
}

fn game_loop(
    levels: &[LevelDef],
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let frame = Duration::from_millis(config.timing.tick_rate_ms.max(1));
    let mut level_idx = config.start_level.min(levels.len() - 1);
    let mut session = start_level(levels, level_idx, config);
    let mut last_frame = Instant::now();

    loop {
        // Keyboard first, then gamepad; both feed the same FIFO.
        let mut commands = kb.drain_events().to_vec();
        commands.extend_from_slice(gp.update());

        for cmd in commands {
            match cmd {
                Command::Quit => return Ok(()),
                Command::Play(action) => session.enqueue(action),
                Command::Skip => session.skip(),
                Command::NextLevel => {
                    level_idx = (level_idx + 1) % levels.len();
                    session = start_level(levels, level_idx, config);
                }
                Command::PrevLevel => {
                    level_idx = (level_idx + levels.len() - 1) % levels.len();
                    session = start_level(levels, level_idx, config);
                }
            }
        }

        let now = Instant::now();
        let dt_ms = now.duration_since(last_frame).as_millis().min(u32::MAX as u128) as u32;
        last_frame = now;

        let events = session.tick(dt_ms);
        process_sound_events(sound, &events);

        renderer.render(&session, levels.len())?;

        let spent = last_frame.elapsed();
        if spent < frame {
            std::thread::sleep(frame - spent);
        }
    }
}

fn start_level(levels: &[LevelDef], idx: usize, config: &GameConfig) -> Session {
    Session::new(&levels[idx], idx, config.rules, config.timing.clone())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    if let Some(effect) = pick_sfx(events) {
        sfx.play(effect);
    }
}
