//! Tilerun entry point
//!
//! Headless demo: the autopilot plays from the selected world while cues go
//! to the log. Prints a JSON snapshot of the final state.
//!
//! Usage: tilerun [CONFIG.json] [--overrides DIR] [--world N] [--frames N]

use std::path::{Path, PathBuf};

use tilerun::consts::*;
use tilerun::sim::{GamePhase, GameState, TickInput, demo_start, tick};
use tilerun::view::GameView;
use tilerun::{CueSink, GameConfig, GameError, LogCueSink};

/// Simulated host frame time; larger than SIM_DT so the accumulator substeps
const FRAME_DT: f32 = 1.0 / 30.0;
const DEFAULT_FRAMES: u32 = 3600;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    overrides: Option<PathBuf>,
    world: Option<u8>,
    frames: Option<u32>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--overrides" => args.overrides = it.next().map(PathBuf::from),
            "--world" => args.world = it.next().and_then(|v| v.parse().ok()),
            "--frames" => args.frames = it.next().and_then(|v| v.parse().ok()),
            other => args.config = Some(PathBuf::from(other)),
        }
    }
    args
}

fn load_config(args: &Args) -> Result<GameConfig, GameError> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load_or_default(path),
        None => GameConfig::default(),
    };
    if let Some(dir) = &args.overrides {
        let count = config.load_overrides_dir(Path::new(dir))?;
        log::info!("{} stage overrides loaded", count);
    }
    Ok(config)
}

/// Host-side loop state, mirrors what an interactive frontend would keep
struct Game {
    state: GameState,
    accumulator: f32,
    input: TickInput,
    sink: LogCueSink,
}

impl Game {
    fn new(config: GameConfig) -> Self {
        Self {
            state: GameState::new(config),
            accumulator: 0.0,
            input: TickInput {
                demo: true,
                ..Default::default()
            },
            sink: LogCueSink::default(),
        }
    }

    /// Run simulation ticks for one host frame
    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, &self.input, SIM_DT);
            self.sink.play_all(&self.state.cues, &self.state.config);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // One-shot inputs only apply to a single tick
            self.input.confirm = false;
            self.input.cycle_world = false;
        }
    }
}

fn run(args: Args) -> Result<(), GameError> {
    let config = load_config(&args)?;
    let mut game = Game::new(config);

    game.state.world_select = args.world.unwrap_or(1).clamp(1, WORLDS);
    match demo_start(&mut game.state) {
        Some(key) => log::info!("Demo starting at stage {}", key),
        None => log::error!("Demo could not start from world {}", game.state.world_select),
    }

    let frames = args.frames.unwrap_or(DEFAULT_FRAMES);
    for frame in 0..frames {
        game.update(FRAME_DT);
        match game.state.phase {
            GamePhase::Playing => {}
            GamePhase::WorldClear => game.input.confirm = true,
            GamePhase::Title | GamePhase::GameOver | GamePhase::Victory => {
                log::info!("Demo ended at frame {} in {:?}", frame, game.state.phase);
                break;
            }
        }
    }

    if let Some(err) = &game.state.last_error {
        log::error!("Last stage load error: {}", err);
    }
    log::info!("{} cues played", game.sink.played);
    println!("{}", serde_json::to_string_pretty(&GameView::capture(&game.state))?);
    Ok(())
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Tilerun (headless) starting...");

    if let Err(e) = run(parse_args()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
