use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use serde::Serialize;

use mindsweeper_core::{
    Coord2, EngineCell, GameConfig, InferenceEngine, MineLayoutGenerator, PlayEngine,
    RandomLayoutGenerator, RevealOutcome, StartPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "mindsweeper", about = "Plays Minesweeper by logical inference")]
struct Cli {
    /// Board height in cells
    #[arg(long, default_value_t = 8)]
    height: u8,

    /// Board width in cells
    #[arg(long, default_value_t = 8)]
    width: u8,

    /// Number of mines to place
    #[arg(long, default_value_t = 8)]
    mines: u16,

    /// RNG seed; derived from the clock when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Number of games to play
    #[arg(long, default_value_t = 1)]
    games: u32,

    /// Allow the first move to hit a mine
    #[arg(long)]
    random_start: bool,

    /// Print per-game reports as JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

#[derive(Debug, Serialize)]
struct GameReport {
    seed: u64,
    won: bool,
    moves: u32,
    safe_moves: u32,
    random_moves: u32,
    mines_flagged: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let config = GameConfig::new((cli.height, cli.width), cli.mines);
    let start_policy = if cli.random_start {
        StartPolicy::Anywhere
    } else {
        StartPolicy::SafeStart
    };
    let base_seed = cli.seed.unwrap_or_else(seed_from_clock);

    let mut wins = 0u32;
    for game in 0..cli.games {
        let seed = base_seed.wrapping_add(u64::from(game));
        let (report, engine) = play_game(config, seed, start_policy)?;
        if report.won {
            wins += 1;
        }

        if cli.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print!("{}", render_board(&engine));
            println!(
                "game {}: {} after {} moves ({} deduced, {} guessed, seed {})",
                game + 1,
                if report.won { "won" } else { "lost" },
                report.moves,
                report.safe_moves,
                report.random_moves,
                report.seed,
            );
        }
    }

    if !cli.json && cli.games > 1 {
        println!("won {wins} of {} games", cli.games);
    }

    Ok(())
}

/// Runs one game to completion: prefer a deduced-safe move, fall back to a
/// random one, reveal, feed the reported count back into the agent.
///
/// The layout is generated lazily on the first move so the start cell can be
/// kept mine-free under [`StartPolicy::SafeStart`].
fn play_game(
    config: GameConfig,
    seed: u64,
    start_policy: StartPolicy,
) -> Result<(GameReport, PlayEngine)> {
    let mut agent = InferenceEngine::new(config.size, seed);
    let mut engine: Option<PlayEngine> = None;
    let mut report = GameReport {
        seed,
        won: false,
        moves: 0,
        safe_moves: 0,
        random_moves: 0,
        mines_flagged: 0,
    };

    loop {
        let (cell, deduced) = match agent.next_safe_move() {
            Some(cell) => (cell, true),
            None => match agent.next_random_move() {
                Some(cell) => (cell, false),
                None => break,
            },
        };

        let engine = engine.get_or_insert_with(|| {
            let layout = RandomLayoutGenerator::new(seed, cell, start_policy).generate(config);
            PlayEngine::new(layout)
        });

        report.moves += 1;
        if deduced {
            report.safe_moves += 1;
        } else {
            report.random_moves += 1;
        }
        log::info!(
            "revealing {cell:?} ({})",
            if deduced { "deduced safe" } else { "random guess" }
        );

        match engine.reveal(cell)? {
            RevealOutcome::Revealed(count) => {
                agent.observe(cell, count);
                flag_known_mines(engine, &agent, &mut report)?;
            }
            RevealOutcome::HitMine => {
                log::info!("hit a mine at {cell:?}");
                break;
            }
            RevealOutcome::Won => {
                report.won = true;
                break;
            }
            RevealOutcome::NoChange => {
                log::warn!("revealed an already-known cell {cell:?}, stopping");
                break;
            }
        }

        log::debug!("board after move {}:\n{}", report.moves, render_board(engine));
    }

    let engine = engine.expect("at least one move is always available");
    Ok((report, engine))
}

/// Flags every cell the agent has proven to be a mine.
fn flag_known_mines(
    engine: &mut PlayEngine,
    agent: &InferenceEngine,
    report: &mut GameReport,
) -> Result<()> {
    for &cell in agent.mine_cells() {
        if engine.cell_at(cell) == EngineCell::Hidden {
            engine.toggle_flag(cell)?;
            report.mines_flagged += 1;
        }
    }
    Ok(())
}

fn render_board(engine: &PlayEngine) -> String {
    let (rows, cols) = engine.size();
    let mut out = String::new();

    for row in 0..rows {
        for col in 0..cols {
            let cell: Coord2 = (row, col);
            let glyph = if engine.triggered_mine() == Some(cell) {
                '*'
            } else {
                match engine.cell_at(cell) {
                    EngineCell::Hidden => '#',
                    EngineCell::Flagged => 'F',
                    EngineCell::Revealed(0) => '.',
                    EngineCell::Revealed(count) => {
                        char::from_digit(count.into(), 10).unwrap_or('?')
                    }
                }
            };
            out.push(glyph);
            if col + 1 < cols {
                out.push(' ');
            }
        }
        out.push('\n');
    }

    out
}

fn seed_from_clock() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}
