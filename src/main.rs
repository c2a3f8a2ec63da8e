//! Coop Siege headless runner
//!
//! Plays a match at the fixed timestep with no presentation attached,
//! printing JSON snapshots for inspection or replay tooling.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use coop_siege::consts::SIM_DT;
use coop_siege::settings::Cell;
use coop_siege::{GameController, GameEvent, Settings, TowerKind};

/// A placement given on the command line as `KIND:X:Y`
#[derive(Debug, Clone, Copy)]
struct TowerOrder {
    kind: TowerKind,
    cell: Cell,
}

fn parse_tower(arg: &str) -> Result<TowerOrder, String> {
    let parts: Vec<&str> = arg.split(':').collect();
    let [kind, x, y] = parts.as_slice() else {
        return Err(format!("expected KIND:X:Y, got `{arg}`"));
    };
    let kind = TowerKind::from_str(kind).ok_or_else(|| format!("unknown tower kind `{kind}`"))?;
    let x = x.trim().parse().map_err(|e| format!("bad column `{x}`: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad row `{y}`: {e}"))?;
    Ok(TowerOrder {
        kind,
        cell: Cell::new(x, y),
    })
}

#[derive(Parser, Debug)]
#[command(name = "coop-siege")]
#[command(about = "Run a headless tower-defense match")]
struct Args {
    /// RNG seed for enemy spawn positions
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Simulated seconds to run (stops early if the castle falls)
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,

    /// JSON settings file; defaults are used for anything it omits
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print a snapshot every N ticks (0 prints only the final one)
    #[arg(long, default_value_t = 0)]
    snapshot_every: u64,

    /// Tower to place before the first tick, as KIND:X:Y (repeatable)
    #[arg(long = "tower", value_parser = parse_tower)]
    towers: Vec<TowerOrder>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let mut game = GameController::new(settings, args.seed);

    for order in &args.towers {
        if !game.settings().arena.is_buildable(order.cell) {
            log::warn!("Skipping {} at ({}, {}): not buildable", order.kind.as_str(), order.cell.x, order.cell.y);
            continue;
        }
        if let Err(e) = game.place_tower(order.kind, order.cell) {
            log::warn!("Skipping {} at ({}, {}): {}", order.kind.as_str(), order.cell.x, order.cell.y, e);
        }
    }

    let ticks = (args.seconds / SIM_DT).ceil() as u64;
    let mut kills = 0u32;
    let mut waves = 0usize;
    for tick in 1..=ticks {
        game.step(SIM_DT);

        for event in game.drain_events() {
            match event {
                GameEvent::EnemyKilled { .. } => kills += 1,
                GameEvent::WaveSpawned { .. } => waves += 1,
                _ => {}
            }
        }

        if args.snapshot_every > 0 && tick % args.snapshot_every == 0 {
            println!("{}", serde_json::to_string(&game.snapshot())?);
        }
        if game.is_ended() {
            log::info!("Castle fell after {:.1}s", game.elapsed());
            break;
        }
    }

    println!("{}", serde_json::to_string_pretty(&game.snapshot())?);
    log::info!(
        "Finished: {:.1}s, {} waves, {} kills, {} credits, castle {:.0}/{:.0}",
        game.elapsed(),
        waves,
        kills,
        game.credits(),
        game.castle().life.current(),
        game.castle().life.max()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tower_order() {
        let order = parse_tower("triple:-2:3").unwrap();
        assert_eq!(order.kind, TowerKind::TripleShot);
        assert_eq!(order.cell, Cell::new(-2, 3));

        assert!(parse_tower("fast:1").is_err());
        assert!(parse_tower("laser:1:1").is_err());
        assert!(parse_tower("wall:a:1").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["coop-siege", "--seed", "7", "--tower", "fast:1:0", "--tower", "wall:0:-1"]);
        assert_eq!(args.seed, 7);
        assert_eq!(args.towers.len(), 2);
        assert_eq!(args.snapshot_every, 0);
    }
}
