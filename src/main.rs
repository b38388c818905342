//! Gridfire headless demo driver
//!
//! Runs a scripted session of the first campaign level at the fixed
//! timestep and logs HUD state once a second. Useful for eyeballing the
//! simulation without a renderer; pass a JSON campaign file to run tuned
//! levels instead of the built-in table.

use glam::Vec2;

use gridfire::config::{self, LevelConfig};
use gridfire::consts::SIM_DT;
use gridfire::session::RunState;
use gridfire::sim::{Geometry, Level, Tile, TickInput};

const DEMO_SEED: u64 = 0xC0FFEE;
const DEMO_SECONDS: f32 = 45.0;

/// A small built-in layout standing in for the tilemap loader: spawn-mouth
/// rocks on each edge (with the bottom-center exit strip), a fence block
/// near the middle, and a short water run.
fn demo_geometry() -> Geometry {
    let mut geometry = Geometry {
        player_start: Vec2::new(128.0, 180.0),
        ..Geometry::default()
    };

    // Rocks flanking the lane openings on every edge; tile handle 1
    for lane in [6, 10] {
        geometry.barriers.push((Tile::new(lane, 0), 1));
        geometry.barriers.push((Tile::new(lane, 15), 1));
        geometry.barriers.push((Tile::new(0, lane), 1));
        geometry.barriers.push((Tile::new(15, lane), 1));
    }
    // Bottom exit strip, closed until the level completes
    for x in 7..=9 {
        geometry.barriers.push((Tile::new(x, 15), 2));
    }

    // A fence to shoot around; tile handle 3
    for x in 4..=6 {
        geometry.obstacles.push((Tile::new(x, 5), 3));
    }

    // Water run on the right; tile handle 4
    for y in 9..=11 {
        geometry.water.push((Tile::new(12, y), 4));
    }

    geometry
}

fn load_campaign() -> Vec<LevelConfig> {
    if let Some(path) = std::env::args().nth(1) {
        match std::fs::read_to_string(&path) {
            Ok(json) => match config::campaign_from_json(&json) {
                Ok(levels) => {
                    log::info!("loaded campaign from {path} ({} levels)", levels.len());
                    return levels;
                }
                Err(err) => log::warn!("bad campaign file {path}: {err}; using built-in"),
            },
            Err(err) => log::warn!("cannot read {path}: {err}; using built-in"),
        }
    }
    config::campaign()
}

fn main() {
    env_logger::init();

    let campaign = load_campaign();
    let mut session = RunState::new();
    session.lives = 3;

    let mut level = Level::new(&campaign[0], demo_geometry(), session, DEMO_SEED);
    log::info!("demo: running level 0 for {DEMO_SECONDS}s of simulated time");

    let ticks = (DEMO_SECONDS / SIM_DT) as u32;
    for tick_index in 0..ticks {
        // Scripted input: orbit the field center, always firing upward
        let phase = (tick_index / 90) % 4;
        let input = TickInput {
            move_x: [1, 0, -1, 0][phase as usize],
            move_y: [0, 1, 0, -1][phase as usize],
            fire_up: true,
            use_powerup: tick_index % 600 == 0,
            ..Default::default()
        };
        level.tick(&input, SIM_DT);

        for sfx in level.take_sfx() {
            log::trace!("sfx: {sfx:?}");
        }

        if tick_index % 60 == 0 {
            let snapshot = level.snapshot();
            log::info!(
                "t={:>5.1}s lives={} coins={} enemies={} drops={} timer={:.0}% {}",
                tick_index as f32 * SIM_DT,
                snapshot.lives,
                snapshot.coins,
                level.roster.len(),
                level.drops.len(),
                snapshot.timer_remaining.unwrap_or(0.0) * 100.0,
                if snapshot.completed { "[complete]" } else { "" },
            );
        }

        if level.wants_restart {
            log::info!("demo run ended: out of lives");
            break;
        }
    }

    let snapshot = level.snapshot();
    log::info!(
        "demo finished: completed={} coins={} draw items={}",
        snapshot.completed,
        snapshot.coins,
        snapshot.draw.len()
    );
}
