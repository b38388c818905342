//! Periodic enemy spawn placement
//!
//! Each spawn descriptor in the level config owns a repeating period timer.
//! When one fires, the planner picks an edge, lane(s) or offset for the
//! archetype's spawn style and emits spawn requests for the level to turn
//! into roster entries. Spawning is gated: nothing spawns while the freeze
//! stage runs or while the level countdown is not actively ticking (before
//! the pre-level delay ends, or after the countdown expires during mop-up).

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::archetype::{Archetype, SpawnStyle};
use super::grid::{DeployTiles, Tile, WalkGrid};
use super::timer::Timer;
use crate::config::SpawnPlan;
use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH, GRID_TILES};

/// Lane tiles near the field's center that land archetypes enter through.
const LANE_TILES: [i32; 3] = [7, 8, 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    fn random(rng: &mut Pcg32) -> Self {
        match rng.random_range(0..4) {
            0 => Edge::Top,
            1 => Edge::Bottom,
            2 => Edge::Left,
            _ => Edge::Right,
        }
    }
}

/// One enemy to create, with everything the roster entry needs.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub archetype: Archetype,
    /// Center position, one tile outside the field
    pub pos: Vec2,
    /// Unit vector pointing into the field (zero for the pathing archetype)
    pub initial_dir: Vec2,
    /// Path and reserved deploy tile for the pathing archetype
    pub path: Option<(Vec<Tile>, Tile)>,
}

struct Entry {
    plan: SpawnPlan,
    timer: Timer,
}

/// Drives the per-archetype spawn periods for one level.
pub struct SpawnPlanner {
    entries: Vec<Entry>,
}

impl SpawnPlanner {
    pub fn new(plans: &[SpawnPlan], now: f32) -> Self {
        let entries = plans
            .iter()
            .map(|plan| Entry {
                plan: plan.clone(),
                timer: Timer::started(plan.period_ms, now),
            })
            .collect();
        Self { entries }
    }

    /// Advance the period timers and plan spawns for the ones that fired.
    /// Timers re-arm whether or not the gate is open; a closed gate just
    /// swallows the trigger.
    pub fn poll(
        &mut self,
        now: f32,
        gate_open: bool,
        grid: &WalkGrid,
        deploy: &mut DeployTiles,
        rng: &mut Pcg32,
    ) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();
        for entry in &mut self.entries {
            if entry.timer.update(now) {
                entry.timer.activate(now);
                if gate_open {
                    plan(&entry.plan, grid, deploy, rng, &mut requests);
                }
            }
        }
        requests
    }
}

fn plan(
    plan: &SpawnPlan,
    grid: &WalkGrid,
    deploy: &mut DeployTiles,
    rng: &mut Pcg32,
    out: &mut Vec<SpawnRequest>,
) {
    let archetype = plan.archetype;
    match archetype.stats().spawn_style {
        SpawnStyle::Lane => {
            let edge = Edge::random(rng);
            let lane = LANE_TILES[rng.random_range(0..LANE_TILES.len())];
            let (pos, dir) = lane_spawn(edge, lane);
            out.push(SpawnRequest {
                archetype,
                pos,
                initial_dir: dir,
                path: None,
            });
        }
        SpawnStyle::LaneMulti => {
            let weights = plan.count_weights.unwrap_or([1.0, 0.0, 0.0]);
            let count = sample_count(weights, rng);
            let lanes = sample_distinct_lanes(count, rng);
            let edge = Edge::random(rng);
            for lane in lanes {
                let (pos, dir) = lane_spawn(edge, lane);
                out.push(SpawnRequest {
                    archetype,
                    pos,
                    initial_dir: dir,
                    path: None,
                });
            }
        }
        SpawnStyle::Flying => {
            let edge = Edge::random(rng);
            let (pos, dir) = flying_spawn(edge, rng);
            out.push(SpawnRequest {
                archetype,
                pos,
                initial_dir: dir,
                path: None,
            });
        }
        SpawnStyle::Pathing => {
            // No free deploy tile means no spawn this period
            let Some(target) = deploy.take_random(rng) else {
                return;
            };
            let edge = Edge::random(rng);
            let lane = LANE_TILES[rng.random_range(0..LANE_TILES.len())];
            let (outside, entry) = pathing_tiles(edge, lane);
            let path = grid
                .find_path(entry, target)
                .expect("level geometry guarantees a path from every edge entry to every deploy tile");
            out.push(SpawnRequest {
                archetype,
                pos: outside.center_px(),
                initial_dir: Vec2::ZERO,
                path: Some((path, target)),
            });
        }
    }
}

/// Spawn center one tile outside the field at the given lane, heading
/// perpendicular, into the field.
fn lane_spawn(edge: Edge, lane: i32) -> (Vec2, Vec2) {
    let (tile, dir) = match edge {
        Edge::Top => (Tile::new(lane, -1), Vec2::new(0.0, 1.0)),
        Edge::Bottom => (Tile::new(lane, GRID_TILES), Vec2::new(0.0, -1.0)),
        Edge::Left => (Tile::new(-1, lane), Vec2::new(1.0, 0.0)),
        Edge::Right => (Tile::new(GRID_TILES, lane), Vec2::new(-1.0, 0.0)),
    };
    (tile.center_px(), dir)
}

/// Off-field spawn tile and the on-grid entry tile the path starts from.
fn pathing_tiles(edge: Edge, lane: i32) -> (Tile, Tile) {
    match edge {
        Edge::Top => (Tile::new(lane, -1), Tile::new(lane, 0)),
        Edge::Bottom => (Tile::new(lane, GRID_TILES), Tile::new(lane, GRID_TILES - 1)),
        Edge::Left => (Tile::new(-1, lane), Tile::new(0, lane)),
        Edge::Right => (Tile::new(GRID_TILES, lane), Tile::new(GRID_TILES - 1, lane)),
    }
}

/// Flyers spawn at a uniform offset within the middle 80% of the edge,
/// heading toward the field center.
fn flying_spawn(edge: Edge, rng: &mut Pcg32) -> (Vec2, Vec2) {
    let width = FIELD_WIDTH as f32;
    let height = FIELD_HEIGHT as f32;
    let pos = match edge {
        Edge::Top => Vec2::new(
            rng.random_range(0.1 * width..0.9 * width),
            Tile::new(0, -1).center_px().y,
        ),
        Edge::Bottom => Vec2::new(
            rng.random_range(0.1 * width..0.9 * width),
            Tile::new(0, GRID_TILES).center_px().y,
        ),
        Edge::Left => Vec2::new(
            Tile::new(-1, 0).center_px().x,
            rng.random_range(0.1 * height..0.9 * height),
        ),
        Edge::Right => Vec2::new(
            Tile::new(GRID_TILES, 0).center_px().x,
            rng.random_range(0.1 * height..0.9 * height),
        ),
    };
    let center = Vec2::new(width / 2.0, height / 2.0);
    (pos, (center - pos).normalize())
}

/// Sample a simultaneous spawn count of 1-3 from the level's weight table.
fn sample_count(weights: [f32; 3], rng: &mut Pcg32) -> usize {
    let total: f32 = weights.iter().sum();
    debug_assert!(total > 0.0, "count weights sum to zero");
    let mut pick = rng.random_range(0.0..total);
    for (index, weight) in weights.iter().enumerate() {
        if pick < *weight {
            return index + 1;
        }
        pick -= weight;
    }
    weights.len()
}

/// Distinct lane tiles, sampled without replacement.
fn sample_distinct_lanes(count: usize, rng: &mut Pcg32) -> Vec<i32> {
    let mut lanes = LANE_TILES.to_vec();
    // Partial Fisher-Yates: the first `count` entries end up random/distinct
    for i in 0..count.min(lanes.len()) {
        let j = rng.random_range(i..lanes.len());
        lanes.swap(i, j);
    }
    lanes.truncate(count.min(LANE_TILES.len()));
    lanes
}
