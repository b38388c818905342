//! Data-driven level and campaign descriptions
//!
//! A level config names its background and geometry resources (opaque to the
//! simulation; the loader resolves them), the level kind, and the spawn
//! descriptors driving the spawn planner. The built-in campaign is a static
//! table; the same records load from JSON for external tuning.

use serde::{Deserialize, Serialize};

use crate::sim::archetype::Archetype;
use crate::sim::boss::FiringStrategy;

/// Completion predicate variants sharing one simulation core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LevelKind {
    /// Survive the countdown, then clear the field
    Timed { duration_ms: f32 },
    /// Clear the field (the boss counts as one enemy)
    Boss {
        health: i32,
        fire_cooldown_ms: f32,
        strategy: FiringStrategy,
    },
    /// Always complete; exists to spend coins in
    Shop,
}

/// One enemy stream: an archetype spawning on a fixed period. Archetypes
/// that spawn in groups carry a weight table over {1,2,3} simultaneous
/// spawns, tuned per level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPlan {
    pub archetype: Archetype,
    pub period_ms: f32,
    #[serde(default)]
    pub count_weights: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Background resource name, resolved by the presentation layer
    pub background: String,
    /// Geometry resource name, resolved by the tilemap loader
    pub geometry: String,
    pub kind: LevelKind,
    #[serde(default)]
    pub spawns: Vec<SpawnPlan>,
}

fn plan(archetype: Archetype, period_ms: f32) -> SpawnPlan {
    SpawnPlan {
        archetype,
        period_ms,
        count_weights: None,
    }
}

fn plan_multi(archetype: Archetype, period_ms: f32, weights: [f32; 3]) -> SpawnPlan {
    SpawnPlan {
        archetype,
        period_ms,
        count_weights: Some(weights),
    }
}

fn level(background: &str, index: usize, kind: LevelKind, spawns: Vec<SpawnPlan>) -> LevelConfig {
    LevelConfig {
        background: background.to_string(),
        geometry: format!("level_{index:02}"),
        kind,
        spawns,
    }
}

/// The built-in 14-level campaign: three zones, each a few timed levels
/// capped by a shop and a boss.
pub fn campaign() -> Vec<LevelConfig> {
    use Archetype::*;

    vec![
        level(
            "badlands_bg",
            0,
            LevelKind::Timed {
                duration_ms: 30_000.0,
            },
            vec![plan_multi(Grunt, 1000.0, [0.5, 0.3, 0.2])],
        ),
        level(
            "badlands_bg",
            1,
            LevelKind::Timed {
                duration_ms: 35_000.0,
            },
            vec![
                plan_multi(Grunt, 900.0, [0.4, 0.3, 0.3]),
                plan(Sapper, 5000.0),
            ],
        ),
        level(
            "badlands_bg",
            2,
            LevelKind::Timed {
                duration_ms: 35_000.0,
            },
            vec![
                plan_multi(Grunt, 900.0, [0.3, 0.3, 0.4]),
                plan(Brute, 2500.0),
                plan(Sapper, 4500.0),
            ],
        ),
        level(
            "badlands_bg",
            3,
            LevelKind::Timed {
                duration_ms: 40_000.0,
            },
            vec![
                plan_multi(Grunt, 800.0, [0.1, 0.5, 0.4]),
                plan(Brute, 2000.0),
                plan(Sapper, 4000.0),
            ],
        ),
        level("badlands_bg", 4, LevelKind::Shop, vec![]),
        level(
            "badlands_bg",
            5,
            LevelKind::Boss {
                health: 50,
                fire_cooldown_ms: 300.0,
                strategy: FiringStrategy::Upwards,
            },
            vec![],
        ),
        level(
            "overgrowth_bg",
            6,
            LevelKind::Timed {
                duration_ms: 40_000.0,
            },
            vec![
                plan(Brute, 2000.0),
                plan(Scuttler, 1600.0),
                plan(Wasp, 1800.0),
            ],
        ),
        level(
            "overgrowth_bg",
            7,
            LevelKind::Timed {
                duration_ms: 45_000.0,
            },
            vec![
                plan(Brute, 2000.0),
                plan(Scuttler, 1500.0),
                plan(Wasp, 1700.0),
            ],
        ),
        level(
            "overgrowth_bg",
            8,
            LevelKind::Timed {
                duration_ms: 50_000.0,
            },
            vec![
                plan(Brute, 1750.0),
                plan(Scuttler, 1300.0),
                plan(Wasp, 1500.0),
            ],
        ),
        level("overgrowth_bg", 9, LevelKind::Shop, vec![]),
        level(
            "overgrowth_bg",
            10,
            LevelKind::Boss {
                health: 100,
                fire_cooldown_ms: 200.0,
                strategy: FiringStrategy::TowardsPlayer,
            },
            vec![],
        ),
        level(
            "ruins_bg",
            11,
            LevelKind::Timed {
                duration_ms: 50_000.0,
            },
            vec![
                plan_multi(Husk, 1200.0, [0.1, 0.2, 0.7]),
                plan(Wraith, 1300.0),
            ],
        ),
        level(
            "ruins_bg",
            12,
            LevelKind::Timed {
                duration_ms: 50_000.0,
            },
            vec![
                plan_multi(Husk, 1000.0, [0.1, 0.1, 0.8]),
                plan(Wraith, 1100.0),
            ],
        ),
        level(
            "ruins_bg",
            13,
            LevelKind::Timed {
                duration_ms: 60_000.0,
            },
            vec![plan_multi(Husk, 800.0, [0.0, 0.1, 0.9]), plan(Wraith, 900.0)],
        ),
    ]
}

/// Load a campaign from JSON (same shape `campaign()` serializes to).
pub fn campaign_from_json(json: &str) -> serde_json::Result<Vec<LevelConfig>> {
    serde_json::from_str(json)
}
