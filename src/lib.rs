//! Gridfire - a top-down arena shooter simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (steering, collision, spawning, combat)
//! - `config`: Data-driven level/campaign descriptions
//! - `session`: Run state carried across levels (lives, coins, upgrades)
//!
//! Rendering, audio playback and tilemap parsing are external collaborators:
//! the simulation hands out a per-frame snapshot (draw list + HUD numbers)
//! and a drained list of named sound cues, and receives parsed geometry and
//! per-tick input commands.

pub mod config;
pub mod session;
pub mod sim;

pub use config::{LevelConfig, LevelKind};
pub use session::RunState;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Logical tile edge in pixels
    pub const TILE_SIZE: i32 = 16;
    /// Playfield dimensions in tiles
    pub const GRID_TILES: i32 = 16;
    /// Playfield dimensions in pixels
    pub const FIELD_WIDTH: i32 = TILE_SIZE * GRID_TILES;
    pub const FIELD_HEIGHT: i32 = TILE_SIZE * GRID_TILES;

    /// Sprite box edge for tile-sized entities (player, enemies, boss)
    pub const SPRITE_SIZE: i32 = 16;

    /// Homing enemies stop their inward spawn movement once their sprite box
    /// is this far inside every field edge
    pub const INWARD_MARGIN: i32 = 2 * TILE_SIZE;

    /// Bullet defaults
    pub const BULLET_SPEED: f32 = 150.0;
    pub const BULLET_SIZE: i32 = 4;

    /// Drop defaults
    pub const DROP_SIZE: i32 = 10;
    /// Drops slide toward the player inside this radius
    pub const DROP_MAGNET_RADIUS: f32 = 30.0;
    /// Drops spawned off-field get nudged this far back inside
    pub const DROP_BOUNDARY_BUFFER: i32 = 10;

    /// Path followers snap to a waypoint within this distance
    pub const WAYPOINT_EPSILON: f32 = 5.0;
}

/// Rotate a vector by an angle given in degrees
#[inline]
pub fn rotate_vec(v: Vec2, degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Unsigned angle between two unit vectors, in degrees
///
/// The dot product is clamped before `acos`: accumulated float error can push
/// it just past ±1 for near-parallel vectors.
#[inline]
pub fn angle_between_deg(a: Vec2, b: Vec2) -> f32 {
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}
