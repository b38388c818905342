//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed logical clock only, advanced from the supplied frame delta
//! - Seeded RNG only (one `Pcg32` per level)
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod archetype;
pub mod boss;
pub mod combat;
pub mod entity;
pub mod grid;
pub mod level;
pub mod player;
pub mod rect;
pub mod spawn;
pub mod steering;
pub mod timer;

pub use archetype::{Archetype, DropKind, DropTable, PowerupKind};
pub use boss::{Boss, BossPose, FiringStrategy};
pub use entity::{Bullet, Drop, Enemy, Particle, ParticleKind, Roster, SapperPhase, Tag, TagSet};
pub use grid::{DeployTiles, Tile, WalkGrid};
pub use level::{Depth, DrawItem, Geometry, Level, Outbox, Sfx, Snapshot, Sprite, TickInput};
pub use player::{Facing, Player};
pub use rect::Rect;
pub use timer::Timer;
