//! Simulation entities and the tagged roster
//!
//! Every moving entity keeps a float `pos` as the single source of truth and
//! derives its integer hitbox from it after each movement step. Enemies all
//! live in one [`Roster`]; membership in the old-style "groups" (chargers,
//! sappers, flyers) is expressed as tags carried by the entity and queried
//! through the roster, so nothing needs to know which collections exist.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::archetype::{Archetype, DropKind, SpawnStyle};
use super::grid::Tile;
use super::rect::Rect;
use super::timer::Timer;
use crate::consts::{
    BULLET_SIZE, DROP_BOUNDARY_BUFFER, DROP_SIZE, FIELD_HEIGHT, FIELD_WIDTH, SPRITE_SIZE,
};

/// Collection tags an enemy can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Crushes deployed Sappers on contact
    Charger = 1,
    /// The pathing/deploying archetype
    Sapper = 2,
    /// Ignores ground obstacles
    Flying = 4,
}

/// A small set of [`Tag`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagSet(u8);

impl TagSet {
    pub const EMPTY: TagSet = TagSet(0);

    pub const fn with(self, tag: Tag) -> Self {
        TagSet(self.0 | tag as u8)
    }

    #[inline]
    pub fn contains(self, tag: Tag) -> bool {
        self.0 & tag as u8 != 0
    }
}

/// Frame counts and rates for the fixed animation sets. The assets
/// themselves live with the presentation layer; the simulation only advances
/// frame indices.
pub mod anim {
    pub const ENEMY_RUN_FRAMES: usize = 2;
    pub const ENEMY_RUN_FPS: f32 = 6.0;
    pub const TILE_FRAMES: usize = 2;
    pub const TILE_FPS: f32 = 2.0;
    pub const SAPPER_DEPLOY_FRAMES: usize = 4;
    pub const SAPPER_DEPLOY_FPS: f32 = 3.0;
    pub const PLAYER_FRAMES: usize = 4;
    pub const PLAYER_FPS: f32 = 8.0;
    pub const BOSS_FRAMES: usize = 2;
    pub const BOSS_FPS: f32 = 6.0;
    pub const PARTICLE_FPS: f32 = 9.0;
    pub const ASHES_FRAMES: usize = 4;
    pub const PLAYER_DEATH_FRAMES: usize = 6;
    pub const SMOKE_FRAMES: usize = 7;
}

/// A looping or one-shot frame counter.
#[derive(Debug, Clone)]
pub struct Animation {
    pub frame: f32,
    pub fps: f32,
    pub len: usize,
}

impl Animation {
    pub fn new(fps: f32, len: usize) -> Self {
        Self {
            frame: 0.0,
            fps,
            len,
        }
    }

    /// Advance and wrap back to the first frame.
    pub fn advance_wrap(&mut self, dt: f32) {
        self.frame += self.fps * dt;
        if self.frame >= self.len as f32 {
            self.frame = 0.0;
        }
    }

    /// Advance without wrapping; returns `true` once the last frame is
    /// passed (the frame stays clamped on the last index).
    pub fn advance_once(&mut self, dt: f32) -> bool {
        self.frame += self.fps * dt;
        if self.frame >= self.len as f32 {
            self.frame = (self.len - 1) as f32;
            return true;
        }
        false
    }

    /// Current frame index for the draw handoff.
    #[inline]
    pub fn index(&self) -> usize {
        (self.frame as usize).min(self.len - 1)
    }

    pub fn restart(&mut self, fps: f32, len: usize) {
        self.frame = 0.0;
        self.fps = fps;
        self.len = len;
    }
}

/// Movement phase of the pathing archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SapperPhase {
    /// Following the precomputed path waypoint by waypoint
    Run,
    /// Stationary, playing the deploy animation
    Deploying,
    /// Settled; renders beneath moving entities, tougher, never drops
    Deployed,
}

/// Path-following state carried only by Sappers.
#[derive(Debug, Clone)]
pub struct SapperState {
    pub path: Vec<Tile>,
    /// Index into `path` of the waypoint currently approached
    pub next: usize,
    pub deploy_tile: Tile,
    pub phase: SapperPhase,
}

/// A non-boss enemy. Behavior differences between kinds are data
/// ([`Archetype::stats`]) plus the optional sapper path state.
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u32,
    pub archetype: Archetype,
    pub tags: TagSet,
    pub pos: Vec2,
    pub hitbox: Rect,
    /// Current heading (unit-length while homing)
    pub dir: Vec2,
    /// Fixed inward direction held after spawning; zeroed for good once the
    /// enemy is far enough inside the field, which doubles as the
    /// "inward phase over" flag
    pub initial_dir: Vec2,
    pub health: i32,
    pub anim: Animation,
    pub sapper: Option<SapperState>,
}

impl Enemy {
    pub fn new(id: u32, archetype: Archetype, pos: Vec2, initial_dir: Vec2) -> Self {
        let stats = archetype.stats();
        let mut tags = TagSet::EMPTY;
        if archetype == Archetype::Brute {
            tags = tags.with(Tag::Charger);
        }
        if stats.spawn_style == SpawnStyle::Flying {
            tags = tags.with(Tag::Flying);
        }
        Self {
            id,
            archetype,
            tags,
            pos,
            hitbox: Rect::from_center(pos.x.round() as i32, pos.y.round() as i32, 12, 12),
            dir: initial_dir,
            initial_dir,
            health: stats.health,
            anim: Animation::new(anim::ENEMY_RUN_FPS, anim::ENEMY_RUN_FRAMES),
            sapper: None,
        }
    }

    pub fn new_sapper(id: u32, pos: Vec2, path: Vec<Tile>, deploy_tile: Tile) -> Self {
        let mut enemy = Self::new(id, Archetype::Sapper, pos, Vec2::ZERO);
        enemy.tags = TagSet::EMPTY.with(Tag::Sapper);
        enemy.sapper = Some(SapperState {
            path,
            next: 0,
            deploy_tile,
            phase: SapperPhase::Run,
        });
        enemy
    }

    /// The full sprite box, larger than the hitbox; bullets collide against
    /// the hitbox but bounds clamping and rendering use this.
    pub fn sprite_rect(&self) -> Rect {
        Rect::from_center(
            self.pos.x.round() as i32,
            self.pos.y.round() as i32,
            SPRITE_SIZE,
            SPRITE_SIZE,
        )
    }

    /// Re-derive the hitbox center from the float position.
    #[inline]
    pub fn sync_hitbox(&mut self) {
        self.hitbox
            .set_center(self.pos.x.round() as i32, self.pos.y.round() as i32);
    }

    #[inline]
    pub fn is_deployed(&self) -> bool {
        matches!(
            self.sapper,
            Some(SapperState {
                phase: SapperPhase::Deployed,
                ..
            })
        )
    }

    /// Apply damage; returns `true` when this kills the enemy. Calling this
    /// on an already-dead enemy is an invariant breach: the dead are removed
    /// from the roster before anything else can touch them.
    #[must_use]
    pub fn damage(&mut self, amount: i32) -> bool {
        assert!(self.health > 0, "damage applied to a dead enemy");
        self.health -= amount;
        self.health <= 0
    }
}

/// Central enemy registry. Iteration order is spawn order (stable ids), so
/// replays are deterministic.
#[derive(Debug, Default)]
pub struct Roster {
    enemies: Vec<Enemy>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, enemy: Enemy) {
        self.enemies.push(enemy);
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.enemies.iter_mut()
    }

    pub fn with_tag(&self, tag: Tag) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter().filter(move |e| e.tags.contains(tag))
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    /// Remove by id, preserving iteration order of the rest.
    pub fn remove(&mut self, id: u32) -> Option<Enemy> {
        let index = self.enemies.iter().position(|e| e.id == id)?;
        Some(self.enemies.remove(index))
    }

    /// Empty the roster, handing back the removed enemies for their
    /// bookkeeping (deploy tile returns).
    pub fn drain_all(&mut self) -> Vec<Enemy> {
        std::mem::take(&mut self.enemies)
    }
}

/// A bullet in flight. Direction is unit-length; speed is global.
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    pub dir: Vec2,
    pub damage: i32,
    pub from_player: bool,
}

impl Bullet {
    pub fn sprite_rect(&self) -> Rect {
        Rect::from_center(
            self.pos.x.round() as i32,
            self.pos.y.round() as i32,
            BULLET_SIZE,
            BULLET_SIZE,
        )
    }
}

/// A coin or power-up on the floor.
#[derive(Debug, Clone)]
pub struct Drop {
    pub id: u32,
    pub kind: DropKind,
    pub pos: Vec2,
    /// Grace window so a drop spawned under the player is visible first
    pub grace: Timer,
    pub collectable: bool,
    /// Drops clean themselves up if ignored
    pub destruct: Timer,
}

impl Drop {
    pub fn new(id: u32, kind: DropKind, pos: Vec2, now: f32) -> Self {
        // Nudge drops that landed off the edge back in view
        let half = (DROP_SIZE / 2) as f32;
        let buffer = DROP_BOUNDARY_BUFFER as f32;
        let pos = Vec2::new(
            pos.x
                .clamp(buffer - half, FIELD_WIDTH as f32 - buffer + half),
            pos.y
                .clamp(buffer - half, FIELD_HEIGHT as f32 - buffer + half),
        );
        Self {
            id,
            kind,
            pos,
            grace: Timer::started(1000.0, now),
            collectable: false,
            destruct: Timer::started(8000.0, now),
        }
    }

    pub fn sprite_rect(&self) -> Rect {
        Rect::from_center(
            self.pos.x.round() as i32,
            self.pos.y.round() as i32,
            DROP_SIZE,
            DROP_SIZE,
        )
    }

    /// In the final stretch before self-destructing; presentation blinks it.
    pub fn expiring(&self, now: f32) -> bool {
        self.destruct.is_active() && self.destruct.percent_remaining(now) <= 0.1
    }
}

/// Named particle frame sets the presentation layer owns assets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Death remains of an enemy kind
    Ashes(Archetype),
    PlayerDeath,
    Smoke,
}

impl ParticleKind {
    pub fn frames(self) -> usize {
        match self {
            ParticleKind::Ashes(_) => anim::ASHES_FRAMES,
            ParticleKind::PlayerDeath => anim::PLAYER_DEATH_FRAMES,
            ParticleKind::Smoke => anim::SMOKE_FRAMES,
        }
    }
}

/// A fire-and-forget animation at a fixed position: plays its frames, then
/// despawns - or lingers on the last frame for `linger`'s duration first.
/// An optional `delay` holds it invisible before it starts.
#[derive(Debug, Clone)]
pub struct Particle {
    pub id: u32,
    pub kind: ParticleKind,
    pub pos: Vec2,
    pub anim: Animation,
    pub delay: Option<Timer>,
    pub linger: Option<Timer>,
}

impl Particle {
    pub fn new(
        id: u32,
        kind: ParticleKind,
        pos: Vec2,
        delay_ms: Option<f32>,
        linger_ms: Option<f32>,
        now: f32,
    ) -> Self {
        Self {
            id,
            kind,
            pos,
            anim: Animation::new(anim::PARTICLE_FPS, kind.frames()),
            delay: delay_ms.map(|ms| Timer::started(ms, now)),
            linger: linger_ms.map(Timer::new),
        }
    }

    /// Hidden while its start delay is still running.
    pub fn visible(&self) -> bool {
        self.delay.as_ref().is_none_or(|t| !t.is_active())
    }

    pub fn sprite_rect(&self) -> Rect {
        Rect::from_center(
            self.pos.x.round() as i32,
            self.pos.y.round() as i32,
            SPRITE_SIZE,
            SPRITE_SIZE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagset() {
        let tags = TagSet::EMPTY.with(Tag::Charger).with(Tag::Flying);
        assert!(tags.contains(Tag::Charger));
        assert!(tags.contains(Tag::Flying));
        assert!(!tags.contains(Tag::Sapper));
    }

    #[test]
    fn test_enemy_tags_from_archetype() {
        let brute = Enemy::new(1, Archetype::Brute, Vec2::new(50.0, 50.0), Vec2::ZERO);
        assert!(brute.tags.contains(Tag::Charger));
        let wasp = Enemy::new(2, Archetype::Wasp, Vec2::new(50.0, 50.0), Vec2::ZERO);
        assert!(wasp.tags.contains(Tag::Flying));
        let sapper = Enemy::new_sapper(3, Vec2::ZERO, vec![Tile::new(0, 0)], Tile::new(0, 0));
        assert!(sapper.tags.contains(Tag::Sapper));
    }

    #[test]
    fn test_enemy_damage_kills_at_zero() {
        let mut husk = Enemy::new(1, Archetype::Husk, Vec2::new(50.0, 50.0), Vec2::ZERO);
        assert!(!husk.damage(4));
        assert!(husk.damage(2));
    }

    #[test]
    #[should_panic]
    fn test_damage_after_death_panics() {
        let mut grunt = Enemy::new(1, Archetype::Grunt, Vec2::new(50.0, 50.0), Vec2::ZERO);
        let _ = grunt.damage(5);
        let _ = grunt.damage(1);
    }

    #[test]
    fn test_roster_tag_query_and_removal() {
        let mut roster = Roster::new();
        roster.add(Enemy::new(1, Archetype::Grunt, Vec2::ZERO, Vec2::ZERO));
        roster.add(Enemy::new(2, Archetype::Brute, Vec2::ZERO, Vec2::ZERO));
        roster.add(Enemy::new(3, Archetype::Brute, Vec2::ZERO, Vec2::ZERO));
        assert_eq!(roster.with_tag(Tag::Charger).count(), 2);

        let removed = roster.remove(2).unwrap();
        assert_eq!(removed.id, 2);
        assert_eq!(roster.with_tag(Tag::Charger).count(), 1);
        assert!(roster.remove(2).is_none());
        // Order of the rest is preserved
        let ids: Vec<u32> = roster.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_animation_wrap_and_once() {
        let mut looping = Animation::new(6.0, 2);
        looping.advance_wrap(0.25); // 1.5 frames
        assert_eq!(looping.index(), 1);
        looping.advance_wrap(0.25); // wraps
        assert_eq!(looping.index(), 0);

        let mut once = Animation::new(3.0, 4);
        assert!(!once.advance_once(1.0)); // frame 3.0 -> clamps next
        assert!(once.advance_once(0.5));
        assert_eq!(once.index(), 3);
    }

    #[test]
    fn test_drop_nudged_into_field() {
        let drop = Drop::new(1, DropKind::Coin(1), Vec2::new(-20.0, 300.0), 0.0);
        let rect = drop.sprite_rect();
        assert!(rect.right() >= DROP_BOUNDARY_BUFFER);
        assert!(rect.top <= FIELD_HEIGHT - DROP_BOUNDARY_BUFFER);
    }

    #[test]
    fn test_drop_grace_window() {
        let mut drop = Drop::new(1, DropKind::Coin(1), Vec2::new(100.0, 100.0), 0.0);
        assert!(!drop.collectable);
        if drop.grace.update(1000.0) {
            drop.collectable = true;
        }
        assert!(drop.collectable);
    }

    #[test]
    fn test_particle_hidden_while_delayed() {
        let mut particle = Particle::new(
            1,
            ParticleKind::Smoke,
            Vec2::new(10.0, 10.0),
            Some(500.0),
            None,
            0.0,
        );
        assert!(!particle.visible());
        let _ = particle.delay.as_mut().unwrap().update(500.0);
        assert!(particle.visible());
    }
}
