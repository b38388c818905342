//! The per-level frame orchestrator
//!
//! One `Level` owns every entity collection, the walkability grid, the
//! deploy-tile reservation set and all level-global timers, and advances the
//! whole simulation one frame at a time: timers first, then spawn triggers,
//! then the player, enemies, boss and bullets, then contact resolution and
//! the completion predicate. Components never call each other directly;
//! cross-component effects go through the [`Outbox`] capability struct and
//! are applied at the end of the frame.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::archetype::{Archetype, DropKind, PowerupKind};
use super::boss::{Boss, BossPose};
use super::entity::{
    Animation, Bullet, Drop, Enemy, Particle, ParticleKind, Roster, SapperPhase, anim,
};
use super::grid::{DeployTiles, Tile, WalkGrid};
use super::player::{Facing, Player};
use super::rect::Rect;
use super::spawn::{SpawnPlanner, SpawnRequest};
use super::steering;
use super::timer::Timer;
use crate::config::{LevelConfig, LevelKind};
use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH, SPRITE_SIZE, TILE_SIZE};
use crate::session::{RunState, UpgradeKind};

/// Cloak's field-wide enemy stun
const STUN_MS: f32 = 4_000.0;
/// The transitional freeze stage before berserk mode
const FREEZE_MS: f32 = 1_000.0;
/// Berserk mode proper
const BERSERK_MS: f32 = 8_000.0;
/// Grace delay before a timed level's countdown starts
const PRE_LEVEL_DELAY_MS: f32 = 3_000.0;

/// Shop interaction tuning
const SHOP_ACTIVE_RADIUS: f32 = 50.0;
const SHOP_TURN_DISTANCE: f32 = 50.0;
const SHOP_DEBOUNCE_MS: f32 = 500.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Raw movement axes, -1/0/1
    pub move_x: i8,
    pub move_y: i8,
    /// Fire keys; opposite pairs are exclusive in practice
    pub fire_up: bool,
    pub fire_down: bool,
    pub fire_left: bool,
    pub fire_right: bool,
    /// Use the stored power-up
    pub use_powerup: bool,
    /// Confirm a shop purchase
    pub confirm: bool,
}

/// Named sound cues for the audio collaborator, drained per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sfx {
    Gunshot,
    MachineGun,
    MonsterHit,
    Powerup,
    Nuke,
    Dead,
    Footstep,
}

#[derive(Debug, Clone)]
pub struct BulletSpawn {
    pub pos: Vec2,
    pub dir: Vec2,
    pub damage: i32,
    pub from_player: bool,
}

#[derive(Debug, Clone)]
pub struct ParticleSpawn {
    pub kind: ParticleKind,
    pub pos: Vec2,
    pub delay_ms: Option<f32>,
    pub linger_ms: Option<f32>,
}

/// The narrow capability surface components get instead of callbacks into
/// each other: exactly {spawn bullet, spawn drop, spawn particle, release
/// deploy tile, play sound}. The level drains it once per frame.
#[derive(Debug, Default)]
pub struct Outbox {
    pub bullets: Vec<BulletSpawn>,
    pub drops: Vec<(Vec2, DropKind)>,
    pub particles: Vec<ParticleSpawn>,
    pub sfx: Vec<Sfx>,
    pub released_tiles: Vec<Tile>,
}

impl Outbox {
    pub fn spawn_bullet(&mut self, pos: Vec2, dir: Vec2, damage: i32, from_player: bool) {
        self.bullets.push(BulletSpawn {
            pos,
            dir,
            damage,
            from_player,
        });
    }

    pub fn spawn_drop(&mut self, pos: Vec2, kind: DropKind) {
        self.drops.push((pos, kind));
    }

    pub fn spawn_particle(
        &mut self,
        kind: ParticleKind,
        pos: Vec2,
        delay_ms: Option<f32>,
        linger_ms: Option<f32>,
    ) {
        self.particles.push(ParticleSpawn {
            kind,
            pos,
            delay_ms,
            linger_ms,
        });
    }

    pub fn release_tile(&mut self, tile: Tile) {
        self.released_tiles.push(tile);
    }

    pub fn play(&mut self, sfx: Sfx) {
        self.sfx.push(sfx);
    }
}

/// Parsed static geometry handed in by the tilemap loader. Tile handles are
/// opaque to the simulation; they come back out unchanged in the draw list.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Player-blocking only (the spawn-mouth rocks); enemies walk past them
    pub barriers: Vec<(Tile, u16)>,
    /// Blocks everyone and kills bullets
    pub obstacles: Vec<(Tile, u16)>,
    /// Impassable to walkers but not to bullets
    pub water: Vec<(Tile, u16)>,
    /// Impassable, animated, bullets pass through
    pub animated: Vec<(Tile, u16)>,
    /// Draw-only detail
    pub decor: Vec<(Tile, u16)>,
    /// Placed over the centre water tile when a boss level completes
    pub bridge: Option<(Tile, u16)>,
    pub player_start: Vec2,
    pub shopkeeper: Option<Vec2>,
    pub boss_start: Option<Vec2>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileCategory {
    Barrier,
    Obstacle,
    Water,
    Animated,
    Decor,
}

#[derive(Debug, Clone)]
struct StaticTile {
    tile: Tile,
    sprite: u16,
    category: TileCategory,
    /// Part of the strip removed when the level completes
    exit_strip: bool,
    anim: Option<Animation>,
}

/// Render layers, back to front within each scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Depth {
    Bg,
    /// Deployed Sappers render beneath everything that still moves
    DeployedSapper,
    Drops,
    Main,
    Particles,
    Bullets,
    Flying,
}

/// Which way the shopkeeper sprite faces (tracks the player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShopFacing {
    Down,
    Left,
    Right,
}

/// Opaque handle + variant the presentation layer maps to loaded assets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Sprite {
    Tile(u16),
    Player(Facing),
    Enemy(Archetype),
    SapperDeploying,
    SapperDeployed,
    Boss(BossPose),
    /// Damage tier selects the bullet image
    Bullet(u8),
    Drop(DropKind),
    Particle(ParticleKind),
    Shopkeeper(ShopFacing),
}

/// One entry of the depth-then-scanline ordered draw list.
#[derive(Debug, Clone, Serialize)]
pub struct DrawItem {
    pub sprite: Sprite,
    pub frame: usize,
    /// Sprite box top-left
    pub x: i32,
    pub y: i32,
    pub depth: Depth,
    /// Presentation should flicker this item (expiring drop, hit flash)
    pub blink: bool,
}

/// Read-only per-frame state for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub coins: u32,
    pub lives: i32,
    pub stored_powerup: Option<PowerupKind>,
    pub upgrades: crate::session::Upgrades,
    pub boss_health: Option<f32>,
    /// Fraction of the level countdown remaining, for timed levels
    pub timer_remaining: Option<f32>,
    pub completed: bool,
    /// Enemies are stunned (question marks, idle-in-place)
    pub stunned: bool,
    /// Freeze stage: draw only the player and the transition effect
    pub frozen: bool,
    pub shop_active: bool,
    pub game_over: bool,
    pub draw: Vec<DrawItem>,
}

/// Handles to every timer paused by the freeze stage, so exactly those - and
/// only those - resume when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKey {
    Stun,
    Delay,
    Countdown,
    PlayerCooldown,
    Stim,
    Overcharge,
    Minigun,
    Scatter,
    Nova,
    BossIdle,
    BossFire,
    DropGrace(u32),
    DropDestruct(u32),
    ParticleDelay(u32),
    ParticleLinger(u32),
}

/// The shop level's upgrade stand.
#[derive(Debug)]
struct ShopStand {
    keeper_pos: Vec2,
    pads: [(UpgradeKind, Rect); 3],
    debounce: Timer,
    active: bool,
}

impl ShopStand {
    fn new(keeper_pos: Vec2) -> Self {
        let pad = |dx: i32, kind: UpgradeKind| {
            (
                kind,
                Rect::from_center(
                    keeper_pos.x.round() as i32 + dx,
                    keeper_pos.y.round() as i32 + TILE_SIZE + TILE_SIZE / 2,
                    TILE_SIZE,
                    TILE_SIZE,
                ),
            )
        };
        Self {
            keeper_pos,
            pads: [
                pad(-TILE_SIZE - 8, UpgradeKind::Boots),
                pad(0, UpgradeKind::Gun),
                pad(TILE_SIZE + 8, UpgradeKind::Ammo),
            ],
            debounce: Timer::new(SHOP_DEBOUNCE_MS),
            active: false,
        }
    }

    fn facing(&self, player_center_x: f32) -> ShopFacing {
        let dx = self.keeper_pos.x - player_center_x;
        if dx.abs() <= SHOP_TURN_DISTANCE {
            ShopFacing::Down
        } else if dx > 0.0 {
            ShopFacing::Left
        } else {
            ShopFacing::Right
        }
    }
}

/// One level's complete simulation state.
pub struct Level {
    pub kind: LevelKind,
    pub(crate) clock: f32,
    pub(crate) rng: Pcg32,
    pub session: RunState,

    pub(crate) grid: WalkGrid,
    pub(crate) deploy: DeployTiles,
    tiles: Vec<StaticTile>,
    bridge: Option<(Tile, u16)>,
    pub(crate) player_obstacles: Vec<Rect>,
    pub(crate) enemy_obstacles: Vec<Rect>,
    pub(crate) blocking: Vec<Rect>,

    pub(crate) start_pos: Vec2,
    pub player: Player,
    pub roster: Roster,
    pub boss: Option<Boss>,
    pub bullets: Vec<Bullet>,
    pub drops: Vec<Drop>,
    pub particles: Vec<Particle>,
    next_id: u32,

    pub(crate) stun: Timer,
    pub(crate) freeze: Timer,
    pub(crate) berserk: Timer,
    pub(crate) delay: Timer,
    pub(crate) countdown: Timer,
    pub(crate) has_countdown: bool,

    spawner: SpawnPlanner,
    shop: Option<ShopStand>,
    frozen_keys: Vec<TimerKey>,

    pub(crate) completed: bool,
    pub(crate) game_over: bool,
    pub wants_next_level: bool,
    pub wants_restart: bool,

    pub(crate) outbox: Outbox,
    cues: Vec<Sfx>,
}

impl Level {
    pub fn new(config: &LevelConfig, geometry: Geometry, session: RunState, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let now = 0.0;

        let mut grid = WalkGrid::new();
        let mut deploy = DeployTiles::full_grid();
        let mut tiles = Vec::new();

        let fold = |list: &[(Tile, u16)],
                        category: TileCategory,
                        tiles: &mut Vec<StaticTile>,
                        grid: &mut WalkGrid,
                        deploy: &mut DeployTiles| {
            for &(tile, sprite) in list {
                let blocks_walk = matches!(
                    category,
                    TileCategory::Obstacle | TileCategory::Water | TileCategory::Animated
                );
                if blocks_walk {
                    grid.block(tile);
                }
                if category != TileCategory::Decor {
                    deploy.remove(tile);
                }
                let exit_strip = match category {
                    TileCategory::Barrier => tile.y == 15 && (7..=9).contains(&tile.x),
                    TileCategory::Water => tile == Tile::new(8, 8),
                    _ => false,
                };
                tiles.push(StaticTile {
                    tile,
                    sprite,
                    category,
                    exit_strip,
                    anim: (category == TileCategory::Animated)
                        .then(|| Animation::new(anim::TILE_FPS, anim::TILE_FRAMES)),
                });
            }
        };
        fold(
            &geometry.barriers,
            TileCategory::Barrier,
            &mut tiles,
            &mut grid,
            &mut deploy,
        );
        fold(
            &geometry.obstacles,
            TileCategory::Obstacle,
            &mut tiles,
            &mut grid,
            &mut deploy,
        );
        fold(
            &geometry.water,
            TileCategory::Water,
            &mut tiles,
            &mut grid,
            &mut deploy,
        );
        fold(
            &geometry.animated,
            TileCategory::Animated,
            &mut tiles,
            &mut grid,
            &mut deploy,
        );
        fold(
            &geometry.decor,
            TileCategory::Decor,
            &mut tiles,
            &mut grid,
            &mut deploy,
        );

        let player = Player::new(geometry.player_start, &session);

        let boss = match config.kind {
            LevelKind::Boss {
                health,
                fire_cooldown_ms,
                strategy,
            } => {
                let pos = geometry
                    .boss_start
                    .expect("boss level geometry carries a boss position");
                Some(Boss::new(pos, health, fire_cooldown_ms, strategy, now, &mut rng))
            }
            _ => None,
        };

        let shop = match config.kind {
            LevelKind::Shop => {
                let pos = geometry
                    .shopkeeper
                    .expect("shop level geometry carries a shopkeeper position");
                Some(ShopStand::new(pos))
            }
            _ => None,
        };

        let has_countdown = matches!(config.kind, LevelKind::Timed { .. });
        let duration = match config.kind {
            LevelKind::Timed { duration_ms } => duration_ms,
            _ => 0.0,
        };

        log::info!(
            "level start: kind={:?}, spawns={}, deployable tiles={}",
            config.kind,
            config.spawns.len(),
            deploy.len()
        );

        let mut level = Self {
            kind: config.kind,
            clock: now,
            rng,
            session,
            grid,
            deploy,
            tiles,
            bridge: geometry.bridge,
            player_obstacles: Vec::new(),
            enemy_obstacles: Vec::new(),
            blocking: Vec::new(),
            start_pos: geometry.player_start,
            player,
            roster: Roster::new(),
            boss,
            bullets: Vec::new(),
            drops: Vec::new(),
            particles: Vec::new(),
            next_id: 1,
            stun: Timer::new(STUN_MS),
            freeze: Timer::new(FREEZE_MS),
            berserk: Timer::new(BERSERK_MS),
            delay: if has_countdown {
                Timer::started(PRE_LEVEL_DELAY_MS, now)
            } else {
                Timer::new(PRE_LEVEL_DELAY_MS)
            },
            countdown: Timer::new(duration),
            has_countdown,
            spawner: SpawnPlanner::new(&config.spawns, now),
            shop,
            frozen_keys: Vec::new(),
            completed: false,
            game_over: false,
            wants_next_level: false,
            wants_restart: false,
            outbox: Outbox::default(),
            cues: Vec::new(),
        };
        level.rebuild_obstacles();

        // A shop level is complete from the start
        if matches!(level.kind, LevelKind::Shop) {
            level.completed = true;
            level.open_exit();
        }

        level
    }

    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[inline]
    pub fn now(&self) -> f32 {
        self.clock
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Both the pre-delay and the countdown have run their course.
    pub fn is_level_timer_finished(&self) -> bool {
        self.has_countdown && !self.delay.is_active() && !self.countdown.is_active()
    }

    /// Drain the sound cues accumulated since the last call.
    pub fn take_sfx(&mut self) -> Vec<Sfx> {
        std::mem::take(&mut self.cues)
    }

    /// Advance the whole simulation by one frame.
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        self.clock += dt * 1000.0;
        let now = self.clock;

        // Level-global timers run first so everything later reads fresh
        // active flags
        let _ = self.stun.update(now);
        if self.freeze.update(now) {
            // Freeze stage over: resume exactly the paused population and
            // switch modes atomically
            self.thaw_frozen_timers(now);
            self.berserk.activate(now);
        }
        let _ = self.berserk.update(now);
        if self.has_countdown {
            if self.delay.update(now) {
                self.countdown.activate(now);
            }
            if self.countdown.update(now) {
                log::info!("level countdown elapsed; mop-up until the field is clear");
            }
        }

        // Spawn triggers re-arm even when gated; the trigger is swallowed
        let gate_open = !self.freeze.is_active() && self.countdown.is_active();
        let requests = self
            .spawner
            .poll(now, gate_open, &self.grid, &mut self.deploy, &mut self.rng);
        if requests.len() > 1 {
            log::debug!("simultaneous spawn of {}", requests.len());
        }
        for request in requests {
            self.add_enemy(request);
        }

        // During the freeze stage only the player animates; every paused
        // timer holds its remaining time
        if self.freeze.is_active() {
            self.player.update_timers(now);
            self.player.animate(dt);
            return;
        }

        // Player
        self.player.update_timers(now);
        if input.use_powerup {
            if let Some(kind) = self.session.stored_powerup.take() {
                self.apply_powerup(kind, now);
            }
        }
        let berserk = self.berserk.is_active();
        self.player.handle_fire(input, now, berserk, &mut self.outbox);
        self.player
            .step_move(input, now, dt, &self.player_obstacles, berserk, &mut self.outbox);
        self.player.update_facing(berserk);
        self.player.animate(dt);

        // Using the stored Berserk starts the freeze stage mid-frame; the
        // rest of the field holds still for it
        if self.freeze.is_active() {
            self.drain_outbox(now);
            return;
        }

        // Enemies
        let player_center = self.player.pos;
        let stunned = self.stun.is_active();
        for enemy in self.roster.iter_mut() {
            let obstacles: &[Rect] = if enemy.tags.contains(super::entity::Tag::Flying) {
                &[]
            } else {
                &self.enemy_obstacles
            };
            steering::update_enemy(enemy, player_center, obstacles, stunned, berserk, dt);
        }

        // Boss
        if let Some(boss) = self.boss.as_mut() {
            boss.update(now, dt, player_center, &mut self.rng, &mut self.outbox);
        }

        // Animated geometry keeps running even while enemies are stunned
        for tile in &mut self.tiles {
            if let Some(anim) = tile.anim.as_mut() {
                anim.advance_wrap(dt);
            }
        }

        // Combat resolution reads post-move positions
        self.update_bullets(now, dt);
        self.update_drops(now, dt);
        self.update_particles(now, dt);
        self.check_charger_sapper_contacts(now);
        self.check_player_enemy_contacts(now);
        self.check_pickups(now);

        self.check_completed();
        if self.player.hitbox.top >= FIELD_HEIGHT {
            self.wants_next_level = true;
        }

        self.update_shop(input, now);

        self.drain_outbox(now);
    }

    fn add_enemy(&mut self, request: SpawnRequest) {
        let id = self.next_entity_id();
        let enemy = match request.path {
            Some((path, deploy_tile)) => Enemy::new_sapper(id, request.pos, path, deploy_tile),
            None => Enemy::new(id, request.archetype, request.pos, request.initial_dir),
        };
        self.roster.add(enemy);
    }

    /// Apply a power-up, either freshly collected over a full slot or used
    /// from the slot.
    pub(crate) fn apply_powerup(&mut self, kind: PowerupKind, now: f32) {
        match kind {
            PowerupKind::Stim => self.player.stim.activate(now),
            PowerupKind::Minigun => {
                self.player.minigun.activate(now);
                self.outbox.play(Sfx::MachineGun);
            }
            PowerupKind::Scatter => self.player.scatter.activate(now),
            PowerupKind::Nova => self.player.nova.activate(now),
            PowerupKind::Overcharge => self.player.overcharge.activate(now),
            PowerupKind::ExtraLife => self.session.lives += 1,
            PowerupKind::Nuke => self.apply_nuke(),
            PowerupKind::Cloak => self.apply_cloak(now),
            PowerupKind::Berserk => self.apply_berserk(now),
        }
    }

    /// Enter the freeze stage: snapshot which timers are active right now,
    /// pause exactly those, and light the stage timer whose expiry activates
    /// berserk mode.
    fn apply_berserk(&mut self, now: f32) {
        self.freeze.activate(now);
        self.freeze_active_timers(now);
        if self.player.flicker.is_active() {
            self.player.flicker.deactivate();
        }
    }

    fn freeze_active_timers(&mut self, now: f32) {
        let mut keys = Vec::new();
        let mut pause = |timer: &mut Timer, key: TimerKey, keys: &mut Vec<TimerKey>| {
            if timer.is_active() {
                timer.pause(now);
                keys.push(key);
            }
        };

        pause(&mut self.stun, TimerKey::Stun, &mut keys);
        if self.has_countdown {
            pause(&mut self.delay, TimerKey::Delay, &mut keys);
            pause(&mut self.countdown, TimerKey::Countdown, &mut keys);
        }
        pause(&mut self.player.cooldown, TimerKey::PlayerCooldown, &mut keys);
        pause(&mut self.player.stim, TimerKey::Stim, &mut keys);
        pause(&mut self.player.overcharge, TimerKey::Overcharge, &mut keys);
        pause(&mut self.player.minigun, TimerKey::Minigun, &mut keys);
        pause(&mut self.player.scatter, TimerKey::Scatter, &mut keys);
        pause(&mut self.player.nova, TimerKey::Nova, &mut keys);
        if let Some(boss) = self.boss.as_mut() {
            pause(&mut boss.idle, TimerKey::BossIdle, &mut keys);
            pause(&mut boss.fire_cooldown, TimerKey::BossFire, &mut keys);
        }
        for drop in &mut self.drops {
            pause(&mut drop.grace, TimerKey::DropGrace(drop.id), &mut keys);
            pause(&mut drop.destruct, TimerKey::DropDestruct(drop.id), &mut keys);
        }
        for particle in &mut self.particles {
            if let Some(delay) = particle.delay.as_mut() {
                pause(delay, TimerKey::ParticleDelay(particle.id), &mut keys);
            }
            if let Some(linger) = particle.linger.as_mut() {
                pause(linger, TimerKey::ParticleLinger(particle.id), &mut keys);
            }
        }

        self.frozen_keys = keys;
    }

    fn thaw_frozen_timers(&mut self, now: f32) {
        for key in std::mem::take(&mut self.frozen_keys) {
            match key {
                TimerKey::Stun => self.stun.un_pause(now),
                TimerKey::Delay => self.delay.un_pause(now),
                TimerKey::Countdown => self.countdown.un_pause(now),
                TimerKey::PlayerCooldown => self.player.cooldown.un_pause(now),
                TimerKey::Stim => self.player.stim.un_pause(now),
                TimerKey::Overcharge => self.player.overcharge.un_pause(now),
                TimerKey::Minigun => self.player.minigun.un_pause(now),
                TimerKey::Scatter => self.player.scatter.un_pause(now),
                TimerKey::Nova => self.player.nova.un_pause(now),
                TimerKey::BossIdle => {
                    if let Some(boss) = self.boss.as_mut() {
                        boss.idle.un_pause(now);
                    }
                }
                TimerKey::BossFire => {
                    if let Some(boss) = self.boss.as_mut() {
                        boss.fire_cooldown.un_pause(now);
                    }
                }
                TimerKey::DropGrace(id) => {
                    if let Some(drop) = self.drops.iter_mut().find(|d| d.id == id) {
                        drop.grace.un_pause(now);
                    }
                }
                TimerKey::DropDestruct(id) => {
                    if let Some(drop) = self.drops.iter_mut().find(|d| d.id == id) {
                        drop.destruct.un_pause(now);
                    }
                }
                TimerKey::ParticleDelay(id) => {
                    if let Some(p) = self.particles.iter_mut().find(|p| p.id == id) {
                        if let Some(delay) = p.delay.as_mut() {
                            delay.un_pause(now);
                        }
                    }
                }
                TimerKey::ParticleLinger(id) => {
                    if let Some(p) = self.particles.iter_mut().find(|p| p.id == id) {
                        if let Some(linger) = p.linger.as_mut() {
                            linger.un_pause(now);
                        }
                    }
                }
            }
        }
    }

    fn update_drops(&mut self, now: f32, dt: f32) {
        let player_center = self.player.pos;
        let mut expired = Vec::new();
        for drop in &mut self.drops {
            if drop.grace.update(now) {
                drop.collectable = true;
            }
            if drop.destruct.update(now) {
                expired.push(drop.id);
                continue;
            }
            // Magnet slide toward a nearby player, faster the closer it is
            let to_player = player_center - drop.pos;
            let distance = to_player.length();
            if distance > 0.0 && distance < crate::consts::DROP_MAGNET_RADIUS {
                drop.pos += to_player.normalize() * (distance * 0.75) * dt;
            }
        }
        self.drops.retain(|d| !expired.contains(&d.id));
    }

    fn update_particles(&mut self, now: f32, dt: f32) {
        let mut finished = Vec::new();
        for particle in &mut self.particles {
            if let Some(delay) = particle.delay.as_mut() {
                let _ = delay.update(now);
                if delay.is_active() {
                    continue;
                }
            }
            match particle.linger.as_mut() {
                Some(linger) => {
                    if linger.update(now) {
                        finished.push(particle.id);
                        continue;
                    }
                    if !linger.is_active() {
                        // Animate up to the last frame, then hold and start
                        // the linger countdown
                        particle.anim.frame += particle.anim.fps * dt;
                        if particle.anim.index() == particle.anim.len - 1 {
                            linger.activate(now);
                        }
                    }
                }
                None => {
                    if particle.anim.advance_once(dt) {
                        finished.push(particle.id);
                    }
                }
            }
        }
        self.particles.retain(|p| !finished.contains(&p.id));
    }

    fn update_shop(&mut self, input: &TickInput, now: f32) {
        let Some(shop) = self.shop.as_mut() else {
            return;
        };
        let _ = shop.debounce.update(now);
        shop.active = (shop.keeper_pos - self.player.pos).length() < SHOP_ACTIVE_RADIUS;

        if shop.active && input.confirm && !shop.debounce.is_active() {
            let center = (self.player.hitbox.center_x(), self.player.hitbox.center_y());
            for (kind, pad) in shop.pads {
                if pad.contains_point(center.0, center.1) {
                    // Debounce whether or not the purchase goes through
                    shop.debounce.activate(now);
                    if self.session.purchase(kind) {
                        self.player.recompute_base_stats(&self.session);
                        log::info!("purchased {:?} tier {}", kind, self.session.upgrades.tier(kind));
                    }
                }
            }
        }
    }

    fn check_completed(&mut self) {
        if self.completed {
            return;
        }
        let field_clear = self.roster.is_empty() && self.boss.is_none();
        let done = match self.kind {
            LevelKind::Timed { .. } => self.is_level_timer_finished() && field_clear,
            LevelKind::Boss { .. } => field_clear,
            LevelKind::Shop => false,
        };
        if done {
            self.completed = true;
            self.open_exit();
            log::info!("level complete; exit open");
        }
    }

    /// Remove the exit strip so the player can leave through the bottom
    /// edge; boss levels bridge the centre water tile.
    fn open_exit(&mut self) {
        self.tiles.retain(|t| !t.exit_strip);
        if matches!(self.kind, LevelKind::Boss { .. }) {
            if let Some((tile, sprite)) = self.bridge {
                self.tiles.push(StaticTile {
                    tile,
                    sprite,
                    category: TileCategory::Decor,
                    exit_strip: false,
                    anim: None,
                });
            }
        }
        self.rebuild_obstacles();
    }

    pub(crate) fn rebuild_obstacles(&mut self) {
        self.player_obstacles.clear();
        self.enemy_obstacles.clear();
        self.blocking.clear();
        for tile in &self.tiles {
            let (x, y) = tile.tile.topleft_px();
            let rect = Rect::new(x, y, TILE_SIZE, TILE_SIZE);
            match tile.category {
                TileCategory::Barrier => self.player_obstacles.push(rect),
                TileCategory::Obstacle => {
                    self.player_obstacles.push(rect);
                    self.enemy_obstacles.push(rect);
                    self.blocking.push(rect);
                }
                TileCategory::Water | TileCategory::Animated => {
                    self.player_obstacles.push(rect);
                    self.enemy_obstacles.push(rect);
                }
                TileCategory::Decor => {}
            }
        }
        if let Some(shop) = &self.shop {
            self.player_obstacles.push(Rect::from_center(
                shop.keeper_pos.x.round() as i32,
                shop.keeper_pos.y.round() as i32,
                SPRITE_SIZE,
                SPRITE_SIZE,
            ));
        }
    }

    /// Apply the frame's queued cross-component effects.
    fn drain_outbox(&mut self, now: f32) {
        let mut outbox = std::mem::take(&mut self.outbox);
        for spawn in outbox.bullets.drain(..) {
            let id = self.next_entity_id();
            self.bullets.push(Bullet {
                id,
                pos: spawn.pos,
                dir: spawn.dir,
                damage: spawn.damage,
                from_player: spawn.from_player,
            });
        }
        for (pos, kind) in outbox.drops.drain(..) {
            let id = self.next_entity_id();
            self.drops.push(Drop::new(id, kind, pos, now));
        }
        for spawn in outbox.particles.drain(..) {
            let id = self.next_entity_id();
            self.particles.push(Particle::new(
                id,
                spawn.kind,
                spawn.pos,
                spawn.delay_ms,
                spawn.linger_ms,
                now,
            ));
        }
        for tile in outbox.released_tiles.drain(..) {
            self.deploy.release(tile);
        }
        self.cues.append(&mut outbox.sfx);
    }

    /// Rejection-sample a teleport destination overlapping nothing solid and
    /// no enemy. The field always has free space, so this terminates.
    pub(crate) fn random_teleport(&mut self) {
        loop {
            let x = self.rng.random_range(0..=FIELD_WIDTH - SPRITE_SIZE);
            let y = self.rng.random_range(0..=FIELD_HEIGHT - SPRITE_SIZE);
            let candidate = Rect::new(x, y, SPRITE_SIZE, SPRITE_SIZE);

            if self.player_obstacles.iter().any(|o| o.overlaps(&candidate)) {
                continue;
            }
            if self
                .roster
                .iter()
                .any(|e| e.sprite_rect().overlaps(&candidate))
            {
                continue;
            }
            if let Some(boss) = &self.boss {
                if boss.sprite_rect().overlaps(&candidate) {
                    continue;
                }
            }

            self.player.pos = Vec2::new(candidate.center_x() as f32, candidate.center_y() as f32);
            self.player.sync_hitbox();
            return;
        }
    }

    /// Assemble the read-only presentation snapshot: HUD numbers plus the
    /// depth-then-scanline ordered draw list.
    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock;
        let mut draw = Vec::new();

        let player_item = {
            let sprite = self.player.sprite_rect();
            DrawItem {
                sprite: Sprite::Player(self.player.facing),
                frame: self.player.anim.index(),
                x: sprite.left,
                y: sprite.top,
                depth: Depth::Main,
                blink: self.player.flicker.is_active(),
            }
        };

        if self.freeze.is_active() {
            // Transition effect: the field vanishes, only the player shows
            draw.push(player_item);
        } else {
            for tile in &self.tiles {
                let (x, y) = tile.tile.topleft_px();
                let depth = match tile.category {
                    TileCategory::Obstacle | TileCategory::Animated => Depth::Main,
                    _ => Depth::Bg,
                };
                draw.push(DrawItem {
                    sprite: Sprite::Tile(tile.sprite),
                    frame: tile.anim.as_ref().map(|a| a.index()).unwrap_or(0),
                    x,
                    y,
                    depth,
                    blink: false,
                });
            }

            for drop in &self.drops {
                let rect = drop.sprite_rect();
                draw.push(DrawItem {
                    sprite: Sprite::Drop(drop.kind),
                    frame: 0,
                    x: rect.left,
                    y: rect.top,
                    depth: Depth::Drops,
                    blink: drop.expiring(now),
                });
            }

            for enemy in self.roster.iter() {
                let rect = enemy.sprite_rect();
                let (sprite, depth) = match enemy.sapper.as_ref().map(|s| s.phase) {
                    Some(SapperPhase::Deploying) => (Sprite::SapperDeploying, Depth::Main),
                    Some(SapperPhase::Deployed) => (Sprite::SapperDeployed, Depth::DeployedSapper),
                    _ => {
                        let depth = if enemy.tags.contains(super::entity::Tag::Flying) {
                            Depth::Flying
                        } else {
                            Depth::Main
                        };
                        (Sprite::Enemy(enemy.archetype), depth)
                    }
                };
                draw.push(DrawItem {
                    sprite,
                    frame: enemy.anim.index(),
                    x: rect.left,
                    y: rect.top,
                    depth,
                    blink: false,
                });
            }

            if let Some(boss) = &self.boss {
                let rect = boss.sprite_rect();
                draw.push(DrawItem {
                    sprite: Sprite::Boss(boss.pose),
                    frame: boss.anim.index(),
                    x: rect.left,
                    y: rect.top,
                    depth: Depth::Main,
                    blink: false,
                });
            }

            draw.push(player_item.clone());

            if let Some(shop) = &self.shop {
                let rect = Rect::from_center(
                    shop.keeper_pos.x.round() as i32,
                    shop.keeper_pos.y.round() as i32,
                    SPRITE_SIZE,
                    SPRITE_SIZE,
                );
                draw.push(DrawItem {
                    sprite: Sprite::Shopkeeper(shop.facing(self.player.pos.x)),
                    frame: 0,
                    x: rect.left,
                    y: rect.top,
                    depth: Depth::Main,
                    blink: false,
                });
            }

            for bullet in &self.bullets {
                let rect = bullet.sprite_rect();
                draw.push(DrawItem {
                    sprite: Sprite::Bullet((bullet.damage - 1).clamp(0, 3) as u8),
                    frame: 0,
                    x: rect.left,
                    y: rect.top,
                    depth: Depth::Bullets,
                    blink: false,
                });
            }

            for particle in &self.particles {
                if !particle.visible() {
                    continue;
                }
                let rect = particle.sprite_rect();
                draw.push(DrawItem {
                    sprite: Sprite::Particle(particle.kind),
                    frame: particle.anim.index(),
                    x: rect.left,
                    y: rect.top,
                    depth: Depth::Particles,
                    blink: false,
                });
            }
        }

        // Depth layers back to front, scanline order inside a layer
        draw.sort_by_key(|item| (item.depth, item.y, item.x));

        Snapshot {
            coins: self.session.coins,
            lives: self.session.lives,
            stored_powerup: self.session.stored_powerup,
            upgrades: self.session.upgrades,
            boss_health: self.boss.as_ref().map(|b| b.health_fraction()),
            timer_remaining: self
                .has_countdown
                .then(|| self.countdown.percent_remaining(now)),
            completed: self.completed,
            stunned: self.stun.is_active(),
            frozen: self.freeze.is_active(),
            shop_active: self.shop.as_ref().is_some_and(|s| s.active),
            game_over: self.game_over,
            draw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnPlan;
    use crate::consts::SIM_DT;

    fn timed_config(duration_ms: f32, spawns: Vec<SpawnPlan>) -> LevelConfig {
        LevelConfig {
            background: "badlands_bg".to_string(),
            geometry: "level_00".to_string(),
            kind: LevelKind::Timed { duration_ms },
            spawns,
        }
    }

    fn open_geometry() -> Geometry {
        let mut geometry = Geometry {
            player_start: Vec2::new(128.0, 128.0),
            ..Geometry::default()
        };
        for x in 7..=9 {
            geometry.barriers.push((Tile::new(x, 15), 2));
        }
        geometry
    }

    fn session_with_lives(lives: i32) -> RunState {
        let mut session = RunState::new();
        session.lives = lives;
        session
    }

    fn timed_level(duration_ms: f32, spawns: Vec<SpawnPlan>) -> Level {
        Level::new(
            &timed_config(duration_ms, spawns),
            open_geometry(),
            session_with_lives(3),
            1234,
        )
    }

    fn grunt_spawns(period_ms: f32) -> Vec<SpawnPlan> {
        vec![SpawnPlan {
            archetype: Archetype::Grunt,
            period_ms,
            count_weights: Some([1.0, 0.0, 0.0]),
        }]
    }

    fn run_ms(level: &mut Level, ms: f32) {
        let ticks = (ms / 1000.0 / SIM_DT).round() as u32;
        for _ in 0..ticks {
            level.tick(&TickInput::default(), SIM_DT);
        }
    }

    #[test]
    fn test_pre_delay_gates_spawning() {
        let mut level = timed_level(30_000.0, grunt_spawns(1000.0));
        run_ms(&mut level, 2_500.0);
        assert!(level.roster.is_empty(), "nothing spawns during the delay");

        run_ms(&mut level, 2_000.0);
        assert!(!level.roster.is_empty(), "spawning starts with the countdown");
    }

    /// Tick while sweeping every spawned enemy off the field, like a player
    /// who never lets anything through.
    fn run_ms_with_mopup(level: &mut Level, ms: f32) {
        let ticks = (ms / 1000.0 / SIM_DT).round() as u32;
        for _ in 0..ticks {
            level.tick(&TickInput::default(), SIM_DT);
            let ids: Vec<u32> = level.roster.iter().map(|e| e.id).collect();
            for id in ids {
                level.kill_enemy(id);
            }
        }
    }

    #[test]
    fn test_countdown_end_stops_spawning() {
        let mut level = timed_level(5_000.0, grunt_spawns(1000.0));
        // Delay + countdown fully elapsed, with constant mop-up
        run_ms_with_mopup(&mut level, 9_000.0);
        assert!(level.is_level_timer_finished());

        run_ms(&mut level, 3_000.0);
        assert!(
            level.roster.is_empty(),
            "no spawns after the countdown finished"
        );
    }

    #[test]
    fn test_level_completes_once_field_is_clear() {
        let mut level = timed_level(30_000.0, grunt_spawns(1000.0));

        // Deep into the countdown with constant mop-up: not complete yet
        run_ms_with_mopup(&mut level, 30_000.0);
        assert!(!level.is_level_timer_finished());
        assert!(!level.is_completed());
        assert!(level.tiles.iter().any(|t| t.exit_strip));

        // Ride out the remaining countdown; completion fires on the first
        // clear frame after it elapses
        run_ms_with_mopup(&mut level, 3_500.0);
        assert!(level.is_level_timer_finished());
        assert!(level.is_completed());
        let tiles_after_completion = level.tiles.len();
        assert!(
            level.tiles.iter().all(|t| !t.exit_strip),
            "exit strip removed"
        );

        // The predicate must not re-fire on later frames
        run_ms(&mut level, 1_000.0);
        assert!(level.is_completed());
        assert_eq!(level.tiles.len(), tiles_after_completion);
    }

    #[test]
    fn test_exit_trigger_requests_next_level() {
        let mut level = timed_level(30_000.0, vec![]);
        level.player.pos = Vec2::new(128.0, (FIELD_HEIGHT + 20) as f32);
        level.player.sync_hitbox();
        level.tick(&TickInput::default(), SIM_DT);
        assert!(level.wants_next_level);
    }

    #[test]
    fn test_contact_death_resets_everything() {
        let mut level = timed_level(30_000.0, vec![]);
        run_ms(&mut level, 4_000.0); // countdown running
        let now = level.now();

        // Active buff that must be cleared
        level.player.stim.activate(now);

        // A deployed sapper holding a reserved tile
        let tile = Tile::new(3, 3);
        level.deploy.remove(tile);
        let id = level.next_entity_id();
        let mut sapper = Enemy::new_sapper(id, tile.center_px(), vec![tile], tile);
        sapper.sapper.as_mut().unwrap().phase = SapperPhase::Deployed;
        level.roster.add(sapper);

        // An enemy standing on the player
        let id = level.next_entity_id();
        level
            .roster
            .add(Enemy::new(id, Archetype::Grunt, level.player.pos, Vec2::ZERO));

        let lives_before = level.session.lives;
        let countdown_before = level.countdown.percent_remaining(now);
        level.tick(&TickInput::default(), SIM_DT);

        assert_eq!(level.session.lives, lives_before - 1);
        assert_eq!(level.player.pos, level.start_pos);
        assert!(!level.player.stim.is_active(), "buffs cleared");
        assert!(level.player.flicker.is_active(), "hit flash lit");
        assert!(level.roster.is_empty(), "field swept");
        assert!(level.deploy.contains(tile), "deploy tile returned");
        assert!(
            level.countdown.percent_remaining(level.now()) > countdown_before,
            "countdown extended"
        );
    }

    #[test]
    fn test_out_of_lives_requests_restart() {
        let mut level = Level::new(
            &timed_config(30_000.0, vec![]),
            open_geometry(),
            session_with_lives(0),
            1,
        );
        let id = level.next_entity_id();
        level
            .roster
            .add(Enemy::new(id, Archetype::Grunt, level.player.pos, Vec2::ZERO));
        level.tick(&TickInput::default(), SIM_DT);
        assert_eq!(level.session.lives, -1);
        assert!(level.wants_restart);
        assert!(level.game_over);
        assert!(level.take_sfx().contains(&Sfx::Dead));
    }

    #[test]
    fn test_double_collect_applies_new_and_keeps_slot() {
        let mut level = timed_level(30_000.0, vec![]);
        level.session.stored_powerup = Some(PowerupKind::Stim);

        let id = level.next_entity_id();
        let mut drop = Drop::new(
            id,
            DropKind::Powerup(PowerupKind::Scatter),
            level.player.pos,
            level.now(),
        );
        drop.collectable = true;
        level.drops.push(drop);

        level.tick(&TickInput::default(), SIM_DT);

        assert!(level.player.scatter.is_active(), "new power-up fired");
        assert_eq!(
            level.session.stored_powerup,
            Some(PowerupKind::Stim),
            "stored slot untouched"
        );
        assert!(level.drops.is_empty());
    }

    #[test]
    fn test_collect_into_empty_slot_stores() {
        let mut level = timed_level(30_000.0, vec![]);
        let id = level.next_entity_id();
        let mut drop = Drop::new(
            id,
            DropKind::Powerup(PowerupKind::Nova),
            level.player.pos,
            level.now(),
        );
        drop.collectable = true;
        level.drops.push(drop);

        level.tick(&TickInput::default(), SIM_DT);
        assert_eq!(level.session.stored_powerup, Some(PowerupKind::Nova));
        assert!(!level.player.nova.is_active(), "stored, not applied");
    }

    #[test]
    fn test_grace_window_blocks_pickup() {
        let mut level = timed_level(30_000.0, vec![]);
        let id = level.next_entity_id();
        let drop = Drop::new(id, DropKind::Coin(5), level.player.pos, level.now());
        level.drops.push(drop);

        run_ms(&mut level, 500.0);
        assert_eq!(level.session.coins, 0, "grace window holds");
        assert_eq!(level.drops.len(), 1);

        run_ms(&mut level, 700.0);
        assert_eq!(level.session.coins, 5);
        assert!(level.drops.is_empty());
    }

    #[test]
    fn test_freeze_pauses_exactly_the_active_timers() {
        let mut level = timed_level(30_000.0, vec![]);
        run_ms(&mut level, 4_000.0);
        let now = level.now();

        level.player.stim.activate(now);
        assert!(!level.player.minigun.is_active());
        let stim_before = level.player.stim.percent_remaining(now);

        level.apply_powerup(PowerupKind::Berserk, now);
        assert!(level.freeze.is_active());
        assert!(level.player.stim.is_paused());
        assert!(!level.player.minigun.is_paused(), "inactive timers untouched");
        assert!(level.countdown.is_paused());

        // Ride out the freeze stage
        run_ms(&mut level, 1_100.0);
        assert!(!level.freeze.is_active());
        assert!(level.berserk.is_active(), "berserk follows the freeze stage");
        assert!(!level.player.stim.is_paused());
        assert!(!level.player.minigun.is_active(), "stayed inactive");

        // Remaining time survived the pause (minus the post-thaw tick time)
        let stim_after = level.player.stim.percent_remaining(level.now());
        assert!((stim_before - stim_after) < 0.05);
    }

    #[test]
    fn test_frozen_field_holds_still() {
        let mut level = timed_level(30_000.0, grunt_spawns(500.0));
        run_ms(&mut level, 5_000.0);
        assert!(!level.roster.is_empty());

        let now = level.now();
        level.apply_powerup(PowerupKind::Berserk, now);
        let positions: Vec<Vec2> = level.roster.iter().map(|e| e.pos).collect();
        let enemy_count = level.roster.len();

        run_ms(&mut level, 500.0); // inside the freeze stage
        let after: Vec<Vec2> = level.roster.iter().map(|e| e.pos).collect();
        assert_eq!(positions, after, "enemies hold still during the freeze");
        assert_eq!(level.roster.len(), enemy_count, "no spawns during the freeze");
    }

    #[test]
    fn test_berserk_contact_kills_enemy_not_player() {
        let mut level = timed_level(30_000.0, vec![]);
        run_ms(&mut level, 4_000.0);
        let now = level.now();
        level.berserk.activate(now);

        let id = level.next_entity_id();
        level
            .roster
            .add(Enemy::new(id, Archetype::Grunt, level.player.pos, Vec2::ZERO));
        let lives_before = level.session.lives;

        level.tick(&TickInput::default(), SIM_DT);
        assert!(level.roster.is_empty(), "contact killed the enemy");
        assert_eq!(level.session.lives, lives_before);
        assert!(
            level.particles.iter().any(|p| matches!(
                p.kind,
                ParticleKind::Ashes(Archetype::Grunt)
            )),
            "death cue emitted"
        );
    }

    #[test]
    fn test_boss_level_completes_on_boss_death() {
        let config = LevelConfig {
            background: "badlands_bg".to_string(),
            geometry: "level_05".to_string(),
            kind: LevelKind::Boss {
                health: 5,
                fire_cooldown_ms: 300.0,
                strategy: super::super::boss::FiringStrategy::Upwards,
            },
            spawns: vec![],
        };
        let mut geometry = open_geometry();
        geometry.boss_start = Some(Vec2::new(128.0, 40.0));
        geometry.water.push((Tile::new(8, 8), 4));
        geometry.bridge = Some((Tile::new(8, 8), 9));
        let mut level = Level::new(&config, geometry, session_with_lives(3), 7);

        assert!(!level.is_completed());
        if let Some(boss) = level.boss.as_mut() {
            assert!(boss.damage(5));
        }
        level.kill_boss();
        level.tick(&TickInput::default(), SIM_DT);

        assert!(level.is_completed());
        assert!(level.boss.is_none());
        assert!(
            level.drops.iter().any(|d| matches!(
                d.kind,
                DropKind::Powerup(PowerupKind::ExtraLife)
            )),
            "boss always drops an extra life"
        );
        assert!(
            level
                .tiles
                .iter()
                .any(|t| t.tile == Tile::new(8, 8) && t.category == TileCategory::Decor),
            "bridge placed over the centre water tile"
        );
    }

    #[test]
    fn test_shop_purchase_flow() {
        let config = LevelConfig {
            background: "badlands_bg".to_string(),
            geometry: "level_04".to_string(),
            kind: LevelKind::Shop,
            spawns: vec![],
        };
        let mut geometry = open_geometry();
        geometry.shopkeeper = Some(Vec2::new(128.0, 100.0));
        let mut session = session_with_lives(3);
        session.coins = 50;
        let mut level = Level::new(&config, geometry, session, 7);
        assert!(level.is_completed(), "shop levels start complete");

        // Stand on the gun pad and confirm
        let pad_center = level.shop.as_ref().unwrap().pads[1].1;
        level.player.pos = Vec2::new(pad_center.center_x() as f32, pad_center.center_y() as f32);
        level.player.sync_hitbox();
        let input = TickInput {
            confirm: true,
            ..Default::default()
        };
        level.tick(&input, SIM_DT);
        assert_eq!(level.session.upgrades.gun, 0);
        assert_eq!(level.session.coins, 40);
        assert!(level.player.base_cooldown_ms < crate::sim::player::DEFAULT_COOLDOWN_MS);

        // Debounce swallows an immediate second confirm
        level.tick(&input, SIM_DT);
        assert_eq!(level.session.upgrades.gun, 0);
        assert_eq!(level.session.coins, 40);
    }

    #[test]
    fn test_determinism() {
        let run = |seed: u64| {
            let mut level = timed_level(30_000.0, grunt_spawns(700.0));
            level.rng = Pcg32::seed_from_u64(seed);
            for tick_index in 0..600 {
                let input = TickInput {
                    move_x: if tick_index % 120 < 60 { 1 } else { -1 },
                    fire_up: true,
                    ..Default::default()
                };
                level.tick(&input, SIM_DT);
            }
            let positions: Vec<(u32, i32, i32)> = level
                .roster
                .iter()
                .map(|e| (e.id, e.hitbox.left, e.hitbox.top))
                .collect();
            (level.roster.len(), level.bullets.len(), positions)
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn test_snapshot_draw_list_is_depth_sorted() {
        let mut level = timed_level(30_000.0, grunt_spawns(600.0));
        run_ms(&mut level, 6_000.0);
        let snapshot = level.snapshot();
        assert!(!snapshot.draw.is_empty());
        for pair in snapshot.draw.windows(2) {
            assert!(pair[0].depth <= pair[1].depth);
            if pair[0].depth == pair[1].depth {
                assert!(pair[0].y <= pair[1].y);
            }
        }
        assert!(snapshot.timer_remaining.is_some());
        assert!(serde_json::to_string(&snapshot).is_ok());
    }

    #[test]
    fn test_snapshot_during_freeze_shows_only_player() {
        let mut level = timed_level(30_000.0, grunt_spawns(600.0));
        run_ms(&mut level, 6_000.0);
        level.apply_powerup(PowerupKind::Berserk, level.now());
        let snapshot = level.snapshot();
        assert!(snapshot.frozen);
        assert_eq!(snapshot.draw.len(), 1);
        assert!(matches!(snapshot.draw[0].sprite, Sprite::Player(_)));
    }

    #[test]
    fn test_stun_gate_lets_spawn_timers_rearm() {
        let mut level = timed_level(30_000.0, grunt_spawns(1000.0));
        run_ms(&mut level, 4_000.0);
        level.stun.activate(level.now());
        // Stun suppresses movement, not spawning
        let before = level.roster.len();
        run_ms(&mut level, 2_000.0);
        assert!(level.roster.len() > before, "stun does not gate spawning");
    }
}
