//! The strafing boss
//!
//! Idles for a random few seconds, then strafes horizontally across the top
//! of the field, firing while it moves - straight up or at the player,
//! depending on the level's firing strategy. Passing back through its start
//! position going right has a small chance per frame to drop it back to
//! idle. Dies like an enemy, but always leaves exactly one extra life.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Animation, anim};
use super::level::{Outbox, Sfx};
use super::rect::Rect;
use super::timer::Timer;
use crate::consts::{FIELD_WIDTH, SPRITE_SIZE, TILE_SIZE};

const BOSS_SPEED: f32 = 30.0;
/// Strafing reverses this far from either side
const BOUNCE_MARGIN: i32 = 2 * TILE_SIZE;
/// Passing within this distance of the start position counts as "through
/// the center" for the stop-firing roll
const CENTER_EPSILON: f32 = 5.0;

/// How boss bullets aim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiringStrategy {
    Upwards,
    TowardsPlayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossPose {
    Idle,
    Moving,
}

#[derive(Debug)]
pub struct Boss {
    pub pos: Vec2,
    pub hitbox: Rect,
    start_pos: Vec2,
    pub dir: Vec2,
    pub health: i32,
    pub full_health: i32,
    pub pose: BossPose,
    strategy: FiringStrategy,
    pub idle: Timer,
    pub fire_cooldown: Timer,
    pub anim: Animation,
}

impl Boss {
    pub fn new(
        pos: Vec2,
        health: i32,
        fire_cooldown_ms: f32,
        strategy: FiringStrategy,
        now: f32,
        rng: &mut Pcg32,
    ) -> Self {
        Self {
            pos,
            hitbox: Rect::from_center(pos.x.round() as i32, pos.y.round() as i32, 12, 12),
            start_pos: pos,
            dir: Vec2::ZERO,
            health,
            full_health: health,
            pose: BossPose::Idle,
            strategy,
            idle: Timer::started(rng.random_range(3000..=5000) as f32, now),
            fire_cooldown: Timer::new(fire_cooldown_ms),
            anim: Animation::new(anim::BOSS_FPS, anim::BOSS_FRAMES),
        }
    }

    pub fn health_fraction(&self) -> f32 {
        self.health as f32 / self.full_health as f32
    }

    /// Apply damage; `true` when this kills the boss.
    #[must_use]
    pub fn damage(&mut self, amount: i32) -> bool {
        assert!(self.health > 0, "damage applied to a dead boss");
        self.health -= amount;
        self.health <= 0
    }

    pub fn update(&mut self, now: f32, dt: f32, player_center: Vec2, rng: &mut Pcg32, outbox: &mut Outbox) {
        if self.idle.update(now) {
            self.pose = BossPose::Moving;
            self.dir = Vec2::new(-1.0, 0.0);
        }
        let _ = self.fire_cooldown.update(now);

        self.step_move(now, dt, rng);
        self.fire(now, player_center, outbox);
        self.anim.advance_wrap(dt);
    }

    fn step_move(&mut self, now: f32, dt: f32, rng: &mut Pcg32) {
        self.pos += self.dir * BOSS_SPEED * dt;
        self.hitbox
            .set_center(self.pos.x.round() as i32, self.pos.y.round() as i32);

        let sprite = self.sprite_rect();
        if sprite.left <= BOUNCE_MARGIN {
            self.dir = Vec2::new(1.0, 0.0);
        } else if sprite.right() >= FIELD_WIDTH - BOUNCE_MARGIN {
            self.dir = Vec2::new(-1.0, 0.0);
        } else if self.dir.x == 1.0 && (self.pos - self.start_pos).length() < CENTER_EPSILON {
            // Passing through the center; this runs on several consecutive
            // frames, so the per-frame stop chance stays small
            if rng.random_range(0..21) == 0 {
                self.end_firing(now, rng);
            }
        }
    }

    fn end_firing(&mut self, now: f32, rng: &mut Pcg32) {
        self.pose = BossPose::Idle;
        self.idle
            .set_duration(rng.random_range(3000..=5000) as f32);
        self.idle.activate(now);
        self.dir = Vec2::ZERO;
    }

    fn fire(&mut self, now: f32, player_center: Vec2, outbox: &mut Outbox) {
        if self.pose != BossPose::Moving || self.fire_cooldown.is_active() {
            return;
        }
        let dir = match self.strategy {
            FiringStrategy::Upwards => Vec2::new(0.0, -1.0),
            FiringStrategy::TowardsPlayer => {
                let to_player = player_center - self.pos;
                let unit = to_player.normalize_or_zero();
                if unit == Vec2::ZERO {
                    Vec2::new(0.0, -1.0)
                } else {
                    unit
                }
            }
        };
        let muzzle = Vec2::new(self.hitbox.center_x() as f32, self.hitbox.top as f32);
        // Any hit is lethal to the player; the damage value is nominal
        outbox.spawn_bullet(muzzle, dir, 1, false);
        outbox.play(Sfx::Gunshot);
        self.fire_cooldown.activate(now);
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
