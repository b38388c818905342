//! Player state: movement, firing, and the buff timer set
//!
//! Speeds and cooldowns always derive from the fixed defaults: shop upgrades
//! raise the *base* stats, power-up buffs are computed from the default, so
//! buffs do not stack on top of purchases. Effective speed is the max of all
//! active sources, effective fire cooldown the min.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{Animation, anim};
use super::level::{Outbox, Sfx, TickInput};
use super::rect::Rect;
use super::steering::move_and_collide;
use super::timer::Timer;
use crate::consts::SPRITE_SIZE;
use crate::rotate_vec;
use crate::session::RunState;

pub const DEFAULT_SPEED: f32 = 50.0;
pub const DEFAULT_COOLDOWN_MS: f32 = 300.0;

const STIM_SPEED: f32 = DEFAULT_SPEED * 1.5;
const OVERCHARGE_SPEED: f32 = DEFAULT_SPEED * 1.4;
const BERSERK_SPEED: f32 = DEFAULT_SPEED * 2.0;

const OVERCHARGE_COOLDOWN_MS: f32 = DEFAULT_COOLDOWN_MS * 0.33;
const MINIGUN_COOLDOWN_MS: f32 = DEFAULT_COOLDOWN_MS * 0.25;

pub const STIM_MS: f32 = 10_000.0;
pub const OVERCHARGE_MS: f32 = 20_000.0;
pub const MINIGUN_MS: f32 = 8_000.0;
pub const SCATTER_MS: f32 = 10_000.0;
pub const NOVA_MS: f32 = 7_000.0;
const FLICKER_MS: f32 = 1_500.0;
const FOOTSTEP_MS: f32 = 250.0;

/// Side bullets from Scatter/Overcharge fan out this far
const SPREAD_DEGREES: f32 = 10.0;

/// Which way the player sprite faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Idle,
    Up,
    Down,
    Left,
    Right,
    Berserk,
}

#[derive(Debug)]
pub struct Player {
    pub pos: Vec2,
    pub hitbox: Rect,
    pub dir: Vec2,
    pub facing: Facing,
    /// Direction held while the fire cooldown runs, for the shooting pose
    fire_facing: Facing,

    /// Raised by shop upgrades; buffs compute from the defaults instead
    pub base_speed: f32,
    pub base_cooldown_ms: f32,
    pub bullet_damage: i32,

    pub cooldown: Timer,
    pub footstep: Timer,
    /// Cosmetic post-hit flash
    pub flicker: Timer,
    pub stim: Timer,
    pub overcharge: Timer,
    pub minigun: Timer,
    pub scatter: Timer,
    pub nova: Timer,

    pub anim: Animation,
}

impl Player {
    pub fn new(pos: Vec2, session: &RunState) -> Self {
        let mut player = Self {
            pos,
            hitbox: Rect::from_center(pos.x.round() as i32, pos.y.round() as i32, 12, 12),
            dir: Vec2::ZERO,
            facing: Facing::Idle,
            fire_facing: Facing::Up,
            base_speed: DEFAULT_SPEED,
            base_cooldown_ms: DEFAULT_COOLDOWN_MS,
            bullet_damage: 1,
            cooldown: Timer::new(DEFAULT_COOLDOWN_MS),
            footstep: Timer::new(FOOTSTEP_MS),
            flicker: Timer::new(FLICKER_MS),
            stim: Timer::new(STIM_MS),
            overcharge: Timer::new(OVERCHARGE_MS),
            minigun: Timer::new(MINIGUN_MS),
            scatter: Timer::new(SCATTER_MS),
            nova: Timer::new(NOVA_MS),
            anim: Animation::new(anim::PLAYER_FPS, anim::PLAYER_FRAMES),
        };
        player.recompute_base_stats(session);
        player
    }

    /// Re-derive base stats from the purchased upgrade tiers. Called on
    /// construction and again after every shop purchase.
    pub fn recompute_base_stats(&mut self, session: &RunState) {
        self.base_speed = match session.upgrades.boots {
            -1 => DEFAULT_SPEED,
            0 => DEFAULT_SPEED * 1.2,
            _ => DEFAULT_SPEED * 1.35,
        };
        self.base_cooldown_ms = match session.upgrades.gun {
            -1 => DEFAULT_COOLDOWN_MS,
            0 => DEFAULT_COOLDOWN_MS * 0.8,
            1 => DEFAULT_COOLDOWN_MS * 0.6,
            _ => DEFAULT_COOLDOWN_MS * 0.4,
        };
        self.bullet_damage = match session.upgrades.ammo {
            -1 => 1,
            0 => 2,
            1 => 3,
            _ => 4,
        };
    }

    /// Max of all active speed sources.
    pub fn effective_speed(&self, berserk: bool) -> f32 {
        let mut speed = self.base_speed;
        if berserk {
            speed = speed.max(BERSERK_SPEED);
        }
        if self.stim.is_active() {
            speed = speed.max(STIM_SPEED);
        }
        if self.overcharge.is_active() {
            speed = speed.max(OVERCHARGE_SPEED);
        }
        speed
    }

    /// Min of all active fire cooldown sources, including the permanent base.
    pub fn effective_cooldown_ms(&self) -> f32 {
        let mut cooldown = self.base_cooldown_ms;
        if self.overcharge.is_active() {
            cooldown = cooldown.min(OVERCHARGE_COOLDOWN_MS);
        }
        if self.minigun.is_active() {
            cooldown = cooldown.min(MINIGUN_COOLDOWN_MS);
        }
        cooldown
    }

    /// Advance the buff timers, then the cooldown - its duration depends on
    /// which buffs are still active, so the order matters.
    pub fn update_timers(&mut self, now: f32) {
        let _ = self.flicker.update(now);
        let _ = self.stim.update(now);
        let _ = self.overcharge.update(now);
        let _ = self.minigun.update(now);
        let _ = self.scatter.update(now);
        let _ = self.nova.update(now);
        let _ = self.footstep.update(now);

        self.cooldown.set_duration(self.effective_cooldown_ms());
        let _ = self.cooldown.update(now);
    }

    /// Fire bullets for this frame's input, if any and off cooldown.
    /// Berserk mode cannot shoot.
    pub fn handle_fire(&mut self, input: &TickInput, now: f32, berserk: bool, outbox: &mut Outbox) {
        if berserk || self.cooldown.is_active() {
            return;
        }
        if !(input.fire_up || input.fire_down || input.fire_left || input.fire_right) {
            return;
        }

        self.fire_facing = if input.fire_right {
            Facing::Right
        } else if input.fire_left {
            Facing::Left
        } else if input.fire_down {
            Facing::Down
        } else {
            Facing::Up
        };

        self.cooldown.activate(now);
        outbox.play(Sfx::Gunshot);

        let half_w = (self.hitbox.w / 2) as f32;
        let half_h = (self.hitbox.h / 2) as f32;
        let center = Vec2::new(self.hitbox.center_x() as f32, self.hitbox.center_y() as f32);

        // Eight-way Nova fire, or one aimed shot
        let mut shots: Vec<(Vec2, Vec2)> = Vec::new();
        if self.nova.is_active() {
            for (dx, dy) in [
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 1.0),
                (-1.0, 1.0),
                (-1.0, 0.0),
                (-1.0, -1.0),
                (0.0, -1.0),
                (1.0, -1.0),
            ] {
                let dir = Vec2::new(dx, dy).normalize();
                let pos = center + Vec2::new(dx * half_w, dy * half_h);
                shots.push((dir, pos));
            }
        } else {
            let mut dir = Vec2::ZERO;
            let mut pos = center;
            if input.fire_right {
                dir.x = 1.0;
                pos.x += half_w;
            } else if input.fire_left {
                dir.x = -1.0;
                pos.x -= half_w;
            }
            if input.fire_down {
                dir.y = 1.0;
                pos.y += half_h;
            } else if input.fire_up {
                dir.y = -1.0;
                pos.y -= half_h;
            }
            shots.push((dir.normalize(), pos));
        }

        let spread = self.scatter.is_active() || self.overcharge.is_active();
        for (dir, pos) in shots {
            outbox.spawn_bullet(pos, dir, self.bullet_damage, true);
            if spread {
                outbox.spawn_bullet(pos, rotate_vec(dir, SPREAD_DEGREES), self.bullet_damage, true);
                outbox.spawn_bullet(
                    pos,
                    rotate_vec(dir, -SPREAD_DEGREES),
                    self.bullet_damage,
                    true,
                );
            }
        }
    }

    /// Move for this frame's input with axis-separated collision.
    pub fn step_move(
        &mut self,
        input: &TickInput,
        now: f32,
        dt: f32,
        obstacles: &[Rect],
        berserk: bool,
        outbox: &mut Outbox,
    ) {
        self.dir = Vec2::new(input.move_x as f32, input.move_y as f32).normalize_or_zero();
        if self.dir != Vec2::ZERO && !self.footstep.is_active() {
            self.footstep.activate(now);
            outbox.play(Sfx::Footstep);
        }

        let speed = self.effective_speed(berserk);
        move_and_collide(
            &mut self.pos,
            &mut self.hitbox,
            self.dir,
            speed,
            dt,
            obstacles,
        );
    }

    /// Pose for the draw handoff: berserk beats shooting beats walking.
    pub fn update_facing(&mut self, berserk: bool) {
        self.facing = if berserk {
            Facing::Berserk
        } else if self.cooldown.is_active() {
            self.fire_facing
        } else if self.dir == Vec2::ZERO {
            Facing::Idle
        } else if self.dir.x > 0.0 {
            Facing::Right
        } else if self.dir.x < 0.0 {
            Facing::Left
        } else if self.dir.y < 0.0 {
            Facing::Up
        } else {
            Facing::Down
        };
    }

    pub fn animate(&mut self, dt: f32) {
        if self.dir != Vec2::ZERO || self.facing == Facing::Berserk {
            self.anim.advance_wrap(dt);
        }
    }

    /// Back to the level start after getting hit: flash for a bit, lose
    /// every timed buff.
    pub fn reset(&mut self, start: Vec2, now: f32) {
        self.pos = start;
        self.sync_hitbox();
        self.flicker.activate(now);
        self.clear_buffs();
    }

    /// Deactivate all timed buffs (death, or sweeping up on level exit).
    pub fn clear_buffs(&mut self) {
        for timer in [
            &mut self.stim,
            &mut self.overcharge,
            &mut self.minigun,
            &mut self.scatter,
            &mut self.nova,
        ] {
            if timer.is_active() {
                timer.deactivate();
            }
        }
    }

    #[inline]
    pub fn sync_hitbox(&mut self) {
        self.hitbox
            .set_center(self.pos.x.round() as i32, self.pos.y.round() as i32);
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

    fn player() -> Player {
        Player::new(Vec2::new(128.0, 128.0), &RunState::new())
    }

    fn fire_up_input() -> TickInput {
        TickInput {
            fire_up: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_effective_speed_takes_max() {
        let mut p = player();
        assert_eq!(p.effective_speed(false), DEFAULT_SPEED);
        p.stim.activate(0.0);
        assert_eq!(p.effective_speed(false), STIM_SPEED);
        // Berserk outruns stim
        assert_eq!(p.effective_speed(true), BERSERK_SPEED);
    }

    #[test]
    fn test_effective_cooldown_takes_min() {
        let mut p = player();
        assert_eq!(p.effective_cooldown_ms(), DEFAULT_COOLDOWN_MS);
        p.overcharge.activate(0.0);
        assert_eq!(p.effective_cooldown_ms(), OVERCHARGE_COOLDOWN_MS);
        p.minigun.activate(0.0);
        // Minigun is the fastest of all sources
        assert_eq!(p.effective_cooldown_ms(), MINIGUN_COOLDOWN_MS);
    }

    #[test]
    fn test_upgrades_raise_base_stats() {
        let mut session = RunState::new();
        session.upgrades.boots = 1;
        session.upgrades.gun = 2;
        session.upgrades.ammo = 2;
        let p = Player::new(Vec2::ZERO, &session);
        assert!((p.base_speed - DEFAULT_SPEED * 1.35).abs() < 1e-5);
        assert!((p.base_cooldown_ms - DEFAULT_COOLDOWN_MS * 0.4).abs() < 1e-5);
        assert_eq!(p.bullet_damage, 4);
        // Best upgrade still loses to the best buff
        assert!(p.base_cooldown_ms > MINIGUN_COOLDOWN_MS);
    }

    #[test]
    fn test_fire_single_shot_starts_cooldown() {
        let mut p = player();
        let mut outbox = Outbox::default();
        p.handle_fire(&fire_up_input(), 0.0, false, &mut outbox);
        assert_eq!(outbox.bullets.len(), 1);
        assert!(p.cooldown.is_active());
        assert!((outbox.bullets[0].dir - Vec2::new(0.0, -1.0)).length() < 1e-5);

        // On cooldown: no second volley
        p.handle_fire(&fire_up_input(), 10.0, false, &mut outbox);
        assert_eq!(outbox.bullets.len(), 1);
    }

    #[test]
    fn test_fire_diagonal_combines_axes() {
        let mut p = player();
        let mut outbox = Outbox::default();
        let input = TickInput {
            fire_up: true,
            fire_right: true,
            ..Default::default()
        };
        p.handle_fire(&input, 0.0, false, &mut outbox);
        let dir = outbox.bullets[0].dir;
        assert!(dir.x > 0.0 && dir.y < 0.0);
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_nova_fires_eight() {
        let mut p = player();
        p.nova.activate(0.0);
        let mut outbox = Outbox::default();
        p.handle_fire(&fire_up_input(), 0.0, false, &mut outbox);
        assert_eq!(outbox.bullets.len(), 8);
    }

    #[test]
    fn test_scatter_adds_two_spread_shots() {
        let mut p = player();
        p.scatter.activate(0.0);
        let mut outbox = Outbox::default();
        p.handle_fire(&fire_up_input(), 0.0, false, &mut outbox);
        assert_eq!(outbox.bullets.len(), 3);
    }

    #[test]
    fn test_nova_with_scatter_fires_twenty_four() {
        let mut p = player();
        p.nova.activate(0.0);
        p.overcharge.activate(0.0);
        let mut outbox = Outbox::default();
        p.handle_fire(&fire_up_input(), 0.0, false, &mut outbox);
        assert_eq!(outbox.bullets.len(), 24);
    }

    #[test]
    fn test_berserk_cannot_fire() {
        let mut p = player();
        let mut outbox = Outbox::default();
        p.handle_fire(&fire_up_input(), 0.0, true, &mut outbox);
        assert!(outbox.bullets.is_empty());
        assert!(!p.cooldown.is_active());
    }

    #[test]
    fn test_reset_clears_buffs_and_flashes() {
        let mut p = player();
        p.stim.activate(0.0);
        p.nova.activate(0.0);
        p.reset(Vec2::new(10.0, 10.0), 100.0);
        assert!(!p.stim.is_active());
        assert!(!p.nova.is_active());
        assert!(p.flicker.is_active());
        assert_eq!(p.pos, Vec2::new(10.0, 10.0));
        assert_eq!(p.hitbox.center_x(), 10);
    }

    #[test]
    fn test_facing_priority() {
        let mut p = player();
        p.dir = Vec2::new(1.0, 0.0);
        p.update_facing(false);
        assert_eq!(p.facing, Facing::Right);

        p.cooldown.activate(0.0);
        p.fire_facing = Facing::Up;
        p.update_facing(false);
        assert_eq!(p.facing, Facing::Up);

        p.update_facing(true);
        assert_eq!(p.facing, Facing::Berserk);
    }
}
