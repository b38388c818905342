//! Combat resolution: bullets, contact damage, death side effects, pickups
//!
//! Runs after movement settles, so every overlap check sees post-move
//! positions. Deaths are exactly-once: damage marks, the sweep immediately
//! after removes the entity from the roster and performs the side effects
//! (death particle cue, drop roll, deploy-tile return), so nothing can touch
//! a dead entity afterwards.

use glam::Vec2;
use rand::Rng;

use super::archetype::{DropKind, PowerupKind};
use super::entity::{Enemy, ParticleKind, Tag};
use super::level::{Level, Sfx};
use crate::consts::{BULLET_SPEED, FIELD_HEIGHT, FIELD_WIDTH};

/// Dying hands back this fraction of the countdown's duration.
const DEATH_COUNTDOWN_EXTENSION: f32 = 0.25;

impl Level {
    /// Advance all bullets and resolve their collisions. Order per bullet:
    /// blocking geometry kills it silently, then the first overlapping
    /// target takes the damage (never more than one), then field bounds.
    pub(crate) fn update_bullets(&mut self, now: f32, dt: f32) {
        let bullets = std::mem::take(&mut self.bullets);
        let mut survivors = Vec::with_capacity(bullets.len());
        let mut boss_killed = false;
        let mut player_hit = false;

        'bullets: for mut bullet in bullets {
            bullet.pos += bullet.dir * BULLET_SPEED * dt;
            let rect = bullet.sprite_rect();

            if self.blocking.iter().any(|o| o.overlaps(&rect)) {
                continue;
            }

            if bullet.from_player {
                for enemy in self.roster.iter_mut() {
                    // Skip the already-dead: they are on their way out of
                    // the roster and must not absorb a second bullet
                    if enemy.health > 0 && enemy.hitbox.overlaps(&rect) {
                        let _ = enemy.damage(bullet.damage);
                        self.outbox.play(Sfx::MonsterHit);
                        continue 'bullets;
                    }
                }
                if let Some(boss) = self.boss.as_mut() {
                    if boss.health > 0 && boss.hitbox.overlaps(&rect) {
                        if boss.damage(bullet.damage) {
                            boss_killed = true;
                        }
                        self.outbox.play(Sfx::MonsterHit);
                        continue;
                    }
                }
            } else if self.player.hitbox.overlaps(&rect) {
                debug_assert!(!self.freeze.is_active());
                // Berserk mode shrugs boss bullets off; the bullet still dies
                if !self.berserk.is_active() {
                    player_hit = true;
                }
                continue;
            }

            if rect.right() < 0
                || rect.left > FIELD_WIDTH
                || rect.bottom() < 0
                || rect.top > FIELD_HEIGHT
            {
                continue;
            }

            survivors.push(bullet);
        }
        self.bullets = survivors;

        let dead: Vec<u32> = self
            .roster
            .iter()
            .filter(|e| e.health <= 0)
            .map(|e| e.id)
            .collect();
        for id in dead {
            self.kill_enemy(id);
        }
        if boss_killed {
            self.kill_boss();
        }
        if player_hit {
            self.destroy_player(now);
        }
    }

    /// Remove an enemy and run its death side effects.
    pub(crate) fn kill_enemy(&mut self, id: u32) {
        let enemy = self
            .roster
            .remove(id)
            .expect("killed enemy is in the roster");
        self.enemy_death_effects(&enemy);
    }

    fn enemy_death_effects(&mut self, enemy: &Enemy) {
        let stats = enemy.archetype.stats();
        self.outbox.spawn_particle(
            ParticleKind::Ashes(enemy.archetype),
            enemy.pos,
            None,
            stats.death_linger_ms,
        );
        if let Some(state) = &enemy.sapper {
            self.outbox.release_tile(state.deploy_tile);
        }
        // Deployed Sappers never drop; everyone else rolls the table
        if !enemy.is_deployed() {
            if let Some(kind) = stats.drops.roll(&mut self.rng) {
                self.outbox.spawn_drop(enemy.pos, kind);
            }
        }
    }

    /// The boss drops exactly one guaranteed extra life, table be damned.
    pub(crate) fn kill_boss(&mut self) {
        if let Some(boss) = self.boss.take() {
            self.outbox
                .spawn_drop(boss.pos, DropKind::Powerup(PowerupKind::ExtraLife));
            log::info!("boss down");
        }
    }

    /// Deployed Sappers are crushed by chargers walking into them. Crushed
    /// Sappers die with their usual side effects (tile return, ashes), and
    /// since they are deployed, no drop roll.
    pub(crate) fn check_charger_sapper_contacts(&mut self, _now: f32) {
        let mut crushed = Vec::new();
        for sapper in self.roster.with_tag(Tag::Sapper) {
            if !sapper.is_deployed() {
                continue;
            }
            let hit = self
                .roster
                .with_tag(Tag::Charger)
                .any(|charger| charger.hitbox.overlaps(&sapper.hitbox));
            if hit {
                crushed.push(sapper.id);
            }
        }
        for id in crushed {
            self.kill_enemy(id);
        }
    }

    /// Player-vs-enemy hitbox contact, once per frame over all enemies.
    /// Berserk kills every colliding enemy with full death side effects;
    /// otherwise a single contact destroys the player.
    pub(crate) fn check_player_enemy_contacts(&mut self, now: f32) {
        let player_hitbox = self.player.hitbox;
        let collided: Vec<u32> = self
            .roster
            .iter()
            .filter(|e| e.hitbox.overlaps(&player_hitbox))
            .map(|e| e.id)
            .collect();
        let boss_hit = self
            .boss
            .as_ref()
            .is_some_and(|b| b.hitbox.overlaps(&player_hitbox));

        if collided.is_empty() && !boss_hit {
            return;
        }

        if self.berserk.is_active() {
            for id in collided {
                self.kill_enemy(id);
            }
            if boss_hit {
                self.kill_boss();
            }
        } else {
            self.destroy_player(now);
        }
    }

    /// The player got hit: lose a life (possibly the run), flash and reset
    /// to the level start, shed every buff, sweep the field clean and give
    /// back a slice of the countdown.
    pub(crate) fn destroy_player(&mut self, now: f32) {
        self.session.lives -= 1;
        if self.session.lives < 0 {
            self.outbox.play(Sfx::Dead);
            self.wants_restart = true;
            self.game_over = true;
            log::info!("out of lives; restart requested");
        }

        self.outbox
            .spawn_particle(ParticleKind::PlayerDeath, self.player.pos, None, None);

        let start = self.start_pos;
        self.player.reset(start, now);

        if self.stun.is_active() {
            self.stun.deactivate();
        }
        debug_assert!(
            !self.berserk.is_active() && !self.freeze.is_active(),
            "contact cannot kill a berserk player"
        );

        if self.has_countdown {
            self.countdown
                .extend(now, DEATH_COUNTDOWN_EXTENSION * self.countdown.duration());
        }

        self.sweep_enemies();
        self.drops.clear();
        self.outbox.drops.clear();
    }

    /// Remove every non-boss enemy without death side effects, returning
    /// reserved deploy tiles to the set.
    pub(crate) fn sweep_enemies(&mut self) {
        for enemy in self.roster.drain_all() {
            if let Some(state) = enemy.sapper {
                self.deploy.release(state.deploy_tile);
            }
        }
    }

    /// Nuke power-up: sweep the field (the boss rides it out) under a blanket
    /// of staggered smoke bursts.
    pub(crate) fn apply_nuke(&mut self) {
        self.outbox.play(Sfx::Nuke);
        self.sweep_enemies();
        for _ in 0..25 {
            let pos = self.random_field_point();
            let delay = self.rng.random_range(0.0..750.0);
            self.outbox
                .spawn_particle(ParticleKind::Smoke, pos, Some(delay), None);
        }
    }

    /// Cloak power-up: vanish to a random safe spot and stun the field.
    pub(crate) fn apply_cloak(&mut self, now: f32) {
        self.random_teleport();
        self.player.flicker.activate(now);
        for _ in 0..10 {
            let pos = self.random_field_point();
            let delay = self.rng.random_range(0.0..750.0);
            self.outbox
                .spawn_particle(ParticleKind::Smoke, pos, Some(delay), None);
        }
        self.stun.activate(now);
    }

    fn random_field_point(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.random_range(0..=FIELD_WIDTH) as f32,
            self.rng.random_range(0..=FIELD_HEIGHT) as f32,
        )
    }

    /// Collect coins and power-ups the player is standing on. Drops are only
    /// collectible after their grace window. A power-up collected while the
    /// slot is empty is stored; collected over a full slot, the new one is
    /// applied immediately and the slot keeps its contents.
    pub(crate) fn check_pickups(&mut self, now: f32) {
        let mut index = 0;
        while index < self.drops.len() {
            let drop = &self.drops[index];
            let overlaps = drop.collectable && drop.sprite_rect().overlaps(&self.player.hitbox);
            let kind = drop.kind;

            if !overlaps {
                index += 1;
                continue;
            }

            match kind {
                DropKind::Coin(value) => {
                    self.drops.remove(index);
                    self.session.coins += value;
                }
                DropKind::Powerup(powerup) => {
                    // Collecting Berserk starts the freeze stage mid-loop;
                    // anything else under the player stays put until it ends
                    if self.freeze.is_active() {
                        index += 1;
                        continue;
                    }
                    self.drops.remove(index);
                    match powerup {
                        PowerupKind::ExtraLife => {
                            self.session.lives += 1;
                            self.outbox.play(Sfx::Powerup);
                        }
                        other => {
                            if self.session.stored_powerup.is_none() {
                                self.session.stored_powerup = Some(other);
                                self.outbox.play(Sfx::Powerup);
                            } else {
                                // Slot already full: the new pickup fires
                                // immediately, the stored one stays stored
                                self.apply_powerup(other, now);
                                if !matches!(other, PowerupKind::Minigun | PowerupKind::Nuke) {
                                    self.outbox.play(Sfx::Powerup);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
