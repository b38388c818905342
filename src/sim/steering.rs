//! Per-frame enemy movement and the shared axis-separated collision
//!
//! Movement integrates one axis at a time and resolves collisions after each
//! axis: a hitbox overlapping an obstacle is clamped flush to the obstacle's
//! near edge on that axis only, and the float position is snapped to match.
//! Resolving per axis avoids the tunneling and corner-catching that combined
//! resolution suffers from.

use glam::Vec2;

use super::archetype::sapper_deployed_health;
use super::entity::{Enemy, SapperPhase, anim};
use super::rect::Rect;
use crate::angle_between_deg;
use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH, INWARD_MARGIN, SPRITE_SIZE, WAYPOINT_EPSILON};

/// Clamp the hitbox flush against any overlapped obstacle along X and snap
/// the float position to the clamped center.
pub fn collide_axis_x(pos: &mut Vec2, hitbox: &mut Rect, dir_x: f32, obstacles: &[Rect]) {
    for obstacle in obstacles {
        if hitbox.overlaps(obstacle) {
            if dir_x > 0.0 {
                hitbox.set_right(obstacle.left);
            } else if dir_x < 0.0 {
                hitbox.set_left(obstacle.right());
            }
            pos.x = hitbox.center_x() as f32;
        }
    }
}

/// As [`collide_axis_x`], along Y.
pub fn collide_axis_y(pos: &mut Vec2, hitbox: &mut Rect, dir_y: f32, obstacles: &[Rect]) {
    for obstacle in obstacles {
        if hitbox.overlaps(obstacle) {
            if dir_y > 0.0 {
                hitbox.set_bottom(obstacle.top);
            } else if dir_y < 0.0 {
                hitbox.set_top(obstacle.bottom());
            }
            pos.y = hitbox.center_y() as f32;
        }
    }
}

/// Integrate one movement step with axis-separated collision resolution.
/// The hitbox center is re-rounded from `pos` after each axis.
pub fn move_and_collide(
    pos: &mut Vec2,
    hitbox: &mut Rect,
    dir: Vec2,
    speed: f32,
    dt: f32,
    obstacles: &[Rect],
) {
    pos.x += dir.x * speed * dt;
    hitbox.set_center_x(pos.x.round() as i32);
    collide_axis_x(pos, hitbox, dir.x, obstacles);

    pos.y += dir.y * speed * dt;
    hitbox.set_center_y(pos.y.round() as i32);
    collide_axis_y(pos, hitbox, dir.y, obstacles);
}

fn clamp_field_x(pos: &mut Vec2, hitbox: &mut Rect) {
    let mut sprite = sprite_rect_at(*pos);
    if sprite.left < 0 {
        sprite.set_left(0);
    } else if sprite.right() > FIELD_WIDTH {
        sprite.set_right(FIELD_WIDTH);
    } else {
        return;
    }
    pos.x = sprite.center_x() as f32;
    hitbox.set_center_x(sprite.center_x());
}

fn clamp_field_y(pos: &mut Vec2, hitbox: &mut Rect) {
    let mut sprite = sprite_rect_at(*pos);
    if sprite.top < 0 {
        sprite.set_top(0);
    } else if sprite.bottom() > FIELD_HEIGHT {
        sprite.set_bottom(FIELD_HEIGHT);
    } else {
        return;
    }
    pos.y = sprite.center_y() as f32;
    hitbox.set_center_y(sprite.center_y());
}

fn sprite_rect_at(pos: Vec2) -> Rect {
    Rect::from_center(
        pos.x.round() as i32,
        pos.y.round() as i32,
        SPRITE_SIZE,
        SPRITE_SIZE,
    )
}

/// Momentum steering: nudge the current heading toward the player, scaled by
/// how far off it currently points. A large misalignment corrects quickly;
/// near-aligned headings barely change, so the direction never flips
/// abruptly close to convergence.
pub fn homing_blend(current: Vec2, to_player_unit: Vec2, momentum: f32) -> Vec2 {
    let angle = angle_between_deg(current, to_player_unit);
    let blended = current + to_player_unit * angle * momentum;
    let blended = blended.normalize_or_zero();
    if blended == Vec2::ZERO {
        to_player_unit
    } else {
        blended
    }
}

/// End the inward spawn phase once the sprite box sits two tiles inside
/// every field edge. Zeroing the stored direction disables the phase for the
/// rest of the enemy's life, so the containment test runs at most until it
/// first passes.
fn update_inward_phase(enemy: &mut Enemy) {
    if enemy.initial_dir == Vec2::ZERO {
        return;
    }
    let sprite = enemy.sprite_rect();
    if sprite.left >= INWARD_MARGIN
        && sprite.top >= INWARD_MARGIN
        && sprite.right() <= FIELD_WIDTH - INWARD_MARGIN
        && sprite.bottom() <= FIELD_HEIGHT - INWARD_MARGIN
    {
        enemy.initial_dir = Vec2::ZERO;
    }
}

/// Advance one enemy for one frame: steering policy, movement with
/// collision, and animation. `stunned` suppresses movement and steering but
/// not animation, so a stunned field idles in place visibly alive.
pub fn update_enemy(
    enemy: &mut Enemy,
    player_center: Vec2,
    obstacles: &[Rect],
    stunned: bool,
    player_berserk: bool,
    dt: f32,
) {
    if enemy.sapper.is_some() {
        update_sapper(enemy, stunned, dt);
        return;
    }

    if !stunned {
        update_inward_phase(enemy);

        if enemy.initial_dir != Vec2::ZERO {
            enemy.dir = enemy.initial_dir;
        } else {
            let to_player = (player_center - enemy.pos).normalize_or_zero();
            if to_player != Vec2::ZERO {
                enemy.dir = if player_berserk {
                    // Flee: straight away from the player, no blending
                    -to_player
                } else {
                    homing_blend(enemy.dir, to_player, enemy.archetype.stats().momentum)
                };
            }
        }

        let speed = enemy.archetype.stats().speed;
        let dir = enemy.dir;
        let inward_over = enemy.initial_dir == Vec2::ZERO;

        enemy.pos.x += dir.x * speed * dt;
        enemy.hitbox.set_center_x(enemy.pos.x.round() as i32);
        collide_axis_x(&mut enemy.pos, &mut enemy.hitbox, dir.x, obstacles);
        // Fleeing (and sufficiently curved homing) paths would otherwise
        // leave the field; only applies once the enemy is properly inside
        if inward_over {
            clamp_field_x(&mut enemy.pos, &mut enemy.hitbox);
        }

        enemy.pos.y += dir.y * speed * dt;
        enemy.hitbox.set_center_y(enemy.pos.y.round() as i32);
        collide_axis_y(&mut enemy.pos, &mut enemy.hitbox, dir.y, obstacles);
        if inward_over {
            clamp_field_y(&mut enemy.pos, &mut enemy.hitbox);
        }
    }

    enemy.anim.advance_wrap(dt);
}

/// Sapper frame update: waypoint-lerp along the stored path, then the
/// deploy animation, then nothing.
fn update_sapper(enemy: &mut Enemy, stunned: bool, dt: f32) {
    let phase = enemy.sapper.as_ref().expect("sapper state").phase;

    match phase {
        SapperPhase::Run => {
            if !stunned {
                let speed = enemy.archetype.stats().speed;
                let state = enemy.sapper.as_ref().expect("sapper state");
                let target = state.path[state.next].center_px();

                let dir = (target - enemy.pos).normalize_or_zero();
                enemy.pos += dir * speed * dt;
                enemy.sync_hitbox();

                if (target - enemy.pos).length() < WAYPOINT_EPSILON {
                    // Snap exactly onto the waypoint before aiming at the next
                    enemy.pos = target;
                    enemy.sync_hitbox();
                    let state = enemy.sapper.as_mut().expect("sapper state");
                    state.next += 1;
                    if state.next == state.path.len() {
                        state.phase = SapperPhase::Deploying;
                        enemy
                            .anim
                            .restart(anim::SAPPER_DEPLOY_FPS, anim::SAPPER_DEPLOY_FRAMES);
                    }
                }
            }
            let still_running = matches!(
                enemy.sapper.as_ref().expect("sapper state").phase,
                SapperPhase::Run
            );
            if still_running {
                enemy.anim.advance_wrap(dt);
            }
        }
        SapperPhase::Deploying => {
            // Stuns don't interrupt deployment, only movement
            if enemy.anim.advance_once(dt) {
                enemy.health = sapper_deployed_health(enemy.health);
                enemy.sapper.as_mut().expect("sapper state").phase = SapperPhase::Deployed;
                enemy.anim.restart(0.0, 1);
            }
        }
        SapperPhase::Deployed => {}
    }
}
