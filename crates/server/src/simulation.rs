use glam::Vec2;

use arena::{InputFlags, PlayerNonvisual, PlayerVisual};

pub const ACCELERATION: f32 = 30.0;
pub const TURN_RATE: f32 = 2.0;
pub const MAX_SPEED: f32 = 60.0;

/// One tick of movement for one player: up/down accelerates/brakes along
/// the facing direction, left/right turns.
pub fn step_player(
    visual: &mut PlayerVisual,
    nonvisual: &mut PlayerNonvisual,
    flags: InputFlags,
    dt: f32,
) {
    if flags.contains(InputFlags::UP) {
        nonvisual.speed += ACCELERATION * dt;
    }
    if flags.contains(InputFlags::DOWN) {
        nonvisual.speed -= ACCELERATION * dt;
    }
    nonvisual.speed = nonvisual.speed.clamp(0.0, MAX_SPEED);

    if flags.contains(InputFlags::LEFT) {
        visual.facing += TURN_RATE * dt;
    }
    if flags.contains(InputFlags::RIGHT) {
        visual.facing -= TURN_RATE * dt;
    }

    let delta = Vec2::from_angle(visual.facing) * nonvisual.speed * dt;
    visual.x += delta.x;
    visual.y += delta.y;
}
