//! The locally simulated movable entity.

use crate::physics::Rect;
use crate::{
    AVATAR_SIZE, AVATAR_SPEED, FALL_ACCELERATION_STEP, FAST_FALL_IMPULSE, GRAVITY, JUMP_FORCE,
    MAX_FALL_MULTIPLIER, MAX_JUMPS, TERMINAL_VELOCITY,
};
use serde::{Deserialize, Serialize};

/// Stable handle issued by the [`World`](crate::World) when an avatar is spawned.
///
/// Every piece of per-avatar bookkeeping (zone occupancy, bounce cooldowns,
/// marker contact) is keyed by this id rather than by object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AvatarId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Per-frame movement state derived from the last collision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarPhase {
    Grounded,
    Airborne,
    TouchingWall,
}

/// Movement parameters that zones temporarily override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub speed: f32,
    pub jump_force: f32,
    pub terminal_velocity: f32,
}

/// Exponential slowdown of a bounce launch, stepped by deadline timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceDecay {
    pub axis: Axis,
    pub deceleration: f32,
    pub min_force: f32,
    pub interval_ms: u64,
    pub next_step_ms: u64,
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub id: AvatarId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,

    pub speed: f32,
    pub jump_force: f32,
    pub jump_multiplier: f32,
    pub gravity: f32,
    pub terminal_velocity: f32,

    pub jump_count: u32,
    pub max_jumps: u32,
    pub is_jumping: bool,
    pub grounded: bool,
    pub is_touching_wall: bool,

    pub is_in_slow_motion: bool,
    pub is_gravity_modified: bool,

    /// Scale gravity up the longer the avatar keeps falling.
    pub accelerating_fall: bool,
    pub fall_frames: u32,

    pub bounce_decay: Option<BounceDecay>,
}

impl Avatar {
    pub fn new(id: AvatarId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            width: AVATAR_SIZE,
            height: AVATAR_SIZE,
            velocity_x: 0.0,
            velocity_y: 0.0,
            speed: AVATAR_SPEED,
            jump_force: JUMP_FORCE,
            jump_multiplier: 1.0,
            gravity: GRAVITY,
            terminal_velocity: TERMINAL_VELOCITY,
            jump_count: MAX_JUMPS,
            max_jumps: MAX_JUMPS,
            is_jumping: false,
            grounded: false,
            is_touching_wall: false,
            is_in_slow_motion: false,
            is_gravity_modified: false,
            accelerating_fall: false,
            fall_frames: 0,
            bounce_decay: None,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn phase(&self) -> AvatarPhase {
        if self.grounded {
            AvatarPhase::Grounded
        } else if self.is_touching_wall {
            AvatarPhase::TouchingWall
        } else {
            AvatarPhase::Airborne
        }
    }

    pub fn move_in(&mut self, direction: Direction) {
        self.velocity_x = match direction {
            Direction::Left => -self.speed,
            Direction::Right => self.speed,
        };
    }

    pub fn stop_move(&mut self) {
        self.velocity_x = 0.0;
    }

    pub fn accelerate_fall(&mut self) {
        self.velocity_y += FAST_FALL_IMPULSE;
    }

    /// Spends one jump and launches upward. Returns false when no jumps remain.
    pub fn jump(&mut self, impulse_scale: f32) -> bool {
        if self.jump_count == 0 {
            return false;
        }

        self.velocity_y = -self.jump_force * self.jump_multiplier * impulse_scale;
        self.is_jumping = true;
        self.jump_count -= 1;
        self.is_touching_wall = false;
        self.grounded = false;
        true
    }

    pub fn recharge_jump(&mut self) {
        self.jump_count = self.max_jumps;
        self.is_jumping = false;
        self.is_touching_wall = false;
    }

    /// Rest on top of a surface whose top edge is at `surface_top`.
    pub fn land_on(&mut self, surface_top: f32) {
        self.y = surface_top - self.height;
        self.velocity_y = 0.0;
        self.grounded = true;
        self.fall_frames = 0;
        self.recharge_jump();
    }

    /// Side contact with a wall. Moving diagonally into it grants a wall jump.
    pub fn touch_wall(&mut self) {
        if self.velocity_x != 0.0 && self.velocity_y != 0.0 {
            self.recharge_jump();
        }
        self.is_touching_wall = true;
    }

    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            speed: self.speed,
            jump_force: self.jump_force,
            terminal_velocity: self.terminal_velocity,
        }
    }

    pub fn restore_motion_params(&mut self, params: MotionParams) {
        self.speed = params.speed;
        self.jump_force = params.jump_force;
        self.terminal_velocity = params.terminal_velocity;
    }

    pub(crate) fn begin_frame(&mut self) {
        self.grounded = false;
        self.is_touching_wall = false;
    }

    pub(crate) fn fall_multiplier(&self) -> f32 {
        if !self.accelerating_fall {
            return 1.0;
        }
        (1.0 + self.fall_frames as f32 * FALL_ACCELERATION_STEP).min(MAX_FALL_MULTIPLIER)
    }

    /// Gravity then terminal-velocity clamp.
    pub(crate) fn apply_gravity(&mut self) {
        if self.accelerating_fall && self.velocity_y > 0.0 {
            self.fall_frames += 1;
        } else {
            self.fall_frames = 0;
        }

        self.velocity_y += self.gravity * self.fall_multiplier();
        self.velocity_y = self.velocity_y.min(self.terminal_velocity);
    }

    pub(crate) fn integrate(&mut self) {
        self.x += self.velocity_x;
        self.y += self.velocity_y;
    }

    pub(crate) fn velocity_on_mut(&mut self, axis: Axis) -> &mut f32 {
        match axis {
            Axis::Horizontal => &mut self.velocity_x,
            Axis::Vertical => &mut self.velocity_y,
        }
    }

    /// Advances any running bounce decay up to `now_ms`.
    pub(crate) fn tick_bounce_decay(&mut self, now_ms: u64) {
        let Some(mut decay) = self.bounce_decay.take() else {
            return;
        };

        while now_ms >= decay.next_step_ms && decay.next_step_ms < decay.expires_at_ms {
            let velocity = self.velocity_on_mut(decay.axis);
            *velocity *= 1.0 - decay.deceleration;
            if velocity.abs() < decay.min_force {
                *velocity = 0.0;
                return;
            }
            decay.next_step_ms += decay.interval_ms;
        }

        if now_ms < decay.expires_at_ms {
            self.bounce_decay = Some(decay);
        }
    }

    pub(crate) fn clamp_horizontal(&mut self, field_width: f32) {
        self.x = self.x.max(0.0).min(field_width - self.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn avatar() -> Avatar {
        Avatar::new(AvatarId(1), 100.0, 200.0)
    }

    #[test]
    fn test_avatar_creation() {
        let avatar = avatar();
        assert_eq!(avatar.id, AvatarId(1));
        assert_eq!(avatar.x, 100.0);
        assert_eq!(avatar.y, 200.0);
        assert_eq!(avatar.velocity_x, 0.0);
        assert_eq!(avatar.velocity_y, 0.0);
        assert_eq!(avatar.jump_count, avatar.max_jumps);
        assert!(!avatar.is_jumping);
        assert_eq!(avatar.phase(), AvatarPhase::Airborne);
    }

    #[test]
    fn test_jump_from_rest() {
        let mut avatar = avatar();
        avatar.jump_count = 1;
        avatar.max_jumps = 1;
        avatar.jump_force = 8.0;
        avatar.jump_multiplier = 1.0;

        assert!(avatar.jump(1.0));
        assert_approx_eq!(avatar.velocity_y, -8.0);
        assert_eq!(avatar.jump_count, 0);
        assert!(avatar.is_jumping);
    }

    #[test]
    fn test_jump_without_charges_is_ignored() {
        let mut avatar = avatar();
        avatar.jump_count = 0;
        avatar.velocity_y = 3.0;

        assert!(!avatar.jump(1.0));
        assert_eq!(avatar.velocity_y, 3.0);
        assert_eq!(avatar.jump_count, 0);
    }

    #[test]
    fn test_jump_uses_multiplier_and_scale() {
        let mut avatar = avatar();
        avatar.jump_multiplier = 2.0;

        avatar.jump(1.5);
        assert_approx_eq!(avatar.velocity_y, -JUMP_FORCE * 2.0 * 1.5);
    }

    #[test]
    fn test_recharge_restores_max_jumps() {
        let mut avatar = avatar();
        avatar.max_jumps = 2;
        avatar.jump_count = 0;
        avatar.is_jumping = true;
        avatar.is_touching_wall = true;

        avatar.recharge_jump();
        assert_eq!(avatar.jump_count, 2);
        assert!(!avatar.is_jumping);
        assert!(!avatar.is_touching_wall);
    }

    #[test]
    fn test_jump_count_stays_in_range() {
        let mut avatar = avatar();
        avatar.max_jumps = 2;
        avatar.recharge_jump();

        for _ in 0..5 {
            avatar.jump(1.0);
            assert!(avatar.jump_count <= avatar.max_jumps);
        }
        assert_eq!(avatar.jump_count, 0);
    }

    #[test]
    fn test_move_and_stop() {
        let mut avatar = avatar();
        avatar.move_in(Direction::Left);
        assert_eq!(avatar.velocity_x, -AVATAR_SPEED);
        avatar.move_in(Direction::Right);
        assert_eq!(avatar.velocity_x, AVATAR_SPEED);
        avatar.stop_move();
        assert_eq!(avatar.velocity_x, 0.0);
    }

    #[test]
    fn test_gravity_clamps_to_terminal_velocity() {
        let mut avatar = avatar();
        avatar.velocity_y = TERMINAL_VELOCITY - 0.1;
        avatar.apply_gravity();
        assert_eq!(avatar.velocity_y, TERMINAL_VELOCITY);
    }

    #[test]
    fn test_accelerating_fall_caps_multiplier() {
        let mut avatar = avatar();
        avatar.accelerating_fall = true;
        avatar.terminal_velocity = f32::MAX;
        avatar.velocity_y = 1.0;

        for _ in 0..500 {
            avatar.apply_gravity();
        }
        assert_approx_eq!(avatar.fall_multiplier(), MAX_FALL_MULTIPLIER);
    }

    #[test]
    fn test_land_on_surface() {
        let mut avatar = avatar();
        avatar.velocity_y = 7.0;
        avatar.jump_count = 0;

        avatar.land_on(300.0);
        assert_eq!(avatar.y, 300.0 - avatar.height);
        assert_eq!(avatar.velocity_y, 0.0);
        assert_eq!(avatar.jump_count, avatar.max_jumps);
        assert_eq!(avatar.phase(), AvatarPhase::Grounded);
    }

    #[test]
    fn test_wall_touch_recharges_only_when_moving_diagonally() {
        let mut avatar = avatar();
        avatar.jump_count = 0;
        avatar.velocity_x = 5.0;
        avatar.velocity_y = 0.0;
        avatar.touch_wall();
        assert_eq!(avatar.jump_count, 0);
        assert_eq!(avatar.phase(), AvatarPhase::TouchingWall);

        avatar.velocity_y = 2.0;
        avatar.touch_wall();
        assert_eq!(avatar.jump_count, avatar.max_jumps);
        assert!(avatar.is_touching_wall);
    }

    #[test]
    fn test_bounce_decay_steps_and_snaps() {
        let mut avatar = avatar();
        avatar.velocity_x = 10.0;
        avatar.bounce_decay = Some(BounceDecay {
            axis: Axis::Horizontal,
            deceleration: 0.5,
            min_force: 3.0,
            interval_ms: 200,
            next_step_ms: 200,
            expires_at_ms: 2000,
        });

        avatar.tick_bounce_decay(100);
        assert_eq!(avatar.velocity_x, 10.0);

        avatar.tick_bounce_decay(200);
        assert_approx_eq!(avatar.velocity_x, 5.0);
        assert!(avatar.bounce_decay.is_some());

        avatar.tick_bounce_decay(400);
        assert_eq!(avatar.velocity_x, 0.0);
        assert!(avatar.bounce_decay.is_none());
    }

    #[test]
    fn test_bounce_decay_expires() {
        let mut avatar = avatar();
        avatar.velocity_y = -14.0;
        avatar.bounce_decay = Some(BounceDecay {
            axis: Axis::Vertical,
            deceleration: 0.01,
            min_force: 3.0,
            interval_ms: 200,
            next_step_ms: 200,
            expires_at_ms: 2000,
        });

        avatar.tick_bounce_decay(5000);
        assert!(avatar.bounce_decay.is_none());
        assert!(avatar.velocity_y.abs() >= 3.0);
    }

    #[test]
    fn test_horizontal_clamp() {
        let mut avatar = avatar();
        avatar.x = -30.0;
        avatar.clamp_horizontal(800.0);
        assert_eq!(avatar.x, 0.0);

        avatar.x = 900.0;
        avatar.clamp_horizontal(800.0);
        assert_eq!(avatar.x, 800.0 - avatar.width);
    }
}
