//! Static surfaces and the single resolution routine that switches on their kind.

use crate::avatar::{Avatar, AvatarId, Axis, BounceDecay, MotionParams};
use crate::physics::{detect_collision_side, CollisionSide, Rect};
use crate::{
    BOUNCE_COOLDOWN_MS, BOUNCE_DECAY_INTERVAL_MS, BOUNCE_DECAY_TIMEOUT_MS, BOUNCE_DECELERATION,
    BOUNCE_FORCE_MULTIPLIER, BOUNCE_MAX_FORCE, BOUNCE_MIN_FORCE, BOUNCE_MIN_LAUNCH,
    ZONE_JUMP_REDUCTION_FACTOR, ZONE_MAX_TERMINAL_VELOCITY, ZONE_MIN_TERMINAL_VELOCITY,
    ZONE_RECHARGE_COOLDOWN_MS, ZONE_SLOW_FACTOR,
};
use std::collections::HashMap;

/// Tuning for a bouncy ("repelling") surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceParams {
    /// Incoming speed is scaled by this before clamping.
    pub force_multiplier: f32,
    pub max_force: f32,
    /// Launch floor; slow contacts still leave with at least this speed.
    pub bounce_force: f32,
    pub cooldown_ms: u64,
    pub deceleration: f32,
    pub decay_interval_ms: u64,
    /// Decay snaps to zero below this speed.
    pub min_force: f32,
    pub decay_timeout_ms: u64,
}

impl Default for BounceParams {
    fn default() -> Self {
        Self {
            force_multiplier: BOUNCE_FORCE_MULTIPLIER,
            max_force: BOUNCE_MAX_FORCE,
            bounce_force: BOUNCE_MIN_LAUNCH,
            cooldown_ms: BOUNCE_COOLDOWN_MS,
            deceleration: BOUNCE_DECELERATION,
            decay_interval_ms: BOUNCE_DECAY_INTERVAL_MS,
            min_force: BOUNCE_MIN_FORCE,
            decay_timeout_ms: BOUNCE_DECAY_TIMEOUT_MS,
        }
    }
}

impl BounceParams {
    pub fn with_bounce_force(bounce_force: f32) -> Self {
        Self {
            bounce_force,
            ..Self::default()
        }
    }

    pub fn launch_force(&self, incoming_speed: f32) -> f32 {
        (incoming_speed.abs() * self.force_multiplier)
            .min(self.max_force)
            .max(self.bounce_force)
    }
}

/// Tuning for an area that dampens movement while an avatar overlaps it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneParams {
    pub slow_factor: f32,
    pub jump_reduction_factor: f32,
    pub min_terminal_velocity: f32,
    pub max_terminal_velocity: f32,
    /// Grant one jump recharge per entry, rate limited by `recharge_cooldown_ms`.
    pub recharge_on_entry: bool,
    pub recharge_cooldown_ms: u64,
}

impl ZoneParams {
    pub fn slow_motion() -> Self {
        Self {
            slow_factor: ZONE_SLOW_FACTOR,
            jump_reduction_factor: ZONE_JUMP_REDUCTION_FACTOR,
            min_terminal_velocity: ZONE_MIN_TERMINAL_VELOCITY,
            max_terminal_velocity: ZONE_MAX_TERMINAL_VELOCITY,
            recharge_on_entry: false,
            recharge_cooldown_ms: ZONE_RECHARGE_COOLDOWN_MS,
        }
    }

    pub fn sticky() -> Self {
        Self {
            recharge_on_entry: true,
            ..Self::slow_motion()
        }
    }

    fn dampen(&self, original: MotionParams) -> MotionParams {
        MotionParams {
            speed: original.speed * self.slow_factor,
            jump_force: original.jump_force * self.jump_reduction_factor,
            terminal_velocity: (original.terminal_velocity * self.jump_reduction_factor)
                .clamp(self.min_terminal_velocity, self.max_terminal_velocity),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceKind {
    /// Plain solid block.
    Normal {
        /// Scales horizontal velocity on side contact.
        friction: f32,
        /// Whether hitting the underside stops upward motion.
        has_bottom_collision: bool,
    },
    Bouncy(BounceParams),
    /// Non-solid area effect.
    Zone(ZoneParams),
    /// Blocks only avatars falling onto it from above.
    OneSidedTop,
}

impl SurfaceKind {
    pub fn normal() -> Self {
        SurfaceKind::Normal {
            friction: 1.0,
            has_bottom_collision: true,
        }
    }
}

/// Outcome of one avatar/surface pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    None,
    Resolved(CollisionSide),
    Bounced { side: CollisionSide, force: f32 },
    ZoneEntered,
    ZoneExited,
}

/// Per-avatar bookkeeping. Geometry never changes; only these maps do.
#[derive(Debug, Clone, Default)]
struct Bookkeeping {
    last_bounce_ms: HashMap<AvatarId, u64>,
    zone_originals: HashMap<AvatarId, MotionParams>,
    last_zone_recharge_ms: HashMap<AvatarId, u64>,
}

#[derive(Debug, Clone)]
pub struct Surface {
    pub rect: Rect,
    pub kind: SurfaceKind,
    bookkeeping: Bookkeeping,
}

impl Surface {
    pub fn new(rect: Rect, kind: SurfaceKind) -> Self {
        Self {
            rect,
            kind,
            bookkeeping: Bookkeeping::default(),
        }
    }

    pub fn normal(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Rect::new(x, y, width, height), SurfaceKind::normal())
    }

    pub fn is_affecting(&self, avatar: AvatarId) -> bool {
        self.bookkeeping.zone_originals.contains_key(&avatar)
    }

    /// Drops all bookkeeping for an avatar that left the world.
    pub fn forget(&mut self, avatar: AvatarId) {
        self.bookkeeping.last_bounce_ms.remove(&avatar);
        self.bookkeeping.zone_originals.remove(&avatar);
        self.bookkeeping.last_zone_recharge_ms.remove(&avatar);
    }

    /// Runs the collision or effect for this surface against one avatar.
    pub fn interact(&mut self, avatar: &mut Avatar, now_ms: u64) -> Interaction {
        let overlapping = avatar.bounds().overlaps(&self.rect);
        let kind = self.kind;

        match kind {
            SurfaceKind::Zone(params) => self.update_zone(params, avatar, overlapping, now_ms),
            _ if !overlapping => Interaction::None,
            SurfaceKind::Bouncy(params) => self.bounce(params, avatar, now_ms),
            SurfaceKind::Normal {
                friction,
                has_bottom_collision,
            } => self.resolve_solid(avatar, friction, has_bottom_collision),
            SurfaceKind::OneSidedTop => self.resolve_one_sided(avatar),
        }
    }

    fn resolve_solid(
        &self,
        avatar: &mut Avatar,
        friction: f32,
        has_bottom_collision: bool,
    ) -> Interaction {
        let Some(side) = detect_collision_side(&avatar.bounds(), &self.rect) else {
            return Interaction::None;
        };

        match side {
            CollisionSide::Top => {
                if avatar.velocity_y > 0.0 {
                    avatar.land_on(self.rect.top());
                }
            }
            CollisionSide::Bottom => {
                if has_bottom_collision {
                    avatar.y = self.rect.bottom();
                    avatar.velocity_y = avatar.velocity_y.max(0.0);
                }
            }
            CollisionSide::Left | CollisionSide::Right => {
                avatar.velocity_x *= friction;
                avatar.x = if side == CollisionSide::Left {
                    self.rect.left() - avatar.width
                } else {
                    self.rect.right()
                };
                avatar.touch_wall();
            }
        }

        Interaction::Resolved(side)
    }

    fn resolve_one_sided(&self, avatar: &mut Avatar) -> Interaction {
        match detect_collision_side(&avatar.bounds(), &self.rect) {
            Some(CollisionSide::Top) if avatar.velocity_y > 0.0 => {
                avatar.land_on(self.rect.top());
                Interaction::Resolved(CollisionSide::Top)
            }
            _ => Interaction::None,
        }
    }

    fn bounce(&mut self, params: BounceParams, avatar: &mut Avatar, now_ms: u64) -> Interaction {
        let Some(side) = detect_collision_side(&avatar.bounds(), &self.rect) else {
            return Interaction::None;
        };

        self.place_flush(avatar, side);

        let ready = self
            .bookkeeping
            .last_bounce_ms
            .get(&avatar.id)
            .map_or(true, |&last| now_ms.saturating_sub(last) >= params.cooldown_ms);

        if !ready {
            // Still cooling down: hold the avatar outside without relaunching it.
            match side {
                CollisionSide::Top => avatar.velocity_y = avatar.velocity_y.min(0.0),
                CollisionSide::Bottom => avatar.velocity_y = avatar.velocity_y.max(0.0),
                CollisionSide::Left => avatar.velocity_x = avatar.velocity_x.min(0.0),
                CollisionSide::Right => avatar.velocity_x = avatar.velocity_x.max(0.0),
            }
            return Interaction::Resolved(side);
        }

        let (axis, incoming, sign) = match side {
            CollisionSide::Top => (Axis::Vertical, avatar.velocity_y, -1.0),
            CollisionSide::Bottom => (Axis::Vertical, avatar.velocity_y, 1.0),
            CollisionSide::Left => (Axis::Horizontal, avatar.velocity_x, -1.0),
            CollisionSide::Right => (Axis::Horizontal, avatar.velocity_x, 1.0),
        };

        let force = params.launch_force(incoming);
        *avatar.velocity_on_mut(axis) = sign * force;
        avatar.recharge_jump();
        avatar.bounce_decay = Some(BounceDecay {
            axis,
            deceleration: params.deceleration,
            min_force: params.min_force,
            interval_ms: params.decay_interval_ms,
            next_step_ms: now_ms + params.decay_interval_ms,
            expires_at_ms: now_ms + params.decay_timeout_ms,
        });
        self.bookkeeping.last_bounce_ms.insert(avatar.id, now_ms);

        Interaction::Bounced { side, force }
    }

    fn place_flush(&self, avatar: &mut Avatar, side: CollisionSide) {
        match side {
            CollisionSide::Top => avatar.y = self.rect.top() - avatar.height,
            CollisionSide::Bottom => avatar.y = self.rect.bottom(),
            CollisionSide::Left => avatar.x = self.rect.left() - avatar.width,
            CollisionSide::Right => avatar.x = self.rect.right(),
        }
    }

    fn update_zone(
        &mut self,
        params: ZoneParams,
        avatar: &mut Avatar,
        overlapping: bool,
        now_ms: u64,
    ) -> Interaction {
        let tracked = self.bookkeeping.zone_originals.contains_key(&avatar.id);

        match (overlapping, tracked) {
            (true, false) => {
                // Another zone already holds this avatar's originals.
                if avatar.is_in_slow_motion {
                    return Interaction::None;
                }

                let original = avatar.motion_params();
                self.bookkeeping.zone_originals.insert(avatar.id, original);
                avatar.restore_motion_params(params.dampen(original));
                avatar.is_in_slow_motion = true;
                avatar.is_gravity_modified = true;

                if params.recharge_on_entry {
                    let recharge_due = self
                        .bookkeeping
                        .last_zone_recharge_ms
                        .get(&avatar.id)
                        .map_or(true, |&last| {
                            now_ms.saturating_sub(last) >= params.recharge_cooldown_ms
                        });
                    if recharge_due {
                        avatar.recharge_jump();
                        self.bookkeeping
                            .last_zone_recharge_ms
                            .insert(avatar.id, now_ms);
                    }
                }

                Interaction::ZoneEntered
            }
            (false, true) => {
                if let Some(original) = self.bookkeeping.zone_originals.remove(&avatar.id) {
                    avatar.restore_motion_params(original);
                }
                avatar.is_in_slow_motion = false;
                avatar.is_gravity_modified = false;
                Interaction::ZoneExited
            }
            _ => Interaction::None,
        }
    }
}
