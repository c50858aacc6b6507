//! Powerups and level markers.

use crate::avatar::{Avatar, AvatarId};
use crate::physics::Rect;
use crate::{CHECKPOINT_SIZE, JUMP_BOOST, POINT_SIZE, POWERUP_COOLDOWN_MS, POWERUP_SIZE};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PowerupKind {
    /// Recharges and immediately jumps with a scaled impulse.
    Jump { boost: f32 },
    /// Restores the jump count.
    Recharge,
}

#[derive(Debug, Clone)]
pub struct Powerup {
    pub rect: Rect,
    pub kind: PowerupKind,
    pub cooldown_ms: u64,
    reactivate_at_ms: Option<u64>,
}

impl Powerup {
    pub fn new(rect: Rect, kind: PowerupKind) -> Self {
        Self {
            rect,
            kind,
            cooldown_ms: POWERUP_COOLDOWN_MS,
            reactivate_at_ms: None,
        }
    }

    pub fn jump(x: f32, y: f32) -> Self {
        Self::new(
            Rect::new(x, y, POWERUP_SIZE, POWERUP_SIZE),
            PowerupKind::Jump { boost: JUMP_BOOST },
        )
    }

    pub fn recharge(x: f32, y: f32) -> Self {
        Self::new(
            Rect::new(x, y, POWERUP_SIZE, POWERUP_SIZE),
            PowerupKind::Recharge,
        )
    }

    pub fn is_active(&self) -> bool {
        self.reactivate_at_ms.is_none()
    }

    /// Reactivates once the cooldown deadline has passed.
    pub fn refresh(&mut self, now_ms: u64) {
        if matches!(self.reactivate_at_ms, Some(deadline) if now_ms >= deadline) {
            self.reactivate_at_ms = None;
        }
    }

    /// Applies the effect if active and overlapping. Returns true when consumed.
    pub fn try_apply(&mut self, avatar: &mut Avatar, now_ms: u64) -> bool {
        if !self.is_active() || !avatar.bounds().overlaps(&self.rect) {
            return false;
        }

        avatar.recharge_jump();
        if let PowerupKind::Jump { boost } = self.kind {
            avatar.jump(boost);
        }

        self.reactivate_at_ms = Some(now_ms + self.cooldown_ms);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Checkpoint,
    Point,
}

/// Static goal area that reports the first frame of each contact.
#[derive(Debug, Clone)]
pub struct Marker {
    pub rect: Rect,
    pub kind: MarkerKind,
    touching: HashSet<AvatarId>,
}

impl Marker {
    pub fn checkpoint(x: f32, y: f32) -> Self {
        Self {
            rect: Rect::new(x, y, CHECKPOINT_SIZE, CHECKPOINT_SIZE),
            kind: MarkerKind::Checkpoint,
            touching: HashSet::new(),
        }
    }

    pub fn point(x: f32, y: f32) -> Self {
        Self {
            rect: Rect::new(x, y, POINT_SIZE, POINT_SIZE),
            kind: MarkerKind::Point,
            touching: HashSet::new(),
        }
    }

    /// True only on the frame the avatar starts overlapping.
    pub fn update(&mut self, avatar: &Avatar) -> bool {
        if avatar.bounds().overlaps(&self.rect) {
            self.touching.insert(avatar.id)
        } else {
            self.touching.remove(&avatar.id);
            false
        }
    }

    pub fn forget(&mut self, avatar: AvatarId) {
        self.touching.remove(&avatar);
    }
}
