//! The explicit simulation context: avatars, static geometry and pickups.
//!
//! A frame is driven entirely by the caller-supplied timestamp, so replaying the
//! same inputs against the same timestamps yields the same world.

use crate::avatar::{Avatar, AvatarId};
use crate::physics::CollisionSide;
use crate::pickup::{Marker, MarkerKind, Powerup, PowerupKind};
use crate::surface::{Interaction, Surface};
use crate::{FIELD_HEIGHT, FIELD_WIDTH};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
        }
    }
}

/// Noteworthy things that happened during a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEvent {
    Bounced {
        avatar: AvatarId,
        side: CollisionSide,
        force: f32,
    },
    PowerupCollected {
        avatar: AvatarId,
        kind: PowerupKind,
    },
    CheckpointReached {
        avatar: AvatarId,
    },
    PointCollected {
        avatar: AvatarId,
    },
}

#[derive(Debug, Clone, Default)]
pub struct World {
    pub bounds: Bounds,
    pub surfaces: Vec<Surface>,
    pub powerups: Vec<Powerup>,
    pub markers: Vec<Marker>,
    avatars: Vec<Option<Avatar>>,
}

impl World {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    pub fn add_surface(&mut self, surface: Surface) {
        self.surfaces.push(surface);
    }

    pub fn add_powerup(&mut self, powerup: Powerup) {
        self.powerups.push(powerup);
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn spawn_avatar(&mut self, x: f32, y: f32) -> AvatarId {
        let id = AvatarId(self.avatars.len() as u32);
        self.avatars.push(Some(Avatar::new(id, x, y)));
        debug!("Spawned avatar {:?} at ({}, {})", id, x, y);
        id
    }

    /// Removes an avatar and every per-avatar record held by the level.
    pub fn remove_avatar(&mut self, id: AvatarId) -> Option<Avatar> {
        let removed = self.avatars.get_mut(id.0 as usize)?.take();
        if removed.is_some() {
            for surface in &mut self.surfaces {
                surface.forget(id);
            }
            for marker in &mut self.markers {
                marker.forget(id);
            }
        }
        removed
    }

    pub fn avatar(&self, id: AvatarId) -> Option<&Avatar> {
        self.avatars.get(id.0 as usize)?.as_ref()
    }

    pub fn avatar_mut(&mut self, id: AvatarId) -> Option<&mut Avatar> {
        self.avatars.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn avatars(&self) -> impl Iterator<Item = &Avatar> {
        self.avatars.iter().flatten()
    }

    /// Advances every avatar by one frame.
    pub fn step(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        let mut events = Vec::new();

        for powerup in &mut self.powerups {
            powerup.refresh(now_ms);
        }

        for avatar in self.avatars.iter_mut().flatten() {
            Self::step_avatar(
                avatar,
                &mut self.surfaces,
                &mut self.powerups,
                &mut self.markers,
                self.bounds,
                now_ms,
                &mut events,
            );
        }

        events
    }

    fn step_avatar(
        avatar: &mut Avatar,
        surfaces: &mut [Surface],
        powerups: &mut [Powerup],
        markers: &mut [Marker],
        bounds: Bounds,
        now_ms: u64,
        events: &mut Vec<WorldEvent>,
    ) {
        avatar.tick_bounce_decay(now_ms);
        avatar.begin_frame();

        avatar.apply_gravity();
        avatar.integrate();

        for surface in surfaces.iter_mut() {
            if let Interaction::Bounced { side, force } = surface.interact(avatar, now_ms) {
                events.push(WorldEvent::Bounced {
                    avatar: avatar.id,
                    side,
                    force,
                });
            }
        }

        for powerup in powerups.iter_mut() {
            if powerup.try_apply(avatar, now_ms) {
                events.push(WorldEvent::PowerupCollected {
                    avatar: avatar.id,
                    kind: powerup.kind,
                });
            }
        }

        for marker in markers.iter_mut() {
            if marker.update(avatar) {
                events.push(match marker.kind {
                    MarkerKind::Checkpoint => WorldEvent::CheckpointReached { avatar: avatar.id },
                    MarkerKind::Point => WorldEvent::PointCollected { avatar: avatar.id },
                });
            }
        }

        avatar.clamp_horizontal(bounds.width);
    }
}
