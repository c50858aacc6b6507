pub mod avatar;
pub mod physics;
pub mod pickup;
pub mod protocol;
pub mod surface;
pub mod world;

pub use avatar::{Avatar, AvatarId, AvatarPhase, Direction, MotionParams};
pub use physics::{detect_collision_side, CollisionSide, Rect};
pub use pickup::{Marker, MarkerKind, Powerup, PowerupKind};
pub use protocol::{ClientMessage, MotionState, ProtocolError, ServerMessage};
pub use surface::{BounceParams, Interaction, Surface, SurfaceKind, ZoneParams};
pub use world::{Bounds, World, WorldEvent};

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 600.0;

pub const AVATAR_SIZE: f32 = 20.0;
pub const AVATAR_SPEED: f32 = 5.0;
pub const JUMP_FORCE: f32 = 10.0;
pub const GRAVITY: f32 = 0.6;
pub const TERMINAL_VELOCITY: f32 = 20.0;
pub const MAX_JUMPS: u32 = 1;
pub const FAST_FALL_IMPULSE: f32 = 1.0;

// Accelerating fall: multiplier grows per airborne frame while descending.
pub const FALL_ACCELERATION_STEP: f32 = 0.05;
pub const MAX_FALL_MULTIPLIER: f32 = 5.0;

pub const BOUNCE_FORCE_MULTIPLIER: f32 = 1.2;
pub const BOUNCE_MAX_FORCE: f32 = 15.0;
pub const BOUNCE_MIN_LAUNCH: f32 = 5.0;
pub const BOUNCE_COOLDOWN_MS: u64 = 50;
pub const BOUNCE_DECELERATION: f32 = 0.1;
pub const BOUNCE_DECAY_INTERVAL_MS: u64 = 200;
pub const BOUNCE_MIN_FORCE: f32 = 3.0;
pub const BOUNCE_DECAY_TIMEOUT_MS: u64 = 2000;

pub const ZONE_SLOW_FACTOR: f32 = 0.2;
pub const ZONE_JUMP_REDUCTION_FACTOR: f32 = 0.2;
pub const ZONE_MIN_TERMINAL_VELOCITY: f32 = 0.5;
pub const ZONE_MAX_TERMINAL_VELOCITY: f32 = 10.0;
pub const ZONE_RECHARGE_COOLDOWN_MS: u64 = 500;

pub const POWERUP_SIZE: f32 = 20.0;
pub const POWERUP_COOLDOWN_MS: u64 = 5000;
pub const JUMP_BOOST: f32 = 1.5;

pub const CHECKPOINT_SIZE: f32 = 30.0;
pub const POINT_SIZE: f32 = 25.0;
