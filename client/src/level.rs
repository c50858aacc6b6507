//! The built-in level every client simulates locally.

use shared::physics::Rect;
use shared::surface::{BounceParams, SurfaceKind, ZoneParams};
use shared::{Bounds, Marker, Powerup, Surface, World};

pub const SPAWN_X: f32 = 50.0;
pub const SPAWN_Y: f32 = 550.0;

pub fn default_level() -> World {
    let mut world = World::new(Bounds::default());

    // Floor
    world.add_surface(Surface::normal(0.0, 580.0, 800.0, 20.0));

    world.add_surface(bouncy(200.0, 300.0, 100.0, 80.0, 5.0));
    world.add_surface(bouncy(400.0, 400.0, 100.0, 100.0, 10.0));
    world.add_surface(bouncy(400.0, 560.0, 100.0, 20.0, 22.0));

    // Slippery ledge that pushes back on side contact
    world.add_surface(Surface::new(
        Rect::new(600.0, 290.0, 200.0, 40.0),
        SurfaceKind::Normal {
            friction: -0.5,
            has_bottom_collision: true,
        },
    ));

    world.add_surface(Surface::new(
        Rect::new(50.0, 450.0, 120.0, 10.0),
        SurfaceKind::OneSidedTop,
    ));
    world.add_surface(Surface::new(
        Rect::new(520.0, 440.0, 60.0, 140.0),
        SurfaceKind::Zone(ZoneParams::slow_motion()),
    ));
    world.add_surface(Surface::new(
        Rect::new(300.0, 60.0, 80.0, 80.0),
        SurfaceKind::Zone(ZoneParams::sticky()),
    ));

    world.add_powerup(Powerup::jump(300.0, 220.0));
    world.add_powerup(Powerup::recharge(400.0, 120.0));
    world.add_powerup(Powerup::recharge(520.0, 190.0));

    world.add_marker(Marker::checkpoint(50.0, 550.0));
    world.add_marker(Marker::point(700.0, 100.0));

    world
}

fn bouncy(x: f32, y: f32, width: f32, height: f32, bounce_force: f32) -> Surface {
    Surface::new(
        Rect::new(x, y, width, height),
        SurfaceKind::Bouncy(BounceParams::with_bounce_force(bounce_force)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MarkerKind;

    #[test]
    fn test_default_level_contents() {
        let world = default_level();

        assert_eq!(world.surfaces.len(), 8);
        assert_eq!(world.powerups.len(), 3);
        assert_eq!(world.markers.len(), 2);
        assert_eq!(
            world
                .surfaces
                .iter()
                .filter(|s| matches!(s.kind, SurfaceKind::Bouncy(_)))
                .count(),
            3
        );
        assert!(world.markers.iter().any(|m| m.kind == MarkerKind::Point));
    }

    #[test]
    fn test_spawn_is_above_floor() {
        let world = default_level();
        let floor = &world.surfaces[0];
        assert!(SPAWN_Y + shared::AVATAR_SIZE <= floor.rect.top());
    }
}
