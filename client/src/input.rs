//! Client input: line commands mapped onto held directions and one-shot actions

use shared::{Avatar, Direction};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
}

/// One discrete input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    Press(Key),
    Release(Key),
    /// Releases both directions
    Stop,
    Jump,
    /// Pushes the avatar down faster
    Down,
    Quit,
}

impl FromStr for InputCommand {
    type Err = String;

    /// Accepts `left`, `right`, `-left`, `-right`, `stop`, `jump`, `down`,
    /// `quit` and their single-letter forms.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let command = match line.trim().to_ascii_lowercase().as_str() {
            "left" | "a" => InputCommand::Press(Key::Left),
            "right" | "d" => InputCommand::Press(Key::Right),
            "-left" | "-a" => InputCommand::Release(Key::Left),
            "-right" | "-d" => InputCommand::Release(Key::Right),
            "stop" | "s" => InputCommand::Stop,
            "jump" | "w" | "up" => InputCommand::Jump,
            "down" | "x" => InputCommand::Down,
            "quit" | "q" => InputCommand::Quit,
            other => return Err(format!("unknown command: {:?}", other)),
        };
        Ok(command)
    }
}

/// Tracks held directions and queued actions between frames
#[derive(Debug, Default)]
pub struct InputManager {
    moving_left: bool,
    moving_right: bool,
    jump_queued: bool,
    down_queued: bool,
    stop_queued: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: InputCommand) {
        match command {
            InputCommand::Press(Key::Left) => self.moving_left = true,
            InputCommand::Press(Key::Right) => self.moving_right = true,
            InputCommand::Release(Key::Left) => {
                self.moving_left = false;
                self.stop_queued = !self.is_moving();
            }
            InputCommand::Release(Key::Right) => {
                self.moving_right = false;
                self.stop_queued = !self.is_moving();
            }
            InputCommand::Stop => {
                self.moving_left = false;
                self.moving_right = false;
                self.stop_queued = true;
            }
            InputCommand::Jump => self.jump_queued = true,
            InputCommand::Down => self.down_queued = true,
            InputCommand::Quit => {}
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving_left || self.moving_right
    }

    /// Applies the current input to the avatar, once per frame before stepping.
    ///
    /// Horizontal velocity is only zeroed on the frame after the last held
    /// direction is released, so an idle avatar keeps whatever the simulation
    /// gave it (bounce launches, friction push-back).
    pub fn drive(&mut self, avatar: &mut Avatar) {
        if self.moving_left {
            avatar.move_in(Direction::Left);
        }
        // Right wins when both are held.
        if self.moving_right {
            avatar.move_in(Direction::Right);
        }
        if std::mem::take(&mut self.stop_queued) && !self.is_moving() {
            avatar.stop_move();
        }

        if std::mem::take(&mut self.jump_queued) {
            avatar.jump(1.0);
        }
        if std::mem::take(&mut self.down_queued) {
            avatar.accelerate_fall();
        }
    }
}
