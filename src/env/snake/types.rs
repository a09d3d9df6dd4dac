//! Basic types for the duel snake game
//!
//! Directions, grid positions and the relative steering actions a seat
//! can issue.

use anyhow::{bail, Result};

/// Heading of a snake on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards row 0
    Up,
    /// Towards the last row
    Down,
    /// Towards column 0
    Left,
    /// Towards the last column
    Right,
}

impl Direction {
    /// Convert direction to (dx, dy) delta
    pub fn to_delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Heading after a quarter turn counter-clockwise
    pub fn turn_left(self) -> Self {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }

    /// Heading after a quarter turn clockwise
    pub fn turn_right(self) -> Self {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// Apply a steering action
    pub fn steer(self, turn: Turn) -> Self {
        match turn {
            Turn::Left => self.turn_left(),
            Turn::Straight => self,
            Turn::Right => self.turn_right(),
        }
    }
}

/// Steering relative to the current heading
///
/// Relative actions make a reversal into the snake's own neck impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Quarter turn counter-clockwise
    Left,
    /// Keep the current heading
    Straight,
    /// Quarter turn clockwise
    Right,
}

impl Turn {
    /// Number of distinct actions per seat
    pub const COUNT: usize = 3;

    /// Create a turn from an action index (0 = left, 1 = straight, 2 = right)
    pub fn from_action(action: i64) -> Result<Self> {
        match action {
            0 => Ok(Turn::Left),
            1 => Ok(Turn::Straight),
            2 => Ok(Turn::Right),
            _ => bail!("action {} is outside 0..{}", action, Self::COUNT),
        }
    }
}

/// Position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Create new position
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbouring position one cell along `direction`
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.to_delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Check if position is within bounds
    pub fn in_bounds(self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.x < width && self.y >= 0 && self.y < height
    }

    /// Row-major index into a `width`-wide plane
    pub fn plane_index(self, width: i32) -> usize {
        (self.y * width + self.x) as usize
    }
}
