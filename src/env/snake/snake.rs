//! Snake entity and movement logic

use super::types::{Direction, Position, Turn};
use std::collections::VecDeque;

/// One snake on the board
#[derive(Debug, Clone)]
pub struct Snake {
    /// Body positions, head first
    pub body: VecDeque<Position>,
    /// Current heading
    pub direction: Direction,
    /// Target length; the tail is trimmed down to this on every move
    pub length: usize,
    /// Whether the snake is alive
    pub alive: bool,
}

impl Snake {
    /// Create a one-cell snake at `start` heading `direction`
    pub fn new(start: Position, direction: Direction) -> Self {
        let mut body = VecDeque::new();
        body.push_back(start);

        Self {
            body,
            direction,
            length: 1,
            alive: true,
        }
    }

    /// Current head position
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Steer and advance one cell
    pub fn advance(&mut self, turn: Turn) {
        self.direction = self.direction.steer(turn);
        let new_head = self.head().step(self.direction);

        self.body.push_front(new_head);
        while self.body.len() > self.length {
            self.body.pop_back();
        }
    }

    /// Grow by one segment on the next move
    pub fn grow(&mut self) {
        self.length += 1;
    }

    /// Head left the board
    pub fn collides_with_wall(&self, width: i32, height: i32) -> bool {
        !self.head().in_bounds(width, height)
    }

    /// Head overlaps the rest of the body
    pub fn collides_with_self(&self) -> bool {
        let head = self.head();
        self.body.iter().skip(1).any(|&pos| pos == head)
    }

    /// Head overlaps any cell of `other`, including its head
    pub fn collides_with(&self, other: &Snake) -> bool {
        other.occupies(self.head())
    }

    /// Whether any segment sits on `pos`
    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }
}
