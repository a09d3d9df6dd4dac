//! Two-seat Snake game
//!
//! A grid world where a primary snake and an optional opponent snake compete
//! for a single food pellet.
//! - Actions are relative: 0 = turn left, 1 = keep heading, 2 = turn right
//! - Observations are three flattened planes (own snake, other snake, food),
//!   mirrored for the opponent seat
//! - Rewards for the primary: +1 for food, -1 for death, small time penalty
//! - An episode ends when any snake dies or the step limit is hit

pub use environment::{DuelSnake, PLACEHOLDER_ACTION};
pub use snake::Snake;
pub use types::{Direction, Position, Turn};

mod environment;
mod snake;
mod types;
