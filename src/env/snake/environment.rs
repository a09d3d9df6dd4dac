//! Duel snake environment
//!
//! Implements [`DuelEnvironment`] for one board holding the primary snake
//! and, in two-agent mode, an opponent snake.

use super::{
    snake::Snake,
    types::{Direction, Position, Turn},
};
use crate::env::{
    DuelEnvironment, DuelObservation, JointAction, SpaceInfo, SpaceType, StepInfo, StepResult,
};
use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Action that keeps the current heading; used for an absent second seat
pub const PLACEHOLDER_ACTION: i64 = 1;

const FOOD_REWARD: f32 = 1.0;
const DEATH_REWARD: f32 = -1.0;
const STEP_PENALTY: f32 = -0.01;

/// Number of observation planes per seat: own snake, other snake, food
const PLANES: usize = 3;

const HEAD_VALUE: f32 = 1.0;
const BODY_VALUE: f32 = 0.5;

/// Two-seat Snake board
#[derive(Debug, Clone)]
pub struct DuelSnake {
    width: i32,
    height: i32,
    num_agents: usize,
    /// Primary snake first, then the opponent if present
    snakes: Vec<Snake>,
    food: Position,
    steps: usize,
    max_steps: usize,
    done: bool,
    rng: StdRng,
}

impl DuelSnake {
    /// Create a board of `width` x `height` cells for 1 or 2 snakes
    pub fn new(width: i32, height: i32, num_agents: usize) -> Self {
        assert!(width >= 4 && height >= 1, "board must be at least 4x1");
        assert!(
            num_agents == 1 || num_agents == 2,
            "num_agents must be 1 or 2, got {num_agents}"
        );

        let mut env = Self {
            width,
            height,
            num_agents,
            snakes: Vec::new(),
            food: Position::new(0, 0),
            steps: 0,
            max_steps: (width * height * 4) as usize,
            done: false,
            rng: StdRng::from_entropy(),
        };
        env.spawn();
        env
    }

    /// Set the step limit per episode
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Seed the food placement generator
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.spawn();
        self
    }

    /// Steps taken in the current episode
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Snakes on the board, primary first
    pub fn snakes(&self) -> &[Snake] {
        &self.snakes
    }

    fn spawn(&mut self) {
        let row = self.height / 2;
        self.snakes = vec![Snake::new(Position::new(self.width / 4, row), Direction::Right)];
        if self.num_agents == 2 {
            self.snakes.push(Snake::new(
                Position::new(self.width - 1 - self.width / 4, row),
                Direction::Left,
            ));
        }
        self.steps = 0;
        self.done = false;
        if !self.place_food() {
            self.done = true;
        }
    }

    /// Move the food to a random free cell; false if the board is full
    fn place_food(&mut self) -> bool {
        let free: Vec<Position> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Position::new(x, y)))
            .filter(|&pos| !self.snakes.iter().any(|s| s.occupies(pos)))
            .collect();

        match free.choose(&mut self.rng) {
            Some(&pos) => {
                self.food = pos;
                true
            }
            None => false,
        }
    }

    fn is_dead(&self, index: usize) -> bool {
        let snake = &self.snakes[index];
        snake.collides_with_wall(self.width, self.height)
            || snake.collides_with_self()
            || self
                .snakes
                .iter()
                .enumerate()
                .any(|(j, other)| j != index && snake.collides_with(other))
    }

    fn observe(&self) -> DuelObservation {
        let plane = (self.width * self.height) as usize;
        let mut primary = vec![0.0; PLANES * plane];
        let mut opponent = vec![0.0; PLANES * plane];

        for (seat, snake) in self.snakes.iter().enumerate() {
            for (k, &pos) in snake.body.iter().enumerate() {
                if !pos.in_bounds(self.width, self.height) {
                    continue;
                }
                let value = if k == 0 { HEAD_VALUE } else { BODY_VALUE };
                let idx = pos.plane_index(self.width);
                primary[seat * plane + idx] = value;
                opponent[(1 - seat) * plane + idx] = value;
            }
        }

        let food = 2 * plane + self.food.plane_index(self.width);
        primary[food] = 1.0;
        opponent[food] = 1.0;

        DuelObservation { primary, opponent }
    }

    /// ASCII picture of the board: `A`/`a` primary, `B`/`b` opponent, `*` food
    pub fn render(&self) -> String {
        let mut grid = vec![vec!['.'; self.width as usize]; self.height as usize];
        grid[self.food.y as usize][self.food.x as usize] = '*';
        for (seat, snake) in self.snakes.iter().enumerate() {
            let (head, body) = if seat == 0 { ('A', 'a') } else { ('B', 'b') };
            for (k, pos) in snake.body.iter().enumerate() {
                if pos.in_bounds(self.width, self.height) {
                    grid[pos.y as usize][pos.x as usize] = if k == 0 { head } else { body };
                }
            }
        }

        let mut out = String::with_capacity(grid.len() * (self.width as usize + 1));
        for row in grid {
            out.extend(row);
            out.push('\n');
        }
        out
    }
}

impl DuelEnvironment for DuelSnake {
    fn reset(&mut self) -> Result<DuelObservation> {
        self.spawn();
        Ok(self.observe())
    }

    fn step(&mut self, action: JointAction) -> Result<StepResult> {
        if self.done {
            bail!("step called on a finished episode; reset first");
        }
        let turns = action
            .iter()
            .take(self.snakes.len())
            .map(|&a| Turn::from_action(a))
            .collect::<Result<Vec<_>>>()?;
        self.steps += 1;

        let previous_heads: Vec<Position> = self.snakes.iter().map(|s| s.head()).collect();
        for (snake, &turn) in self.snakes.iter_mut().zip(&turns) {
            snake.advance(turn);
        }

        let mut dead: Vec<bool> = (0..self.snakes.len()).map(|i| self.is_dead(i)).collect();
        // Heads that swapped cells met head-on between ticks
        if self.snakes.len() == 2
            && self.snakes[0].head() == previous_heads[1]
            && self.snakes[1].head() == previous_heads[0]
        {
            dead = vec![true, true];
        }
        for (snake, &d) in self.snakes.iter_mut().zip(&dead) {
            if d {
                snake.alive = false;
            }
        }

        let mut reward = STEP_PENALTY;
        let eater = self
            .snakes
            .iter()
            .position(|s| s.alive && s.head() == self.food);
        let mut board_full = false;
        if let Some(i) = eater {
            if i == 0 {
                reward += FOOD_REWARD;
            }
            self.snakes[i].grow();
            board_full = !self.place_food();
        }

        if dead[0] {
            reward = DEATH_REWARD;
        }

        self.done = dead.iter().any(|&d| d) || board_full || self.steps >= self.max_steps;

        Ok(StepResult {
            observation: self.observe(),
            reward,
            done: self.done,
            info: StepInfo::default(),
        })
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo {
            shape: vec![PLANES, self.height as usize, self.width as usize],
            dtype: SpaceType::Continuous,
        }
    }

    fn action_space(&self) -> SpaceInfo {
        SpaceInfo {
            shape: vec![],
            dtype: SpaceType::Discrete(Turn::COUNT),
        }
    }
}
