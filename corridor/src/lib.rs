//! A one-dimensional corridor: walking off the left end costs a point,
//! reaching the right end earns one, every other move is worth nothing.

use actor::{Environment, Status};
use replay_data::{Action, State, Transition};
use serde::{Deserialize, Serialize};

pub const CORRIDOR_LEN: usize = 8;
pub const DEFAULT_START: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub position: usize,
}

impl State for Cell {
    const INPUT_LEN: usize = CORRIDOR_LEN;

    fn to_input(&self) -> Vec<f32> {
        let mut input = vec![0.0; CORRIDOR_LEN];
        input[self.position.min(CORRIDOR_LEN - 1)] = 1.0;
        input
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Move {
    Left,
    Stay,
    Right,
}

impl Action for Move {
    const ALL: &'static [Self] = &[Move::Left, Move::Stay, Move::Right];
}

pub struct Corridor {
    start: usize,
    position: usize,
}

impl Corridor {
    pub fn new(start: usize) -> Self {
        let start = start.clamp(1, CORRIDOR_LEN - 2);
        Self {
            start,
            position: start,
        }
    }

    fn cell(&self) -> Cell {
        Cell {
            position: self.position,
        }
    }
}

impl Default for Corridor {
    fn default() -> Self {
        Self::new(DEFAULT_START)
    }
}

impl Environment for Corridor {
    type State = Cell;
    type Action = Move;

    fn reset(&mut self) -> Cell {
        self.position = self.start;
        self.cell()
    }

    fn state(&self) -> Cell {
        self.cell()
    }

    fn step(&mut self, action: Move) -> (Transition<Cell, Move>, Status) {
        let state = self.cell();
        self.position = match action {
            Move::Left => self.position.saturating_sub(1),
            Move::Stay => self.position,
            Move::Right => (self.position + 1).min(CORRIDOR_LEN - 1),
        };
        let (reward, terminal) = match self.position {
            0 => (-1.0, true),
            p if p == CORRIDOR_LEN - 1 => (1.0, true),
            _ => (0.0, false),
        };
        let transition = Transition {
            state,
            action,
            next_state: self.cell(),
            reward,
            terminal,
        };
        (transition, Status::from_terminal(terminal))
    }
}
