use std::collections::VecDeque;

use space::{Direction, Position};

/// Result of advancing a [`MovementQueue`] by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub first: Direction,
    pub second: Direction,
    pub position: Position,
}

/// Tiles a mob will walk through, one (or two when running) per tick.
///
/// Waypoints are expanded into single-tile steps on insertion. Steps already
/// taken are remembered so a new path that doubles back can retrace them.
#[derive(Debug, Clone, Default)]
pub struct MovementQueue {
    points: VecDeque<Position>,
    previous: VecDeque<Position>,
    running: bool,
}

impl MovementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new path towards `next` from `current`.
    pub fn add_first_step(&mut self, next: Position, current: Position) {
        self.points.clear();
        self.running = false;

        let mut backtrack = Vec::new();
        while let Some(position) = self.previous.pop_back() {
            backtrack.push(position);
            if position == next {
                for step in backtrack {
                    self.add_step(step, current);
                }
                self.previous.clear();
                return;
            }
        }

        self.previous.clear();
        self.add_step(next, current);
    }

    /// Appends a straight line from the end of the path (or `current`) to `next`.
    pub fn add_step(&mut self, next: Position, current: Position) {
        let from = self.points.back().copied().unwrap_or(current);
        let mut dx = next.x - from.x;
        let mut dy = next.y - from.y;
        let steps = dx.abs().max(dy.abs());

        for _ in 0..steps {
            dx -= dx.signum();
            dy -= dy.signum();
            self.points
                .push_back(Position::new(next.x - dx, next.y - dy, next.height));
        }
    }

    pub fn pulse(&mut self, position: Position) -> Step {
        let height = position.height;
        let mut step = Step {
            first: Direction::None,
            second: Direction::None,
            position,
        };

        if let Some(next) = self.points.pop_front() {
            self.previous.push_back(next);
            step.first = Direction::between(&step.position, &next);
            step.position = Position::new(next.x, next.y, height);

            if self.running {
                if let Some(next) = self.points.pop_front() {
                    self.previous.push_back(next);
                    step.second = Direction::between(&step.position, &next);
                    step.position = Position::new(next.x, next.y, height);
                }
            }
        }
        step
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.previous.clear();
        self.running = false;
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_then_straight_interpolation() {
        let origin = Position::ground(10, 10);
        let mut queue = MovementQueue::new();
        queue.add_first_step(Position::ground(13, 11), origin);
        assert_eq!(queue.len(), 3);

        let step = queue.pulse(origin);
        assert_eq!(step.first, Direction::NorthEast);
        assert_eq!(step.second, Direction::None);
        assert_eq!(step.position, Position::ground(11, 11));

        let step = queue.pulse(step.position);
        assert_eq!(step.first, Direction::East);
        assert_eq!(step.position, Position::ground(12, 11));
    }

    #[test]
    fn running_takes_two_steps() {
        let origin = Position::ground(0, 0);
        let mut queue = MovementQueue::new();
        queue.add_first_step(Position::ground(0, 3), origin);
        queue.set_running(true);

        let step = queue.pulse(origin);
        assert_eq!(step.first, Direction::North);
        assert_eq!(step.second, Direction::North);
        assert_eq!(step.position, Position::ground(0, 2));

        let step = queue.pulse(step.position);
        assert_eq!(step.first, Direction::North);
        assert_eq!(step.second, Direction::None);
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_queue_stays_put() {
        let origin = Position::new(5, 5, 2);
        let step = MovementQueue::new().pulse(origin);
        assert_eq!(step.position, origin);
        assert!(step.first.is_none() && step.second.is_none());
    }

    #[test]
    fn first_step_resets_running() {
        let mut queue = MovementQueue::new();
        queue.set_running(true);
        queue.add_first_step(Position::ground(1, 0), Position::ground(0, 0));
        assert!(!queue.is_running());
    }

    #[test]
    fn doubling_back_retraces_previous_steps() {
        let origin = Position::ground(0, 0);
        let mut queue = MovementQueue::new();
        queue.add_first_step(Position::ground(3, 0), origin);
        let mut position = origin;
        for _ in 0..3 {
            position = queue.pulse(position).position;
        }
        assert_eq!(position, Position::ground(3, 0));

        queue.add_first_step(Position::ground(1, 0), position);
        let mut path = Vec::new();
        while !queue.is_empty() {
            position = queue.pulse(position).position;
            path.push(position.x);
        }
        assert_eq!(path, vec![2, 1]);
    }
}
