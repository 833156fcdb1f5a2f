//! Scripted operator input

use std::collections::VecDeque;

use crate::common::{InputSource, Point2D};

/// Input source that replays a fixed list of endpoint picks and can raise a
/// quit signal after a number of polls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    endpoints: VecDeque<Point2D>,
    quit_after: Option<usize>,
    polls: usize,
}

impl ScriptedInput {
    pub fn new(endpoints: impl IntoIterator<Item = Point2D>) -> Self {
        Self {
            endpoints: endpoints.into_iter().collect(),
            quit_after: None,
            polls: 0,
        }
    }

    /// Pick `start` then `goal`
    pub fn start_goal(start: Point2D, goal: Point2D) -> Self {
        Self::new([start, goal])
    }

    /// Request quit once `polls` quit checks have passed
    pub fn with_quit_after(mut self, polls: usize) -> Self {
        self.quit_after = Some(polls);
        self
    }
}

impl InputSource for ScriptedInput {
    fn next_endpoint(&mut self) -> Option<Point2D> {
        self.endpoints.pop_front()
    }

    fn quit_requested(&mut self) -> bool {
        let quit = self.quit_after.map_or(false, |n| self.polls >= n);
        self.polls += 1;
        quit
    }
}
