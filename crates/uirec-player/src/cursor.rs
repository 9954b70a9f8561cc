//! The two replay cursors as a value type with guarded transitions.
//!
//! Both cursors range over `-1..len`. A transition that would leave that
//! range returns a [`Boundary`] and the caller keeps its old value, so a
//! refused step never moves anything.

// ── Types ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Which end of the recording a refused step ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    End,
    Beginning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    ForwardState,
    ForwardCommit,
    BackState,
    BackCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    state: isize,
    commit: isize,
    len: usize,
}

impl Default for Cursors {
    fn default() -> Self {
        Self::new(0)
    }
}

// ── Transitions ──

impl Cursors {
    /// Both cursors before the first entry of a recording of `len` entries.
    pub fn new(len: usize) -> Self {
        Self {
            state: -1,
            commit: -1,
            len,
        }
    }

    pub fn state_index(&self) -> isize {
        self.state
    }

    pub fn commit_index(&self) -> isize {
        self.commit
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn forward_state(self) -> Result<Self, Boundary> {
        let state = self.advance(self.state)?;
        Ok(Self { state, ..self })
    }

    pub fn forward_commit(self) -> Result<Self, Boundary> {
        let commit = self.advance(self.commit)?;
        Ok(Self { commit, ..self })
    }

    pub fn back_state(self) -> Result<Self, Boundary> {
        let state = Self::retreat(self.state)?;
        Ok(Self { state, ..self })
    }

    pub fn back_commit(self) -> Result<Self, Boundary> {
        let commit = Self::retreat(self.commit)?;
        Ok(Self { commit, ..self })
    }

    fn advance(&self, index: isize) -> Result<isize, Boundary> {
        let next = index + 1;
        if next >= self.len as isize {
            Err(Boundary::End)
        } else {
            Ok(next)
        }
    }

    fn retreat(index: isize) -> Result<isize, Boundary> {
        let next = index - 1;
        if next < 0 {
            Err(Boundary::Beginning)
        } else {
            Ok(next)
        }
    }

    // ── Driver helpers ──

    /// The step the driver takes next in `direction`.
    ///
    /// Forward moves state first and catches the commit up; backward undoes
    /// the commit first and then the state.
    pub fn next_move(&self, direction: Direction) -> Move {
        let level = self.state == self.commit;
        match (direction, level) {
            (Direction::Forward, true) => Move::ForwardState,
            (Direction::Forward, false) => Move::ForwardCommit,
            (Direction::Back, true) => Move::BackCommit,
            (Direction::Back, false) => Move::BackState,
        }
    }

    pub fn can_step_forward(&self) -> bool {
        self.commit < self.len as isize - 1
    }

    pub fn can_step_back(&self) -> bool {
        self.state > 0
    }

    /// `(steps taken, total steps)`; every entry counts one state and one
    /// commit step.
    pub fn progress(&self) -> (usize, usize) {
        let done = (self.state + self.commit + 2).max(0) as usize;
        (done, self.len * 2)
    }
}
