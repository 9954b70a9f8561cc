pub mod catch_up;
pub mod cursor;
pub mod diff;
pub mod error;
pub mod player;
pub mod session;

pub use catch_up::{catch_up, replay_cap, CatchUp};
pub use cursor::{Boundary, Cursors, Direction, Move};
pub use diff::{diff_ui_state, plan_apply, ApplyPlan};
pub use error::ReplayError;
pub use player::{Player, StepOptions, StepOutcome, StepReport};
pub use session::ReplaySession;
