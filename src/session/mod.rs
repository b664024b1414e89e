pub mod clock;
pub mod config;
pub mod controller;
pub mod machine;
pub mod state;

pub use clock::{ClockControl, SessionClock};
pub use config::{
    Difficulty, Exercise, ExerciseCatalog, SessionConfig, SessionSelection, TimeLimit,
    TIME_LIMIT_OPTIONS,
};
pub use controller::SessionController;
pub use machine::{SessionMachine, TickOutcome, Transition};
pub use state::{
    format_clock, FinishReason, PostureInfo, SessionPhase, SessionResult, SessionSnapshot,
    SessionState, SessionSummary,
};
