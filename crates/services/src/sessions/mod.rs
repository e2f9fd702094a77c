mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use progress::SessionSnapshot;
pub use service::{DEFAULT_ADVANCE_DELAY, QuizSessionService};
pub use workflow::{EXCLUSION_WINDOW, QuizCompletion, QuizLoopService};
