pub mod generator;
pub mod quota;
pub mod session_state;

/// Represents commands that the core logic (`JokeSession`) issues to the runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (like rendering on the
/// glasses display).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Render a full-screen text message in the user's display.
    ShowTextWall(String),
}
