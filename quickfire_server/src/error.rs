// Command rejection taxonomy.
//
// Every variant is a user-facing rejection, never fatal: the dispatcher in
// `server.rs` reports it to the originating connection as a `SessionError`
// message and session state is left untouched. Exhausted guess attempts are
// deliberately NOT in this enum — they are answered with a normal
// `GuessResult`, distinct from hard rejections.
//
// The display strings are the exact messages clients render.

use thiserror::Error;

/// Reasons a session command is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Join attempted while a round is running.
    #[error("Game already in progress. Cannot join now.")]
    GameInProgress,
    /// Guess submitted outside a running round.
    #[error("Game is not in progress.")]
    GameNotInProgress,
    /// A second connection claimed the game-master role.
    #[error("A game master is already defined.")]
    GameMasterTaken,
    /// Non-master tried to set the question.
    #[error("Only game master can set the question.")]
    SetQuestionNotAuthorized,
    /// Non-master tried to start a round.
    #[error("Only game master can start the game.")]
    StartGameNotAuthorized,
    /// Fewer than the minimum players at round start.
    #[error("Need at least 3 players to start the game.")]
    NotEnoughPlayers,
}
