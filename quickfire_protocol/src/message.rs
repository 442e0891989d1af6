// Protocol messages for client-coordinator communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by trivia clients to the session coordinator.
// - `ServerMessage`: sent by the session coordinator to clients.
//
// `PlayerInfo` is the public view of one participant, shared by both
// directions. All types derive `Serialize`/`Deserialize` for JSON framing
// (see `framing.rs`).
//
// The answer string never appears in any broadcast until a round resolves:
// `QuestionSet` and `GameStarted` carry only the question, `GameOver` reveals
// the answer once the round is decided.

use serde::{Deserialize, Serialize};

/// Messages sent by a client to the coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the session, optionally claiming the game-master role.
    JoinSession {
        username: String,
        is_game_master: bool,
    },
    /// Set the current question/answer pair (game master only).
    SetQuestion { question: String, answer: String },
    /// Start a timed round on the current question (game master only).
    StartGame,
    /// Submit a guess for the running round.
    SubmitGuess { guess: String },
    /// Player is leaving gracefully.
    Goodbye,
}

/// Messages sent by the coordinator to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Current roster with scores (broadcast after every roster change).
    UpdatePlayers { players: Vec<PlayerInfo> },
    /// A command was rejected (unicast to the offender, state unchanged).
    SessionError { message: String },
    /// A new question is set (broadcast; the answer stays server-side).
    QuestionSet { question: String },
    /// A round started (broadcast).
    GameStarted { question: String },
    /// Verdict on one guess (unicast to the guesser).
    GuessResult { correct: bool, message: String },
    /// The round resolved — correct guess or timeout (broadcast).
    /// `winner` is present only when someone answered correctly.
    GameOver {
        message: String,
        answer: String,
        winner: Option<String>,
    },
    /// The game master left (broadcast).
    SessionEnded { message: String },
    /// You are the new game master (unicast to the successor).
    BecomeGameMaster,
}

/// Public identity of one participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub username: String,
    pub score: u32,
}
