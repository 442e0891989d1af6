// Session state for the trivia coordinator.
//
// `Session` is the central data structure that `server.rs` drives. It tracks
// connected sockets, the player roster with scores, the game-master role, the
// current question/answer pair, per-player guess attempts, and the round
// deadline. All mutation happens through methods called from the server's
// single-threaded main loop — no internal locking.
//
// Key responsibilities:
// - Roster management: join players (optionally as game master), remove them
//   on disconnect, broadcast the roster after every change.
// - Round lifecycle: `start_game` arms the deadline, `submit_guess` resolves
//   the round on a correct answer, `fire_round_timeout_if_due` resolves it
//   on timeout. Every resolution path runs game-master succession.
// - Attempt budget: each player gets `MAX_GUESS_ATTEMPTS` scoring guesses per
//   question; the counter is cleared when a new question is set.
//
// The round timer is not a separate thread: the deadline is an
// `Option<Instant>` and the event loop uses it as its `recv_timeout`. A
// correct guess clears the deadline in the same serialized step that flips
// `in_progress` (cancellation); the timeout path re-checks `in_progress`
// before acting, so a fire that races a resolution is a no-op.
//
// Writing to client streams: `Session` holds `BufWriter<TcpStream>` write
// halves for every accepted connection, joined or not — broadcasts reach
// everyone connected. Write errors on a single client are swallowed; the
// reader thread for that client will detect the broken pipe and report a
// `Disconnected` event.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use quickfire_protocol::framing::write_message;
use quickfire_protocol::message::{PlayerInfo, ServerMessage};
use quickfire_protocol::types::ConnectionId;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::error::SessionError;

/// Length of one round.
pub const ROUND_DURATION: Duration = Duration::from_secs(60);

/// Scoring guesses allowed per player per question. Guesses past the budget
/// are still counted but always rejected.
pub const MAX_GUESS_ATTEMPTS: u32 = 3;

/// Points awarded for a correct answer.
pub const CORRECT_GUESS_POINTS: u32 = 10;

/// Minimum players needed to start a round. The game master has a roster
/// entry too and counts toward this.
pub const MIN_PLAYERS_TO_START: usize = 3;

/// The single authoritative trivia session.
pub struct Session {
    // Transport state — survives game resets.
    connections: BTreeMap<ConnectionId, BufWriter<TcpStream>>,
    next_connection_id: u32,
    round_duration: Duration,

    // Game state — everything below is wiped by `reset_game`.
    game_master: Option<ConnectionId>,
    question: String,
    answer: String,
    in_progress: bool,
    players: BTreeMap<ConnectionId, Player>,
    guess_attempts: BTreeMap<ConnectionId, u32>,
    round_deadline: Option<Instant>,
}

struct Player {
    username: String,
    score: u32,
}

impl Session {
    pub fn new(round_duration: Duration) -> Self {
        Self {
            connections: BTreeMap::new(),
            next_connection_id: 0,
            round_duration,
            game_master: None,
            question: String::new(),
            answer: String::new(),
            in_progress: false,
            players: BTreeMap::new(),
            guess_attempts: BTreeMap::new(),
            round_deadline: None,
        }
    }

    /// Register a newly accepted socket and return its transport identity.
    /// The connection is not a player until it sends `JoinSession`.
    pub fn add_connection(&mut self, stream: TcpStream) -> ConnectionId {
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        self.connections.insert(id, BufWriter::new(stream));
        id
    }

    /// Join the session, optionally claiming the game-master role.
    ///
    /// Rejected while a round is running, and when a second connection asks
    /// for the game-master role. Joining as a plain player with a master
    /// already defined is always accepted. Re-joining overwrites the caller's
    /// roster entry (score back to zero).
    pub fn join_session(
        &mut self,
        id: ConnectionId,
        username: String,
        wants_game_master: bool,
    ) -> Result<(), SessionError> {
        if self.in_progress {
            return Err(SessionError::GameInProgress);
        }
        if wants_game_master {
            if self.game_master.is_some() {
                return Err(SessionError::GameMasterTaken);
            }
            self.game_master = Some(id);
        }
        info!(id = id.0, username = %username, wants_game_master, "player joined");
        self.players.insert(id, Player { username, score: 0 });
        self.broadcast_player_list();
        Ok(())
    }

    /// Set the question/answer pair for the next round (game master only).
    ///
    /// The question is stored verbatim, the answer lower-cased for
    /// case-insensitive comparison. Clears every guess-attempt counter —
    /// a fresh budget for everyone.
    pub fn set_question(
        &mut self,
        id: ConnectionId,
        question: String,
        answer: String,
    ) -> Result<(), SessionError> {
        if self.game_master != Some(id) {
            return Err(SessionError::SetQuestionNotAuthorized);
        }
        self.question = question;
        self.answer = answer.to_lowercase();
        self.guess_attempts.clear();
        let msg = ServerMessage::QuestionSet {
            question: self.question.clone(),
        };
        self.broadcast(&msg);
        Ok(())
    }

    /// Start a timed round on the current question (game master only,
    /// minimum roster size enforced).
    ///
    /// Arming the deadline overwrites any previous one, so at most one timer
    /// is ever live even if the master restarts mid-round.
    pub fn start_game(&mut self, id: ConnectionId) -> Result<(), SessionError> {
        if self.game_master != Some(id) {
            return Err(SessionError::StartGameNotAuthorized);
        }
        if self.players.len() < MIN_PLAYERS_TO_START {
            return Err(SessionError::NotEnoughPlayers);
        }
        self.in_progress = true;
        info!(players = self.players.len(), "round started");
        let msg = ServerMessage::GameStarted {
            question: self.question.clone(),
        };
        self.broadcast(&msg);
        self.round_deadline = Some(Instant::now() + self.round_duration);
        Ok(())
    }

    /// Evaluate one guess from `id`.
    ///
    /// Attempts are counted before the budget check, so the counter keeps
    /// growing past the cap but every over-budget guess gets the same
    /// rejection — even one matching the answer. A correct in-budget guess
    /// awards points, resolves the round, cancels the pending timeout, and
    /// runs succession.
    pub fn submit_guess(&mut self, id: ConnectionId, guess: String) -> Result<(), SessionError> {
        if !self.in_progress {
            return Err(SessionError::GameNotInProgress);
        }
        let guess = guess.to_lowercase();
        let attempts = self.guess_attempts.entry(id).or_insert(0);
        *attempts += 1;
        if *attempts > MAX_GUESS_ATTEMPTS {
            debug!(id = id.0, "guess rejected: attempts exhausted");
            let msg = ServerMessage::GuessResult {
                correct: false,
                message: "No more attempts allowed.".into(),
            };
            self.send_to(id, &msg);
            return Ok(());
        }
        if guess == self.answer {
            // A connection that never joined has no roster entry to credit;
            // its guess falls through to the incorrect path below.
            if let Some(player) = self.players.get_mut(&id) {
                player.score += CORRECT_GUESS_POINTS;
                let winner = player.username.clone();
                self.in_progress = false;
                self.round_deadline = None;
                info!(id = id.0, winner = %winner, "round resolved by correct guess");
                let msg = ServerMessage::GameOver {
                    message: format!("{winner} answered correctly!"),
                    answer: self.answer.clone(),
                    winner: Some(winner),
                };
                self.broadcast(&msg);
                self.assign_new_game_master();
                return Ok(());
            }
        }
        let msg = ServerMessage::GuessResult {
            correct: false,
            message: "Incorrect guess. Try again if you have attempts remaining.".into(),
        };
        self.send_to(id, &msg);
        Ok(())
    }

    /// Transport-originated departure. Never rejected.
    ///
    /// A departing game master triggers succession (or a full reset when no
    /// one is left); a departing plain player just shrinks the roster. Either
    /// way, the session returns to its initial form once the roster empties.
    pub fn handle_disconnect(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
        self.players.remove(&id);
        if self.game_master == Some(id) {
            self.game_master = None;
            if self.players.is_empty() {
                info!(id = id.0, "game master left, session ended");
                self.reset_game();
                self.broadcast(&ServerMessage::SessionEnded {
                    message: "Game master left. Session ended.".into(),
                });
            } else {
                info!(id = id.0, "game master left, running succession");
                self.assign_new_game_master();
                self.broadcast(&ServerMessage::SessionEnded {
                    message: "Game master left. A new game master has been assigned.".into(),
                });
            }
        } else {
            self.broadcast_player_list();
            if self.players.is_empty() {
                self.reset_game();
            }
        }
    }

    /// Remaining time until the round deadline, if a timer is live.
    /// The event loop uses this as its `recv_timeout`.
    pub fn time_until_round_timeout(&self, now: Instant) -> Option<Duration> {
        self.round_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Resolve the round by timeout if the deadline has passed.
    ///
    /// Re-checks `in_progress` after consuming the deadline: a round resolved
    /// between scheduling and firing leaves this a no-op. The guard, not
    /// cancellation alone, is what prevents a double `GameOver`.
    pub fn fire_round_timeout_if_due(&mut self, now: Instant) {
        let due = self.round_deadline.is_some_and(|deadline| now >= deadline);
        if !due {
            return;
        }
        self.round_deadline = None;
        if !self.in_progress {
            return;
        }
        self.in_progress = false;
        info!("round resolved by timeout");
        let msg = ServerMessage::GameOver {
            message: "Time expired".into(),
            answer: self.answer.clone(),
            winner: None,
        };
        self.broadcast(&msg);
        self.assign_new_game_master();
    }

    /// Report a rejection to the offending connection only.
    pub fn send_error(&mut self, id: ConnectionId, err: &SessionError) {
        let msg = ServerMessage::SessionError {
            message: err.to_string(),
        };
        self.send_to(id, &msg);
    }

    /// Succession: hand the game-master role to one current player chosen
    /// uniformly at random (after a round resolution this can be the
    /// incumbent again). Resets the session instead when no players remain.
    ///
    /// Does not touch the question, answer, or attempt counters — only a
    /// full reset or `set_question` clears those.
    fn assign_new_game_master(&mut self) {
        if self.players.is_empty() {
            self.reset_game();
            return;
        }
        let ids: Vec<ConnectionId> = self.players.keys().copied().collect();
        if let Some(&new_master) = ids.choose(&mut rand::thread_rng()) {
            self.game_master = Some(new_master);
            info!(id = new_master.0, "new game master assigned");
            self.send_to(new_master, &ServerMessage::BecomeGameMaster);
            self.broadcast_player_list();
        }
    }

    /// Restore the initial game state. Open sockets stay registered —
    /// connections are transport state, not game state.
    fn reset_game(&mut self) {
        self.game_master = None;
        self.question.clear();
        self.answer.clear();
        self.in_progress = false;
        self.players.clear();
        self.guess_attempts.clear();
        self.round_deadline = None;
    }

    /// Current roster in broadcast form.
    pub fn player_list(&self) -> Vec<PlayerInfo> {
        self.players
            .values()
            .map(|p| PlayerInfo {
                username: p.username.clone(),
                score: p.score,
            })
            .collect()
    }

    /// Returns the number of joined players (not raw connections).
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Returns true while a round is running.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Returns the connection currently holding the game-master role.
    pub fn game_master(&self) -> Option<ConnectionId> {
        self.game_master
    }

    /// Returns a player's score, or `None` for connections that never joined.
    pub fn score_of(&self, id: ConnectionId) -> Option<u32> {
        self.players.get(&id).map(|p| p.score)
    }

    /// Returns how many guesses `id` has submitted for the current question.
    pub fn attempt_count(&self, id: ConnectionId) -> u32 {
        self.guess_attempts.get(&id).copied().unwrap_or(0)
    }

    fn broadcast_player_list(&mut self) {
        let msg = ServerMessage::UpdatePlayers {
            players: self.player_list(),
        };
        self.broadcast(&msg);
    }

    /// Send a message to one connection. Silently ignores write errors
    /// (the reader thread will detect the broken pipe).
    fn send_to(&mut self, id: ConnectionId, msg: &ServerMessage) {
        if let Some(writer) = self.connections.get_mut(&id) {
            let _ = send_message(writer, msg);
        }
    }

    /// Broadcast a message to every connection, joined or not.
    fn broadcast(&mut self, msg: &ServerMessage) {
        let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for id in ids {
            self.send_to(id, msg);
        }
    }
}

/// Serialize a `ServerMessage` to JSON and write it with length-delimited
/// framing. Returns any error (caller decides whether to log or propagate).
fn send_message(
    writer: &mut BufWriter<TcpStream>,
    msg: &ServerMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)?;
    Ok(())
}
