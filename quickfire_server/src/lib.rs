// quickfire_server — real-time trivia session coordinator.
//
// One game master sets a question/answer pair and starts a 60-second round;
// everyone else guesses over a persistent connection. The coordinator tracks
// scores, enforces a three-guess budget per player per question, reassigns
// the game-master role when its holder leaves, and ends rounds on correct
// guess or timeout. Exactly one session exists per process.
//
// Module overview:
// - `session.rs`: Session state machine — roster, scores, game-master role,
//                 attempt budgets, round deadline. The core data structure
//                 that `server.rs` drives.
// - `server.rs`:  TCP listener, reader threads (one per client), and the
//                 main event loop. Uses `std::net` with a thread-per-reader
//                 architecture and an `mpsc` channel to funnel events into
//                 the single-threaded `Session`.
// - `client.rs`:  Thin transport client, used by the integration tests and
//                 by any front end that drives the coordinator.
// - `error.rs`:   The `SessionError` rejection taxonomy.
//
// The coordinator can run as a standalone binary (`main.rs`) or be embedded
// in another process via the library API (`start_server`).

pub mod client;
pub mod error;
pub mod server;
pub mod session;

pub use server::start_server;
