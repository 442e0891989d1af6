// TCP client for connecting to the trivia coordinator.
//
// Provides a non-blocking interface for a caller's main thread:
// - `connect()` performs the TCP connect, then spawns a background reader
//   thread.
// - The reader thread calls `read_message()` in a loop, deserializes
//   `ServerMessage`, and pushes into an `mpsc` channel.
// - The caller holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox non-blocking; `recv_timeout()` blocks briefly
//   for callers that want to wait on a specific notification.
//
// There is no handshake: a connection becomes a player by sending
// `JoinSession`, and the server answers with an `UpdatePlayers` broadcast
// (or a `SessionError` unicast on rejection).
//
// This is the transport half only — rendering the roster, forms, and
// verdicts is left to whatever front end drives this client.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use quickfire_protocol::framing::{read_message, write_message};
use quickfire_protocol::message::{ClientMessage, ServerMessage};

/// TCP client for coordinator communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl NetClient {
    /// Connect to a coordinator and spawn a reader thread.
    pub fn connect(addr: &str) -> Result<Self, String> {
        let stream = TcpStream::connect(addr).map_err(|e| format!("connect failed: {e}"))?;
        let reader_stream = stream
            .try_clone()
            .map_err(|e| format!("clone failed: {e}"))?;
        let writer = BufWriter::new(stream);

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(BufReader::new(reader_stream), tx);
        });

        Ok(Self {
            writer,
            inbox: rx,
            _reader_thread: Some(reader_thread),
        })
    }

    /// Join the session, optionally claiming the game-master role.
    pub fn join_session(&mut self, username: &str, is_game_master: bool) -> Result<(), String> {
        let msg = ClientMessage::JoinSession {
            username: username.into(),
            is_game_master,
        };
        send_msg(&mut self.writer, &msg).map_err(|e| format!("send JoinSession failed: {e}"))
    }

    /// Set the question/answer pair (game master only).
    pub fn set_question(&mut self, question: &str, answer: &str) -> Result<(), String> {
        let msg = ClientMessage::SetQuestion {
            question: question.into(),
            answer: answer.into(),
        };
        send_msg(&mut self.writer, &msg).map_err(|e| format!("send SetQuestion failed: {e}"))
    }

    /// Start a round (game master only).
    pub fn start_game(&mut self) -> Result<(), String> {
        send_msg(&mut self.writer, &ClientMessage::StartGame)
            .map_err(|e| format!("send StartGame failed: {e}"))
    }

    /// Submit a guess for the running round.
    pub fn submit_guess(&mut self, guess: &str) -> Result<(), String> {
        let msg = ClientMessage::SubmitGuess {
            guess: guess.into(),
        };
        send_msg(&mut self.writer, &msg).map_err(|e| format!("send SubmitGuess failed: {e}"))
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&mut self) {
        let _ = send_msg(&mut self.writer, &ClientMessage::Goodbye);
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Wait up to `timeout` for the next server message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        self.inbox.recv_timeout(timeout).ok()
    }
}

/// Serialize a `ClientMessage` to JSON and write with length-delimited framing.
fn send_msg(writer: &mut BufWriter<TcpStream>, msg: &ClientMessage) -> Result<(), String> {
    let json = serde_json::to_vec(msg).map_err(|e| e.to_string())?;
    write_message(writer, &json).map_err(|e| e.to_string())
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(bytes) = read_message(&mut reader) {
        match serde_json::from_slice::<ServerMessage>(&bytes) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Main thread dropped the receiver
                }
            }
            Err(_) => break, // Malformed message
        }
    }
}
