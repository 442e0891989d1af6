// TCP server and main event loop for the trivia coordinator.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per client): call `framing::read_message()` in a
//   loop, deserialize `ClientMessage`, and send `InternalEvent::MessageFrom`
//   to the main thread. On error/EOF, send `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Session`, receives events from the channel,
//   and dispatches them. The `recv_timeout` duration is derived from the
//   round deadline when a round is running — when it elapses with no events
//   waiting, the round timeout fires. This gives us a cancellable one-shot
//   timer without a separate timer thread: rearming is overwriting the
//   deadline, cancelling is clearing it.
//
// Each event handler runs to completion on the main thread before the next
// one starts, so command handling and the timeout fire never interleave
// mid-mutation. Commands from one connection arrive in the order sent (one
// reader thread per socket, FIFO channel).
//
// The main thread is the only writer to client TCP streams (via
// `Session::broadcast`/`send_to`). Reader threads only read from streams.
// This avoids concurrent read/write on the same `TcpStream`, which is safe
// on most platforms but fragile.
//
// Shutdown: the main thread checks a `keep_running` flag (set to false by
// `ServerHandle::stop`) and breaks out of the event loop.

use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use quickfire_protocol::framing::read_message;
use quickfire_protocol::message::ClientMessage;
use quickfire_protocol::types::ConnectionId;
use tracing::{info, warn};

use crate::session::{ROUND_DURATION, Session};

/// How long the event loop sleeps between `keep_running` checks while no
/// round deadline is pending.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
}

/// Handle returned by `start_server` to control the running coordinator.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a coordinator.
pub struct ServerConfig {
    pub port: u16,
    pub round_duration: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            round_duration: ROUND_DURATION,
        }
    }
}

/// Start the coordinator on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used
/// to let the OS pick a free port).
pub fn start_server(config: ServerConfig) -> std::io::Result<(ServerHandle, std::net::SocketAddr)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port))?;
    let addr = listener.local_addr()?;
    info!(%addr, "coordinator listening");
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || {
        run_server(listener, config, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main event loop. Runs until `keep_running` is set to false.
fn run_server(listener: TcpListener, config: ServerConfig, keep_running: Arc<AtomicBool>) {
    let mut session = Session::new(config.round_duration);

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Set the listener to non-blocking so the accept thread can check
    // keep_running periodically.
    listener.set_nonblocking(true).ok();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        // Wait for the next event, but never past the round deadline.
        let timeout = session
            .time_until_round_timeout(Instant::now())
            .map_or(IDLE_POLL, |remaining| remaining.min(IDLE_POLL));

        match rx.recv_timeout(timeout) {
            Ok(event) => {
                handle_event(&mut session, event, &tx, &keep_running);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut session, event, &tx, &keep_running);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        // Runs after every batch of events as well as on quiet wakeups, so a
        // deadline that passed while commands streamed in still fires here —
        // guarded internally against rounds that already resolved.
        session.fire_round_timeout_if_due(Instant::now());
    }
}

/// Dispatch a single event to the session.
fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(session, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom {
            connection_id,
            message,
        } => {
            handle_message(session, connection_id, message);
        }
        InternalEvent::Disconnected { connection_id } => {
            info!(id = connection_id.0, "client disconnected");
            session.handle_disconnect(connection_id);
        }
    }
}

/// Register a new connection with the session and spawn its reader thread.
/// The connection gets its transport identity immediately; it becomes a
/// player only once it sends `JoinSession`.
fn handle_new_connection(
    session: &mut Session,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let reader_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!("failed to clone accepted stream: {e}");
            return;
        }
    };
    let connection_id = session.add_connection(stream);
    info!(id = connection_id.0, "new client connected");

    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(
            BufReader::new(reader_stream),
            connection_id,
            tx_reader,
            keep_running_reader,
        );
    });
}

/// Reader loop for a single client. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    connection_id: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_message(&mut reader) {
            Ok(bytes) => match serde_json::from_slice::<ClientMessage>(&bytes) {
                Ok(ClientMessage::Goodbye) => {
                    let _ = tx.send(InternalEvent::Disconnected { connection_id });
                    break;
                }
                Ok(message) => {
                    let _ = tx.send(InternalEvent::MessageFrom {
                        connection_id,
                        message,
                    });
                }
                Err(_) => {
                    // Malformed or ill-typed payload — drop the connection
                    // rather than guess at the sender's intent.
                    let _ = tx.send(InternalEvent::Disconnected { connection_id });
                    break;
                }
            },
            Err(_) => {
                // Read error or EOF — disconnect.
                let _ = tx.send(InternalEvent::Disconnected { connection_id });
                break;
            }
        }
    }
}

/// Dispatch one client command. Rejections go back to the sender only;
/// they never mutate session state.
fn handle_message(session: &mut Session, connection_id: ConnectionId, message: ClientMessage) {
    let result = match message {
        ClientMessage::JoinSession {
            username,
            is_game_master,
        } => session.join_session(connection_id, username, is_game_master),
        ClientMessage::SetQuestion { question, answer } => {
            session.set_question(connection_id, question, answer)
        }
        ClientMessage::StartGame => session.start_game(connection_id),
        ClientMessage::SubmitGuess { guess } => session.submit_guess(connection_id, guess),
        // Goodbye is handled in the reader loop.
        ClientMessage::Goodbye => Ok(()),
    };
    if let Err(err) = result {
        session.send_error(connection_id, &err);
    }
}
