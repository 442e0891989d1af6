// Integration smoke test for the trivia coordinator.
//
// Starts a coordinator on localhost, connects real clients over TCP, and
// exercises the full protocol lifecycle: joining, question setup, round
// start, wrong and correct guesses, round timeout, and game-master
// succession on disconnect. Each client is a `NetClient` from the library —
// no front end involved.

use std::net::TcpStream;
use std::time::{Duration, Instant};

use quickfire_protocol::framing::write_message;
use quickfire_protocol::message::{ClientMessage, ServerMessage};
use quickfire_server::client::NetClient;
use quickfire_server::server::{ServerConfig, start_server};

/// Wait up to 3 s for a message matching `pred`, discarding everything else.
fn recv_until<F: Fn(&ServerMessage) -> bool>(client: &NetClient, pred: F) -> ServerMessage {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if let Some(msg) = client.recv_timeout(Duration::from_millis(200)) {
            if pred(&msg) {
                return msg;
            }
        }
    }
    panic!("timed out waiting for expected message");
}

/// Collect every message arriving within `dur`.
fn collect_for(client: &NetClient, dur: Duration) -> Vec<ServerMessage> {
    let deadline = Instant::now() + dur;
    let mut out = Vec::new();
    while Instant::now() < deadline {
        if let Some(msg) = client.recv_timeout(Duration::from_millis(50)) {
            out.push(msg);
        }
    }
    out
}

/// Start a coordinator on a free port and connect a master plus two players.
fn three_player_session(
    round_duration: Duration,
) -> (
    quickfire_server::server::ServerHandle,
    NetClient,
    NetClient,
    NetClient,
) {
    let config = ServerConfig {
        port: 0, // OS picks a free port
        round_duration,
    };
    let (handle, addr) = start_server(config).unwrap();
    let addr = addr.to_string();

    let mut master = NetClient::connect(&addr).unwrap();
    master.join_session("Ava", true).unwrap();
    recv_until(&master, |m| {
        matches!(m, ServerMessage::UpdatePlayers { players } if players.len() == 1)
    });

    let mut ben = NetClient::connect(&addr).unwrap();
    ben.join_session("Ben", false).unwrap();
    let mut cal = NetClient::connect(&addr).unwrap();
    cal.join_session("Cal", false).unwrap();

    // Everyone sees the full roster before the test proper starts.
    for client in [&master, &ben, &cal] {
        recv_until(client, |m| {
            matches!(m, ServerMessage::UpdatePlayers { players } if players.len() == 3)
        });
    }

    (handle, master, ben, cal)
}

#[test]
fn full_round_lifecycle() {
    let (handle, mut master, mut ben, mut cal) = three_player_session(Duration::from_secs(60));

    // Master sets the question; the broadcast carries no answer.
    master.set_question("What is 2+2?", "4").unwrap();
    for client in [&master, &ben, &cal] {
        let msg = recv_until(client, |m| matches!(m, ServerMessage::QuestionSet { .. }));
        assert!(matches!(
            msg,
            ServerMessage::QuestionSet { question } if question == "What is 2+2?"
        ));
    }

    master.start_game().unwrap();
    for client in [&master, &ben, &cal] {
        recv_until(client, |m| matches!(m, ServerMessage::GameStarted { .. }));
    }

    // Ben guesses wrong — the verdict is unicast to Ben.
    ben.submit_guess("5").unwrap();
    let msg = recv_until(&ben, |m| matches!(m, ServerMessage::GuessResult { .. }));
    assert!(matches!(
        msg,
        ServerMessage::GuessResult { correct: false, .. }
    ));

    // Cal guesses right — everyone gets GameOver naming the winner.
    cal.submit_guess("4").unwrap();
    for client in [&master, &ben, &cal] {
        let msg = recv_until(client, |m| matches!(m, ServerMessage::GameOver { .. }));
        match msg {
            ServerMessage::GameOver {
                answer, winner, ..
            } => {
                assert_eq!(answer, "4");
                assert_eq!(winner.as_deref(), Some("Cal"));
            }
            other => panic!("expected GameOver, got {other:?}"),
        }
    }

    // Succession ran: the refreshed roster shows Cal's 10 points.
    let msg = recv_until(&ben, |m| matches!(m, ServerMessage::UpdatePlayers { .. }));
    match msg {
        ServerMessage::UpdatePlayers { players } => {
            let cal_entry = players.iter().find(|p| p.username == "Cal").unwrap();
            assert_eq!(cal_entry.score, 10);
        }
        other => panic!("expected UpdatePlayers, got {other:?}"),
    }

    handle.stop();
}

#[test]
fn join_and_start_rejections() {
    let config = ServerConfig {
        port: 0,
        round_duration: Duration::from_secs(60),
    };
    let (handle, addr) = start_server(config).unwrap();
    let addr = addr.to_string();

    let mut master = NetClient::connect(&addr).unwrap();
    master.join_session("Ava", true).unwrap();

    // A second game master is rejected.
    let mut impostor = NetClient::connect(&addr).unwrap();
    impostor.join_session("Zed", true).unwrap();
    let msg = recv_until(&impostor, |m| matches!(m, ServerMessage::SessionError { .. }));
    assert!(matches!(
        msg,
        ServerMessage::SessionError { message } if message == "A game master is already defined."
    ));

    // Starting with fewer than three players is rejected.
    master.start_game().unwrap();
    let msg = recv_until(&master, |m| matches!(m, ServerMessage::SessionError { .. }));
    assert!(matches!(
        msg,
        ServerMessage::SessionError { message }
            if message == "Need at least 3 players to start the game."
    ));

    handle.stop();
}

#[test]
fn master_disconnect_triggers_succession() {
    let (handle, mut master, ben, cal) = three_player_session(Duration::from_secs(60));

    master.disconnect();

    // Succession sends BecomeGameMaster before SessionEnded, so collect the
    // whole burst instead of waiting message by message.
    let ben_msgs = collect_for(&ben, Duration::from_secs(1));
    let cal_msgs = collect_for(&cal, Duration::from_secs(1));

    for msgs in [&ben_msgs, &cal_msgs] {
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::SessionEnded { message }
                if message == "Game master left. A new game master has been assigned."
        )));
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::UpdatePlayers { players } if players.len() == 2
        )));
    }

    // Exactly one of the remaining players was promoted.
    let ben_promoted = ben_msgs
        .iter()
        .any(|m| matches!(m, ServerMessage::BecomeGameMaster));
    let cal_promoted = cal_msgs
        .iter()
        .any(|m| matches!(m, ServerMessage::BecomeGameMaster));
    assert!(
        ben_promoted != cal_promoted,
        "expected exactly one successor, got ben={ben_promoted} cal={cal_promoted}"
    );

    handle.stop();
}

#[test]
fn malformed_frame_drops_the_sender() {
    let config = ServerConfig {
        port: 0,
        round_duration: Duration::from_secs(60),
    };
    let (handle, addr) = start_server(config).unwrap();
    let addr = addr.to_string();

    let mut master = NetClient::connect(&addr).unwrap();
    master.join_session("Ava", true).unwrap();

    // A raw socket that speaks the framing by hand.
    let mut raw = TcpStream::connect(&addr).unwrap();
    let join = serde_json::to_vec(&ClientMessage::JoinSession {
        username: "Zed".into(),
        is_game_master: false,
    })
    .unwrap();
    write_message(&mut raw, &join).unwrap();
    recv_until(&master, |m| {
        matches!(m, ServerMessage::UpdatePlayers { players } if players.len() == 2)
    });

    // A well-framed but undecodable payload gets the sender dropped, seen
    // here as the roster shrinking back to one.
    write_message(&mut raw, b"not json at all").unwrap();
    recv_until(&master, |m| {
        matches!(m, ServerMessage::UpdatePlayers { players } if players.len() == 1)
    });

    handle.stop();
}

#[test]
fn round_timeout_broadcasts_game_over() {
    let (handle, mut master, ben, cal) = three_player_session(Duration::from_millis(300));

    master.set_question("What is 2+2?", "4").unwrap();
    master.start_game().unwrap();

    // Nobody guesses; the deadline resolves the round.
    for client in [&master, &ben, &cal] {
        let msg = recv_until(client, |m| matches!(m, ServerMessage::GameOver { .. }));
        match msg {
            ServerMessage::GameOver {
                message,
                answer,
                winner,
            } => {
                assert_eq!(message, "Time expired");
                assert_eq!(answer, "4");
                assert_eq!(winner, None);
            }
            other => panic!("expected GameOver, got {other:?}"),
        }
    }

    handle.stop();
}
