// quickfire_protocol — wire protocol for the trivia session coordinator.
//
// This crate defines the message types, framing, and serialization used by
// the coordinator (`quickfire_server`) and trivia clients to communicate
// over TCP. It is shared between both sides and has no dependency on the
// server crate.
//
// Module overview:
// - `types.rs`:    `ConnectionId` — the transport-assigned client identity.
// - `message.rs`:  Client-to-server and server-to-client message enums, plus
//                  the shared `PlayerInfo` struct.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then JSON payload.
//
// Design decisions:
// - **JSON serialization.** Human-readable on the wire, trivial to debug
//   with a packet capture. Binary framing can be swapped in later if it
//   ever matters for payloads this small.
// - **No async runtime.** Uses `std::io::Read`/`Write` for framing,
//   compatible with both blocking TCP streams and buffered wrappers.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_MESSAGE_SIZE, read_message, write_message};
pub use message::{ClientMessage, PlayerInfo, ServerMessage};
pub use types::ConnectionId;

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Serialize a ClientMessage to JSON, frame it, read it back, deserialize.
    fn client_roundtrip(msg: &ClientMessage) {
        let json = serde_json::to_vec(msg).unwrap();
        let mut wire = Vec::new();
        write_message(&mut wire, &json).unwrap();

        let mut cursor = Cursor::new(&wire);
        let recovered_json = read_message(&mut cursor).unwrap();
        let recovered: ClientMessage = serde_json::from_slice(&recovered_json).unwrap();
        assert_eq!(&recovered, msg);
    }

    /// Serialize a ServerMessage to JSON, frame it, read it back, deserialize.
    fn server_roundtrip(msg: &ServerMessage) {
        let json = serde_json::to_vec(msg).unwrap();
        let mut wire = Vec::new();
        write_message(&mut wire, &json).unwrap();

        let mut cursor = Cursor::new(&wire);
        let recovered_json = read_message(&mut cursor).unwrap();
        let recovered: ServerMessage = serde_json::from_slice(&recovered_json).unwrap();
        assert_eq!(&recovered, msg);
    }

    #[test]
    fn roundtrip_join_session() {
        client_roundtrip(&ClientMessage::JoinSession {
            username: "Ava".into(),
            is_game_master: true,
        });
    }

    #[test]
    fn roundtrip_set_question() {
        client_roundtrip(&ClientMessage::SetQuestion {
            question: "What is 2+2?".into(),
            answer: "4".into(),
        });
    }

    #[test]
    fn roundtrip_submit_guess() {
        client_roundtrip(&ClientMessage::SubmitGuess { guess: "4".into() });
    }

    #[test]
    fn roundtrip_update_players() {
        server_roundtrip(&ServerMessage::UpdatePlayers {
            players: vec![
                PlayerInfo {
                    username: "Ava".into(),
                    score: 10,
                },
                PlayerInfo {
                    username: "Ben".into(),
                    score: 0,
                },
            ],
        });
    }

    #[test]
    fn roundtrip_game_over_with_winner() {
        server_roundtrip(&ServerMessage::GameOver {
            message: "Ben answered correctly!".into(),
            answer: "4".into(),
            winner: Some("Ben".into()),
        });
    }

    #[test]
    fn roundtrip_game_over_timeout() {
        server_roundtrip(&ServerMessage::GameOver {
            message: "Time expired".into(),
            answer: "4".into(),
            winner: None,
        });
    }

    #[test]
    fn roundtrip_become_game_master() {
        server_roundtrip(&ServerMessage::BecomeGameMaster);
    }

    #[test]
    fn missing_field_fails_to_deserialize() {
        // `JoinSession` without `is_game_master` must be rejected, not
        // coerced — the reader loop treats this as a dead connection.
        let json = br#"{"JoinSession":{"username":"Ava"}}"#;
        assert!(serde_json::from_slice::<ClientMessage>(json).is_err());
    }
}
