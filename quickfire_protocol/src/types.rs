// Core ID type for the trivia protocol.
//
// `ConnectionId` is the transport-assigned identity of one client socket.
// It is stable for the lifetime of the connection and compact on the wire.
// The coordinator keys every per-participant table (players, guess attempts,
// game-master role) by this id; there is no account system behind it.

use serde::{Deserialize, Serialize};

/// Transport-assigned connection ID (compact u32, ephemeral).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);
