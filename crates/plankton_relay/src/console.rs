//! # Operator Console
//!
//! Line commands read from the server's stdin:
//!
//! | Command             | Effect                              |
//! |---------------------|-------------------------------------|
//! | `report server`     | lobby, room and traffic totals      |
//! | `report room <id>`  | members of one room                 |
//! | `report time`       | current server clock                |
//! | `exit`              | stop the server                     |

use crate::report::{RoomReport, ServerReport};
use crate::server::ServerState;
use crate::transport::Transport;
use crate::types::RoomId;

/// A parsed console line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Print [`ServerReport`].
    ReportServer,
    /// Print [`RoomReport`] for a room.
    ReportRoom(RoomId),
    /// Print the server clock.
    ReportTime,
    /// Shut down.
    Exit,
}

impl ConsoleCommand {
    /// Parses one line; whitespace-insensitive, `None` for anything unknown.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match (words.next()?, words.next(), words.next()) {
            ("exit", None, None) => Self::Exit,
            ("report", Some("server"), None) => Self::ReportServer,
            ("report", Some("time"), None) => Self::ReportTime,
            ("report", Some("room"), Some(id)) => Self::ReportRoom(RoomId(id.parse().ok()?)),
            _ => return None,
        };
        words.next().is_none().then_some(command)
    }

    /// Produces the text to print. `Exit` produces nothing.
    #[must_use]
    pub fn execute(self, state: &ServerState, transport: &dyn Transport) -> Option<String> {
        match self {
            Self::ReportServer => Some(ServerReport::capture(state, transport).to_string()),
            Self::ReportRoom(id) => Some(
                RoomReport::capture(state, id)
                    .map_or_else(|| format!("Room {id} does not exist"), |r| r.to_string()),
            ),
            Self::ReportTime => Some(format!("Server time: {}ms", state.now_ms())),
            Self::Exit => None,
        }
    }
}
