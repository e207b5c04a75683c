//! Interactive commands typed at the client prompt.

use huddle_server::infrastructure::dto::websocket::{
    ClientEvent, CursorMovePayload, RoomPayload, TypingPayload,
};

pub const HELP: &str = "\
Commands:
  /join <room>                     join a project room
  /leave <room>                    leave a project room
  /cursor <room> <x> <y>           move your cursor
  /typing <room> <subject> on|off  start or stop typing on a subject
  /quit                            close the session";

#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Send(ClientEvent),
    Help,
    Quit,
}

impl ClientCommand {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        match (name, args.as_slice()) {
            ("/join", [room]) => Ok(Self::Send(ClientEvent::JoinRoom(room_payload(room)))),
            ("/leave", [room]) => Ok(Self::Send(ClientEvent::LeaveRoom(room_payload(room)))),
            ("/cursor", [room, x, y]) => Ok(Self::Send(ClientEvent::CursorMove(
                CursorMovePayload {
                    room_id: room.to_string(),
                    x: parse_coordinate(x)?,
                    y: parse_coordinate(y)?,
                },
            ))),
            ("/typing", [room, subject, state]) => {
                let payload = TypingPayload {
                    room_id: room.to_string(),
                    subject_id: subject.to_string(),
                };
                match *state {
                    "on" => Ok(Self::Send(ClientEvent::TypingStart(payload))),
                    "off" => Ok(Self::Send(ClientEvent::TypingStop(payload))),
                    other => Err(format!("expected 'on' or 'off', got '{}'", other)),
                }
            }
            ("/help", []) => Ok(Self::Help),
            ("/quit", []) => Ok(Self::Quit),
            ("/join" | "/leave" | "/cursor" | "/typing" | "/help" | "/quit", _) => {
                Err(format!("wrong arguments for {}, see /help", name))
            }
            _ => Err(format!("unknown command '{}', see /help", name)),
        }
    }
}

fn room_payload(room: &str) -> RoomPayload {
    RoomPayload {
        room_id: room.to_string(),
    }
}

fn parse_coordinate(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("'{}' is not a coordinate", raw)),
    }
}
