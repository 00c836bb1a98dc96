//! Newline-delimited JSON protocol.
//!
//! Every message is a single JSON object followed by `\n`. Inbound lines are
//! decoded independently, so one bad line never poisons the stream; callers
//! simply drop whatever [`decode_line`] rejects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::snapshot::StateSnapshot;
use crate::MoveCommand;

/// Upper bound on an unterminated line before the buffer is discarded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a json object")]
    NotAnObject,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid value for {cmd}: {value}")]
    InvalidValue { cmd: &'static str, value: String },
}

/// Launch direction chosen by player 1 before the ball starts moving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trajectory {
    /// Angle in degrees, used as given.
    Angle(f32),
    Left,
    Center,
    Right,
}

impl Trajectory {
    /// Accepts a number, a numeric string or one of the legacy labels.
    /// Numeric angles are normalized into `[0, 360)`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let angle = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(angle) => Some(angle),
                Err(_) => {
                    return match s.as_str() {
                        "left" => Some(Trajectory::Left),
                        "center" => Some(Trajectory::Center),
                        "right" => Some(Trajectory::Right),
                        _ => None,
                    }
                }
            },
            _ => None,
        }?;

        // Reduced before narrowing so huge finite angles stay finite as f32.
        if angle.is_finite() {
            Some(Trajectory::Angle(angle.rem_euclid(360.0) as f32))
        } else {
            None
        }
    }

    fn to_value(self) -> Value {
        match self {
            Trajectory::Angle(angle) => json!(angle),
            Trajectory::Left => json!("left"),
            Trajectory::Center => json!("center"),
            Trajectory::Right => json!("right"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlRequest {
    NewGame,
    /// Requested column count. Not yet validated against the allowed widths.
    SetDims(i64),
    Trajectory(Trajectory),
    /// `Some` sets the pause flag, `None` toggles it.
    Pause(Option<bool>),
}

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Command(MoveCommand),
    Control(ControlRequest),
}

impl ClientMessage {
    pub fn to_json(&self) -> Value {
        match self {
            ClientMessage::Command(cmd) => json!({ "type": "cmd", "cmd": cmd.as_str() }),
            ClientMessage::Control(ControlRequest::NewGame) => {
                json!({ "type": "control", "cmd": "new_game" })
            }
            ClientMessage::Control(ControlRequest::SetDims(value)) => {
                json!({ "type": "control", "cmd": "set_dims", "value": value })
            }
            ClientMessage::Control(ControlRequest::Trajectory(trajectory)) => {
                json!({ "type": "control", "cmd": "trajectory", "value": trajectory.to_value() })
            }
            ClientMessage::Control(ControlRequest::Pause(Some(paused))) => {
                json!({ "type": "control", "cmd": "pause", "value": paused })
            }
            ClientMessage::Control(ControlRequest::Pause(None)) => {
                json!({ "type": "control", "cmd": "pause" })
            }
        }
    }

    /// Serializes the message as one protocol line, newline included.
    pub fn to_line(&self) -> String {
        let mut line = self.to_json().to_string();
        line.push('\n');
        line
    }
}

/// Messages sent from the server to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Assign { player: u8 },
    State { state: Box<StateSnapshot> },
}

/// Decodes one protocol line (without its trailing newline).
pub fn decode_line(line: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_slice(line)?;
    let Value::Object(msg) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    match str_field(&msg, "type") {
        Some("cmd") => {
            let cmd = str_field(&msg, "cmd").unwrap_or_default();
            MoveCommand::from_str(cmd)
                .map(ClientMessage::Command)
                .ok_or_else(|| ProtocolError::UnknownCommand(cmd.to_string()))
        }
        Some("control") => decode_control(&msg).map(ClientMessage::Control),
        other => Err(ProtocolError::UnknownType(
            other.unwrap_or_default().to_string(),
        )),
    }
}

fn decode_control(msg: &Map<String, Value>) -> Result<ControlRequest, ProtocolError> {
    let value = msg.get("value").unwrap_or(&Value::Null);
    match str_field(msg, "cmd") {
        Some("new_game") => Ok(ControlRequest::NewGame),
        Some("set_dims") => parse_dims(value)
            .map(ControlRequest::SetDims)
            .ok_or_else(|| ProtocolError::InvalidValue {
                cmd: "set_dims",
                value: value.to_string(),
            }),
        Some("trajectory") => Trajectory::from_value(value)
            .map(ControlRequest::Trajectory)
            .ok_or_else(|| ProtocolError::InvalidValue {
                cmd: "trajectory",
                value: value.to_string(),
            }),
        Some("pause") => Ok(ControlRequest::Pause(value.as_bool())),
        other => Err(ProtocolError::UnknownCommand(
            other.unwrap_or_default().to_string(),
        )),
    }
}

fn parse_dims(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn str_field<'a>(msg: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    msg.get(key).and_then(Value::as_str)
}

/// Serializes a server message as one protocol line, newline included.
pub fn encode_line(msg: &ServerMessage) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    Ok(line)
}

/// Accumulates raw socket reads and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes read from the socket. Returns false when the buffer
    /// overflowed [`MAX_LINE_BYTES`] without a newline and was discarded.
    pub fn extend(&mut self, data: &[u8]) -> bool {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_LINE_BYTES && !self.buffer.contains(&b'\n') {
            self.buffer.clear();
            return false;
        }
        true
    }

    /// Pops the next complete line, stripped of `\n` and a trailing `\r`.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Bytes of the incomplete line still waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_move_commands() {
        assert_eq!(
            decode_line(br#"{"type":"cmd","cmd":"left"}"#).unwrap(),
            ClientMessage::Command(MoveCommand::Left)
        );
        assert_eq!(
            decode_line(br#"{"type":"cmd","cmd":"stop"}"#).unwrap(),
            ClientMessage::Command(MoveCommand::Stop)
        );
        assert!(matches!(
            decode_line(br#"{"type":"cmd","cmd":"jump"}"#),
            Err(ProtocolError::UnknownCommand(c)) if c == "jump"
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_lines() {
        assert!(matches!(decode_line(b"garbage"), Err(ProtocolError::Json(_))));
        assert!(matches!(decode_line(b"[1,2]"), Err(ProtocolError::NotAnObject)));
        assert!(matches!(decode_line(b"\"cmd\""), Err(ProtocolError::NotAnObject)));
        assert!(matches!(
            decode_line(br#"{"type":"hello"}"#),
            Err(ProtocolError::UnknownType(_))
        ));
        assert!(matches!(
            decode_line(br#"{"cmd":"left"}"#),
            Err(ProtocolError::UnknownType(_))
        ));
    }

    #[test]
    fn test_decode_set_dims_values() {
        let decode = |line: &str| decode_line(line.as_bytes());
        assert_eq!(
            decode(r#"{"type":"control","cmd":"set_dims","value":4}"#).unwrap(),
            ClientMessage::Control(ControlRequest::SetDims(4))
        );
        assert_eq!(
            decode(r#"{"type":"control","cmd":"set_dims","value":"6"}"#).unwrap(),
            ClientMessage::Control(ControlRequest::SetDims(6))
        );
        // Out-of-range values decode fine; the session decides what they mean.
        assert_eq!(
            decode(r#"{"type":"control","cmd":"set_dims","value":5}"#).unwrap(),
            ClientMessage::Control(ControlRequest::SetDims(5))
        );
        assert!(matches!(
            decode(r#"{"type":"control","cmd":"set_dims","value":"wide"}"#),
            Err(ProtocolError::InvalidValue { cmd: "set_dims", .. })
        ));
        assert!(decode(r#"{"type":"control","cmd":"set_dims"}"#).is_err());
    }

    #[test]
    fn test_decode_trajectory_values() {
        let traj = |line: &str| match decode_line(line.as_bytes()) {
            Ok(ClientMessage::Control(ControlRequest::Trajectory(t))) => Some(t),
            _ => None,
        };
        assert_eq!(
            traj(r#"{"type":"control","cmd":"trajectory","value":300}"#),
            Some(Trajectory::Angle(300.0))
        );
        assert_eq!(
            traj(r#"{"type":"control","cmd":"trajectory","value":"-45.5"}"#),
            Some(Trajectory::Angle(314.5))
        );
        match traj(r#"{"type":"control","cmd":"trajectory","value":1e39}"#) {
            Some(Trajectory::Angle(angle)) => {
                assert!(angle.is_finite());
                assert!((0.0..360.0).contains(&angle));
            }
            other => panic!("expected a numeric angle, got {:?}", other),
        }
        assert_eq!(
            traj(r#"{"type":"control","cmd":"trajectory","value":"left"}"#),
            Some(Trajectory::Left)
        );
        assert_eq!(
            traj(r#"{"type":"control","cmd":"trajectory","value":"center"}"#),
            Some(Trajectory::Center)
        );
        assert_eq!(traj(r#"{"type":"control","cmd":"trajectory","value":"up"}"#), None);
        assert_eq!(traj(r#"{"type":"control","cmd":"trajectory","value":"NaN"}"#), None);
        assert_eq!(traj(r#"{"type":"control","cmd":"trajectory","value":true}"#), None);
    }

    #[test]
    fn test_decode_pause() {
        assert_eq!(
            decode_line(br#"{"type":"control","cmd":"pause","value":true}"#).unwrap(),
            ClientMessage::Control(ControlRequest::Pause(Some(true)))
        );
        assert_eq!(
            decode_line(br#"{"type":"control","cmd":"pause"}"#).unwrap(),
            ClientMessage::Control(ControlRequest::Pause(None))
        );
        assert_eq!(
            decode_line(br#"{"type":"control","cmd":"pause","value":"yes"}"#).unwrap(),
            ClientMessage::Control(ControlRequest::Pause(None))
        );
    }

    #[test]
    fn test_client_message_lines_decode_back() {
        let messages = [
            ClientMessage::Command(MoveCommand::Right),
            ClientMessage::Control(ControlRequest::NewGame),
            ClientMessage::Control(ControlRequest::SetDims(2)),
            ClientMessage::Control(ControlRequest::Trajectory(Trajectory::Right)),
            ClientMessage::Control(ControlRequest::Pause(Some(false))),
        ];
        for msg in messages {
            let line = msg.to_line();
            assert!(line.ends_with('\n'));
            assert_eq!(decode_line(line.trim_end().as_bytes()).unwrap(), msg);
        }
    }

    #[test]
    fn test_encode_assign() {
        let line = encode_line(&ServerMessage::Assign { player: 2 }).unwrap();
        assert_eq!(line, "{\"type\":\"assign\",\"player\":2}\n");
    }

    #[test]
    fn test_line_buffer_splits_partial_reads() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.extend(b"{\"type\":\"cmd\","));
        assert_eq!(buffer.next_line(), None);

        buffer.extend(b"\"cmd\":\"left\"}\r\nnot json\n{\"ty");
        assert_eq!(
            buffer.next_line().unwrap(),
            b"{\"type\":\"cmd\",\"cmd\":\"left\"}".to_vec()
        );
        assert_eq!(buffer.next_line().unwrap(), b"not json".to_vec());
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.pending(), 4);
    }

    #[test]
    fn test_line_buffer_discards_oversized_line() {
        let mut buffer = LineBuffer::new();
        let junk = vec![b'x'; MAX_LINE_BYTES + 1];
        assert!(!buffer.extend(&junk));
        assert_eq!(buffer.pending(), 0);
        assert!(buffer.extend(b"{}\n"));
        assert_eq!(buffer.next_line().unwrap(), b"{}".to_vec());
    }
}
