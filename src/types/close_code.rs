use serde::{Deserialize, Serialize};

/// Close code reported for a close requested through `WsClient::close`.
pub const MANUAL_CLOSE_CODE: u16 = 0;
pub const MANUAL_CLOSE_REASON: &str = "manual disconnect";

/// Normal closure.
pub const WS_CLOSE_NORMAL: u16 = 1000;
/// No status code was present in the close frame.
pub const WS_CLOSE_NO_STATUS: u16 = 1005;
/// Connection dropped without a close frame.
pub const WS_CLOSE_ABNORMAL: u16 = 1006;

/// Structured payload of an `onclose` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    /// Decodes a channel close, preferring the well-known reason for `code`
    /// over the text the channel supplied.
    pub fn from_channel(code: u16, reason: &str) -> Self {
        let reason = close_reason(code).unwrap_or(reason).to_string();
        Self { code, reason }
    }

    pub fn manual() -> Self {
        Self {
            code: MANUAL_CLOSE_CODE,
            reason: MANUAL_CLOSE_REASON.to_string(),
        }
    }
}

/// Human readable reason for the documented WebSocket close codes.
///
/// See <https://developer.mozilla.org/en-US/docs/Web/API/CloseEvent/code>.
pub fn close_reason(code: u16) -> Option<&'static str> {
    let reason = match code {
        1000 => "normal closure",
        1001 => "endpoint going away",
        1002 => "protocol error",
        1003 => "unsupported data: only text messages are accepted",
        1005 => "no status code was provided",
        1006 => "abnormal closure",
        1007 => "invalid frame payload data (text was not valid UTF-8)",
        1008 => "policy violation",
        1009 => "message too big",
        1010 => "client terminated: mandatory extension missing",
        1011 => "server terminated: internal error",
        1012 => "service restart",
        1013 => "try again later",
        1014 => "bad gateway: upstream did not respond in time",
        1015 => "TLS handshake failure",
        _ => return None,
    };
    Some(reason)
}
