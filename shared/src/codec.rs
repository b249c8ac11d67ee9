//! JSON codec for the dispatch HTTP bodies
//!
//! Request bodies carry identifiers as decimal strings:
//! ```text
//! POST /connect   {"droneID": "1"}
//! POST /actions   {"itemID": "1", "actions": ["deploy"], "droneID": "1"?}
//! GET  /actions   {"ItemID": 1, "Actions": ["deploy"]}\n
//! ```
//!
//! Decoding validates the identifiers, so anything past this module holds typed values.

use thiserror::Error;

use crate::{ActionsRequest, DroneId, DroneRequest, TaskPayload};

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("invalid {field}: {value:?} is not an integer")]
    InvalidInteger { field: &'static str, value: String },

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A decoded task submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Specific drone to hand the task to, `None` for any waiting drone
    pub target: Option<DroneId>,
    pub payload: TaskPayload,
}

/// Parse a decimal identifier the way the wire format expects
pub fn parse_int(value: &str, field: &'static str) -> Result<i64, CodecError> {
    value.parse::<i64>().map_err(|_| CodecError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

/// Decode a `/connect` body into the registering drone's ID
pub fn decode_drone_request(body: &[u8]) -> Result<DroneId, CodecError> {
    let request: DroneRequest = serde_json::from_slice(body).map_err(CodecError::MalformedBody)?;
    request.drone_id.parse()
}

/// Decode a `POST /actions` body into a validated submission
pub fn decode_actions_request(body: &[u8]) -> Result<Submission, CodecError> {
    let request: ActionsRequest =
        serde_json::from_slice(body).map_err(CodecError::MalformedBody)?;

    let item_id = parse_int(&request.item_id, "itemID")?;
    let target = request
        .drone_id
        .as_deref()
        .map(str::parse::<DroneId>)
        .transpose()?;

    Ok(Submission {
        target,
        payload: TaskPayload::new(item_id, request.actions),
    })
}

/// Encode a task payload as the `GET /actions` response body (newline terminated)
pub fn encode_payload(payload: &TaskPayload) -> Result<Vec<u8>, CodecError> {
    let mut buf = serde_json::to_vec(payload).map_err(CodecError::Encode)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Decode a `GET /actions` response body
pub fn decode_payload(body: &[u8]) -> Result<TaskPayload, CodecError> {
    serde_json::from_slice(body).map_err(CodecError::MalformedBody)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_drone_request() {
        let id = decode_drone_request(br#"{"droneID":"12"}"#).unwrap();
        assert_eq!(id, DroneId(12));
    }

    #[test]
    fn test_decode_drone_request_rejects_non_numeric_id() {
        let err = decode_drone_request(br#"{"droneID":"alpha"}"#).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidInteger { field: "droneID", .. }
        ));
    }

    #[test]
    fn test_decode_drone_request_rejects_garbage() {
        let err = decode_drone_request(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::MalformedBody(_)));

        // Empty body is malformed too
        assert!(decode_drone_request(b"").is_err());
    }

    #[test]
    fn test_decode_actions_request_any() {
        let submission =
            decode_actions_request(br#"{"itemID":"1","actions":["deploy","scan"]}"#).unwrap();
        assert_eq!(submission.target, None);
        assert_eq!(submission.payload.item_id, 1);
        assert_eq!(submission.payload.actions, vec!["deploy", "scan"]);
    }

    #[test]
    fn test_decode_actions_request_targeted() {
        let submission =
            decode_actions_request(br#"{"itemID":"5","actions":[],"droneID":"3"}"#).unwrap();
        assert_eq!(submission.target, Some(DroneId(3)));
        assert!(submission.payload.actions.is_empty());
    }

    #[test]
    fn test_decode_actions_request_without_actions() {
        let missing = decode_actions_request(br#"{"itemID":"2"}"#).unwrap();
        assert!(missing.payload.actions.is_empty());

        let null = decode_actions_request(br#"{"itemID":"2","actions":null}"#).unwrap();
        assert!(null.payload.actions.is_empty());
    }

    #[test]
    fn test_decode_actions_request_bad_item_id() {
        let err = decode_actions_request(br#"{"itemID":"x1","actions":["deploy"]}"#).unwrap_err();
        assert!(matches!(err, CodecError::InvalidInteger { field: "itemID", .. }));
    }

    #[test]
    fn test_encode_payload_is_newline_terminated() {
        let encoded = encode_payload(&TaskPayload::new(1, vec!["deploy".into()])).unwrap();
        assert_eq!(encoded, b"{\"ItemID\":1,\"Actions\":[\"deploy\"]}\n");
        assert_eq!(
            decode_payload(&encoded).unwrap(),
            TaskPayload::new(1, vec!["deploy".into()])
        );
    }
}
