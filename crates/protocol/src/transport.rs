use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{FromBackground, ToBackground, TransportError};

/// The foreground's end of the channel to a background runtime.
///
/// Implementations must deliver messages in order and without loss in both
/// directions. Neither call may block.
pub trait WorkerPort {
    /// Copy a message across the boundary.
    fn post(&mut self, message: &ToBackground) -> Result<(), TransportError>;

    /// Next message from the background, if one has arrived.
    fn try_recv(&mut self) -> Result<Option<FromBackground>, TransportError>;
}

/// Serialize a message into its wire frame (one JSON document).
pub fn encode_frame<T: Serialize>(message: &T) -> Result<String, TransportError> {
    Ok(serde_json::to_string(message)?)
}

/// Parse a wire frame.
pub fn decode_frame<T: DeserializeOwned>(frame: &str) -> Result<T, TransportError> {
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_round_trip_through_text() {
        let frame = encode_frame(&ToBackground::TakeSnapshot).unwrap();
        assert_eq!(frame, r#"{"type":"takeSnapshot"}"#);
        let back: ToBackground = decode_frame(&frame).unwrap();
        assert_eq!(back, ToBackground::TakeSnapshot);
    }

    #[test]
    fn malformed_frame_is_a_framing_error() {
        let err = decode_frame::<ToBackground>(r#"{"type":"explode"}"#).unwrap_err();
        assert!(matches!(err, TransportError::Framing(_)));
    }
}
