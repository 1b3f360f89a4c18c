//! Inbound frame dispatch.
//!
//! [`dispatch_frame`] applies one text frame to a [`FeedState`]:
//!
//! - `registered` sets `is_registered`; a rejection records an error
//! - `neurofeedback` prepends the event to the buffer
//! - `error` replaces the current error with the server's message
//!
//! Malformed frames are logged and leave the state untouched. Frames with an
//! unrecognized `type` are ignored.

use neurofeed_core::{NeurofeedbackEvent, ServerMessage};
use tracing::{debug, error, warn};

use crate::errors::REGISTRATION_FAILED_MESSAGE;
use crate::state::FeedState;

/// What a frame did to the state.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Registration answer applied.
    Registered {
        /// Whether the server accepted the registration.
        success: bool,
    },
    /// Event buffered. The caller owes the event callback one invocation.
    Event(NeurofeedbackEvent),
    /// Server error recorded.
    ServerError,
    /// Well-formed frame with an unknown type.
    Ignored,
    /// Frame could not be parsed; nothing changed.
    Malformed,
}

/// Apply one inbound text frame to `state`.
pub fn dispatch_frame(state: &mut FeedState, frame: &str) -> DispatchOutcome {
    let message: ServerMessage = match serde_json::from_str(frame) {
        Ok(message) => message,
        Err(e) => {
            error!(error = %e, len = frame.len(), "failed to parse websocket message");
            return DispatchOutcome::Malformed;
        }
    };

    match message {
        ServerMessage::Registered { success } => {
            state.connection.is_registered = success;
            if success {
                debug!("registered with neurofeedback server");
            } else {
                warn!("neurofeedback server rejected registration");
                state.connection.error = Some(REGISTRATION_FAILED_MESSAGE.to_string());
            }
            DispatchOutcome::Registered { success }
        }
        ServerMessage::Neurofeedback { data } => {
            debug!(
                event_id = data.id,
                region = %data.brain_region_id,
                "neurofeedback event received"
            );
            state.events.push(data.clone());
            DispatchOutcome::Event(data)
        }
        ServerMessage::Error { message } => {
            warn!(message = %message, "neurofeedback server reported an error");
            state.connection.error = Some(message);
            DispatchOutcome::ServerError
        }
        ServerMessage::Unknown => {
            debug!("ignoring message with unknown type");
            DispatchOutcome::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use neurofeed_core::constants::MAX_BUFFERED_EVENTS;
    use neurofeed_core::logging::capture_logs;
    use serde_json::json;
    use tracing::Level;

    fn event_frame(id: i64) -> String {
        json!({
            "type": "neurofeedback",
            "data": {
                "id": id,
                "userId": 1,
                "timestamp": "2026-03-01T12:30:00.000Z",
                "brainRegionId": "anterior-cingulate",
                "intensity": 40,
                "testResponseId": null,
                "duration": null,
                "metadata": {"seq": id}
            }
        })
        .to_string()
    }

    fn connected_state() -> FeedState {
        let mut state = FeedState::default();
        state.connection.is_connected = true;
        state
    }

    #[test]
    fn registered_success_sets_flag() {
        let mut state = connected_state();
        let outcome = dispatch_frame(&mut state, r#"{"type":"registered","success":true}"#);
        assert_eq!(outcome, DispatchOutcome::Registered { success: true });
        assert!(state.connection.is_registered);
        assert!(state.connection.error.is_none());
    }

    #[test]
    fn registered_failure_sets_error() {
        let mut state = connected_state();
        let outcome = dispatch_frame(&mut state, r#"{"type":"registered","success":false}"#);
        assert_eq!(outcome, DispatchOutcome::Registered { success: false });
        assert!(!state.connection.is_registered);
        assert_eq!(
            state.connection.error.as_deref(),
            Some(REGISTRATION_FAILED_MESSAGE)
        );
    }

    #[test]
    fn event_is_buffered_and_returned() {
        let mut state = connected_state();
        let outcome = dispatch_frame(&mut state, &event_frame(5));
        assert_matches!(outcome, DispatchOutcome::Event(ref e) if e.id == 5);
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.events.latest().map(|e| e.metadata["seq"].clone()), Some(json!(5)));
    }

    #[test]
    fn twenty_five_events_leave_last_twenty_newest_first() {
        let mut state = connected_state();
        for id in 1..=25 {
            let _ = dispatch_frame(&mut state, &event_frame(id));
        }
        assert_eq!(state.events.len(), MAX_BUFFERED_EVENTS);
        let ids: Vec<i64> = state.events.iter().map(|e| e.id).collect();
        assert_eq!(ids, (6..=25).rev().collect::<Vec<i64>>());
    }

    #[test]
    fn server_error_replaces_previous_error() {
        let mut state = connected_state();
        state.connection.error = Some("old".into());
        let outcome = dispatch_frame(&mut state, r#"{"type":"error","message":"User not found"}"#);
        assert_eq!(outcome, DispatchOutcome::ServerError);
        assert_eq!(state.connection.error.as_deref(), Some("User not found"));
        assert!(state.connection.is_connected);
    }

    #[test]
    fn malformed_frame_changes_nothing_and_logs() {
        let (logs, _guard) = capture_logs();
        let mut state = connected_state();
        state.connection.is_registered = true;
        let before = state.connection.clone();

        let outcome = dispatch_frame(&mut state, "{not json");

        assert_eq!(outcome, DispatchOutcome::Malformed);
        assert_eq!(state.connection, before);
        assert!(state.events.is_empty());
        assert!(logs.has_event(Level::ERROR, "failed to parse websocket message"));
    }

    #[test]
    fn malformed_between_valid_frames_is_skipped() {
        let mut state = connected_state();
        state.connection.is_registered = true;

        let _ = dispatch_frame(&mut state, &event_frame(1));
        let _ = dispatch_frame(&mut state, r#"{"type":"neurofeedback","data":{"id":"x"}}"#);
        let _ = dispatch_frame(&mut state, &event_frame(2));

        let ids: Vec<i64> = state.events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(state.connection.is_connected);
        assert!(state.connection.is_registered);
        assert!(state.connection.error.is_none());
    }

    #[test]
    fn unknown_type_is_ignored() {
        let mut state = connected_state();
        let outcome = dispatch_frame(&mut state, r#"{"type":"pong"}"#);
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(state.events.is_empty());
        assert!(state.connection.error.is_none());
    }

    #[test]
    fn event_timestamp_in_millis_is_normalized() {
        let mut state = connected_state();
        let frame = json!({
            "type": "neurofeedback",
            "data": {"id": 1, "timestamp": 1_700_000_000_000_i64, "brainRegionId": "insula"}
        })
        .to_string();
        let outcome = dispatch_frame(&mut state, &frame);
        assert_matches!(outcome, DispatchOutcome::Event(e) if e.timestamp.timestamp() == 1_700_000_000);
    }
}
