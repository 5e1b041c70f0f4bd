//! Integration tests for wire protocol encoding and decoding

use focal::protocol::{decode, encode, ClientCommand, ControlKind, Role, ServerEvent};

#[test]
fn test_connection_established_decodes() {
    let text = r#"{
        "type": "connection.established",
        "message": "WebSocket connection established successfully",
        "session_id": 42,
        "user_id": 7,
        "user_role": "student"
    }"#;

    match decode(text).expect("decode failed") {
        ServerEvent::ConnectionEstablished {
            session_id,
            user_id,
            user_role,
            ..
        } => {
            assert_eq!(session_id, 42);
            assert_eq!(user_id, Some(7));
            assert_eq!(user_role, Role::Student);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_focus_update_decodes_with_timestamp() {
    let text = r#"{
        "type": "focus.update",
        "user_id": 7,
        "user_name": "Alice",
        "user_role": "student",
        "focus_score": 0.92,
        "timestamp": "2026-08-07T10:15:00.123456+00:00"
    }"#;

    match decode(text).expect("decode failed") {
        ServerEvent::FocusUpdate {
            user_id,
            user_name,
            focus_score,
            timestamp,
            ..
        } => {
            assert_eq!(user_id, 7);
            assert_eq!(user_name.as_deref(), Some("Alice"));
            assert!((focus_score - 0.92).abs() < f64::EPSILON);
            assert!(timestamp.is_some());
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_missing_optional_fields_default() {
    // The peer omits user_name and user_role in some paths; both default.
    let text = r#"{"type": "session.joined", "user_id": 3}"#;

    match decode(text).expect("decode failed") {
        ServerEvent::SessionJoined {
            user_id,
            user_name,
            user_role,
            timestamp,
        } => {
            assert_eq!(user_id, 3);
            assert_eq!(user_name, None);
            assert_eq!(user_role, Role::Student);
            assert_eq!(timestamp, None);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_session_control_verbs() {
    for (verb, expected) in [
        ("start", ControlKind::Start),
        ("pause", ControlKind::Pause),
        ("resume", ControlKind::Resume),
        ("end", ControlKind::End),
    ] {
        let text = format!(r#"{{"type": "session.control", "control_type": "{}"}}"#, verb);
        match decode(&text).expect("decode failed") {
            ServerEvent::SessionControl { control_type, .. } => {
                assert_eq!(control_type, expected)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

#[test]
fn test_unrecognized_control_verb_is_unknown_not_error() {
    let text = r#"{"type": "session.control", "control_type": "archive"}"#;
    match decode(text).expect("decode failed") {
        ServerEvent::SessionControl { control_type, .. } => {
            assert_eq!(control_type, ControlKind::Unknown)
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_session_stats_payload_is_nested() {
    let text = r#"{
        "type": "session.stats",
        "stats": {
            "total_participants": 10,
            "active_participants": 7,
            "average_focus_score": 0.71,
            "session_duration": 300,
            "focus_distribution": {"high": 4, "medium": 2, "low": 1}
        },
        "timestamp": "2026-08-07T10:15:00+00:00"
    }"#;

    match decode(text).expect("decode failed") {
        ServerEvent::SessionStatsUpdate { stats, .. } => {
            assert_eq!(stats.total_participants, 10);
            assert_eq!(stats.active_participants, 7);
            assert!((stats.average_focus_score - 0.71).abs() < f64::EPSILON);
            assert!((stats.session_duration - 300.0).abs() < f64::EPSILON);
            assert_eq!(stats.focus_distribution.high, 4);
            assert_eq!(stats.focus_distribution.medium, 2);
            assert_eq!(stats.focus_distribution.low, 1);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_unknown_discriminant_is_tolerated() {
    let text = r#"{"type": "session.spotlight", "user_id": 9}"#;
    assert!(matches!(
        decode(text).expect("decode failed"),
        ServerEvent::Unknown
    ));
}

#[test]
fn test_malformed_envelope_is_an_error() {
    assert!(decode("not json at all").is_err());
    assert!(decode(r#"{"no_type_field": true}"#).is_err());
}

#[test]
fn test_command_wire_shapes() {
    let cases = [
        (
            ClientCommand::FocusUpdate { focus_score: 0.85 },
            r#"{"type":"focus_update","focus_score":0.85}"#,
        ),
        (
            ClientCommand::ChatMessage {
                message: "hi".to_string(),
            },
            r#"{"type":"chat_message","message":"hi"}"#,
        ),
        (
            ClientCommand::SessionControl {
                control_type: ControlKind::Pause,
            },
            r#"{"type":"session_control","control_type":"pause"}"#,
        ),
        (ClientCommand::LeaveSession, r#"{"type":"leave_session"}"#),
        (
            ClientCommand::RequestStats,
            r#"{"type":"request_session_stats"}"#,
        ),
        (ClientCommand::Ping, r#"{"type":"ping"}"#),
    ];

    for (cmd, expected) in cases {
        let encoded = encode(&cmd).expect("encode failed");
        let got: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        let want: serde_json::Value = serde_json::from_str(expected).unwrap();
        assert_eq!(got, want);
    }
}
