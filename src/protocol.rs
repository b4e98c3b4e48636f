//! Line protocol codec for the temp-lab serial link
//!
//! The device speaks a line-oriented protocol: one JSON object per
//! newline-terminated UTF-8 line. The host sends the literal commands
//! `START` and `STOP`; the device answers with typed frames:
//!
//! | Payload | Meaning |
//! |---|---|
//! | `{"type":"hello", ...}` | handshake greeting |
//! | `{"type":"ack","cmd":<string>}` | command acknowledged |
//! | `{"type":"error","msg":<string>}` | device-reported fault |
//! | `{"t_ms":<number>, <sensor_key>:<number>, ...}` | data frame |
//!
//! Parsing is deliberately liberal: firmware payloads evolve independently
//! of the display client, so unknown fields are ignored rather than
//! rejected, and anything without a recognised `type` is treated as a
//! potential data frame. Decode failures are a distinguished variant, not
//! an error - the caller logs and moves on.

use crate::types::SensorValues;
use serde_json::Value;

/// JSON fields with protocol meaning, excluded from sensor value extraction
const CONTROL_FIELDS: [&str; 4] = ["type", "t_ms", "cmd", "msg"];

/// One decoded frame from the device
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Blank line (after trimming); skipped silently
    Empty,
    /// Handshake greeting
    Hello,
    /// Command acknowledgement; `cmd` names the acknowledged command
    Ack { cmd: Option<String> },
    /// Device-reported fault
    DeviceError { message: Option<String> },
    /// Data frame: every numeric non-control field becomes a sensor value.
    /// `values` may be empty ("valid JSON, nothing to plot").
    Data {
        /// Device uptime in milliseconds, when the frame carries `t_ms`
        timestamp_ms: Option<f64>,
        /// Sensor readings in wire order
        values: SensorValues,
    },
    /// Not valid JSON, or not a JSON object; non-fatal
    Malformed { raw: String },
}

/// Decode one raw line from the transport into a [`Message`]
///
/// Never fails: unparseable input becomes [`Message::Malformed`].
pub fn decode(line: &str) -> Message {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Message::Empty;
    }

    let object = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        _ => {
            return Message::Malformed {
                raw: trimmed.to_string(),
            }
        }
    };

    match object.get("type").and_then(Value::as_str) {
        Some("hello") => return Message::Hello,
        Some("ack") => {
            return Message::Ack {
                cmd: object.get("cmd").and_then(Value::as_str).map(String::from),
            }
        }
        Some("error") => {
            return Message::DeviceError {
                message: object.get("msg").and_then(Value::as_str).map(String::from),
            }
        }
        // Anything else (including the firmware's "data" tag, or no tag at
        // all) falls through to data extraction.
        _ => {}
    }

    let timestamp_ms = object.get("t_ms").and_then(Value::as_f64);

    let mut values = SensorValues::new();
    for (key, value) in &object {
        if CONTROL_FIELDS.contains(&key.as_str()) {
            continue;
        }
        // Non-numeric fields (null sensors, strings, nested objects) are
        // silently excluded, not an error.
        if let Some(number) = value.as_f64() {
            values.insert(key.clone(), number);
        }
    }

    Message::Data {
        timestamp_ms,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hello() {
        assert_eq!(decode(r#"{"type":"hello"}"#), Message::Hello);
        // Firmware attaches capability flags to hello; they are ignored
        assert_eq!(
            decode(r#"{"type":"hello","device":"temp-lab-v2","dallas":3}"#),
            Message::Hello
        );
    }

    #[test]
    fn test_decode_ack() {
        assert_eq!(
            decode(r#"{"type":"ack","cmd":"start"}"#),
            Message::Ack {
                cmd: Some("start".to_string())
            }
        );
        assert_eq!(decode(r#"{"type":"ack"}"#), Message::Ack { cmd: None });
    }

    #[test]
    fn test_decode_device_error() {
        assert_eq!(
            decode(r#"{"type":"error","msg":"sensor fault"}"#),
            Message::DeviceError {
                message: Some("sensor fault".to_string())
            }
        );
    }

    #[test]
    fn test_decode_data_with_timestamp() {
        let msg = decode(r#"{"t_ms":1500,"T_BME":23.5,"T_DS0":22}"#);
        match msg {
            Message::Data {
                timestamp_ms,
                values,
            } => {
                assert_eq!(timestamp_ms, Some(1500.0));
                assert_eq!(values.get("T_BME"), Some(&23.5));
                assert_eq!(values.get("T_DS0"), Some(&22.0));
                assert_eq!(values.len(), 2);
            }
            other => panic!("expected data frame, got {:?}", other),
        }
    }

    #[test]
    fn test_data_tag_falls_through_to_extraction() {
        // The firmware tags data frames with type:"data"; the tag itself
        // carries no information and must not block extraction.
        let msg = decode(r#"{"type":"data","t_ms":100,"T_TMP":19.25}"#);
        match msg {
            Message::Data {
                timestamp_ms,
                values,
            } => {
                assert_eq!(timestamp_ms, Some(100.0));
                assert_eq!(values.get("T_TMP"), Some(&19.25));
            }
            other => panic!("expected data frame, got {:?}", other),
        }
    }

    #[test]
    fn test_control_fields_excluded_from_values() {
        let msg = decode(r#"{"t_ms":5,"cmd":7,"msg":8,"T_DS0":20.0}"#);
        match msg {
            Message::Data { values, .. } => {
                assert_eq!(values.len(), 1);
                assert_eq!(values.get("T_DS0"), Some(&20.0));
            }
            other => panic!("expected data frame, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_fields_excluded() {
        // Firmware sends null for NaN sensor readings
        let msg = decode(r#"{"T_BME":null,"T_DS0":21.5,"name":"box","flags":[1]}"#);
        match msg {
            Message::Data { values, .. } => {
                assert_eq!(values.len(), 1);
                assert_eq!(values.get("T_DS0"), Some(&21.5));
            }
            other => panic!("expected data frame, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_json_without_data() {
        let msg = decode(r#"{"note":"hi"}"#);
        match msg {
            Message::Data {
                timestamp_ms,
                values,
            } => {
                assert_eq!(timestamp_ms, None);
                assert!(values.is_empty());
            }
            other => panic!("expected empty data frame, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_whitespace_lines() {
        assert_eq!(decode(""), Message::Empty);
        assert_eq!(decode("   \r"), Message::Empty);
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(
            decode("not json"),
            Message::Malformed {
                raw: "not json".to_string()
            }
        );
        // Valid JSON but not an object
        assert_eq!(
            decode("[1,2,3]"),
            Message::Malformed {
                raw: "[1,2,3]".to_string()
            }
        );
        assert_eq!(
            decode("42"),
            Message::Malformed {
                raw: "42".to_string()
            }
        );
    }

    #[test]
    fn test_values_preserve_wire_order() {
        let msg = decode(r#"{"T_BME":1.0,"T_DS2":2.0,"T_DS0":3.0}"#);
        match msg {
            Message::Data { values, .. } => {
                let keys: Vec<_> = values.keys().cloned().collect();
                assert_eq!(keys, vec!["T_BME", "T_DS2", "T_DS0"]);
            }
            other => panic!("expected data frame, got {:?}", other),
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Arbitrary input never panics and never escapes the Message enum
            #[test]
            fn decode_never_panics(line in ".*") {
                let _ = decode(&line);
            }

            /// Untagged objects with numeric fields always decode to Data
            /// containing exactly those fields (t_ms excluded)
            #[test]
            fn numeric_fields_extracted(
                t_ms in 0.0f64..1e9,
                a in -1e6f64..1e6,
                b in -1e6f64..1e6,
            ) {
                let line = format!(r#"{{"t_ms":{},"s_a":{},"s_b":{}}}"#, t_ms, a, b);
                match decode(&line) {
                    Message::Data { timestamp_ms, values } => {
                        prop_assert_eq!(timestamp_ms, Some(t_ms));
                        prop_assert_eq!(values.len(), 2);
                        prop_assert_eq!(values.get("s_a").copied(), Some(a));
                        prop_assert_eq!(values.get("s_b").copied(), Some(b));
                    }
                    other => prop_assert!(false, "expected data, got {:?}", other),
                }
            }
        }
    }
}
