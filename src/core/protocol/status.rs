use tracing::warn;

use crate::core::protocol::codec::DecodedLine;
use crate::domain::error::ProtocolError;

/// One classified firmware status line
///
/// Produced from a single decoded line and consumed once by the job
/// state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Job ran to completion
    Finished,
    /// Progress report while a job is running
    RunningProgress {
        row: Option<u32>,
        pass: u32,
        cell: u32,
    },
    /// Firmware acknowledged a pause
    Paused,
    /// Emergency stop tripped on the rig
    EmergencyStop,
    /// Firmware is idle
    Idle,
    /// An axis is in motion
    Moving,
    /// `#`-prefixed comment, ignored
    Comment,
    /// Empty line, ignored
    Blank,
    /// Anything the classifier cannot place
    Malformed,
}

/// Maps decoded lines to status events
///
/// The expected arity of `R` progress lines differs between firmware
/// revisions (pass/cell vs row/pass/cell), so it is configured rather
/// than hard-coded.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    expected_fields: usize,
}

impl StatusClassifier {
    /// `expected_fields` is the field count of `R` lines for the
    /// deployed firmware: 2 (pass, cell) or 3 (row, pass, cell).
    pub fn new(expected_fields: usize) -> Self {
        Self { expected_fields }
    }

    pub fn expected_fields(&self) -> usize {
        self.expected_fields
    }

    /// Classify one decoded line. First match wins.
    pub fn classify(&self, line: &DecodedLine) -> StatusEvent {
        let text = match line {
            DecodedLine::Text(text) => text.as_str(),
            DecodedLine::NonAscii => {
                warn!("dropping undecodable status line");
                return StatusEvent::Malformed;
            }
        };

        if text.is_empty() {
            return StatusEvent::Blank;
        }
        if text.starts_with('#') {
            return StatusEvent::Comment;
        }

        match text {
            "finished" => return StatusEvent::Finished,
            "paused" => return StatusEvent::Paused,
            "ESTOP" => return StatusEvent::EmergencyStop,
            "idle" => return StatusEvent::Idle,
            "moving" => return StatusEvent::Moving,
            _ => {}
        }

        if let Some(rest) = text.strip_prefix('R') {
            return self.classify_progress(text, rest);
        }

        warn!(line = %text, "dropping malformed status line");
        StatusEvent::Malformed
    }

    fn classify_progress(&self, line: &str, rest: &str) -> StatusEvent {
        let fields: Option<Vec<u32>> = rest
            .split_whitespace()
            .map(|field| field.parse::<u32>().ok())
            .collect();

        let fields = match fields {
            Some(fields) => fields,
            None => {
                warn!("{}", ProtocolError::Malformed { line: line.to_string() });
                return StatusEvent::Malformed;
            }
        };

        // Fewer than two fields never carries a usable pass/cell pair;
        // discard with no partial update.
        if fields.len() < 2 {
            warn!("{}", ProtocolError::Malformed { line: line.to_string() });
            return StatusEvent::Malformed;
        }

        if fields.len() != self.expected_fields {
            warn!(
                "{}",
                ProtocolError::SchemaMismatch {
                    line: line.to_string(),
                    got: fields.len(),
                    expected: self.expected_fields,
                }
            );
            return StatusEvent::Malformed;
        }

        match fields.len() {
            2 => StatusEvent::RunningProgress {
                row: None,
                pass: fields[0],
                cell: fields[1],
            },
            _ => StatusEvent::RunningProgress {
                row: Some(fields[0]),
                pass: fields[1],
                cell: fields[2],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> StatusEvent {
        StatusClassifier::new(2).classify(&DecodedLine::Text(text.to_string()))
    }

    #[test]
    fn test_exact_keywords() {
        assert_eq!(classify("finished"), StatusEvent::Finished);
        assert_eq!(classify("paused"), StatusEvent::Paused);
        assert_eq!(classify("ESTOP"), StatusEvent::EmergencyStop);
        assert_eq!(classify("idle"), StatusEvent::Idle);
        assert_eq!(classify("moving"), StatusEvent::Moving);
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(classify("Finished"), StatusEvent::Malformed);
        assert_eq!(classify("estop"), StatusEvent::Malformed);
    }

    #[test]
    fn test_blank_and_comment() {
        assert_eq!(classify(""), StatusEvent::Blank);
        assert_eq!(classify("# homing cycle done"), StatusEvent::Comment);
    }

    #[test]
    fn test_two_field_progress() {
        assert_eq!(
            classify("R3 7"),
            StatusEvent::RunningProgress {
                row: None,
                pass: 3,
                cell: 7,
            }
        );
    }

    #[test]
    fn test_three_field_progress() {
        let classifier = StatusClassifier::new(3);
        assert_eq!(
            classifier.classify(&DecodedLine::Text("R1 3 7".to_string())),
            StatusEvent::RunningProgress {
                row: Some(1),
                pass: 3,
                cell: 7,
            }
        );
    }

    #[test]
    fn test_progress_with_too_few_fields_is_discarded() {
        assert_eq!(classify("R3"), StatusEvent::Malformed);
        assert_eq!(classify("R"), StatusEvent::Malformed);
    }

    #[test]
    fn test_progress_arity_mismatch_is_discarded() {
        // Two-field deployment receiving a three-field report
        assert_eq!(classify("R1 3 7"), StatusEvent::Malformed);
        // Three-field deployment receiving a two-field report
        let classifier = StatusClassifier::new(3);
        assert_eq!(
            classifier.classify(&DecodedLine::Text("R3 7".to_string())),
            StatusEvent::Malformed
        );
    }

    #[test]
    fn test_non_numeric_progress_fields() {
        assert_eq!(classify("R3 x"), StatusEvent::Malformed);
        assert_eq!(classify("Rz 7"), StatusEvent::Malformed);
    }

    #[test]
    fn test_unknown_lines_are_malformed() {
        assert_eq!(classify("welding"), StatusEvent::Malformed);
        assert_eq!(classify("ok 3 7"), StatusEvent::Malformed);
    }

    #[test]
    fn test_non_ascii_is_malformed() {
        let classifier = StatusClassifier::new(2);
        assert_eq!(
            classifier.classify(&DecodedLine::NonAscii),
            StatusEvent::Malformed
        );
    }
}
