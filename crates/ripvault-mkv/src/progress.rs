//! Rip progress tracking.

use serde::{Deserialize, Serialize};

use crate::robot::{parse_line, RobotLine};

/// One progress update from the ripping engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipProgress {
    /// Current operation (`PRGT`).
    pub title: String,
    /// Current sub-operation (`PRGC`).
    pub channel: String,
    pub current: u32,
    pub total: u32,
    pub max: u32,
}

impl RipProgress {
    /// Overall completion in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            (self.total as f32 / self.max as f32).clamp(0.0, 1.0)
        }
    }
}

/// Folds `PRGT`/`PRGC` names into the `PRGV` updates that follow them.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    title: String,
    channel: String,
    last_message: Option<String>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one output line; returns an update for `PRGV` lines.
    pub fn feed(&mut self, line: &str) -> Option<RipProgress> {
        match parse_line(line)? {
            RobotLine::ProgressTitle(t) => {
                self.title = t;
                None
            }
            RobotLine::ProgressChannel(c) => {
                self.channel = c;
                None
            }
            RobotLine::ProgressValue {
                current,
                total,
                max,
            } => Some(RipProgress {
                title: self.title.clone(),
                channel: self.channel.clone(),
                current,
                total,
                max,
            }),
            RobotLine::Message { text, .. } => {
                self.last_message = Some(text);
                None
            }
            _ => None,
        }
    }

    /// Last `MSG` text seen, for error reporting.
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_folds_names() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.feed(r#"PRGT:5018,0,"Saving to MKV file""#), None);
        assert_eq!(tracker.feed(r#"PRGC:5017,0,"Analyzing seamless segments""#), None);

        let p = tracker.feed("PRGV:10,20,100").unwrap();
        assert_eq!(p.title, "Saving to MKV file");
        assert_eq!(p.channel, "Analyzing seamless segments");
        assert_eq!((p.current, p.total, p.max), (10, 20, 100));
        assert!((p.fraction() - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tracker_records_messages() {
        let mut tracker = ProgressTracker::new();
        tracker.feed(r#"MSG:5003,0,0,"Failed to save title 0","""#);
        assert_eq!(tracker.last_message(), Some("Failed to save title 0"));
        assert_eq!(tracker.feed("not robot output"), None);
    }

    #[test]
    fn test_fraction_zero_max() {
        assert_eq!(RipProgress::default().fraction(), 0.0);
    }
}
