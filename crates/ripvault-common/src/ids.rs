//! Workflow identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite workflow key: one (disc, title) pair.
///
/// Assigned once on first contact with a title and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowKey {
    pub disc_id: String,
    pub title_id: u32,
}

impl WorkflowKey {
    pub fn new(disc_id: impl Into<String>, title_id: u32) -> Self {
        Self {
            disc_id: disc_id.into(),
            title_id,
        }
    }

    /// Name of the per-workflow scratch directory under the rip root.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.disc_id, self.title_id)
    }
}

impl fmt::Display for WorkflowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.disc_id, self.title_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_and_dir_name() {
        let key = WorkflowKey::new("1234-ABCD", 7);
        assert_eq!(key.to_string(), "1234-ABCD/7");
        assert_eq!(key.dir_name(), "1234-ABCD-7");
    }

    #[test]
    fn test_key_ordering() {
        let a = WorkflowKey::new("a", 2);
        let b = WorkflowKey::new("a", 10);
        let c = WorkflowKey::new("b", 0);
        assert!(a < b);
        assert!(b < c);
    }
}
