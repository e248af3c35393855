//! Job status labels and the forward-only ordering between them.

use std::fmt;

/// Lifecycle status of a job.
///
/// Statuses only move forward: a job starts in `Received`, passes through
/// zero or more stage labels as pipeline stages finish, and ends in exactly
/// one of the two absorbing states. Which stage labels appear depends on the
/// system (the podcast pipeline goes straight from `Received` to a terminal
/// state; the video-ads pipeline reports `ScriptsGenerated` and
/// `ImagesGenerated` along the way).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Received,
    ScriptsGenerated,
    ImagesGenerated,
    Completed,
    Failed,
}

impl JobStatus {
    /// The label stored in the `jobs.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Received => "received",
            JobStatus::ScriptsGenerated => "scripts_generated",
            JobStatus::ImagesGenerated => "images_generated",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a stored label. Returns `None` for unknown labels.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(JobStatus::Received),
            "scripts_generated" => Some(JobStatus::ScriptsGenerated),
            "images_generated" => Some(JobStatus::ImagesGenerated),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Position in the forward progression. Terminal states share the
    /// highest rank; no transition may decrease the rank.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Received => 0,
            JobStatus::ScriptsGenerated => 1,
            JobStatus::ImagesGenerated => 2,
            JobStatus::Completed | JobStatus::Failed => 3,
        }
    }

    /// Whether this is an absorbing state that permits no further updates.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_labels() {
        for status in [
            JobStatus::Received,
            JobStatus::ScriptsGenerated,
            JobStatus::ImagesGenerated,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_unknown_label() {
        assert_eq!(JobStatus::parse("processing_started"), None);
    }

    #[test]
    fn test_stage_labels_rank_strictly_forward() {
        assert!(JobStatus::Received.rank() < JobStatus::ScriptsGenerated.rank());
        assert!(JobStatus::ScriptsGenerated.rank() < JobStatus::ImagesGenerated.rank());
        assert!(JobStatus::ImagesGenerated.rank() < JobStatus::Completed.rank());
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Received.is_terminal());
        assert!(!JobStatus::ImagesGenerated.is_terminal());
    }
}
