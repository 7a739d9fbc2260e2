//! The uniform job state machine shared by every job backend.

use serde::{Deserialize, Serialize};

/// `accepted -> running -> {successful | failed | dismissed}`, with
/// `accepted -> dismissed` also permitted. Terminal states never transition
/// further: [`JobStatus::is_terminal`] guards every status-update call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Accepted,
    Running,
    Successful,
    Failed,
    Dismissed,
}

impl JobStatus {
    /// Terminal statuses never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Successful | JobStatus::Failed | JobStatus::Dismissed
        )
    }

    /// Whether `self -> next` is a legal transition of the state machine.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (JobStatus::Accepted, JobStatus::Running | JobStatus::Dismissed) => true,
            (JobStatus::Running, JobStatus::Successful | JobStatus::Failed | JobStatus::Dismissed) => {
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Accepted => "accepted",
            JobStatus::Running => "running",
            JobStatus::Successful => "successful",
            JobStatus::Failed => "failed",
            JobStatus::Dismissed => "dismissed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_never_transition() {
        for terminal in [JobStatus::Successful, JobStatus::Failed, JobStatus::Dismissed] {
            for next in [
                JobStatus::Accepted,
                JobStatus::Running,
                JobStatus::Successful,
                JobStatus::Failed,
                JobStatus::Dismissed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn accepted_can_go_directly_to_dismissed() {
        assert!(JobStatus::Accepted.can_transition_to(JobStatus::Dismissed));
    }

    #[test]
    fn accepted_cannot_skip_running_to_reach_success() {
        assert!(!JobStatus::Accepted.can_transition_to(JobStatus::Successful));
    }
}
