/// Lifecycle state of an asynchronous generation task as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Succeed,
    Failed,
}

impl TaskStatus {
    /// Anything other than the two terminal markers is still in flight.
    pub fn from_upstream(raw: Option<&str>) -> Self {
        match raw {
            Some("SUCCEED") => TaskStatus::Succeed,
            Some("FAILED") => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

/// Snapshot of a remote task, rebuilt from every status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    /// Image URL, once the task succeeded.
    pub result: Option<String>,
    /// Upstream explanation, usually only set on failure.
    pub message: Option<String>,
}

impl Task {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            result: None,
            message: None,
        }
    }
}
