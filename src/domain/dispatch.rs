use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchState {
    Pending,
    Success,
    Error,
}

impl DispatchState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DispatchState::Pending)
    }
}

/// A recipient plus the message destined for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchTarget {
    pub id: String,
    /// `None` when the customer directory had no phone for this recipient.
    pub phone: Option<String>,
    pub display_name: String,
    pub message: String,
}

impl DispatchTarget {
    pub fn new(
        id: impl Into<String>,
        phone: Option<String>,
        display_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            phone,
            display_name: display_name.into(),
            message: message.into(),
        }
    }

    /// Phone with surrounding whitespace removed, if any is left.
    pub fn resolved_phone(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub target_id: String,
    pub state: DispatchState,
}

/// One entry of the append-only progress stream emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTransition {
    pub target_id: String,
    pub state: DispatchState,
    /// Channel failure description when `state` is `Error`.
    pub detail: Option<String>,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Per-target state, in dispatch order. Excluded targets are absent.
    pub results: Vec<DispatchResult>,
    pub success_count: usize,
    pub error_count: usize,
    /// Ids of targets dropped before dispatch for lack of a phone.
    pub excluded: Vec<String>,
    pub cancelled: bool,
}

impl DispatchReport {
    pub fn state_of(&self, target_id: &str) -> Option<DispatchState> {
        self.results
            .iter()
            .find(|r| r.target_id == target_id)
            .map(|r| r.state)
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.state == DispatchState::Error)
            .map(|r| r.target_id.as_str())
    }

    pub fn pending_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.state == DispatchState::Pending)
            .count()
    }

    /// Picks the targets that failed, for a caller-driven retry run.
    pub fn failed_targets(&self, targets: &[DispatchTarget]) -> Vec<DispatchTarget> {
        targets
            .iter()
            .filter(|t| self.state_of(&t.id) == Some(DispatchState::Error))
            .cloned()
            .collect()
    }

    /// Human-readable one-liner, e.g. "2 succeeded, 1 failed".
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} succeeded, {} failed",
            self.success_count, self.error_count
        );
        if !self.excluded.is_empty() {
            line.push_str(&format!(", {} without phone", self.excluded.len()));
        }
        if self.cancelled {
            line.push_str(&format!(", cancelled with {} pending", self.pending_count()));
        }
        line
    }
}
