use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeStatus {
    Applied,
    SkippedNoChange,
    Conflict,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutcomeStatus::Applied => "applied",
            OutcomeStatus::SkippedNoChange => "skipped (no change)",
            OutcomeStatus::Conflict => "conflict",
            OutcomeStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchOutcome {
    pub target_branch: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BranchOutcome {
    pub fn new(target_branch: impl Into<String>, status: OutcomeStatus) -> Self {
        Self {
            target_branch: target_branch.into(),
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Result of one run, outcomes in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    outcomes: Vec<BranchOutcome>,
    aborted: bool,
}

impl DistributionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, outcome: BranchOutcome) {
        if outcome.status == OutcomeStatus::Conflict {
            self.aborted = true;
        }
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[BranchOutcome] {
        &self.outcomes
    }

    /// True iff a conflict stopped the run before every target was attempted
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn applied(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Applied)
            .map(|o| o.target_branch.as_str())
    }

    /// No abort and no failed branch
    pub fn is_clean(&self) -> bool {
        !self.aborted && self.count(OutcomeStatus::Failed) == 0
    }
}

impl fmt::Display for DistributionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            let icon = match outcome.status {
                OutcomeStatus::Applied => "✅",
                OutcomeStatus::SkippedNoChange => "⏭️ ",
                OutcomeStatus::Conflict => "💥",
                OutcomeStatus::Failed => "❌",
            };
            write!(f, "{} {}: {}", icon, outcome.target_branch, outcome.status)?;
            if let Some(message) = &outcome.message {
                write!(f, " ({})", message)?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "{} applied, {} skipped, {} conflict, {} failed",
            self.count(OutcomeStatus::Applied),
            self.count(OutcomeStatus::SkippedNoChange),
            self.count(OutcomeStatus::Conflict),
            self.count(OutcomeStatus::Failed),
        )?;
        if self.aborted {
            write!(f, " (aborted)")?;
        }
        Ok(())
    }
}
