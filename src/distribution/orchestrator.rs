use crate::distribution::report::{BranchOutcome, DistributionReport, OutcomeStatus};
use crate::errors::{DistributeError, Result};
use crate::gateway::{BranchKind, BranchRef, CommitRef, PickOutcome, VcsGateway};
use crate::notify::{NotificationSink, ProgressEvent};
use crate::request::DistributionRequest;

/// Where a single target branch stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Init,
    Prepared,
    CheckedOut,
    Picked,
    Pushed,
    Done,
    EmptyCommitSkip,
    ConflictAbort,
    Errored,
}

/// Working record for one target, turned into a `BranchOutcome` once terminal
#[derive(Debug)]
struct BranchAttempt {
    target_branch: String,
    local_branch_name: String,
    state: AttemptState,
    error_detail: Option<String>,
}

impl BranchAttempt {
    fn new(target_branch: &str, local_branch_name: String) -> Self {
        Self {
            target_branch: target_branch.to_string(),
            local_branch_name,
            state: AttemptState::Init,
            error_detail: None,
        }
    }

    fn advance(&mut self, next: AttemptState, sink: &dyn NotificationSink) {
        self.state = next;
        sink.on_progress(ProgressEvent::Step {
            branch: self.target_branch.clone(),
            step: format!("{:?}", next),
        });
    }

    fn fail(mut self, next: AttemptState, detail: String, sink: &dyn NotificationSink) -> BranchOutcome {
        self.error_detail = Some(detail);
        self.advance(next, sink);
        self.into_outcome()
    }

    fn into_outcome(self) -> BranchOutcome {
        let status = match self.state {
            AttemptState::Done => OutcomeStatus::Applied,
            AttemptState::EmptyCommitSkip => OutcomeStatus::SkippedNoChange,
            AttemptState::ConflictAbort => OutcomeStatus::Conflict,
            _ => OutcomeStatus::Failed,
        };
        let outcome = BranchOutcome::new(self.target_branch, status);
        match self.error_detail {
            Some(detail) => outcome.with_message(detail),
            None => outcome,
        }
    }
}

/// Carries one commit onto every target branch of a request, one branch at a
/// time, in request order.
///
/// A conflict stops the run. No-ops and pick failures are recorded and the run
/// moves on to the next branch.
pub struct BranchDistributionOrchestrator<'a, G: VcsGateway + ?Sized> {
    gateway: &'a G,
    sink: &'a dyn NotificationSink,
}

impl<'a, G: VcsGateway + ?Sized> BranchDistributionOrchestrator<'a, G> {
    pub fn new(gateway: &'a G, sink: &'a dyn NotificationSink) -> Self {
        Self { gateway, sink }
    }

    /// Only precondition violations are returned as errors, every per-branch
    /// condition ends up in the report.
    pub fn run(&self, request: &DistributionRequest) -> Result<DistributionReport> {
        let remote = self.gateway.remote();
        log::info!("🔄 Fetching {}", remote);
        self.gateway.fetch(remote, self.sink)?;

        let source = self
            .gateway
            .find_branch(request.source_branch(), BranchKind::Remote)?
            .ok_or_else(|| DistributeError::BranchNotFound(request.source_branch().to_string()))?;

        let commit = self
            .gateway
            .find_commit(&source, request.commit_id())?
            .ok_or_else(|| DistributeError::CommitNotFound {
                commit: request.commit_id().to_string(),
                branch: request.source_branch().to_string(),
            })?;

        // Every target must be resolvable before the first one is touched
        let tracked = request
            .target_branches()
            .iter()
            .map(|target| {
                self.gateway
                    .find_branch(target, BranchKind::Remote)?
                    .ok_or_else(|| DistributeError::TrackedBranchNotFound(target.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "🍒 Distributing {} \"{}\" from {} to {} branch(es)",
            commit.id.short(),
            commit.summary,
            request.source_branch(),
            tracked.len()
        );

        let mut report = DistributionReport::new();
        for (target, tracked) in request.target_branches().iter().zip(&tracked) {
            let outcome = self.distribute_to(request, &commit, target, tracked);
            let conflict = outcome.status == OutcomeStatus::Conflict;
            report.record(outcome);
            if conflict {
                log::warn!("🛑 Conflict on {}, remaining branches are not attempted", target);
                break;
            }
        }

        Ok(report)
    }

    fn distribute_to(
        &self,
        request: &DistributionRequest,
        commit: &CommitRef,
        target: &str,
        tracked: &BranchRef,
    ) -> BranchOutcome {
        let mut attempt = BranchAttempt::new(target, request.local_branch_name(target));
        log::info!("➡️  {} ({})", target, attempt.local_branch_name);

        let local = match self.prepare(&attempt.local_branch_name, tracked) {
            Ok(local) => local,
            Err(e) => {
                self.sink.on_error(&format!("{}: cannot create local branch: {}", target, e));
                return attempt.fail(AttemptState::Errored, e.to_string(), self.sink);
            }
        };
        attempt.advance(AttemptState::Prepared, self.sink);

        if let Err(e) = self.gateway.checkout(&local, self.sink) {
            self.sink.on_error(&format!("{}: checkout failed: {}", target, e));
            return attempt.fail(AttemptState::Errored, e.to_string(), self.sink);
        }
        attempt.advance(AttemptState::CheckedOut, self.sink);

        match self.gateway.cherry_pick(commit, request.signer(), self.sink) {
            PickOutcome::Applied => attempt.advance(AttemptState::Picked, self.sink),
            PickOutcome::NoOp => {
                log::info!("⏭️  {} already contains the change", target);
                attempt.advance(AttemptState::EmptyCommitSkip, self.sink);
                if request.delete_local_branches_after_success() {
                    self.remove_after_success(&local.name);
                }
                return attempt.into_outcome();
            }
            PickOutcome::Conflict { paths } => {
                let detail = match paths.len() {
                    0 => "cherry-pick conflict".to_string(),
                    n => format!("cherry-pick conflict in {} file(s)", n),
                };
                return attempt.fail(AttemptState::ConflictAbort, detail, self.sink);
            }
            PickOutcome::Error(detail) => {
                // The local branch is kept for inspection
                self.sink.on_error(&format!("{}: cherry-pick failed: {}", target, detail));
                return attempt.fail(AttemptState::Errored, detail, self.sink);
            }
        }

        if let Err(e) = self.gateway.push(&local, self.sink) {
            self.sink.on_error(&format!("{}: push failed: {}", target, e));
        }
        attempt.advance(AttemptState::Pushed, self.sink);

        if request.delete_local_branches_after_success() {
            self.remove_after_success(&local.name);
        }
        attempt.advance(AttemptState::Done, self.sink);
        log::info!("✅ {} done", target);

        attempt.into_outcome()
    }

    /// Fresh local branch tracking `tracked`, replacing a stale one of the same name
    fn prepare(&self, local_name: &str, tracked: &BranchRef) -> Result<BranchRef> {
        if self
            .gateway
            .find_branch(local_name, BranchKind::Local)?
            .is_some()
        {
            log::info!("🧹 Replacing stale local branch {}", local_name);
            self.remove_local_branch(local_name)?;
        }
        self.gateway.create_tracking_branch(local_name, tracked)
    }

    fn remove_local_branch(&self, local_name: &str) -> Result<()> {
        self.gateway.checkout_default(self.sink)?;
        self.gateway.delete_branch(local_name)
    }

    fn remove_after_success(&self, local_name: &str) {
        if let Err(e) = self.remove_local_branch(local_name) {
            self.sink
                .on_error(&format!("cannot delete local branch {}: {}", local_name, e));
        }
    }
}
