pub mod git;

#[cfg(test)]
pub mod mock;

pub use git::Git2Gateway;

use crate::errors::Result;
use crate::notify::NotificationSink;
use crate::request::{CommitId, Signer};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Local,
    /// Remote-tracking branch of the configured remote
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Short name, without the remote prefix for remote branches
    pub name: String,
    pub kind: BranchKind,
}

impl BranchRef {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BranchKind::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub id: CommitId,
    pub summary: String,
}

/// What happened when a commit was cherry-picked onto the checked out branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// A new commit was created on the branch
    Applied,
    /// The change is already present, nothing to commit
    NoOp,
    /// The change does not apply cleanly; nothing was written
    Conflict { paths: Vec<PathBuf> },
    Error(String),
}

/// The version control primitives a distribution run is built from.
///
/// Every call is synchronous; timeouts are the implementation's business and
/// surface as errors.
pub trait VcsGateway {
    /// Name of the remote every branch is tracked from
    fn remote(&self) -> &str;

    fn fetch(&self, remote: &str, sink: &dyn NotificationSink) -> Result<()>;

    fn find_branch(&self, name: &str, kind: BranchKind) -> Result<Option<BranchRef>>;

    /// `Some` iff `commit` is the tip of `branch` or reachable from it
    fn find_commit(&self, branch: &BranchRef, commit: &CommitId) -> Result<Option<CommitRef>>;

    fn create_tracking_branch(&self, local_name: &str, tracked: &BranchRef) -> Result<BranchRef>;

    /// Forced checkout, stray local modifications are discarded
    fn checkout(&self, branch: &BranchRef, sink: &dyn NotificationSink) -> Result<()>;

    /// Move away from whatever is checked out so it can be deleted
    fn checkout_default(&self, sink: &dyn NotificationSink) -> Result<()>;

    fn cherry_pick(
        &self,
        commit: &CommitRef,
        signer: &Signer,
        sink: &dyn NotificationSink,
    ) -> PickOutcome;

    /// Rejections and transfer problems are reported to `sink`, not returned
    fn push(&self, branch: &BranchRef, sink: &dyn NotificationSink) -> Result<()>;

    fn delete_branch(&self, name: &str) -> Result<()>;
}
