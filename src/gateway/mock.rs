use crate::errors::{DistributeError, Result};
use crate::gateway::{BranchKind, BranchRef, CommitRef, PickOutcome, VcsGateway};
use crate::notify::{NotificationSink, ProgressEvent};
use crate::request::{CommitId, Signer};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Every gateway call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(String),
    CreateTrackingBranch { local: String, tracked: String },
    Checkout(String),
    CheckoutDefault,
    CherryPick { branch: String, commit: String },
    Push(String),
    DeleteBranch(String),
}

/// In-memory gateway whose answers are scripted per target branch
pub struct MockGateway {
    pub remote: String,
    pub remote_branches: HashSet<String>,
    pub local_branches: Mutex<HashMap<String, String>>,
    pub commits: HashMap<String, String>,
    pub pick_outcomes: HashMap<String, PickOutcome>,
    pub fetch_error: Option<String>,
    pub push_error: Option<String>,
    pub failing_checkouts: HashSet<String>,
    pub failing_deletes: HashSet<String>,
    pub checked_out: Mutex<Option<String>>,
    pub calls: Mutex<Vec<Call>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            remote: "origin".to_string(),
            remote_branches: HashSet::new(),
            local_branches: Mutex::new(HashMap::new()),
            commits: HashMap::new(),
            pick_outcomes: HashMap::new(),
            fetch_error: None,
            push_error: None,
            failing_checkouts: HashSet::new(),
            failing_deletes: HashSet::new(),
            checked_out: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_remote(mut self, remote: &str) -> Self {
        self.remote = remote.to_string();
        self
    }

    pub fn with_remote_branches(mut self, branches: &[&str]) -> Self {
        for branch in branches {
            self.remote_branches.insert(branch.to_string());
        }
        self
    }

    /// A local branch left over from an earlier run, tracking `tracked`
    pub fn with_local_branch(self, name: &str, tracked: &str) -> Self {
        self.local_branches
            .lock()
            .unwrap()
            .insert(name.to_string(), tracked.to_string());
        self
    }

    pub fn with_commit(mut self, branch: &str, commit: &str) -> Self {
        self.commits.insert(commit.to_string(), branch.to_string());
        self
    }

    /// Outcome of cherry-picking onto the local branch tracking `target`
    pub fn with_pick_outcome(mut self, target: &str, outcome: PickOutcome) -> Self {
        self.pick_outcomes.insert(target.to_string(), outcome);
        self
    }

    pub fn with_fetch_error(mut self, message: &str) -> Self {
        self.fetch_error = Some(message.to_string());
        self
    }

    pub fn with_push_error(mut self, message: &str) -> Self {
        self.push_error = Some(message.to_string());
        self
    }

    pub fn with_failing_checkout(mut self, local: &str) -> Self {
        self.failing_checkouts.insert(local.to_string());
        self
    }

    pub fn with_failing_delete(mut self, local: &str) -> Self {
        self.failing_deletes.insert(local.to_string());
        self
    }

    pub fn get_calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get_local_branches(&self) -> Vec<String> {
        let mut names: Vec<String> = self.local_branches.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn created_branches(&self) -> Vec<String> {
        self.get_calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateTrackingBranch { local, .. } => Some(local),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_branches(&self) -> Vec<String> {
        self.get_calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::DeleteBranch(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl VcsGateway for MockGateway {
    fn remote(&self) -> &str {
        &self.remote
    }

    fn fetch(&self, remote: &str, sink: &dyn NotificationSink) -> Result<()> {
        self.record(Call::Fetch(remote.to_string()));
        if let Some(message) = &self.fetch_error {
            return Err(DistributeError::Fetch(message.clone()));
        }
        sink.on_progress(ProgressEvent::Transfer {
            received: 1,
            total: 1,
            bytes: 42,
        });
        Ok(())
    }

    fn find_branch(&self, name: &str, kind: BranchKind) -> Result<Option<BranchRef>> {
        let exists = match kind {
            BranchKind::Local => self.local_branches.lock().unwrap().contains_key(name),
            BranchKind::Remote => self.remote_branches.contains(name),
        };
        Ok(exists.then(|| BranchRef {
            name: name.to_string(),
            kind,
        }))
    }

    fn find_commit(&self, branch: &BranchRef, commit: &CommitId) -> Result<Option<CommitRef>> {
        Ok(match self.commits.get(commit.as_str()) {
            Some(on_branch) if *on_branch == branch.name => Some(CommitRef {
                id: commit.clone(),
                summary: "Fix docs".to_string(),
            }),
            _ => None,
        })
    }

    fn create_tracking_branch(&self, local_name: &str, tracked: &BranchRef) -> Result<BranchRef> {
        self.record(Call::CreateTrackingBranch {
            local: local_name.to_string(),
            tracked: tracked.name.clone(),
        });
        let mut locals = self.local_branches.lock().unwrap();
        if locals.contains_key(local_name) {
            return Err(DistributeError::Git(git2::Error::from_str(
                "a branch with that name already exists",
            )));
        }
        locals.insert(local_name.to_string(), tracked.name.clone());
        Ok(BranchRef::local(local_name))
    }

    fn checkout(&self, branch: &BranchRef, sink: &dyn NotificationSink) -> Result<()> {
        self.record(Call::Checkout(branch.name.clone()));
        if self.failing_checkouts.contains(&branch.name) {
            return Err(DistributeError::Git(git2::Error::from_str("checkout failed")));
        }
        sink.on_progress(ProgressEvent::CheckoutProgress {
            completed: 1,
            total: 1,
        });
        *self.checked_out.lock().unwrap() = Some(branch.name.clone());
        Ok(())
    }

    fn checkout_default(&self, _sink: &dyn NotificationSink) -> Result<()> {
        self.record(Call::CheckoutDefault);
        *self.checked_out.lock().unwrap() = None;
        Ok(())
    }

    fn cherry_pick(
        &self,
        commit: &CommitRef,
        _signer: &Signer,
        sink: &dyn NotificationSink,
    ) -> PickOutcome {
        let branch = self.checked_out.lock().unwrap().clone().unwrap_or_default();
        self.record(Call::CherryPick {
            branch: branch.clone(),
            commit: commit.id.to_string(),
        });
        let target = self
            .local_branches
            .lock()
            .unwrap()
            .get(&branch)
            .cloned()
            .unwrap_or_default();
        let outcome = self
            .pick_outcomes
            .get(&target)
            .cloned()
            .unwrap_or(PickOutcome::Applied);
        if let PickOutcome::Conflict { paths } = &outcome {
            for path in paths {
                sink.on_conflict_file(path);
            }
        }
        outcome
    }

    fn push(&self, branch: &BranchRef, sink: &dyn NotificationSink) -> Result<()> {
        self.record(Call::Push(branch.name.clone()));
        match &self.push_error {
            Some(message) => sink.on_error(message),
            None => sink.on_progress(ProgressEvent::PushStatus {
                reference: format!("refs/heads/{}", branch.name),
            }),
        }
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        self.record(Call::DeleteBranch(name.to_string()));
        if self.checked_out.lock().unwrap().as_deref() == Some(name) {
            return Err(DistributeError::Git(git2::Error::from_str(
                "cannot delete the checked out branch",
            )));
        }
        if self.failing_deletes.contains(name) {
            return Err(DistributeError::Git(git2::Error::from_str(
                "cannot delete branch",
            )));
        }
        self.local_branches.lock().unwrap().remove(name);
        Ok(())
    }
}
