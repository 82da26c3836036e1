use crate::errors::{DistributeError, Result};
use crate::gateway::{BranchKind, BranchRef, CommitRef, PickOutcome, VcsGateway};
use crate::notify::{NotificationSink, ProgressEvent};
use crate::request::{CommitId, Signer};
use auth_git2::GitAuthenticator;
use git2::{
    build::CheckoutBuilder, BranchType, CheckoutNotificationType, Commit, ErrorCode, FetchOptions,
    MergeOptions, ObjectType, Oid, PushOptions, RemoteCallbacks, Repository, Signature,
};
use std::path::{Path, PathBuf};

/// `VcsGateway` over a local clone, using libgit2
pub struct Git2Gateway {
    repo: Repository,
    remote: String,
    default_branch: String,
    auth: GitAuthenticator,
}

impl Git2Gateway {
    pub fn open(path: impl AsRef<Path>, remote: &str, default_branch: &str) -> Result<Self> {
        let repo = Repository::open(path.as_ref()).map_err(|e| {
            log::error!("Cannot open repository {}: {}", path.as_ref().display(), e);
            e
        })?;
        Ok(Self {
            repo,
            remote: remote.to_string(),
            default_branch: default_branch.to_string(),
            auth: GitAuthenticator::default(),
        })
    }

    /// Use `login`/`token` for every host that asks for a password
    pub fn with_credentials(mut self, login: &str, token: &str) -> Self {
        self.auth = self.auth.add_plaintext_credentials("*", login, token);
        self
    }

    #[cfg(test)]
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// `user.name` / `user.email` from the repository's git config
    pub fn configured_signer(&self) -> Option<Signer> {
        let config = self.repo.config().ok()?;
        let name = config.get_string("user.name").ok()?;
        let email = config.get_string("user.email").ok()?;
        Some(Signer { name, email })
    }

    fn git_branch(&self, branch: &BranchRef) -> Result<git2::Branch<'_>> {
        let branch = match branch.kind {
            BranchKind::Local => self.repo.find_branch(&branch.name, BranchType::Local)?,
            BranchKind::Remote => self.repo.find_branch(
                &format!("{}/{}", self.remote, branch.name),
                BranchType::Remote,
            )?,
        };
        Ok(branch)
    }

    fn remote_callbacks<'a>(
        &'a self,
        git_config: &'a git2::Config,
        sink: &'a dyn NotificationSink,
    ) -> RemoteCallbacks<'a> {
        let mut credentials = self.auth.credentials(git_config);
        let mut callbacks = RemoteCallbacks::new();

        callbacks.credentials(move |url, username_from_url, allowed_types| {
            sink.on_progress(ProgressEvent::Credentials {
                url: url.to_string(),
            });
            credentials(url, username_from_url, allowed_types)
        });

        callbacks.transfer_progress(move |stats| {
            sink.on_progress(ProgressEvent::Transfer {
                received: stats.received_objects(),
                total: stats.total_objects(),
                bytes: stats.received_bytes(),
            });
            true
        });

        callbacks.sideband_progress(move |data| {
            if let Ok(message) = std::str::from_utf8(data) {
                let message = message.trim();
                if !message.is_empty() {
                    sink.on_progress(ProgressEvent::Remote(message.to_string()));
                }
            }
            true
        });

        callbacks.push_transfer_progress(move |current, total, bytes| {
            sink.on_progress(ProgressEvent::PushTransfer {
                current,
                total,
                bytes,
            });
        });

        callbacks
    }

    fn try_cherry_pick(
        &self,
        commit: &CommitRef,
        signer: &Signer,
        sink: &dyn NotificationSink,
    ) -> Result<PickOutcome> {
        let picked = self.repo.find_commit(Oid::from_str(commit.id.as_str())?)?;
        let head = self.repo.head()?.peel_to_commit()?;

        let mut merge_opts = MergeOptions::new();
        merge_opts.ignore_whitespace(true).fail_on_conflict(true);

        let mut index = match self.repo.cherrypick_commit(&picked, &head, 0, Some(&merge_opts)) {
            Ok(index) => index,
            Err(e) if matches!(e.code(), ErrorCode::MergeConflict | ErrorCode::Conflict) => {
                return self.conflict(&picked, &head, sink);
            }
            Err(e) => return Err(e.into()),
        };

        if index.has_conflicts() {
            return self.conflict(&picked, &head, sink);
        }

        let tree_id = index.write_tree_to(&self.repo)?;
        if tree_id == head.tree_id() {
            return Ok(PickOutcome::NoOp);
        }

        let tree = self.repo.find_tree(tree_id)?;
        let committer = Signature::now(&signer.name, &signer.email)?;
        let new_id = self.repo.commit(
            Some("HEAD"),
            &picked.author(),
            &committer,
            picked.message().unwrap_or(""),
            &tree,
            &[&head],
        )?;
        log::debug!("Created {} from {}", new_id, commit.id.short());

        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))?;

        Ok(PickOutcome::Applied)
    }

    /// Redo the pick without failing on conflicts, only to learn which paths collide
    fn conflict(
        &self,
        picked: &Commit<'_>,
        head: &Commit<'_>,
        sink: &dyn NotificationSink,
    ) -> Result<PickOutcome> {
        let mut merge_opts = MergeOptions::new();
        merge_opts.ignore_whitespace(true);
        let index = self
            .repo
            .cherrypick_commit(picked, head, 0, Some(&merge_opts))?;

        let mut paths = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
                let path = PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned());
                sink.on_conflict_file(&path);
                paths.push(path);
            }
        }

        Ok(PickOutcome::Conflict { paths })
    }
}

impl VcsGateway for Git2Gateway {
    fn remote(&self) -> &str {
        &self.remote
    }

    fn fetch(&self, remote_name: &str, sink: &dyn NotificationSink) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|e| DistributeError::Fetch(format!("remote '{}': {}", remote_name, e.message())))?;

        let git_config = self.repo.config()?;
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(self.remote_callbacks(&git_config, sink));

        // Empty refspecs means the remote's configured ones
        let refspecs: [&str; 0] = [];
        remote
            .fetch(&refspecs, Some(&mut fetch_opts), None)
            .map_err(|e| DistributeError::Fetch(e.message().to_string()))
    }

    fn find_branch(&self, name: &str, kind: BranchKind) -> Result<Option<BranchRef>> {
        let branch = BranchRef {
            name: name.to_string(),
            kind,
        };
        match self.git_branch(&branch) {
            Ok(_) => Ok(Some(branch)),
            Err(DistributeError::Git(e)) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find_commit(&self, branch: &BranchRef, commit: &CommitId) -> Result<Option<CommitRef>> {
        let oid = Oid::from_str(commit.as_str())?;
        let tip = self.git_branch(branch)?.get().peel_to_commit()?;

        let found = match self.repo.find_commit(oid) {
            Ok(found) => found,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if tip.id() != oid && !self.repo.graph_descendant_of(tip.id(), oid)? {
            return Ok(None);
        }

        Ok(Some(CommitRef {
            id: commit.clone(),
            summary: found.summary().unwrap_or("").to_string(),
        }))
    }

    fn create_tracking_branch(&self, local_name: &str, tracked: &BranchRef) -> Result<BranchRef> {
        let tip = self.git_branch(tracked)?.get().peel_to_commit()?;
        let mut local = self.repo.branch(local_name, &tip, false)?;
        if tracked.kind == BranchKind::Remote {
            local.set_upstream(Some(&format!("{}/{}", self.remote, tracked.name)))?;
        } else {
            local.set_upstream(Some(&tracked.name))?;
        }
        Ok(BranchRef::local(local_name))
    }

    fn checkout(&self, branch: &BranchRef, sink: &dyn NotificationSink) -> Result<()> {
        let git_branch = self.git_branch(branch)?;
        let reference = git_branch.get();
        let target = reference.peel(ObjectType::Commit)?;

        let mut checkout = CheckoutBuilder::new();
        checkout
            .force()
            .notify_on(CheckoutNotificationType::all())
            .notify(move |kind, path, _baseline, _target, _workdir| {
                if let Some(path) = path {
                    sink.on_progress(ProgressEvent::Checkout {
                        kind: format!("{:?}", kind),
                        path: path.display().to_string(),
                    });
                }
                true
            })
            .progress(move |_path, completed, total| {
                sink.on_progress(ProgressEvent::CheckoutProgress { completed, total });
            });

        self.repo.checkout_tree(&target, Some(&mut checkout))?;

        match (branch.kind, reference.name()) {
            (BranchKind::Local, Some(refname)) => self.repo.set_head(refname)?,
            _ => self.repo.set_head_detached(target.id())?,
        }
        Ok(())
    }

    fn checkout_default(&self, sink: &dyn NotificationSink) -> Result<()> {
        match self.find_branch(&self.default_branch, BranchKind::Local)? {
            Some(default) => self.checkout(&default, sink),
            None => {
                let head = self.repo.head()?.peel_to_commit()?;
                self.repo.set_head_detached(head.id())?;
                Ok(())
            }
        }
    }

    fn cherry_pick(
        &self,
        commit: &CommitRef,
        signer: &Signer,
        sink: &dyn NotificationSink,
    ) -> PickOutcome {
        match self.try_cherry_pick(commit, signer, sink) {
            Ok(outcome) => outcome,
            Err(e) => PickOutcome::Error(e.to_string()),
        }
    }

    fn push(&self, branch: &BranchRef, sink: &dyn NotificationSink) -> Result<()> {
        let local = self.repo.find_branch(&branch.name, BranchType::Local)?;
        let upstream = local.upstream()?;
        let upstream_name = upstream
            .name()?
            .ok_or_else(|| git2::Error::from_str("upstream branch name is not valid utf-8"))?;
        let prefix = format!("{}/", self.remote);
        let remote_branch = upstream_name
            .strip_prefix(prefix.as_str())
            .unwrap_or(upstream_name)
            .to_string();

        let refspec = format!("refs/heads/{}:refs/heads/{}", branch.name, remote_branch);
        let mut remote = self.repo.find_remote(&self.remote)?;

        let git_config = self.repo.config()?;
        let mut callbacks = self.remote_callbacks(&git_config, sink);
        callbacks.push_update_reference(move |reference, status| {
            match status {
                Some(message) => {
                    sink.on_error(&format!("push of {} rejected: {}", reference, message))
                }
                None => sink.on_progress(ProgressEvent::PushStatus {
                    reference: reference.to_string(),
                }),
            }
            Ok(())
        });

        let mut push_opts = PushOptions::new();
        push_opts.remote_callbacks(callbacks);

        log::debug!("Pushing {}", refspec);
        if let Err(e) = remote.push(&[refspec.as_str()], Some(&mut push_opts)) {
            sink.on_error(&format!("push of {} failed: {}", branch.name, e.message()));
        }
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        match self.repo.find_branch(name, BranchType::Local) {
            Ok(mut branch) => {
                branch.delete()?;
                Ok(())
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
