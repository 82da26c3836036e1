//! Temporary remotes and clones for git2 tests

use git2::{BranchType, Repository, Signature};
use std::path::PathBuf;
use tempfile::TempDir;

/// A bare repository playing the remote, and a clone of it
pub struct TestRemote {
    pub dir: TempDir,
    pub bare_path: PathBuf,
    pub clone_path: PathBuf,
}

impl TestRemote {
    /// Bare repository with an initial commit on `master`
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let bare_path = dir.path().join("remote.git");
        let clone_path = dir.path().join("clone");

        Repository::init_bare(&bare_path).expect("Failed to init bare repo");
        let remote = Self {
            dir,
            bare_path,
            clone_path,
        };
        remote.commit_on("master", "Initial commit", files);
        remote
            .bare()
            .set_head("refs/heads/master")
            .expect("Failed to set HEAD");
        remote
    }

    pub fn bare(&self) -> Repository {
        Repository::open_bare(&self.bare_path).expect("Failed to open bare repo")
    }

    /// Commit `files` on top of `branch` in the remote, creating the branch if needed
    pub fn commit_on(&self, branch: &str, message: &str, files: &[(&str, &str)]) -> git2::Oid {
        let repo = self.bare();
        let parent = repo
            .find_branch(branch, BranchType::Local)
            .ok()
            .map(|b| b.get().peel_to_commit().expect("Failed to peel branch"));
        let base_tree = parent
            .as_ref()
            .map(|c| c.tree().expect("Failed to get tree"));

        let mut builder = repo
            .treebuilder(base_tree.as_ref())
            .expect("Failed to create tree builder");
        for (name, content) in files {
            let blob = repo.blob(content.as_bytes()).expect("Failed to write blob");
            builder
                .insert(*name, blob, 0o100644)
                .expect("Failed to insert blob");
        }
        let tree_id = builder.write().expect("Failed to write tree");
        let tree = repo.find_tree(tree_id).expect("Failed to find tree");

        let sig = Signature::now("Test User", "test@example.com").expect("Failed to create signature");
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(
            Some(&format!("refs/heads/{}", branch)),
            &sig,
            &sig,
            message,
            &tree,
            &parents,
        )
        .expect("Failed to create commit")
    }

    /// Branch `name` in the remote at the tip of `from`
    pub fn create_branch(&self, name: &str, from: &str) {
        let repo = self.bare();
        let tip = repo
            .find_branch(from, BranchType::Local)
            .expect("Failed to find branch")
            .get()
            .peel_to_commit()
            .expect("Failed to peel branch");
        repo.branch(name, &tip, false)
            .expect("Failed to create branch");
    }

    /// Clone the remote, with a committer identity configured
    pub fn clone_remote(&self) -> Repository {
        let url = self.bare_path.to_str().expect("Non utf-8 temp path");
        let repo = Repository::clone(url, &self.clone_path).expect("Failed to clone");
        let mut config = repo.config().expect("Failed to get config");
        config
            .set_str("user.name", "Test User")
            .expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");
        repo
    }

    /// Content of `file` at the tip of `branch` in the remote
    pub fn read_file(&self, branch: &str, file: &str) -> Option<String> {
        let repo = self.bare();
        let tip = repo
            .find_branch(branch, BranchType::Local)
            .ok()?
            .get()
            .peel_to_commit()
            .ok()?;
        let entry = tip.tree().ok()?.get_name(file)?.to_object(&repo).ok()?;
        let blob = entry.as_blob()?;
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }

    pub fn tip(&self, branch: &str) -> git2::Oid {
        self.bare()
            .find_branch(branch, BranchType::Local)
            .expect("Failed to find branch")
            .get()
            .target()
            .expect("Branch without target")
    }
}
