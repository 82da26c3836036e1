use crate::errors::{DistributeError, Result};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::LazyLock;

static COMMIT_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{40}$").expect("Invalid regex pattern for commit id")
});

/// Full, lowercase, 40 hex digit commit hash
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(String);

impl CommitId {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !COMMIT_ID_REGEX.is_match(trimmed) {
            return Err(DistributeError::InvalidCommitId(input.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Signer {
    pub name: String,
    pub email: String,
}

/// Everything one run needs. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct DistributionRequest {
    source_branch: String,
    commit_id: CommitId,
    target_branches: Vec<String>,
    local_branch_base_name: String,
    signer: Signer,
    delete_local_branches_after_success: bool,
}

impl DistributionRequest {
    pub fn builder() -> DistributionRequestBuilder {
        DistributionRequestBuilder::default()
    }

    pub fn source_branch(&self) -> &str {
        &self.source_branch
    }

    pub fn commit_id(&self) -> &CommitId {
        &self.commit_id
    }

    pub fn target_branches(&self) -> &[String] {
        &self.target_branches
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn delete_local_branches_after_success(&self) -> bool {
        self.delete_local_branches_after_success
    }

    /// Name of the local branch used to carry the commit onto `target`
    pub fn local_branch_name(&self, target: &str) -> String {
        format!("{}-{}", self.local_branch_base_name, target)
    }
}

#[derive(Debug, Default)]
pub struct DistributionRequestBuilder {
    source_branch: Option<String>,
    commit_id: Option<String>,
    target_branches: Vec<String>,
    local_branch_base_name: Option<String>,
    signer: Option<Signer>,
    delete_local_branches_after_success: bool,
}

impl DistributionRequestBuilder {
    pub fn source_branch(mut self, branch: impl Into<String>) -> Self {
        self.source_branch = Some(branch.into());
        self
    }

    pub fn commit_id(mut self, commit: impl Into<String>) -> Self {
        self.commit_id = Some(commit.into());
        self
    }

    pub fn target_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_branches = branches.into_iter().map(Into::into).collect();
        self
    }

    pub fn local_branch_base_name(mut self, name: impl Into<String>) -> Self {
        self.local_branch_base_name = Some(name.into());
        self
    }

    pub fn signer(mut self, signer: Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn delete_local_branches_after_success(mut self, delete: bool) -> Self {
        self.delete_local_branches_after_success = delete;
        self
    }

    pub fn build(self) -> Result<DistributionRequest> {
        let local_branch_base_name = non_empty(self.local_branch_base_name, "local branch base name")?;
        let source_branch = non_empty(self.source_branch, "source branch")?;

        let commit_id = self
            .commit_id
            .ok_or_else(|| DistributeError::InvalidRequest("missing commit id".to_string()))
            .and_then(|commit| CommitId::parse(&commit))?;

        let signer = self
            .signer
            .ok_or_else(|| DistributeError::InvalidRequest("missing signer identity".to_string()))?;
        if signer.name.trim().is_empty() || signer.email.trim().is_empty() {
            return Err(DistributeError::InvalidRequest(
                "signer name and email must not be empty".to_string(),
            ));
        }

        // Set semantics, first occurrence keeps its position
        let mut target_branches: Vec<String> = Vec::new();
        for branch in self.target_branches {
            let branch = branch.trim().to_string();
            if branch.is_empty() {
                return Err(DistributeError::InvalidRequest(
                    "target branch names must not be empty".to_string(),
                ));
            }
            if !target_branches.contains(&branch) {
                target_branches.push(branch);
            }
        }

        if target_branches.is_empty() {
            return Err(DistributeError::InvalidRequest(
                "no target branches to distribute to".to_string(),
            ));
        }

        if target_branches.contains(&source_branch) {
            return Err(DistributeError::InvalidRequest(format!(
                "source branch '{}' is also a target branch",
                source_branch
            )));
        }

        Ok(DistributionRequest {
            source_branch,
            commit_id,
            target_branches,
            local_branch_base_name,
            signer,
            delete_local_branches_after_success: self.delete_local_branches_after_success,
        })
    }
}

fn non_empty(value: Option<String>, what: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DistributeError::InvalidRequest(format!("missing {}", what))),
    }
}
