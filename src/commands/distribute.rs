use crate::{
    config::{Config, DEFAULT_CONFIG_FILE},
    distribution::{BranchDistributionOrchestrator, DistributionReport},
    errors::{DistributeError, Result},
    gateway::Git2Gateway,
    notify::LogSink,
    request::DistributionRequest,
};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct Distribute {
    /// Prefix of the local branch created for each target, e.g. docs-2358
    pub local_branch_base: String,

    /// Branch the commit was made on
    pub source_branch: String,

    /// Full 40 character hash of the commit to distribute
    pub commit: String,

    /// User name for the remote
    pub login: String,

    /// Password or access token for the remote
    pub token: String,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Only distribute to this configured branch (repeatable)
    #[arg(long = "only", value_name = "BRANCH")]
    pub only: Vec<String>,

    /// Keep local branches even if the configuration says to delete them
    #[arg(long)]
    pub keep_local_branches: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Distribute {
    pub fn execute(&self) -> Result<DistributionReport> {
        let config = Config::load(&self.config)?;
        log::debug!("Loaded configuration from {}", self.config.display());

        let gateway = Git2Gateway::open(&config.repository, &config.remote, &config.default_branch)?
            .with_credentials(&self.login, &self.token);

        let signer = config
            .signer
            .clone()
            .or_else(|| gateway.configured_signer())
            .ok_or_else(|| {
                DistributeError::InvalidRequest(
                    "no signer configured and user.name/user.email are not set".to_string(),
                )
            })?;

        let request = DistributionRequest::builder()
            .local_branch_base_name(&self.local_branch_base)
            .source_branch(&self.source_branch)
            .commit_id(&self.commit)
            .target_branches(config.target_branches(&self.source_branch, &self.only)?)
            .signer(signer)
            .delete_local_branches_after_success(
                config.delete_local_branches && !self.keep_local_branches,
            )
            .build()?;

        let sink = LogSink;
        let report = BranchDistributionOrchestrator::new(&gateway, &sink).run(&request)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", report);
        }

        Ok(report)
    }
}
