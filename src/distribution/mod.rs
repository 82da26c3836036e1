pub mod orchestrator;
pub mod report;


pub use orchestrator::BranchDistributionOrchestrator;
pub use report::DistributionReport;
