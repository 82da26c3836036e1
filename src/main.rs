use clap::Parser;
use commands::distribute::Distribute;

mod commands;
mod config;
mod distribution;
mod errors;
mod gateway;
mod notify;
mod request;

#[cfg(test)]
mod test_utils;

/// Exit code of a run stopped by a cherry-pick conflict
const EXIT_ABORTED: i32 = 4;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "cherry-distribute")]
#[command(
    about = "Cherry-pick one commit onto every configured branch and push the results",
    long_about = None
)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    distribute: Distribute,
}

fn main() {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match args.distribute.execute() {
        Ok(report) if report.aborted() => {
            eprintln!("Aborted: a conflict stopped the distribution");
            std::process::exit(EXIT_ABORTED);
        }
        Ok(report) => {
            let applied: Vec<&str> = report.applied().collect();
            log::info!("🚀 Pushed to: {}", applied.join(", "));
            if !report.is_clean() {
                log::warn!("Some branches failed, their local branches were kept for inspection");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
