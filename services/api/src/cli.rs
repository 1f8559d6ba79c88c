use crate::demo::{run_appraise, run_demo, AppraiseArgs, DemoArgs};
use crate::server;
use appraisal::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Comparable Sales Appraiser",
    about = "Run the comparable-sales appraisal service or value a property from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Value a subject property from a JSON request and optional comparables CSV
    Appraise(AppraiseArgs),
    /// Print a worked valuation of a built-in sample appraisal
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Appraise(args) => run_appraise(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn appraise_parses_overrides() {
        let cli = Cli::try_parse_from([
            "appraisal-api",
            "appraise",
            "--input",
            "request.json",
            "--method",
            "median",
            "--discount",
            "5",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Appraise(args)) => {
                assert_eq!(args.discount, Some(5.0));
                assert!(args.method.is_some());
                assert!(args.comparables_csv.is_none());
            }
            other => panic!("expected appraise command, got {other:?}"),
        }
    }
}
