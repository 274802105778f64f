use crate::batch::{run_validate, ValidateArgs};
use crate::infra::parse_config_pair;
use crate::server;
use clap::{Args, Parser, Subcommand};
use rcm_engine::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "RCM Claim Adjudication Engine",
    about = "Serve or run multi-tenant claim adjudication from the command line",
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
    /// Adjudicate a claims CSV against rule files and print the verdicts
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Tenant to seed from files before serving
    #[arg(long, requires = "claims")]
    pub(crate) tenant: Option<String>,
    /// Claims CSV export for the seeded tenant
    #[arg(long, requires = "tenant")]
    pub(crate) claims: Option<PathBuf>,
    /// Technical rules for the seeded tenant
    #[arg(long, requires = "tenant")]
    pub(crate) technical_rules: Option<PathBuf>,
    /// Medical rules for the seeded tenant
    #[arg(long, requires = "tenant")]
    pub(crate) medical_rules: Option<PathBuf>,
    /// Setting for the seeded tenant, as key=value (repeatable)
    #[arg(
        long = "config",
        value_name = "KEY=VALUE",
        value_parser = parse_config_pair,
        requires = "tenant"
    )]
    pub(crate) overrides: Vec<(String, String)>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Validate(args) => run_validate(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_repeated_config_overrides() {
        let cli = Cli::try_parse_from([
            "rcm-engine-api",
            "validate",
            "--tenant",
            "clinic-a",
            "--claims",
            "claims.csv",
            "--config",
            "paid_amount_approval_threshold=400",
            "--config",
            "paid_amount_caps=[]",
            "--json",
        ])
        .expect("arguments parse");

        let Some(Command::Validate(args)) = cli.command else {
            panic!("expected validate command");
        };
        assert_eq!(args.tenant, "clinic-a");
        assert_eq!(args.overrides.len(), 2);
        assert_eq!(args.overrides[1].0, "paid_amount_caps");
        assert!(args.json);
        assert!(args.technical_rules.is_none());
    }

    #[test]
    fn serve_seeding_requires_tenant_and_claims() {
        let cli = Cli::try_parse_from([
            "rcm-engine-api",
            "serve",
            "--tenant",
            "clinic-a",
            "--claims",
            "claims.csv",
            "--medical-rules",
            "medical.txt",
        ])
        .expect("seeded serve parses");
        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.tenant.as_deref(), Some("clinic-a"));
        assert!(args.medical_rules.is_some());

        assert!(Cli::try_parse_from(["rcm-engine-api", "serve", "--claims", "claims.csv"]).is_err());
        assert!(Cli::try_parse_from(["rcm-engine-api", "serve", "--tenant", "clinic-a"]).is_err());
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["rcm-engine-api"]).expect("no arguments");
        assert!(cli.command.is_none());
    }
}
