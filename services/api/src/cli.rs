use crate::demo::{run_demo, DemoArgs};
use crate::infra::InstitutionSeed;
use crate::server;
use campus_admin::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Campus Admin",
    about = "Run the campus enrollment service or walk through a scripted demo",
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
    /// Run an end-to-end enrollment demo against an in-memory campus
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
    /// Seed a demo institution before accepting requests
    #[arg(long)]
    pub(crate) seed_demo: bool,
    /// Register an empty institution at startup, as SLUG=NAME (repeatable)
    #[arg(
        long = "register-institution",
        value_name = "SLUG=NAME",
        value_parser = parse_institution_seed
    )]
    pub(crate) institutions: Vec<InstitutionSeed>,
}

fn parse_institution_seed(raw: &str) -> Result<InstitutionSeed, String> {
    match raw.split_once('=') {
        Some((slug, name)) if !slug.trim().is_empty() && !name.trim().is_empty() => {
            Ok(InstitutionSeed {
                slug: slug.trim().to_string(),
                name: name.trim().to_string(),
            })
        }
        _ => Err(format!("expected SLUG=NAME, got '{raw}'")),
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["campus-admin"]).expect("parse");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "campus-admin",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "9090",
            "--seed-demo",
        ])
        .expect("parse");

        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(9090));
                assert!(args.seed_demo);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_registers_institutions_from_flags() {
        let cli = Cli::try_parse_from([
            "campus-admin",
            "serve",
            "--register-institution",
            "north-poly=Northern Polytechnic",
            "--register-institution",
            "coastal=Coastal College",
        ])
        .expect("parse");

        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(
                    args.institutions,
                    vec![
                        InstitutionSeed {
                            slug: "north-poly".to_string(),
                            name: "Northern Polytechnic".to_string(),
                        },
                        InstitutionSeed {
                            slug: "coastal".to_string(),
                            name: "Coastal College".to_string(),
                        },
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn institution_flag_requires_slug_and_name() {
        assert!(Cli::try_parse_from([
            "campus-admin",
            "serve",
            "--register-institution",
            "no-name",
        ])
        .is_err());
    }

    #[test]
    fn demo_rejects_invalid_semester() {
        assert!(Cli::try_parse_from(["campus-admin", "demo", "--semester", "3"]).is_err());
    }
}
