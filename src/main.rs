mod client;
mod config;
mod error;
mod fetch;
mod models;
mod prompt;
mod workflow;

use crate::client::{ApiClient, Credentials, Session};
use crate::config::{Config, EffectiveConfig, Overrides, Scope, resolve, save};
use crate::prompt::{Driver, Plan};
use crate::workflow::{DeleteReport, SweepTally, create_range, delete_all};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "xiqctl",
    version,
    about = "Bulk create or delete VLAN profiles and user profiles in ExtremeCloud IQ"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "Base URL for the API (defaults to https://api.extremecloudiq.com)"
    )]
    base_url: Option<String>,

    #[arg(
        long,
        short = 'u',
        global = true,
        help = "ExtremeCloud IQ username (otherwise XIQ_USERNAME, config, or prompt)"
    )]
    username: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and run the interactive create/delete workflow (default)
    Run,
    /// Persist connection settings and protect lists to the chosen scope
    Configure {
        #[arg(long, help = "Password to store (saved in plain text)")]
        password: Option<String>,
        #[arg(
            long,
            value_name = "IDS",
            value_delimiter = ',',
            help = "VLAN profile ids never deleted (comma-separated)"
        )]
        vlan_protect: Option<Vec<u64>>,
        #[arg(
            long,
            value_name = "IDS",
            value_delimiter = ',',
            help = "User profile ids never deleted (comma-separated)"
        )]
        user_profile_protect: Option<Vec<u64>>,
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::User,
            help = "Where to write the config (local project dir or user config dir)"
        )]
        scope: ScopeArg,
    },
    /// Check that the stored credentials can log in
    Validate,
    /// Show current configuration (secrets masked)
    ConfigShow,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

fn init_tracing() {
    // RUST_LOG controls verbosity; logs go to stderr so prompts on stdout stay clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let overrides = Overrides {
        base_url: cli.base_url.clone(),
        username: cli.username.clone(),
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_interactive(&cwd, overrides),
        Commands::Configure {
            password,
            vlan_protect,
            user_profile_protect,
            scope,
        } => {
            let mut existing = config::load_scope(scope.into(), &cwd)?;
            if let Some(url) = overrides.base_url {
                existing.base_url = Some(url);
            }
            if let Some(username) = overrides.username {
                existing.username = Some(username);
            }
            if let Some(password) = password {
                existing.password = Some(password);
            }
            if let Some(ids) = vlan_protect {
                existing.vlan_protect = Some(ids);
            }
            if let Some(ids) = user_profile_protect {
                existing.user_profile_protect = Some(ids);
            }

            let path = save(scope.into(), &existing, &cwd)?;
            println!("Saved configuration to {}", path.display());
            Ok(())
        }
        Commands::Validate => {
            let effective = resolve(&cwd, overrides)?;
            let credentials = credentials(&effective)?;
            println!("Validating ExtremeCloud IQ credentials...");
            match login(&effective, &credentials) {
                Ok(_) => {
                    println!("ExtremeCloud IQ: ok");
                    Ok(())
                }
                Err(e) => {
                    println!("ExtremeCloud IQ: FAILED");
                    Err(e)
                }
            }
        }
        Commands::ConfigShow => {
            let effective = resolve(&cwd, overrides)?;
            let masked = Config {
                base_url: Some(effective.base_url),
                username: effective.username,
                password: effective.password.map(|_| "*****".into()),
                vlan_protect: Some(effective.protect.vlan_profiles.into_iter().collect()),
                user_profile_protect: Some(
                    effective.protect.user_profiles.into_iter().collect(),
                ),
            };
            print!("{}", serde_yaml::to_string(&masked)?);
            Ok(())
        }
    }
}

fn run_interactive(cwd: &Path, overrides: Overrides) -> Result<()> {
    let effective = resolve(cwd, overrides)?;
    let credentials = credentials(&effective)?;
    let session = login(&effective, &credentials)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let plan = Driver::new(stdin.lock(), stdout.lock()).run()?;
    info!(?plan, "operator plan");

    match plan {
        Plan::Create {
            start,
            end,
            with_user_profile,
        } => {
            let report = create_range(&session, start, end, with_user_profile, &mut stdout)?;
            println!(
                "\nCreated {} VLAN profile(s) and {} user profile(s).",
                report.vlan_profile_ids.len(),
                report.user_profiles
            );
        }
        Plan::Delete => {
            let report = delete_all(&session, &effective.protect, &mut stdout)?;
            print_delete_summary(&report);
        }
    }
    Ok(())
}

fn login(effective: &EffectiveConfig, credentials: &Credentials) -> Result<Session> {
    let session = ApiClient::new(&effective.base_url)?.login(credentials)?;
    info!(base_url = %session.base_url(), "session established");
    Ok(session)
}

/// Fill in whatever the config did not provide by asking on the terminal.
fn credentials(effective: &EffectiveConfig) -> Result<Credentials> {
    let username = match &effective.username {
        Some(username) if !username.is_empty() => username.clone(),
        _ => {
            print!("ExtremeCloud IQ username: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("reading username")?;
            line.trim().to_string()
        }
    };
    if username.is_empty() {
        return Err(anyhow!("a username is required to log in"));
    }

    let password = match &effective.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password("ExtremeCloud IQ password: ")
            .context("reading password")?,
    };

    Ok(Credentials { username, password })
}

fn print_delete_summary(report: &DeleteReport) {
    fn line(label: &str, tally: &SweepTally) {
        println!(
            "{}: {} deleted, {} protected, {} failed",
            label, tally.deleted, tally.protected, tally.failed
        );
    }
    println!();
    line("User Profiles", &report.user_profiles);
    line("VLAN Profiles", &report.vlan_profiles);
    if report.user_profiles.failed + report.vlan_profiles.failed > 0 {
        println!("Some objects could not be deleted. Check their Used By column in ExtremeCloud IQ.");
    }
}
