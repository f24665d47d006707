//! Administrator command line for a tollgate data directory.
//!
//! ```bash
//! tollgate --data-dir /var/lib/tollgate admins set ops@example.com
//! TOLLGATE_USER=ops@example.com tollgate enable --mode read-only
//! tollgate --as someone@example.com check --op write
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};
use tollgate_core::api::{self, ApiError, ApiErrorKind, Session};
use tollgate_core::types::{Config, Email, GateSettings, OperationKind};
use tollgate_core::{AdminRoster, Database, MaintenanceGate, MaintenanceStore};
use tracing_subscriber::EnvFilter;

type LocalGate = MaintenanceGate<Arc<Database>, Arc<Database>, Arc<Database>>;

#[derive(Debug, Parser)]
#[command(name = "tollgate", version, about = "Maintenance mode gate")]
struct Cli {
    /// Directory holding tollgate.redb and settings.toml.
    #[arg(long, env = "TOLLGATE_DATA_DIR", default_value = ".tollgate", global = true)]
    data_dir: PathBuf,

    /// Identity the command runs as.
    #[arg(long = "as", env = "TOLLGATE_USER", global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current maintenance record.
    Status {
        /// Print what the front end would show instead of the raw record.
        #[arg(long)]
        view: bool,
    },
    /// Turn maintenance on. Unset fields take their defaults.
    Enable(PatchArgs),
    /// Turn maintenance off, keeping the rest of the record.
    Disable,
    /// Change fields of the current record.
    Update {
        #[command(flatten)]
        patch: PatchArgs,

        #[arg(long)]
        enabled: Option<bool>,

        /// Remove the `until` hint.
        #[arg(long, conflicts_with = "until")]
        clear_until: bool,
    },
    /// Ask whether an operation would be let through. Exits 1 when denied.
    Check {
        #[arg(long)]
        op: OperationKind,
    },
    /// Inspect or replace the administrator roster.
    Admins {
        #[command(subcommand)]
        action: AdminsAction,
    },
}

#[derive(Debug, Args)]
struct PatchArgs {
    /// "full" or "read-only".
    #[arg(long)]
    mode: Option<String>,

    #[arg(long)]
    message: Option<String>,

    #[arg(long)]
    allow_admins: Option<bool>,

    /// ISO-8601 instant shown next to the denial message.
    #[arg(long)]
    until: Option<String>,
}

impl PatchArgs {
    fn to_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        if let Some(mode) = &self.mode {
            body.insert("mode".into(), json!(mode));
        }
        if let Some(message) = &self.message {
            body.insert("message".into(), json!(message));
        }
        if let Some(allow_admins) = self.allow_admins {
            body.insert("allowAdmins".into(), json!(allow_admins));
        }
        if let Some(until) = &self.until {
            body.insert("until".into(), json!(until));
        }
        body
    }
}

#[derive(Debug, Subcommand)]
enum AdminsAction {
    Show,
    /// Replace the roster. Anyone with access to the data directory may do this.
    Set {
        #[arg(required = true)]
        emails: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", pretty(&e));
            ExitCode::from(2)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode, ApiError> {
    let config = Config {
        base_path: cli.data_dir,
    };
    let gate = open_gate(&config)?;
    let session = || {
        cli.actor.as_deref().map(Session::new).ok_or_else(|| ApiError {
            kind: ApiErrorKind::Validation,
            message: "no identity given: pass --as or set TOLLGATE_USER".to_string(),
        })
    };

    match cli.command {
        Command::Status { view: false } => print(&api::get_maintenance_status(&gate)),
        Command::Status { view: true } => print(&api::status_view(&gate)),
        Command::Enable(patch) => {
            let body = Value::Object(patch.to_body());
            print(&api::enable_maintenance(&gate, &session()?, &body)?);
        }
        Command::Disable => print(&api::disable_maintenance(&gate, &session()?)?),
        Command::Update {
            patch,
            enabled,
            clear_until,
        } => {
            let mut body = patch.to_body();
            if let Some(enabled) = enabled {
                body.insert("enabled".into(), json!(enabled));
            }
            if clear_until {
                body.insert("until".into(), Value::Null);
            }
            print(&api::update_maintenance(
                &gate,
                &session()?,
                &Value::Object(body),
            )?);
        }
        Command::Check { op } => {
            let session = session()?;
            let outcome = api::guarded(&gate, &session, op, |_| ());
            return Ok(match outcome {
                Ok(()) => {
                    print(&json!({ "allowed": true }));
                    ExitCode::SUCCESS
                }
                Err(denied) => {
                    print(&json!({ "allowed": false, "message": denied.message }));
                    ExitCode::from(1)
                }
            });
        }
        Command::Admins { action } => match action {
            AdminsAction::Show => print(&gate.roster().admin_emails().map_err(unavailable)?),
            AdminsAction::Set { emails } => {
                let emails = emails
                    .iter()
                    .map(|raw| {
                        Email::try_from(raw.as_str()).map_err(|e| ApiError {
                            kind: ApiErrorKind::Validation,
                            message: format!("invalid email {raw:?}: {e}"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                gate.roster()
                    .set_admin_emails(&emails)
                    .map_err(unavailable)?;
                tracing::info!(
                    target: tollgate_core::AUDIT_TARGET,
                    count = emails.len(),
                    "admin roster replaced"
                );
                print(&emails);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn open_gate(config: &Config) -> Result<LocalGate, ApiError> {
    let settings = GateSettings::load(&config.settings_path()).map_err(unavailable)?;
    for problem in settings.validate() {
        tracing::warn!(%problem, "invalid setting replaced with default");
    }
    let settings = settings.with_defaults_for_invalid();

    // Each run is its own process, so the cache lives in the database file
    // where it outlasts the run.
    let db = Arc::new(Database::new(config).map_err(unavailable)?);

    let roster = AdminRoster::new(Arc::clone(&db), settings.keys.admin_emails_key.clone());
    let store = MaintenanceStore::new(Arc::clone(&db), db, settings);
    Ok(MaintenanceGate::new(store, roster))
}

fn unavailable(e: impl std::fmt::Display) -> ApiError {
    ApiError {
        kind: ApiErrorKind::Unavailable,
        message: e.to_string(),
    }
}

fn print(value: &impl serde::Serialize) {
    println!("{}", pretty(value));
}

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
