// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use loandesk_api::Client;
use loandesk_app::{AppState, LoginInput, Role, Session, SignupInput};
use loandesk_db::{DEMO_ADMIN, DEMO_USER, Store};
use runtime::{ApiRuntime, StoreRuntime};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

const PASSWORD_ENV: &str = "LOANDESK_PASSWORD";
const PASSWORD_CONFIRM_ENV: &str = "LOANDESK_PASSWORD_CONFIRM";
const LOG_ENV: &str = "LOANDESK_LOG";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `loandesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_logging(&config, &options.config_path)?;

    match options.backend {
        Backend::Demo => {
            let store = Store::open_memory()?;
            store.bootstrap()?;
            store.seed_demo_data(OffsetDateTime::now_utc().date())?;
            if options.check_only {
                return Ok(());
            }
            let (user_name, password) = match options.demo_role {
                Role::Admin => DEMO_ADMIN,
                Role::User => DEMO_USER,
            };
            let session = store.login(user_name, password)?.session();
            let mut runtime = StoreRuntime::new(&store);
            launch(session, &mut runtime)
        }
        Backend::Offline => {
            let db_path = config.db_path()?;
            let store = Store::open(&db_path).with_context(|| {
                format!(
                    "open database {} -- if this path is wrong, set [storage].db_path or {}",
                    db_path.display(),
                    loandesk_db::DB_PATH_ENV
                )
            })?;
            store.bootstrap()?;
            if options.check_only {
                return Ok(());
            }
            let session = if options.signup {
                store.create_user(&signup_input(&options)?)?.session()
            } else {
                let login = login_input(&options)?;
                store.login(&login.user_name, &login.password)?.session()
            };
            let mut runtime = StoreRuntime::new(&store);
            launch(session, &mut runtime)
        }
        Backend::Remote => {
            let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
                format!(
                    "invalid [server] config in {}; fix base_url/timeout values",
                    options.config_path.display()
                )
            })?;
            if options.check_only {
                client.list_loans()?;
                return Ok(());
            }
            let session = if options.signup {
                client.signup(&signup_input(&options)?)?.session()
            } else {
                let login = login_input(&options)?;
                client.login(&login.user_name, &login.password)?.session()
            };
            let mut runtime = ApiRuntime::new(client);
            launch(session, &mut runtime)
        }
    }
}

fn launch<R: loandesk_tui::LoanRuntime>(session: Session, runtime: &mut R) -> Result<()> {
    let mut state = AppState::new(session);
    loandesk_tui::run_app(&mut state, runtime)
}

fn init_logging(config: &Config, config_path: &Path) -> Result<()> {
    let log_path = config.log_file(config_path);
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;

    let directives = env::var(LOG_ENV).unwrap_or_else(|_| config.log_level().to_owned());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter {directives:?}; set [log].level or {LOG_ENV}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("install logger: {error}"))
}

fn login_input(options: &CliOptions) -> Result<LoginInput> {
    let Some(user_name) = options.user.clone() else {
        bail!("pass --user <name> and set {PASSWORD_ENV}, or run with --demo");
    };
    let input = LoginInput {
        user_name,
        password: env::var(PASSWORD_ENV).unwrap_or_default(),
    };
    input
        .validate()
        .with_context(|| format!("login as {:?} (password from {PASSWORD_ENV})", input.user_name))?;
    Ok(input)
}

fn signup_input(options: &CliOptions) -> Result<loandesk_app::NewUser> {
    let Some(user_name) = options.user.clone() else {
        bail!("--signup needs --user <name> and {PASSWORD_ENV}");
    };
    let password = env::var(PASSWORD_ENV).unwrap_or_default();
    let confirm_password = env::var(PASSWORD_CONFIRM_ENV).unwrap_or_else(|_| password.clone());
    let input = SignupInput {
        user_name,
        password,
        confirm_password,
    };
    input
        .validate()
        .with_context(|| format!("sign up {:?}", input.user_name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Remote,
    Offline,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    backend: Backend,
    demo_role: Role,
    user: Option<String>,
    signup: bool,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        backend: Backend::Remote,
        demo_role: Role::Admin,
        user: None,
        signup: false,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };
    let mut offline = false;
    let mut demo = false;
    let mut demo_role = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--user" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--user requires a user name"))?;
                options.user = Some(value.as_ref().to_owned());
            }
            "--as" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--as requires admin or user"))?;
                let role = Role::parse(value.as_ref()).ok_or_else(|| {
                    anyhow!("--as expects admin or user, got {:?}", value.as_ref())
                })?;
                demo_role = Some(role);
            }
            "--signup" => options.signup = true,
            "--demo" => demo = true,
            "--offline" => offline = true,
            "--print-config-path" => options.print_config_path = true,
            "--print-example-config" => options.print_example = true,
            "--check" => options.check_only = true,
            "--help" | "-h" => options.show_help = true,
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    if demo && offline {
        bail!("--demo and --offline cannot be combined");
    }
    if demo && (options.user.is_some() || options.signup) {
        bail!("--demo logs in with a built-in account; use --as admin|user instead of --user");
    }
    if demo_role.is_some() && !demo {
        bail!("--as only applies to --demo");
    }

    options.backend = if demo {
        Backend::Demo
    } else if offline {
        Backend::Offline
    } else {
        Backend::Remote
    };
    options.demo_role = demo_role.unwrap_or(Role::Admin);
    Ok(options)
}

fn print_help() {
    println!("loandesk");
    println!("  --config <path>          Use a specific config path");
    println!("  --user <name>            Log in as <name>; password from {PASSWORD_ENV}");
    println!("  --signup                 Create the --user account, then log in");
    println!("  --offline                Use the local SQLite store instead of the server");
    println!("  --demo                   Launch with seeded demo data (in-memory)");
    println!("  --as <admin|user>        Demo account to use (default admin)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and reach the backend, then exit");
    println!("  --help                   Show this help");
}
