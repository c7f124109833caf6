//! CLI for the Gerbang secure gateway.
//!
//! Every state-changing subcommand goes through the CSRF-guarded client:
//! fetch token -> send mutation -> one retry on a stale token.

use clap::{Parser, Subcommand, ValueEnum};
use gerbang_client::{
    check_password_strength, format_bytes, GuardedClient, LogWindow, LoginOptions, MetricsPoller,
    MetricsSample, ProxyRoute,
};
use gerbang_core::{
    LoginInput, MutationMethod, MutationResult, RoleInput, ServiceConfig, ServiceInfo, UserInput,
};
use gerbang_provider::TransportConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gerbang", version, about = "Admin client for the Gerbang secure gateway")]
struct Cli {
    /// Gateway base URL.
    #[arg(
        long,
        env = "GERBANG_BASE_URL",
        default_value = "http://localhost:9000",
        global = true
    )]
    base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "GERBANG_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout: u64,

    /// Seed the session jar, e.g. `sg_session=...`. Repeatable.
    #[arg(long = "cookie", env = "GERBANG_COOKIE", global = true)]
    cookies: Vec<String>,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the current session.
    Session,

    /// Log in and show the resulting session.
    Login {
        #[arg(short, long)]
        identity: String,

        #[arg(short, long, env = "GERBANG_PASSWORD", hide_env_values = true)]
        password: String,

        /// Cookie domain passed to the gateway.
        #[arg(long)]
        domain: Option<String>,

        /// Front-end URL the gateway may redirect to.
        #[arg(long)]
        redirect: Option<String>,
    },

    /// End the current session.
    Logout {
        /// Page the gateway redirects a browser to afterwards.
        #[arg(long)]
        redirect: Option<String>,
    },

    /// E-mail a password-reset link.
    ResetPassword {
        #[arg(short, long)]
        email: String,

        /// Base URL the reset link points at; defaults to --base-url.
        #[arg(long)]
        reset_base: Option<String>,
    },

    /// Send a raw guarded mutation, e.g. `mutate delete users/42`.
    Mutate {
        #[arg(value_enum)]
        method: MethodArg,

        /// Path below the base URL, `/`-separated.
        path: String,

        /// JSON payload. Ignored for delete.
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Manage auth roles.
    #[command(subcommand)]
    Role(RoleCommand),

    /// Manage user accounts.
    #[command(subcommand)]
    User(UserCommand),

    /// Read gateway metrics.
    Metrics {
        /// Keep polling until interrupted.
        #[arg(short, long, default_value_t = false)]
        watch: bool,

        /// Seconds between polls.
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Stop after this many polls.
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Show circuit-breaker counters.
    Circuit,

    /// List proxied services and their health.
    Services,

    /// Restart the gateway.
    Restart,

    /// Replace the service configuration from a JSON file holding either
    /// `{"services": [...]}` or a bare array.
    ApplyConfig {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Proxy traffic grouped by route, or one route's entries with --detail.
    LogStats {
        /// Range start, RFC 3339.
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Range end, RFC 3339.
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// List individual entries for the route given by the filters.
        #[arg(
            long,
            default_value_t = false,
            requires_all = ["from", "service", "method", "path", "status"]
        )]
        detail: bool,

        #[arg(long)]
        service: Option<String>,

        #[arg(long)]
        method: Option<String>,

        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        status: Option<u16>,
    },

    /// Rate a password locally.
    PasswordStrength { password: String },
}

#[derive(Subcommand, Debug)]
enum RoleCommand {
    List,
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    Update {
        id: i64,
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    List,
    Create(UserArgs),
    Update {
        id: String,
        #[command(flatten)]
        user: UserArgs,
    },
    Delete {
        id: String,
    },
    /// Change a user's password.
    Password {
        id: String,
        #[arg(long, env = "GERBANG_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(clap::Args, Debug)]
struct UserArgs {
    #[arg(short, long)]
    username: String,
    #[arg(short, long)]
    full_name: String,
    #[arg(short, long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    identity_number: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// 10 active, 9 inactive.
    #[arg(long)]
    status: Option<i32>,
}

impl From<UserArgs> for UserInput {
    fn from(a: UserArgs) -> Self {
        Self {
            username: a.username,
            full_name: a.full_name,
            email: a.email,
            phone_number: a.phone,
            identity_number: a.identity_number,
            password: a.password,
            status_account: a.status,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    Create,
    Update,
    Delete,
}

impl From<MethodArg> for MutationMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Create => MutationMethod::Create,
            MethodArg::Update => MutationMethod::Update,
            MethodArg::Delete => MutationMethod::Delete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Commands::PasswordStrength { password } = &cli.command {
        let strength = check_password_strength(password);
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "strength": strength,
                    "level": strength.level(),
                    "percentage": strength.percentage(),
                })
            );
        } else {
            println!("{} ({}%)", strength.label(), strength.percentage());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = TransportConfig::default().with_timeout(Duration::from_secs(cli.timeout));
    for cookie in cli.cookies {
        config = config.with_cookie(cookie);
    }
    let client = GuardedClient::connect(&cli.base_url, &config)?;

    let code = match cli.command {
        Commands::Session => {
            let session = client.session().await?;
            emit(json, &session, || match &session.profile {
                Some(p) if session.authenticated => format!(
                    "logged in as {} ({}) roles: {}",
                    p.username,
                    p.full_name,
                    p.role_names().collect::<Vec<_>>().join(", ")
                ),
                None if session.authenticated => "logged in".to_string(),
                _ => "not logged in".to_string(),
            })?;
            ExitCode::SUCCESS
        }

        Commands::Login {
            identity,
            password,
            domain,
            redirect,
        } => {
            let options = LoginOptions {
                domain,
                redirect_url: redirect,
                ..LoginOptions::default()
            };
            let result = client
                .login(&LoginInput { identity, password }, &options)
                .await;
            if result.is_ok() {
                let session = client.session().await?;
                tracing::info!(authenticated = session.authenticated, "session after login");
            }
            report(json, result)?
        }

        Commands::Logout { redirect } => {
            client.logout(redirect.as_deref()).await?;
            emit(json, &serde_json::json!({ "status": true }), || {
                "logged out".to_string()
            })?;
            ExitCode::SUCCESS
        }

        Commands::ResetPassword { email, reset_base } => report(
            json,
            client
                .request_password_reset(&email, reset_base.as_deref())
                .await,
        )?,

        Commands::Mutate { method, path, data } => {
            let payload = data
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?;
            let url = client.base().resource(&path);
            report(
                json,
                client
                    .mutate_url(&url, method.into(), payload.as_ref())
                    .await,
            )?
        }

        Commands::Role(cmd) => match cmd {
            RoleCommand::List => {
                let list = client.list_roles().await?;
                emit(json, &list.roles, || {
                    let mut out = String::new();
                    for r in &list.roles {
                        out.push_str(&format!(
                            "{:>4}  {:<20} {}\n",
                            r.id_auth_role,
                            r.name_auth_role,
                            r.desc_auth_role.as_deref().unwrap_or("")
                        ));
                    }
                    out.push_str(&format!(
                        "{} role(s)",
                        list.total.unwrap_or(list.roles.len() as i64)
                    ));
                    out
                })?;
                ExitCode::SUCCESS
            }
            RoleCommand::Create { name, description } => {
                let input = RoleInput {
                    name_auth_role: name,
                    desc_auth_role: description,
                };
                report(json, client.create_role(&input).await)?
            }
            RoleCommand::Update {
                id,
                name,
                description,
            } => {
                let input = RoleInput {
                    name_auth_role: name,
                    desc_auth_role: description,
                };
                report(json, client.update_role(id, &input).await)?
            }
            RoleCommand::Delete { id } => report(json, client.delete_role(id).await)?,
        },

        Commands::User(cmd) => match cmd {
            UserCommand::List => {
                let users = client.list_users().await?;
                emit(json, &users, || {
                    let mut out = String::new();
                    for u in &users {
                        out.push_str(&format!(
                            "{:<36}  {:<16} {:<24} {}\n",
                            u.id_account,
                            u.username,
                            u.full_name,
                            if u.is_active() { "active" } else { "inactive" }
                        ));
                    }
                    out.push_str(&format!("{} user(s)", users.len()));
                    out
                })?;
                ExitCode::SUCCESS
            }
            UserCommand::Create(args) => report(json, client.create_user(&args.into()).await)?,
            UserCommand::Update { id, user } => {
                report(json, client.update_user(&id, &user.into()).await)?
            }
            UserCommand::Delete { id } => report(json, client.delete_user(&id).await)?,
            UserCommand::Password {
                id,
                password,
                confirm,
            } => report(
                json,
                client.change_password(&id, &password, &confirm).await,
            )?,
        },

        Commands::Metrics {
            watch,
            interval,
            samples,
        } => {
            if !watch && samples.is_none() {
                let sample = client.fetch_metrics().await?;
                emit(json, &sample, || render_sample(&sample))?;
                return Ok(ExitCode::SUCCESS);
            }

            let mut poller = MetricsPoller::new(&client, Duration::from_secs(interval));
            let mut taken = 0usize;
            loop {
                if samples.is_some_and(|n| taken >= n) {
                    break;
                }
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    polled = poller.next() => match polled {
                        Ok(sample) => emit(json, &sample, || render_sample(&sample))?,
                        Err(e) => tracing::warn!(error = %e, "metrics poll failed"),
                    },
                }
                taken += 1;
            }
            tracing::info!(
                polls = taken,
                points = poller.history().cpu.len(),
                "metrics watch done"
            );
            ExitCode::SUCCESS
        }

        Commands::Circuit => {
            let stats = client.circuit_stats().await?;
            emit(json, &stats, || {
                format!(
                    "state {} | total {} | failures {}/{} | successes {}/{} | rejected {} | at {}",
                    stats.state.as_deref().unwrap_or("-"),
                    stats.total_requests,
                    stats.failures,
                    stats.failure_threshold,
                    stats.successes,
                    stats.success_threshold,
                    stats.rejected_requests,
                    stats.last_state_change.as_deref().unwrap_or("-")
                )
            })?;
            ExitCode::SUCCESS
        }

        Commands::Services => {
            let services = client.services().await?;
            emit(json, &services, || {
                let mut out = String::new();
                for s in &services {
                    let health = match s.status {
                        Some(true) => "up",
                        Some(false) => "down",
                        None => "?",
                    };
                    out.push_str(&format!(
                        "{:<5} {:<20} {:<32} {}\n",
                        health,
                        s.path,
                        s.url,
                        protections(s)
                    ));
                }
                out.push_str(&format!("{} service(s)", services.len()));
                out
            })?;
            ExitCode::SUCCESS
        }

        Commands::Restart => report(json, client.restart().await)?,

        Commands::ApplyConfig { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let services = match serde_json::from_str::<ServiceConfig>(&raw) {
                Ok(config) => config.services,
                Err(_) => serde_json::from_str::<Vec<ServiceInfo>>(&raw)?,
            };
            report(json, client.update_services(&services).await)?
        }

        Commands::LogStats {
            from,
            to,
            detail,
            service,
            method,
            path,
            status,
        } => {
            let window = from.zip(to).map(|(from, to)| LogWindow { from, to });
            match (detail, window) {
                (true, Some(window)) => {
                    let route = ProxyRoute {
                        service: service.unwrap_or_default(),
                        method: method.unwrap_or_default(),
                        path: path.unwrap_or_default(),
                        status: status.unwrap_or_default(),
                    };
                    let entries = client.proxy_log_detail(&route, &window).await?;
                    emit(json, &entries, || {
                        let mut out = String::new();
                        for e in &entries {
                            out.push_str(&format!(
                                "{}  {:<6} {} {} {:.2} ms {}\n",
                                e.timestamp,
                                e.method,
                                e.path,
                                e.status,
                                e.duration,
                                e.user_auth.as_deref().unwrap_or("-")
                            ));
                        }
                        out.push_str(&format!("{} entries", entries.len()));
                        out
                    })?;
                }
                (_, window) => {
                    let stats = client.proxy_log_stats(window.as_ref()).await?;
                    emit(json, &stats, || {
                        let mut out = String::new();
                        for r in &stats {
                            out.push_str(&format!(
                                "{:>6}  {:<12} {:<6} {:<40} {} {:.2} ms\n",
                                r.request_count,
                                r.service,
                                r.method,
                                r.path,
                                r.status,
                                r.avg_duration
                            ));
                        }
                        out.push_str(&format!("{} route(s)", stats.len()));
                        out
                    })?;
                }
            }
            ExitCode::SUCCESS
        }

        Commands::PasswordStrength { .. } => ExitCode::SUCCESS,
    };

    Ok(code)
}

/// Prints a guarded mutation's outcome; failures go to stderr as
/// `error [kind]: message` and exit non-zero.
fn report(json: bool, result: MutationResult) -> Result<ExitCode, serde_json::Error> {
    match result {
        Ok(data) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else if data.is_null() {
                println!("ok");
            } else {
                println!("ok: {data}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            if json {
                let body = serde_json::json!({ "error": e.kind(), "message": e.message() });
                eprintln!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                eprintln!("error [{}]: {}", e.kind(), e.message());
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn emit<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn protections(s: &ServiceInfo) -> String {
    let flags = [
        (s.auth_protection, "auth"),
        (s.csrf_protection, "csrf"),
        (s.session_protection, "session"),
        (s.jwt_protection, "jwt"),
        (s.rbac_protection, "rbac"),
    ];
    let on: Vec<&str> = flags.iter().filter(|(f, _)| *f).map(|(_, n)| *n).collect();
    if on.is_empty() {
        "open".to_string()
    } else {
        on.join(",")
    }
}

fn render_sample(sample: &MetricsSample) -> String {
    let m = &sample.snapshot;
    format!(
        "cpu {:.1}% | ram {} | host {} / {} | load {:.2} | conns {} | {} ms",
        m.pid.cpu,
        format_bytes(m.pid.ram),
        format_bytes(m.os.ram),
        format_bytes(m.os.total_ram),
        m.os.load_avg,
        m.pid.conns,
        sample.response_ms
    )
}
