//! lldp-topo CLI - LLDP topology discovery and hardware inventory.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lldp_topo::{
    check_connectivity, list_interfaces, render, scan_topology, OutputFormat, RedfishClient,
    RedfishConfig, ScanOptions, SshConfig, SshExecutor, Tabular,
};

/// Exit code when the Redfish walk produced nothing.
const NO_INVENTORY_EXIT: u8 = 2;

/// lldp-topo CLI - LLDP topology and interface inventory of server fleets.
#[derive(Parser)]
#[command(name = "lldp-topo", version)]
#[command(about = "Discover LLDP topology and classify network interfaces over SSH")]
struct Cli {
    /// Output format.
    #[arg(
        short,
        long,
        value_enum,
        default_value_t = OutputFormat::Table,
        env = "LLDP_TOPO_OUTPUT",
        global = true
    )]
    output: OutputFormat,

    /// Increase verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only test SSH connectivity and lldpcli on the servers.
    #[arg(long, global = true)]
    test: bool,

    /// Alternative command used to reach servers, e.g. `juju ssh`.
    #[arg(short = 'c', long, env = "LLDP_TOPO_ALT_COMMAND", global = true)]
    alt_command: Option<String>,

    /// SSH connect timeout in seconds.
    #[arg(long, global = true)]
    connect_timeout: Option<u64>,

    /// Open a new SSH connection per command instead of sharing one.
    #[arg(long, global = true)]
    no_multiplex: bool,

    /// Accept host keys of servers not yet in `known_hosts`.
    #[arg(long, global = true)]
    accept_new_host_keys: bool,

    /// Number of servers processed concurrently.
    #[arg(
        short,
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..),
        global = true
    )]
    jobs: u16,

    /// Abort everything at the first server that fails.
    #[arg(long, global = true)]
    fail_fast: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get the LLDP topology of the servers.
    #[command(visible_aliases = ["gt", "get"])]
    GetTopology {
        /// Servers to connect to, as `user@server` or `server`.
        #[arg(value_name = "SERVER", required = true)]
        servers: Vec<String>,

        /// Only report interfaces with an LLDP neighbor.
        #[arg(short, long)]
        quick: bool,

        /// Show device details of physical interfaces.
        #[arg(short, long)]
        extra: bool,
    },

    /// List physical interfaces and their hardware details.
    #[command(visible_alias = "li")]
    ListInterfaces {
        /// Servers to connect to, as `user@server` or `server`.
        #[arg(value_name = "SERVER", required = true)]
        servers: Vec<String>,
    },

    /// Summarize hardware inventory from a BMC's Redfish API.
    #[command(visible_alias = "ri")]
    RedfishInventory {
        /// Base URL (e.g. <https://192.0.2.10>).
        base: String,

        /// Username.
        user: String,

        /// Password (or set `REDFISH_PASSWORD` env var).
        #[arg(env = "REDFISH_PASSWORD")]
        password: String,

        /// Do not verify the TLS certificate.
        #[arg(long)]
        insecure: bool,
    },
}

/// Result of the work done for one server.
struct Outcome<T> {
    server: String,
    result: Result<T>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ssh_config = SshConfig::default()
        .with_alt_command(cli.alt_command.clone())
        .with_connect_timeout(cli.connect_timeout)
        .with_multiplex(!cli.no_multiplex)
        .with_accept_new_host_keys(cli.accept_new_host_keys);
    let jobs = usize::from(cli.jobs);

    match cli.command {
        Commands::GetTopology {
            servers,
            quick,
            extra,
        } => {
            let executor = Arc::new(SshExecutor::new(ssh_config).context("Invalid SSH settings")?);
            if cli.test {
                return run_connectivity_test(executor, &servers, jobs).await;
            }

            let options = ScanOptions::default().with_quick(quick).with_extra(extra);
            info!(servers = servers.len(), quick, extra, "Scanning topology");
            let outcomes = fan_out(&servers, jobs, cli.fail_fast, |server| {
                let executor = Arc::clone(&executor);
                async move {
                    let rows = scan_topology(&*executor, &server, options).await?;
                    Ok::<_, anyhow::Error>(rows)
                }
            })
            .await?;
            report(outcomes, cli.output, cli.fail_fast)
        }

        Commands::ListInterfaces { servers } => {
            let executor = Arc::new(SshExecutor::new(ssh_config).context("Invalid SSH settings")?);
            if cli.test {
                return run_connectivity_test(executor, &servers, jobs).await;
            }

            info!(servers = servers.len(), "Listing interfaces");
            let outcomes = fan_out(&servers, jobs, cli.fail_fast, |server| {
                let executor = Arc::clone(&executor);
                async move {
                    let rows = list_interfaces(&*executor, &server).await?;
                    Ok::<_, anyhow::Error>(rows)
                }
            })
            .await?;
            report(outcomes, cli.output, cli.fail_fast)
        }

        Commands::RedfishInventory {
            base,
            user,
            password,
            insecure,
        } => {
            if cli.test {
                bail!("--test applies to get-topology and list-interfaces only");
            }

            let config = RedfishConfig::new(base, user, password).with_insecure(insecure);
            let client = RedfishClient::new(&config).context("Failed to create Redfish client")?;
            match client.inventory().await {
                Ok(systems) if !systems.is_empty() => {
                    print!("{}", render(&systems, cli.output)?);
                    Ok(ExitCode::SUCCESS)
                }
                Ok(_) => {
                    println!("No inventory obtained.");
                    Ok(ExitCode::from(NO_INVENTORY_EXIT))
                }
                Err(e) => {
                    error!(error = %e, "Redfish inventory failed");
                    println!("No inventory obtained.");
                    Ok(ExitCode::from(NO_INVENTORY_EXIT))
                }
            }
        }
    }
}

/// Log to stderr so stdout only carries the report.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let layer = fmt::layer().with_writer(std::io::stderr);

    if verbose > 1 {
        tracing_subscriber::registry()
            .with(layer.with_file(true).with_line_number(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(layer.with_target(false))
            .with(filter)
            .init();
    }
}

/// Run `task` for every server, at most `jobs` at a time. Outcomes come back
/// in input order. With `fail_fast`, outstanding work is aborted at the first
/// failure and only completed outcomes are returned.
async fn fan_out<T, F, Fut>(
    servers: &[String],
    jobs: usize,
    fail_fast: bool,
    task: F,
) -> Result<Vec<Outcome<T>>>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut set = JoinSet::new();

    for (index, server) in servers.iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let work = task(server.clone());
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, work.await)
        });
    }

    let mut results: Vec<Option<Result<T>>> = servers.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (index, result) = match joined {
            Ok(done) => done,
            Err(e) if e.is_cancelled() => continue,
            Err(e) => bail!("Server task panicked: {e}"),
        };
        let failed = result.is_err();
        results[index] = Some(result);
        if failed && fail_fast {
            set.abort_all();
        }
    }

    Ok(servers
        .iter()
        .zip(results)
        .filter_map(|(server, result)| {
            result.map(|result| Outcome {
                server: server.clone(),
                result,
            })
        })
        .collect())
}

/// Print the rows of every successful server. Failures are logged and make
/// the exit code non-zero; with `fail_fast` nothing is printed after one.
fn report<T: Tabular>(
    outcomes: Vec<Outcome<Vec<T>>>,
    format: OutputFormat,
    fail_fast: bool,
) -> Result<ExitCode> {
    let mut rows = Vec::new();
    let mut failures = 0usize;

    for outcome in outcomes {
        match outcome.result {
            Ok(server_rows) => rows.extend(server_rows),
            Err(e) => {
                failures += 1;
                error!(server = %outcome.server, error = %format!("{e:#}"), "Server failed");
            }
        }
    }

    if failures > 0 && fail_fast {
        return Ok(ExitCode::FAILURE);
    }

    print!("{}", render(&rows, format)?);
    Ok(if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_connectivity_test(
    executor: Arc<SshExecutor>,
    servers: &[String],
    jobs: usize,
) -> Result<ExitCode> {
    let outcomes = fan_out(servers, jobs, false, |server| {
        let executor = Arc::clone(&executor);
        async move { Ok::<_, anyhow::Error>(check_connectivity(&*executor, &server).await) }
    })
    .await?;

    let mut passed = true;
    for outcome in outcomes {
        let report = outcome.result?;
        println!("{report}");
        passed &= report.passed();
    }

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
