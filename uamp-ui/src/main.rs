//! uamp-ui - Dispute submission front end
//!
//! Submits disputes to the resolution gateway and follows their processing
//! timeline until the gateway reports a terminal phase.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uamp_common::api::{default_enc_meta, Jurisdiction, Phase};
use uamp_common::config::{read_toml_config, GatewayUrlResolver, ResolvedGatewayUrl};

use uamp_ui::controller::{ControllerPhase, ControllerState, DisputeForm, DEFAULT_TENANT};
use uamp_ui::view::{render_reachability, render_state};
use uamp_ui::{
    ConnectionProbe, ControllerError, DisputeGateway, GatewayClient, Reachability,
    SubmissionController,
};

/// Command-line arguments for uamp-ui
#[derive(Parser, Debug)]
#[command(name = "uamp-ui")]
#[command(about = "Submit disputes to a resolution gateway and follow their receipts")]
#[command(version)]
struct Args {
    /// Gateway base URL for this run only (not saved)
    #[arg(long, global = true)]
    gateway_url: Option<String>,

    /// Config file (default: platform config dir, uamp/config.toml)
    #[arg(long, global = true, env = "UAMP_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate and submit a dispute, then follow its status
    Submit(SubmitArgs),

    /// Show the status of an existing dispute
    Status {
        dispute_id: String,

        /// Keep polling until a terminal phase
        #[arg(short, long)]
        watch: bool,
    },

    /// Check whether the gateway is reachable
    Probe {
        /// Keep checking every 30 seconds
        #[arg(short, long)]
        watch: bool,
    },

    /// Show or change the saved gateway URL
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(ClapArgs, Debug)]
struct SubmitArgs {
    /// Comma-separated party names (at least two)
    #[arg(short, long)]
    parties: String,

    /// Jurisdiction code, e.g. NSW-AU
    #[arg(short, long, default_value = "NSW-AU")]
    jurisdiction: Jurisdiction,

    /// Evidence content identifier (IPFS CID)
    #[arg(short, long)]
    cid: String,

    /// Tenant id placed in the encryption metadata
    #[arg(long, default_value = DEFAULT_TENANT)]
    tenant: String,

    /// Print the accepted dispute id and exit without polling
    #[arg(long)]
    no_watch: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the gateway URL in effect and where it comes from
    Show,
    /// Save a gateway URL override (applies from the next run)
    Set { url: String },
    /// Remove the saved override (applies from the next run)
    Reset,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let resolver = match &args.config {
        Some(path) => GatewayUrlResolver::with_config_path(path),
        None => GatewayUrlResolver::new().context("Failed to locate config directory")?,
    };

    init_tracing(&resolver, args.verbose);

    let gateway = resolver
        .resolve(args.gateway_url.as_deref())
        .context("Failed to resolve gateway URL")?;
    info!(url = %gateway.url, source = %gateway.source, "Gateway URL resolved");

    let color = !args.no_color && std::io::stdout().is_terminal();

    match args.command {
        Command::Submit(submit) => run_submit(&gateway, submit, color).await,
        Command::Status { dispute_id, watch } => run_status(&gateway, dispute_id, watch, color).await,
        Command::Probe { watch } => run_probe(&gateway, watch).await,
        Command::Config(cmd) => run_config(&resolver, &gateway, cmd),
    }
}

/// `RUST_LOG` wins; otherwise the config file level, or debug with --verbose
fn init_tracing(resolver: &GatewayUrlResolver, verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        read_toml_config(resolver.config_path())
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("uamp_ui={level},uamp_common={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_submit(gateway: &ResolvedGatewayUrl, args: SubmitArgs, color: bool) -> Result<ExitCode> {
    let client = GatewayClient::new(&gateway.url).context("Failed to create gateway client")?;
    let controller = SubmissionController::new(Arc::new(client));

    let form = DisputeForm::new(args.parties, args.jurisdiction, args.cid)
        .with_enc_meta(default_enc_meta(&args.tenant));

    match controller.submit(&form).await {
        Ok(response) => {
            println!("Dispute submitted: {}", response.dispute_id);
            println!("Anchor: {}", response.anchor_uri);
        }
        Err(e) => {
            print!("{}", render_state(&controller.state(), color));
            let code = match e {
                ControllerError::Validation(_) => 2,
                ControllerError::Gateway(_) => 1,
            };
            return Ok(ExitCode::from(code));
        }
    }

    if args.no_watch {
        controller.cancel();
        return Ok(ExitCode::SUCCESS);
    }

    let final_state = follow(&controller, gateway, color).await?;
    Ok(exit_code_for(&final_state))
}

async fn run_status(
    gateway: &ResolvedGatewayUrl,
    dispute_id: String,
    watch: bool,
    color: bool,
) -> Result<ExitCode> {
    let client = GatewayClient::new(&gateway.url).context("Failed to create gateway client")?;

    if !watch {
        let status = client
            .get_status(&dispute_id)
            .await
            .with_context(|| format!("Failed to fetch status of {}", dispute_id))?;
        let code = exit_code_for_phase(status.phase);
        let state = ControllerState {
            phase: ControllerPhase::Idle,
            dispute_id: Some(dispute_id),
            status: Some(status),
            ..ControllerState::default()
        };
        print!("{}", render_state(&state, color));
        return Ok(code);
    }

    let controller = SubmissionController::new(Arc::new(client));
    controller.track(dispute_id, None);
    let final_state = follow(&controller, gateway, color).await?;
    Ok(exit_code_for(&final_state))
}

/// Re-render on every visible change until polling stops or Ctrl+C
async fn follow<G: DisputeGateway + 'static>(
    controller: &SubmissionController<G>,
    gateway: &ResolvedGatewayUrl,
    color: bool,
) -> Result<ControllerState> {
    let probe = Arc::new(ConnectionProbe::new(&gateway.url).context("Failed to create probe")?);
    let probe_cancel = CancellationToken::new();
    let probe_task = Arc::clone(&probe).spawn(probe_cancel.clone());
    let mut reachability = probe.subscribe();

    let mut states = controller.subscribe();
    let mut last_render = String::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let final_state = loop {
        let state = states.borrow_and_update().clone();
        let rendered = render_state(&state, color);
        if rendered != last_render {
            println!("{}", rendered);
            last_render = rendered;
        }
        if state.phase != ControllerPhase::Polling {
            break state;
        }

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break controller.state();
                }
            }
            changed = reachability.changed() => {
                if changed.is_ok() {
                    let current = *reachability.borrow_and_update();
                    if current == Reachability::Unreachable {
                        println!("{}", render_reachability(current, &gateway.url));
                    }
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping status polling");
                controller.cancel();
                break controller.state();
            }
        }
    };

    probe_cancel.cancel();
    if let Err(e) = probe_task.await {
        debug!(error = %e, "Probe task ended abnormally");
    }

    Ok(final_state)
}

fn exit_code_for(state: &ControllerState) -> ExitCode {
    match state.phase {
        ControllerPhase::Complete => ExitCode::SUCCESS,
        ControllerPhase::Errored | ControllerPhase::ConnectionLost => ExitCode::FAILURE,
        _ => ExitCode::from(130),
    }
}

/// One-shot status: only a gateway-reported `ERROR` is a failure
fn exit_code_for_phase(phase: Phase) -> ExitCode {
    match phase {
        Phase::Error => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

async fn run_probe(gateway: &ResolvedGatewayUrl, watch: bool) -> Result<ExitCode> {
    let probe = Arc::new(ConnectionProbe::new(&gateway.url).context("Failed to create probe")?);
    println!("{}", render_reachability(Reachability::Unknown, &gateway.url));

    if !watch {
        let result = probe.check_now().await;
        println!("{}", render_reachability(result, &gateway.url));
        return Ok(if result == Reachability::Reachable {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let cancel = CancellationToken::new();
    let task = Arc::clone(&probe).spawn(cancel.clone());
    let mut updates = probe.subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *updates.borrow_and_update();
                println!("{}", render_reachability(current, &gateway.url));
            }
            _ = &mut ctrl_c => break,
        }
    }

    cancel.cancel();
    if let Err(e) = task.await {
        debug!(error = %e, "Probe task ended abnormally");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_config(
    resolver: &GatewayUrlResolver,
    gateway: &ResolvedGatewayUrl,
    cmd: ConfigCommand,
) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => {
            println!("Gateway URL: {} ({})", gateway.url, gateway.source);
            println!("Config file: {}", resolver.config_path().display());
        }
        ConfigCommand::Set { url } => {
            let saved = resolver
                .persist_override(&url)
                .context("Failed to save gateway URL")?;
            println!("Saved gateway URL {}; it applies from the next run.", saved);
        }
        ConfigCommand::Reset => {
            if resolver.clear_override().context("Failed to reset gateway URL")? {
                let default = resolver.default_url();
                println!(
                    "Removed saved gateway URL; the next run uses {} ({}).",
                    default.url, default.source
                );
            } else {
                println!("No saved gateway URL to remove.");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
