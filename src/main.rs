//! Stakedeck - wallet-connected terminal client for an NFT staking dashboard
//!
//! Establishes a wallet session on the configured network, verifies operator
//! approval, lists stakable and staked tokens, and submits staking, unstaking
//! and claim transactions, tracking each to confirmation.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

mod actions;
mod config;
mod contract;
mod error;
mod status;
mod store;
mod tokens;
mod tx;
mod wallet;

use actions::Actions;
use config::Settings;
use ethers::types::U256;
use status::{Control, StatusChannel, StatusEvent};
use store::PreferenceStore;
use tokens::{MetadataClient, Placement, TokenLedger};
use tx::TransactionSubmitter;
use wallet::{ConnectOptions, HttpWalletProvider, Session, SessionManager, WalletProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting stakedeck v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Target network: {} (chain {})",
        settings.network.name, settings.network.chain_id
    );

    // Status channel; the renderer is the only subscriber in this front-end
    let status = StatusChannel::new(settings.client.status_buffer);
    let renderer = spawn_renderer(&status);

    let store = Arc::new(PreferenceStore::open(&settings.storage.preferences_path));

    let provider: Option<Arc<dyn WalletProvider>> = match &settings.wallet.bridge_url {
        Some(url) => Some(Arc::new(HttpWalletProvider::new(url)?)),
        None => None,
    };

    let sessions = Arc::new(SessionManager::new(
        provider,
        settings.clone(),
        store,
        status.clone(),
    ));
    let submitter = Arc::new(TransactionSubmitter::new(sessions.clone(), status.clone()));
    let ledger = Arc::new(TokenLedger::new());
    let metadata = MetadataClient::new(&settings.metadata.ipfs_gateway)?;
    let actions = Actions::new(submitter, ledger.clone(), status.clone());

    // Connect comes first; everything else needs the session it produces
    let session = match sessions.connect(ConnectOptions::prompting()).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            info!("Connection suppressed after a previous decline");
            renderer.abort();
            return Ok(());
        }
        Err(e) if e.is_user_actionable() => {
            warn!("Connection needs user action at the wallet: {}", e);
            renderer.abort();
            return Ok(());
        }
        Err(e) => {
            error!("Wallet connection failed: {}", e);
            renderer.abort();
            return Err(e.into());
        }
    };
    info!("Connected as {:?} on chain {}", session.address, session.chain_id);

    // Approval gate before any staking action
    if !actions.ensure_approved(&session).await? {
        warn!("Collection approval not granted; staking actions unavailable");
        renderer.abort();
        return Ok(());
    }

    refresh_and_render(&session, &ledger, &settings).await?;

    let rewards = actions::rewards::fetch_summary(&session).await?;
    println!("Total token rewards = {}", rewards.total_earned_display);
    if !rewards.can_claim {
        actions.controls().set_enabled(Control::Claim, false);
    }

    run_command_loop(&session, &actions, &ledger, &metadata, &settings).await?;

    info!("Stakedeck stopped");
    renderer.abort();
    Ok(())
}

/// Interactive command loop until EOF, quit, or ctrl-c
async fn run_command_loop(
    session: &Session,
    actions: &Actions,
    ledger: &Arc<TokenLedger>,
    metadata: &MetadataClient,
    settings: &Settings,
) -> Result<()> {
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let mut parts = line.split_whitespace();
                match parts.next() {
                    Some("toggle") => match parse_token_id(parts.next()) {
                        Some(id) => {
                            if !ledger.toggle(id).await {
                                println!("Unknown token id {}", id);
                            }
                        }
                        None => println!("Usage: toggle <token-id>"),
                    },
                    Some("stake") => {
                        actions.stake_selected(session).await;
                    }
                    Some("unstake") => {
                        actions.unstake_selected(session).await;
                    }
                    Some("claim") => {
                        if actions.controls().is_enabled(Control::Claim) {
                            actions.claim_selected(session).await;
                        } else {
                            println!("Claim is currently unavailable");
                        }
                    }
                    Some("refresh") => {
                        if let Err(e) = refresh_and_render(session, ledger, settings).await {
                            error!("Refresh failed: {}", e);
                        }
                    }
                    Some("tiles") => render_tiles(ledger, settings).await,
                    Some("rewards") => match actions::rewards::fetch_summary(session).await {
                        Ok(summary) => {
                            tracing::debug!("Raw total earned: {}", summary.total_earned);
                            println!("Total token rewards = {}", summary.total_earned_display);
                            actions.controls().set_enabled(Control::Claim, summary.can_claim);
                        }
                        Err(e) => error!("Reward query failed: {}", e),
                    },
                    Some("earned") => match parse_token_id(parts.next()) {
                        Some(id) => match actions::rewards::earned_for_token(session, id).await {
                            Ok(amount) => println!(
                                "Token {} earned = {}",
                                id,
                                actions::rewards::format_reward(amount)
                            ),
                            Err(e) => error!("Earned query failed: {}", e),
                        },
                        None => println!("Usage: earned <token-id>"),
                    },
                    Some("image") => match parse_token_id(parts.next()) {
                        Some(id) => show_image(ledger, metadata, id).await,
                        None => println!("Usage: image <token-id>"),
                    },
                    Some("quit") | Some("exit") => break,
                    Some(other) => println!("Unknown command: {}", other),
                    None => {}
                }
            }
        }
    }

    Ok(())
}

async fn refresh_and_render(
    session: &Session,
    ledger: &Arc<TokenLedger>,
    settings: &Settings,
) -> Result<()> {
    let listings = tokens::refresh_listings(session).await?;
    ledger.load(&listings).await;

    let (stakable, staked) = ledger.counts().await;
    info!("Loaded {} stakable and {} staked tiles", stakable, staked);

    render_tiles(ledger, settings).await;
    Ok(())
}

/// Print both tile containers with gateway-resolved metadata URIs
async fn render_tiles(ledger: &Arc<TokenLedger>, settings: &Settings) {
    let tiles = ledger.snapshot().await;

    for placement in [Placement::Stakable, Placement::Staked] {
        println!("-- {} --", placement.label());
        for tile in tiles.iter().filter(|t| t.token.placement == placement) {
            let marker = if tile.intent != tile.token.placement { "*" } else { " " };
            println!(
                " {} #{} {}",
                marker,
                tile.token.token_id,
                tokens::metadata::resolve_uri(
                    &tile.token.metadata_uri,
                    &settings.metadata.ipfs_gateway
                )
            );
        }
    }
}

/// Lazily fetch one tile's display image URL
async fn show_image(ledger: &Arc<TokenLedger>, metadata: &MetadataClient, token_id: U256) {
    let tiles = ledger.snapshot().await;
    let Some(tile) = tiles.iter().find(|t| t.token.token_id == token_id) else {
        println!("Unknown token id {}", token_id);
        return;
    };

    match metadata.fetch_image_url(&tile.token.metadata_uri).await {
        Ok(url) => println!("Token {} image: {}", token_id, url),
        Err(e) => error!("Image lookup failed: {}", e),
    }
}

fn parse_token_id(raw: Option<&str>) -> Option<U256> {
    raw.and_then(|s| U256::from_dec_str(s).ok())
}

fn print_help() {
    println!("Commands: toggle <id> | stake | unstake | claim | refresh | tiles | rewards | earned <id> | image <id> | quit");
}

/// Renderer task: prints status events as the modal/alert/control surface
fn spawn_renderer(status: &StatusChannel) -> JoinHandle<()> {
    let mut rx = status.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => render_event(event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Renderer lagged, skipped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn render_event(event: StatusEvent) {
    match event {
        StatusEvent::ModalOpened => println!("[modal] Building transaction..."),
        StatusEvent::TransactionSubmitted { hash, explorer_url } => {
            println!("[modal] Transaction submitted. Please wait for confirmation.");
            println!("[modal] Transaction hash: {:?}", hash);
            println!("[modal] View on explorer: {}", explorer_url);
        }
        StatusEvent::TransactionConfirmed { hash } => {
            println!("[modal] Transaction confirmed: {:?}", hash);
        }
        StatusEvent::TransactionFailed { message } => println!("[modal] {}", message),
        StatusEvent::ModalClosed => println!("[modal] Closed."),
        StatusEvent::Alert { message } => println!("[alert] {}", message),
        StatusEvent::ControlChanged { control, enabled } => {
            println!(
                "[controls] {} {}",
                control.label(),
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stakedeck=debug,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
