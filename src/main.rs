// src/main.rs - Board process: scan loop plus HTTP query server
use clap::Parser;
use photogrid::communication::{LogTransport, SerialTransport, UdpTransport};
use photogrid::config;
use photogrid::hardware::StdDelay;
use photogrid::reporter::ReportRoute;
use photogrid::reporter::wire::WireFormat;
use photogrid::simulator::SimulatedMatrix;
use photogrid::web;
use photogrid::{Board, BoardRequest};
use tokio::sync::{broadcast, mpsc};
use tokio::task::LocalSet;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Parser, Debug)]
#[command(name = "photogrid", version, about = "Phototransistor grid scanner")]
struct Cli {
    /// Board configuration file
    #[arg(short, long, default_value = "board.toml")]
    config: String,

    /// Maximum log level
    #[arg(long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,
}

async fn build_routes(config: &config::Config) -> Result<Vec<ReportRoute>, BoxError> {
    let mut routes = Vec::new();
    if config.serial.enabled {
        let serial = SerialTransport::open(&config.serial.port, config.serial.baud)?;
        routes.push(ReportRoute::new(config.serial.format, serial));
    }
    if let Some(target) = config.network.push_target {
        let udp = UdpTransport::connect(target).await?;
        routes.push(ReportRoute::new(config.network.push_format, udp));
    }
    if routes.is_empty() {
        tracing::info!("No serial or network push configured, reporting to the log");
        routes.push(ReportRoute::new(WireFormat::Lines, LogTransport));
    }
    Ok(routes)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt().with_max_level(cli.log_level).init();

    tracing::info!("Starting photogrid {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loading configuration from: {}", cli.config);

    let config = config::load_config(&cli.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", cli.config, e);
        Box::new(e) as BoxError
    })?;
    let grid = config.validate().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        Box::new(e) as BoxError
    })?;

    tracing::info!(
        "Board: {} ({} / {})",
        config.board.name,
        config.network.mac,
        config.network.ip
    );
    tracing::info!(
        "Grid: {} rows x {} columns, on >= {}, off < {}, settle {} us",
        grid.rows(),
        grid.columns(),
        grid.thresholds().on(),
        grid.thresholds().off(),
        grid.settle_delay_us()
    );

    let routes = build_routes(&config).await?;
    let matrix = SimulatedMatrix::from_config(&grid, &config.simulator);
    let board = Board::from_config(&config, &grid, matrix, StdDelay, routes);

    // Set up a channel for communication between Axum handlers and the board task.
    let (board_tx, board_rx) = mpsc::channel::<BoardRequest>(16);
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let app = web::api::create_router(board_tx);
    let listener = tokio::net::TcpListener::bind(config.network.http_addr()).await?;
    tracing::info!("Web API listening on http://{}", listener.local_addr()?);

    let local = LocalSet::new();
    let board_task = local.spawn_local(board.run(board_rx, shutdown_tx.subscribe()));

    let server_shutdown = shutdown_tx.clone();
    let server = local.spawn_local(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for ctrl-c: {}", e);
                }
                tracing::info!("Shutdown requested");
                let _ = server_shutdown.send(());
            })
            .await;
        if let Err(e) = result {
            tracing::error!("Web server error: {}", e);
        }
    });

    local
        .run_until(async move {
            if let Err(e) = server.await {
                tracing::error!("Web server task failed: {}", e);
            }
            let _ = shutdown_tx.send(());
            if let Err(e) = board_task.await {
                tracing::error!("Board task failed: {}", e);
            }
        })
        .await;

    Ok(())
}
