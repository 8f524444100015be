use clap::Parser;
use log::{error, info, warn};
use server::network::SharedWorld;
use server::render;
use server::{BoxError, CliArgs, Server, World};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Operator commands typed into the server's terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleCommand {
    Robots,
    Dump,
    Quit,
}

impl ConsoleCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "robots" => Some(ConsoleCommand::Robots),
            "dump" => Some(ConsoleCommand::Dump),
            "quit" | "shutdown" | "off" => Some(ConsoleCommand::Quit),
            _ => None,
        }
    }
}

/// Main-method of the server.
/// Resolves the configuration, builds the world, then runs the network
/// server next to the operator console until either asks to stop.
#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let config = args.resolve()?;
    info!(
        "World {}x{}, visibility {}, repair {}s, reload {}s, obstacles: {}",
        config.world.width,
        config.world.height,
        config.world.visibility,
        config.world.repair_duration,
        config.world.reload_duration,
        config.world.obstacles
    );

    let world = World::generate(config.world.clone(), &mut rand::thread_rng());
    let server = Arc::new(Server::bind(&config, world).await?);

    let server_handle = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.run().await })
    };
    let console_handle = tokio::spawn(run_console(server.world()));

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped: {}", e),
                Err(e) => error!("Network task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = console_handle => {
            info!("Shutdown requested from console");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    server.shutdown().await;
    // Give writer tasks a moment to flush the quit notices.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

/// Reads operator commands from stdin until `quit`.
async fn run_console(world: SharedWorld) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                // No terminal attached; keep serving until Ctrl+C.
                std::future::pending::<()>().await;
                return;
            }
            Err(e) => {
                warn!("Console input failed: {}", e);
                std::future::pending::<()>().await;
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match ConsoleCommand::parse(&line) {
            Some(ConsoleCommand::Robots) => {
                let snapshot = world.read().await.snapshot();
                print!("{}", render::describe_robots(&snapshot));
            }
            Some(ConsoleCommand::Dump) => {
                let snapshot = world.read().await.snapshot();
                print!("{}", render::dump(&snapshot));
            }
            Some(ConsoleCommand::Quit) => return,
            None => println!("Unknown command '{}'. Try: robots, dump, quit", line.trim()),
        }
    }
}
