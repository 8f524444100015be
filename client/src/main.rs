use clap::Parser;
use client::network::{Client, Exit};
use client::BoxError;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5000")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let mut client = Client::connect(&args.server).await?;

    match client.run().await? {
        Exit::UserQuit => info!("Goodbye"),
        Exit::GameOver => println!("Game over."),
        Exit::Disconnected => info!("Disconnected from server"),
    }

    Ok(())
}
