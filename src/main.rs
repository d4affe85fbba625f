use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = broadcaster::cli::Cli::parse();
    if let Err(e) = broadcaster::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
