use clap::Parser;
use pomoplan_lib::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = pomoplan_lib::run(cli).await {
        eprintln!("pomoplan: {err:#}");
        std::process::exit(1);
    }
}
