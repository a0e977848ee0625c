//! Binary entrypoint for the klev CLI.

#[tokio::main]
async fn main() {
    std::process::exit(klev_cli::run().await);
}
