mod cli;
mod commands;
mod constants;
mod error;
mod models;
mod provider;
mod server;
mod services;
mod utils;

#[tokio::main]
async fn main() {
    cli::run().await;
}
