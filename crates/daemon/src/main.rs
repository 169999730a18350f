// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Combine, Daemon, Health, Init, Split, Status, Unseal, Version};

command_enum! {
    (Combine, Combine),
    (Daemon, Daemon),
    (Health, Health),
    (Init, Init),
    (Split, Split),
    (Status, Status),
    (Unseal, Unseal),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let ctx = match cli::op::resolve_remote(args.remote, args.config_path.clone())
        .map_err(|e| e.to_string())
        .and_then(|remote| {
            cli::op::OpContext::new(remote, args.config_path).map_err(|e| e.to_string())
        }) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
