// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atende - WhatsApp support desk backend.
//!
//! This is the binary entry point for the Atende server.

mod serve;
mod shutdown;

use clap::{Parser, Subcommand};

/// Atende - routes customer WhatsApp conversations to agent departments.
#[derive(Parser, Debug)]
#[command(name = "atende", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Atende server.
    Serve,
    /// Print the effective configuration (secrets redacted).
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match atende_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            atende_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("atende serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            print_config(config);
        }
        None => {
            println!("atende: use --help for available commands");
        }
    }
}

/// Print the effective configuration with secrets stripped.
fn print_config(mut config: atende_config::AtendeConfig) {
    let token_count = config.auth.tokens.len();
    config.auth.tokens.clear();
    config.auth.bridge_token = None;

    match toml::to_string_pretty(&config) {
        Ok(rendered) => {
            print!("{rendered}");
            println!("# auth: {token_count} operator token(s) configured (redacted)");
        }
        Err(e) => eprintln!("failed to render config: {e}"),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed).
        let config = atende_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.service.name, "atende");
    }
}
