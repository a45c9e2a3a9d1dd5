//! kvlog CLI Client
//!
//! Command-line interface for interacting with kvlog.

use clap::{Parser, Subcommand};
use kvlog::network::Client;
use kvlog::KvError;

/// kvlog CLI
#[derive(Parser, Debug)]
#[command(name = "kvlog-cli")]
#[command(about = "CLI for the kvlog key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let result = match args.command {
        Commands::Get { key } => client.get(&key).map(Some),
        Commands::Put { key, value } => client.put(&key, &value).map(|_| None),
        Commands::Del { key } => client.delete(&key).map(|_| None),
        Commands::Ping => client.ping().map(Some),
    };

    match result {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => println!("OK"),
        Err(KvError::NotFound) => {
            eprintln!("(not found)");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}
