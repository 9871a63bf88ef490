use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "breaker-cli")]
#[command(about = "Operator CLI for circuit-guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "CIRCUIT_GUARD_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Service version and breaker count
    Info,
    /// State and counters of every breaker
    Status,
    /// State and counters of one breaker
    Health { name: String },
    /// Force a breaker CLOSED with zero counters
    Reset { name: String },
    /// Force a breaker OPEN
    ForceOpen { name: String },
}

impl Commands {
    fn request(&self) -> (Method, String) {
        match self {
            Commands::Info => (Method::GET, "/admin/status".to_string()),
            Commands::Status => (Method::GET, "/circuit-breakers/status".to_string()),
            Commands::Health { name } => (Method::GET, format!("/circuit-breakers/{}/health", name)),
            Commands::Reset { name } => (Method::POST, format!("/circuit-breakers/{}/reset", name)),
            Commands::ForceOpen { name } => {
                (Method::POST, format!("/circuit-breakers/{}/force-open", name))
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path) = cli.command.request();
    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
