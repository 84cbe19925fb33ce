use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Client CLI for the gatekeeper auth service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new account and print the issued token
    Register { email: String, password: String },
    /// Log in and print the issued token
    Login { email: String, password: String },
    /// Show the account a token belongs to
    Me {
        #[arg(short, long)]
        token: String,
    },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Register { email, password } => {
            let res = client
                .post(format!("{}/auth/register", cli.url))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Login { email, password } => {
            let res = client
                .post(format!("{}/auth/login", cli.url))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Me { token } => {
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
            let res = client
                .get(format!("{}/auth/me", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/healthz", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gatekeeper returned status {}", status);
        if let Some(retry_after) = res.headers().get("retry-after") {
            eprintln!("Retry after: {}s", retry_after.to_str().unwrap_or("?"));
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
