use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::fs;

const TOKEN_FILE: &str = ".newsdesk_token";

#[derive(Parser)]
#[command(name = "newsdesk-cli")]
#[command(about = "CLI for the newsdesk API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Signup {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Comma-separated interests, most important first
        #[arg(short, long, default_value = "")]
        interests: String,
    },
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Profile,
    News,
    Save {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        url: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Comma-separated tags
        #[arg(short = 'g', long)]
        tags: String,
    },
    Saved,
    Delete {
        #[arg(short, long)]
        id: String,
    },
    Mark {
        #[arg(short, long)]
        id: String,
        #[arg(long)]
        read: Option<bool>,
        #[arg(long)]
        liked: Option<bool>,
    },
    Summarize {
        #[arg(short, long)]
        id: String,
    },
    Logout,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

fn authorized(builder: RequestBuilder) -> RequestBuilder {
    let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
    builder.bearer_auth(token.trim())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    let res = match cli.command {
        Commands::Signup { name, email, password, interests } => {
            let interests: Vec<&str> = interests
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            client
                .post(format!("{}/auth/signup", cli.url))
                .json(&json!({ "name": name, "email": email, "password": password, "interests": interests }))
                .send()
                .await?
        }
        Commands::Login { email, password } => {
            let res = client
                .post(format!("{}/auth/login", cli.url))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, body.token)?;
                println!("Logged in. Token saved to {TOKEN_FILE}");
            } else {
                println!("Login failed: {}", res.text().await?);
            }
            return Ok(());
        }
        Commands::Profile => {
            authorized(client.get(format!("{}/auth/profile", cli.url)))
                .send()
                .await?
        }
        Commands::News => authorized(client.get(format!("{}/news", cli.url))).send().await?,
        Commands::Save { title, url, description, tags } => {
            authorized(client.post(format!("{}/articles/save", cli.url)))
                .json(&json!({
                    "title": title,
                    "url": url,
                    "description": description,
                    "tags": tags,
                }))
                .send()
                .await?
        }
        Commands::Saved => {
            authorized(client.get(format!("{}/articles/saved", cli.url)))
                .send()
                .await?
        }
        Commands::Delete { id } => {
            authorized(client.delete(format!("{}/articles/{}", cli.url, id)))
                .send()
                .await?
        }
        Commands::Mark { id, read, liked } => {
            authorized(client.patch(format!("{}/articles/{}", cli.url, id)))
                .json(&json!({ "isRead": read, "isLiked": liked }))
                .send()
                .await?
        }
        Commands::Summarize { id } => {
            authorized(client.post(format!("{}/articles/summarize/{}", cli.url, id)))
                .send()
                .await?
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
            return Ok(());
        }
    };

    println!("{} {}", res.status(), res.text().await?);
    Ok(())
}
