//! Seed script for newsdesk
//!
//! Creates a demo account and a couple of saved articles so the API has
//! something to show right away.
//! Run: cargo run --bin newsdesk-seed
//! Then log in as demo@newsdesk.local / demo-password.

use newsdesk::accounts::{AuthService, Signup};
use newsdesk::articles::{ArticleService, SaveArticle, TagsInput};
use newsdesk::auth::TokenManager;
use newsdesk::config::Config;
use newsdesk::error::ApiError;
use newsdesk::storage::Storage;

const DEMO_EMAIL: &str = "demo@newsdesk.local";
const DEMO_PASSWORD: &str = "demo-password";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let _log_guard = newsdesk::logging::init(&config.log);
    let storage = Storage::open(&config.data_dir)?;

    let tokens = TokenManager::new(config.jwt_secret.as_bytes(), config.token_ttl);
    let auth = AuthService::new(storage.clone(), tokens, config.bcrypt_cost);
    match auth
        .register(Signup {
            name: "Demo Reader".to_string(),
            email: DEMO_EMAIL.to_string(),
            password: DEMO_PASSWORD.to_string(),
            interests: vec!["technology".to_string(), "science".to_string()],
        })
        .await
    {
        Ok(()) => println!("✅ Created {DEMO_EMAIL}"),
        Err(ApiError::Conflict(_)) => println!("ℹ️  {DEMO_EMAIL} already exists"),
        Err(e) => return Err(e.into()),
    }

    let user = auth.login(DEMO_EMAIL, DEMO_PASSWORD).await?.user;
    let articles = ArticleService::new(storage.clone());
    if !articles.list(user.id)?.is_empty() {
        println!("ℹ️  Demo articles already present");
        return Ok(());
    }

    let samples = [
        (
            "Open-source compiler hits 1.0",
            "https://example.com/compiler-1-0",
            "The team celebrated a remarkable release. Early users praised the speed. More platforms are planned.",
            "technology, open source",
        ),
        (
            "Storm causes damage along the coast",
            "https://example.com/coastal-storm",
            "A violent storm damaged homes overnight. Officials warned of flood risk. Recovery crews are on site.",
            "weather",
        ),
    ];
    for (title, url, description, tags) in samples {
        let saved = articles.save(
            user.id,
            SaveArticle {
                title: Some(title.to_string()),
                url: Some(url.to_string()),
                description: Some(description.to_string()),
                tags: Some(TagsInput::Csv(tags.to_string())),
                ..SaveArticle::default()
            },
        )?;
        println!("✅ Saved \"{}\" ({})", saved.title, saved.id);
    }

    storage.flush().await?;
    Ok(())
}
