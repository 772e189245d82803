// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Slug of the game template every game in this service belongs to.
pub const TYPE_THE_ANSWER_SLUG: &str = "type-the-answer";

/// Number of entries returned by the leaderboard.
pub const LEADERBOARD_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub app_env: String,
    pub port: u16,
    pub upload_dir: String,
    pub public_upload_url: String,
    pub csv_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let app_env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let upload_dir = env::var("UPLOAD_DIR")
            .unwrap_or_else(|_| "uploads".to_string());

        let public_upload_url = env::var("PUBLIC_UPLOAD_URL")
            .unwrap_or_else(|_| "/uploads".to_string());

        let csv_dir = env::var("CSV_DIR")
            .unwrap_or_else(|_| "data".to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            app_env,
            port,
            upload_dir,
            public_upload_url,
            csv_dir,
        }
    }

    /// Production mode hides stack details and 5xx messages from clients.
    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}
