use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

pub const FOLDER_AVATAR: &str = "images/avatar";
pub const FOLDER_THUMBNAIL: &str = "images/thumbnail";
pub const FOLDER_FILE: &str = "files";
pub const FOLDER_VIDEO: &str = "videos";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub key_token: String,
    pub storage_bucket: String,
    pub youtube_api_key: String,
    pub cloudinary_url: String,
    pub cloudinary_name: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let pg_host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
        let pg_port = env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());
        let pg_user = env::var("POSTGRES_USER").context("POSTGRES_USER not set")?;
        let pg_password = env::var("POSTGRES_PASSWORD").unwrap_or_default();
        let pg_db = env::var("POSTGRES_DB").context("POSTGRES_DB not set")?;
        let environment = env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        // dev connects over TCP; deployed environments go through the
        // Cloud SQL unix socket.
        let url = if environment == "dev" {
            format!("postgres://{pg_user}:{pg_password}@{pg_host}:{pg_port}/{pg_db}")
        } else {
            format!("postgres://{pg_user}:{pg_password}@/{pg_db}?host=/cloudsql/{pg_host}")
        };

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .context("SERVER_PORT must be a number")?,
            },
            database: DatabaseConfig { url },
            key_token: env::var("KEY_TOKEN").context("KEY_TOKEN not set")?,
            storage_bucket: env::var("GOOGLE_STORAGE_BUCKET").unwrap_or_default(),
            youtube_api_key: env::var("API_KEY").unwrap_or_default(),
            cloudinary_url: env::var("CLOUDINARY_URL").unwrap_or_default(),
            cloudinary_name: env::var("CLOUDINARY_NAME").unwrap_or_default(),
        })
    }

    /// Public URL for an object stored under the given bucket folder.
    pub fn storage_url(&self, folder: &str, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/{}/{}/{}",
            self.storage_bucket, folder, key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://u:p@localhost:5432/train".to_string(),
            },
            key_token: "secret".to_string(),
            storage_bucket: "train-bucket".to_string(),
            youtube_api_key: String::new(),
            cloudinary_url: String::new(),
            cloudinary_name: String::new(),
        }
    }

    #[test]
    fn test_storage_url() {
        let cfg = test_config();
        assert_eq!(
            cfg.storage_url(FOLDER_FILE, "handbook.pdf"),
            "https://storage.googleapis.com/train-bucket/files/handbook.pdf"
        );
        assert_eq!(
            cfg.storage_url(FOLDER_AVATAR, "me.png"),
            "https://storage.googleapis.com/train-bucket/images/avatar/me.png"
        );
    }
}
