//! API configuration.

use std::path::PathBuf;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size (uploads included)
    pub max_body_size: usize,
    /// Where uploads are written
    pub upload_folder: PathBuf,
    /// Lowercase extensions accepted by the upload endpoint
    pub allowed_extensions: Vec<String>,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 500 * 1024 * 1024, // 500MB
            upload_folder: PathBuf::from("uploads"),
            allowed_extensions: ["mp4", "avi", "mov", "mkv", "webm"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            environment: "development".to_string(),
        }
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            upload_folder: std::env::var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_folder),
            allowed_extensions: std::env::var("ALLOWED_EXTENSIONS")
                .map(|s| split_list(&s.to_lowercase()))
                .unwrap_or(defaults.allowed_extensions),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Lowercased extension of `filename` if it is on the allow list.
    pub fn accepted_extension(&self, filename: &str) -> Option<String> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_lowercase();
        self.allowed_extensions.contains(&ext).then_some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_extension() {
        let config = ApiConfig::default();
        assert_eq!(config.accepted_extension("clip.MP4").as_deref(), Some("mp4"));
        assert_eq!(config.accepted_extension("my.holiday.webm").as_deref(), Some("webm"));
        assert_eq!(config.accepted_extension("notes.txt"), None);
        assert_eq!(config.accepted_extension("noextension"), None);
    }

    #[test]
    fn test_is_production() {
        let mut config = ApiConfig::default();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }

    #[test]
    fn test_split_list_trims_and_skips_empty() {
        assert_eq!(split_list(" mp4, mov ,,"), vec!["mp4", "mov"]);
    }
}
