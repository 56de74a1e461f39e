//! Application configuration, collected from the environment once at startup
//! and passed explicitly into [`crate::create_router`]. No module-level
//! globals.

use std::net::SocketAddr;

use crate::mailer::MailConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// Directory uploaded media is written to.
    pub upload_dir: String,
    /// Public URL prefix the media directory is served under.
    pub media_base_url: String,
    /// Base URL used when composing links in outbound mail.
    pub public_url: String,
    pub mail: MailConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let host = env_or("HOST", "127.0.0.1");
        let port: u16 = env_or("PORT", "3000").parse().unwrap_or(3000);
        let bind_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000)));

        let jwt_secret = env_or("JWT_SECRET", "change-me-in-production");
        if jwt_secret == "change-me-in-production" {
            tracing::warn!("Using default JWT secret; set JWT_SECRET for production use");
        }

        Self {
            bind_addr,
            jwt_secret,
            jwt_expiry_hours: env_or("JWT_EXPIRY_HOURS", "24").parse().unwrap_or(24),
            upload_dir: env_or("UPLOAD_DIR", "./uploads"),
            media_base_url: env_or("MEDIA_BASE_URL", "/uploads"),
            public_url: env_or("PUBLIC_URL", "http://localhost:3000"),
            mail: MailConfig {
                smtp_host: env_or("SMTP_HOST", "localhost"),
                smtp_port: env_or("SMTP_PORT", "587").parse().unwrap_or(587),
                from_name: env_or("EMAIL_FROM_NAME", "Blockpress"),
                from_address: env_or("EMAIL_FROM_ADDRESS", "noreply@localhost"),
            },
        }
    }

    /// Configuration suitable for in-process tests: throwaway upload dir,
    /// fixed JWT secret.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            upload_dir: "./test_uploads".to_string(),
            media_base_url: "/uploads".to_string(),
            public_url: "http://test.invalid".to_string(),
            mail: MailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: 587,
                from_name: "Test".to_string(),
                from_address: "test@test.invalid".to_string(),
            },
        }
    }
}
