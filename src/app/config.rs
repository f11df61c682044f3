use crate::app::AppError;
use crate::domain::transaction::DEFAULT_REFUND_WINDOW_HOURS;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub http_bind: String,
    pub cors_allowed_origin: String,
    pub refund_window_hours: u32,
}

impl AppConfig {
    /// Reads the process environment, after merging a `.env` file when one exists.
    pub fn from_env() -> Result<Self, AppError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let refund_window_hours =
            parse_or_default(&lookup, "REFUND_WINDOW_HOURS", DEFAULT_REFUND_WINDOW_HOURS)?;
        if refund_window_hours == 0 {
            return Err(AppError::config(
                "REFUND_WINDOW_HOURS must be greater than zero",
            ));
        }

        Ok(Self {
            db_path: string_or_default(&lookup, "DB_PATH", "./data/ev_console.db"),
            http_bind: string_or_default(&lookup, "HTTP_BIND", "0.0.0.0:8080"),
            cors_allowed_origin: string_or_default(
                &lookup,
                "CORS_ALLOWED_ORIGIN",
                "http://localhost:3000",
            ),
            refund_window_hours,
        })
    }
}

fn string_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}
