use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        gemini_api_key: get_env_opt("GEMINI_API_KEY").or_else(|| get_env_opt("API_KEY")),
        gemini_base_url: get_env_or_default("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
        state_path: get_env_opt("GHOSTEYE_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_state_path),
        bind_addr: get_env_or_default("GHOSTEYE_BIND_ADDR", "127.0.0.1:3000"),
        static_dir: get_env_or_default("GHOSTEYE_STATIC_DIR", "static"),
    }
});

pub struct Config {
    /// Missing key is not fatal at startup; searches fail with a configuration error
    /// (see `gemini::backend_from_config`).
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub state_path: PathBuf,
    pub bind_addr: String,
    pub static_dir: String,
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_env_opt(key).unwrap_or_else(|| default.to_string())
}

pub fn default_state_path() -> PathBuf {
    directories::ProjectDirs::from("com", "ghosteye", "ghosteye").map_or_else(
        || PathBuf::from("ghosteye_state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}
