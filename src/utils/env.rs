// src/utils/env.rs

use log::debug;

/// Loads environment variables from a `.env` file when one exists. The file
/// is optional; the system environment always wins.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(_) => debug!("No .env file found; using system environment"),
    }
}
