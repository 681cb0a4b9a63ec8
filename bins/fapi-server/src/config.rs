use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use fapi_api_server::ApiConfig;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "fapi-server", about = "Приём HTTP payload'ов с записью в файлы")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Запустить сервер
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Путь к TOML конфиг файлу (если файла нет, значения по умолчанию)
    #[arg(long, default_value = "fapi.toml", env = "FAPI_CONFIG")]
    pub config: String,

    /// Адрес listener'а, напр. 0.0.0.0:8989
    #[arg(long, env = "FAPI_LISTEN")]
    pub listen: Option<String>,

    /// Каталог для принятых payload'ов
    #[arg(long, env = "FAPI_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Количество writer-потоков
    #[arg(long)]
    pub workers: Option<usize>,

    /// Ёмкость очереди записи
    #[arg(long)]
    pub queue_capacity: Option<usize>,
}

// ---- TOML Config ----

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Лимит тела запроса в байтах.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Размер буфера записи одного writer'а.
    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,
    /// Сколько запрос ждёт места в очереди, прежде чем получить 408.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Сколько ждать завершения HTTP сервера и writer'ов при остановке.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_listen() -> String {
    "0.0.0.0:8989".into()
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}
fn default_max_body_size() -> usize {
    10 << 20
}
fn default_workers() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    100
}
fn default_write_buffer_size() -> usize {
    4096
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_shutdown_grace_ms() -> u64 {
    5_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            upload_dir: default_upload_dir(),
            max_body_size: default_max_body_size(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            write_buffer_size: default_write_buffer_size(),
            request_timeout_ms: default_request_timeout_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        toml::from_str(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    /// Итоговая конфигурация: defaults < config file < env/CLI.
    ///
    /// Отсутствующий файл не ошибка; существующий, но нечитаемый
    /// или битый файл является ошибкой.
    pub fn resolve(args: &ServeArgs) -> Result<Self, ServerError> {
        let mut cfg = if Path::new(&args.config).exists() {
            Self::load(&args.config)?
        } else {
            tracing::info!(config = %args.config, "config file not found, using defaults");
            Self::default()
        };

        if let Some(listen) = &args.listen {
            cfg.listen = listen.clone();
        }
        if let Some(dir) = &args.upload_dir {
            cfg.upload_dir = dir.clone();
        }
        if let Some(workers) = args.workers {
            cfg.workers = workers;
        }
        if let Some(capacity) = args.queue_capacity {
            cfg.queue_capacity = capacity;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        let positive = [
            ("workers", self.workers),
            ("queue_capacity", self.queue_capacity),
            ("write_buffer_size", self.write_buffer_size),
            ("max_body_size", self.max_body_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ServerError::Config {
                    context: "validate",
                    detail: format!("{name} must be > 0"),
                });
            }
        }
        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            upload_dir: self.upload_dir.clone(),
            max_body_size: self.max_body_size,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
