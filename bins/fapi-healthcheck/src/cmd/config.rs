use std::fmt;

use clap::{Args, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Check {
    Health,
    Readiness,
}

impl Check {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Readiness => "readiness",
        }
    }

    /// Путь probe'а на сервере.
    pub fn path(self) -> &'static str {
        match self {
            Self::Health => "/v1/health",
            Self::Readiness => "/v1/ready",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Args, Clone, Debug)]
pub struct ProbeArgs {
    /// Хост сервера
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Порт сервера
    #[arg(long, default_value_t = 8989)]
    pub port: u16,

    /// Использовать https
    #[arg(long)]
    pub ssl: bool,

    /// Какой probe проверять
    #[arg(long, value_enum, default_value_t = Check::Health)]
    pub check: Check,

    /// Таймаут запроса, секунды
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,
}

impl ProbeArgs {
    pub fn url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}{}", self.host, self.port, self.check.path())
    }
}
