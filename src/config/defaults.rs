//! Default configuration values for Memory-Scan

use crate::core::types::MemoryAlignment;
use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub max_threads: usize,
    pub parallel: bool,
    pub alignment: MemoryAlignment,
    pub progress_interval: usize,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
    pub file: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults {
            max_threads: num_cpus::get().min(8),
            parallel: true,
            alignment: MemoryAlignment::Auto,
            progress_interval: 64, // regions between progress reports
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
            file: "memory-scan.log".to_string(),
        },
    }
}
