/// Application-level constants
pub const APP_NAME: &str = "school-reports";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-document size limit (5 MB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of documents processed per batch
pub const DEFAULT_MAX_FILES: usize = 30;

const MAX_FILE_MB_ENV: &str = "SCHOOL_REPORTS_MAX_FILE_MB";
const MAX_FILES_ENV: &str = "SCHOOL_REPORTS_MAX_FILES";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "school_reports_lib=info,school_reports=info,warn"
}

/// Input limits enforced by the caller before a document reaches the pipeline.
/// The pipeline itself imposes none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub max_files: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

impl UploadLimits {
    /// Read limits from `SCHOOL_REPORTS_MAX_FILE_MB` / `SCHOOL_REPORTS_MAX_FILES`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let max_file_bytes = parse_positive(MAX_FILE_MB_ENV, lookup(MAX_FILE_MB_ENV))
            .map(mb_to_bytes)
            .unwrap_or(defaults.max_file_bytes);
        let max_files = parse_positive(MAX_FILES_ENV, lookup(MAX_FILES_ENV))
            .map(|n| n as usize)
            .unwrap_or(defaults.max_files);
        Self {
            max_file_bytes,
            max_files,
        }
    }

    /// Apply command-line overrides on top of these limits.
    pub fn with_overrides(self, max_file_mb: Option<u64>, max_files: Option<usize>) -> Self {
        Self {
            max_file_bytes: max_file_mb
                .filter(|mb| *mb > 0)
                .map(mb_to_bytes)
                .unwrap_or(self.max_file_bytes),
            max_files: max_files.filter(|n| *n > 0).unwrap_or(self.max_files),
        }
    }

    pub fn max_file_mb(&self) -> f64 {
        self.max_file_bytes as f64 / (1024.0 * 1024.0)
    }
}

fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

fn parse_positive(key: &str, raw: Option<String>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid limit, using default");
            None
        }
    }
}
