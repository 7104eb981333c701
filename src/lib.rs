pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use pipeline::extraction::{DocumentDecoder, ExtractionError, PdfiumDecoder};
pub use pipeline::hash::ContentHash;
pub use pipeline::report::{ExtractionResult, IndicatorTally, PeriodKey};
pub use pipeline::{process_batch, ProcessingError, ReportProcessor, ReportSession, Upload};

/// Initialize tracing to stderr. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
