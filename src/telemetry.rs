//! Diagnostics for the binary. Responses own stdout, so log lines go to
//! stderr.

use once_cell::sync::OnceCell;
use tracing_subscriber::{filter::ParseError, fmt, EnvFilter};

/// Used when neither `SALEQL_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_DIRECTIVES: &str = "info";

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Parses the configured directives and raises this crate's own level once
/// per `-v`: debug, then trace.
pub fn log_filter(directives: Option<&str>, verbose: u8) -> Result<EnvFilter, ParseError> {
    let filter = EnvFilter::try_new(directives.unwrap_or(DEFAULT_DIRECTIVES))?;
    let own = match verbose {
        0 => return Ok(filter),
        1 => "saleql=debug",
        _ => "saleql=trace",
    };
    Ok(filter.add_directive(own.parse()?))
}

/// Installs the process-wide subscriber. Only the first call has an effect.
pub fn init(filter: EnvFilter) {
    INSTALLED.get_or_init(|| {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    });
}
