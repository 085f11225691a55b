use console_port::transport_api::ClientError;
use snafu::Snafu;

/// Common error type for the refresh agent.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[allow(missing_docs)]
pub enum SvcError {
    #[snafu(display("Invalid refresh delay '{:?}': must be positive", delay))]
    InvalidDelay { delay: std::time::Duration },
    #[snafu(display("Failed to query the remote engine"), context(false))]
    Transport { source: ClientError },
}
