/// Errors produced while fetching and reshaping enrollment data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested school year is outside the published range.
    #[error("end_year {year} is not available; valid years are {min}-{max}")]
    InvalidYear {
        /// The year that was asked for.
        year: u16,
        /// First available end year.
        min: u16,
        /// Last available end year.
        max: u16,
    },

    /// A configuration value could not be interpreted.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("download of {url} failed with status {status}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// The server answered successfully but sent no data.
    #[error("download of {url} returned an empty body")]
    EmptyResponse {
        /// The URL that was requested.
        url: String,
    },

    /// Reading or writing the local cache failed.
    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded file is not a readable workbook.
    #[error("unreadable workbook: {0}")]
    Workbook(String),

    /// The workbook was readable but its layout was not recognised.
    #[error("could not parse enrollment data for {year}: {reason}")]
    Parse {
        /// The end year being parsed.
        year: u16,
        /// What was wrong.
        reason: String,
    },
}

impl From<calamine::XlsxError> for Error {
    fn from(e: calamine::XlsxError) -> Self {
        Error::Workbook(e.to_string())
    }
}

/// Shorthand for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
