use std::fmt::Debug;

use crate::Config;
use crate::Error;
use crate::Result;

/// Somewhere enrollment workbooks can be fetched from.
///
/// Sources must be `Send` and `Sync` so a [`crate::Client`] can be shared
/// across threads.
pub trait Source: Debug + Send + Sync {
    /// Returns the raw workbook bytes for `end_year`.
    ///
    /// # Errors
    ///
    /// Returns an error if the workbook cannot be retrieved.
    fn fetch(&self, end_year: u16) -> Result<Vec<u8>>;
}

/// Downloads workbooks over HTTP(S).
#[derive(Debug)]
pub struct HttpSource {
    client: reqwest::blocking::Client,
    config: Config,
}

impl HttpSource {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }
}

impl Source for HttpSource {
    fn fetch(&self, end_year: u16) -> Result<Vec<u8>> {
        let url = self.config.url_for(end_year);
        log::info!("downloading {url}");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes()?;
        if bytes.is_empty() {
            return Err(Error::EmptyResponse { url });
        }
        log::debug!("downloaded {} bytes for {end_year}", bytes.len());
        Ok(bytes.to_vec())
    }
}
