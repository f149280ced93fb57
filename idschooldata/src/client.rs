use crate::AvailableYears;
use crate::Cache;
use crate::CacheEntry;
use crate::Config;
use crate::Enrollment;
use crate::HttpSource;
use crate::Result;
use crate::Source;
use crate::WideRecord;
use crate::parse;
use crate::tidy;

/// Fetches, caches and reshapes enrollment data.
#[derive(Debug)]
pub struct Client {
    config: Config,
    source: Box<dyn Source>,
    cache: Cache,
}

fn layout(wide: Vec<WideRecord>, tidy: bool) -> Enrollment {
    if tidy {
        Enrollment::Tidy(tidy::tidy_enr(&wide))
    } else {
        Enrollment::Wide(wide)
    }
}

impl Client {
    /// A client downloading over HTTP.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        let source = HttpSource::new(config.clone())?;
        Ok(Self::with_source(config, source))
    }

    /// A client reading from `source` instead of the network.
    pub fn with_source(config: Config, source: impl Source + 'static) -> Self {
        let cache = Cache::new(config.cache_dir.clone());
        Self {
            config,
            source: Box::new(source),
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get_available_years(&self) -> AvailableYears {
        self.config.years
    }

    /// Enrollment for one school year.
    ///
    /// `end_year` is the calendar year the school year ends in. With `tidy`
    /// the result has one row per entity and grade, otherwise one row per
    /// entity. With `use_cache` a previously downloaded workbook is reused
    /// and fresh downloads are stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidYear`] before any I/O if `end_year` is
    /// not available, or any transport or parse error.
    pub fn fetch_enr(&self, end_year: u16, tidy: bool, use_cache: bool) -> Result<Enrollment> {
        let end_year = self.config.years.validate(end_year)?;
        let wide = self.fetch_wide(end_year, use_cache)?;
        Ok(layout(wide, tidy))
    }

    /// Enrollment for several years, concatenated in the order given.
    ///
    /// All years are validated before anything is fetched.
    pub fn fetch_enr_multi(
        &self,
        end_years: &[u16],
        tidy: bool,
        use_cache: bool,
    ) -> Result<Enrollment> {
        for year in end_years {
            self.config.years.validate(*year)?;
        }
        let mut wide = Vec::new();
        for year in end_years {
            wide.extend(self.fetch_wide(*year, use_cache)?);
        }
        Ok(layout(wide, tidy))
    }

    pub fn clear_cache(&self, end_year: Option<u16>) -> Result<usize> {
        self.cache.clear(end_year)
    }

    pub fn cache_status(&self) -> Result<Vec<CacheEntry>> {
        self.cache.status()
    }

    fn fetch_wide(&self, end_year: u16, use_cache: bool) -> Result<Vec<WideRecord>> {
        let cached = if use_cache {
            self.cached_workbook(end_year)
        } else {
            None
        };
        let (bytes, fresh) = match cached {
            Some(bytes) => (bytes, false),
            None => (self.source.fetch(end_year)?, true),
        };

        // Only workbooks that parse are written to the cache.
        let rows = parse::read_workbook(bytes.clone())?;
        let wide = tidy::aggregate(parse::parse_rows(end_year, &rows)?);
        log::info!("{end_year}: {} entities", wide.len());

        if fresh && use_cache && let Err(e) = self.cache.put(end_year, &bytes) {
            log::warn!("could not cache workbook for {end_year}: {e}");
        }
        Ok(wide)
    }

    fn cached_workbook(&self, end_year: u16) -> Option<Vec<u8>> {
        match self.cache.get(end_year) {
            Ok(Some(bytes)) => {
                log::debug!("cache hit for {end_year}");
                Some(bytes)
            }
            Ok(None) => {
                log::debug!("cache miss for {end_year}");
                None
            }
            Err(e) => {
                log::warn!("ignoring unreadable cache entry for {end_year}: {e}");
                None
            }
        }
    }
}
