//! # idschooldata
//!
//! `idschooldata` fetches Idaho school enrollment data published by the
//! State Department of Education and reshapes it into tidy tables.
//!
//! ## Key Concepts
//!
//! * **End year**: school years are named by the year they end in, so
//!   `2024` is the 2023-24 school year.
//! * **Wide and tidy**: the published workbooks have one column per grade.
//!   Tidy data has one row per entity and grade with a share of the
//!   entity total.
//! * **Aggregates**: district and state rows are rebuilt from the school
//!   rows, so every level is present whatever the workbook contained.
//! * **Cache**: downloaded workbooks are kept on disk and reused.
//!
//! ## Example
//!
//! ```no_run
//! use idschooldata::Client;
//! use idschooldata::Config;
//! use idschooldata::Enrollment;
//!
//! let client = Client::new(Config::from_env()?)?;
//! let years = client.get_available_years();
//! if let Enrollment::Tidy(rows) = client.fetch_enr(years.max_year, true, true)? {
//!     for row in rows.iter().filter(|r| r.is_state) {
//!         println!("{} {}", row.grade_level, row.n_students);
//!     }
//! }
//! # Ok::<(), idschooldata::Error>(())
//! ```

mod cache;
mod client;
mod config;
mod error;
mod models;
pub mod parse;
mod source;
pub mod tidy;
mod years;


pub use cache::Cache;
pub use cache::CacheEntry;
pub use client::Client;
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use models::Enrollment;
pub use models::EnrollmentRecord;
pub use models::Grade;
pub use models::Level;
pub use models::WideRecord;
pub use source::HttpSource;
pub use source::Source;
pub use years::AvailableYears;
pub use years::available_years;
pub use years::school_year_label;

/// The crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
