//! Output formatters for duplicate groups.
//!
//! - JSON for automation and scripting
//! - Plain text for terminals
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::duplicates::DuplicateFinder;
//! use mediadupe::error::ExitCode;
//! use mediadupe::output::{JsonOutput, TextReport};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! print!("{}", TextReport::new(&groups).with_summary(&summary).render());
//!
//! let code = ExitCode::for_scan(groups.len(), &summary);
//! println!("{}", JsonOutput::new(&groups, &summary, code).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextReport;
