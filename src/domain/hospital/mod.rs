//! Hospital domain module: upload parsing and the directory port

mod csv_import;
mod directory;
mod payload;

pub use csv_import::{parse_upload, validate_filename};
#[cfg(test)]
pub use directory::MockHospitalDirectory;
pub use directory::{CreateOutcome, HospitalDirectory};
pub use payload::{CreateHospitalRequest, HospitalPayload};
