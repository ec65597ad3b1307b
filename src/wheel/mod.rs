//! Wheel construction and verification
//!
//! - `metadata` - `METADATA` and `WHEEL` rendering
//! - `record` - `RECORD` hashing and parsing
//! - `packaging` - wheel layout and deterministic ZIP output
//! - `verify` - RECORD-based integrity checks of existing wheels

mod metadata;
mod packaging;
mod record;
mod verify;

pub use metadata::{format_person, metadata_file, wheel_file};
pub use packaging::{Wheel, WheelEntry, WheelSpec};
pub use record::{record_hash, RecordEntry};
pub use verify::{verify_archive, verify_wheel, VerifiedWheel, VerifyError};
