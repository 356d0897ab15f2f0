//! Binary containers for prepared ocean fields.
//!
//! Three little-endian layouts are produced for the downstream simulator:
//! a coordinates container, one f16 daily field per day, and one 3D
//! currents container per day. See [`format`] for the byte layouts.
//!
//! Writes are atomic and idempotent: a file is either complete or absent,
//! and writing a file that already exists is a no-op.

pub mod error;
pub mod format;
pub mod grid_source;
pub mod reader;
pub mod writer;

pub use error::{ContainerError, Result};
pub use format::{
    currents_file_name, daily_file_name, Header, COORDINATES_FILE_NAME, MISSING_SENTINEL,
};
pub use grid_source::{load_grid, GridSource};
pub use reader::{
    read_coordinates, read_currents, read_daily_field, read_daily_header, read_file, read_grid,
    read_header, CurrentsContainer, DailyField,
};
pub use writer::{
    encode_coordinates, encode_currents, encode_daily, ContainerWriter, WriteOutcome,
};
