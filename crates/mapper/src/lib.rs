//! Maps DutchBasar auction events onto indexed entities.
//!
//! [`Mapper::handle`] is the single entry point: it matches the decoded event
//! and runs the corresponding handler against an [`basar_storage::EntityStore`].

mod aggregates;
mod handlers;
mod lookup;

pub mod error;
pub mod mapper;

pub use aggregates::{progress_percentage, to_decimal};
pub use error::{HandleOutcome, MapperError, SkipReason};
pub use mapper::{Mapper, MapperSettings};
