//! Owned, typed font-table data.
//!
//! The binary parser is an external collaborator; a `Face` is built
//! from these finished values.

pub mod gdef;
pub mod gpos;
pub mod gsub;
pub mod gsubgpos;
pub mod kern;
pub mod morx;
