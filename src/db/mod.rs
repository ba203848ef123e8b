//! The fixed-record table layer: primary keys, indexes, and the table that
//! ties them to a backing file.
//!
//! | Module | Contents |
//! |---|---|
//! | [`key`] | [`key::RowId`], the composite id/flags primary key |
//! | [`index`] | [`index::LinearIndex`] and [`index::MapIndex`] |
//! | [`record`] | [`record::Record`], the trait a table entry implements |
//! | [`table`] | [`table::Table`], tying storage, index and record together |

pub mod index;
pub mod key;
pub mod record;
pub mod table;

pub use index::{LinearIndex, MapIndex, PrimaryIndex};
pub use key::RowId;
pub use record::Record;
pub use table::{Storage, Table};
