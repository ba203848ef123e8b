//! Raw and mirrored file I/O.
//!
//! | Module | Contents |
//! |---|---|
//! | [`file`] | A single record file: seek/read/write/commit/truncate |
//! | [`multifile`] | A primary file mirrored across up to five redundant copies |

pub mod file;
pub mod multifile;

pub use file::{OpenMode, RecordFile};
pub use multifile::{compare, MultiFile};
