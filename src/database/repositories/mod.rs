//! One repository per table group. Each owns a pool handle and speaks
//! parameterised SQL; composite writes run inside a transaction that rolls
//! back when dropped uncommitted.

mod accounts;
mod checklists;
mod events;
mod menus;
mod schools;
mod timetables;

pub use accounts::AccountRepository;
pub use checklists::ChecklistRepository;
pub use events::EventRepository;
pub use menus::MenuRepository;
pub use schools::SchoolRepository;
pub use timetables::TimetableRepository;

use super::manager::DatabaseError;

/// Turn a unique-constraint clash into a readable conflict
pub(crate) fn conflict_as(err: DatabaseError, message: &str) -> DatabaseError {
    match err {
        DatabaseError::Conflict(_) => DatabaseError::Conflict(message.to_string()),
        other => other,
    }
}
