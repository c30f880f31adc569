pub mod account;
pub mod checklist;
pub mod events;
pub mod menu;
pub mod school;
pub mod timetable;

pub use account::{
    Account, DbId, FlatAccount, FlattenError, PermissionInfo, PermissionLevel, SchoolId, StudentInfo,
    TeacherInfo, Timetable,
};
pub use checklist::{Checklist, ChecklistInput, ChecklistItem};
pub use events::{Attendance, EventEntry, Events};
pub use menu::{Allergy, CafeteriaMenu, MenuEntry};
pub use school::School;
pub use timetable::{NewTimetableEntry, TimetableEntry, TimetableView};
