// handlers/protected/mod.rs - Protected handlers (session token required)
//
// Security Level: client-key middleware, then JWT authentication
// Middleware: the JWT layer binds `AuthUser`; handlers load the caller's
// account through the `CurrentAccount` extractor and check its level.

pub mod accounts;        // /students, /teachers, /admins
pub mod admin;           // /admins/accounts
pub mod cafeteria_menus; // /cafeteria_menus
pub mod checklist;       // /checklist
pub mod events;          // /events
pub mod map;             // /map
pub mod timetable;       // /timetable

/*
LEVEL CHECKS:

Handlers answer 403 when the caller's level cannot use the endpoint
(e.g. a teacher calling GET /students) and 404 when a looked-up account has
the wrong level (GET /students/:user_id naming a teacher). Ownership checks
(timetable entries, checklists) also answer 403.
*/
