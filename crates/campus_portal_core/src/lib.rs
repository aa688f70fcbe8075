pub mod admin;
pub mod attendance;
pub mod domain;
pub mod ports;
pub mod profile;
pub mod pyq;
pub mod query;
pub mod resources;
pub mod timetable;

#[cfg(test)]
mod testing;

pub use domain::{
    AttendanceRecord, AttendanceStatus, AuthSession, AuthUser, ClassType, Difficulty,
    GeneratedTimetableDay, Profile, Resource, ResourceKind, Role, SubjectSchedule,
    TimetableSubject,
};
pub use ports::{
    AnalysisModel, AuthProvider, FunctionInvoker, ObjectStorage, PortError, PortResult, RowStore,
};
pub use query::{Direction, Filter, Ordering, Row, RowQuery};
