//! API request and response types.
//!
//! These are the wire shapes for the REST surface; domain entities from
//! `counsel-core` map into them at the route boundary.

pub mod assignment;
pub mod auth;
pub mod counsellor;
pub mod session;
pub mod student;

pub use assignment::{AvailableSlotResponse, BindStudentRequest, SlotResponse};
pub use auth::{AccountResponse, LoginRequest, LoginResponse, RegisterUserRequest};
pub use counsellor::{
    AssignmentSpecRequest, CounsellorResponse, EditAssignmentsRequest, ListCounsellorsResponse,
    RegisterCounsellorRequest,
};
pub use session::{
    CreateSessionRequest, ListSessionsQuery, ListSessionsResponse, SessionResponse,
    UpdateSessionRequest,
};
pub use student::{
    CreateStudentRequest, ListStudentsQuery, ListStudentsResponse, StudentResponse,
    UpdateStudentRequest,
};
