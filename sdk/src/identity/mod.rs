//! # Identity
//!
//! Users, enrollment with the membership service, and the legacy
//! [`Member`] signer bound to one chain.

pub mod enrollment;
pub mod member;
pub mod user;

pub use enrollment::{
    check_credentials, Enrollment, EnrollmentError, EnrollmentService, HttpEnrollmentClient,
};
pub use member::Member;
pub use user::{User, UserRecord};
