//! sea-orm models for every OptiTalent table.
//!
//! All rows except [`tenant`] carry a `tenant_id`; resolvers filter on it.

pub mod applicant;
pub mod app_user;
pub mod assessment;
pub mod attendance;
pub mod course;
pub mod department;
pub mod employee;
pub mod enrollment;
pub mod job_role;
pub mod leave_request;
pub mod notification;
pub mod payroll_run;
pub mod payslip;
pub mod tenant;
pub mod ticket;
pub mod user_role;
