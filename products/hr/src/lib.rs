//! HR domain rules shared by the API layer.
//!
//! Everything here is pure: no database, no clock. Callers pass the instants
//! and records in and persist whatever comes out.

pub mod leave;
pub mod payroll;
pub mod typing;

pub use leave::{LeaveError, MAX_LEAVE_SPAN_DAYS, working_days};
pub use payroll::{PayComponents, PayrollError, parse_period};
pub use typing::{TypingError, TypingResult, TypingTest, WpmSample};

/// Human-facing employee code for the `seq`-th employee of a tenant.
pub fn employee_code(seq: u64) -> String {
    format!("EMP-{:04}", seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_codes_are_zero_padded() {
        assert_eq!(employee_code(1), "EMP-0001");
        assert_eq!(employee_code(42), "EMP-0042");
        assert_eq!(employee_code(12345), "EMP-12345");
    }
}
