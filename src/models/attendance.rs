//! Attendance facts supplied by the caller or the attendance collaborator.

use serde::{Deserialize, Serialize};

/// Expected versus actual working days for one employee and period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceFact {
    /// Days the employee was scheduled to work.
    pub expected_days: i32,
    /// Days the employee actually worked.
    pub actual_days: i32,
}

impl AttendanceFact {
    /// Returns the number of absent days, never negative.
    pub fn absent_days(&self) -> i32 {
        (self.expected_days - self.actual_days).max(0)
    }
}
