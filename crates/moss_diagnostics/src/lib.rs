pub mod diagnostic_report;
pub mod message;

pub use diagnostic_report::{Diagnostic, Label, Severity};
pub use message::{MismatchContext, TypeError, UnpackShape};
