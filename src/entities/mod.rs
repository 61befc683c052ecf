pub mod prelude;

pub mod audit_log;
pub mod departments;
pub mod login_attempts;
pub mod products;
pub mod requisition_lines;
pub mod requisitions;
pub mod roles;
pub mod users;
