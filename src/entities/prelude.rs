pub use super::audit_log::Entity as AuditLog;
pub use super::departments::Entity as Departments;
pub use super::login_attempts::Entity as LoginAttempts;
pub use super::products::Entity as Products;
pub use super::requisition_lines::Entity as RequisitionLines;
pub use super::requisitions::Entity as Requisitions;
pub use super::roles::Entity as Roles;
pub use super::users::Entity as Users;
