pub mod audit;
pub use audit::{AuditSink, StoreAuditSink};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, AuthStrategy, SessionUser};
pub use auth_service_impl::SeaOrmAuthService;

pub mod requisition_service;
pub mod requisition_service_impl;
pub use requisition_service::{
    CreateRequisition, LineInput, ListQuery, RequisitionDetail, RequisitionError,
    RequisitionService, UpdateRequisition,
};
pub use requisition_service_impl::SeaOrmRequisitionService;

pub mod transition_service;
pub mod transition_service_impl;
pub use transition_service::{
    TransitionError, TransitionOutcome, TransitionService, TransitionWarning,
};
pub use transition_service_impl::SeaOrmTransitionService;

pub mod user_admin_service;
pub mod user_admin_service_impl;
pub use user_admin_service::{
    AuditPage, CreateUserRequest, UpdateUserRequest, UserAdminError, UserAdminService,
};
pub use user_admin_service_impl::SeaOrmUserAdminService;
