pub mod audit;
pub mod catalog;
pub mod login_attempt;
pub mod reference;
pub mod requisition;
pub mod user;
