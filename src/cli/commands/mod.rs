mod archive;
mod create_user;

pub use archive::cmd_archive;
pub use create_user::cmd_create_user;
