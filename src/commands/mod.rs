mod companies;
mod login;
mod setup;
mod sync_cmd;

pub use companies::CompaniesCommand;
pub use login::LoginCommand;
pub use setup::SetupCommand;
pub use sync_cmd::SyncCommand;
