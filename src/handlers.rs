pub mod batch;
pub mod help;
pub mod login;
pub mod save;

pub use batch::{cancel_job, start_batch};
pub use help::help;
pub use login::{handle_login_input, logout, start_login};
pub use save::save_message;
