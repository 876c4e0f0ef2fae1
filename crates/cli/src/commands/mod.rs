pub mod onboard;
pub mod watch;
