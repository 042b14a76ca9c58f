mod command;

pub use command::CommandRunner;
