// Infrastructure: command-line front end

pub mod cli;

pub use cli::{run, Cli};
