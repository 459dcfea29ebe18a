mod args;

pub use args::{CliArgs, CliCommand, DemoArgs, PatchArgs};
