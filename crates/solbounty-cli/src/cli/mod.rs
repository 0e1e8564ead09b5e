/*
[INPUT]:  Parsed subcommands
[OUTPUT]: Interactive and one-shot command handlers
[POS]:    CLI layer - command module wiring
[UPDATE]: When adding new subcommand handlers
*/

pub mod commands;
pub mod init;
