pub mod card_writer;
pub mod command_reader;
pub mod command_runner;
