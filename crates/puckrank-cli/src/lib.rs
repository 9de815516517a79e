// puckrank command-line application: argument parsing, the per-command
// pipelines and their terminal reports.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod workspace;
