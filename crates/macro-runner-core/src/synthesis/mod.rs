mod script_file;
mod statement;
mod synthesizer;

pub use {
    script_file::save_script,
    statement::{AUTOMATION_ROOT, COMMAND_HELPER, CommandTarget, Statement},
    synthesizer::{DEFAULT_REFERENCE_PATH, Synthesizer, compress},
};
