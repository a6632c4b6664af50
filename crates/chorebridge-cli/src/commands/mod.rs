pub mod classify;
pub mod complete;
pub mod config;
pub mod parse;
pub mod reminders;
pub mod script;
pub mod sync;

use std::io::Read;

/// Read a payload from `input`, where "-" means stdin.
pub(crate) fn read_input(input: &str) -> Result<String, Box<dyn std::error::Error>> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).map_err(|e| format!("cannot read {input}: {e}").into())
    }
}
