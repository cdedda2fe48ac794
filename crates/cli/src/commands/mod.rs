//! Subcommand implementations.

use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use icspec_core::Error;

pub mod analyze;
pub mod config_cmd;
pub mod layout;
pub mod validate;

/// Compliant document or successful command.
pub const EXIT_OK: u8 = 0;
/// Non-compliant or structurally malformed document.
pub const EXIT_NON_COMPLIANT: u8 = 1;
/// Bad usage or unreadable input.
pub const EXIT_USAGE: u8 = 2;

pub type CommandResult = Result<ExitCode, Box<dyn std::error::Error>>;

/// Read the document from `file`, or from stdin when `stdin` is set.
pub fn read_document(file: Option<&Path>, stdin: bool) -> icspec_core::Result<String> {
    if stdin {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    let path = file.ok_or_else(|| Error::Input {
        message: "provide a document path or --stdin".into(),
    })?;
    std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Map a pass/fail outcome to the process exit code.
pub fn exit_for(ok: bool) -> ExitCode {
    if ok {
        EXIT_OK.into()
    } else {
        EXIT_NON_COMPLIANT.into()
    }
}
