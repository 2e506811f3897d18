//! Process utilities for spawning the OCR tool chain.
//!
//! `tesseract` and `pdftoppm` are console programs; on Windows they would
//! flash a command prompt window for every page unless told not to.

use std::process::{Command, Output};

use crate::errors::ExtractionError;

/// Windows creation flag to prevent console window creation
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Extension trait to hide console windows when spawning processes on Windows.
///
/// On non-Windows platforms, this is a no-op.
pub trait HideConsoleWindow {
    fn hide_console_window(&mut self) -> &mut Self;
}

#[cfg(windows)]
impl HideConsoleWindow for Command {
    fn hide_console_window(&mut self) -> &mut Self {
        use std::os::windows::process::CommandExt;
        self.creation_flags(CREATE_NO_WINDOW)
    }
}

#[cfg(not(windows))]
impl HideConsoleWindow for Command {
    fn hide_console_window(&mut self) -> &mut Self {
        self
    }
}

/// Run an OCR tool to completion, mapping spawn failures and non-zero exits
/// to `ExtractionError::Ocr`.
pub fn run_ocr_tool(command: &mut Command, tool: &str) -> Result<Output, ExtractionError> {
    let output = command
        .hide_console_window()
        .output()
        .map_err(|e| ExtractionError::Ocr(format!("failed to run {}: {}", tool, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::Ocr(format!(
            "{} exited with {}: {}",
            tool,
            output.status,
            stderr.trim()
        )));
    }

    Ok(output)
}
