//! Line prompts on the application's console

use std::io;

use crate::infrastructure::console::Console;

/// Print `message: ` and read one line. End of input yields an empty answer.
pub fn prompt(console: &mut Console, message: &str) -> io::Result<String> {
    console.write_str(&format!("{message}: "))?;
    console.flush()?;
    Ok(console.read_line()?.unwrap_or_default())
}

/// Like `prompt`, returning `default` for a blank answer.
pub fn prompt_default(console: &mut Console, message: &str, default: &str) -> io::Result<String> {
    console.write_str(&format!("{message} [{default}]: "))?;
    console.flush()?;
    let answer = console.read_line()?.unwrap_or_default();
    if answer.trim().is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer)
    }
}
