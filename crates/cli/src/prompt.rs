//! Interactive directory prompts

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use syncr_core::check_directory;

/// Strip the line terminator left by `read_line` (`\n`, then `\r`)
pub fn clean_line(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Ask for a directory until the answer exists and is a directory
///
/// Each rejected answer prints a one-line diagnostic followed by
/// `Please try again.`. Closing the input before a valid answer is an
/// `UnexpectedEof` error.
pub fn prompt_directory<R, W>(label: &str, input: &mut R, output: &mut W) -> io::Result<PathBuf>
where
    R: BufRead,
    W: Write,
{
    loop {
        write!(output, "{}: ", label)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("input closed while waiting for {}", label.to_lowercase()),
            ));
        }

        let path = PathBuf::from(clean_line(&line));
        match check_directory(&path) {
            Ok(()) => return Ok(path),
            Err(err) => {
                writeln!(output, "{}", err)?;
                writeln!(output, "Please try again.")?;
                writeln!(output)?;
            }
        }
    }
}
