use std::io::{BufRead, Write};

/// Ask a yes/no question until a recognizable answer arrives.
///
/// Accepts `y`, `yes`, `n`, `no` in any case. An empty line picks `default`;
/// with no default the question is asked again. End of input is treated like
/// an empty line, falling back to "no" when there is no default.
pub fn ask<R, W>(
    question: &str,
    default: Option<bool>,
    input: &mut R,
    output: &mut W,
) -> std::io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    let hint = match default {
        Some(true) => " [Y/n] ",
        Some(false) => " [y/N] ",
        None => " [y/n] ",
    };

    loop {
        write!(output, "{question}{hint}")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(default.unwrap_or(false));
        }

        match line.trim().to_lowercase().as_str() {
            "" if default.is_some() => return Ok(default.unwrap_or(false)),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please respond with 'yes' or 'no' (or 'y' or 'n').")?,
        }
    }
}

/// [`ask`] on the process's stdin/stdout.
pub fn confirm(question: &str, default: Option<bool>) -> std::io::Result<bool> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    ask(question, default, &mut stdin.lock(), &mut stdout.lock())
}
