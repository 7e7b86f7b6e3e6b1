use std::io::{self, Write};

pub fn write_stdout_text(text: &str) -> io::Result<()> {
    write_stdout(text.as_bytes(), false)
}

pub fn write_stdout_line(text: &str) -> io::Result<()> {
    write_stdout(text.as_bytes(), true)
}

fn write_stdout(bytes: &[u8], newline: bool) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    tolerate_broken_pipe(write_and_flush(&mut stdout, bytes, newline))
}

fn write_and_flush(writer: &mut dyn Write, bytes: &[u8], newline: bool) -> io::Result<()> {
    writer.write_all(bytes)?;
    if newline {
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// A closed reader (`agendar fixed list | head`) is not a failure.
fn tolerate_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
