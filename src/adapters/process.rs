use crate::domain::model::{FlashCommand, FAULT_EXIT_CODE};
use crate::domain::ports::ProcessRunner;
use crate::utils::error::Result;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

/// Spawns the real program with stdout and stderr on a single pipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &FlashCommand, on_line: &mut dyn FnMut(String)) -> Result<i32> {
        let (reader, writer) = std::io::pipe()?;

        // The Command keeps copies of the write end; it must be dropped
        // before reading or EOF never arrives.
        let mut child = {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args)
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer);
            cmd.spawn()?
        };
        tracing::debug!("Spawned {} (pid {})", command.program.display(), child.id());

        if let Err(e) = forward_lines(BufReader::new(reader), on_line) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }

        let status = child.wait()?;
        tracing::debug!("{} exited with {}", command.program.display(), status);
        Ok(status.code().unwrap_or(FAULT_EXIT_CODE))
    }
}

fn forward_lines<R: BufRead>(mut reader: R, on_line: &mut dyn FnMut(String)) -> std::io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\n', '\r']).to_string());
    }
}
