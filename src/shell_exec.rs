use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

/// Executes a hook command, prints its output line by line, and returns an
/// error if the command exits with a non-zero status code.
///
/// The command runs under `sh -c`, so quoting and pipes behave the way they
/// do in an interactive shell.
pub fn execute_and_stream_command(command: &str) -> Result<()> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn command: '{command}'"))?;

    let stdout = child
        .stdout
        .take()
        .context("child process did not have a stdout handle")?;

    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let line = line.context("error reading output from child process")?;
        println!("{line}");
    }

    let status = child.wait().context("failed to wait on child process")?;

    if status.success() {
        Ok(())
    } else {
        let code = status.code().unwrap_or(-1);
        Err(anyhow!("command '{command}' failed with exit code: {code}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_command_is_ok() {
        assert!(execute_and_stream_command("echo hook ran").is_ok());
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let err = execute_and_stream_command("exit 7").unwrap_err();
        assert!(err.to_string().contains("exit code: 7"));
    }
}
