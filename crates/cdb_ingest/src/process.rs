use crate::error::{IngestError, Result};
use crate::tool::Invocation;
use log::debug;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::process::{Command, Stdio};

/// How an external tool finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ToolExit {
    pub const SUCCESS: ToolExit = ToolExit { code: Some(0) };

    #[inline]
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external tools, handing every output line to `on_line` as it arrives.
pub trait ToolRunner {
    fn run(&mut self, invocation: &Invocation, on_line: &mut dyn FnMut(&str)) -> Result<ToolExit>;
}

/// Runs tools as real child processes with stdout and stderr merged into a
/// single pipe, so lines arrive in the order the tool wrote them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation, on_line: &mut dyn FnMut(&str)) -> Result<ToolExit> {
        let launch_err = |source: io::Error| IngestError::Launch {
            command: invocation.to_string(),
            source,
        };

        let (reader, writer) = io::pipe().map_err(launch_err)?;
        let writer_err = writer.try_clone().map_err(launch_err)?;

        let mut child = {
            let mut command = Command::new(&invocation.program);
            command
                .args(&invocation.args)
                .envs(invocation.env.iter().map(|(k, v)| (k, v)))
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(writer_err);

            #[cfg(windows)]
            {
                use std::os::windows::process::CommandExt;
                const CREATE_NO_WINDOW: u32 = 0x0800_0000;
                command.creation_flags(CREATE_NO_WINDOW);
            }

            debug!("Spawning {invocation}");
            command.spawn().map_err(launch_err)?
            // `command` drops here, closing our copies of the write end so
            // the reader sees EOF once the child exits.
        };

        let read_result = forward_lines(reader, on_line);

        // The read end is closed by now, so a child still writing gets a
        // broken pipe instead of blocking `wait`.
        let status = child.wait().map_err(|source| IngestError::ToolIo {
            command: invocation.to_string(),
            source,
        })?;
        read_result.map_err(|source| IngestError::ToolIo {
            command: invocation.to_string(),
            source,
        })?;

        Ok(ToolExit {
            code: status.code(),
        })
    }
}

/// Hands every line of `reader` to `on_line`, stopping at the first read
/// error. Consumes the reader so it is closed on return.
fn forward_lines<R: Read>(reader: R, on_line: &mut dyn FnMut(&str)) -> io::Result<()> {
    for line in OutputLines::new(reader) {
        on_line(&line?);
    }
    Ok(())
}

/// Reports each command line instead of running it; every tool "succeeds".
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunner;

impl ToolRunner for DryRunner {
    fn run(&mut self, invocation: &Invocation, on_line: &mut dyn FnMut(&str)) -> Result<ToolExit> {
        on_line(&format!("[dry run] {invocation}"));
        Ok(ToolExit::SUCCESS)
    }
}

/// Lines of a tool's output stream. Accepts `\n`, `\r\n` and bare `\r`
/// terminators (the latter yields an extra empty line for `\r\n`). Lines
/// that are not valid UTF-8 are decoded as windows-1252, the code page the
/// Windows tools write. Stops at EOF or the first read error.
pub struct OutputLines<R> {
    reader: BufReader<R>,
    done: bool,
}

impl<R: Read> OutputLines<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            done: false,
        }
    }
}

impl<R: Read> Iterator for OutputLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut line = Vec::new();
        loop {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if available.is_empty() {
                self.done = true;
                return if line.is_empty() {
                    None
                } else {
                    Some(Ok(decode_line(line)))
                };
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    line.extend_from_slice(&available[..end]);
                    self.reader.consume(end + 1);
                    return Some(Ok(decode_line(line)));
                }
                None => {
                    let n = available.len();
                    line.extend_from_slice(available);
                    self.reader.consume(n);
                }
            }
        }
    }
}

fn decode_line(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
        text.into_owned()
    })
}
