//! Shell client over the USB-Serial-JTAG console.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use serialport::SerialPort;

/// Prompt printed by the firmware after every command
pub const PROMPT: &str = "label:~$ ";

/// Find the shell port by scanning ttyACM devices and asking for `help`.
pub fn find_shell_port() -> Result<String> {
    let ports = serialport::available_ports()?;

    for port_info in ports {
        // USB-Serial-JTAG enumerates as a CDC-ACM device
        if !port_info.port_name.contains("ttyACM") {
            continue;
        }

        if let Ok(mut client) = ShellClient::new(&port_info.port_name, 115200) {
            client.set_timeout(Duration::from_millis(500));
            if let Ok(reply) = client.run("help") {
                if reply.contains("refresh <text>") {
                    return Ok(port_info.port_name);
                }
            }
        }
    }

    anyhow::bail!("No shell port found - ensure device is connected")
}

/// Resolve a port argument - returns the port path if not "auto", otherwise auto-detects.
pub fn resolve_port(port_arg: &str) -> Result<String> {
    if port_arg == "auto" {
        find_shell_port()
    } else {
        Ok(port_arg.to_string())
    }
}

/// Client for the firmware's operator shell.
pub struct ShellClient {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl ShellClient {
    /// Open the shell port.
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(Self {
            port,
            timeout: Duration::from_secs(2),
        })
    }

    /// Set the reply timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Discard anything the device printed so far.
    pub fn drain(&mut self) -> Result<()> {
        self.port.clear(serialport::ClearBuffer::All)?;
        let mut buf = [0u8; 256];
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Send one line and return the reply printed before the next prompt.
    ///
    /// The echoed input and surrounding line breaks are stripped.
    pub fn run(&mut self, line: &str) -> Result<String> {
        self.send_raw(line.as_bytes())?;
        self.send_raw(b"\r\n")?;
        let output = self.read_until_prompt()?;
        Ok(strip_echo(&output, line))
    }

    /// Write raw bytes to the console.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read until the prompt shows up again.
    fn read_until_prompt(&mut self) -> Result<String> {
        let mut data = Vec::new();
        let mut buf = [0u8; 64];
        let start = Instant::now();

        while start.elapsed() < self.timeout {
            match self.port.read(&mut buf) {
                Ok(n) => {
                    data.extend_from_slice(&buf[..n]);
                    if data.ends_with(PROMPT.as_bytes()) {
                        data.truncate(data.len() - PROMPT.len());
                        return Ok(String::from_utf8_lossy(&data).into_owned());
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        anyhow::bail!(
            "Timeout waiting for prompt, got {} bytes: {:?}",
            data.len(),
            String::from_utf8_lossy(&data)
        );
    }
}

fn strip_echo(output: &str, line: &str) -> String {
    let output = output.strip_prefix(line).unwrap_or(output);
    output.trim_matches(|c| c == '\r' || c == '\n').to_string()
}
