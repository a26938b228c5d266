//! Shell integration tests for the label firmware.
//!
//! Run after flashing the firmware. Talks to the operator shell on the
//! USB-Serial-JTAG console.

mod device;
mod tests;

use clap::Parser;
use colored::Colorize;

use device::{resolve_port, ShellClient};
use tests::{print_results, run_all_tests};

#[derive(Parser)]
#[command(name = "shell-tests")]
#[command(about = "Shell integration tests for the label firmware")]
struct Args {
    /// Serial port for the device (use "auto" to auto-detect)
    #[arg(short, long, default_value = "auto")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Resolve port (auto-detect if "auto")
    let port = resolve_port(&args.port)?;

    println!("{}", "Label Shell Integration Tests".bold());
    println!("Port: {}", port);
    println!("Baud: {}", args.baud);
    println!();

    println!("Connecting to device...");
    let mut device = ShellClient::new(&port, args.baud)?;

    // Let the device settle, then get a fresh prompt
    std::thread::sleep(std::time::Duration::from_secs(1));
    device.drain()?;
    device.run("")?;
    println!("{}", "Connected!".green());

    println!("\nRunning tests...\n");

    let results = run_all_tests(&mut device);
    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
