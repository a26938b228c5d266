//! Shell test cases.

use colored::Colorize;

use crate::device::ShellClient;

/// Test result.
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestResult {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: Some(message.to_string()),
        }
    }
}

/// Run a test function and print results as it happens.
fn run_test<F>(name: &str, device: &mut ShellClient, test_fn: F) -> TestResult
where
    F: FnOnce(&mut ShellClient) -> TestResult,
{
    print!("  {} ... ", name);
    std::io::Write::flush(&mut std::io::stdout()).ok();

    let mut result = test_fn(device);
    result.name = name.to_string();

    if result.passed {
        println!("{}", "PASS".green().bold());
    } else {
        println!("{}", "FAIL".red().bold());
        if let Some(msg) = &result.message {
            println!("    {}", msg.red());
        }
    }

    result
}

/// Run all tests and return results.
pub fn run_all_tests(device: &mut ShellClient) -> Vec<TestResult> {
    let mut results = Vec::new();

    results.push(run_test("refresh replies with the new text", device, test_refresh));
    results.push(run_test("refresh accepts quoted text", device, test_refresh_quoted));
    results.push(run_test("refresh takes one unquoted word", device, test_refresh_single_word));
    results.push(run_test("refresh without text prints usage", device, test_refresh_missing_argument));
    results.push(run_test("unknown command is reported", device, test_unknown_command));
    results.push(run_test("help lists refresh", device, test_help));
    results.push(run_test("blank line prints only the prompt", device, test_blank_line));
    results.push(run_test("overlong line is rejected", device, test_line_too_long));

    results
}

/// Print test results summary.
pub fn print_results(results: &[TestResult]) {
    println!("\n{}", "=".repeat(60));
    println!("{}", "Test Results".bold());
    println!("{}", "=".repeat(60));

    let mut passed = 0;
    let mut failed = 0;

    for result in results {
        if result.passed {
            println!("  {} {}", "[PASS]".green().bold(), result.name);
            passed += 1;
        } else {
            println!("  {} {}", "[FAIL]".red().bold(), result.name);
            if let Some(msg) = &result.message {
                println!("         {}", msg.red());
            }
            failed += 1;
        }
    }

    println!("{}", "-".repeat(60));
    println!(
        "  Total: {} passed, {} failed",
        passed.to_string().green(),
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        }
    );
    println!("{}", "=".repeat(60));
}

// --- Individual Tests ---

fn expect_reply(device: &mut ShellClient, line: &str, expected: &str) -> TestResult {
    match device.run(line) {
        Ok(reply) if reply == expected => TestResult::pass("test"),
        Ok(reply) => TestResult::fail("test", &format!("Expected {:?}, got {:?}", expected, reply)),
        Err(e) => TestResult::fail("test", &format!("Error: {}", e)),
    }
}

fn test_refresh(device: &mut ShellClient) -> TestResult {
    expect_reply(device, "refresh hello", "refresh screen: hello")
}

fn test_refresh_quoted(device: &mut ShellClient) -> TestResult {
    expect_reply(device, "refresh \"two words\"", "refresh screen: two words")
}

fn test_refresh_single_word(device: &mut ShellClient) -> TestResult {
    expect_reply(device, "refresh two words", "refresh screen: two")
}

fn test_refresh_missing_argument(device: &mut ShellClient) -> TestResult {
    match device.run("refresh") {
        Ok(reply) if reply.starts_with("refresh: wrong parameter count") => TestResult::pass("test"),
        Ok(reply) => TestResult::fail("test", &format!("Expected usage error, got {:?}", reply)),
        Err(e) => TestResult::fail("test", &format!("Error: {}", e)),
    }
}

fn test_unknown_command(device: &mut ShellClient) -> TestResult {
    expect_reply(device, "reboot", "reboot: command not found")
}

fn test_help(device: &mut ShellClient) -> TestResult {
    match device.run("help") {
        Ok(reply) if reply.contains("refresh <text>") => TestResult::pass("test"),
        Ok(reply) => TestResult::fail("test", &format!("Help text missing refresh: {:?}", reply)),
        Err(e) => TestResult::fail("test", &format!("Error: {}", e)),
    }
}

fn test_blank_line(device: &mut ShellClient) -> TestResult {
    expect_reply(device, "", "")
}

fn test_line_too_long(device: &mut ShellClient) -> TestResult {
    let line = format!("refresh {}", "x".repeat(300));
    expect_reply(device, &line, "line too long")
}
