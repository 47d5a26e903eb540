//! Rendering of the in-task command line.
//!
//! Every task runs the same bootstrap: check out the repository at the
//! event's revision, optionally install system packages, then hand over to
//! the in-tree runner with flags derived from the task's options.

use decision_core::catalog::{TaskDefinition, TaskOptions};
use decision_core::{Event, Result};

const SHELL: &str = "/bin/bash";
const RUNNER: &str = "./tools/ci/run_tc.py";
const CHECKOUT_DIR: &str = "web-platform-tests";

/// Runner flags for a task's options, in a fixed order.
pub fn option_flags(options: &TaskOptions) -> Vec<String> {
    let mut flags = Vec::new();
    if options.oom_killer {
        flags.push("--oom-killer".to_string());
    }
    if options.xvfb {
        flags.push("--xvfb".to_string());
    }
    flags.push(if options.hosts { "--hosts" } else { "--no-hosts" }.to_string());
    if let Some(checkout) = &options.checkout {
        flags.push(format!("--checkout={}", checkout));
    }
    for browser in &options.browser {
        flags.push(format!("--browser={}", browser));
    }
    if options.install_certificates {
        flags.push("--install-certificates".to_string());
    }
    flags
}

/// Package installation lines, each run through sudo. Empty when there is
/// nothing to install.
pub fn install_script(packages: &[String]) -> String {
    if packages.is_empty() {
        return String::new();
    }
    std::iter::once("apt update -qqy".to_string())
        .chain(packages.iter().map(|pkg| format!("apt install -qqy {}", pkg)))
        .map(|item| format!("sudo {};", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full argument list for a task's payload.
///
/// The result is a login shell invoked on a single script, and depends only
/// on its inputs.
pub fn build_full_command(event: &Event, task: &TaskDefinition) -> Result<Vec<String>> {
    let repo_url = event.repository_url()?;
    let fetch_rev = event.fetch_rev()?;

    let flags = option_flags(&task.options)
        .iter()
        .map(|flag| format!("  {}", flag))
        .collect::<Vec<_>>()
        .join("\n");

    let script = format!(
        "\n~/start.sh\n  {repo_url}\n  {fetch_rev};\n{install}\ncd {CHECKOUT_DIR};\n{RUNNER}\n{flags}\n  {command};\n",
        install = install_script(&task.install),
        command = task.command.join(" "),
    );

    Ok(vec![
        SHELL.to_string(),
        "--login".to_string(),
        "-c".to_string(),
        script,
    ])
}
