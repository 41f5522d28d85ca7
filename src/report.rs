use colored::*;

use crate::extract::ExtractError;
use crate::fetch::FetchError;
use crate::patterns::Finding;

/// One report per URL: all findings bundled, each rendered with the script
/// body that triggered it.
pub fn findings(url: &str, findings: &[Finding]) -> String {
    let rendered: Vec<String> = findings
        .iter()
        .map(|f| format!("Pattern '{}' found in script:\n{}", f.label, f.script))
        .collect();

    format!(
        "{} {}:\n{}",
        "Possible DOM XSS vulnerabilities detected in".red().bold(),
        url,
        rendered.join("\n")
    )
}

pub fn clean(url: &str) -> String {
    format!(
        "{} {}.",
        "No potential DOM XSS vulnerabilities detected in".green(),
        url
    )
}

pub fn fetch_error(url: &str, err: &FetchError) -> String {
    format!("{} {}: {}", "Error fetching URL".yellow(), url, err)
}

pub fn extract_error(url: &str, err: &ExtractError) -> String {
    format!(
        "{} {}: {}",
        "Error extracting scripts from URL".yellow(),
        url,
        err
    )
}
