// CLI commands for local grading and configuration
use anyhow::{bail, Context, Result};
use autograder_common::config::{GraderConfig, DEFAULT_CONFIG_PATH};
use autograder_common::types::{Evaluation, GradeStatus, ScoringProfile, Submission, TestCase};
use autograder_core::{ensure_toolchain, GradeRequest, ModelSet};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TestCaseFile {
    input: String,
    #[serde(alias = "expected")]
    expected_output: String,
}

/// Decode a source file, tolerating non-UTF-8 bytes
pub fn decode_source(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        // Latin-1: every byte maps to the code point of the same value
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cases: Vec<TestCaseFile> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test cases in {}", path.display()))?;
    Ok(cases
        .into_iter()
        .map(|tc| TestCase::new(tc.input, tc.expected_output))
        .collect())
}

/// Grade a local C file and print the result
pub async fn grade_file(
    file: &str,
    title: &str,
    tests: Option<&str>,
    profile: Option<&str>,
    json: bool,
) -> Result<()> {
    let path = Path::new(file);
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let source_code = decode_source(&bytes);

    let profile = match profile {
        Some(p) => Some(p.parse::<ScoringProfile>().map_err(anyhow::Error::msg)?),
        None => None,
    };
    let test_cases = match tests {
        Some(p) => load_test_cases(Path::new(p))?,
        None => Vec::new(),
    };

    let config = GraderConfig::load_or_default()?;
    ensure_toolchain(&config.compiler)
        .await
        .context("Compiler check failed")?;
    let models = ModelSet::from_config(&config.models).context("Failed to build model clients")?;

    let request = GradeRequest::new(Submission {
        title: title.to_string(),
        source_code,
    })
    .with_tests(test_cases)
    .with_profile(profile);

    if !json {
        println!("🚀 Grading {} ({})", path.display(), request.profile.unwrap_or(config.profile));
    }

    let evaluation = autograder_core::grade(&config, &models, &request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print_dashboard(&evaluation);
    }
    Ok(())
}

fn print_dashboard(evaluation: &Evaluation) {
    if evaluation.status == GradeStatus::CompileFailed {
        println!("\n❌ Compilation Failed\n");
        println!("🔴 Raw compiler output:");
        println!("{}", evaluation.compile.stderr.trim());
        if let Some(explanation) = &evaluation.compile_explanation {
            println!("\n🧠 Explanation & hints:");
            println!("{}", explanation);
        }
        println!("\n⚠️  Fix the errors and resubmit.");
        return;
    }

    println!("\n📊 Evaluation Dashboard\n");
    for component in &evaluation.breakdown {
        println!("  {:<18} {:>6.2} / {:.0}", component.name, component.score, component.max);
    }
    println!("{}", "─".repeat(36));
    if let Some(score) = evaluation.final_score {
        println!("  {:<18} {:>6.2} / 100", "TOTAL", score);
    }

    println!("\n📋 Report\n");
    println!("{}", evaluation.report.trim_end());

    if let Some(feedback) = &evaluation.feedback {
        println!("\n🧠 Feedback\n");
        println!("{}", feedback);
    }
}

pub fn format_rubric(config: &GraderConfig) -> String {
    let artifact = &config.weights.artifact;
    let reasoning = &config.weights.reasoning;
    let mut out = String::new();

    out.push_str(&format!("Active profile: {}\n\n", config.profile));
    out.push_str("artifact (points):\n");
    for (name, weight) in [
        ("Design", artifact.design),
        ("Tests", artifact.tests),
        ("Performance", artifact.performance),
        ("Optimization", artifact.optimization),
        ("Static Analysis", artifact.static_analysis),
    ] {
        out.push_str(&format!("  {:<18} {:>6.2}\n", name, weight));
    }
    out.push_str(&format!(
        "  static analysis penalty: {} per warning\n\n",
        config.static_penalty_per_warning
    ));

    out.push_str("reasoning (fraction of 100):\n");
    for (name, weight) in [
        ("Compilation", reasoning.compile),
        ("Structure", reasoning.structure),
        ("Logic", reasoning.logic),
        ("Tests", reasoning.tests),
    ] {
        out.push_str(&format!("  {:<18} {:>6.2}\n", name, weight));
    }
    out
}

pub fn show_rubric() -> Result<()> {
    let config = GraderConfig::load_or_default()?;
    println!("📐 Scoring rubric\n");
    print!("{}", format_rubric(&config));
    Ok(())
}

/// Write config/grader.json under `path` unless one already exists
pub fn init_project(path: &str) -> Result<()> {
    println!("🚀 Initializing autograder configuration at: {}", path);

    let project_path = Path::new(path);
    if !project_path.exists() {
        bail!("Project path does not exist: {}", project_path.display());
    }

    let config_path = project_path.join(DEFAULT_CONFIG_PATH);
    if config_path.exists() {
        println!("  ⚠️  Already exists: {}", DEFAULT_CONFIG_PATH);
    } else {
        GraderConfig::default().save(&config_path)?;
        println!("  ✅ Created: {}", DEFAULT_CONFIG_PATH);
    }

    println!("✅ Project initialized successfully!");
    println!("\n📋 Next steps:");
    println!("  1. Export GROQ_API_KEY and GEMINI_API_KEY to enable model features");
    println!("  2. Grade a file: autograder-cli grade --file main.c --title \"Sum of two numbers\"");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_source_utf8_and_latin1() {
        assert_eq!(decode_source("int main() {}".as_bytes()), "int main() {}");

        // 0xE9 alone is invalid UTF-8; latin-1 maps it to 'é'
        let bytes = b"// caf\xe9\nint main() {}";
        let decoded = decode_source(bytes);
        assert!(decoded.starts_with("// café"));
        assert!(decoded.contains("int main()"));
    }

    #[test]
    fn test_load_test_cases_accepts_both_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.json");
        fs::write(
            &path,
            r#"[{"input": "5\n", "expected": "120"}, {"input": "0\n", "expected_output": "1"}]"#,
        )
        .unwrap();

        let cases = load_test_cases(&path).unwrap();
        assert_eq!(cases, vec![TestCase::new("5\n", "120"), TestCase::new("0\n", "1")]);
    }

    #[test]
    fn test_init_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path().to_str().unwrap()).unwrap();

        let config_path = dir.path().join(DEFAULT_CONFIG_PATH);
        let loaded = GraderConfig::load(&config_path).unwrap();
        assert_eq!(loaded.weights.artifact.total(), 100.0);

        // second run leaves the file alone
        init_project(dir.path().to_str().unwrap()).unwrap();
    }

    #[test]
    fn test_rubric_lists_both_profiles() {
        let rubric = format_rubric(&GraderConfig::default());
        assert!(rubric.contains("Active profile: artifact"));
        assert!(rubric.contains("Static Analysis"));
        assert!(rubric.contains("Logic"));
        assert!(rubric.contains("1.5 per warning"));
    }
}
