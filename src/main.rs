//! checkstyle CLI - Command-line interface for Unity script style checks
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like config discovery, process exit codes and terminal output
//! - Exit codes: 0 clean, 1 violations reported, 2 fatal error

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use unity_style_guard::{
    AnalysisOptions, OutputFormat, ReportFormatter, ReportOptions, Severity, StyleConfig, StyleValidator,
};

/// Naming, brace-style and performance convention checker for Unity C# scripts
#[derive(Parser)]
#[command(name = "checkstyle")]
#[command(version)]
#[command(about = "Check Unity C# scripts against naming and convention rules")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Files or directories to check with plain output (defaults to `.`)
    paths: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CHECKSTYLE_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check files for style violations
    Check(CheckArgs),

    /// Validate a configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// Explain what a specific rule checks
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },

    /// List configured rules
    Rules {
        /// Show only enabled rules
        #[arg(long)]
        enabled_only: bool,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },

    /// Print the effective configuration
    PrintConfig {
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Clone, Default)]
struct CheckArgs {
    /// Paths to analyze (files or directories)
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    format: OutputFormatArg,

    /// Minimum severity level to report
    #[arg(short, long, value_enum)]
    severity: Option<SeverityArg>,

    /// Maximum number of violations to report
    #[arg(long)]
    max_violations: Option<usize>,

    /// Additional exclude patterns
    #[arg(long, action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Ignore .styleignore files
    #[arg(long)]
    no_ignore: bool,

    /// Disable parallel processing
    #[arg(long)]
    no_parallel: bool,

    /// Abort on the first unreadable file
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Copy, Clone, Default, ValueEnum, PartialEq)]
enum OutputFormatArg {
    #[default]
    Plain,
    Human,
    Json,
    Junit,
    Sarif,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Plain => OutputFormat::Plain,
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Junit => OutputFormat::Junit,
            OutputFormatArg::Sarif => OutputFormat::Sarif,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    match run_command(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    }
}

fn run_command(cli: Cli) -> Result<i32> {
    let use_colors = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            run_check(config, CheckArgs { paths: cli.paths, ..Default::default() }, use_colors)
        }
        Some(Commands::Check(args)) => {
            let config = load_config(cli.config.as_deref())?;
            run_check(config, args, use_colors)
        }
        Some(Commands::ValidateConfig { config_file }) => run_validate_config(config_file.or(cli.config)),
        Some(Commands::Explain { rule_id }) => {
            let config = load_config(cli.config.as_deref())?;
            Ok(run_explain(&config, &rule_id))
        }
        Some(Commands::Rules { enabled_only, category }) => {
            let config = load_config(cli.config.as_deref())?;
            Ok(run_list_rules(&config, enabled_only, category.as_deref()))
        }
        Some(Commands::PrintConfig { json }) => {
            let config = load_config(cli.config.as_deref())?;
            let rendered = if json { config.to_json()? } else { config.to_yaml()? };
            println!("{rendered}");
            Ok(0)
        }
    }
}

/// Explicit config file, else a discovered one in the working directory, else defaults
fn load_config(explicit: Option<&Path>) -> Result<StyleConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => StyleConfig::discover(Path::new(".")),
    };

    match path {
        Some(path) => {
            tracing::debug!("Loading configuration from {}", path.display());
            StyleConfig::load_from_file(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => {
            tracing::debug!("No configuration file found, using built-in rules");
            Ok(StyleConfig::default())
        }
    }
}

fn run_check(config: StyleConfig, args: CheckArgs, use_colors: bool) -> Result<i32> {
    let min_severity: Option<Severity> = args.severity.map(Into::into);

    let validator = StyleValidator::new_with_config(config)
        .context("Failed to load style rules")?
        .with_report_formatter(ReportFormatter::new(ReportOptions {
            use_colors,
            max_violations: args.max_violations,
            min_severity,
            ..Default::default()
        }));

    let paths = if args.paths.is_empty() { vec![PathBuf::from(".")] } else { args.paths };

    let options = AnalysisOptions {
        parallel: !args.no_parallel,
        fail_fast: args.fail_fast,
        exclude_patterns: args.exclude,
        ignore_ignore_files: args.no_ignore,
        ..Default::default()
    };

    let report = validator.validate_paths(&paths, &options)?;
    let formatted = validator.format_report(&report, args.format.into())?;
    print!("{formatted}");

    let reported = report.violations.iter().any(|v| min_severity.map_or(true, |min| v.severity >= min));
    Ok(if reported { 1 } else { 0 })
}

fn run_validate_config(config_path: Option<PathBuf>) -> Result<i32> {
    let config_path = config_path
        .or_else(|| StyleConfig::discover(Path::new(".")))
        .unwrap_or_else(|| PathBuf::from("checkstyle.yaml"));

    println!("Validating configuration: {}", config_path.display());

    match StyleConfig::load_from_file(&config_path) {
        Ok(config) => {
            let total_categories = config.rules.len();
            let enabled_categories = config.rules.values().filter(|c| c.enabled).count();
            let total_rules: usize = config.rules.values().map(|c| c.rules.len()).sum();
            let enabled_rules = config.enabled_rules().count();

            println!("Configuration is valid");
            println!("  Categories: {total_categories} total, {enabled_categories} enabled");
            println!("  Rules: {total_rules} total, {enabled_rules} enabled");
            println!("  Path patterns: {}", config.paths.patterns.len());
            println!("  Hot methods: {}", config.scanner.hot_methods.join(", "));
            Ok(0)
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {e}");
            Ok(1)
        }
    }
}

fn run_explain(config: &StyleConfig, rule_id: &str) -> i32 {
    let Some((category_name, category, rule)) = config.find_rule(rule_id) else {
        eprintln!("Rule '{rule_id}' not found");
        println!();
        println!("Available rules:");
        for (category_name, category) in &config.rules {
            println!("  {category_name}:");
            for rule in &category.rules {
                println!("    - {}", rule.id);
            }
        }
        return 1;
    };

    println!("Rule: {}", rule.id);
    println!("Category: {category_name}");
    println!("Severity: {}", config.effective_severity(category, rule));
    println!("Applies to: {}", rule.applies_to.as_str());
    if !rule.visibility.is_empty() {
        let visibility: Vec<_> = rule.visibility.iter().map(|v| format!("{v:?}").to_lowercase()).collect();
        println!("Visibility: {}", visibility.join(", "));
    }
    println!("Enabled: {}", rule.enabled && category.enabled);
    println!();
    println!("Pattern:");
    println!("   {}", rule.pattern);
    if let Some(expected) = &rule.expected {
        println!("Reported as: expected {expected}");
    }
    if !rule.message.is_empty() {
        println!();
        println!("Description:");
        println!("   {}", rule.message);
    }
    if let Some(exclude) = &rule.exclude_if {
        println!();
        println!("Exclusions:");
        if !exclude.names.is_empty() {
            println!("   Names: {}", exclude.names.join(", "));
        }
        if !exclude.file_patterns.is_empty() {
            println!("   File patterns: {}", exclude.file_patterns.join(", "));
        }
    }
    0
}

fn run_list_rules(config: &StyleConfig, enabled_only: bool, category_filter: Option<&str>) -> i32 {
    println!("Available Rules\n");

    let mut shown = 0;
    for (category_name, category) in &config.rules {
        if category_filter.is_some_and(|filter| filter != category_name.as_str()) {
            continue;
        }
        if enabled_only && !category.enabled {
            continue;
        }

        let status = if category.enabled { "+" } else { "-" };
        println!("{} {} ({})", status, category_name, category.severity.as_str());

        for rule in category.rules.iter().filter(|rule| rule.enabled || !enabled_only) {
            let rule_status = if rule.enabled { "+" } else { "-" };
            println!(
                "  {} {} [{}] {} -> {}",
                rule_status,
                rule.id,
                config.effective_severity(category, rule).as_str(),
                rule.applies_to.as_str(),
                rule.pattern
            );
            shown += 1;
        }
        println!();
    }

    if shown == 0 {
        if let Some(filter) = category_filter {
            eprintln!("No rules in category '{filter}'");
            return 1;
        }
    }
    0
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(root: &Path, source: &str) -> PathBuf {
        let file = root.join("Player.cs");
        fs::write(&file, source).unwrap();
        file
    }

    fn check(paths: Vec<PathBuf>) -> CheckArgs {
        CheckArgs { paths, no_parallel: true, ..Default::default() }
    }

    #[test]
    fn test_check_exit_codes() {
        let temp_dir = TempDir::new().unwrap();
        let dirty = write_project(temp_dir.path(), "class Player\n{\n    private int health;\n}\n");
        assert_eq!(run_check(StyleConfig::default(), check(vec![dirty]), false).unwrap(), 1);

        let clean = write_project(temp_dir.path(), "class Player\n{\n    private int _health;\n}\n");
        assert_eq!(run_check(StyleConfig::default(), check(vec![clean]), false).unwrap(), 0);
    }

    #[test]
    fn test_severity_filter_affects_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let file = write_project(temp_dir.path(), "class Player\n{\n    private int health;\n}\n");

        let args = CheckArgs { severity: Some(SeverityArg::Error), ..check(vec![file]) };
        assert_eq!(run_check(StyleConfig::default(), args, false).unwrap(), 0);
    }

    #[test]
    fn test_missing_path_with_fail_fast_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let args = CheckArgs { fail_fast: true, ..check(vec![temp_dir.path().join("Missing")]) };
        assert!(run_check(StyleConfig::default(), args, false).is_err());
    }

    #[test]
    fn test_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("custom.yaml");
        fs::write(&config_file, StyleConfig::default().to_yaml().unwrap()).unwrap();
        assert!(load_config(Some(&config_file)).is_ok());

        fs::write(&config_file, "version: \"9.9\"\nrules: {}\n").unwrap();
        assert!(load_config(Some(&config_file)).is_err());
    }

    #[test]
    fn test_validate_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("checkstyle.yaml");
        fs::write(&config_file, StyleConfig::default().to_yaml().unwrap()).unwrap();
        assert_eq!(run_validate_config(Some(config_file.clone())).unwrap(), 0);

        fs::write(&config_file, "version: \"1.0\"\nrules:\n  naming:\n    severity: loud\n    rules: []\n").unwrap();
        assert_eq!(run_validate_config(Some(config_file)).unwrap(), 1);
    }

    #[test]
    fn test_explain_rule() {
        let config = StyleConfig::default();
        assert_eq!(run_explain(&config, "private-field-naming"), 0);
        assert_eq!(run_explain(&config, "nonexistent-rule"), 1);
    }

    #[test]
    fn test_list_rules() {
        let config = StyleConfig::default();
        assert_eq!(run_list_rules(&config, false, None), 0);
        assert_eq!(run_list_rules(&config, true, Some("unity")), 0);
        assert_eq!(run_list_rules(&config, true, Some("missing")), 1);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["checkstyle", "Assets", "Packages"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.paths, vec![PathBuf::from("Assets"), PathBuf::from("Packages")]);

        let cli = Cli::try_parse_from(["checkstyle", "check", "--format", "json", "Assets"]).unwrap();
        match cli.command {
            Some(Commands::Check(args)) => {
                assert!(args.format == OutputFormatArg::Json);
                assert_eq!(args.paths, vec![PathBuf::from("Assets")]);
            }
            _ => panic!("expected check subcommand"),
        }
    }
}
