//! Clap argument types and their resolution against config.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;

use relgen::config::{
    AscribeConfig, ConfigError, DescribeConfig, LabelConfig, ReleaseDescribeConfig,
    ReviewConfig, TextSource,
};
use relgen::models::{
    DescribeTargets, ExcludeSpec, ExcludedContexts, IssueRef, Persona, ProviderName,
    ReleaseInclude, ReleaseWindow, RepoRef, WriteMode,
};
use relgen::orchestrator::{
    LabelOptions, PrDescribeOptions, PrReviewOptions, ReleaseAscribeOptions,
    ReleaseDescribeOptions,
};

/// Generate pull request descriptions, labels, reviews and release notes
/// with an LLM.
#[derive(Parser, Debug)]
#[command(name = "relgen", version)]
pub struct Cli {
    /// Config file (default: .relgen.toml in the working directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// LLM provider, overriding config and environment.
    #[arg(long, global = true)]
    pub provider: Option<ProviderName>,

    /// Model name, overriding config and environment.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Log debug output, including prompts, to stderr.
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Work with pull requests.
    Pr {
        #[command(subcommand)]
        action: PrAction,
    },

    /// Work with issues.
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },

    /// Work with releases.
    Release {
        #[command(subcommand)]
        action: ReleaseAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum PrAction {
    /// Generate a title and description.
    Describe(PrDescribeArgs),
    /// Suggest labels from the diff.
    Label(LabelArgs),
    /// Review the changes against a set of rules.
    Review(PrReviewArgs),
}

#[derive(clap::Subcommand, Debug)]
pub enum IssueAction {
    /// Suggest labels.
    Label(LabelArgs),
}

#[derive(clap::Subcommand, Debug)]
pub enum ReleaseAction {
    /// Write release notes for merged pull requests.
    Describe(ReleaseDescribeArgs),
    /// Attribute merged pull requests to their authors.
    Ascribe(ReleaseAscribeArgs),
}

/// Arguments for `pr describe`.
#[derive(Parser, Debug)]
pub struct PrDescribeArgs {
    /// Pull request URL, `owner/repo N`, or `owner repo N`.
    #[arg(required = true, num_args = 1..=3)]
    pub target: Vec<String>,

    /// Where to write the result: title, description, comment.
    #[arg(long, short = 'w')]
    pub write: Option<DescribeTargets>,

    /// Text appended below the generated description.
    #[arg(long)]
    pub footer: Option<String>,

    /// File with the description template.
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// File with extra instructions for the model.
    #[arg(long)]
    pub prompt: Option<PathBuf>,

    /// Contexts to leave out: ticket, file-content.
    #[arg(long)]
    pub excluded_contexts: Option<ExcludedContexts>,
}

impl PrDescribeArgs {
    pub fn target(&self) -> Result<IssueRef, String> {
        IssueRef::parse_args(&self.target)
    }

    /// Options with flags taking precedence over `config`.
    pub fn options(&self, config: &DescribeConfig) -> Result<PrDescribeOptions, ConfigError> {
        Ok(PrDescribeOptions {
            write: self.write.unwrap_or_default(),
            template: resolve_text(self.template.as_deref(), config.template.as_ref())?,
            prompt: resolve_text(self.prompt.as_deref(), config.prompt.as_ref())?,
            footer: self.footer.clone().or_else(|| config.footer.clone()),
            excluded_contexts: self.excluded_contexts.unwrap_or_default(),
            excluded_file_patterns: config.excluded_file_patterns.clone(),
        })
    }
}

/// Arguments for `pr label` and `issue label`.
#[derive(Parser, Debug)]
pub struct LabelArgs {
    /// Issue or pull request URL, `owner/repo N`, or `owner repo N`.
    #[arg(required = true, num_args = 1..=3)]
    pub target: Vec<String>,

    /// Write the labels: add to the existing ones, or set them.
    #[arg(long, short = 'w')]
    pub write: Option<WriteMode>,

    /// Labels to hide from the model: `existing`, or a comma-separated list.
    #[arg(long)]
    pub exclude: Option<ExcludeSpec>,

    /// File with extra instructions for the model.
    #[arg(long)]
    pub prompt: Option<PathBuf>,
}

impl LabelArgs {
    pub fn target(&self) -> Result<IssueRef, String> {
        IssueRef::parse_args(&self.target)
    }

    pub fn options(&self, config: &LabelConfig) -> Result<LabelOptions, ConfigError> {
        Ok(LabelOptions {
            write: self.write.unwrap_or_default(),
            exclude: self.exclude.clone().unwrap_or_default(),
            prompt: resolve_text(self.prompt.as_deref(), config.prompt.as_ref())?,
            excluded_file_patterns: config.excluded_file_patterns.clone(),
        })
    }
}

/// Arguments for `pr review`.
#[derive(Parser, Debug)]
pub struct PrReviewArgs {
    /// Pull request URL, `owner/repo N`, or `owner repo N`.
    #[arg(required = true, num_args = 1..=3)]
    pub target: Vec<String>,

    /// A review rule. Repeatable; replaces the configured rules.
    #[arg(long = "rule")]
    pub rules: Vec<String>,

    /// File holding a review rule. Repeatable; replaces the configured rules.
    #[arg(long = "rule-file")]
    pub rule_files: Vec<PathBuf>,

    /// Submit the review to the pull request.
    #[arg(long, short = 'w', default_value_t = false)]
    pub write: bool,

    /// Text appended to the review body.
    #[arg(long)]
    pub footer: Option<String>,

    /// File with extra instructions for the model.
    #[arg(long)]
    pub prompt: Option<PathBuf>,

    /// Contexts to leave out: ticket, file-content.
    #[arg(long)]
    pub excluded_contexts: Option<ExcludedContexts>,
}

impl PrReviewArgs {
    pub fn target(&self) -> Result<IssueRef, String> {
        IssueRef::parse_args(&self.target)
    }

    /// Rules from the flags, or from config when no rule flag is given.
    pub fn rules(&self, config: &ReviewConfig) -> Result<Vec<String>, ConfigError> {
        let sources: Vec<TextSource> = if self.rules.is_empty() && self.rule_files.is_empty() {
            config.rules.clone()
        } else {
            self.rules
                .iter()
                .cloned()
                .map(TextSource::Inline)
                .chain(
                    self.rule_files
                        .iter()
                        .map(|file| TextSource::File { file: file.clone() }),
                )
                .collect()
        };
        let mut rules = Vec::with_capacity(sources.len());
        for source in &sources {
            let rule = source.read()?;
            if !rule.is_empty() {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    pub fn options(&self, config: &ReviewConfig) -> Result<PrReviewOptions, ConfigError> {
        Ok(PrReviewOptions {
            write: self.write,
            prompt: resolve_text(self.prompt.as_deref(), config.prompt.as_ref())?,
            footer: self.footer.clone().or_else(|| config.footer.clone()),
            excluded_contexts: self.excluded_contexts.unwrap_or_default(),
            excluded_file_patterns: config.excluded_file_patterns.clone(),
        })
    }
}

/// Release window selection shared by the release commands.
#[derive(clap::Args, Debug)]
pub struct WindowArgs {
    /// Release tag the window starts after.
    #[arg(long)]
    pub from: Option<String>,

    /// Release tag the window ends at.
    #[arg(long)]
    pub to: Option<String>,

    /// Everything merged since the latest release (the default).
    #[arg(long, default_value_t = false, conflicts_with_all = ["from", "to"])]
    pub unreleased: bool,
}

impl WindowArgs {
    pub fn window(&self) -> ReleaseWindow {
        if self.unreleased || (self.from.is_none() && self.to.is_none()) {
            ReleaseWindow::Unreleased
        } else {
            ReleaseWindow::Tags {
                from: self.from.clone(),
                to: self.to.clone(),
            }
        }
    }
}

/// Arguments for `release describe`.
#[derive(Parser, Debug)]
pub struct ReleaseDescribeArgs {
    /// Repository URL, `owner/repo`, or `owner repo`.
    #[arg(required = true, num_args = 1..=2)]
    pub repo: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Audience of the release notes.
    #[arg(long, value_enum)]
    pub persona: Option<Persona>,

    /// File with the release notes template.
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// File with extra instructions for the model.
    #[arg(long)]
    pub prompt: Option<PathBuf>,

    /// Extra contexts per change: issues, tickets, labels, all.
    #[arg(long)]
    pub include: Option<ReleaseInclude>,
}

impl ReleaseDescribeArgs {
    pub fn repo(&self) -> Result<RepoRef, String> {
        RepoRef::parse_args(&self.repo)
    }

    pub fn options(
        &self,
        config: &ReleaseDescribeConfig,
    ) -> Result<ReleaseDescribeOptions, ConfigError> {
        Ok(ReleaseDescribeOptions {
            window: self.window.window(),
            persona: self.persona.or(config.persona).unwrap_or_default(),
            template: resolve_text(self.template.as_deref(), config.template.as_ref())?,
            prompt: resolve_text(self.prompt.as_deref(), config.prompt.as_ref())?,
            include: self.include.unwrap_or_default(),
        })
    }
}

/// Arguments for `release ascribe`.
#[derive(Parser, Debug)]
pub struct ReleaseAscribeArgs {
    /// Repository URL, `owner/repo`, or `owner repo`.
    #[arg(required = true, num_args = 1..=2)]
    pub repo: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Merged after this time (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_time, conflicts_with_all = ["from", "to", "unreleased"])]
    pub since: Option<DateTime<Utc>>,

    /// Merged before this time (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_time, conflicts_with_all = ["from", "to", "unreleased"])]
    pub until: Option<DateTime<Utc>>,

    /// Skip pull requests whose title matches this regex.
    #[arg(long)]
    pub excluded_pattern: Option<String>,

    /// Contexts to leave out when a description must be generated.
    #[arg(long)]
    pub excluded_contexts: Option<ExcludedContexts>,
}

impl ReleaseAscribeArgs {
    pub fn repo(&self) -> Result<RepoRef, String> {
        RepoRef::parse_args(&self.repo)
    }

    pub fn options(&self, config: &AscribeConfig, patterns: &[String]) -> ReleaseAscribeOptions {
        let window = if self.since.is_some() || self.until.is_some() {
            ReleaseWindow::Range {
                since: self.since,
                until: self.until,
            }
        } else {
            self.window.window()
        };
        ReleaseAscribeOptions {
            window,
            excluded_pattern: self
                .excluded_pattern
                .clone()
                .or_else(|| config.excluded_pattern.clone()),
            excluded_contexts: self.excluded_contexts.unwrap_or_default(),
            excluded_file_patterns: patterns.to_vec(),
        }
    }
}

/// Text from the flag's file if given, else from config.
fn resolve_text(
    flag: Option<&Path>,
    config: Option<&TextSource>,
) -> Result<Option<String>, ConfigError> {
    let source = flag
        .map(|file| TextSource::File {
            file: file.to_path_buf(),
        })
        .or_else(|| config.cloned());
    source
        .map(|source| source.read())
        .transpose()
        .map(|text| text.filter(|text| !text.is_empty()))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("relgen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn pr_describe_with_write_targets() {
        let cli = parse(&["pr", "describe", "acme/widget", "42", "-w", "title,comment"]);
        let Command::Pr {
            action: PrAction::Describe(args),
        } = cli.command
        else {
            panic!("expected pr describe");
        };
        assert_eq!(args.target().unwrap(), IssueRef::new("acme", "widget", 42));
        let options = args.options(&DescribeConfig::default()).unwrap();
        assert!(options.write.title && options.write.comment);
        assert!(!options.write.description);
    }

    #[test]
    fn label_write_modes() {
        let cli = parse(&["issue", "label", "acme", "widget", "7", "-w", "set", "--exclude", "existing"]);
        let Command::Issue {
            action: IssueAction::Label(args),
        } = cli.command
        else {
            panic!("expected issue label");
        };
        let options = args.options(&LabelConfig::default()).unwrap();
        assert_eq!(options.write, WriteMode::Replace);
        assert_eq!(options.exclude, ExcludeSpec::Existing);
    }

    #[test]
    fn label_defaults_to_no_write() {
        let cli = parse(&["pr", "label", "https://github.com/acme/widget/pull/3"]);
        let Command::Pr {
            action: PrAction::Label(args),
        } = cli.command
        else {
            panic!("expected pr label");
        };
        assert_eq!(args.target().unwrap().number, 3);
        assert_eq!(args.options(&LabelConfig::default()).unwrap().write, WriteMode::Skip);

        let config = LabelConfig {
            excluded_file_patterns: vec!["dist/**".into()],
            ..LabelConfig::default()
        };
        let options = args.options(&config).unwrap();
        assert_eq!(options.excluded_file_patterns, vec!["dist/**".to_string()]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["pr", "label", "acme/widget", "1", "--json", "-v", "--provider", "openai"]);
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.provider, Some(ProviderName::OpenAI));
    }

    #[test]
    fn review_rule_flags_replace_config_rules() {
        let dir = tempfile::tempdir().unwrap();
        let rule_file = dir.path().join("rule.md");
        std::fs::write(&rule_file, "  No unwrap in library code.\n").unwrap();

        let cli = parse(&[
            "pr",
            "review",
            "acme/widget",
            "9",
            "--rule",
            "Prefer iterators",
            "--rule-file",
            rule_file.to_str().unwrap(),
        ]);
        let Command::Pr {
            action: PrAction::Review(args),
        } = cli.command
        else {
            panic!("expected pr review");
        };
        let config = ReviewConfig {
            rules: vec![TextSource::Inline("from config".into())],
            ..Default::default()
        };
        assert_eq!(
            args.rules(&config).unwrap(),
            vec!["Prefer iterators", "No unwrap in library code."]
        );
    }

    #[test]
    fn review_falls_back_to_config_rules() {
        let cli = parse(&["pr", "review", "acme/widget", "9"]);
        let Command::Pr {
            action: PrAction::Review(args),
        } = cli.command
        else {
            panic!("expected pr review");
        };
        let config = ReviewConfig {
            rules: vec![TextSource::Inline("from config".into())],
            footer: Some("_bot_".into()),
            ..Default::default()
        };
        assert_eq!(args.rules(&config).unwrap(), vec!["from config"]);
        assert_eq!(args.options(&config).unwrap().footer.as_deref(), Some("_bot_"));
    }

    #[test]
    fn release_windows() {
        let cli = parse(&["release", "describe", "acme/widget", "--from", "v1.0.0"]);
        let Command::Release {
            action: ReleaseAction::Describe(args),
        } = cli.command
        else {
            panic!("expected release describe");
        };
        assert_eq!(
            args.window.window(),
            ReleaseWindow::Tags {
                from: Some("v1.0.0".into()),
                to: None
            }
        );

        let cli = parse(&["release", "ascribe", "acme", "widget", "--since", "2024-03-01"]);
        let Command::Release {
            action: ReleaseAction::Ascribe(args),
        } = cli.command
        else {
            panic!("expected release ascribe");
        };
        let options = args.options(&AscribeConfig::default(), &[]);
        let since = parse_time("2024-03-01T00:00:00Z").unwrap();
        assert_eq!(
            options.window,
            ReleaseWindow::Range {
                since: Some(since),
                until: None
            }
        );
    }

    #[test]
    fn unreleased_conflicts_with_tags() {
        let result = Cli::try_parse_from([
            "relgen",
            "release",
            "describe",
            "acme/widget",
            "--unreleased",
            "--to",
            "v2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn persona_falls_back_to_config() {
        let cli = parse(&["release", "describe", "acme/widget"]);
        let Command::Release {
            action: ReleaseAction::Describe(args),
        } = cli.command
        else {
            panic!("expected release describe");
        };
        let config = ReleaseDescribeConfig {
            persona: Some(Persona::Marketing),
            ..Default::default()
        };
        let options = args.options(&config).unwrap();
        assert_eq!(options.persona, Persona::Marketing);
        assert_eq!(options.window, ReleaseWindow::Unreleased);
    }

    #[test]
    fn parse_time_rejects_garbage() {
        assert!(parse_time("last tuesday").is_err());
    }
}
