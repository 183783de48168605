//! relgen: LLM-generated pull request descriptions, labels, reviews and
//! release notes.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use std::process;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;

use relgen::config::Config;
use relgen::env::Env;
use relgen::orchestrator::Relgen;
use relgen::output::json::JsonRenderer;
use relgen::output::terminal::TerminalRenderer;
use relgen::output::{Outcome, OutputRenderer};

use cli::args::{Cli, Command, IssueAction, PrAction, ReleaseAction};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{} {err:#}", "Error:".red().bold());
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    let env = Env::real();
    let cwd = std::env::current_dir().context("failed to read the working directory")?;
    let mut config = Config::load(Some(&cwd), cli.config.as_deref(), &env)
        .context("failed to load configuration")?;
    config.override_provider(cli.provider, cli.model.clone(), &env);

    let relgen = Relgen::from_config(&config).context("failed to set up relgen")?;
    let outcome = dispatch(&relgen, &config, cli.command).await?;

    let output = if cli.json {
        JsonRenderer.render(&outcome)
    } else {
        TerminalRenderer.render(&outcome)
    };
    print!("{output}");
    if cli.json {
        println!();
    }
    Ok(())
}

async fn dispatch(relgen: &Relgen, config: &Config, command: Command) -> Result<Outcome> {
    let outcome = match command {
        Command::Pr {
            action: PrAction::Describe(args),
        } => {
            let target = args.target().map_err(|e| anyhow!(e))?;
            let options = args.options(&config.pr.describe)?;
            Outcome::PrDescription(relgen.pr_describe(&target, &options).await?)
        }
        Command::Pr {
            action: PrAction::Label(args),
        } => {
            let target = args.target().map_err(|e| anyhow!(e))?;
            let options = args.options(&config.pr.label)?;
            Outcome::Labels(relgen.pr_label(&target, &options).await?)
        }
        Command::Pr {
            action: PrAction::Review(args),
        } => {
            let target = args.target().map_err(|e| anyhow!(e))?;
            let rules = args.rules(&config.pr.review)?;
            let options = args.options(&config.pr.review)?;
            Outcome::Review(relgen.pr_review(&target, &rules, &options).await?)
        }
        Command::Issue {
            action: IssueAction::Label(args),
        } => {
            let target = args.target().map_err(|e| anyhow!(e))?;
            let options = args.options(&config.issue.label)?;
            Outcome::Labels(relgen.issue_label(&target, &options).await?)
        }
        Command::Release {
            action: ReleaseAction::Describe(args),
        } => {
            let repo = args.repo().map_err(|e| anyhow!(e))?;
            let options = args.options(&config.release.describe)?;
            Outcome::ReleaseDescription(relgen.release_describe(&repo, &options).await?)
        }
        Command::Release {
            action: ReleaseAction::Ascribe(args),
        } => {
            let repo = args.repo().map_err(|e| anyhow!(e))?;
            let options = args.options(
                &config.release.ascribe,
                &config.pr.describe.excluded_file_patterns,
            );
            Outcome::Ascription(relgen.release_ascribe(&repo, &options).await?)
        }
    };
    Ok(outcome)
}
