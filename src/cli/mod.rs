//! CLI command handling
//!
//! Dispatches CLI commands to the scenario runner and session driver and
//! formats their output.

use std::path::PathBuf;

use colored::Colorize;

use crate::commands::{Commands, RecordFormat};
use crate::common::{paths, Config, Error, Result};
use crate::session::{run_script, SessionOptions};
use crate::testing::{
    self, Expectation, RunOptions, TargetConfig, TestResult, TestScenario, TestStep,
};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: &Config, verbose: bool) -> Result<()> {
    match command {
        Commands::Test {
            paths,
            program,
            strict,
            json,
        } => {
            let opts = RunOptions {
                verbose,
                strict,
                quiet: json,
                program,
            };
            run_tests(&paths, config, &opts).await
        }

        Commands::Record {
            program,
            args,
            mode,
            prompt,
            name,
            format,
            commands,
        } => {
            let mut options = SessionOptions::from_config(config);
            if let Some(program) = &program {
                options.program = paths::resolve_program(program, &std::env::current_dir()?);
            }
            if let Some(args) = &args {
                options.args = args.clone();
            }
            if let Some(prompt) = &prompt {
                options.prompt = prompt.clone();
            }
            let mode = mode.unwrap_or(config.session.mode);

            let outcome = run_script(&options, mode, &commands).await?;
            if let Some(e) = outcome.error {
                print_partial(&commands, &outcome.captured);
                return Err(e);
            }

            let scenario = TestScenario {
                name,
                description: None,
                setup: None,
                target: TargetConfig {
                    program,
                    args,
                    mode: (mode != config.session.mode).then_some(mode),
                    prompt,
                },
                steps: commands
                    .into_iter()
                    .zip(outcome.captured)
                    .map(|(command, captured)| TestStep {
                        command,
                        expect: expectation(captured),
                    })
                    .collect(),
            };

            match format {
                RecordFormat::Yaml => print!("{}", serde_yaml::to_string(&scenario)?),
                RecordFormat::Json => println!("{}", serde_json::to_string_pretty(&scenario)?),
            }

            Ok(())
        }
    }
}

/// Run every scenario and report the totals
async fn run_tests(paths: &[PathBuf], config: &Config, opts: &RunOptions) -> Result<()> {
    let mut results: Vec<TestResult> = Vec::with_capacity(paths.len());

    for path in paths {
        let result = match testing::run_scenario(path, config, opts).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(path = %path.display(), "Scenario could not run: {}", e);
                if !opts.quiet {
                    println!("{} {}: {}", "✗".red(), path.display(), e);
                }
                TestResult::aborted(&path.display().to_string(), path, 0, &e)
            }
        };
        results.push(result);
    }

    let total = results.len();
    let failed = results.iter().filter(|r| !r.passed).count();

    if opts.quiet {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if total > 1 {
        println!("{}", "Summary:".cyan());
        for result in &results {
            let mark = if result.passed {
                "✓".green()
            } else {
                "✗".red()
            };
            println!("  {} {}", mark, result.name);
        }
        println!(
            "\n{} passed, {} failed, {} total",
            (total - failed).to_string().green(),
            failed.to_string().red(),
            total
        );
    }

    if failed > 0 {
        Err(Error::ScenariosFailed { failed, total })
    } else {
        Ok(())
    }
}

/// Show what was captured before a recording failed
fn print_partial(commands: &[String], captured: &[String]) {
    if captured.is_empty() {
        return;
    }

    eprintln!("{}", "Captured before the failure:".yellow());
    for (command, output) in commands.iter().zip(captured) {
        eprintln!("  $ {}", command);
        for line in output.lines() {
            eprintln!("    {}", line);
        }
    }
}

/// Multi-line output is recorded as a list of lines
fn expectation(captured: String) -> Expectation {
    if captured.contains('\n') {
        Expectation::Lines(captured.split('\n').map(str::to_string).collect())
    } else {
        Expectation::Text(captured)
    }
}
