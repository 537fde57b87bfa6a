use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development tasks for vmacmem")]
struct Cli {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand)]
enum Task {
    /// fmt, clippy and the full test suite
    Check {
        /// Apply formatting and clippy fixes instead of failing
        #[arg(long)]
        fix: bool,
    },
    /// Run tests, optionally narrowed to one area
    Test {
        /// Translation table, caches, dispatch and layouts
        #[arg(long)]
        memory: bool,
        /// CPU adapter
        #[arg(long)]
        cpu: bool,
        /// Integration tests under tests/
        #[arg(long)]
        integration: bool,
        /// Doc tests
        #[arg(long)]
        doc: bool,
    },
    /// Run the access benchmarks
    Bench {
        /// Only this criterion group (cached, slow_path, lookup_depth)
        group: Option<String>,
    },
    /// Run the synthetic trace over one or more layouts and compare them
    Trace {
        /// Layout files; the built-in Mac Plus map when none are given
        layouts: Vec<PathBuf>,
        /// Trace iterations per layout
        #[arg(short = 'n', long, default_value = "100000")]
        accesses: u64,
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Task::Check { fix } => check(fix),
        Task::Test {
            memory,
            cpu,
            integration,
            doc,
        } => test(memory, cpu, integration, doc),
        Task::Bench { group } => cargo(&bench_args(group.as_deref())),
        Task::Trace {
            layouts,
            accesses,
            release,
        } => trace(&layouts, accesses, release),
    }
}

fn check(fix: bool) -> Result<()> {
    let start = Instant::now();

    let fmt: &[&str] = if fix {
        &["fmt", "--all"]
    } else {
        &["fmt", "--all", "--", "--check"]
    };
    let clippy: &[&str] = if fix {
        &["clippy", "--all-targets", "--fix", "--allow-dirty"]
    } else {
        &["clippy", "--all-targets", "--", "-D", "warnings"]
    };

    step("fmt", fmt)?;
    step("clippy", clippy)?;
    step("test", &["test", "--workspace"])?;

    println!(
        "{} all checks passed in {:.2}s",
        "✓".green().bold(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn test(memory: bool, cpu: bool, integration: bool, doc: bool) -> Result<()> {
    let mut runs: Vec<(&str, Vec<&str>)> = Vec::new();
    if memory {
        runs.push(("memory", vec!["test", "--lib", "core::memory"]));
    }
    if cpu {
        runs.push(("cpu", vec!["test", "--lib", "core::cpu"]));
    }
    if integration {
        runs.push(("integration", vec!["test", "--test", "integration_test"]));
    }
    if doc {
        runs.push(("doc", vec!["test", "--doc"]));
    }
    if runs.is_empty() {
        runs.push(("all", vec!["test"]));
    }

    let mut failed = Vec::new();
    for (name, args) in &runs {
        if step(name, args.as_slice()).is_err() {
            failed.push(*name);
        }
    }

    if !failed.is_empty() {
        bail!("failing test runs: {}", failed.join(", "));
    }
    Ok(())
}

fn bench_args(group: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = ["bench", "--bench", "access_bench"]
        .iter()
        .map(|a| a.to_string())
        .collect();
    if let Some(group) = group {
        args.push("--".to_string());
        args.push(group.to_string());
    }
    args
}

/// Counters pulled from the CLI's `--json` output
struct TraceSummary {
    lookups: u64,
    probes: u64,
    promotions: u64,
    failed: u64,
}

impl TraceSummary {
    fn parse(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("vmacmem did not print JSON stats")?;
        let field = |name: &str| value.get(name).and_then(|v| v.as_u64()).unwrap_or(0);
        Ok(Self {
            lookups: field("lookups"),
            probes: field("probes"),
            promotions: field("promotions"),
            failed: field("failed_accesses"),
        })
    }
}

fn trace(layouts: &[PathBuf], accesses: u64, release: bool) -> Result<()> {
    let targets: Vec<Option<&PathBuf>> = if layouts.is_empty() {
        vec![None]
    } else {
        layouts.iter().map(Some).collect()
    };

    for path in targets.iter().flatten() {
        if !path.exists() {
            bail!("layout not found: {}", path.display());
        }
    }

    let mut rows = Vec::new();
    for layout in targets {
        let label = layout.map_or_else(
            || "mac-plus (built-in)".to_string(),
            |p| p.display().to_string(),
        );
        println!("{} tracing {}", "→".blue(), label.cyan());

        let mut cmd = Command::new("cargo");
        cmd.args(["run", "--quiet", "--bin", "vmacmem"]);
        if release {
            cmd.arg("--release");
        }
        cmd.args(["--", "--json", "-n"]).arg(accesses.to_string());
        if let Some(path) = layout {
            cmd.arg("--layout").arg(path);
        }

        let start = Instant::now();
        let output = cmd.stderr(Stdio::inherit()).output()?;
        if !output.status.success() {
            bail!("trace over {} failed: {}", label, output.status);
        }
        let summary = TraceSummary::parse(&String::from_utf8_lossy(&output.stdout))?;
        rows.push((label, summary, start.elapsed().as_secs_f64()));
    }

    println!(
        "\n{:<32} {:>10} {:>10} {:>10} {:>8} {:>8}",
        "layout".bold(),
        "lookups",
        "probes",
        "promoted",
        "failed",
        "secs"
    );
    for (label, s, secs) in rows {
        println!(
            "{:<32} {:>10} {:>10} {:>10} {:>8} {:>8.2}",
            label, s.lookups, s.probes, s.promotions, s.failed, secs
        );
    }
    Ok(())
}

/// Run one named cargo step and report its outcome
fn step(name: &str, args: &[impl AsRef<str>]) -> Result<()> {
    print!("{} {:<12}", "→".blue(), name);
    let start = Instant::now();
    match cargo(args) {
        Ok(()) => {
            println!(
                "{} ({:.2}s)",
                "ok".green().bold(),
                start.elapsed().as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", "failed".red().bold());
            Err(e)
        }
    }
}

fn cargo(args: &[impl AsRef<str>]) -> Result<()> {
    let status = Command::new("cargo")
        .args(args.iter().map(|a| a.as_ref()))
        .status()?;
    if !status.success() {
        bail!("cargo exited with {}", status);
    }
    Ok(())
}
