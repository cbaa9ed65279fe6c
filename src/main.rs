use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

use stateline::cli::{Cli, Command};
use stateline::context::AnalysisContext;
use stateline::kernel::KernelAnalysis;
use stateline::trace::TraceReader;
use stateline::EventSource;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Analyze {
            trace,
            state_at,
            opts,
        } => {
            let ctx = AnalysisContext::from(opts);
            let analysis = run_build(&ctx, trace)?;
            report_analysis(&analysis, state_at)
        }
        Command::Dump { trace, paths, opts } => {
            let ctx = AnalysisContext::from(opts);
            let analysis = run_build(&ctx, trace)?;
            report_intervals(&analysis, paths)
        }
    }
}

/// Pumps the whole trace through the kernel analysis. On SIGINT/SIGTERM the
/// build stops at the next event and the history is sealed at the last
/// timestamp seen, so the partial result is still queryable.
fn run_build(ctx: &AnalysisContext, trace: &Path) -> Result<KernelAnalysis> {
    flag::register(SIGINT, Arc::clone(&ctx.cancel))?;
    flag::register(SIGTERM, Arc::clone(&ctx.cancel))?;

    let analysis = KernelAnalysis::new(ctx.state_system(), ctx.event_layout()?, ctx.verbose);
    let mut reader = TraceReader::new(trace, Arc::clone(&ctx.cancel));
    let analysis = reader.process_events(analysis)?;

    if ctx.cancel.load(Ordering::Relaxed) {
        eprintln!("Interrupted, reporting the partial history");
    }
    Ok(analysis)
}

fn report_analysis(analysis: &KernelAnalysis, state_at: &[u64]) -> Result<()> {
    let ss = analysis.state_system();
    let stats = analysis.stats();

    println!("Attributes: {}", ss.attribute_count());
    println!("Time range: [{}, {}]", ss.start_time(), ss.current_end_time());
    println!(
        "Events: {} processed, {} skipped, {} errors",
        stats.processed, stats.skipped, stats.errors
    );

    for &t in state_at {
        let mut snapshot = serde_json::Map::new();
        for interval in ss.query_full_state(t)? {
            snapshot.insert(
                ss.full_attribute_path(interval.quark),
                serde_json::to_value(&interval.value)?,
            );
        }
        println!("State at {}:", t);
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

fn report_intervals(analysis: &KernelAnalysis, paths: &[String]) -> Result<()> {
    let ss = analysis.state_system();

    // Iterating over quark handles rather than the tree also reaches
    // attributes removed mid-trace (dead threads), which still have history.
    for quark in 0..ss.attribute_count() {
        let path = ss.full_attribute_path(quark);
        if !paths.is_empty() && !paths.iter().any(|p| path.starts_with(p.as_str())) {
            continue;
        }
        for interval in ss.intervals_of(quark) {
            let record = serde_json::json!({
                "path": path,
                "start": interval.start,
                "end": interval.end,
                "value": interval.value,
            });
            println!("{}", record);
        }
    }
    Ok(())
}
