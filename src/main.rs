use clap::Parser;
use import_rewrite::{
    EngineOptions, FileKey, ImportRewriter, Orchestrator, Project, RunReport, generate_run_id,
    write_file,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Expand `export *` re-exports and namespace imports in a TypeScript project
#[derive(Parser, Debug)]
#[command(name = "import-rewrite")]
#[command(version)]
#[command(about = "Rewrite wildcard re-exports and namespace imports into named ones", long_about = None)]
struct Args {
    /// Project directory, tsconfig.json, or any file inside the project
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Only rewrite files whose path contains this substring
    #[arg(long)]
    only: Option<String>,

    /// Passes allowed before giving up on conflicting edits
    #[arg(long)]
    max_passes: Option<usize>,

    /// Analyze files one at a time instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Compute the rewrite without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Output structured JSON instead of human-readable
    #[arg(short, long)]
    json: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("import_rewrite=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args, run_id: String) -> import_rewrite::Result<RunReport> {
    let project = Project::load(&args.project)?;

    let mut options = EngineOptions::default();
    if let Some(max_passes) = args.max_passes {
        options.max_passes = max_passes;
    }
    options.parallel = !args.sequential;

    let mut orchestrator = Orchestrator::new(project.program_builder(), ImportRewriter::default(), options);
    if let Some(only) = args.only.clone() {
        orchestrator = orchestrator.with_filter(move |file| file.as_str().contains(&only));
    }

    let outcome = orchestrator.run(project.sources.clone())?;
    let report = RunReport::success(run_id, &project.sources, &outcome);

    if !args.dry_run {
        for file in report.files.iter().filter(|file| file.changed) {
            if let Some(text) = outcome.sources.get(&FileKey::from(file.path.as_str())) {
                write_file(text)?;
            }
        }
    }
    Ok(report)
}

fn main() {
    init_tracing();
    let args = Args::parse();
    let run_id = generate_run_id();

    let report = match run(&args, run_id.clone()) {
        Ok(report) => report,
        Err(e) => RunReport::failure(run_id, e.to_string()),
    };

    output_report(&report, args.json, args.output.as_ref());

    if !report.success {
        std::process::exit(1);
    }
}

/// Format and output the report
fn output_report(report: &RunReport, json_mode: bool, output_path: Option<&PathBuf>) {
    let output = if json_mode {
        serde_json::to_string_pretty(report)
            .unwrap_or_else(|_| r#"{"error": "Failed to serialize report"}"#.to_string())
    } else {
        report.to_text()
    };

    if let Some(path) = output_path {
        if let Err(e) = fs::write(path, &output) {
            eprintln!("Failed to write output to '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    } else {
        println!("{}", output);
    }
}
