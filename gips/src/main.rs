use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{Level, LevelFilter, Metadata, Record};
use notify::{Event, RecursiveMode, Watcher};

use gips::backend::{DryImage, DryRun};
use gips::node::Node;
use gips::pipeline::Pipeline;
use gips::source::{self, NodeSource, ShaderEntry};
use gips::Report;

#[derive(Parser)]
#[command(name = "gips", version)]
#[command(about = "GIPS: GLSL image processing filters, offline tooling")]
struct Cli {
    /// More log output (repeat for debug and trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load filters and report passes, parameters and diagnostics
    Check {
        /// Shader files or preset names
        #[arg(required = true)]
        filters: Vec<String>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the generated fragment source of a filter
    Emit {
        /// Shader file or preset name
        filter: String,

        /// Only this pass (1-based)
        #[arg(long)]
        pass: Option<usize>,

        /// Print the shared vertex stage instead
        #[arg(long)]
        vertex: bool,

        /// Write output to file instead of stdout
        #[arg(short)]
        o: Option<PathBuf>,
    },

    /// List the built-in presets
    Presets,

    /// List shader files under a directory
    List {
        /// Directory to browse
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a filter chain and reload it whenever a shader file changes
    Watch {
        /// Shader files or preset names, in pipeline order
        #[arg(required = true)]
        filters: Vec<String>,

        /// Image size used for the dry render
        #[arg(long, default_value_t = 512)]
        width: u32,

        #[arg(long, default_value_t = 512)]
        height: u32,
    },
}

// ── Logging ────────────────────────────────────────────────────────────

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "error",
            Level::Warn => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("{level}: {}", record.args());
    }

    fn flush(&self) {}
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ── Commands ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Check { filters, json } => check(&filters, json),
        Commands::Emit {
            filter,
            pass,
            vertex,
            o,
        } => emit(&filter, pass, vertex, o.as_deref()).map(|()| true),
        Commands::Presets => {
            for name in source::PRESETS.iter().map(|(name, _)| name) {
                println!("{name}");
            }
            Ok(true)
        }
        Commands::List { dir, json } => list(&dir, json).map(|()| true),
        Commands::Watch {
            filters,
            width,
            height,
        } => watch(&filters, width, height).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

/// Returns `false` if any filter failed to load.
fn check(filters: &[String], json: bool) -> Result<bool> {
    let mut backend = DryRun::new();
    let mut reports = Vec::new();
    for name in filters {
        let mut node = Node::load(NodeSource::resolve(name), &mut backend);
        reports.push(Report::of(&node));
        node.release(&mut backend);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }
    Ok(reports.iter().all(|r| r.loaded))
}

fn print_report(report: &Report) {
    let status = if report.loaded { "ok" } else { "FAILED" };
    println!("{}: {status}, {} pass(es)", report.name, report.passes.len());
    for (i, pass) in report.passes.iter().enumerate() {
        println!(
            "  pass {}: {:?} -> {:?}, coords {:?}, filter {:?}",
            i + 1,
            pass.input,
            pass.output,
            pass.coord_mode,
            pass.filter
        );
    }
    for p in &report.params {
        let values: Vec<String> = p.values().iter().map(|&v| p.format_value(v)).collect();
        print!(
            "  {} ({:?}) = [{}] in [{}, {}]",
            p.name,
            p.ty,
            values.join(", "),
            p.format_value(p.min),
            p.format_value(p.max)
        );
        if p.description.is_empty() {
            println!();
        } else {
            println!("  {}", p.description);
        }
    }
    for line in &report.diagnostics {
        println!("  {line}");
    }
}

fn emit(filter: &str, pass: Option<usize>, vertex: bool, out: Option<&Path>) -> Result<()> {
    let text = if vertex {
        gips::codegen::VERTEX_SHADER.to_string()
    } else {
        let code = NodeSource::resolve(filter)
            .read()
            .with_context(|| format!("cannot load '{filter}'"))?;
        let sources = gips::generate(&code)?;
        match pass {
            Some(n) => match n.checked_sub(1).and_then(|i| sources.get(i)) {
                Some(src) => src.clone(),
                None => bail!("'{filter}' has {} pass(es), no pass {n}", sources.len()),
            },
            None => sources.join("\n"),
        }
    };

    match out {
        Some(path) => fs::write(path, &text)
            .with_context(|| format!("cannot write '{}'", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
        }
    }
    Ok(())
}

fn list(dir: &Path, json: bool) -> Result<()> {
    let entries = source::list_shaders(dir)
        .with_context(|| format!("cannot read '{}'", dir.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_entries(&entries, 0);
    }
    Ok(())
}

fn print_entries(entries: &[ShaderEntry], depth: usize) {
    for entry in entries {
        let indent = "  ".repeat(depth);
        if entry.is_dir {
            println!("{indent}{}/", entry.name);
            print_entries(&entry.children, depth + 1);
        } else {
            println!("{indent}{}  ({})", entry.name, entry.path.display());
        }
    }
}

fn watch(filters: &[String], width: u32, height: u32) -> Result<()> {
    let mut backend = DryRun::new();
    let mut pipeline: Pipeline<DryRun> = Pipeline::new();
    let input = DryImage::new(width, height);

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            if event.kind.is_modify() || event.kind.is_create() {
                let _ = tx.send(());
            }
        }
    })?;

    for name in filters {
        let source = NodeSource::resolve(name);
        if let NodeSource::File(path) = &source {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("cannot watch '{}'", dir.display()))?;
        }
        let node = Node::load(source, &mut backend);
        report_node(&node);
        pipeline.push(node);
    }

    eprintln!("GIPS watch");
    eprintln!("  nodes:      {}", pipeline.len());
    eprintln!("  image size: {width}x{height}");
    eprintln!("  watching for changes...");
    render(&mut pipeline, &mut backend, &input);

    loop {
        if rx.recv().is_err() {
            break;
        }
        // editors tend to write in bursts
        while rx.recv_timeout(Duration::from_millis(100)).is_ok() {}

        let before: Vec<bool> = pipeline.nodes().iter().map(|n| n.source_changed()).collect();
        let reloaded = pipeline.reload_changed(&mut backend);
        for (node, changed) in pipeline.nodes().iter().zip(before) {
            if changed {
                report_node(node);
            }
        }
        if reloaded > 0 {
            render(&mut pipeline, &mut backend, &input);
        }
    }

    pipeline.clear(&mut backend);
    drop(watcher);
    Ok(())
}

fn report_node<P>(node: &Node<P>) {
    let status = if node.is_loaded() { "ok" } else { "FAILED" };
    eprintln!("{}: {status}, {} pass(es)", node.name(), node.pass_count());
    let text = node.diagnostic_text();
    if !text.is_empty() {
        eprintln!("{text}");
    }
}

fn render(pipeline: &mut Pipeline<DryRun>, backend: &mut DryRun, input: &DryImage) {
    let (width, height) = (input.width, input.height);
    match pipeline.render(backend, input, width, height) {
        Ok(true) => {
            let shown = pipeline.shown(input);
            log::info!("rendered {} pass(es)", shown.history.len());
        }
        Ok(false) => {}
        Err(e) => log::error!("{e}"),
    }
}
