//! apigen command-line interface
//!
//! Generates managed wrappers, C-ABI shims, native class fragments and
//! trampolines from an API schema.

mod output;

use anyhow::{bail, Context};
use apigen::logging::{self, LogLevel};
use apigen::{init_project, Generator, GeneratorConfig, SlotKind, TypeSurface};
use clap::{Args, Parser, Subcommand};
use output::StyledOutput;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "apigen")]
#[command(about = "Native-interface code generator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log verbosity (error, warn, info, debug, trace); falls back to APIGEN_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Colorize output
    #[arg(long, global = true, value_parser = ["auto", "always", "never"])]
    color: Option<String>,
}

#[derive(Args)]
struct ConfigArgs {
    /// Generator configuration file
    #[arg(long, default_value = "apigen.toml")]
    config: PathBuf,

    /// Schema file, overriding the configured one
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate all artifacts
    Generate {
        #[command(flatten)]
        config: ConfigArgs,
        /// Managed output directory
        #[arg(long)]
        managed_dir: Option<PathBuf>,
        /// Native output directory
        #[arg(long)]
        native_dir: Option<PathBuf>,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Render everything in memory and run the parity checks
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the trampoline slot order of a type
    Slots {
        /// API type name
        type_name: String,
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the C-ABI export table of a type
    Exports {
        /// API type name
        type_name: String,
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Write a starter apigen.toml and api.toml
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let choice = output::resolve_color_choice(cli.color.as_deref());
    logging::init(LogLevel::resolve(cli.log_level.as_deref()), output::stderr_ansi(choice));
    let mut out = StyledOutput::new(choice);

    let result = match cli.command {
        Commands::Generate {
            config,
            managed_dir,
            native_dir,
            dry_run,
        } => generate(&mut out, &config, managed_dir, native_dir, dry_run),
        Commands::Check { config } => check(&mut out, &config),
        Commands::Slots { type_name, config } => slots(&mut out, &config, &type_name),
        Commands::Exports { type_name, config } => exports(&mut out, &config, &type_name),
        Commands::Init { path } => init(&mut out, &path),
    };

    if let Err(e) = result {
        out.stderr_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

/// Load the configuration; a missing default file means built-in defaults
fn load_config(args: &ConfigArgs) -> anyhow::Result<GeneratorConfig> {
    let mut config = if args.config.exists() {
        GeneratorConfig::from_file(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else if args.config == Path::new("apigen.toml") {
        GeneratorConfig::default()
    } else {
        bail!("config file not found: {}", args.config.display());
    };
    if let Some(schema) = &args.schema {
        config.schema = schema.clone();
    }
    config.validate()?;
    Ok(config)
}

fn load_generator(config: GeneratorConfig) -> anyhow::Result<Generator> {
    let schema = config.schema.clone();
    Generator::load(config).with_context(|| format!("loading schema {}", schema.display()))
}

fn generate(
    out: &mut StyledOutput,
    args: &ConfigArgs,
    managed_dir: Option<PathBuf>,
    native_dir: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(args)?;
    if let Some(dir) = managed_dir {
        config.managed.dir = dir;
    }
    if let Some(dir) = native_dir {
        config.native.dir = dir;
    }

    let report = load_generator(config)?.write(dry_run)?;
    for (path, status) in &report.files {
        out.file_status(path, *status);
    }
    out.generation_summary(&report);
    out.flush();
    Ok(())
}

fn check(out: &mut StyledOutput, args: &ConfigArgs) -> anyhow::Result<()> {
    let generator = load_generator(load_config(args)?)?;
    let files = generator.plan()?;
    out.success("OK: ");
    out.plain(&format!(
        "{} type(s), {} file(s), dialects agree",
        generator.schema().classes().count(),
        files.len()
    ));
    out.newline();
    out.flush();
    Ok(())
}

fn slots(out: &mut StyledOutput, args: &ConfigArgs, type_name: &str) -> anyhow::Result<()> {
    let generator = load_generator(load_config(args)?)?;
    let schema = generator.schema();
    let ty = schema
        .get(type_name)
        .with_context(|| format!("unknown type {}", type_name))?;

    match TypeSurface::new(schema, ty).slot_table()? {
        None => {
            out.warning(&format!("{} is not a managed-server type", type_name));
            out.newline();
        }
        Some(table) => {
            out.bold(&format!("{} ({} slots)", table.type_name(), table.len()));
            out.newline();
            for (index, slot) in table.iter() {
                let kind = match slot.kind() {
                    SlotKind::Getter => "getter",
                    SlotKind::Setter => "setter",
                    SlotKind::Method => "method",
                };
                out.info(&format!("{:>4}", index));
                out.plain(&format!(" {}", slot.name));
                out.dim(&format!(" {}{}", kind, if slot.is_static { ", static" } else { "" }));
                out.newline();
            }
        }
    }
    out.flush();
    Ok(())
}

fn exports(out: &mut StyledOutput, args: &ConfigArgs, type_name: &str) -> anyhow::Result<()> {
    let generator = load_generator(load_config(args)?)?;
    let schema = generator.schema();
    let ty = schema
        .get(type_name)
        .filter(|t| t.is_class())
        .with_context(|| format!("unknown class {}", type_name))?;

    let table = TypeSurface::new(schema, ty).export_table()?;
    out.bold(&format!("{} ({} exports)", table.type_name(), table.len()));
    out.newline();
    for export in table.iter() {
        out.plain(&format!("  {}", export.name));
        out.dim(&format!("/{}", export.arity));
        out.newline();
    }
    out.flush();
    Ok(())
}

fn init(out: &mut StyledOutput, path: &Path) -> anyhow::Result<()> {
    let written = init_project(path)?;
    for file in written {
        out.success("created ");
        out.plain(&file.display().to_string());
        out.newline();
    }
    out.flush();
    Ok(())
}
