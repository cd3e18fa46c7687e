use std::fs;
use std::path::Path;
use std::process::Command;

use clap::Parser;
use miette::{bail, Diagnostic, IntoDiagnostic, Result};
use thiserror::Error;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cayenne::{compile_file, parse, CompiledModule};

mod cli;
use cli::{Args, Mode};

#[derive(Debug, Error, Diagnostic)]
#[error("found problems in module `{name}`")]
struct ModuleReport {
    name: String,

    #[related]
    errs: Vec<cayenne::Diagnostic>,

    #[source_code]
    code: String,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    if !args.input_file.is_file() {
        bail!("No proper input file: {:?}", args.input_file);
    }

    if args.mode == Mode::Parse {
        return inspect_ast(&args.input_file);
    }

    let compiled = compile_file(&args.input_file)?;

    let mut failed = false;
    for module in &compiled {
        if !module.diagnostics.is_empty() {
            let report = ModuleReport {
                name: module.name.clone(),
                errs: module.diagnostics.clone(),
                code: module.source.clone(),
            };
            eprintln!("{:?}", miette::Report::new(report));
        }
        failed |= module.has_errors();
    }

    // Warnings alone never fail the build
    if failed {
        bail!("compilation failed");
    }

    match args.mode {
        Mode::Parse => unreachable!(),
        Mode::Check => {
            info!("all checks passed");
            Ok(())
        }
        Mode::Compile => {
            let out_dir = match &args.output {
                Some(dir) => dir.clone(),
                None => args
                    .input_file
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .to_path_buf(),
            };
            fs::create_dir_all(&out_dir).into_diagnostic()?;
            write_outputs(&compiled, &out_dir)?;
            Ok(())
        }
        Mode::Run => {
            let dir = tempfile::tempdir().into_diagnostic()?;
            write_outputs(&compiled, dir.path())?;

            // The entry module is always last in compilation order
            let entry = compiled
                .last()
                .map(|module| dir.path().join(format!("{}.py", module.name)))
                .ok_or_else(|| miette::miette!("nothing to run"))?;

            let status = Command::new("python3")
                .arg(&entry)
                .status()
                .into_diagnostic()?;
            if !status.success() {
                bail!("program exited with {status}");
            }
            Ok(())
        }
    }
}

fn inspect_ast(input_file: &Path) -> Result<()> {
    let name = input_file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("main");

    let source = fs::read_to_string(input_file).into_diagnostic()?;
    let (module, diagnostics) = parse(name, &source);

    if diagnostics.is_empty() {
        info!("Parsing successful");
    } else {
        return Err(ModuleReport {
            name: name.to_string(),
            errs: diagnostics,
            code: source,
        }
        .into());
    }

    module.pretty_print().into_diagnostic()?;
    Ok(())
}

fn write_outputs(compiled: &[CompiledModule], out_dir: &Path) -> Result<()> {
    for module in compiled {
        if let Some(output) = &module.output {
            let path = out_dir.join(format!("{}.py", module.name));
            fs::write(&path, output).into_diagnostic()?;
            info!("wrote {:?}", path);
        }
    }
    Ok(())
}
