use crate::config::Config;
use anyhow::{anyhow, Result};
use cascata_common::{Diagnostic, FileSystemLocator, Severity};
use cascata_evaluator::compile_with_locator;
use cascata_parser::serializer::Format;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Directory to compile (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: String,

    /// Emit compact output with no optional whitespace
    #[arg(short, long)]
    pub compact: bool,

    /// Output to stdout instead of files
    #[arg(long)]
    pub stdout: bool,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Keep compiling remaining files after a file fails
    #[arg(short, long)]
    pub keep_going: bool,

    /// Print diagnostics as JSON instead of human-readable text
    #[arg(long)]
    pub diagnostics_json: bool,
}

pub fn compile(args: CompileArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let src_dir = if args.path == "." {
        config.get_src_dir(cwd)
    } else {
        PathBuf::from(cwd).join(&args.path)
    };

    if !src_dir.exists() {
        return Err(anyhow!("Source directory does not exist: {:?}", src_dir));
    }

    let format = if args.compact || config.format == "compact" {
        Format::Compact
    } else {
        Format::Normal
    };

    println!("{}", "Compiling Cascata files...".bright_blue().bold());

    let source_files = find_source_files(&src_dir);
    if source_files.is_empty() {
        println!("{}", "No .xcss files found".yellow());
        return Ok(());
    }
    println!("Found {} files", source_files.len());

    let mut success_count = 0;
    let mut error_count = 0;

    for source_file in &source_files {
        let relative_path = source_file.strip_prefix(&src_dir).unwrap_or(source_file);
        match compile_file(source_file, &args, &config, &src_dir, cwd, format) {
            Ok(output_path) => {
                success_count += 1;
                println!(
                    "  {} {} → {}",
                    "✓".green(),
                    relative_path.display(),
                    output_path
                );
            }
            Err(error) => {
                error_count += 1;
                eprintln!(
                    "  {} {} - {}",
                    "✗".red(),
                    relative_path.display(),
                    error.to_string().red()
                );
                if !args.keep_going {
                    return Err(anyhow!("compilation aborted after first failure"));
                }
            }
        }
    }

    println!();
    if error_count == 0 {
        println!(
            "{} Compiled {} files successfully",
            "✓".green(),
            success_count
        );
        Ok(())
    } else {
        println!(
            "{} Compiled {} files, {} failed",
            "!".yellow(),
            success_count,
            error_count
        );
        Err(anyhow!("{} file(s) failed to compile", error_count))
    }
}

fn find_source_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("xcss"))
        .collect()
}

fn compile_file(
    file_path: &Path,
    args: &CompileArgs,
    config: &Config,
    src_dir: &Path,
    cwd: &str,
    format: Format,
) -> Result<String> {
    let source = fs::read_to_string(file_path)?;

    // includes resolve relative to the including file
    let base_dir = file_path.parent().unwrap_or(Path::new("."));
    let locator = FileSystemLocator::new(base_dir);

    let result = compile_with_locator(&source, format, Box::new(locator))
        .map_err(|e| anyhow!("{}", e))?;

    report_diagnostics(result.diagnostics.items(), file_path, args.diagnostics_json)?;

    // best-effort CSS is always written; semantic errors fail the file
    // afterwards so --keep-going still produces output
    let output_path = if args.stdout {
        println!("{}", result.css);
        "stdout".to_string()
    } else {
        let relative_path = file_path.strip_prefix(src_dir).unwrap_or(file_path);
        let out_dir = match &args.out_dir {
            Some(out) => PathBuf::from(cwd).join(out),
            None => config.get_out_dir(cwd),
        };
        let output_file = out_dir.join(relative_path).with_extension("css");

        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_file, result.css)?;
        output_file.display().to_string()
    };

    if result.diagnostics.error_count() > 0 {
        return Err(anyhow!(
            "{} semantic error(s)",
            result.diagnostics.error_count()
        ));
    }

    Ok(output_path)
}

fn report_diagnostics(diagnostics: &[Diagnostic], file_path: &Path, as_json: bool) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    if as_json {
        println!("{}", serde_json::to_string_pretty(diagnostics)?);
        return Ok(());
    }
    for diagnostic in diagnostics {
        let line = format!("{}: {}", file_path.display(), diagnostic);
        match diagnostic.severity {
            Severity::Error => eprintln!("  {}", line.red()),
            Severity::Warning => eprintln!("  {}", line.yellow()),
        }
    }
    Ok(())
}
