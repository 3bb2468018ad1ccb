//! Command-line driver for ctx19-core.
//!
//! Usage:
//!   ctx19 --file `<rules.ctx19>` [--output `<rules.json>`] [--from ctx19|json|yaml]
//!         [--format json|yaml|ctx19] [-v]
//!
//! Without `--output` the result is written to stdout. Logs go to stderr;
//! `RUST_LOG` overrides the level picked by `-v`.
use clap::Parser;
use ctx19_core::{convert, Format};
use miette::{IntoDiagnostic, WrapErr};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ctx19", version, about = "Convert .ctx19 rule files to JSON")]
struct Cli {
    /// Rule file to convert, e.g. `rules.ctx19`
    #[arg(long, short = 'f')]
    file: PathBuf,

    /// Where to write the result. Created if missing, replaced otherwise.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Input format: ctx19, json or yaml
    #[arg(long, default_value_t = Format::Ctx19)]
    from: Format,

    /// Output format: json, yaml or ctx19
    #[arg(long, default_value_t = Format::Json)]
    format: Format,

    /// Log to stderr; repeat for more detail
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "ctx19=info,ctx19_core=info,warn",
        2 => "ctx19=debug,ctx19_core=debug,warn",
        _ => "trace",
    };

    // Library records arrive through the `log` facade and are bridged here.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let input = File::open(&cli.file)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot open {}", cli.file.display()))?;
    let input = BufReader::new(input);
    let name = cli.file.display().to_string();

    let count = match &cli.output {
        Some(path) => write_atomically(path, |out| {
            convert(input, out, &name, cli.from, cli.format)
        })?,
        None => {
            let stdout = io::stdout().lock();
            convert(input, BufWriter::new(stdout), &name, cli.from, cli.format)?
        }
    };

    info!(
        "converted {count} rule(s) from {name} ({}) to {}",
        cli.from, cli.format
    );
    Ok(())
}

/// Runs `write` against a temporary file next to `path` and moves it into
/// place only if `write` succeeds, so a failed conversion leaves no output.
fn write_atomically<T, E>(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<T, E>,
) -> miette::Result<T>
where
    E: Into<miette::Report>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot create a temporary file in {}", dir.display()))?;

    let value = {
        let mut out = BufWriter::new(&mut tmp);
        let value = match write(&mut out) {
            Ok(value) => value,
            Err(err) => return Err(err.into()),
        };
        out.flush().into_diagnostic()?;
        value
    };

    tmp.persist(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot write {}", path.display()))?;
    Ok(value)
}
