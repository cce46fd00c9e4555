/**************************************************************************/
/*  This file is part of POPCON.                                          */
/*                                                                        */
/*  Copyright (C) 2025                                                    */
/*    CEA (Commissariat à l'énergie atomique et aux énergies              */
/*         alternatives)                                                  */
/*                                                                        */
/*  you can redistribute it and/or modify it under the terms of the GNU   */
/*  Lesser General Public License as published by the Free Software       */
/*  Foundation, version 2.1.                                              */
/*                                                                        */
/*  It is distributed in the hope that it will be useful,                 */
/*  but WITHOUT ANY WARRANTY; without even the implied warranty of        */
/*  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the         */
/*  GNU Lesser General Public License for more details.                   */
/*                                                                        */
/*  See the GNU Lesser General Public License version 2.1                 */
/*  for more details (enclosed in the file licenses/LGPLv2.1).            */
/*                                                                        */
/**************************************************************************/

#![warn(missing_docs)]

//! Variable dependencies of CNF formulas as group minimal unsatisfiable subsets

pub mod cnf;
pub mod encoder;
pub mod gcnf;
pub mod gmus;
pub mod input;
pub mod support;
pub mod tokenizer;

use anyhow::Context;
use std::cell::RefCell;
use std::fs::File;
use std::io::BufWriter;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

pub use encoder::{convert, ConversionSummary, Encoder, Header};
pub use tokenizer::ParseError;

/// Exit code when the input is malformed
pub const EXIT_PARSE_ERROR: i32 = 3;
/// Exit code for other failures
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug)]
/// Writes the result in json to a file.
pub struct ResultWriter {
    file: RefCell<File>,
    path: PathBuf,
}

impl ResultWriter {
    fn write<R: serde::Serialize>(&self, result: &R) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(self.file.borrow_mut().deref_mut(), result)
            .with_context(|| format!("writing result to {}", self.path.display()))
    }
}

impl From<&std::ffi::OsStr> for ResultWriter {
    fn from(path: &std::ffi::OsStr) -> ResultWriter {
        let path: PathBuf = path.into();
        let file = match File::create(&path) {
            Ok(f) => RefCell::new(f),
            Err(e) => {
                tracing::error!(
                    "failed to open {} to write results (--json option): {}",
                    path.display(),
                    e
                );
                std::process::exit(EXIT_FAILURE);
            }
        };
        ResultWriter { path, file }
    }
}

/// Configuration options
#[derive(Debug, StructOpt)]
#[structopt(
    name = "dep2gcnf",
    about = "Translates the search of a minimal independent support of a CNF formula to group MUS extraction"
)]
pub struct Opt {
    /// Input file in DIMACS CNF format, possibly gzip compressed
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Output file, in GCNF format
    #[structopt(parse(from_os_str))]
    output: PathBuf,

    /// Exactly `True` to only create groups for the variables declared in `c ind` lines of
    /// the input. Any other value means false.
    ///
    /// If no such line is present, all variables get a group.
    use_ind: Option<String>,

    /// Accepted for compatibility with existing scripts, and ignored.
    #[structopt(hidden = true)]
    first_vars: Option<String>,

    /// JSON summary of the conversion to the specified file
    #[structopt(short, long, parse(from_os_str))]
    json: Option<ResultWriter>,

    /// Enable debug output.
    #[structopt(short, long)]
    debug: bool,
}

impl Opt {
    fn use_ind(&self) -> bool {
        self.use_ind.as_deref() == Some("True")
    }
}

fn setup_tracing(opt: &Opt) -> anyhow::Result<()> {
    use tracing::Level;
    use tracing_subscriber::prelude::*;
    let min_level = if opt.debug { Level::TRACE } else { Level::INFO };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::filter::filter_fn(move |metadata| {
            *metadata.level() <= min_level
        }));
    let subscriber = tracing_subscriber::Registry::default().with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default tracing collector")?;
    Ok(())
}

/// Converts the CNF file `input` to the GCNF file `output`.
///
/// The output is first written to a temporary file in the same directory, which is renamed to
/// `output` only when conversion succeeds. On error, `output` is left untouched.
pub fn convert_file(
    input: &Path,
    output: &Path,
    use_ind: bool,
) -> anyhow::Result<ConversionSummary> {
    let mut source = input::open_input(input)?;
    let dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut builder = tempfile::Builder::new();
    builder.prefix(".dep2gcnf").suffix(".gcnf");
    // same mode as a file created by File::create, once the umask is applied
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let staging = builder
        .tempfile_in(dir)
        .with_context(|| format!("creating output file next to {}", output.display()))?;
    let summary = convert(&mut source, BufWriter::new(staging.as_file()), use_ind)
        .with_context(|| format!("converting {} to GCNF", input.display()))?;
    staging
        .persist(output)
        .with_context(|| format!("writing output file {}", output.display()))?;
    tracing::debug!(output = %output.display(), "GCNF written");
    Ok(summary)
}

/// The exit code for the error `e`
pub fn exit_code(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<ParseError>().is_some() {
        EXIT_PARSE_ERROR
    } else {
        EXIT_FAILURE
    }
}

/// entrypoint of the binary
pub fn run() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    setup_tracing(&opt)?;
    if let Some(n) = &opt.first_vars {
        tracing::warn!(n = %n, "the fourth argument is not supported and is ignored");
    }
    let summary = convert_file(&opt.input, &opt.output, opt.use_ind())?;
    if let Some(writer) = &opt.json {
        writer.write(&summary)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn converts_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in.cnf");
        let output = dir.path().join("out.gcnf");
        std::fs::write(&input, "p cnf 2 1\nc ind 2 0\n1 -2 0\n")?;
        let summary = convert_file(&input, &output, true)?;
        assert_eq!(summary.groups_written, 1);
        let written = std::fs::read(&output)?;
        let g = gcnf::parse_gcnf(&written)?;
        assert_eq!(g.groups(), vec![2]);
        // no temporary file left behind
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 2);
        Ok(())
    }

    #[test]
    fn converts_gzip_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let plain = dir.path().join("in.cnf");
        let compressed = dir.path().join("in.cnf.gz");
        let data = b"p cnf 3 2\n1 2 0\n-3 0\n";
        std::fs::write(&plain, data)?;
        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&compressed)?,
            flate2::Compression::default(),
        );
        encoder.write_all(data)?;
        encoder.finish()?;
        convert_file(&plain, &dir.path().join("plain.gcnf"), false)?;
        convert_file(&compressed, &dir.path().join("gz.gcnf"), false)?;
        assert_eq!(
            std::fs::read(dir.path().join("plain.gcnf"))?,
            std::fs::read(dir.path().join("gz.gcnf"))?
        );
        Ok(())
    }

    #[test]
    fn parse_error_leaves_no_output() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in.cnf");
        let output = dir.path().join("out.gcnf");
        std::fs::write(&input, "p cnf 2 2\n1 0\nc ind -3 0\n")?;
        let e = convert_file(&input, &output, false).unwrap_err();
        assert_eq!(exit_code(&e), EXIT_PARSE_ERROR);
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn failed_conversion_keeps_previous_output() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in.cnf");
        let output = dir.path().join("out.gcnf");
        std::fs::write(&input, "p cnf 1 1\n- 1 0\n")?;
        std::fs::write(&output, "previous")?;
        convert_file(&input, &output, false).unwrap_err();
        assert_eq!(std::fs::read_to_string(&output)?, "previous");
        Ok(())
    }

    #[test]
    fn missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let e = convert_file(
            &dir.path().join("missing.cnf"),
            &dir.path().join("out.gcnf"),
            false,
        )
        .unwrap_err();
        assert_eq!(exit_code(&e), EXIT_FAILURE);
    }

    #[cfg(unix)]
    #[test]
    fn output_mode_follows_umask() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in.cnf");
        let output = dir.path().join("out.gcnf");
        let reference = dir.path().join("reference");
        std::fs::write(&input, "p cnf 1 1\n1 0\n")?;
        File::create(&reference)?;
        convert_file(&input, &output, false)?;
        let mode = |p: &Path| -> std::io::Result<u32> {
            Ok(std::fs::metadata(p)?.permissions().mode() & 0o777)
        };
        assert_eq!(mode(&output)?, mode(&reference)?);
        Ok(())
    }

    #[test]
    fn fourth_argument_is_ignored() {
        let opt = Opt::from_iter(&["dep2gcnf", "in.cnf", "out.gcnf", "true", "400"]);
        assert!(!opt.use_ind());
        assert_eq!(opt.first_vars.as_deref(), Some("400"));
        let opt = Opt::from_iter(&["dep2gcnf", "in.cnf", "out.gcnf", "True", "400"]);
        assert!(opt.use_ind());
        assert!(Opt::from_iter_safe(&["dep2gcnf", "a", "b", "True", "4", "extra"]).is_err());
    }

    #[test]
    fn use_ind_is_case_sensitive() {
        let parse = |args: &[&str]| Opt::from_iter(args.iter().copied()).use_ind();
        assert!(parse(&["dep2gcnf", "in.cnf", "out.gcnf", "True"]));
        assert!(!parse(&["dep2gcnf", "in.cnf", "out.gcnf", "true"]));
        assert!(!parse(&["dep2gcnf", "in.cnf", "out.gcnf", "yes"]));
        assert!(!parse(&["dep2gcnf", "in.cnf", "out.gcnf"]));
    }
}
