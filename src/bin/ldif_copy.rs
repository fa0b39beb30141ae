//! Copy LDIF from input to output, re-folding lines and inlining URL-referenced values.
//!
//! Usage:
//!   ldif_copy [OPTIONS] [INPUT.ldif [OUTPUT.ldif]]
//!   ldif_copy [OPTIONS] < in.ldif > out.ldif
//!
//! Options:
//!   --ignore TYPE       Drop attributes of this type (repeatable, case-insensitive)
//!   --url-scheme NAME   Fetch `:<` values with this URL scheme (repeatable; only file is served)
//!   --strict-urls       Fail on `:<` values that are not fetched instead of dropping them
//!   --max N             Copy at most N records
//!   --base64 TYPE       Always base64-encode this attribute type (repeatable)
//!   --cols N            Fold output lines at N columns (default 76)
//!   --crlf              Write CRLF line separators
//!
//! Log output goes to stderr and is controlled with RUST_LOG (e.g. RUST_LOG=ldifcodec=debug).

use anyhow::Context;
use ldifcodec::{copy, ParserConfig, WriterConfig};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};

fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    if let Some(pos) = args.iter().position(|a| names.contains(&a.as_str())) {
        args.remove(pos);
        true
    } else {
        false
    }
}

/// Remove every `name VALUE` pair from `args` and return the values.
fn take_values(args: &mut Vec<String>, name: &str) -> anyhow::Result<Vec<String>> {
    let mut values = Vec::new();
    while let Some(pos) = args.iter().position(|a| a == name) {
        args.remove(pos);
        if pos >= args.len() {
            anyhow::bail!("{} needs a value", name);
        }
        values.push(args.remove(pos));
    }
    Ok(values)
}

fn take_number(args: &mut Vec<String>, name: &str) -> anyhow::Result<Option<usize>> {
    match take_values(args, name)?.pop() {
        Some(v) => Ok(Some(
            v.parse()
                .with_context(|| format!("{} expects a number, got {:?}", name, v))?,
        )),
        None => Ok(None),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let strict_urls = take_flag(&mut args, &["--strict-urls"]);
    let crlf = take_flag(&mut args, &["--crlf"]);
    let ignored = take_values(&mut args, "--ignore")?;
    let schemes = take_values(&mut args, "--url-scheme")?;
    let base64_attrs = take_values(&mut args, "--base64")?;
    let max = take_number(&mut args, "--max")?;
    let cols = take_number(&mut args, "--cols")?;
    if let Some(unknown) = args.iter().find(|a| a.starts_with("--")) {
        anyhow::bail!("unknown option {}", unknown);
    }
    let line_sep = if crlf { "\r\n" } else { "\n" };

    let parser_config = ParserConfig::default()
        .with_ignored_attr_types(&ignored)
        .with_url_schemes(&schemes)
        .with_max_entries(max.unwrap_or(0))
        .with_reject_unresolved_urls(strict_urls);
    let mut writer_config = WriterConfig::default()
        .with_base64_attrs(&base64_attrs)
        .with_line_sep(line_sep);
    if let Some(cols) = cols {
        writer_config = writer_config.with_cols(cols);
    }

    let mut paths = args.into_iter();
    let input: Box<dyn io::BufRead> = match paths.next() {
        Some(p) if p != "-" => Box::new(BufReader::new(
            File::open(&p).with_context(|| format!("opening {}", p))?,
        )),
        _ => Box::new(io::stdin().lock()),
    };
    let output: Box<dyn io::Write> = match paths.next() {
        Some(p) if p != "-" => Box::new(BufWriter::new(
            File::create(&p).with_context(|| format!("creating {}", p))?,
        )),
        _ => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let n = copy(input, output, parser_config, writer_config)?;
    tracing::info!(records = n, "copy finished");
    Ok(())
}
