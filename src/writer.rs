//! Serialize entries and change records as LDIF.
//!
//! Every attribute line goes through the value encoder (plain `type: value` or
//! `type:: base64`) and is then folded to the configured width. A record is rendered
//! completely before it is written, so a record that fails validation leaves the output
//! untouched.

use crate::error::{LdifError, Result};
use crate::line::fold_line;
use crate::value::{ChangeRecord, Entry, ModItem, Record};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashSet;
use std::io::Write;

/// Default fold width in columns.
pub const DEFAULT_COLS: usize = 76;

#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Lowercased attribute types that are always base64-encoded.
    base64_attrs: HashSet<String>,
    pub cols: usize,
    pub line_sep: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            base64_attrs: HashSet::new(),
            cols: DEFAULT_COLS,
            line_sep: "\n".to_string(),
        }
    }
}

impl WriterConfig {
    pub fn with_base64_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.base64_attrs
            .extend(attrs.into_iter().map(|a| a.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn with_cols(mut self, cols: usize) -> Self {
        self.cols = cols;
        self
    }

    pub fn with_line_sep(mut self, line_sep: impl Into<String>) -> Self {
        self.line_sep = line_sep.into();
        self
    }

    /// True if `value` has to be written as `type:: base64`.
    pub fn needs_base64(&self, attr_type: &str, value: &[u8]) -> bool {
        self.base64_attrs.contains(&attr_type.to_ascii_lowercase()) || !is_safe_string(value)
    }

    /// Encode one attribute as a logical (unfolded) line.
    pub fn encode_attr(&self, attr_type: &str, value: &[u8]) -> String {
        if self.needs_base64(attr_type, value) {
            format!("{}:: {}", attr_type, STANDARD.encode(value))
        } else {
            // Safe strings are plain ASCII.
            let text: String = value.iter().map(|&b| b as char).collect();
            format!("{}: {}", attr_type, text)
        }
    }
}

/// True if `value` can be written as a plain `type: value` line.
///
/// Unsafe: a leading NUL, LF, CR, space, colon or `<`; any NUL, LF, CR or byte >= 0x80;
/// trailing spaces.
pub fn is_safe_string(value: &[u8]) -> bool {
    if let Some(&first) = value.first() {
        if matches!(first, b'\0' | b'\n' | b'\r' | b' ' | b':' | b'<') {
            return false;
        }
    }
    if value
        .iter()
        .any(|&b| matches!(b, b'\0' | b'\n' | b'\r') || b >= 0x80)
    {
        return false;
    }
    value.last() != Some(&b' ')
}

/// Writes LDIF records to an output stream and counts them.
#[derive(Debug)]
pub struct LdifWriter<W> {
    out: W,
    config: WriterConfig,
    records_written: usize,
}

impl<W: Write> LdifWriter<W> {
    pub fn new(out: W, config: WriterConfig) -> Self {
        LdifWriter {
            out,
            config,
            records_written: 0,
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn push_attr(&self, buf: &mut String, attr_type: &str, value: &[u8]) {
        let line = self.config.encode_attr(attr_type, value);
        buf.push_str(&fold_line(&line, self.config.cols, &self.config.line_sep));
    }

    /// Push every value of every attribute. An attribute without values could not be
    /// read back, so it is an error.
    fn push_attrs<'a, I>(&self, buf: &mut String, attrs: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<Vec<u8>>)>,
    {
        for (attr_type, values) in attrs {
            if values.is_empty() {
                return Err(LdifError::NoValues {
                    attr_type: attr_type.clone(),
                });
            }
            for value in values {
                self.push_attr(buf, attr_type, value);
            }
        }
        Ok(())
    }

    fn commit(&mut self, mut buf: String) -> Result<()> {
        buf.push_str(&self.config.line_sep);
        self.out.write_all(buf.as_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    /// Write a content record: the dn, then every attribute in ascending type order.
    ///
    /// Fails with [`LdifError::NoValues`] if an attribute has an empty value list; nothing
    /// is written then.
    pub fn write_entry(&mut self, dn: &str, entry: &Entry) -> Result<()> {
        let mut buf = String::new();
        self.push_attr(&mut buf, "dn", dn.as_bytes());
        self.push_attrs(&mut buf, entry)?;
        tracing::debug!(dn, attrs = entry.len(), "writing entry record");
        self.commit(buf)
    }

    /// Write a change record.
    pub fn write_change(&mut self, dn: &str, change: &ChangeRecord) -> Result<()> {
        let mut buf = String::new();
        self.push_attr(&mut buf, "dn", dn.as_bytes());
        self.push_attr(&mut buf, "changetype", change.changetype().as_str().as_bytes());
        match change {
            ChangeRecord::Add(attrs) => {
                self.push_attrs(&mut buf, attrs.iter().map(|(t, v)| (t, v)))?;
            }
            ChangeRecord::Delete => {}
            ChangeRecord::Modify(mods) => {
                for m in mods {
                    self.push_attr(&mut buf, m.op.as_str(), m.attr_type.as_bytes());
                    for value in &m.values {
                        self.push_attr(&mut buf, &m.attr_type, value);
                    }
                    buf.push('-');
                    buf.push_str(&self.config.line_sep);
                }
            }
            ChangeRecord::ModRdn {
                new_rdn,
                delete_old_rdn,
                new_superior,
            } => {
                self.push_attr(&mut buf, "newrdn", new_rdn.as_bytes());
                let flag: &[u8] = if *delete_old_rdn { b"1" } else { b"0" };
                self.push_attr(&mut buf, "deleteoldrdn", flag);
                if let Some(sup) = new_superior {
                    self.push_attr(&mut buf, "newsuperior", sup.as_bytes());
                }
            }
        }
        tracing::debug!(dn, changetype = %change.changetype(), "writing change record");
        self.commit(buf)
    }

    /// Write an untyped modlist as an add or modify record.
    ///
    /// The shape check runs before anything is written.
    pub fn write_modlist(&mut self, dn: &str, modlist: &[ModItem]) -> Result<()> {
        let change = ChangeRecord::from_modlist(modlist)?;
        self.write_change(dn, &change)
    }

    /// Write any record. An entry without dn is written with the root dn.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        match record {
            Record::Entry { dn, entry } => {
                let dn = dn.as_ref().map(|d| d.as_str()).unwrap_or("");
                self.write_entry(dn, entry)
            }
            Record::Change { dn, change } => self.write_change(dn.as_str(), change),
        }
    }
}
