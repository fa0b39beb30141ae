//! Parse LDIF input into records.
//!
//! Reading is layered: [`LineUnfolder`] yields logical lines, [`LdifParser::parse_attr`]
//! turns one logical line into a typed attribute line, and the record loop assembles
//! attribute lines into [`Record`]s until a blank line or end of input.

use crate::error::{LdifError, Result};
use crate::fetch::{FileFetcher, ResourceFetcher};
use crate::line::LineUnfolder;
use crate::sink::RecordSink;
use crate::value::{ChangeRecord, ChangeType, Dn, ModOp, Modification, Record};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashSet;
use std::io::BufRead;
use url::Url;

#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Lowercased attribute types that are dropped from records.
    ignored_attr_types: HashSet<String>,
    /// Lowercased URL schemes that may be fetched. Empty disables fetching.
    url_schemes: HashSet<String>,
    /// Stop after this many records; 0 reads everything.
    pub max_entries: usize,
    pub line_sep: String,
    /// Fail on a `:<` value that was not fetched instead of dropping the attribute.
    pub reject_unresolved_urls: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            ignored_attr_types: HashSet::new(),
            url_schemes: HashSet::new(),
            max_entries: 0,
            line_sep: "\n".to_string(),
            reject_unresolved_urls: false,
        }
    }
}

impl ParserConfig {
    pub fn with_ignored_attr_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_attr_types
            .extend(types.into_iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn with_url_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.url_schemes
            .extend(schemes.into_iter().map(|s| s.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_line_sep(mut self, line_sep: impl Into<String>) -> Self {
        self.line_sep = line_sep.into();
        self
    }

    pub fn with_reject_unresolved_urls(mut self, reject: bool) -> Self {
        self.reject_unresolved_urls = reject;
        self
    }

    pub fn is_ignored(&self, attr_type: &str) -> bool {
        self.ignored_attr_types
            .contains(&attr_type.to_ascii_lowercase())
    }

    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.url_schemes.contains(&scheme.to_ascii_lowercase())
    }
}

/// Value part of an attribute line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Bytes(Vec<u8>),
    /// A `:<` reference that was not fetched, with the reason.
    Unresolved { url: String, reason: String },
}

/// One decoded logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrLine {
    Attr { attr_type: String, value: AttrValue },
    /// A line consisting of `-`, closing a group in a modify record.
    Separator,
    /// Blank line, end of input, or a line without a colon.
    End,
}

fn trim_start(b: &[u8]) -> &[u8] {
    let start = b.iter().position(|c| !c.is_ascii_whitespace()).unwrap_or(b.len());
    &b[start..]
}

fn trim(b: &[u8]) -> &[u8] {
    let b = trim_start(b);
    let end = b
        .iter()
        .rposition(|c| !c.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &b[..end]
}

/// Reads LDIF records from a buffered source.
///
/// The parser never reads past the blank line that ends a record, so after
/// `max_entries` records [`LdifParser::into_inner`] hands back the source positioned at
/// the next record.
pub struct LdifParser<R> {
    lines: LineUnfolder<R>,
    config: ParserConfig,
    fetcher: Box<dyn ResourceFetcher>,
    records_read: usize,
}

impl<R: BufRead> LdifParser<R> {
    pub fn new(input: R, config: ParserConfig) -> Self {
        LdifParser {
            lines: LineUnfolder::new(input, &config.line_sep),
            config,
            fetcher: Box::new(FileFetcher),
            records_read: 0,
        }
    }

    /// Replace the fetcher used for allowlisted `:<` URLs (default: [`FileFetcher`]).
    pub fn with_fetcher(mut self, fetcher: impl ResourceFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn records_read(&self) -> usize {
        self.records_read
    }

    pub fn into_inner(self) -> R {
        self.lines.into_inner()
    }

    /// Decode the next attribute line, skipping comments.
    pub fn parse_attr(&mut self) -> Result<AttrLine> {
        let mut line = match self.lines.next_line()? {
            Some(l) => l,
            None => return Ok(AttrLine::End),
        };
        while line.first() == Some(&b'#') {
            tracing::trace!("skipping comment line");
            line = match self.lines.next_line()? {
                Some(l) => l,
                None => return Ok(AttrLine::End),
            };
        }
        if line.is_empty() {
            return Ok(AttrLine::End);
        }
        if trim(&line) == b"-" {
            return Ok(AttrLine::Separator);
        }
        let colon = match line.iter().position(|&b| b == b':') {
            Some(p) => p,
            None => {
                tracing::debug!(
                    line = %String::from_utf8_lossy(&line),
                    "line without colon ends the record"
                );
                return Ok(AttrLine::End);
            }
        };
        let attr_type = String::from_utf8_lossy(&line[..colon]).into_owned();
        let rest = &line[colon + 1..];
        let value = match rest.first() {
            Some(b':') => {
                let decoded = STANDARD.decode(trim(&rest[1..])).map_err(|source| {
                    LdifError::InvalidBase64 {
                        attr_type: attr_type.clone(),
                        source,
                    }
                })?;
                AttrValue::Bytes(decoded)
            }
            Some(b'<') => self.resolve_url(&attr_type, &rest[1..])?,
            _ => {
                // Only spaces separate the colon from the value; a leading tab is data.
                let start = rest.iter().position(|&b| b != b' ').unwrap_or(rest.len());
                AttrValue::Bytes(rest[start..].to_vec())
            }
        };
        Ok(AttrLine::Attr { attr_type, value })
    }

    fn resolve_url(&self, attr_type: &str, raw: &[u8]) -> Result<AttrValue> {
        let url_text = String::from_utf8_lossy(trim(raw)).into_owned();
        let unresolved = |reason: String| AttrValue::Unresolved {
            url: url_text.clone(),
            reason,
        };
        if self.config.url_schemes.is_empty() {
            return Ok(unresolved("URL processing is disabled".to_string()));
        }
        let url = match Url::parse(&url_text) {
            Ok(u) => u,
            Err(e) => return Ok(unresolved(format!("malformed URL: {}", e))),
        };
        if !self.config.allows_scheme(url.scheme()) {
            return Ok(unresolved(format!("scheme {} is not allowed", url.scheme())));
        }
        tracing::debug!(attr_type, url = %url, "fetching referenced value");
        let content = self.fetcher.fetch(&url).map_err(|source| LdifError::Fetch {
            url: url_text.clone(),
            source,
        })?;
        Ok(AttrValue::Bytes(content))
    }

    fn can_read(&mut self) -> Result<bool> {
        let max = self.config.max_entries;
        if max != 0 && self.records_read >= max {
            tracing::debug!(max_entries = max, "record limit reached");
            return Ok(false);
        }
        Ok(self.lines.has_more()?)
    }

    /// Read the next record. Blank input between records is skipped; `None` at end of
    /// input or once `max_entries` records were returned.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        while self.can_read()? {
            if let Some(record) = self.read_record()? {
                self.records_read += 1;
                tracing::debug!(
                    records_read = self.records_read,
                    dn = record.dn().map(Dn::as_str).unwrap_or(""),
                    "record complete"
                );
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Read records and hand each one to `sink`. Returns the number of records read.
    pub fn parse<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<usize> {
        while let Some(record) = self.next_record()? {
            sink.handle(record)?;
        }
        Ok(self.records_read)
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        let mut state = RecordState::default();
        loop {
            let (attr_type, value) = match self.parse_attr()? {
                AttrLine::End => break,
                AttrLine::Separator if state.changetype == Some(ChangeType::Modify) => {
                    state.close_modification(&self.config)?;
                    continue;
                }
                // Outside a modify record "-" is just a line without a colon.
                AttrLine::Separator => break,
                AttrLine::Attr { attr_type, value } => (attr_type, value),
            };
            let value = match value {
                AttrValue::Bytes(v) => v,
                AttrValue::Unresolved { url, reason } => {
                    if self.config.reject_unresolved_urls {
                        return Err(LdifError::UnresolvedUrl {
                            attr_type,
                            url,
                            reason,
                        });
                    }
                    tracing::warn!(attr_type, url, reason, "dropping URL-referenced value");
                    continue;
                }
            };

            if attr_type == "dn" {
                if let Some(dn) = &state.dn {
                    return Err(LdifError::DuplicateDn { dn: dn.to_string() });
                }
                let text = String::from_utf8(value).map_err(|_| LdifError::DnNotUtf8)?;
                state.dn = Some(Dn::parse(text)?);
            } else if attr_type == "version" && state.dn.is_none() {
                // version: 1
            } else if attr_type == "changetype" {
                let dn = state.dn.as_ref().ok_or_else(|| LdifError::MissingDn {
                    attr_type: attr_type.clone(),
                })?;
                if state.changetype.is_some() {
                    return Err(LdifError::DuplicateChangetype { dn: dn.to_string() });
                }
                state.changetype = Some(String::from_utf8_lossy(&value).parse()?);
            } else if state.changetype == Some(ChangeType::Modify) {
                state.push_modification_line(attr_type, value)?;
            } else if self.config.is_ignored(&attr_type) {
                tracing::trace!(attr_type, "ignoring attribute");
            } else {
                state.push_attr(attr_type, value);
            }
        }
        state.finish(&self.config)
    }
}

/// Accumulates one record between blank lines.
#[derive(Debug, Default)]
struct RecordState {
    dn: Option<Dn>,
    changetype: Option<ChangeType>,
    attrs: Vec<(String, Vec<Vec<u8>>)>,
    mods: Vec<Modification>,
    current_mod: Option<Modification>,
}

impl RecordState {
    fn push_attr(&mut self, attr_type: String, value: Vec<u8>) {
        match self.attrs.iter_mut().find(|(t, _)| *t == attr_type) {
            Some((_, values)) => values.push(value),
            None => self.attrs.push((attr_type, vec![value])),
        }
    }

    fn invalid(&self, reason: String) -> LdifError {
        LdifError::InvalidModification {
            dn: self.dn.as_ref().map(Dn::to_string).unwrap_or_default(),
            reason,
        }
    }

    fn push_modification_line(&mut self, attr_type: String, value: Vec<u8>) -> Result<()> {
        if let Some(m) = self.current_mod.as_mut() {
            if m.attr_type.eq_ignore_ascii_case(&attr_type) {
                m.values.push(value);
                return Ok(());
            }
            let reason = format!(
                "{} value inside the {} group for {}",
                attr_type, m.op, m.attr_type
            );
            return Err(self.invalid(reason));
        }
        let op = match ModOp::from_keyword(&attr_type) {
            Some(op) => op,
            None => {
                return Err(self.invalid(format!(
                    "expected add:, delete: or replace:, found {}:",
                    attr_type
                )))
            }
        };
        let target = String::from_utf8_lossy(trim(&value)).into_owned();
        self.current_mod = Some(Modification::new(op, target, Vec::new()));
        Ok(())
    }

    fn close_modification(&mut self, config: &ParserConfig) -> Result<()> {
        let m = match self.current_mod.take() {
            Some(m) => m,
            None => return Err(self.invalid("'-' without a modification group".to_string())),
        };
        if config.is_ignored(&m.attr_type) {
            tracing::trace!(attr_type = %m.attr_type, "ignoring modification");
        } else {
            self.mods.push(m);
        }
        Ok(())
    }

    fn single_value(&self, name: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    fn modrdn(&self) -> Result<ChangeRecord> {
        if let Some((t, _)) = self.attrs.iter().find(|(t, _)| {
            !["newrdn", "deleteoldrdn", "newsuperior"]
                .iter()
                .any(|k| t.eq_ignore_ascii_case(k))
        }) {
            return Err(self.invalid(format!("modrdn record carries attribute {}", t)));
        }
        let new_rdn = self
            .single_value("newrdn")
            .ok_or_else(|| self.invalid("modrdn record without newrdn".to_string()))?;
        let delete_old_rdn = match self.single_value("deleteoldrdn").as_deref() {
            Some("1") => true,
            Some("0") => false,
            other => {
                return Err(self.invalid(format!(
                    "deleteoldrdn must be 0 or 1, found {:?}",
                    other
                )))
            }
        };
        Ok(ChangeRecord::ModRdn {
            new_rdn,
            delete_old_rdn,
            new_superior: self.single_value("newsuperior"),
        })
    }

    fn finish(mut self, config: &ParserConfig) -> Result<Option<Record>> {
        let changetype = match self.changetype {
            Some(ct) => ct,
            None if self.attrs.is_empty() => return Ok(None),
            None => {
                return Ok(Some(Record::Entry {
                    dn: self.dn,
                    entry: self.attrs.into_iter().collect(),
                }))
            }
        };
        let change = match changetype {
            ChangeType::Add => ChangeRecord::Add(std::mem::take(&mut self.attrs)),
            ChangeType::Delete => {
                if let Some((t, _)) = self.attrs.first() {
                    return Err(self.invalid(format!("delete record carries attribute {}", t)));
                }
                ChangeRecord::Delete
            }
            ChangeType::Modify => {
                if let Some((t, _)) = self.attrs.first() {
                    return Err(self.invalid(format!(
                        "attribute {} outside a modification group",
                        t
                    )));
                }
                // The last group may omit its closing "-".
                if self.current_mod.is_some() {
                    self.close_modification(config)?;
                }
                ChangeRecord::Modify(std::mem::take(&mut self.mods))
            }
            ChangeType::ModRdn => self.modrdn()?,
        };
        let dn = self.dn.ok_or_else(|| LdifError::MissingDn {
            attr_type: "changetype".to_string(),
        })?;
        Ok(Some(Record::Change { dn, change }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;

    fn parser(text: &str) -> LdifParser<&[u8]> {
        LdifParser::new(text.as_bytes(), ParserConfig::default())
    }

    fn attr(attr_type: &str, value: &[u8]) -> AttrLine {
        AttrLine::Attr {
            attr_type: attr_type.to_string(),
            value: AttrValue::Bytes(value.to_vec()),
        }
    }

    #[test]
    fn parse_attr_value_forms() {
        let mut p = parser("cn: Babs\nsn:Jensen\ndescription:\nphoto:: AP8=\n# note\n folded comment\nmail:   a@b\n\n");
        assert_eq!(p.parse_attr().unwrap(), attr("cn", b"Babs"));
        assert_eq!(p.parse_attr().unwrap(), attr("sn", b"Jensen"));
        assert_eq!(p.parse_attr().unwrap(), attr("description", b""));
        assert_eq!(p.parse_attr().unwrap(), attr("photo", b"\x00\xff"));
        assert_eq!(p.parse_attr().unwrap(), attr("mail", b"a@b"));
        assert_eq!(p.parse_attr().unwrap(), AttrLine::End);
        assert_eq!(p.parse_attr().unwrap(), AttrLine::End);
    }

    #[test]
    fn plain_values_keep_trailing_spaces() {
        let mut p = parser("cn: a b  \n");
        assert_eq!(p.parse_attr().unwrap(), attr("cn", b"a b  "));
    }

    #[test]
    fn separator_and_no_colon_lines() {
        let mut p = parser("-\nno colon here\n");
        assert_eq!(p.parse_attr().unwrap(), AttrLine::Separator);
        assert_eq!(p.parse_attr().unwrap(), AttrLine::End);
    }

    #[test]
    fn bad_base64_is_an_error() {
        let mut p = parser("photo:: !!!\n");
        assert!(matches!(
            p.parse_attr(),
            Err(LdifError::InvalidBase64 { attr_type, .. }) if attr_type == "photo"
        ));
    }

    #[test]
    fn url_values_disabled_by_default() {
        let mut p = parser("photo:< file:///etc/hostname\n");
        match p.parse_attr().unwrap() {
            AttrLine::Attr {
                value: AttrValue::Unresolved { url, .. },
                ..
            } => assert_eq!(url, "file:///etc/hostname"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn url_values_use_fetcher_for_allowed_schemes() {
        let config = ParserConfig::default().with_url_schemes(["MEM"]);
        let fetcher = |url: &Url| -> std::result::Result<Vec<u8>, BoxError> {
            Ok(url.path().as_bytes().to_vec())
        };
        let mut p = LdifParser::new("a:< mem:hello\nb:< other:x\n".as_bytes(), config).with_fetcher(fetcher);
        assert_eq!(p.parse_attr().unwrap(), attr("a", b"hello"));
        assert!(matches!(
            p.parse_attr().unwrap(),
            AttrLine::Attr { value: AttrValue::Unresolved { .. }, .. }
        ));
    }

    #[test]
    fn fetch_errors_propagate() {
        let config = ParserConfig::default().with_url_schemes(["mem"]);
        let fetcher =
            |_: &Url| -> std::result::Result<Vec<u8>, BoxError> { Err("unreachable host".into()) };
        let mut p = LdifParser::new("a:< mem:x\n".as_bytes(), config).with_fetcher(fetcher);
        assert!(matches!(p.parse_attr(), Err(LdifError::Fetch { url, .. }) if url == "mem:x"));
    }

    #[test]
    fn modify_record_groups() {
        let mut p = parser(
            "dn: cn=a,dc=com\nchangetype: modify\nadd: mail\nmail: a@example.com\nmail: b@example.com\n-\ndelete: fax\n-\nreplace: sn\nsn: X\n\n",
        );
        let record = p.next_record().unwrap().unwrap();
        assert_eq!(
            record,
            Record::Change {
                dn: Dn::parse("cn=a,dc=com").unwrap(),
                change: ChangeRecord::Modify(vec![
                    Modification::new(
                        ModOp::Add,
                        "mail",
                        vec![b"a@example.com".to_vec(), b"b@example.com".to_vec()]
                    ),
                    Modification::new(ModOp::Delete, "fax", vec![]),
                    Modification::new(ModOp::Replace, "sn", vec![b"X".to_vec()]),
                ]),
            }
        );
    }

    #[test]
    fn modify_value_for_wrong_type_is_rejected() {
        let mut p = parser("dn: cn=a\nchangetype: modify\nadd: mail\ncn: x\n-\n\n");
        assert!(matches!(
            p.next_record(),
            Err(LdifError::InvalidModification { .. })
        ));
    }

    #[test]
    fn delete_and_modrdn_records() {
        let mut p = parser(
            "dn: cn=a\nchangetype: delete\n\ndn: cn=b,dc=com\nchangetype: modrdn\nnewrdn: cn=c\ndeleteoldrdn: 0\n\n",
        );
        assert_eq!(p.next_record().unwrap().unwrap().as_change(), Some(&ChangeRecord::Delete));
        assert_eq!(
            p.next_record().unwrap().unwrap().as_change(),
            Some(&ChangeRecord::ModRdn {
                new_rdn: "cn=c".into(),
                delete_old_rdn: false,
                new_superior: None,
            })
        );
        assert!(p.next_record().unwrap().is_none());
    }

    #[test]
    fn modrdn_requires_flag() {
        let mut p = parser("dn: cn=b\nchangetype: modrdn\nnewrdn: cn=c\n\n");
        assert!(matches!(
            p.next_record(),
            Err(LdifError::InvalidModification { .. })
        ));
    }

    #[test]
    fn modify_rejects_attributes_before_changetype() {
        let mut p = parser("dn: cn=a\ncn: kept\nchangetype: modify\nreplace: sn\nsn: y\n-\n\n");
        assert!(matches!(
            p.next_record(),
            Err(LdifError::InvalidModification { dn, reason }) if dn == "cn=a" && reason.contains("cn")
        ));
    }

    #[test]
    fn modrdn_rejects_unknown_attributes() {
        let mut p = parser(
            "dn: cn=a\nchangetype: modrdn\nnewrdn: cn=b\ndeleteoldrdn: 1\ndescription: kept\n\n",
        );
        assert!(matches!(
            p.next_record(),
            Err(LdifError::InvalidModification { reason, .. }) if reason.contains("description")
        ));

        let mut p = parser(
            "dn: cn=a\nchangetype: modrdn\nNewRDN: cn=b\ndeleteOldRDN: 0\nnewSuperior: dc=org\n\n",
        );
        assert_eq!(
            p.next_record().unwrap().unwrap().as_change(),
            Some(&ChangeRecord::ModRdn {
                new_rdn: "cn=b".into(),
                delete_old_rdn: false,
                new_superior: Some("dc=org".into()),
            })
        );
    }

    #[test]
    fn base64_dn_is_validated() {
        // "cn=a" and "=a"
        let mut p = parser("dn:: Y249YQ==\ncn: a\n\ndn:: PWE=\ncn: a\n\n");
        assert_eq!(p.next_record().unwrap().unwrap().dn().unwrap().as_str(), "cn=a");
        assert!(matches!(p.next_record(), Err(LdifError::InvalidDn(s)) if s == "=a"));
    }
}
