//! Consumers of parsed records.

use crate::error::Result;
use crate::reader::{LdifParser, ParserConfig};
use crate::value::Record;
use crate::writer::{LdifWriter, WriterConfig};
use std::io::{BufRead, Write};

/// Receives every record the parser completes, in input order.
pub trait RecordSink {
    fn handle(&mut self, record: Record) -> Result<()>;
}

impl<F> RecordSink for F
where
    F: FnMut(Record) -> Result<()>,
{
    fn handle(&mut self, record: Record) -> Result<()> {
        self(record)
    }
}

/// Collects all records in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordList {
    pub records: Vec<Record>,
}

impl RecordList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse all of `input` into a list.
    pub fn from_reader<R: BufRead>(input: R, config: ParserConfig) -> Result<Self> {
        let mut list = RecordList::new();
        LdifParser::new(input, config).parse(&mut list)?;
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for RecordList {
    fn handle(&mut self, record: Record) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

/// Re-emits every record through an [`LdifWriter`].
///
/// Values that the parser fetched from URLs are written inline.
#[derive(Debug)]
pub struct LdifCopy<W> {
    writer: LdifWriter<W>,
}

impl<W: Write> LdifCopy<W> {
    pub fn new(output: W, config: WriterConfig) -> Self {
        LdifCopy {
            writer: LdifWriter::new(output, config),
        }
    }

    pub fn writer(&self) -> &LdifWriter<W> {
        &self.writer
    }

    pub fn into_writer(self) -> LdifWriter<W> {
        self.writer
    }
}

impl<W: Write> RecordSink for LdifCopy<W> {
    fn handle(&mut self, record: Record) -> Result<()> {
        self.writer.write_record(&record)
    }
}

/// Copy LDIF from `input` to `output`. Returns the number of records copied.
pub fn copy<R: BufRead, W: Write>(
    input: R,
    output: W,
    parser_config: ParserConfig,
    writer_config: WriterConfig,
) -> Result<usize> {
    let mut sink = LdifCopy::new(output, writer_config);
    let n = LdifParser::new(input, parser_config).parse(&mut sink)?;
    sink.writer.flush()?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dn;

    #[test]
    fn record_list_collects_in_order() {
        let list = RecordList::from_reader(
            "dn: cn=a\ncn: a\n\ndn: cn=b\ncn: b\n".as_bytes(),
            ParserConfig::default(),
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.records[1].dn(), Some(&Dn::parse("cn=b").unwrap()));
    }

    #[test]
    fn closure_sink() {
        let mut dns = Vec::new();
        let mut parser = LdifParser::new("dn: cn=a\ncn: a\n\n".as_bytes(), ParserConfig::default());
        parser
            .parse(&mut |record: Record| -> Result<()> {
                dns.push(record.dn().map(|d| d.to_string()));
                Ok(())
            })
            .unwrap();
        assert_eq!(dns, vec![Some("cn=a".to_string())]);
    }

    #[test]
    fn copy_normalizes_layout() {
        let input = "version: 1\n# people\ndn: cn=a,dc=com\nsn: A\ncn: a\n long\n\n";
        let mut out = Vec::new();
        let n = copy(input.as_bytes(), &mut out, ParserConfig::default(), WriterConfig::default())
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "dn: cn=a,dc=com\ncn: along\nsn: A\n\n"
        );
    }
}
