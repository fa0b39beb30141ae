//! Parser fuzz target: feed arbitrary bytes to the LDIF reader.
//! The reader must not panic; it returns records or an LdifError. Every record it
//! accepts must be writable, and parsing the written output must give the same records
//! (an entry without dn comes back with the root dn).
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use ldifcodec::{Dn, LdifWriter, ParserConfig, Record, RecordList, WriterConfig};

    let list = match RecordList::from_reader(data, ParserConfig::default()) {
        Ok(l) => l,
        Err(_) => return,
    };
    let mut writer = LdifWriter::new(Vec::new(), WriterConfig::default());
    for record in &list.records {
        writer.write_record(record).expect("parsed record must be writable");
    }
    let bytes = writer.into_inner();
    let reparsed = RecordList::from_reader(&bytes[..], ParserConfig::default())
        .expect("written output must parse");

    let expected: Vec<Record> = list
        .records
        .into_iter()
        .map(|record| match record {
            Record::Entry { dn: None, entry } => Record::Entry {
                dn: Some(Dn::root()),
                entry,
            },
            other => other,
        })
        .collect();
    assert_eq!(reparsed.records, expected);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
