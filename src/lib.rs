//! # ldifcodec: LDIF reader and writer
//!
//! Reads and writes the LDAP Data Interchange Format (RFC 2849): records made of a
//! `dn:` line followed by `type: value` lines, separated by blank lines, optionally
//! carrying a `changetype:` that turns them into change records.
//!
//! ## Wire format
//!
//! - `type: value` for safe text, `type:: base64` for anything else, `type:< URL` for
//!   values stored elsewhere.
//! - Lines longer than the fold width continue on lines starting with one space.
//! - `#` starts a comment line.
//! - Modify records group changes as `add:`/`delete:`/`replace:` lines, each group
//!   closed by a line holding only `-`.
//!
//! ## Example
//!
//! ```
//! use ldifcodec::{Entry, LdifWriter, RecordList, ParserConfig, WriterConfig};
//!
//! let mut entry = Entry::new();
//! entry.insert("cn".to_string(), vec![b"Babs Jensen".to_vec()]);
//! entry.insert("jpegPhoto".to_string(), vec![b"\x00\xff".to_vec()]);
//!
//! let mut writer = LdifWriter::new(Vec::new(), WriterConfig::default());
//! writer.write_entry("cn=Babs Jensen,dc=example,dc=com", &entry).unwrap();
//! let bytes = writer.into_inner();
//!
//! let list = RecordList::from_reader(&bytes[..], ParserConfig::default()).unwrap();
//! assert_eq!(list.records[0].as_entry(), Some(&entry));
//! ```

pub mod dn;
pub mod error;
pub mod fetch;
pub mod line;
pub mod reader;
pub mod sink;
pub mod value;
pub mod writer;

pub use dn::is_valid_dn;
pub use error::{ErrorCategory, LdifError, Result};
pub use fetch::{FileFetcher, ResourceFetcher};
pub use line::{fold_line, LineUnfolder};
pub use reader::{AttrLine, AttrValue, LdifParser, ParserConfig};
pub use sink::{copy, LdifCopy, RecordList, RecordSink};
pub use value::{ChangeRecord, ChangeType, Dn, Entry, ModItem, ModOp, Modification, Record};
pub use writer::{is_safe_string, LdifWriter, WriterConfig, DEFAULT_COLS};
