//! Distinguished name validation using PEST.
//!
//! The check is structural only: no normalization, case folding or unescaping is
//! applied, so a string that validates is kept byte-for-byte as written.

use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "dn.pest"]
struct DnParser;

/// Return true if `s` is a syntactically valid distinguished name.
///
/// The empty string is the root DN and is valid. Otherwise the whole string must
/// match `RDN ("," RDN)*`; a prefix match is not enough.
pub fn is_valid_dn(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    DnParser::parse(Rule::dn, s).is_ok()
}
