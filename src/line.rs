//! Physical line handling: folding long logical lines on write, unfolding continuation
//! lines on read.
//!
//! A continuation line starts with exactly one space; the space is the fold marker and
//! is not part of the value.

use std::io::{self, BufRead};

/// Fold a logical line to at most `width` characters per physical line.
///
/// The first physical line carries `width` characters, every continuation line a single
/// leading space plus up to `width - 1` characters. Each physical line is terminated by
/// `line_sep`. Widths below 2 are treated as 2.
pub fn fold_line(line: &str, width: usize, line_sep: &str) -> String {
    let width = width.max(2);
    let mut out = String::with_capacity(line.len() + line_sep.len() * 2);
    // Split on character boundaries so the width counts characters, not bytes.
    let bounds: Vec<usize> = line
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(line.len()))
        .collect();
    let n_chars = bounds.len() - 1;
    if n_chars <= width {
        out.push_str(line);
        out.push_str(line_sep);
        return out;
    }
    out.push_str(&line[..bounds[width]]);
    out.push_str(line_sep);
    let mut pos = width;
    while pos < n_chars {
        let end = n_chars.min(pos + width - 1);
        out.push(' ');
        out.push_str(&line[bounds[pos]..bounds[end]]);
        out.push_str(line_sep);
        pos = end;
    }
    out
}

/// Strip one trailing line separator (`line_sep`, `\r\n` or `\n`) but no other whitespace.
pub fn strip_line_sep<'a>(line: &'a [u8], line_sep: &str) -> &'a [u8] {
    let sep = line_sep.as_bytes();
    if line.ends_with(b"\r\n") {
        &line[..line.len() - 2]
    } else if !sep.is_empty() && line.ends_with(sep) {
        &line[..line.len() - sep.len()]
    } else if line.ends_with(b"\n") {
        &line[..line.len() - 1]
    } else {
        line
    }
}

/// Reads logical lines from a buffered source, joining folded continuation lines.
///
/// Continuations are detected by peeking at the buffered input, so nothing past the end
/// of the current logical line is consumed.
#[derive(Debug)]
pub struct LineUnfolder<R> {
    input: R,
    line_sep: String,
    delimiter: u8,
}

impl<R: BufRead> LineUnfolder<R> {
    pub fn new(input: R, line_sep: &str) -> Self {
        let delimiter = line_sep.as_bytes().last().copied().unwrap_or(b'\n');
        LineUnfolder {
            input,
            line_sep: line_sep.to_string(),
            delimiter,
        }
    }

    /// True while unread input remains.
    pub fn has_more(&mut self) -> io::Result<bool> {
        Ok(!self.input.fill_buf()?.is_empty())
    }

    fn read_physical(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        if self.input.read_until(self.delimiter, &mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf))
    }

    fn next_is_continuation(&mut self) -> io::Result<bool> {
        Ok(self.input.fill_buf()?.first() == Some(&b' '))
    }

    /// Next logical line without its separator, or `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let first = match self.read_physical()? {
            Some(l) => l,
            None => return Ok(None),
        };
        let mut line = strip_line_sep(&first, &self.line_sep).to_vec();
        while self.next_is_continuation()? {
            let cont = match self.read_physical()? {
                Some(c) => c,
                None => break,
            };
            line.extend_from_slice(strip_line_sep(&cont[1..], &self.line_sep));
        }
        Ok(Some(line))
    }

    pub fn get_ref(&self) -> &R {
        &self.input
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unfold_all(text: &str) -> Vec<String> {
        let mut u = LineUnfolder::new(text.as_bytes(), "\n");
        let mut out = Vec::new();
        while let Some(l) = u.next_line().unwrap() {
            out.push(String::from_utf8(l).unwrap());
        }
        out
    }

    #[test]
    fn short_line_is_not_folded() {
        assert_eq!(fold_line("cn: abc", 76, "\n"), "cn: abc\n");
        assert_eq!(fold_line("abcd", 4, "\n"), "abcd\n");
    }

    #[test]
    fn long_line_folds_with_leading_space() {
        assert_eq!(fold_line("abcdefghij", 4, "\n"), "abcd\n efg\n hij\n");
        assert_eq!(fold_line("abcde", 4, "\r\n"), "abcd\r\n e\r\n");
    }

    #[test]
    fn width_below_two_is_clamped() {
        assert_eq!(fold_line("abc", 1, "\n"), "ab\n c\n");
    }

    #[test]
    fn folding_counts_characters() {
        let folded = fold_line("ééééé", 3, "\n");
        assert_eq!(folded, "ééé\n éé\n");
    }

    #[test]
    fn unfolds_multiple_continuations() {
        let lines = unfold_all("dn: cn=a,\n dc=exam\n ple\ncn: a\n");
        assert_eq!(lines, vec!["dn: cn=a,dc=example", "cn: a"]);
    }

    #[test]
    fn continuation_keeps_extra_spaces() {
        let lines = unfold_all("description: a\n  b\n");
        assert_eq!(lines, vec!["description: a b"]);
    }

    #[test]
    fn crlf_separators_are_stripped() {
        let lines = unfold_all("cn: a\r\n b\r\n\r\n");
        assert_eq!(lines, vec!["cn: ab", ""]);
    }

    #[test]
    fn last_line_without_separator() {
        assert_eq!(unfold_all("cn: a\n b"), vec!["cn: ab"]);
    }

    #[test]
    fn unfolder_stops_at_logical_line() {
        let mut u = LineUnfolder::new("a\n b\nc\n".as_bytes(), "\n");
        assert_eq!(u.next_line().unwrap().unwrap(), b"ab");
        assert!(u.has_more().unwrap());
        assert_eq!(u.into_inner(), b"c\n");
    }
}
