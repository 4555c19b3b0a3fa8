//! Exact byte-sequence search used to find signature anchors inside
//! otherwise opaque slot payloads.
//!
//! Two interchangeable algorithms are provided: a linear failure-table
//! search ([`Algorithm::FailureTable`], Knuth-Morris-Pratt) and a skip-table
//! search ([`Algorithm::SkipTable`], Boyer-Moore-Horspool). Both report the
//! same matches; they only differ in throughput on different inputs.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    FailureTable,
    SkipTable,
}

/// A compiled search pattern. An empty needle never matches.
#[derive(Debug, Clone)]
pub struct Pattern<'n> {
    needle: &'n [u8],
    table: Table,
}

#[derive(Debug, Clone)]
enum Table {
    Failure(Vec<usize>),
    Skip(Box<[usize; 256]>),
}

impl<'n> Pattern<'n> {
    pub fn new(needle: &'n [u8], algorithm: Algorithm) -> Self {
        let table = match algorithm {
            Algorithm::FailureTable => Table::Failure(failure_table(needle)),
            Algorithm::SkipTable => Table::Skip(skip_table(needle)),
        };
        Self { needle, table }
    }

    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        self.find_from(haystack, 0)
    }

    /// Offset (relative to the start of `haystack`) of the first match at or
    /// after `start`.
    pub fn find_from(&self, haystack: &[u8], start: usize) -> Option<usize> {
        if self.needle.is_empty() || start >= haystack.len() {
            return None;
        }
        if haystack.len() - start < self.needle.len() {
            return None;
        }
        match &self.table {
            Table::Failure(failure) => kmp_find(self.needle, failure, haystack, start),
            Table::Skip(shift) => horspool_find(self.needle, shift, haystack, start),
        }
    }

    /// Iterates over every match, including overlapping ones, in offset order.
    pub fn find_iter<'p, 'h>(&'p self, haystack: &'h [u8]) -> Matches<'p, 'n, 'h> {
        Matches {
            pattern: self,
            haystack,
            next: 0,
        }
    }
}

pub struct Matches<'p, 'n, 'h> {
    pattern: &'p Pattern<'n>,
    haystack: &'h [u8],
    next: usize,
}

impl Iterator for Matches<'_, '_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let found = self.pattern.find_from(self.haystack, self.next)?;
        self.next = found + 1;
        Some(found)
    }
}

fn failure_table(needle: &[u8]) -> Vec<usize> {
    let mut failure = vec![0usize; needle.len()];
    let mut k = 0usize;
    for i in 1..needle.len() {
        while k > 0 && needle[i] != needle[k] {
            k = failure[k - 1];
        }
        if needle[i] == needle[k] {
            k += 1;
        }
        failure[i] = k;
    }
    failure
}

fn kmp_find(needle: &[u8], failure: &[usize], haystack: &[u8], start: usize) -> Option<usize> {
    let mut matched = 0usize;
    for (i, &byte) in haystack.iter().enumerate().skip(start) {
        while matched > 0 && byte != needle[matched] {
            matched = failure[matched - 1];
        }
        if byte == needle[matched] {
            matched += 1;
        }
        if matched == needle.len() {
            return Some(i + 1 - needle.len());
        }
    }
    None
}

fn skip_table(needle: &[u8]) -> Box<[usize; 256]> {
    let mut shift = Box::new([needle.len(); 256]);
    if let Some((_, head)) = needle.split_last() {
        for (i, &byte) in head.iter().enumerate() {
            shift[byte as usize] = needle.len() - 1 - i;
        }
    }
    shift
}

fn horspool_find(
    needle: &[u8],
    shift: &[usize; 256],
    haystack: &[u8],
    start: usize,
) -> Option<usize> {
    let last = needle.len() - 1;
    let mut pos = start;
    while pos + needle.len() <= haystack.len() {
        let tail = haystack[pos + last];
        if tail == needle[last] && haystack[pos..pos + last] == needle[..last] {
            return Some(pos);
        }
        pos += shift[tail as usize];
    }
    None
}
