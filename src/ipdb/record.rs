//! Leaf Record Decoding
//!
//! A leaf locator `v >= node_count` addresses data-region byte
//! `node_count * 8 + (v - node_count)`, i.e. `v + node_count * 7`. The record
//! there is a u16 big-endian length followed by that many bytes of
//! tab-separated column values. Each language owns a contiguous block of
//! `fields.len()` columns starting at its declared index.

use super::format::Metadata;
use super::types::{read_record_len, COLUMN_SEPARATOR, NODE_BYTES, RECORD_LEN_BYTES};
use crate::error::{IpdbError, Result};
use std::collections::HashMap;

/// Borrow the raw record bytes for `locator`
pub fn raw_record<'a>(data: &'a [u8], metadata: &Metadata, locator: u32) -> Result<&'a [u8]> {
    let node_count = metadata.node_count as usize;
    let locator = locator as usize;
    if locator < node_count {
        return Err(IpdbError::NotFound);
    }

    let pos = node_count
        .checked_mul(NODE_BYTES - 1)
        .and_then(|skip| skip.checked_add(locator))
        .unwrap_or(usize::MAX);
    if pos >= data.len() {
        return Err(IpdbError::CorruptDatabase(format!(
            "record offset {} beyond data region ({} bytes)",
            pos,
            data.len()
        )));
    }

    let len = read_record_len(data, pos).ok_or_else(|| {
        IpdbError::CorruptDatabase(format!("record length at {} is truncated", pos))
    })?;

    let start = pos + RECORD_LEN_BYTES;
    let end = start + len;
    if end > data.len() {
        return Err(IpdbError::CorruptDatabase(format!(
            "record at {} claims {} bytes, only {} remain",
            pos,
            len,
            data.len() - start
        )));
    }

    Ok(&data[start..end])
}

/// A leaf record split into its columns
#[derive(Debug, Clone)]
pub struct Record<'a> {
    columns: Vec<&'a str>,
}

impl<'a> Record<'a> {
    /// Split raw record bytes on tabs
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        let mut columns = Vec::new();
        let mut start = 0;
        for pos in memchr::memchr_iter(COLUMN_SEPARATOR, raw) {
            columns.push(column_str(&raw[start..pos], columns.len())?);
            start = pos + 1;
        }
        columns.push(column_str(&raw[start..], columns.len())?);

        Ok(Record { columns })
    }

    /// Number of columns in the record
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if the record has no columns (never the case for a parsed record)
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column values belonging to one language, in field order
    fn block(&self, metadata: &Metadata, start: usize) -> Result<&[&'a str]> {
        let end = start.saturating_add(metadata.fields.len());
        if end > self.columns.len() {
            return Err(IpdbError::CorruptDatabase(format!(
                "record has {} columns, schema needs {}",
                self.columns.len(),
                end
            )));
        }
        Ok(&self.columns[start..end])
    }

    /// Every field in one language: field -> value
    pub fn locale(&self, metadata: &Metadata, lang: &str) -> Result<HashMap<String, String>> {
        let start = *metadata
            .languages
            .get(lang)
            .ok_or_else(|| IpdbError::UnknownLanguage(lang.to_string()))?;

        let block = self.block(metadata, start)?;
        Ok(metadata
            .fields
            .iter()
            .zip(block)
            .map(|(field, value)| (field.clone(), (*value).to_string()))
            .collect())
    }

    /// Every field in every language: field -> language -> value
    pub fn all(&self, metadata: &Metadata) -> Result<HashMap<String, HashMap<String, String>>> {
        let mut result: HashMap<String, HashMap<String, String>> = metadata
            .fields
            .iter()
            .map(|field| (field.clone(), HashMap::with_capacity(metadata.languages.len())))
            .collect();

        for (lang, &start) in &metadata.languages {
            let block = self.block(metadata, start)?;
            for (field, value) in metadata.fields.iter().zip(block) {
                if let Some(by_lang) = result.get_mut(field) {
                    by_lang.insert(lang.clone(), (*value).to_string());
                }
            }
        }

        Ok(result)
    }
}

fn column_str(bytes: &[u8], index: usize) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| {
        IpdbError::CorruptDatabase(format!("column {} is not valid UTF-8: {}", index, e))
    })
}
