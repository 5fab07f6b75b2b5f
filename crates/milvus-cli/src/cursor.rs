//! Client-side paging over query and search results.

use milvus_client::Row;

use crate::error::Result;

/// Paging state of a result set read with an increasing offset.
///
/// Each [`Cursor::next_batch`] call hands `(offset, size)` to a fetch
/// function returning at most `size` rows. The cursor is exhausted after an
/// empty or short batch, or once `limit` rows were returned.
#[derive(Debug, Clone)]
pub struct Cursor {
    batch_size: u64,
    limit: Option<u64>,
    offset: u64,
    returned: u64,
    batches: usize,
    exhausted: bool,
}

impl Cursor {
    /// Creates a cursor; a zero batch size is treated as one.
    #[must_use]
    pub fn new(batch_size: u64, limit: Option<u64>) -> Self {
        Self {
            batch_size: batch_size.max(1),
            limit,
            offset: 0,
            returned: 0,
            batches: 0,
            exhausted: false,
        }
    }

    /// Fetches the next batch, `None` once exhausted.
    pub fn next_batch<F>(&mut self, fetch: F) -> Result<Option<Vec<Row>>>
    where
        F: FnOnce(u64, u64) -> Result<Vec<Row>>,
    {
        if self.exhausted {
            return Ok(None);
        }
        let size = match self.limit {
            Some(limit) => self.batch_size.min(limit.saturating_sub(self.returned)),
            None => self.batch_size,
        };
        if size == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        let mut rows = fetch(self.offset, size)?;
        rows.truncate(usize::try_from(size).unwrap_or(usize::MAX));
        let got = rows.len() as u64;
        self.offset += got;
        self.returned += got;
        if got < size || self.limit.is_some_and(|l| self.returned >= l) {
            self.exhausted = true;
        }
        if rows.is_empty() {
            return Ok(None);
        }
        self.batches += 1;
        Ok(Some(rows))
    }

    /// True when no further batch will be fetched.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Rows returned so far.
    #[must_use]
    pub fn returned(&self) -> u64 {
        self.returned
    }

    /// Non-empty batches returned so far.
    #[must_use]
    pub fn batches(&self) -> usize {
        self.batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn rows(total: u64, offset: u64, size: u64) -> Result<Vec<Row>> {
        Ok((offset..total.min(offset + size))
            .map(|i| {
                let mut row = Row::new();
                row.insert("id".to_string(), Value::from(i));
                row
            })
            .collect())
    }

    fn drain(cursor: &mut Cursor, total: u64) -> Vec<usize> {
        let mut sizes = Vec::new();
        while let Some(batch) = cursor.next_batch(|o, s| rows(total, o, s)).unwrap() {
            sizes.push(batch.len());
        }
        sizes
    }

    #[test]
    fn test_pages_until_short_batch() {
        let mut cursor = Cursor::new(4, None);
        assert_eq!(drain(&mut cursor, 10), vec![4, 4, 2]);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.returned(), 10);
        assert_eq!(cursor.batches(), 3);
    }

    #[test]
    fn test_offsets_increase() {
        let mut cursor = Cursor::new(3, None);
        let first = cursor.next_batch(|o, s| rows(7, o, s)).unwrap().unwrap();
        let second = cursor.next_batch(|o, s| rows(7, o, s)).unwrap().unwrap();
        assert_eq!(first[0]["id"], Value::from(0));
        assert_eq!(second[0]["id"], Value::from(3));
    }

    #[test]
    fn test_limit_caps_last_batch() {
        let mut cursor = Cursor::new(4, Some(6));
        assert_eq!(drain(&mut cursor, 100), vec![4, 2]);
        assert!(cursor.is_exhausted());
        assert!(cursor.next_batch(|o, s| rows(100, o, s)).unwrap().is_none());
    }

    #[test]
    fn test_exact_multiple_ends_on_empty_batch() {
        let mut cursor = Cursor::new(5, None);
        assert_eq!(drain(&mut cursor, 10), vec![5, 5]);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.batches(), 2);
    }

    #[test]
    fn test_fetch_error_propagates() {
        let mut cursor = Cursor::new(5, None);
        let result = cursor.next_batch(|_, _| Err(crate::error::CliError::parameter("expr", "bad")));
        assert!(result.is_err());
    }
}
