//! Seekable byte source with lookahead (spec §4.B `ParserInputStream`).
//!
//! The source wraps an in-memory buffer rather than an arbitrary
//! `Read + Seek`: every parser in this crate works over a fully-buffered
//! message (as the teacher's nom parsers do over `&[u8]`), so there is no
//! need for the original's disk-backed variant. `find_next` still honors
//! the rolling-buffer contract so that its behavior — and the regression
//! test for the cross-buffer bug noted in spec §9 — carries over exactly.

/// Size of one half of `find_next`'s rolling window.
pub const ROLLING_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFound;

/// A cursor over an immutable byte buffer (spec §4.B).
#[derive(Debug, Clone)]
pub struct ParserInputStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ParserInputStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn get_position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn skip(&mut self, n: usize) {
        self.seek(self.pos + n);
    }

    /// Reads up to `n` bytes starting at the cursor, advancing it; returns
    /// the actual number of bytes read (may be less than `n` at EOF).
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.data.len() - self.pos);
        dst[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// The byte at the cursor without advancing it.
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// The byte at the cursor, advancing past it.
    pub fn get_byte(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        Some(b)
    }

    /// Whether `pat` occurs at the cursor. Never advances.
    pub fn match_bytes(&self, pat: &[u8]) -> bool {
        self.data[self.pos..].starts_with(pat)
    }

    /// Extracts `[begin, end)` as a byte slice without disturbing the
    /// cursor (the source "seeks aside and restores").
    pub fn extract(&self, begin: usize, end: usize) -> &'a [u8] {
        &self.data[begin..end.min(self.data.len())]
    }

    /// Finds the first occurrence of `token` at or after `start_pos`.
    ///
    /// Implements the rolling-2B-buffer contract of spec §4.B: `token` must
    /// be no longer than [`ROLLING_BUFFER_SIZE`]; the scan advances a
    /// window in `ROLLING_BUFFER_SIZE`-byte steps and overlaps the tail of
    /// the previous window so a match straddling a window boundary is never
    /// missed (the source's historical off-by-one bug, spec §9).
    pub fn find_next(&self, token: &[u8], start_pos: usize) -> Result<usize, NotFound> {
        debug_assert!(token.len() <= ROLLING_BUFFER_SIZE);
        if token.is_empty() {
            return Ok(start_pos.min(self.data.len()));
        }

        let mut window_start = start_pos;
        while window_start < self.data.len() {
            let window_end = (window_start + 2 * ROLLING_BUFFER_SIZE).min(self.data.len());
            let window = &self.data[window_start..window_end];
            if let Some(rel) = find_subslice(window, token) {
                return Ok(window_start + rel);
            }
            if window_end == self.data.len() {
                break;
            }
            // Advance by one buffer width; the next window's first half
            // overlaps this window's second half, so a match straddling
            // the boundary at `window_start + ROLLING_BUFFER_SIZE` is
            // covered by both scans.
            window_start += ROLLING_BUFFER_SIZE;
        }
        Err(NotFound)
    }

    /// Skips bytes matching `pred` starting at the cursor, up to `end_pos`
    /// (exclusive). Returns the count skipped; advances the cursor.
    pub fn skip_if(&mut self, pred: impl Fn(u8) -> bool, end_pos: usize) -> usize {
        let end = end_pos.min(self.data.len());
        let start = self.pos;
        while self.pos < end && self.data.get(self.pos).copied().is_some_and(&pred) {
            self.pos += 1;
        }
        self.pos - start
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_next_locates_token_within_one_window() {
        let data = b"hello world, needle, goodbye";
        let stream = ParserInputStream::new(data);
        assert_eq!(stream.find_next(b"needle", 0), Ok(13));
    }

    #[test]
    fn find_next_returns_not_found_when_absent() {
        let stream = ParserInputStream::new(b"no match here");
        assert_eq!(stream.find_next(b"xyz", 0), Err(NotFound));
    }

    #[test]
    fn find_next_locates_token_straddling_a_buffer_boundary() {
        // Construct a haystack where the token starts one byte before the
        // first rolling-window boundary (ROLLING_BUFFER_SIZE).
        let token = b"BOUNDARY-TOKEN";
        let mut data = vec![b'x'; ROLLING_BUFFER_SIZE - 1];
        data.extend_from_slice(token);
        data.extend(vec![b'y'; 1000]);

        let stream = ParserInputStream::new(&data);
        let found = stream.find_next(token, 0).unwrap();
        assert_eq!(found, ROLLING_BUFFER_SIZE - 1);
    }

    #[test]
    fn skip_if_counts_and_advances() {
        let mut stream = ParserInputStream::new(b"   abc");
        let n = stream.skip_if(|b| b == b' ', 6);
        assert_eq!(n, 3);
        assert_eq!(stream.get_position(), 3);
    }

    #[test]
    fn extract_does_not_move_the_cursor() {
        let stream = ParserInputStream::new(b"abcdef");
        assert_eq!(stream.extract(1, 4), b"bcd");
        assert_eq!(stream.get_position(), 0);
    }
}
