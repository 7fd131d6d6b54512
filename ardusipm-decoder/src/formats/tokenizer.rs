//! Frame tokenizer
//!
//! First pass of frame decoding: a finite-state scanner splitting a raw line
//! into marker and field tokens. The marker characters have no escape, so a
//! `t`, `v`, `u` or `$` inside a numeric field is indistinguishable from a real
//! marker; that ambiguity is resolved here and nowhere else.

/// Single-character field sentinels of the frame grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// `u`: timestamp prefix
    Time,
    /// `t`: TDC group separator
    Tdc,
    /// `v`: ADC separator
    Adc,
    /// `$`: declared count separator
    Count,
}

impl Marker {
    pub const ALL: [Marker; 4] = [Marker::Time, Marker::Tdc, Marker::Adc, Marker::Count];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'u' => Some(Marker::Time),
            't' => Some(Marker::Tdc),
            'v' => Some(Marker::Adc),
            '$' => Some(Marker::Count),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Marker::Time => 'u',
            Marker::Tdc => 't',
            Marker::Adc => 'v',
            Marker::Count => '$',
        }
    }
}

/// A token of a raw frame, with its byte offset in the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Marker { marker: Marker, offset: usize },
    Field { text: &'a str, offset: usize },
}

impl<'a> Token<'a> {
    pub fn offset(&self) -> usize {
        match self {
            Token::Marker { offset, .. } | Token::Field { offset, .. } => *offset,
        }
    }

    /// Byte offset just past the token
    pub fn end(&self) -> usize {
        match self {
            Token::Marker { offset, .. } => offset + 1,
            Token::Field { text, offset } => offset + text.len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Between,
    InField { start: usize },
}

/// Split a frame into marker and field tokens
pub fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut state = ScanState::Between;

    for (offset, c) in line.char_indices() {
        state = match (Marker::from_char(c), state) {
            (Some(marker), ScanState::InField { start }) => {
                tokens.push(Token::Field {
                    text: &line[start..offset],
                    offset: start,
                });
                tokens.push(Token::Marker { marker, offset });
                ScanState::Between
            }
            (Some(marker), ScanState::Between) => {
                tokens.push(Token::Marker { marker, offset });
                ScanState::Between
            }
            (None, ScanState::Between) => ScanState::InField { start: offset },
            (None, in_field) => in_field,
        };
    }

    if let ScanState::InField { start } = state {
        tokens.push(Token::Field {
            text: &line[start..],
            offset: start,
        });
    }

    tokens
}

/// Tokens overlapping `start..end`, with fields clipped to the range
pub fn tokens_between<'a>(tokens: &[Token<'a>], start: usize, end: usize) -> Vec<Token<'a>> {
    tokens
        .iter()
        .filter(|token| token.offset() < end && token.end() > start)
        .map(|token| match *token {
            Token::Field { text, offset } => {
                let from = floor_char_boundary(text, start.saturating_sub(offset));
                let to = floor_char_boundary(text, (end - offset).min(text.len()));
                Token::Field {
                    text: text.get(from..to).unwrap_or(""),
                    offset: offset + from,
                }
            }
            marker => marker,
        })
        .collect()
}

/// Largest char boundary of `text` not past `index`
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// First offset of each marker in a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerIndex {
    pub time: Option<usize>,
    pub tdc: Option<usize>,
    pub adc: Option<usize>,
    pub count: Option<usize>,
}

impl MarkerIndex {
    pub fn from_tokens(tokens: &[Token<'_>]) -> Self {
        let mut index = Self::default();
        for token in tokens {
            if let Token::Marker { marker, offset } = *token {
                let slot = index.slot_mut(marker);
                if slot.is_none() {
                    *slot = Some(offset);
                }
            }
        }
        index
    }

    pub fn get(&self, marker: Marker) -> Option<usize> {
        match marker {
            Marker::Time => self.time,
            Marker::Tdc => self.tdc,
            Marker::Adc => self.adc,
            Marker::Count => self.count,
        }
    }

    fn slot_mut(&mut self, marker: Marker) -> &mut Option<usize> {
        match marker {
            Marker::Time => &mut self.time,
            Marker::Tdc => &mut self.tdc,
            Marker::Adc => &mut self.adc,
            Marker::Count => &mut self.count,
        }
    }

    /// The marker found first past index 0, where the frame data begins
    pub fn data_start(&self) -> Option<(Marker, usize)> {
        Marker::ALL
            .iter()
            .filter_map(|&marker| self.get(marker).map(|offset| (marker, offset)))
            .filter(|&(_, offset)| offset > 0)
            .min_by_key(|&(_, offset)| offset)
    }

    /// Where the frame payload begins
    ///
    /// Same as [`data_start`](Self::data_start), except that a frame with no
    /// `u` marker that opens directly on `t` or `v` (raw device output) starts
    /// at index 0.
    pub fn frame_start(&self) -> Option<(Marker, usize)> {
        if self.time.is_none() {
            for marker in [Marker::Tdc, Marker::Adc] {
                if self.get(marker) == Some(0) {
                    return Some((marker, 0));
                }
            }
        }
        self.data_start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_frame() {
        let tokens = tokenize("u2001.5t0av14$1");
        assert_eq!(
            tokens,
            vec![
                Token::Marker { marker: Marker::Time, offset: 0 },
                Token::Field { text: "2001.5", offset: 1 },
                Token::Marker { marker: Marker::Tdc, offset: 7 },
                Token::Field { text: "0a", offset: 8 },
                Token::Marker { marker: Marker::Adc, offset: 10 },
                Token::Field { text: "14", offset: 11 },
                Token::Marker { marker: Marker::Count, offset: 13 },
                Token::Field { text: "1", offset: 14 },
            ]
        );
    }

    #[test]
    fn test_adjacent_markers_and_empty_line() {
        assert!(tokenize("").is_empty());
        let tokens = tokenize("tv$");
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|t| matches!(t, Token::Marker { .. })));
    }

    #[test]
    fn test_first_marker_wins() {
        let index = MarkerIndex::from_tokens(&tokenize("u1t2v3t4v5$2"));
        assert_eq!(index.time, Some(0));
        assert_eq!(index.tdc, Some(2));
        assert_eq!(index.adc, Some(4));
        assert_eq!(index.count, Some(10));
    }

    #[test]
    fn test_data_start_ignores_index_zero() {
        let index = MarkerIndex::from_tokens(&tokenize("u123$4"));
        assert_eq!(index.data_start(), Some((Marker::Count, 4)));

        let index = MarkerIndex::from_tokens(&tokenize("t12v3$1"));
        assert_eq!(index.data_start(), Some((Marker::Adc, 3)));

        assert_eq!(MarkerIndex::from_tokens(&tokenize("garbage")).data_start(), None);
    }

    #[test]
    fn test_frame_start_of_untimed_frame() {
        let index = MarkerIndex::from_tokens(&tokenize("t0av14$1"));
        assert_eq!(index.frame_start(), Some((Marker::Tdc, 0)));

        let index = MarkerIndex::from_tokens(&tokenize("u1t0av14$1"));
        assert_eq!(index.frame_start(), Some((Marker::Tdc, 2)));
    }

    #[test]
    fn test_tokens_between_clips_fields() {
        let tokens = tokenize("u12t0av14x$1");
        let payload = tokens_between(&tokens, 4, 10);
        assert_eq!(
            payload,
            vec![
                Token::Field { text: "0a", offset: 4 },
                Token::Marker { marker: Marker::Adc, offset: 6 },
                Token::Field { text: "14x", offset: 7 },
            ]
        );

        let trimmed = tokens_between(&tokens, 4, 9);
        assert_eq!(trimmed.last(), Some(&Token::Field { text: "14", offset: 7 }));
    }

    #[test]
    fn test_tokens_between_clips_on_char_boundary() {
        // the cut at 8 falls inside the two-byte character at 7
        let tokens = tokenize("u1t0av1\u{e9}$1");
        let payload = tokens_between(&tokens, 2, 8);
        assert_eq!(payload.last(), Some(&Token::Field { text: "1", offset: 6 }));
    }
}
