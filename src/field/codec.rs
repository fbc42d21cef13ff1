use crate::error::CodecError;
use crate::piece::{Token, MAX_TOKEN};

pub const BITS_PER_TOKEN: u32 = u8::BITS - MAX_TOKEN.leading_zeros();
pub const TOKENS_PER_WORD: usize = (u64::BITS / BITS_PER_TOKEN) as usize;

const TOKEN_MASK: u64 = (1 << BITS_PER_TOKEN) - 1;
const WORD_DIGITS: usize = 16;

fn word_count(cells: usize) -> usize {
    cells.div_ceil(TOKENS_PER_WORD)
}

/// Packs tokens most-significant-first. Zero padding occupies the leading
/// slots of the first word so the last cell always lands in the lowest bits.
pub fn encode_words(cells: &[Token]) -> Vec<String> {
    let words = word_count(cells.len()).max(1);
    let padding = words * TOKENS_PER_WORD - cells.len();
    let slots = std::iter::repeat(0).take(padding).chain(cells.iter().copied());

    let mut out = Vec::with_capacity(words);
    let mut word = 0u64;
    for (index, token) in slots.enumerate() {
        word = (word << BITS_PER_TOKEN) | (token as u64 & TOKEN_MASK);
        if (index + 1) % TOKENS_PER_WORD == 0 {
            out.push(format!("{word:016x}"));
            word = 0;
        }
    }
    out
}

fn parse_word(index: usize, word: &str) -> Result<u64, CodecError> {
    let invalid = || CodecError::InvalidWord {
        index,
        word: word.to_string(),
    };
    if word.len() != WORD_DIGITS || !word.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u64::from_str_radix(word, 16).map_err(|_| invalid())
}

pub fn decode_words<S: AsRef<str>>(words: &[S], cells: usize) -> Result<Vec<Token>, CodecError> {
    let parsed = words
        .iter()
        .enumerate()
        .map(|(index, word)| parse_word(index, word.as_ref()))
        .collect::<Result<Vec<u64>, _>>()?;

    let available = parsed.len() * TOKENS_PER_WORD;
    if available < cells {
        return Err(CodecError::NotEnoughWords {
            needed: word_count(cells),
            got: parsed.len(),
        });
    }

    let mut slots = Vec::with_capacity(available);
    for word in parsed {
        for shift in (0..TOKENS_PER_WORD).rev() {
            slots.push(((word >> (shift as u32 * BITS_PER_TOKEN)) & TOKEN_MASK) as Token);
        }
    }

    let tokens = slots.split_off(available - cells);
    if let Some((index, token)) = tokens
        .iter()
        .enumerate()
        .find(|(_, token)| **token > MAX_TOKEN)
    {
        return Err(CodecError::InvalidToken {
            index,
            token: *token,
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::piece::{ALL, TOKEN_BEDROCK};
    use crate::rng::Rng;

    fn field_with(width: usize, height: usize, cells: &[Token]) -> Field {
        let mut field = Field::new(width, height);
        for (index, token) in cells.iter().enumerate() {
            field.set(index % width, index / width, *token);
        }
        field
    }

    #[test]
    fn layout_constants() {
        assert_eq!(BITS_PER_TOKEN, 4);
        assert_eq!(TOKENS_PER_WORD, 16);
    }

    #[test]
    fn encodes_small_fields() {
        let mut cells = [0; 12];
        assert_eq!(field_with(3, 4, &cells).encode64(), vec!["0000000000000000"]);

        cells[0] = 1;
        assert_eq!(field_with(3, 4, &cells).encode64(), vec!["0000100000000000"]);

        cells[0] = 0;
        cells[11] = 1;
        assert_eq!(field_with(3, 4, &cells).encode64(), vec!["0000000000000001"]);

        let cells = [1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4];
        assert_eq!(field_with(3, 4, &cells).encode64(), vec!["0000123456781234"]);

        let cells = [6, 6, 6, 1, 6, 8, 3, 8, 8, 1, 3, 8];
        assert_eq!(field_with(3, 4, &cells).encode64(), vec!["0000666168388138"]);
    }

    #[test]
    fn encodes_multi_word_fields() {
        let cells: Vec<Token> = (0..42).map(|index| (index % 8) as Token + 1).collect();
        assert_eq!(
            field_with(3, 14, &cells).encode64(),
            vec!["0000001234567812", "3456781234567812", "3456781234567812"]
        );
    }

    #[test]
    fn decode_ignores_extra_leading_words() {
        let mut field = Field::new(3, 4);
        field
            .decode64(&["0000000000000000", "0000666168388138"])
            .expect("valid words");
        assert_eq!(field.cells(), &[6, 6, 6, 1, 6, 8, 3, 8, 8, 1, 3, 8]);
        assert_eq!(field.current_bedrock(), 1);
    }

    #[test]
    fn decode_recomputes_bedrock() {
        let cases = [
            ("0000000000000888", 1),
            ("0000000000888888", 2),
            ("0000888888888888", 4),
            ("0000413214888888", 2),
            ("0000000000000000", 0),
        ];
        for (word, expected) in cases {
            let mut field = Field::new(3, 4);
            field.decode64(&[word]).expect("valid word");
            assert_eq!(field.current_bedrock(), expected, "{word}");
        }
    }

    #[test]
    fn decode_rejects_bad_input_without_mutating() {
        let mut field = field_with(3, 4, &[1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4]);
        let before = field.clone();

        assert!(matches!(
            field.decode64(&["00001234567812zz"]),
            Err(CodecError::InvalidWord { index: 0, .. })
        ));
        assert!(matches!(
            field.decode64(&["1234"]),
            Err(CodecError::InvalidWord { .. })
        ));
        assert!(matches!(
            field.decode64(&["0000000000000009"]),
            Err(CodecError::InvalidToken { index: 11, token: 9 })
        ));
        assert!(matches!(
            Field::new(3, 14).decode64(&["0000000000000000"]),
            Err(CodecError::NotEnoughWords { needed: 3, got: 1 })
        ));
        let empty: [&str; 0] = [];
        assert!(field.decode64(&empty).is_err());
        assert_eq!(field, before);
    }

    #[test]
    fn random_fields_round_trip() {
        for seed in 0..200 {
            let mut rng = Rng::new(seed);
            let width = rng.int(1, 12) as usize;
            let height = rng.int(1, 24) as usize;
            let mut field = Field::new(width, height);
            for _ in 0..rng.int(0, 6) {
                let piece = ALL[rng.pick_index(ALL.len())];
                let rotation = rng.int(0, 3);
                let x = rng.int(-1, width as i32);
                let y = rng.int(-1, height as i32);
                if field.can_put_piece(piece, rotation, x, y) {
                    field.put_piece(piece, rotation, x, y);
                }
            }
            field.increase_bedrock(rng.int(0, height as i32 / 2) as usize);

            let words = field.encode64();
            let mut decoded = Field::new(width, height);
            decoded.decode64(&words).expect("round trip");
            assert_eq!(decoded.cells(), field.cells(), "seed {seed}");
            if field.cells().last() != Some(&TOKEN_BEDROCK) {
                assert_eq!(decoded.current_bedrock(), 0);
            }
        }
    }
}
