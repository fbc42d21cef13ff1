use rand::distr::Alphanumeric;
use rand::Rng;

use crate::constants::{PLAYER_NAME_MAX_LEN, ROOM_ID_LEN};

pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(PLAYER_NAME_MAX_LEN).collect()
}

pub fn split_field_words(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

pub fn make_room_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(ROOM_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

pub fn make_seed() -> i64 {
    rand::rng().random()
}

pub fn is_valid_room_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= 64
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_applies_trim_empty_and_max_len() {
        assert_eq!(sanitize_name(""), "Player");
        assert_eq!(sanitize_name("   "), "Player");
        assert_eq!(sanitize_name(" Alice "), "Alice");
        assert_eq!(sanitize_name("12345678901234567890"), "1234567890123456");
    }

    #[test]
    fn split_field_words_ignores_extra_whitespace() {
        assert_eq!(split_field_words(" a  b\tc \n"), vec!["a", "b", "c"]);
        assert!(split_field_words("   ").is_empty());
    }

    #[test]
    fn room_ids_are_short_lowercase_and_valid() {
        let id = make_room_id();
        assert_eq!(id.len(), ROOM_ID_LEN);
        assert_eq!(id, id.to_ascii_lowercase());
        assert!(is_valid_room_id(&id));
        assert_ne!(make_room_id(), make_room_id());
    }

    #[test]
    fn room_id_validation() {
        assert!(!is_valid_room_id(""));
        assert!(!is_valid_room_id("../etc"));
        assert!(!is_valid_room_id(&"a".repeat(65)));
        assert!(is_valid_room_id("abc-123_x"));
    }
}
