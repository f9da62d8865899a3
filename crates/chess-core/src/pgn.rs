//! PGN movetext utilities: regex-based extraction of the main line.

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PgnError {
    #[error("Unrecognized movetext token {token:?} after {ply} moves")]
    UnknownToken { ply: usize, token: String },

    #[error("Unbalanced '{0}' in movetext")]
    Unbalanced(char),

    #[error("Movetext pattern error: {0}")]
    Pattern(String),
}

struct Patterns {
    header: Regex,
    move_number: Regex,
    result: Regex,
    nag: Regex,
    san: Regex,
}

impl Patterns {
    fn new() -> Result<Self, PgnError> {
        let compile = |p: &str| Regex::new(p).map_err(|e| PgnError::Pattern(e.to_string()));
        Ok(Self {
            header: compile(r"\[[^\]]*\]")?,
            move_number: compile(r"^\d+\.+")?,
            result: compile(r"^(?:1-0|0-1|1/2-1/2|\*)$")?,
            nag: compile(r"^\$\d+$")?,
            san: compile(
                r"^(?:[KQRBN][a-h]?[1-8]?x?[a-h][1-8]|[a-h](?:x[a-h])?[1-8](?:=?[QRBN])?|O-O(?:-O)?)[+#]?$",
            )?,
        })
    }
}

/// Split movetext into tokens, dropping comments and recording the
/// variation depth each token was found at.
fn tokenize(text: &str) -> Result<Vec<(usize, String)>, PgnError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = text.chars();

    let flush = |current: &mut String, tokens: &mut Vec<(usize, String)>, depth: usize| {
        if !current.is_empty() {
            tokens.push((depth, std::mem::take(current)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                flush(&mut current, &mut tokens, depth);
                if !chars.by_ref().any(|c| c == '}') {
                    return Err(PgnError::Unbalanced('{'));
                }
            }
            ';' => {
                flush(&mut current, &mut tokens, depth);
                chars.by_ref().find(|&c| c == '\n');
            }
            '(' => {
                flush(&mut current, &mut tokens, depth);
                depth += 1;
            }
            ')' => {
                flush(&mut current, &mut tokens, depth);
                depth = depth.checked_sub(1).ok_or(PgnError::Unbalanced(')'))?;
            }
            '}' => return Err(PgnError::Unbalanced('}')),
            c if c.is_whitespace() => flush(&mut current, &mut tokens, depth),
            c => current.push(c),
        }
    }
    flush(&mut current, &mut tokens, depth);

    if depth > 0 {
        return Err(PgnError::Unbalanced('('));
    }
    Ok(tokens)
}

/// Extract the main-line SAN moves from PGN text. Tag pairs, comments,
/// variations, move numbers, NAGs and `!?` suffixes are skipped; anything
/// else that is not a SAN move is an error. Zero-style castling (`0-0`) is
/// read as `O-O`. Extraction stops at the game result.
pub fn extract_moves(pgn: &str) -> Result<Vec<String>, PgnError> {
    let patterns = Patterns::new()?;
    let movetext = patterns.header.replace_all(pgn, "");
    let mut moves = Vec::new();

    for (depth, raw) in tokenize(&movetext)? {
        if depth > 0 {
            continue;
        }
        let token = patterns.move_number.replace(&raw, "");
        if token.is_empty() || patterns.nag.is_match(&token) {
            continue;
        }
        if patterns.result.is_match(&token) {
            break;
        }

        let san = token.trim_end_matches(['!', '?']);
        let san = match san.strip_prefix("0-0") {
            Some(rest) => format!("O-O{}", rest.replace('0', "O")),
            None => san.to_string(),
        };
        if !patterns.san.is_match(&san) {
            return Err(PgnError::UnknownToken {
                ply: moves.len(),
                token: raw,
            });
        }
        moves.push(san);
    }

    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_moves_basic() {
        let pgn = r#"[White "Player1"]
[Black "Player2"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. O-O 1-0"#;

        let moves = extract_moves(pgn).unwrap();
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "O-O"]);
    }

    #[test]
    fn test_extract_moves_strips_comments_and_variations() {
        let pgn = "1. e4 {best by test} e5 (1... c5 (1... e6) 2. Nf3) 2. Qh5 Nc6 3. Bc4 Nf6?? $4 4. Qxf7# 1-0";
        let moves = extract_moves(pgn).unwrap();
        assert_eq!(moves, vec!["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7#"]);
    }

    #[test]
    fn test_extract_moves_promotion() {
        let moves = extract_moves("57. e8=Q+ Kxe8 *").unwrap();
        assert_eq!(moves, vec!["e8=Q+", "Kxe8"]);
    }

    #[test]
    fn test_zero_castling_and_compact_numbers() {
        let moves = extract_moves("1.e4 e5 2.Nf3 Nf6 3.Bc4 Bc5 4.0-0 0-0 ; rest\n*").unwrap();
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nf6", "Bc4", "Bc5", "O-O", "O-O"]);
        assert_eq!(extract_moves("30. 0-0-0+ *").unwrap(), vec!["O-O-O+"]);
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let err = extract_moves("1. e4 e5 2. nf3 *").unwrap_err();
        assert_eq!(err, PgnError::UnknownToken { ply: 2, token: "nf3".to_string() });

        let err = extract_moves("1. e4 e5 2. Nf3 zz Nc6").unwrap_err();
        assert!(matches!(err, PgnError::UnknownToken { ply: 3, .. }));
    }

    #[test]
    fn test_unbalanced_movetext() {
        assert_eq!(extract_moves("1. e4 (1. d4 e5"), Err(PgnError::Unbalanced('(')));
        assert_eq!(extract_moves("1. e4 ) e5"), Err(PgnError::Unbalanced(')')));
        assert_eq!(extract_moves("1. e4 {open"), Err(PgnError::Unbalanced('{')));
    }

    #[test]
    fn test_result_only_is_empty() {
        assert!(extract_moves("[Result \"*\"]\n\n*").unwrap().is_empty());
    }
}
