use thiserror::Error;

use crate::domain::Move;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no recognized moves in instruction")]
    NoMoves,
}

/// Repeat counts beyond the grid's reach never change the outcome; anything
/// above this bound is clamped before expansion.
const MAX_REPEAT: u32 = 16;

fn direction(token: &str) -> Option<Move> {
    match token {
        "prawo" => Some(Move::Right),
        "lewo" => Some(Move::Left),
        "dół" | "dol" => Some(Move::Down),
        "górę" | "gora" | "gore" => Some(Move::Up),
        _ => None,
    }
}

/// Parses a movement instruction into an ordered move list.
///
/// The text is lowercased and split into punctuation-trimmed tokens. A run of
/// consecutive tokens `<digits> ["razy"] ["w"] <direction>` expands to the
/// direction repeated `<digits>` times and marks every token of the run
/// consumed; afterwards each direction token left unconsumed contributes a
/// single move. Counted expansions precede the bare moves in the output, each
/// group in the order found in the text. A direction word can therefore never
/// be counted twice: consumption is tracked per token occurrence.
pub fn parse_instruction(text: &str) -> Result<Vec<Move>, ParseError> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .collect();

    let mut consumed = vec![false; tokens.len()];
    let mut moves = Vec::new();

    for start in 0..tokens.len() {
        if consumed[start] || !tokens[start].bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(count) = tokens[start].parse::<u32>() else {
            continue;
        };
        let mut next = start + 1;
        if tokens.get(next).copied() == Some("razy") {
            next += 1;
        }
        if tokens.get(next).copied() == Some("w") {
            next += 1;
        }
        let Some(mv) = tokens.get(next).copied().and_then(direction) else {
            continue;
        };
        for idx in start..=next {
            consumed[idx] = true;
        }
        moves.extend(std::iter::repeat(mv).take(count.min(MAX_REPEAT) as usize));
    }

    for (idx, token) in tokens.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        if let Some(mv) = direction(token) {
            moves.push(mv);
        }
    }

    if moves.is_empty() {
        return Err(ParseError::NoMoves);
    }
    Ok(moves)
}
