//! The MBL lexer: turns source text into a flat token stream.
//!
//! Runs line-by-line. Indentation only disambiguates comment/blank lines from action
//! continuations — it carries no block structure, so the lexer never needs a stack of indent
//! levels the way an off-side-rule language would.

use crate::ast::{Token, TokenKind};
use crate::error::LexError;

const KEYWORDS: &[&str] = &[
    "task", "input", "step", "expect", "click", "double-click", "right-click", "type", "into",
    "append", "select", "in", "key", "extract", "from", "output", "screenshot", "abort", "if",
    "screen", "shows", "else", "end", "on", "timeout", "error",
];

/// Canonical spellings of named keys, matched case-sensitively so that the block terminator
/// keyword `end` and the named key `End` never collide (see DESIGN.md Open Question notes).
const NAMED_KEYS: &[&str] = &[
    "Tab", "Enter", "Escape", "Space", "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9",
    "F10", "F11", "F12", "Ctrl", "Alt", "Shift", "Up", "Down", "Left", "Right", "Home", "End",
    "PageUp", "PageDown", "Backspace", "Delete",
];

fn is_named_key(word: &str) -> bool {
    NAMED_KEYS.contains(&word)
}

fn is_single_upper_or_digit(word: &str) -> bool {
    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_ascii_uppercase() || c.is_ascii_digit(),
        _ => false,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenizes an entire MBL source string, returning the flat token stream (including a
/// trailing `Eof`) or the first lexical error encountered.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        lex_line(raw_line, line_no, &mut tokens)?;
    }

    tokens.push(Token::new(TokenKind::Eof, source.lines().count() + 1));
    Ok(tokens)
}

fn lex_line(raw_line: &str, line_no: usize, tokens: &mut Vec<Token>) -> Result<(), LexError> {
    if raw_line.trim().is_empty() {
        return Ok(());
    }

    let chars: Vec<char> = raw_line.chars().collect();
    let mut pos = 0usize;
    let mut indent_width = 0usize;

    while pos < chars.len() && (chars[pos] == ' ' || chars[pos] == '\t') {
        indent_width += if chars[pos] == '\t' { 4 } else { 1 };
        pos += 1;
    }

    if pos >= chars.len() {
        return Ok(());
    }
    if chars[pos] == '#' {
        return Ok(());
    }

    if indent_width > 0 {
        tokens.push(Token::new(TokenKind::Indent(indent_width), line_no));
    }

    while pos < chars.len() {
        let c = chars[pos];

        if c == '#' {
            break;
        }
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        if c == ',' {
            tokens.push(Token::new(TokenKind::Comma, line_no));
            pos += 1;
            continue;
        }
        if c == '"' {
            pos = lex_string(&chars, pos, line_no, tokens)?;
            continue;
        }
        if c.is_ascii_digit() {
            pos = lex_number_or_combo(&chars, pos, line_no, tokens)?;
            continue;
        }
        if is_ident_start(c) {
            pos = lex_word(&chars, pos, line_no, tokens)?;
            continue;
        }

        return Err(LexError::UnexpectedChar { line: line_no, ch: c });
    }

    tokens.push(Token::new(TokenKind::Newline, line_no));
    Ok(())
}

fn lex_string(
    chars: &[char],
    start: usize,
    line_no: usize,
    tokens: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let mut pos = start + 1;
    let content_start = pos;
    while pos < chars.len() && chars[pos] != '"' {
        pos += 1;
    }
    if pos >= chars.len() {
        return Err(LexError::UnterminatedString { line: line_no });
    }
    let content: String = chars[content_start..pos].iter().collect();
    tokens.push(Token::new(TokenKind::StringLiteral(content), line_no));
    Ok(pos + 1)
}

fn scan_run(chars: &[char], start: usize) -> (String, usize) {
    let mut pos = start;
    while pos < chars.len() && is_ident_continue(chars[pos]) {
        pos += 1;
    }
    (chars[start..pos].iter().collect(), pos)
}

/// Greedily consumes `+segment` tails onto an already-identified key-combo head.
fn consume_combo_tail(
    chars: &[char],
    start: usize,
    head: &str,
    line_no: usize,
) -> Result<(String, usize), LexError> {
    let mut combo = head.to_string();
    let mut pos = start;
    while pos < chars.len() && chars[pos] == '+' {
        let (segment, next_pos) = scan_run(chars, pos + 1);
        if segment.is_empty() {
            return Err(LexError::EmptyKeyComboSegment { line: line_no });
        }
        combo.push('+');
        combo.push_str(&segment);
        pos = next_pos;
    }
    Ok((combo, pos))
}

fn lex_number_or_combo(
    chars: &[char],
    start: usize,
    line_no: usize,
    tokens: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let digit_start = start;
    let mut pos = start;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    let digits: String = chars[digit_start..pos].iter().collect();

    let is_combo_start = is_single_upper_or_digit(&digits) && pos < chars.len() && chars[pos] == '+';
    if is_combo_start {
        let (combo, end) = consume_combo_tail(chars, pos, &digits, line_no)?;
        tokens.push(Token::new(TokenKind::KeyCombo(combo), line_no));
        return Ok(end);
    }

    if pos < chars.len() && is_ident_start(chars[pos]) {
        return Err(LexError::MalformedNumber { line: line_no });
    }

    let value: i64 = digits.parse().map_err(|_| LexError::MalformedNumber { line: line_no })?;
    tokens.push(Token::new(TokenKind::Integer(value), line_no));
    Ok(pos)
}

fn lex_word(
    chars: &[char],
    start: usize,
    line_no: usize,
    tokens: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let (word, mut pos) = scan_run(chars, start);

    // "double-click" / "right-click" are hyphen-joined compound keywords recognised as a
    // single token before any other classification, but only when the whole compound is
    // followed by a non-identifier character or end-of-line.
    if pos < chars.len() && chars[pos] == '-' {
        let (second_word, second_end) = scan_run(chars, pos + 1);
        let compound_lower = format!("{}-{}", word.to_lowercase(), second_word.to_lowercase());
        if KEYWORDS.contains(&compound_lower.as_str()) {
            let followed_ok =
                second_end >= chars.len() || !is_ident_continue(chars[second_end]);
            if followed_ok {
                tokens.push(Token::new(TokenKind::Keyword(compound_lower), line_no));
                return Ok(second_end);
            }
        }
    }

    let is_combo_start = is_named_key(&word)
        || (is_single_upper_or_digit(&word) && pos < chars.len() && chars[pos] == '+');
    if is_combo_start {
        let (combo, end) = consume_combo_tail(chars, pos, &word, line_no)?;
        tokens.push(Token::new(TokenKind::KeyCombo(combo), line_no));
        return Ok(end);
    }

    let lower = word.to_lowercase();
    if KEYWORDS.contains(&lower.as_str()) {
        tokens.push(Token::new(TokenKind::Keyword(lower), line_no));
    } else {
        tokens.push(Token::new(TokenKind::Identifier(word), line_no));
    }
    pos = pos.max(start + 1);
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn blank_and_comment_only_lines_produce_no_tokens() {
        let toks = kinds("\n   \n# just a comment\n   # indented comment\n");
        assert_eq!(toks, vec![TokenKind::Eof]);
    }

    #[test]
    fn simple_click_step() {
        let toks = kinds("task \"T\"\n step \"s\"\n  click \"Save\"\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Keyword("task".into()),
                TokenKind::StringLiteral("T".into()),
                TokenKind::Newline,
                TokenKind::Indent(1),
                TokenKind::Keyword("step".into()),
                TokenKind::StringLiteral("s".into()),
                TokenKind::Newline,
                TokenKind::Indent(2),
                TokenKind::Keyword("click".into()),
                TokenKind::StringLiteral("Save".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tab_indent_counts_as_four() {
        let toks = lex("\tclick \"x\"\n").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Indent(4));
    }

    #[test]
    fn double_click_and_right_click_are_single_keywords() {
        let toks = kinds("double-click \"x\"\nright-click \"y\"\n");
        assert_eq!(toks[0], TokenKind::Keyword("double-click".into()));
        assert_eq!(toks[3], TokenKind::Keyword("right-click".into()));
    }

    #[test]
    fn unterminated_string_errors_with_line() {
        let err = lex("click \"unterminated\n").unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { line: 1 });
    }

    #[test]
    fn named_key_alone_is_a_keycombo() {
        let toks = kinds("key End\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Keyword("key".into()),
                TokenKind::KeyCombo("End".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn end_keyword_is_not_confused_with_named_key() {
        let toks = kinds("if screen shows \"x\"\n  click \"y\"\nend\n");
        assert!(toks.contains(&TokenKind::Keyword("end".into())));
        assert!(!toks.iter().any(|k| matches!(k, TokenKind::KeyCombo(c) if c == "end" || c == "End")));
    }

    #[test]
    fn ctrl_plus_c_is_one_keycombo() {
        let toks = kinds("key Ctrl+C\n");
        assert_eq!(toks[1], TokenKind::KeyCombo("Ctrl+C".into()));
    }

    #[test]
    fn single_uppercase_letter_requires_plus_to_be_combo() {
        let toks = kinds("type A into \"Field\"\n");
        // "A" alone (no '+') is a plain identifier, used here as a parameter reference.
        assert_eq!(toks[1], TokenKind::Identifier("A".into()));
    }

    #[test]
    fn single_digit_followed_by_plus_is_combo() {
        let toks = kinds("key 5+Ctrl\n");
        assert_eq!(toks[1], TokenKind::KeyCombo("5+Ctrl".into()));
    }

    #[test]
    fn multi_digit_followed_by_identifier_is_malformed() {
        let err = lex("step \"x\"\n timeout 12abc\n").unwrap_err();
        assert_eq!(err, LexError::MalformedNumber { line: 2 });
    }

    #[test]
    fn inline_comment_truncates_line() {
        let toks = kinds("click \"Save\" # click the save button\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Keyword("click".into()),
                TokenKind::StringLiteral("Save".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unexpected_character_errors() {
        let err = lex("click @\n").unwrap_err();
        assert_eq!(err, LexError::UnexpectedChar { line: 1, ch: '@' });
    }

    #[test]
    fn comma_separated_inputs() {
        let toks = kinds("input a, b, c\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Keyword("input".into()),
                TokenKind::Identifier("a".into()),
                TokenKind::Comma,
                TokenKind::Identifier("b".into()),
                TokenKind::Comma,
                TokenKind::Identifier("c".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }
}
