//! Recursive-descent parser: token stream → `TaskDefinition`.
//!
//! `Indent` tokens carry no grammatical meaning — they only disambiguated comments and blank
//! lines at the lexer stage — so the cursor skips over them transparently everywhere a real
//! token is expected. Nesting of `if` blocks is grammatically legal here; rejecting it is the
//! validator's job, keeping structural acceptance and semantic rejection in separate passes.

use crate::ast::{Action, ErrorHandler, Step, TaskDefinition, Token, TokenKind, ValueRef};
use crate::error::ParseError;

const ACTION_KEYWORDS: &[&str] = &[
    "expect", "click", "double-click", "right-click", "type", "select", "key", "extract",
    "output", "screenshot", "abort", "if",
];

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn skip_indent(&mut self) {
        while self.pos < self.tokens.len() - 1 && matches!(self.tokens[self.pos].kind, TokenKind::Indent(_)) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> &Token {
        self.skip_indent();
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        self.skip_indent();
        let idx = self.pos.min(self.tokens.len() - 1);
        let tok = self.tokens[idx].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn line(&mut self) -> usize {
        self.peek().line
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn is_keyword(&mut self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(k) if k == word)
    }

    fn expect_keyword(&mut self, word: &str) -> Result<usize, ParseError> {
        let line = self.line();
        match self.advance().kind {
            TokenKind::Keyword(k) if k == word => Ok(line),
            other => Err(ParseError::new(line, format!("expected keyword `{word}`, found {other}"))),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        let line = self.line();
        match self.advance().kind {
            TokenKind::StringLiteral(s) => Ok(s),
            other => Err(ParseError::new(line, format!("expected a string literal, found {other}"))),
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let line = self.line();
        match self.advance().kind {
            TokenKind::Identifier(s) => Ok(s),
            other => Err(ParseError::new(line, format!("expected an identifier, found {other}"))),
        }
    }

    fn expect_integer(&mut self) -> Result<i64, ParseError> {
        let line = self.line();
        match self.advance().kind {
            TokenKind::Integer(n) => Ok(n),
            other => Err(ParseError::new(line, format!("expected an integer, found {other}"))),
        }
    }

    fn expect_keycombo(&mut self) -> Result<String, ParseError> {
        let line = self.line();
        match self.advance().kind {
            TokenKind::KeyCombo(c) => Ok(c),
            other => Err(ParseError::new(line, format!("expected a key combo, found {other}"))),
        }
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        let line = self.line();
        match self.peek().kind {
            TokenKind::Newline => {
                self.skip_newlines();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            ref other => Err(ParseError::new(line, format!("expected end of line, found {other}"))),
        }
    }

    fn error<T>(&mut self, msg: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError::new(self.line(), msg.into()))
    }
}

/// Parses a full token stream (as produced by [`crate::lexer::lex`]) into a `TaskDefinition`.
pub fn parse(tokens: &[Token], file_name: impl Into<String>) -> Result<TaskDefinition, ParseError> {
    let mut cur = Cursor::new(tokens);
    cur.skip_newlines();

    cur.expect_keyword("task")?;
    let name = cur.expect_string()?;
    cur.expect_newline()?;

    let mut task = TaskDefinition::new(name, file_name);

    if cur.is_keyword("input") {
        task.inputs = parse_input(&mut cur)?;
    }

    while cur.is_keyword("step") {
        task.steps.push(parse_step(&mut cur)?);
    }

    while cur.is_keyword("on") {
        let (kind, handler) = parse_handler(&mut cur)?;
        match kind {
            HandlerKind::Timeout => task.on_timeout = Some(handler),
            HandlerKind::Error => task.on_error = Some(handler),
        }
    }

    let kind = cur.peek().kind.clone();
    match kind {
        TokenKind::Eof => Ok(task),
        other => cur.error(format!("unexpected trailing input: {other}")),
    }
}

fn parse_input(cur: &mut Cursor) -> Result<Vec<String>, ParseError> {
    cur.expect_keyword("input")?;
    let mut names = vec![cur.expect_identifier()?];
    while matches!(cur.peek().kind, TokenKind::Comma) {
        cur.advance();
        names.push(cur.expect_identifier()?);
    }
    cur.expect_newline()?;
    Ok(names)
}

fn parse_step(cur: &mut Cursor) -> Result<Step, ParseError> {
    cur.expect_keyword("step")?;
    let description = cur.expect_string()?;
    cur.expect_newline()?;

    let timeout_seconds = if cur.is_keyword("timeout") {
        cur.advance();
        let n = cur.expect_integer()?;
        cur.expect_newline()?;
        Some(n as u32)
    } else {
        None
    };

    let actions = parse_actions(cur)?;
    Ok(Step { description, timeout_seconds, actions })
}

enum HandlerKind {
    Timeout,
    Error,
}

fn parse_handler(cur: &mut Cursor) -> Result<(HandlerKind, ErrorHandler), ParseError> {
    cur.expect_keyword("on")?;
    let line = cur.line();
    let kind = match cur.advance().kind {
        TokenKind::Keyword(k) if k == "timeout" => HandlerKind::Timeout,
        TokenKind::Keyword(k) if k == "error" => HandlerKind::Error,
        other => return Err(ParseError::new(line, format!("expected `timeout` or `error`, found {other}"))),
    };
    cur.expect_newline()?;
    let actions = parse_actions(cur)?;
    Ok((kind, ErrorHandler { actions }))
}

fn parse_actions(cur: &mut Cursor) -> Result<Vec<Action>, ParseError> {
    let mut actions = Vec::new();
    loop {
        let is_action_start = match &cur.peek().kind {
            TokenKind::Keyword(k) => ACTION_KEYWORDS.contains(&k.as_str()),
            _ => false,
        };
        if !is_action_start {
            break;
        }
        actions.push(parse_action(cur)?);
    }
    Ok(actions)
}

fn parse_action(cur: &mut Cursor) -> Result<Action, ParseError> {
    let keyword = match &cur.peek().kind {
        TokenKind::Keyword(k) => k.clone(),
        _ => unreachable!("parse_action only called when peek is an action keyword"),
    };

    match keyword.as_str() {
        "expect" => {
            cur.advance();
            let description = cur.expect_string()?;
            cur.expect_newline()?;
            Ok(Action::Expect { description })
        }
        "click" => {
            cur.advance();
            let target = cur.expect_string()?;
            cur.expect_newline()?;
            Ok(Action::Click { target })
        }
        "double-click" => {
            cur.advance();
            let target = cur.expect_string()?;
            cur.expect_newline()?;
            Ok(Action::DoubleClick { target })
        }
        "right-click" => {
            cur.advance();
            let target = cur.expect_string()?;
            cur.expect_newline()?;
            Ok(Action::RightClick { target })
        }
        "type" => {
            cur.advance();
            let value = parse_value(cur)?;
            let append = if cur.is_keyword("append") {
                cur.advance();
                true
            } else {
                false
            };
            cur.expect_keyword("into")?;
            let target = cur.expect_string()?;
            cur.expect_newline()?;
            Ok(Action::Type { value, target, append })
        }
        "select" => {
            cur.advance();
            let value = parse_value(cur)?;
            cur.expect_keyword("in")?;
            let target = cur.expect_string()?;
            cur.expect_newline()?;
            Ok(Action::Select { value, target })
        }
        "key" => {
            cur.advance();
            let key_combo = cur.expect_keycombo()?;
            cur.expect_newline()?;
            Ok(Action::Key { key_combo })
        }
        "extract" => {
            cur.advance();
            let variable_name = cur.expect_identifier()?;
            cur.expect_keyword("from")?;
            let source = cur.expect_string()?;
            cur.expect_newline()?;
            Ok(Action::Extract { variable_name, source })
        }
        "output" => {
            cur.advance();
            let variable_name = cur.expect_identifier()?;
            cur.expect_newline()?;
            Ok(Action::Output { variable_name })
        }
        "screenshot" => {
            cur.advance();
            cur.expect_newline()?;
            Ok(Action::Screenshot)
        }
        "abort" => {
            cur.advance();
            let message = cur.expect_string()?;
            cur.expect_newline()?;
            Ok(Action::Abort { message })
        }
        "if" => parse_if(cur),
        other => cur.error(format!("unhandled action keyword `{other}`")),
    }
}

fn parse_value(cur: &mut Cursor) -> Result<ValueRef, ParseError> {
    let line = cur.line();
    match cur.advance().kind {
        TokenKind::StringLiteral(s) => Ok(ValueRef::literal(s)),
        TokenKind::Identifier(s) => Ok(ValueRef::param(s)),
        other => Err(ParseError::new(line, format!("expected a string literal or identifier, found {other}"))),
    }
}

fn parse_if(cur: &mut Cursor) -> Result<Action, ParseError> {
    cur.expect_keyword("if")?;
    cur.expect_keyword("screen")?;
    cur.expect_keyword("shows")?;
    let condition = cur.expect_string()?;
    cur.expect_newline()?;

    let then_actions = parse_actions(cur)?;

    let else_actions = if cur.is_keyword("else") {
        cur.advance();
        cur.expect_newline()?;
        Some(parse_actions(cur)?)
    } else {
        None
    };

    cur.expect_keyword("end")?;
    cur.expect_newline()?;

    Ok(Action::IfScreenShows { condition, then_actions, else_actions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(src: &str) -> Result<TaskDefinition, ParseError> {
        let tokens = lex(src).expect("lex should succeed in these fixtures");
        parse(&tokens, "test.mbl")
    }

    #[test]
    fn minimal_click_task() {
        let task = parse_source("task \"T\"\n step \"s\"\n  click \"Save\"\n").unwrap();
        assert_eq!(task.name, "T");
        assert_eq!(task.steps.len(), 1);
        assert_eq!(task.steps[0].actions, vec![Action::Click { target: "Save".into() }]);
    }

    #[test]
    fn step_timeout_and_inputs() {
        let task = parse_source(
            "task \"T\"\n input name, amount\n step \"s\"\n  timeout 30\n  click \"Save\"\n",
        )
        .unwrap();
        assert_eq!(task.inputs, vec!["name".to_string(), "amount".to_string()]);
        assert_eq!(task.steps[0].timeout_seconds, Some(30));
    }

    #[test]
    fn type_with_param_and_append() {
        let task = parse_source(
            "task \"T\"\n input name\n step \"s\"\n  type name append into \"Field\"\n",
        )
        .unwrap();
        assert_eq!(
            task.steps[0].actions,
            vec![Action::Type {
                value: ValueRef::param("name"),
                target: "Field".into(),
                append: true,
            }]
        );
    }

    #[test]
    fn extract_then_output() {
        let task = parse_source(
            "task \"T\"\n step \"s\"\n  extract total from \"Total\"\n  output total\n",
        )
        .unwrap();
        assert_eq!(
            task.steps[0].actions,
            vec![
                Action::Extract { variable_name: "total".into(), source: "Total".into() },
                Action::Output { variable_name: "total".into() },
            ]
        );
    }

    #[test]
    fn if_else_end_block() {
        let task = parse_source(
            "task \"T\"\n step \"s\"\n  if screen shows \"Dialog\"\n   click \"OK\"\n  else\n   click \"Cancel\"\n  end\n",
        )
        .unwrap();
        match &task.steps[0].actions[0] {
            Action::IfScreenShows { condition, then_actions, else_actions } => {
                assert_eq!(condition, "Dialog");
                assert_eq!(then_actions, &vec![Action::Click { target: "OK".into() }]);
                assert_eq!(else_actions, &Some(vec![Action::Click { target: "Cancel".into() }]));
            }
            other => panic!("expected IfScreenShows, got {other:?}"),
        }
    }

    #[test]
    fn nested_if_parses_successfully_validator_rejects_later() {
        let task = parse_source(
            "task \"T\"\n step \"s\"\n  if screen shows \"a\"\n   if screen shows \"b\"\n    click \"x\"\n   end\n  end\n",
        )
        .unwrap();
        match &task.steps[0].actions[0] {
            Action::IfScreenShows { then_actions, .. } => {
                assert!(matches!(then_actions[0], Action::IfScreenShows { .. }));
            }
            other => panic!("expected IfScreenShows, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_handler_last_wins() {
        let task = parse_source(
            "task \"T\"\n step \"s\"\n  click \"x\"\n on timeout\n  abort \"first\"\n on timeout\n  abort \"second\"\n",
        )
        .unwrap();
        let handler = task.on_timeout.expect("on timeout handler should be present");
        assert_eq!(handler.actions, vec![Action::Abort { message: "second".into() }]);
    }

    #[test]
    fn key_combo_action() {
        let task = parse_source("task \"T\"\n step \"s\"\n  key Ctrl+C\n").unwrap();
        assert_eq!(task.steps[0].actions, vec![Action::Key { key_combo: "Ctrl+C".into() }]);
    }

    #[test]
    fn missing_string_after_click_is_a_parse_error() {
        let err = parse_source("task \"T\"\n step \"s\"\n  click\n").unwrap_err();
        assert!(err.message.contains("expected a string literal"));
    }

    #[test]
    fn on_error_handler_is_distinguished_from_on_timeout() {
        let task = parse_source(
            "task \"T\"\n step \"s\"\n  click \"x\"\n on error\n  abort \"e\"\n on timeout\n  abort \"t\"\n",
        )
        .unwrap();
        assert_eq!(task.on_error.unwrap().actions, vec![Action::Abort { message: "e".into() }]);
        assert_eq!(task.on_timeout.unwrap().actions, vec![Action::Abort { message: "t".into() }]);
    }
}
