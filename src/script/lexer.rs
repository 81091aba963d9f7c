//! Very small hand-written lexer for NPC scripts.
//!
//! Keywords are not recognised here: `say`, `if`, `endshop`, … all come out
//! as `Ident` and the parser interprets them.
//
//  Lexical items:
//
//      Ident    ::= [A-Za-z_][A-Za-z0-9_]*
//      Number   ::= '-'? [0-9]+          (fits in i64)
//      Text     ::= '{' .*? '}'          (no nesting; may span lines)
//      Bang     ::= '!' Ident
//      Symbol   ::= '=' | '<' | '>'
//
//  Whitespace, ';' separators and comments (# until end-of-line) are discarded.

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Number(i64),
    Text(String), // everything between { … }
    Bang(String), // '!flag_X'
    Symbol(char),
    Eof,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            finished: false,
        }
    }

    /// Line of the next unread character, 1-based.
    pub fn line(&self) -> usize {
        self.line
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                c if c.is_whitespace() || c == ';' => {
                    self.next_char();
                }
                '#' => {
                    while let Some(c) = self.next_char() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self, first: char) -> String {
        let mut id = String::new();
        id.push(first);
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_', &mut id);
        id
    }

    fn read_number(&mut self, first: char) -> Result<i64, String> {
        let mut num = String::new();
        num.push(first);
        self.consume_while(|c| c.is_ascii_digit(), &mut num);
        num.parse()
            .map_err(|_| format!("line {}: number {num} is out of range", self.line))
    }

    fn read_text(&mut self) -> Result<String, String> {
        let start = self.line;
        let mut txt = String::new();
        while let Some(c) = self.next_char() {
            if c == '}' {
                return Ok(txt);
            }
            txt.push(c);
        }
        Err(format!("line {start}: no closing }} found"))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        self.skip_trivia();

        let Some(ch) = self.next_char() else {
            self.finished = true;
            return Some(Ok(Token::Eof));
        };

        let tok_res = match ch {
            '!' => match self.next_char() {
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    Ok(Token::Bang(self.read_identifier(c)))
                }
                _ => Err(format!("line {}: expected a flag after '!'", self.line)),
            },
            '{' => self.read_text().map(Token::Text),
            '=' | '<' | '>' => Ok(Token::Symbol(ch)),
            '-' => match self.peek_char() {
                Some(c) if c.is_ascii_digit() => self.read_number('-').map(Token::Number),
                _ => Err(format!("line {}: stray '-'", self.line)),
            },
            c if c.is_ascii_digit() => self.read_number(c).map(Token::Number),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(Token::Ident(self.read_identifier(c))),
            e => Err(format!("line {}: unexpected character {e:?}", self.line)),
        };

        if tok_res.is_err() {
            self.finished = true;
        }
        Some(tok_res)
    }
}
