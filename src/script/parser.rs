//! Parser that consumes the lexer and builds a `Script` AST.

use super::ast::*;
use super::lexer::{Lexer, Token};
use crate::error::ScriptError;
use crate::model::Direction;

/// Parse one script source. Errors name the script and the line.
pub fn parse_script(name: &str, src: &str) -> Result<Script, ScriptError> {
    let mut p = Parser::new(src);
    let body = p.parse().map_err(|message| ScriptError::Parse {
        script: name.to_string(),
        message,
    })?;
    Ok(Script {
        name: name.to_string(),
        body,
    })
}

struct Parser<'a> {
    lex: Lexer<'a>,
    peeked: Option<Token>,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            lex: Lexer::new(src),
            peeked: None,
            line: 1,
        }
    }

    fn parse(&mut self) -> Result<Vec<Cmd>, String> {
        let (body, _) = self.parse_block(&[])?;
        Ok(body)
    }

    /// Statements up to one of `terminators` (consumed and returned) or EOF
    /// when `terminators` is empty.
    fn parse_block(&mut self, terminators: &[&str]) -> Result<(Vec<Cmd>, String), String> {
        let mut res = Vec::<Cmd>::new();
        loop {
            match self.peek_token()? {
                Token::Eof if terminators.is_empty() => return Ok((res, String::new())),
                Token::Eof => {
                    return Err(self.error(format!(
                        "unexpected end of script, expected {}",
                        terminators.join(" or ")
                    )));
                }
                Token::Ident(word) if terminators.contains(&word.as_str()) => {
                    let word = word.clone();
                    self.next_token()?;
                    return Ok((res, word));
                }
                _ => res.push(self.parse_cmd()?),
            }
        }
    }

    fn parse_cmd(&mut self) -> Result<Cmd, String> {
        let token = self.next_token()?;
        let cmd = match token {
            Token::Ident(ident) => match ident.as_str() {
                "log" => Cmd::Log {
                    text: self.parse_text()?,
                },
                "say" => Cmd::Say {
                    text: self.parse_text()?,
                },
                "ask" => self.parse_ask()?,
                "shop" => self.parse_shop()?,
                "battle" => Cmd::Battle,
                "give" => Cmd::Give {
                    item: self.parse_text()?,
                    count: self.parse_count("item count")?,
                },
                "sound" => Cmd::Sound {
                    name: self.parse_text()?,
                },
                "music" => Cmd::Music {
                    name: self.parse_text()?,
                },
                "move" => Cmd::Move {
                    dir: self.parse_direction()?,
                },
                "face" => self.parse_face()?,
                "speed" => Cmd::Speed {
                    ticks: self.parse_count("speed")?,
                },
                "setstat" => Cmd::SetStat {
                    stat: self.parse_ident("statistic name")?,
                    value: self.parse_stat_value()?,
                },
                "addstat" => Cmd::AddStat {
                    stat: self.parse_ident("statistic name")?,
                    delta: self.parse_stat_value()?,
                },
                "setflag" | "unsetflag" => self.parse_flag_cmd(&ident)?,
                "if" => self.parse_if()?,
                "fail" => Cmd::Fail {
                    message: self.parse_text()?,
                },
                "end" => Cmd::End,
                t => return Err(self.error(format!("invalid command: {t}"))),
            },
            other => return Err(self.error(format!("expected a command, found {other:?}"))),
        };

        Ok(cmd)
    }

    fn parse_ask(&mut self) -> Result<Cmd, String> {
        let question = self.parse_text()?;
        let mut options = Vec::new();
        while let Token::Text(_) = self.peek_token()? {
            options.push(self.parse_text()?);
        }
        if options.is_empty() {
            return Err(self.error("ask needs at least one option".to_string()));
        }
        Ok(Cmd::Ask { question, options })
    }

    fn parse_shop(&mut self) -> Result<Cmd, String> {
        let mut shop = ShopDescriptor {
            trader: self.parse_text()?,
            ..ShopDescriptor::default()
        };
        loop {
            match self.next_token()? {
                Token::Ident(word) if word == "sell" => shop.selling.push(ShopItem {
                    item: self.parse_text()?,
                    price: self.parse_count("price")?,
                    count: self.parse_count("stock")?,
                }),
                Token::Ident(word) if word == "bonus" => shop.buy_bonuses.push(BuyBonus {
                    item: self.parse_text()?,
                    percent: self.parse_count("bonus percent")?,
                }),
                Token::Ident(word) if word == "endshop" => break,
                other => {
                    return Err(self.error(format!(
                        "expected sell, bonus or endshop, found {other:?}"
                    )));
                }
            }
        }
        Ok(Cmd::Shop(shop))
    }

    fn parse_face(&mut self) -> Result<Cmd, String> {
        let word = self.parse_ident("direction or player")?;
        let target = match word.as_str() {
            "player" => FaceTarget::Player,
            other => FaceTarget::Dir(
                Direction::parse(other)
                    .ok_or_else(|| self.error(format!("invalid direction: {other}")))?,
            ),
        };
        Ok(Cmd::Face { target })
    }

    fn parse_if(&mut self) -> Result<Cmd, String> {
        let condition = self.parse_condition()?;
        match self.next_token()? {
            Token::Ident(word) if word == "then" => {}
            other => return Err(self.error(format!("expected then, found {other:?}"))),
        }

        let (then_branch, ended_by) = self.parse_block(&["else", "endif"])?;
        let branches = if ended_by == "else" {
            let (else_branch, _) = self.parse_block(&["endif"])?;
            Branch::ThenElse(then_branch, else_branch)
        } else {
            Branch::Then(then_branch)
        };

        Ok(Cmd::If {
            condition,
            branches,
        })
    }

    fn parse_condition(&mut self) -> Result<Condition, String> {
        match self.next_token()? {
            Token::Bang(flag) => Ok(Condition::FlagClear(self.check_flag(flag)?)),
            Token::Ident(word) => match word.as_str() {
                "choice" => {
                    let n = self.parse_number()?;
                    let n = usize::try_from(n)
                        .map_err(|_| self.error(format!("choice {n} must not be negative")))?;
                    Ok(Condition::Choice(n))
                }
                "cancelled" => Ok(Condition::Cancelled),
                "won" => Ok(Condition::Won),
                "lost" => Ok(Condition::Lost),
                "stat" => {
                    let stat = self.parse_ident("statistic name")?;
                    let cmp = match self.next_token()? {
                        Token::Symbol('=') => Comparison::Eq,
                        Token::Symbol('<') => Comparison::Lt,
                        Token::Symbol('>') => Comparison::Gt,
                        other => {
                            return Err(
                                self.error(format!("expected =, < or >, found {other:?}"))
                            );
                        }
                    };
                    let value = self.parse_stat_value()?;
                    Ok(Condition::Stat { stat, cmp, value })
                }
                _ => Ok(Condition::FlagSet(self.check_flag(word)?)),
            },
            other => Err(self.error(format!("invalid condition: {other:?}"))),
        }
    }

    fn parse_flag_cmd(&mut self, op: &str) -> Result<Cmd, String> {
        let flag = match self.next_token()? {
            Token::Ident(f) => self.check_flag(f)?,
            other => return Err(self.error(format!("invalid flag token: {other:?}"))),
        };

        let cmd = match op {
            "setflag" => Cmd::SetFlag { flag },
            _ => Cmd::UnsetFlag { flag },
        };
        Ok(cmd)
    }

    // ─────────────────────────────────────────────────────
    // token helpers
    // ─────────────────────────────────────────────────────

    fn check_flag(&self, flag: String) -> Result<String, String> {
        if flag.starts_with("flag_") && flag.len() > "flag_".len() {
            Ok(flag)
        } else {
            Err(self.error(format!("flags must look like flag_NAME, found {flag}")))
        }
    }

    fn parse_text(&mut self) -> Result<String, String> {
        match self.next_token()? {
            Token::Text(text) => Ok(text),
            other => Err(self.error(format!("expected {{text}}, found {other:?}"))),
        }
    }

    fn parse_ident(&mut self, what: &str) -> Result<String, String> {
        match self.next_token()? {
            Token::Ident(ident) => Ok(ident),
            other => Err(self.error(format!("expected {what}, found {other:?}"))),
        }
    }

    fn parse_direction(&mut self) -> Result<Direction, String> {
        let word = self.parse_ident("direction")?;
        Direction::parse(&word).ok_or_else(|| self.error(format!("invalid direction: {word}")))
    }

    fn parse_number(&mut self) -> Result<i64, String> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            other => Err(self.error(format!("expected a number, found {other:?}"))),
        }
    }

    fn parse_count(&mut self, what: &str) -> Result<u32, String> {
        let n = self.parse_number()?;
        u32::try_from(n).map_err(|_| self.error(format!("{what} {n} is out of range")))
    }

    fn parse_stat_value(&mut self) -> Result<i32, String> {
        let n = self.parse_number()?;
        i32::try_from(n).map_err(|_| self.error(format!("statistic value {n} is out of range")))
    }

    fn next_token(&mut self) -> Result<Token, String> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        let token = self.lex.next().unwrap_or(Ok(Token::Eof))?;
        self.line = self.lex.line();
        Ok(token)
    }

    fn peek_token(&mut self) -> Result<&Token, String> {
        if self.peeked.is_none() {
            let token = self.next_token()?;
            self.peeked = Some(token);
        }
        Ok(self.peeked.get_or_insert(Token::Eof))
    }

    fn error(&self, message: String) -> String {
        format!("line {}: {message}", self.line)
    }
}
