//! Lowers a `Script` AST into a flat op list.
//!
//! Conditionals become `JumpUnless`/`Jump` pairs with patched targets. Every
//! jump points forward, so a program always runs off its end.

use std::fmt;

use super::ast::{Branch, Cmd, Condition, FaceTarget, Script, ShopDescriptor};
use crate::model::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Log(String),
    Say(String),
    Ask {
        question: String,
        options: Vec<String>,
    },
    Shop(ShopDescriptor),
    Battle,
    Give {
        item: String,
        count: u32,
    },
    Sound(String),
    Music(String),
    Move(Direction),
    Face(FaceTarget),
    Speed(u32),
    SetStat {
        stat: String,
        value: i32,
    },
    AddStat {
        stat: String,
        delta: i32,
    },
    SetFlag(String),
    UnsetFlag(String),
    /// Continue at `target` when `condition` is false.
    JumpUnless {
        condition: Condition,
        target: usize,
    },
    Jump(usize),
    Fail(String),
    End,
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Log(_) => "log",
            Op::Say(_) => "say",
            Op::Ask { .. } => "ask",
            Op::Shop(_) => "shop",
            Op::Battle => "battle",
            Op::Give { .. } => "give",
            Op::Sound(_) => "sound",
            Op::Music(_) => "music",
            Op::Move(_) => "move",
            Op::Face(_) => "face",
            Op::Speed(_) => "speed",
            Op::SetStat { .. } => "setstat",
            Op::AddStat { .. } => "addstat",
            Op::SetFlag(_) => "setflag",
            Op::UnsetFlag(_) => "unsetflag",
            Op::JumpUnless { .. } => "jmpunless",
            Op::Jump(_) => "jmp",
            Op::Fail(_) => "fail",
            Op::End => "end",
        }
    }

    /// Whether running this op hands control back to the caller.
    pub fn suspends(&self) -> bool {
        matches!(self, Op::Say(_) | Op::Ask { .. } | Op::Shop(_) | Op::Battle)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10}", self.mnemonic())?;
        match self {
            Op::Log(text) | Op::Say(text) | Op::Fail(text) => write!(f, "{{{text}}}"),
            Op::Sound(name) | Op::Music(name) => write!(f, "{{{name}}}"),
            Op::Ask { question, options } => {
                write!(f, "{{{question}}}")?;
                for option in options {
                    write!(f, " {{{option}}}")?;
                }
                Ok(())
            }
            Op::Shop(shop) => write!(
                f,
                "{{{}}} {} for sale, {} bonuses",
                shop.trader,
                shop.selling.len(),
                shop.buy_bonuses.len()
            ),
            Op::Give { item, count } => write!(f, "{{{item}}} {count}"),
            Op::Move(dir) => write!(f, "{dir}"),
            Op::Face(FaceTarget::Dir(dir)) => write!(f, "{dir}"),
            Op::Face(FaceTarget::Player) => f.write_str("player"),
            Op::Speed(ticks) => write!(f, "{ticks}"),
            Op::SetStat { stat, value } => write!(f, "{stat} {value}"),
            Op::AddStat { stat, delta } => write!(f, "{stat} {delta:+}"),
            Op::SetFlag(flag) | Op::UnsetFlag(flag) => f.write_str(flag),
            Op::JumpUnless { condition, target } => write!(f, "{condition:?} -> {target}"),
            Op::Jump(target) => write!(f, "-> {target}"),
            Op::Battle | Op::End => Ok(()),
        }
    }
}

/// A compiled script; shared by every context running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub ops: Vec<Op>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of ops that can suspend a running context.
    pub fn suspension_points(&self) -> usize {
        self.ops.iter().filter(|op| op.suspends()).count()
    }
}

/// Lower one script. The result always ends with `End`.
pub fn assemble(script: &Script) -> Program {
    let mut ops = Vec::<Op>::new();
    emit_block(&script.body, &mut ops);
    ops.push(Op::End);
    Program {
        name: script.name.clone(),
        ops,
    }
}

fn emit_block(body: &[Cmd], ops: &mut Vec<Op>) {
    for cmd in body {
        emit(cmd, ops);
    }
}

fn emit(cmd: &Cmd, ops: &mut Vec<Op>) {
    let op = match cmd {
        Cmd::Log { text } => Op::Log(text.clone()),
        Cmd::Say { text } => Op::Say(text.clone()),
        Cmd::Ask { question, options } => Op::Ask {
            question: question.clone(),
            options: options.clone(),
        },
        Cmd::Shop(shop) => Op::Shop(shop.clone()),
        Cmd::Battle => Op::Battle,
        Cmd::Give { item, count } => Op::Give {
            item: item.clone(),
            count: *count,
        },
        Cmd::Sound { name } => Op::Sound(name.clone()),
        Cmd::Music { name } => Op::Music(name.clone()),
        Cmd::Move { dir } => Op::Move(*dir),
        Cmd::Face { target } => Op::Face(*target),
        Cmd::Speed { ticks } => Op::Speed(*ticks),
        Cmd::SetStat { stat, value } => Op::SetStat {
            stat: stat.clone(),
            value: *value,
        },
        Cmd::AddStat { stat, delta } => Op::AddStat {
            stat: stat.clone(),
            delta: *delta,
        },
        Cmd::SetFlag { flag } => Op::SetFlag(flag.clone()),
        Cmd::UnsetFlag { flag } => Op::UnsetFlag(flag.clone()),
        Cmd::Fail { message } => Op::Fail(message.clone()),
        Cmd::End => Op::End,
        Cmd::If {
            condition,
            branches,
        } => {
            emit_if(condition, branches, ops);
            return;
        }
    };
    ops.push(op);
}

fn emit_if(condition: &Condition, branches: &Branch, ops: &mut Vec<Op>) {
    let skip_then = ops.len();
    ops.push(Op::JumpUnless {
        condition: condition.clone(),
        target: usize::MAX,
    });

    match branches {
        Branch::Then(then_branch) => {
            emit_block(then_branch, ops);
            patch(ops, skip_then);
        }
        Branch::ThenElse(then_branch, else_branch) => {
            emit_block(then_branch, ops);
            let skip_else = ops.len();
            ops.push(Op::Jump(usize::MAX));
            patch(ops, skip_then);
            emit_block(else_branch, ops);
            patch(ops, skip_else);
        }
    }
}

/// Point the jump at `at` to the next op to be emitted.
fn patch(ops: &mut [Op], at: usize) {
    let here = ops.len();
    match &mut ops[at] {
        Op::JumpUnless { target, .. } | Op::Jump(target) => *target = here,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::parse_script;

    /// Helper: parse a source and immediately assemble it.
    fn pipe(src: &str) -> Program {
        assemble(&parse_script("test", src).expect("parser ok"))
    }

    #[test]
    fn test_straight_line_program() {
        let program = pipe("say {a} log {b}");
        assert_eq!(
            program.ops,
            vec![Op::Say("a".into()), Op::Log("b".into()), Op::End]
        );
        assert_eq!(program.suspension_points(), 1);
    }

    #[test]
    fn test_if_else_jumps_forward() {
        let program = pipe("if flag_X then say {yes} else say {no} endif log {after}");
        assert_eq!(
            program.ops,
            vec![
                Op::JumpUnless {
                    condition: Condition::FlagSet("flag_X".into()),
                    target: 3,
                },
                Op::Say("yes".into()),
                Op::Jump(4),
                Op::Say("no".into()),
                Op::Log("after".into()),
                Op::End,
            ]
        );
    }

    #[test]
    fn test_nested_if_targets() {
        let program = pipe("if flag_A then if flag_B then log {ab} endif log {a} endif");
        assert_eq!(
            program.ops[0],
            Op::JumpUnless {
                condition: Condition::FlagSet("flag_A".into()),
                target: 4,
            }
        );
        assert_eq!(
            program.ops[1],
            Op::JumpUnless {
                condition: Condition::FlagSet("flag_B".into()),
                target: 3,
            }
        );
    }

    #[test]
    fn test_every_jump_is_forward() {
        let program = pipe(
            "if choice 0 then if won then log {w} else log {l} endif else if cancelled then end endif endif",
        );
        for (pc, op) in program.ops.iter().enumerate() {
            match op {
                Op::JumpUnless { target, .. } | Op::Jump(target) => {
                    assert!(*target > pc && *target < program.len(), "op {pc}: {op}");
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_empty_script_is_just_end() {
        assert_eq!(pipe("").ops, vec![Op::End]);
    }

    #[test]
    fn test_listing() {
        let program = pipe("give {potion} 2 addstat HP -3");
        let lines: Vec<String> = program.ops.iter().map(|op| op.to_string()).collect();
        assert_eq!(lines[0], "give      {potion} 2");
        assert_eq!(lines[1], "addstat   HP -3");
    }
}
