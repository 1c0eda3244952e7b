// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Infix expression evaluation for repeat counts.
//!
//! Expressions are integer-only over `+ - * /` with named constants and no
//! parentheses. The evaluator converts infix to postfix with a shunting-yard
//! pass, then folds the postfix sequence with a single value stack.

use std::collections::HashMap;

use crate::core::error::{EvalError, EvalErrorKind};

/// Binary operator recognized inside repeat-count expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Subtract => 1,
            Self::Multiply | Self::Divide => 2,
        }
    }

    fn apply(self, l: i64, r: i64) -> Result<i64, EvalError> {
        Ok(match self {
            Self::Add => l.wrapping_add(r),
            Self::Subtract => l.wrapping_sub(r),
            Self::Multiply => l.wrapping_mul(r),
            Self::Divide => {
                if r == 0 {
                    return Err(EvalError::new(
                        EvalErrorKind::DivisionByZero,
                        "Division by zero",
                    ));
                }
                l.wrapping_div(r)
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RpnToken {
    Value(i64),
    Operator(BinaryOp),
}

/// Evaluate an infix expression against a constant table.
pub fn evaluate(expr: &str, constants: &HashMap<String, i64>) -> Result<i64, EvalError> {
    let rpn = infix_to_rpn(expr, constants)?;
    eval_rpn(&rpn)
}

/// Resolve a pending token buffer to its integer value. A token starting
/// with a digit is a base-10 literal; anything else is a constant lookup.
fn resolve_token(token: &str, constants: &HashMap<String, i64>) -> Result<i64, EvalError> {
    let first = token.chars().next();
    if first.is_some_and(|ch| ch.is_ascii_digit()) {
        token.parse::<i64>().map_err(|_| {
            EvalError::new(
                EvalErrorKind::InvalidIntegerLiteral,
                format!("Invalid integer literal: {token}"),
            )
        })
    } else {
        constants.get(token).copied().ok_or_else(|| {
            EvalError::new(
                EvalErrorKind::UndefinedConstant,
                format!("Undefined constant: {token}"),
            )
        })
    }
}

fn missing_operand() -> EvalError {
    EvalError::new(EvalErrorKind::MissingOperand, "Missing operand")
}

fn infix_to_rpn(expr: &str, constants: &HashMap<String, i64>) -> Result<Vec<RpnToken>, EvalError> {
    let mut operators: Vec<BinaryOp> = Vec::new();
    let mut output: Vec<RpnToken> = Vec::new();
    let mut pending = String::new();
    let mut last_was_operator = true;

    for ch in expr.chars() {
        if ch.is_ascii_alphanumeric() {
            pending.push(ch);
            last_was_operator = false;
        } else if let Some(op) = BinaryOp::from_char(ch) {
            if last_was_operator {
                return Err(missing_operand());
            }
            if !pending.is_empty() {
                output.push(RpnToken::Value(resolve_token(&pending, constants)?));
                pending.clear();
            }
            // Popping on >= gives left associativity for - and / chains.
            while let Some(&top) = operators.last() {
                if top.precedence() < op.precedence() {
                    break;
                }
                output.push(RpnToken::Operator(top));
                operators.pop();
            }
            operators.push(op);
            last_was_operator = true;
        } else if !ch.is_whitespace() {
            return Err(EvalError::new(
                EvalErrorKind::InvalidCharacter,
                format!("Invalid character: {ch}"),
            ));
        }
        // Whitespace is skipped without flushing the pending buffer, so
        // "1 2" scans as the single token "12".
    }

    if last_was_operator && !output.is_empty() {
        return Err(missing_operand());
    }
    if !pending.is_empty() {
        output.push(RpnToken::Value(resolve_token(&pending, constants)?));
    }
    while let Some(op) = operators.pop() {
        output.push(RpnToken::Operator(op));
    }
    Ok(output)
}

fn eval_rpn(rpn: &[RpnToken]) -> Result<i64, EvalError> {
    let mut values: Vec<i64> = Vec::new();
    for token in rpn {
        match token {
            RpnToken::Value(value) => values.push(*value),
            RpnToken::Operator(op) => {
                let right = values.pop().ok_or_else(missing_operand)?;
                let left = values.pop().ok_or_else(missing_operand)?;
                values.push(op.apply(left, right)?);
            }
        }
    }
    values
        .pop()
        .ok_or_else(|| EvalError::new(EvalErrorKind::EmptyExpression, "Empty expression"))
}
