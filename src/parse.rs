//! Recursive-descent parser for the type-expression grammar.
//!
//! Surface, precedence high → low:
//! - literal `=x`
//! - primitive/format keyword, `record<K,V>`
//! - constraint suffix `(min,max)` or `(/regex/)`
//! - array suffix `[]`, optionally `[](min,max)` for item-count bounds
//! - optional suffix `?`
//! - union infix `|`
//! - conditional wrapper `when <cond> *? <then> : <else>`
//!
//! Union binds looser than the suffixes, so `a|b[]` is `Union(a, ArrayOf(b))`.
//! Every keyword and constraint is resolved here, once; validation never
//! re-reads the expression string.

use ordered_float::OrderedFloat;
use regex::Regex;

use crate::ast::{
    ConditionExpr, ConditionOp, Constraint, FormatKind, LitValue, PatternConstraint,
    PrimitiveKind, TypeNode,
};
use crate::error::GrammarError;

/// Parse one type expression into a tree.
pub fn parse(expr: &str) -> Result<TypeNode, GrammarError> {
    let mut cur = Cursor::new(expr);
    cur.eat_ws();
    let node = if cur.at_keyword("when") {
        parse_conditional(&mut cur)?
    } else {
        parse_union(&mut cur)?
    };
    cur.eat_ws();
    if !cur.at_end() {
        return Err(cur.err("end of expression"));
    }
    Ok(node)
}

// ------------------------------- Cursor ----------------------------------- //

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn eat_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// True if the next token is exactly `word` followed by a non-ident char.
    fn at_keyword(&self, word: &str) -> bool {
        let rest = self.rest();
        rest.starts_with(word)
            && !rest[word.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), GrammarError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.err(format!("'{token}'")))
        }
    }

    /// Identifier: `[A-Za-z_][A-Za-z0-9_]*`.
    fn ident(&mut self) -> Result<&'a str, GrammarError> {
        let start = self.pos;
        if !matches!(self.peek(), Some(c) if c.is_alphabetic() || c == '_') {
            return Err(self.err("identifier"));
        }
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        Ok(&self.src[start..self.pos])
    }

    /// Bare literal token: runs to the next structural delimiter.
    fn literal_token(&mut self) -> Result<&'a str, GrammarError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || "|,?()<>[]:*".contains(c) {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.err("literal value"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn number(&mut self) -> Result<f64, GrammarError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        self.src[start..self.pos]
            .parse::<f64>()
            .map_err(|_| self.err_at(start, "number"))
    }

    fn err(&self, expected: impl Into<String>) -> GrammarError {
        self.err_at(self.pos, expected)
    }

    fn err_at(&self, pos: usize, expected: impl Into<String>) -> GrammarError {
        let found = match self.src[pos.min(self.src.len())..].chars().next() {
            Some(c) => format!("'{c}'"),
            None => "end of input".to_string(),
        };
        GrammarError::new(pos, expected, found)
    }
}

// ------------------------------- Grammar ----------------------------------- //

fn parse_union(cur: &mut Cursor) -> Result<TypeNode, GrammarError> {
    let mut alts = vec![parse_postfix(cur)?];
    loop {
        cur.eat_ws();
        if !cur.eat("|") {
            break;
        }
        cur.eat_ws();
        if cur.at_end() || matches!(cur.peek(), Some('|' | ',' | '>' | ':')) {
            return Err(cur.err("union alternative"));
        }
        alts.push(parse_postfix(cur)?);
    }
    Ok(if alts.len() == 1 {
        alts.pop().unwrap()
    } else {
        TypeNode::Union(alts)
    })
}

fn parse_postfix(cur: &mut Cursor) -> Result<TypeNode, GrammarError> {
    cur.eat_ws();
    let mut node = parse_atom(cur)?;

    // Constraint attaches to the primitive or format keyword it follows.
    if cur.peek() == Some('(') {
        let at = cur.pos;
        let constraint = parse_constraint(cur)?;
        node = match node {
            TypeNode::Primitive {
                kind,
                constraint: None,
            } => TypeNode::Primitive {
                kind,
                constraint: Some(constraint),
            },
            TypeNode::Format {
                kind,
                constraint: None,
            } => TypeNode::Format {
                kind,
                constraint: Some(constraint),
            },
            _ => return Err(cur.err_at(at, "no constraint on this type")),
        };
    }

    // Array suffixes; `[](min,max)` bounds the item count.
    while cur.eat("[]") {
        let (min_items, max_items) = if cur.peek() == Some('(') {
            let at = cur.pos;
            match parse_constraint(cur)? {
                Constraint::Range { min, max } => {
                    (min.map(|m| m.0 as u32), max.map(|m| m.0 as u32))
                }
                Constraint::Pattern(_) => {
                    return Err(cur.err_at(at, "numeric array bounds"));
                }
            }
        } else {
            (None, None)
        };
        node = TypeNode::ArrayOf {
            elem: Box::new(node),
            min_items,
            max_items,
        };
    }

    if cur.eat("?") {
        node = TypeNode::Optional(Box::new(node));
    }
    Ok(node)
}

fn parse_atom(cur: &mut Cursor) -> Result<TypeNode, GrammarError> {
    if cur.eat("=") {
        let token = cur.literal_token()?;
        return Ok(TypeNode::Literal(LitValue::from_token(token)));
    }

    if cur.at_keyword("record") {
        cur.eat("record");
        cur.eat_ws();
        cur.expect("<")?;
        let key = parse_union(cur)?;
        cur.eat_ws();
        cur.expect(",")?;
        let value = parse_union(cur)?;
        cur.eat_ws();
        if !cur.eat(">") {
            return Err(cur.err("closing '>' of record"));
        }
        return Ok(TypeNode::RecordOf {
            key: Box::new(key),
            value: Box::new(value),
        });
    }

    // Bare number: numeric literal (`1|2|3`).
    if matches!(cur.peek(), Some(c) if c.is_ascii_digit() || c == '-') {
        let n = cur.number()?;
        return Ok(TypeNode::Literal(LitValue::Num(OrderedFloat(n))));
    }

    let word = cur.ident().map_err(|_| cur.err("type keyword or literal"))?;
    if let Some(kind) = PrimitiveKind::from_keyword(word) {
        return Ok(TypeNode::Primitive {
            kind,
            constraint: None,
        });
    }
    if let Some(kind) = FormatKind::from_keyword(word) {
        return Ok(TypeNode::Format {
            kind,
            constraint: None,
        });
    }
    // Bare word that is not a keyword: string literal (`admin|user|guest`).
    Ok(TypeNode::Literal(LitValue::from_token(word)))
}

/// `(min,max)` with either bound omittable, or `(/regex/)`.
fn parse_constraint(cur: &mut Cursor) -> Result<Constraint, GrammarError> {
    let open = cur.pos;
    cur.expect("(")?;
    cur.eat_ws();

    if cur.eat("/") {
        let start = cur.pos;
        let mut escaped = false;
        loop {
            match cur.peek() {
                None => return Err(cur.err("terminating '/' of pattern")),
                Some('\\') if !escaped => {
                    escaped = true;
                    cur.bump();
                }
                Some('/') if !escaped => break,
                Some(_) => {
                    escaped = false;
                    cur.bump();
                }
            }
        }
        let source = cur.src[start..cur.pos].to_string();
        cur.bump(); // closing '/'
        cur.eat_ws();
        if !cur.eat(")") {
            return Err(cur.err("closing ')' of constraint"));
        }
        let regex = Regex::new(&source)
            .map_err(|_| GrammarError::new(start, "valid regex pattern", format!("/{source}/")))?;
        return Ok(Constraint::Pattern(PatternConstraint { source, regex }));
    }

    // Omitted bounds stay omitted; `(,100)` and `(1,)` are meaningful.
    let min = if matches!(cur.peek(), Some(c) if c.is_ascii_digit() || c == '-') {
        Some(OrderedFloat(cur.number()?))
    } else {
        None
    };
    cur.eat_ws();
    if !cur.eat(",") {
        return Err(cur.err("',' between constraint bounds"));
    }
    cur.eat_ws();
    let max = if matches!(cur.peek(), Some(c) if c.is_ascii_digit() || c == '-') {
        Some(OrderedFloat(cur.number()?))
    } else {
        None
    };
    cur.eat_ws();
    if !cur.eat(")") {
        return Err(cur.err("closing ')' of constraint"));
    }
    Ok(Constraint::Range { min, max })
}

// ----------------------------- Conditionals -------------------------------- //

/// `when <path>.<op>(<args>) *? <then> : <else>` or `when <path> === <lit> *? ...`
fn parse_conditional(cur: &mut Cursor) -> Result<TypeNode, GrammarError> {
    cur.eat("when");
    cur.eat_ws();
    let predicate = parse_condition(cur)?;
    cur.eat_ws();
    cur.expect("*?")?;
    cur.eat_ws();
    let then_branch = parse_union(cur)?;
    cur.eat_ws();
    cur.expect(":")?;
    cur.eat_ws();
    let else_branch = parse_union(cur)?;
    Ok(TypeNode::Conditional {
        predicate,
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
    })
}

fn parse_condition(cur: &mut Cursor) -> Result<ConditionExpr, GrammarError> {
    let mut path = Vec::new();
    loop {
        cur.eat_ws();
        if cur.eat("$") {
            // `$op(...)` terminates the path.
            let at = cur.pos;
            let name = cur.ident()?;
            let op = parse_condition_op(cur, at, name)?;
            if path.is_empty() {
                return Err(cur.err_at(at, "field path before operator"));
            }
            return Ok(ConditionExpr { path, op });
        }
        path.push(cur.ident()?.to_string());
        if cur.eat(".") {
            continue;
        }
        break;
    }
    cur.eat_ws();
    cur.expect("===")?;
    cur.eat_ws();
    let token = cur.literal_token()?;
    Ok(ConditionExpr {
        path,
        op: ConditionOp::Equals(LitValue::from_token(token)),
    })
}

fn parse_condition_op(
    cur: &mut Cursor,
    at: usize,
    name: &str,
) -> Result<ConditionOp, GrammarError> {
    cur.expect("(")?;
    let op = match name {
        "exists" => ConditionOp::Exists,
        "empty" => ConditionOp::Empty,
        "in" => {
            let mut list = Vec::new();
            loop {
                cur.eat_ws();
                list.push(LitValue::from_token(cur.literal_token()?));
                cur.eat_ws();
                if !cur.eat(",") {
                    break;
                }
            }
            ConditionOp::In(list)
        }
        "between" => {
            cur.eat_ws();
            let lo = cur.number()?;
            cur.eat_ws();
            cur.expect(",")?;
            cur.eat_ws();
            let hi = cur.number()?;
            ConditionOp::Between(OrderedFloat(lo), OrderedFloat(hi))
        }
        _ => {
            return Err(GrammarError::new(
                at,
                "$exists, $empty, $in or $between",
                format!("'${name}'"),
            ));
        }
    };
    cur.eat_ws();
    cur.expect(")")?;
    Ok(op)
}

// -------------------------------- Tests ------------------------------------ //
