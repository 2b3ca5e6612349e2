use num_bigint::BigInt;

use super::ast::{BinaryOp, BoolOp, CompClause, CompKind, CompareOp, Expr, Keyword, StrKind, UnaryOp};
use super::lexer::{Token, TokenKind, tokenize};
use super::value::Number;
use super::{CalcError, CalcResult, MAX_EXPRESSION_LEN};

const MAX_DEPTH: usize = 200;

const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const AUGMENTED: [&str; 13] = [
    "+=", "-=", "*=", "/=", "//=", "%=", "**=", "@=", "&=", "|=", "^=", "<<=", ">>=",
];

// Binary operator tiers from loosest to tightest binding.
const TIERS: [&[(&str, BinaryOp)]; 6] = [
    &[("|", BinaryOp::BitOr)],
    &[("^", BinaryOp::BitXor)],
    &[("&", BinaryOp::BitAnd)],
    &[("<<", BinaryOp::LShift), (">>", BinaryOp::RShift)],
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    &[
        ("*", BinaryOp::Mul),
        ("/", BinaryOp::Div),
        ("//", BinaryOp::FloorDiv),
        ("%", BinaryOp::Mod),
        ("@", BinaryOp::MatMul),
    ],
];

/// Parses `source` as a single expression (or a top-level assignment, which
/// the validator will refuse).
pub fn parse(source: &str) -> CalcResult<Expr> {
    if source.len() > MAX_EXPRESSION_LEN {
        return Err(CalcError::syntax("expression too long", MAX_EXPRESSION_LEN));
    }

    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        depth: 0,
    };
    let expr = parser.statement()?;
    if !parser.at_end() {
        return Err(parser.error("invalid syntax"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + ahead)
            .or_else(|| self.tokens.last())
            .map_or(&TokenKind::End, |token| &token.kind)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |token| token.offset)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), TokenKind::End)
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Op(current) if *current == op)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Name(name) if name == keyword)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.at_op(op);
        if found {
            self.advance();
        }
        found
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.advance();
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> CalcResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> CalcResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{keyword}'")))
        }
    }

    fn error(&self, message: impl Into<String>) -> CalcError {
        CalcError::syntax(message, self.offset())
    }

    fn descend(&mut self) -> CalcResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn statement(&mut self) -> CalcResult<Expr> {
        if self.at_end() {
            return Err(self.error("empty expression"));
        }

        let target = self.expression_list()?;
        if self.eat_op("=") {
            let value = self.statement()?;
            return Ok(Expr::Assign {
                target: Box::new(target),
                value: Box::new(value),
                augmented: false,
            });
        }
        if AUGMENTED.iter().any(|op| self.at_op(op)) {
            self.advance();
            let value = self.expression_list()?;
            return Ok(Expr::Assign {
                target: Box::new(target),
                value: Box::new(value),
                augmented: true,
            });
        }
        Ok(target)
    }

    // test (',' test)* [','] with a bare comma building a tuple.
    fn expression_list(&mut self) -> CalcResult<Expr> {
        let first = self.star_or_named()?;
        if !self.at_op(",") {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.eat_op(",") {
            if self.ends_sequence() {
                break;
            }
            items.push(self.star_or_named()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn ends_sequence(&self) -> bool {
        self.at_end()
            || self.at_op(")")
            || self.at_op("]")
            || self.at_op("}")
            || self.at_op("=")
            || self.at_op(":")
    }

    fn star_or_named(&mut self) -> CalcResult<Expr> {
        if self.eat_op("*") {
            let inner = self.bitwise_or()?;
            return Ok(Expr::Starred(Box::new(inner)));
        }
        self.named()
    }

    fn named(&mut self) -> CalcResult<Expr> {
        let expr = self.test()?;
        if self.eat_op(":=") {
            let value = self.test()?;
            return Ok(Expr::NamedExpr {
                target: Box::new(expr),
                value: Box::new(value),
            });
        }
        Ok(expr)
    }

    fn test(&mut self) -> CalcResult<Expr> {
        self.descend()?;
        let result = self.test_inner();
        self.ascend();
        result
    }

    fn test_inner(&mut self) -> CalcResult<Expr> {
        if self.eat_keyword("lambda") {
            return self.lambda();
        }

        let body = self.or_test()?;
        if self.eat_keyword("if") {
            let test = self.or_test()?;
            self.expect_keyword("else")?;
            let orelse = self.test()?;
            return Ok(Expr::Conditional {
                body: Box::new(body),
                test: Box::new(test),
                orelse: Box::new(orelse),
            });
        }
        Ok(body)
    }

    fn lambda(&mut self) -> CalcResult<Expr> {
        let mut params = Vec::new();
        while !self.at_op(":") {
            if !self.eat_op("**") {
                self.eat_op("*");
            }
            match self.peek().clone() {
                TokenKind::Name(name) if !is_keyword(&name) => {
                    self.advance();
                    params.push(name);
                }
                _ => return Err(self.error("invalid lambda parameters")),
            }
            if self.eat_op("=") {
                self.test()?;
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(":")?;
        let body = self.test()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn or_test(&mut self) -> CalcResult<Expr> {
        let first = self.and_test()?;
        if !self.at_keyword("or") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword("or") {
            values.push(self.and_test()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::Or,
            values,
        })
    }

    fn and_test(&mut self) -> CalcResult<Expr> {
        let first = self.not_test()?;
        if !self.at_keyword("and") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword("and") {
            values.push(self.not_test()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::And,
            values,
        })
    }

    fn not_test(&mut self) -> CalcResult<Expr> {
        if self.eat_keyword("not") {
            self.descend()?;
            let operand = self.not_test();
            self.ascend();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand?),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> CalcResult<Expr> {
        let left = self.bitwise_or()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            rest.push((op, self.bitwise_or()?));
        }
        if rest.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            rest,
        })
    }

    fn comparison_op(&mut self) -> Option<CompareOp> {
        let simple = [
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
            ("<=", CompareOp::LtE),
            (">=", CompareOp::GtE),
            ("==", CompareOp::Eq),
            ("!=", CompareOp::NotEq),
        ];
        for (symbol, op) in simple {
            if self.eat_op(symbol) {
                return Some(op);
            }
        }

        if self.eat_keyword("in") {
            return Some(CompareOp::In);
        }
        if self.at_keyword("not") && matches!(self.peek_at(1), TokenKind::Name(n) if n == "in") {
            self.advance();
            self.advance();
            return Some(CompareOp::NotIn);
        }
        if self.eat_keyword("is") {
            if self.eat_keyword("not") {
                return Some(CompareOp::IsNot);
            }
            return Some(CompareOp::Is);
        }
        None
    }

    fn bitwise_or(&mut self) -> CalcResult<Expr> {
        self.binary_tier(0)
    }

    fn binary_tier(&mut self, tier: usize) -> CalcResult<Expr> {
        let Some(ops) = TIERS.get(tier) else {
            return self.factor();
        };

        let mut left = self.binary_tier(tier + 1)?;
        while let Some(op) = self.eat_binary(ops) {
            let right = self.binary_tier(tier + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn eat_binary(&mut self, ops: &[(&str, BinaryOp)]) -> Option<BinaryOp> {
        let found = ops.iter().find(|(symbol, _)| self.at_op(symbol)).map(|(_, op)| *op);
        if found.is_some() {
            self.advance();
        }
        found
    }

    fn factor(&mut self) -> CalcResult<Expr> {
        let op = if self.eat_op("-") {
            UnaryOp::Neg
        } else if self.eat_op("+") {
            UnaryOp::Pos
        } else if self.eat_op("~") {
            UnaryOp::Invert
        } else {
            return self.power();
        };

        self.descend()?;
        let operand = self.factor();
        self.ascend();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    // `**` binds tighter than a unary operator on its left and is right-associative.
    fn power(&mut self) -> CalcResult<Expr> {
        let base = self.primary()?;
        if self.eat_op("**") {
            self.descend()?;
            let exponent = self.factor();
            self.ascend();
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent?),
            });
        }
        Ok(base)
    }

    fn primary(&mut self) -> CalcResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            if self.eat_op("(") {
                expr = self.call(expr)?;
            } else if self.eat_op("[") {
                let index = self.subscript()?;
                self.expect_op("]")?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat_op(".") {
                let TokenKind::Name(attr) = self.peek().clone() else {
                    return Err(self.error("expected attribute name"));
                };
                self.advance();
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn call(&mut self, func: Expr) -> CalcResult<Expr> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while !self.at_op(")") {
            if self.eat_op("**") {
                keywords.push(Keyword {
                    name: None,
                    value: self.test()?,
                });
            } else if self.eat_op("*") {
                args.push(Expr::Starred(Box::new(self.test()?)));
            } else if let Some(name) = self.keyword_argument() {
                keywords.push(Keyword {
                    name: Some(name),
                    value: self.test()?,
                });
            } else {
                let arg = self.named()?;
                if self.at_keyword("for") {
                    let clauses = self.comprehension_clauses()?;
                    args.push(Expr::Comprehension {
                        kind: CompKind::Generator,
                        element: Box::new(arg),
                        value: None,
                        clauses,
                    });
                } else {
                    args.push(arg);
                }
            }

            if !self.eat_op(",") {
                break;
            }
        }

        self.expect_op(")")?;
        Ok(Expr::Call {
            func: Box::new(func),
            args,
            keywords,
        })
    }

    // `name=` inside a call.
    fn keyword_argument(&mut self) -> Option<String> {
        if !matches!(self.peek_at(1), TokenKind::Op("=")) {
            return None;
        }
        let TokenKind::Name(name) = self.peek().clone() else {
            return None;
        };
        self.advance();
        self.advance();
        Some(name)
    }

    fn subscript(&mut self) -> CalcResult<Expr> {
        let first = self.slice_item()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            items.push(self.slice_item()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn slice_item(&mut self) -> CalcResult<Expr> {
        let lower = if self.at_op(":") {
            None
        } else {
            let item = self.named()?;
            if !self.at_op(":") {
                return Ok(item);
            }
            Some(Box::new(item))
        };

        self.expect_op(":")?;
        let upper = if self.at_op(":") || self.at_op("]") || self.at_op(",") {
            None
        } else {
            Some(Box::new(self.test()?))
        };
        let step = if self.eat_op(":") && !(self.at_op("]") || self.at_op(",")) {
            Some(Box::new(self.test()?))
        } else {
            None
        };
        Ok(Expr::Slice { lower, upper, step })
    }

    fn atom(&mut self) -> CalcResult<Expr> {
        let offset = self.offset();
        match self.peek().clone() {
            TokenKind::Number(literal) => {
                self.advance();
                number_literal(&literal, offset)
            }
            TokenKind::Str { value, kind } => {
                self.advance();
                let mut value = value;
                let mut kind = kind;
                while let TokenKind::Str {
                    value: next,
                    kind: next_kind,
                } = self.peek().clone()
                {
                    self.advance();
                    value.push_str(&next);
                    if next_kind != StrKind::Text {
                        kind = next_kind;
                    }
                }
                Ok(Expr::Str { value, kind })
            }
            TokenKind::Name(name) => {
                let expr = if name == "True" {
                    Expr::Bool(true)
                } else if name == "False" {
                    Expr::Bool(false)
                } else if name == "None" {
                    Expr::NoneLiteral
                } else if is_keyword(&name) {
                    return Err(self.error("invalid syntax"));
                } else {
                    Expr::Name(name)
                };
                self.advance();
                Ok(expr)
            }
            TokenKind::Op("...") => {
                self.advance();
                Ok(Expr::Ellipsis)
            }
            TokenKind::Op("(") => {
                self.advance();
                self.enclosed(|parser| parser.parenthesized())
            }
            TokenKind::Op("[") => {
                self.advance();
                self.enclosed(|parser| parser.list_display())
            }
            TokenKind::Op("{") => {
                self.advance();
                self.enclosed(|parser| parser.brace_display())
            }
            TokenKind::End => Err(self.error("unexpected end of expression")),
            TokenKind::Op(_) => Err(self.error("invalid syntax")),
        }
    }

    fn enclosed(&mut self, inner: impl FnOnce(&mut Self) -> CalcResult<Expr>) -> CalcResult<Expr> {
        self.descend()?;
        let result = inner(self);
        self.ascend();
        result
    }

    fn parenthesized(&mut self) -> CalcResult<Expr> {
        if self.eat_op(")") {
            return Ok(Expr::Tuple(Vec::new()));
        }

        let first = self.star_or_named()?;
        if self.at_keyword("for") {
            let clauses = self.comprehension_clauses()?;
            self.expect_op(")")?;
            return Ok(Expr::Comprehension {
                kind: CompKind::Generator,
                element: Box::new(first),
                value: None,
                clauses,
            });
        }
        if !self.at_op(",") {
            self.expect_op(")")?;
            return Ok(Expr::Group(Box::new(first)));
        }

        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op(")") {
                break;
            }
            items.push(self.star_or_named()?);
        }
        self.expect_op(")")?;
        Ok(Expr::Tuple(items))
    }

    fn list_display(&mut self) -> CalcResult<Expr> {
        if self.eat_op("]") {
            return Ok(Expr::List(Vec::new()));
        }

        let first = self.star_or_named()?;
        if self.at_keyword("for") {
            let clauses = self.comprehension_clauses()?;
            self.expect_op("]")?;
            return Ok(Expr::Comprehension {
                kind: CompKind::List,
                element: Box::new(first),
                value: None,
                clauses,
            });
        }

        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            items.push(self.star_or_named()?);
        }
        self.expect_op("]")?;
        Ok(Expr::List(items))
    }

    fn brace_display(&mut self) -> CalcResult<Expr> {
        if self.eat_op("}") {
            return Ok(Expr::Dict(Vec::new()));
        }

        if self.eat_op("**") {
            let unpacked = self.bitwise_or()?;
            return self.dict_rest(None, unpacked);
        }

        let first = self.star_or_named()?;
        if self.eat_op(":") {
            let value = self.test()?;
            if self.at_keyword("for") {
                let clauses = self.comprehension_clauses()?;
                self.expect_op("}")?;
                return Ok(Expr::Comprehension {
                    kind: CompKind::Dict,
                    element: Box::new(first),
                    value: Some(Box::new(value)),
                    clauses,
                });
            }
            return self.dict_rest(Some(first), value);
        }

        if self.at_keyword("for") {
            let clauses = self.comprehension_clauses()?;
            self.expect_op("}")?;
            return Ok(Expr::Comprehension {
                kind: CompKind::Set,
                element: Box::new(first),
                value: None,
                clauses,
            });
        }

        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            items.push(self.star_or_named()?);
        }
        self.expect_op("}")?;
        Ok(Expr::Set(items))
    }

    fn dict_rest(&mut self, key: Option<Expr>, value: Expr) -> CalcResult<Expr> {
        let mut entries = vec![(key, value)];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            if self.eat_op("**") {
                entries.push((None, self.bitwise_or()?));
                continue;
            }
            let key = self.test()?;
            self.expect_op(":")?;
            entries.push((Some(key), self.test()?));
        }
        self.expect_op("}")?;
        Ok(Expr::Dict(entries))
    }

    fn comprehension_clauses(&mut self) -> CalcResult<Vec<CompClause>> {
        let mut clauses = Vec::new();
        while self.eat_keyword("for") {
            let first = self.bitwise_or()?;
            let target = if self.at_op(",") {
                let mut items = vec![first];
                while self.eat_op(",") {
                    if self.at_keyword("in") {
                        break;
                    }
                    items.push(self.bitwise_or()?);
                }
                Expr::Tuple(items)
            } else {
                first
            };
            self.expect_keyword("in")?;
            let iter = self.or_test()?;

            let mut conditions = Vec::new();
            while self.eat_keyword("if") {
                conditions.push(self.or_test()?);
            }
            clauses.push(CompClause {
                target,
                iter,
                conditions,
            });
        }
        Ok(clauses)
    }
}

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

fn number_literal(literal: &str, offset: usize) -> CalcResult<Expr> {
    let digits: String = literal.chars().filter(|c| *c != '_').collect();
    let invalid = || CalcError::syntax(format!("invalid number literal '{literal}'"), offset);

    if literal.starts_with('_') || literal.ends_with('_') || literal.contains("__") {
        return Err(invalid());
    }

    if let Some(imaginary) = digits.strip_suffix('j') {
        let value = imaginary.parse::<f64>().map_err(|_| invalid())?;
        return Ok(Expr::Imaginary(value));
    }

    let radix = match digits.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let value = BigInt::parse_bytes(digits[2..].as_bytes(), radix).ok_or_else(invalid)?;
        return Ok(Expr::Number(Number::Int(value)));
    }

    if digits.contains(['.', 'e']) {
        let value = digits.parse::<f64>().map_err(|_| invalid())?;
        return Ok(Expr::Number(Number::Float(value)));
    }

    if digits.len() > 1 && digits.starts_with('0') && digits.chars().any(|c| c != '0') {
        return Err(CalcError::syntax(
            "leading zeros in decimal integer literals are not permitted",
            offset,
        ));
    }
    let value = digits.parse::<BigInt>().map_err(|_| invalid())?;
    Ok(Expr::Number(Number::Int(value)))
}
