//! Single-variable polynomial arithmetic over the rationals.
//!
//! Enough symbolic machinery to verify tutor answers: parse `x^2 + 3x`,
//! differentiate, integrate, find real roots, and print the result the way a
//! computer algebra system would (`x**3/3`, `2*x + 3`).

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlgebraError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token after expression")]
    TrailingInput,
    #[error("unsupported symbol '{0}'")]
    UnsupportedSymbol(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("not a polynomial: {0}")]
    NonPolynomial(String),
    #[error("coefficient overflow")]
    Overflow,
    #[error("expression nested too deeply")]
    TooDeep,
}

pub type Result<T> = std::result::Result<T, AlgebraError>;

const MAX_DEGREE: usize = 32;
/// Parentheses, signs and exponents nest at most this deep.
const MAX_NESTING: usize = 64;

// ── Rational ──────────────────────────────────────────────────────────────────

/// Reduced fraction with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    pub fn new(num: i128, den: i128) -> Result<Self> {
        if den == 0 {
            return Err(AlgebraError::DivisionByZero);
        }
        let g = gcd(num, den).max(1);
        let sign = if den < 0 { -1 } else { 1 };
        Ok(Self { num: sign * num / g, den: sign * den / g })
    }

    pub fn integer(n: i128) -> Self {
        Self { num: n, den: 1 }
    }

    pub fn numer(&self) -> i128 {
        self.num
    }

    pub fn denom(&self) -> i128 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    pub fn abs(&self) -> Self {
        Self { num: self.num.abs(), den: self.den }
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Parse a decimal literal such as `12` or `0.25`.
    pub fn from_decimal(text: &str) -> Result<Self> {
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        let digits = format!("{whole}{frac}");
        let num: i128 = digits.parse().map_err(|_| AlgebraError::Overflow)?;
        let den = 10i128.checked_pow(frac.len() as u32).ok_or(AlgebraError::Overflow)?;
        Self::new(num, den)
    }

    pub fn add(self, other: Self) -> Result<Self> {
        let num = self
            .num
            .checked_mul(other.den)
            .and_then(|a| other.num.checked_mul(self.den).and_then(|b| a.checked_add(b)))
            .ok_or(AlgebraError::Overflow)?;
        let den = self.den.checked_mul(other.den).ok_or(AlgebraError::Overflow)?;
        Self::new(num, den)
    }

    pub fn neg(self) -> Self {
        Self { num: -self.num, den: self.den }
    }

    pub fn sub(self, other: Self) -> Result<Self> {
        self.add(other.neg())
    }

    pub fn mul(self, other: Self) -> Result<Self> {
        let num = self.num.checked_mul(other.num).ok_or(AlgebraError::Overflow)?;
        let den = self.den.checked_mul(other.den).ok_or(AlgebraError::Overflow)?;
        Self::new(num, den)
    }

    pub fn div(self, other: Self) -> Result<Self> {
        if other.is_zero() {
            return Err(AlgebraError::DivisionByZero);
        }
        self.mul(Self { num: other.den, den: other.num }.normalised()?)
    }

    fn normalised(self) -> Result<Self> {
        Self::new(self.num, self.den)
    }

    /// Exact square root when both numerator and denominator are perfect squares.
    fn sqrt_exact(&self) -> Option<Self> {
        if self.num < 0 {
            return None;
        }
        let n = isqrt(self.num)?;
        let d = isqrt(self.den)?;
        Some(Self { num: n, den: d })
    }
}

fn isqrt(n: i128) -> Option<i128> {
    if n < 0 {
        return None;
    }
    let mut r = (n as f64).sqrt() as i128;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    (r * r == n).then_some(r)
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

// ── Polynomial ────────────────────────────────────────────────────────────────

/// Polynomial in `x`; `coeffs[i]` is the coefficient of `x^i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    coeffs: Vec<Rational>,
}

/// A real root, exact when it is rational.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub value: f64,
    pub exact: Option<Rational>,
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exact {
            Some(r) => write!(f, "{r}"),
            None => write!(f, "{:.4}", self.value),
        }
    }
}

impl Polynomial {
    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    pub fn constant(c: Rational) -> Self {
        Self { coeffs: vec![c] }.trimmed()
    }

    pub fn x() -> Self {
        Self { coeffs: vec![Rational::ZERO, Rational::ONE] }
    }

    pub fn from_coeffs(coeffs: Vec<Rational>) -> Self {
        Self { coeffs }.trimmed()
    }

    /// Parse an expression in `x`. Accepts `^` and `**`, implicit
    /// multiplication (`3x`, `2(x+1)`, `(x-1)(x+1)`) and division by constants.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0, depth: 0 };
        let poly = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(AlgebraError::TrailingInput);
        }
        Ok(poly)
    }

    fn trimmed(mut self) -> Self {
        while self.coeffs.last().is_some_and(Rational::is_zero) {
            self.coeffs.pop();
        }
        self
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Degree; the zero polynomial reports 0.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn coeff(&self, power: usize) -> Rational {
        self.coeffs.get(power).copied().unwrap_or(Rational::ZERO)
    }

    fn as_constant(&self) -> Option<Rational> {
        match self.coeffs.len() {
            0 => Some(Rational::ZERO),
            1 => Some(self.coeffs[0]),
            _ => None,
        }
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        let len = self.coeffs.len().max(other.coeffs.len());
        let coeffs = (0..len)
            .map(|i| self.coeff(i).add(other.coeff(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_coeffs(coeffs))
    }

    pub fn neg(&self) -> Self {
        Self { coeffs: self.coeffs.iter().map(|c| c.neg()).collect() }
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        if self.is_zero() || other.is_zero() {
            return Ok(Self::zero());
        }
        let degree = self.degree() + other.degree();
        if degree > MAX_DEGREE {
            return Err(AlgebraError::NonPolynomial(format!("degree {degree} is too large")));
        }
        let mut coeffs = vec![Rational::ZERO; degree + 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] = coeffs[i + j].add(a.mul(*b)?)?;
            }
        }
        Ok(Self::from_coeffs(coeffs))
    }

    pub fn scale(&self, factor: Rational) -> Result<Self> {
        let coeffs = self.coeffs.iter().map(|c| c.mul(factor)).collect::<Result<Vec<_>>>()?;
        Ok(Self::from_coeffs(coeffs))
    }

    pub fn pow(&self, exp: u32) -> Result<Self> {
        let mut out = Self::constant(Rational::ONE);
        for _ in 0..exp {
            out = out.mul(self)?;
        }
        Ok(out)
    }

    pub fn derivative(&self) -> Result<Self> {
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| c.mul(Rational::integer(i as i128)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_coeffs(coeffs))
    }

    /// Antiderivative with zero constant of integration.
    pub fn integral(&self) -> Result<Self> {
        let mut coeffs = vec![Rational::ZERO];
        for (i, c) in self.coeffs.iter().enumerate() {
            coeffs.push(c.div(Rational::integer(i as i128 + 1))?);
        }
        Ok(Self::from_coeffs(coeffs))
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c.to_f64())
    }

    fn eval_exact(&self, x: Rational) -> Result<Rational> {
        self.coeffs.iter().rev().try_fold(Rational::ZERO, |acc, c| acc.mul(x)?.add(*c))
    }

    /// Distinct real roots in ascending order. Quadratics are solved in closed
    /// form; higher degrees only yield their rational roots plus whatever
    /// quadratic factor remains after deflation.
    pub fn real_roots(&self) -> Result<Vec<Root>> {
        let mut roots: Vec<Root> = Vec::new();
        let mut poly = self.clone();
        if poly.degree() == 0 {
            return Ok(roots);
        }

        // x = 0 factors first so the rational root search sees a nonzero constant.
        if poly.coeff(0).is_zero() {
            roots.push(Root { value: 0.0, exact: Some(Rational::ZERO) });
            while poly.coeff(0).is_zero() && !poly.is_zero() {
                poly = Self::from_coeffs(poly.coeffs[1..].to_vec());
            }
        }

        while poly.degree() > 2 {
            let Some(root) = poly.find_rational_root()? else { break };
            roots.push(Root { value: root.to_f64(), exact: Some(root) });
            poly = poly.deflate(root)?;
        }

        match poly.degree() {
            1 => {
                let r = poly.coeff(0).neg().div(poly.coeff(1))?;
                roots.push(Root { value: r.to_f64(), exact: Some(r) });
            }
            2 => roots.extend(poly.quadratic_roots()?),
            _ => {}
        }

        roots.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));
        roots.dedup_by(|a, b| (a.value - b.value).abs() < 1e-12);
        Ok(roots)
    }

    fn quadratic_roots(&self) -> Result<Vec<Root>> {
        let (a, b, c) = (self.coeff(2), self.coeff(1), self.coeff(0));
        let disc = b.mul(b)?.sub(Rational::integer(4).mul(a)?.mul(c)?)?;
        if disc.is_negative() {
            return Ok(Vec::new());
        }
        let two_a = Rational::integer(2).mul(a)?;
        if let Some(s) = disc.sqrt_exact() {
            let r1 = b.neg().sub(s)?.div(two_a)?;
            let r2 = b.neg().add(s)?.div(two_a)?;
            return Ok(vec![
                Root { value: r1.to_f64(), exact: Some(r1) },
                Root { value: r2.to_f64(), exact: Some(r2) },
            ]);
        }
        let sq = disc.to_f64().sqrt();
        let (bf, af) = (b.to_f64(), two_a.to_f64());
        Ok(vec![
            Root { value: (-bf - sq) / af, exact: None },
            Root { value: (-bf + sq) / af, exact: None },
        ])
    }

    /// Candidate `p/q` with `p | a0` and `q | an`, after clearing denominators.
    fn find_rational_root(&self) -> Result<Option<Rational>> {
        let lcm = self.coeffs.iter().try_fold(1i128, |acc, c| {
            let g = gcd(acc, c.denom()).max(1);
            (acc / g).checked_mul(c.denom()).ok_or(AlgebraError::Overflow)
        })?;
        let ints: Vec<i128> = self
            .coeffs
            .iter()
            .map(|c| c.numer() * (lcm / c.denom()))
            .collect();
        let (a0, an) = (ints[0].abs(), ints[ints.len() - 1].abs());
        if a0 == 0 || an == 0 || a0 > 1_000_000 || an > 1_000_000 {
            return Ok(None);
        }
        for p in divisors(a0) {
            for q in divisors(an) {
                for sign in [1, -1] {
                    let candidate = Rational::new(sign * p, q)?;
                    if self.eval_exact(candidate)?.is_zero() {
                        return Ok(Some(candidate));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Synthetic division by `(x - root)`.
    fn deflate(&self, root: Rational) -> Result<Self> {
        let n = self.degree();
        let mut out = vec![Rational::ZERO; n];
        let mut carry = Rational::ZERO;
        for i in (1..=n).rev() {
            carry = carry.mul(root)?.add(self.coeff(i))?;
            out[i - 1] = carry;
        }
        Ok(Self::from_coeffs(out))
    }
}

fn divisors(n: i128) -> Vec<i128> {
    (1..=n).filter(|d| n % d == 0).collect()
}

/// Printed in descending powers with `**` exponents and `*` products,
/// rational coefficients written as `p*x**k/q`.
impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut first = true;
        for (power, coeff) in self.coeffs.iter().enumerate().rev() {
            if coeff.is_zero() {
                continue;
            }
            let term = format_term(coeff.abs(), power);
            match (first, coeff.is_negative()) {
                (true, true) => write!(f, "-{term}")?,
                (true, false) => write!(f, "{term}")?,
                (false, true) => write!(f, " - {term}")?,
                (false, false) => write!(f, " + {term}")?,
            }
            first = false;
        }
        Ok(())
    }
}

fn format_term(c: Rational, power: usize) -> String {
    if power == 0 {
        return c.to_string();
    }
    let monomial = if power == 1 { "x".to_string() } else { format!("x**{power}") };
    match (c.numer(), c.denom()) {
        (1, 1) => monomial,
        (n, 1) => format!("{n}*{monomial}"),
        (1, d) => format!("{monomial}/{d}"),
        (n, d) => format!("{n}*{monomial}/{d}"),
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Rational),
    X,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                if literal == "." || literal.matches('.').count() > 1 {
                    return Err(AlgebraError::UnexpectedChar('.'));
                }
                tokens.push(Token::Num(Rational::from_decimal(&literal)?));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Caret);
                i += 2;
            }
            '*' | '·' | '×' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' | '−' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '/' | '÷' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' | '[' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' | ']' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_alphanumeric() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.extend(split_word(&word)?);
            }
            other => return Err(AlgebraError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

/// `x`, `xx` (implicit `x*x`) and `x2` (read as `x^2`, a common OCR shape).
fn split_word(word: &str) -> Result<Vec<Token>> {
    let lower = word.to_lowercase();
    let letters: String = lower.chars().take_while(|c| c.is_alphabetic()).collect();
    let digits = &lower[letters.len()..];
    if letters.is_empty() || letters.chars().any(|c| c != 'x') || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AlgebraError::UnsupportedSymbol(word.to_string()));
    }
    let mut tokens = Vec::new();
    for (i, _) in letters.chars().enumerate() {
        if i > 0 {
            tokens.push(Token::Star);
        }
        tokens.push(Token::X);
    }
    if !digits.is_empty() {
        tokens.push(Token::Caret);
        tokens.push(Token::Num(Rational::from_decimal(digits)?));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(AlgebraError::TooDeep);
        }
        self.depth += 1;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expr(&mut self) -> Result<Polynomial> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    acc = acc.add(&self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    acc = acc.sub(&self.term()?)?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<Polynomial> {
        let mut acc = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    acc = acc.mul(&self.unary()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    let c = divisor
                        .as_constant()
                        .ok_or_else(|| AlgebraError::NonPolynomial("division by an expression in x".into()))?;
                    acc = acc.scale(Rational::ONE.div(c)?)?;
                }
                Some(Token::Num(_) | Token::X | Token::LParen) => {
                    acc = acc.mul(&self.power()?)?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn unary(&mut self) -> Result<Polynomial> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(self.nested(Self::unary)?.neg())
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Polynomial> {
        let base = self.atom()?;
        if self.peek() != Some(&Token::Caret) {
            return Ok(base);
        }
        self.pos += 1;
        let exponent = self.nested(Self::unary)?;
        let exp = exponent
            .as_constant()
            .filter(|e| e.denom() == 1 && e.numer() >= 0 && e.numer() <= MAX_DEGREE as i128)
            .ok_or_else(|| AlgebraError::NonPolynomial("exponent must be a small non-negative integer".into()))?;
        base.pow(exp.numer() as u32)
    }

    fn atom(&mut self) -> Result<Polynomial> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Polynomial::constant(n)),
            Some(Token::X) => Ok(Polynomial::x()),
            Some(Token::LParen) => {
                let inner = self.nested(Self::expr)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(_) => Err(AlgebraError::TrailingInput),
                    None => Err(AlgebraError::UnexpectedEnd),
                }
            }
            Some(Token::Plus) => Err(AlgebraError::UnexpectedChar('+')),
            Some(Token::Minus) => Err(AlgebraError::UnexpectedChar('-')),
            Some(Token::Star) => Err(AlgebraError::UnexpectedChar('*')),
            Some(Token::Slash) => Err(AlgebraError::UnexpectedChar('/')),
            Some(Token::Caret) => Err(AlgebraError::UnexpectedChar('^')),
            Some(Token::RParen) => Err(AlgebraError::UnexpectedChar(')')),
            None => Err(AlgebraError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> Polynomial {
        Polynomial::parse(text).unwrap()
    }

    #[test]
    fn test_parse_and_print() {
        assert_eq!(p("x^2 + 3*x").to_string(), "x**2 + 3*x");
        assert_eq!(p("x**2 - 5x + 6").to_string(), "x**2 - 5*x + 6");
        assert_eq!(p("-x^2 + 1").to_string(), "-x**2 + 1");
        assert_eq!(p("2(x+1)").to_string(), "2*x + 2");
        assert_eq!(p("(x-1)(x+1)").to_string(), "x**2 - 1");
        assert_eq!(p("x/2").to_string(), "x/2");
        assert_eq!(p("0.5x^2").to_string(), "x**2/2");
        assert_eq!(p("0").to_string(), "0");
    }

    #[test]
    fn test_derivative() {
        assert_eq!(p("x^2 + 3*x").derivative().unwrap().to_string(), "2*x + 3");
        assert_eq!(p("4x^3 - x + 7").derivative().unwrap().to_string(), "12*x**2 - 1");
        assert_eq!(p("5").derivative().unwrap().to_string(), "0");
    }

    #[test]
    fn test_integral() {
        assert_eq!(p("x^2").integral().unwrap().to_string(), "x**3/3");
        assert_eq!(p("3x^2").integral().unwrap().to_string(), "x**3");
        assert_eq!(p("2x + 3").integral().unwrap().to_string(), "x**2 + 3*x");
        assert_eq!(p("3x").integral().unwrap().to_string(), "3*x**2/2");
    }

    #[test]
    fn test_quadratic_roots() {
        let roots = p("x^2 - 5x + 6").real_roots().unwrap();
        let values: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        assert_eq!(values, vec!["2", "3"]);

        let irrational = p("x^2 - 2").real_roots().unwrap();
        assert_eq!(irrational.len(), 2);
        assert!(irrational[0].exact.is_none());
        assert!((irrational[1].value - 2f64.sqrt()).abs() < 1e-9);

        assert!(p("x^2 + 1").real_roots().unwrap().is_empty());
    }

    #[test]
    fn test_cubic_rational_roots() {
        let roots = p("x^3 - 6x^2 + 11x - 6").real_roots().unwrap();
        let values: Vec<f64> = roots.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);

        let with_zero = p("x^3 - x").real_roots().unwrap();
        assert_eq!(with_zero.iter().map(|r| r.to_string()).collect::<Vec<_>>(), vec!["-1", "0", "1"]);
    }

    #[test]
    fn test_double_root_reported_once() {
        let roots = p("x^2 - 4x + 4").real_roots().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].to_string(), "2");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Polynomial::parse("sin(x)"), Err(AlgebraError::UnsupportedSymbol(_))));
        assert!(matches!(Polynomial::parse("1/x"), Err(AlgebraError::NonPolynomial(_))));
        assert!(matches!(Polynomial::parse("x/0"), Err(AlgebraError::DivisionByZero)));
        assert!(matches!(Polynomial::parse("(x+1"), Err(AlgebraError::UnexpectedEnd)));
        assert!(matches!(Polynomial::parse("x^-1"), Err(AlgebraError::NonPolynomial(_))));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let deep = format!("{}x{}", "(".repeat(2000), ")".repeat(2000));
        assert!(matches!(Polynomial::parse(&deep), Err(AlgebraError::TooDeep)));
        assert!(matches!(Polynomial::parse(&format!("{}x", "-".repeat(2000))), Err(AlgebraError::TooDeep)));
        assert!(matches!(Polynomial::parse(&format!("x{}", "^2".repeat(2000))), Err(AlgebraError::TooDeep)));

        let shallow = format!("{}x{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(p(&shallow).to_string(), "x");
    }

    #[test]
    fn test_ocr_style_exponent() {
        assert_eq!(p("x2 + 1").to_string(), "x**2 + 1");
    }
}
