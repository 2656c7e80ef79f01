//! Subscription queries.
//!
//! A query is a flat chain of terms joined by `AND` / `OR`, optionally
//! grouped with parentheses:
//!
//! ```text
//! name:SenseMusicContext AND (home OR PC)
//! ```
//!
//! Operators have equal precedence. Every chain (the whole query or the
//! inside of a group) is evaluated strictly left to right, so
//! `a AND b OR c` means `(a AND b) OR c` and `a OR b AND c` means
//! `(a OR b) AND c`. Two terms with no operator between them are joined
//! with `AND`.
//!
//! Terms:
//! - `name:X` matches when the event name equals `X` (case-sensitive).
//! - `value:X` matches when the payload's string form equals `X`.
//! - any other word, or a `"quoted phrase"`, matches when it appears in the
//!   payload's string form, ignoring case. A blank phrase is rejected.
//!
//! The empty query matches nothing.

use crate::event::Event;
use thiserror::Error;

/// Errors produced while parsing a query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unterminated quoted phrase")]
    UnterminatedPhrase,

    #[error("empty quoted phrase")]
    EmptyPhrase,

    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("empty group '()'")]
    EmptyGroup,

    #[error("operator '{operator}' at token {position} has no left operand")]
    MissingLeftOperand { operator: Operator, position: usize },

    #[error("operator '{0}' has no right operand")]
    DanglingOperator(Operator),

    #[error("unknown attribute '{0}' (expected 'name' or 'value')")]
    UnknownAttribute(String),

    #[error("attribute '{0}' has an empty value")]
    EmptyAttributeValue(String),
}

/// Boolean connective between two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::And => f.write_str("AND"),
            Operator::Or => f.write_str("OR"),
        }
    }
}

/// Atomic condition on a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Event name equals the value exactly.
    Name(String),
    /// Payload string form equals the value exactly.
    Value(String),
    /// Case-insensitive substring of the payload string form.
    Keyword { text: String, folded: String },
}

impl Term {
    fn keyword(text: &str) -> Self {
        Term::Keyword {
            text: text.to_string(),
            folded: text.to_lowercase(),
        }
    }

    fn matches(&self, event: &Event, payload: &str, payload_folded: &str) -> bool {
        match self {
            Term::Name(name) => event.name == *name,
            Term::Value(value) => payload == value,
            Term::Keyword { folded, .. } => payload_folded.contains(folded.as_str()),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Name(name) => write!(f, "name:{}", name),
            Term::Value(value) => write!(f, "value:{}", value),
            Term::Keyword { text, .. } if needs_quotes(text) => write!(f, "\"{}\"", text),
            Term::Keyword { text, .. } => f.write_str(text),
        }
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text == "AND"
        || text == "OR"
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | ':'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Term(Term),
    Group(Chain),
}

impl Operand {
    fn eval(&self, event: &Event, payload: &str, payload_folded: &str) -> bool {
        match self {
            Operand::Term(term) => term.matches(event, payload, payload_folded),
            Operand::Group(chain) => chain.eval(event, payload, payload_folded),
        }
    }
}

/// Left-associative sequence `first (op operand)*`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Chain {
    first: Box<Operand>,
    rest: Vec<(Operator, Operand)>,
}

impl Chain {
    fn eval(&self, event: &Event, payload: &str, payload_folded: &str) -> bool {
        let mut acc = self.first.eval(event, payload, payload_folded);
        for (op, operand) in &self.rest {
            acc = match op {
                Operator::And => acc && operand.eval(event, payload, payload_folded),
                Operator::Or => acc || operand.eval(event, payload, payload_folded),
            };
        }
        acc
    }

    fn fmt_with(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_operand(&self.first, f)?;
        for (op, operand) in &self.rest {
            write!(f, " {} ", op)?;
            fmt_operand(operand, f)?;
        }
        Ok(())
    }
}

fn fmt_operand(operand: &Operand, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match operand {
        Operand::Term(term) => write!(f, "{}", term),
        Operand::Group(chain) => {
            f.write_str("(")?;
            chain.fmt_with(f)?;
            f.write_str(")")
        }
    }
}

/// Parsed, immutable subscription query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionQuery {
    root: Option<Chain>,
}

impl SubscriptionQuery {
    /// Parse a query string.
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(Self { root: None });
        }

        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.chain()?;
        if parser.pos != parser.tokens.len() {
            // Only a stray ')' can stop the top-level chain early.
            return Err(QueryError::UnbalancedParentheses);
        }
        Ok(Self { root: Some(root) })
    }

    /// Query matching events with the given name and nothing else.
    pub fn name(name: &str) -> Self {
        Self {
            root: Some(Chain {
                first: Box::new(Operand::Term(Term::Name(name.to_string()))),
                rest: Vec::new(),
            }),
        }
    }

    /// Query matching an event whose name is any of `names`.
    ///
    /// An empty slice gives the empty query.
    pub fn any_name(names: &[&str]) -> Self {
        let mut terms = names
            .iter()
            .map(|name| Operand::Term(Term::Name(name.to_string())));
        let Some(first) = terms.next() else {
            return Self { root: None };
        };
        Self {
            root: Some(Chain {
                first: Box::new(first),
                rest: terms.map(|operand| (Operator::Or, operand)).collect(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Evaluate the query against an event.
    pub fn matches(&self, event: &Event) -> bool {
        let Some(root) = &self.root else {
            return false;
        };
        let payload = event.value.to_string();
        let payload_folded = payload.to_lowercase();
        root.eval(event, &payload, &payload_folded)
    }
}

/// Free-function form of [`SubscriptionQuery::matches`].
pub fn matches(query: &SubscriptionQuery, event: &Event) -> bool {
    query.matches(event)
}

impl std::str::FromStr for SubscriptionQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical form: explicit operators, single spaces, quoted phrases.
impl std::fmt::Display for SubscriptionQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.root {
            Some(root) => root.fmt_with(f),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Op(Operator),
    Word(String),
    Phrase(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, QueryError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    phrase.push(c);
                }
                if !closed {
                    return Err(QueryError::UnterminatedPhrase);
                }
                // A blank phrase would be a substring of every payload.
                if phrase.trim().is_empty() {
                    return Err(QueryError::EmptyPhrase);
                }
                tokens.push(Token::Phrase(phrase));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(match word.as_str() {
                    "AND" => Token::Op(Operator::And),
                    "OR" => Token::Op(Operator::Or),
                    _ => Token::Word(word),
                });
            }
        }
    }

    Ok(tokens)
}

fn word_to_term(word: &str) -> Result<Term, QueryError> {
    let Some((attribute, value)) = word.split_once(':') else {
        return Ok(Term::keyword(word));
    };
    if attribute.is_empty() {
        return Ok(Term::keyword(word));
    }
    if value.is_empty() {
        return Err(QueryError::EmptyAttributeValue(attribute.to_string()));
    }
    match attribute {
        "name" => Ok(Term::Name(value.to_string())),
        "value" => Ok(Term::Value(value.to_string())),
        other => Err(QueryError::UnknownAttribute(other.to_string())),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn chain(&mut self) -> Result<Chain, QueryError> {
        let first = self.operand()?;
        let mut rest = Vec::new();

        while let Some(token) = self.tokens.get(self.pos) {
            let op = match token {
                Token::Close => break,
                Token::Op(op) => {
                    let op = *op;
                    self.pos += 1;
                    op
                }
                // Adjacent terms are an implicit AND.
                Token::Open | Token::Word(_) | Token::Phrase(_) => Operator::And,
            };
            let operand = match self.tokens.get(self.pos) {
                None | Some(Token::Close) => return Err(QueryError::DanglingOperator(op)),
                Some(_) => self.operand()?,
            };
            rest.push((op, operand));
        }

        Ok(Chain {
            first: Box::new(first),
            rest,
        })
    }

    fn operand(&mut self) -> Result<Operand, QueryError> {
        let position = self.pos;
        let Some(token) = self.tokens.get(position).cloned() else {
            return Err(QueryError::UnbalancedParentheses);
        };
        self.pos += 1;

        match token {
            Token::Word(word) => Ok(Operand::Term(word_to_term(&word)?)),
            Token::Phrase(phrase) => Ok(Operand::Term(Term::keyword(&phrase))),
            Token::Op(operator) => Err(QueryError::MissingLeftOperand { operator, position }),
            Token::Close => Err(QueryError::UnbalancedParentheses),
            Token::Open => {
                if let Some(Token::Close) = self.tokens.get(self.pos) {
                    return Err(QueryError::EmptyGroup);
                }
                let chain = self.chain()?;
                match self.tokens.get(self.pos) {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(Operand::Group(chain))
                    }
                    _ => Err(QueryError::UnbalancedParentheses),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "I'm at home, probably want to play music on PC.";
    const WORK: &str = "I'm in Electrum, laptop is a good candidate.";
    const MOBILE: &str = "I'm mobile. Should I just play back on the phone?";

    fn context(value: &str) -> Event {
        Event::new("SenseMusicContext", value)
    }

    fn q(query: &str) -> SubscriptionQuery {
        SubscriptionQuery::parse(query).unwrap()
    }

    // --- role queries against the three published rationales ---

    #[test]
    fn test_laptop_query() {
        let query = q("name:SenseMusicContext AND laptop");
        assert!(query.matches(&context(WORK)));
        assert!(!query.matches(&context(HOME)));
        assert!(!query.matches(&context(MOBILE)));
    }

    #[test]
    fn test_mobile_query() {
        let query = q("name:SenseMusicContext AND mobile");
        assert!(query.matches(&context(MOBILE)));
        assert!(!query.matches(&context(HOME)));
        assert!(!query.matches(&context(WORK)));
    }

    #[test]
    fn test_flat_pc_query_is_left_associative() {
        let query = q("name:SenseMusicContext AND home OR PC");
        assert!(query.matches(&context(HOME)));
        // "PC" alone satisfies the trailing OR.
        assert!(query.matches(&context("Play it on the PC")));
        assert!(!query.matches(&context(WORK)));
        assert!(!query.matches(&context(MOBILE)));
        // (name AND home) OR PC: a different event name still passes on "PC".
        assert!(query.matches(&Event::new("PlaySomeMusic", "pc please")));
    }

    #[test]
    fn test_grouped_pc_query_keeps_name_filter() {
        let query = q("name:SenseMusicContext AND (home OR PC)");
        assert!(query.matches(&context(HOME)));
        assert!(query.matches(&context("Play it on the PC")));
        assert!(!query.matches(&Event::new("PlaySomeMusic", "pc please")));
        assert!(!query.matches(&context(MOBILE)));
    }

    // --- operator semantics ---

    #[test]
    fn test_or_then_and_is_not_standard_precedence() {
        // Standard precedence would read a OR (b AND c) and match.
        let query = q("alpha OR beta AND gamma");
        assert!(!query.matches(&context("alpha")));
        assert!(query.matches(&context("alpha gamma")));
        assert!(query.matches(&context("beta gamma")));
    }

    #[test]
    fn test_and_then_or() {
        let query = q("alpha AND beta OR gamma");
        assert!(query.matches(&context("gamma")));
        assert!(query.matches(&context("alpha beta")));
        assert!(!query.matches(&context("alpha")));
    }

    #[test]
    fn test_long_chain() {
        let query = q("a1 OR b1 AND c1 OR d1");
        // ((a1 OR b1) AND c1) OR d1
        assert!(query.matches(&context("d1")));
        assert!(query.matches(&context("b1 c1")));
        assert!(!query.matches(&context("a1 b1")));
    }

    #[test]
    fn test_nested_groups() {
        let query = q("name:X AND ((red OR blue) AND (small OR large))");
        let event = |v: &str| Event::new("X", v);
        assert!(query.matches(&event("a large blue box")));
        assert!(!query.matches(&event("a large green box")));
        assert!(!query.matches(&event("a red box")));
        assert!(!query.matches(&Event::new("Y", "small red")));
    }

    #[test]
    fn test_implicit_and() {
        let query = q("name:SenseMusicContext laptop");
        assert_eq!(query.to_string(), "name:SenseMusicContext AND laptop");
        assert!(query.matches(&context(WORK)));
        assert!(!query.matches(&context(HOME)));
    }

    // --- terms ---

    #[test]
    fn test_name_is_exact_and_case_sensitive() {
        let query = q("name:PhoneLocation");
        assert!(query.matches(&Event::new("PhoneLocation", "1,2")));
        assert!(!query.matches(&Event::new("phonelocation", "1,2")));
        assert!(!query.matches(&Event::new("PhoneLocationX", "1,2")));
        assert!(!query.matches(&Event::new("Phone", "1,2")));
    }

    #[test]
    fn test_keyword_is_case_insensitive_substring() {
        let query = q("pc");
        assert!(query.matches(&context(HOME)));
        assert!(q("HOME").matches(&context(HOME)));
        assert!(q("lap").matches(&context(WORK)));
        assert!(!q("desktop").matches(&context(HOME)));
    }

    #[test]
    fn test_keyword_against_numeric_payload() {
        let event = Event::new("Temperature", 21.5);
        assert!(q("21.5").matches(&event));
        assert!(q("21").matches(&event));
        assert!(!q("22").matches(&event));
    }

    #[test]
    fn test_keyword_does_not_match_event_name() {
        assert!(!q("SenseMusicContext").matches(&context("nothing here")));
    }

    #[test]
    fn test_value_term_is_exact() {
        let query = q("name:PhoneWifiConnect AND value:eduroam");
        assert!(query.matches(&Event::new("PhoneWifiConnect", "eduroam")));
        assert!(!query.matches(&Event::new("PhoneWifiConnect", "eduroam-guest")));
        assert!(!query.matches(&Event::new("PhoneWifiConnect", "Eduroam")));
    }

    #[test]
    fn test_quoted_phrase() {
        let query = q("\"good candidate\" AND laptop");
        assert!(query.matches(&context(WORK)));
        assert!(!query.matches(&context("laptop is a good fit")));
        assert_eq!(query.to_string(), "\"good candidate\" AND laptop");
    }

    #[test]
    fn test_leading_colon_is_keyword() {
        assert!(q(":D").matches(&context("smile :D")));
    }

    #[test]
    fn test_lowercase_operators_are_keywords() {
        let query = q("home or PC");
        // home AND or AND PC
        assert!(!query.matches(&context("home PC")));
        assert!(query.matches(&context("home or PC")));
    }

    // --- empty queries fail closed ---

    #[test]
    fn test_empty_query_matches_nothing() {
        for query in ["", "   ", "\t\n"] {
            let query = q(query);
            assert!(query.is_empty());
            assert!(!query.matches(&context(HOME)));
            assert!(!query.matches(&Event::new("", "")));
        }
    }

    // --- parse errors ---

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("AND home", QueryError::MissingLeftOperand { operator: Operator::And, position: 0 }),
            ("home OR", QueryError::DanglingOperator(Operator::Or)),
            ("home AND OR pc", QueryError::MissingLeftOperand { operator: Operator::Or, position: 2 }),
            ("(home OR pc", QueryError::UnbalancedParentheses),
            ("home OR pc)", QueryError::UnbalancedParentheses),
            (")", QueryError::UnbalancedParentheses),
            ("home AND ()", QueryError::EmptyGroup),
            ("(home AND)", QueryError::DanglingOperator(Operator::And)),
            ("\"good candidate", QueryError::UnterminatedPhrase),
            ("\"\"", QueryError::EmptyPhrase),
            ("name:SenseMusicContext AND \"  \"", QueryError::EmptyPhrase),
            ("type:music", QueryError::UnknownAttribute("type".to_string())),
            ("name:", QueryError::EmptyAttributeValue("name".to_string())),
        ];
        for (input, expected) in cases {
            assert_eq!(SubscriptionQuery::parse(input), Err(expected), "query: {input}");
        }
    }

    #[test]
    fn test_canonical_display_reparses_to_same_query() {
        let input = "name:SenseMusicContext   AND(home OR \"on PC\")";
        let query = q(input);
        let canonical = query.to_string();
        assert_eq!(canonical, "name:SenseMusicContext AND (home OR \"on PC\")");
        assert_eq!(q(&canonical), query);
    }

    #[test]
    fn test_name_constructor() {
        let query = SubscriptionQuery::name("PlaySomeMusic");
        assert_eq!(query, q("name:PlaySomeMusic"));
        assert!(matches(&query, &Event::new("PlaySomeMusic", 1.0)));
    }

    #[test]
    fn test_any_name_constructor() {
        let query = SubscriptionQuery::any_name(&["PhoneLocation", "PlaySomeMusic"]);
        assert_eq!(query, q("name:PhoneLocation OR name:PlaySomeMusic"));
        assert!(query.matches(&Event::new("PlaySomeMusic", "")));
        assert!(!query.matches(&Event::new("PhoneWifiConnect", "eduroam")));
        assert!(SubscriptionQuery::any_name(&[]).is_empty());
    }
}
