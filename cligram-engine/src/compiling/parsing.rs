//! Grammar parsing
//!
//! Recursive descent over the token stream, producing a small syntax tree of items. Nothing is
//! resolved here: type names, callback names and references are kept as text and checked by the
//! building stage.
//!
//! ```text
//! file       := item*
//! item       := WORD '=' STRING ';' | statement
//! statement  := sequence attrs? ( ';' block? | block )
//! sequence   := term+
//! term       := element help?
//! element    := WORD | variable | '@' WORD | '(' alts ')' | '[' alts ']'
//! alts       := sequence ('|' sequence)*
//! help       := '(' STRING ')'
//! attrs      := (',' attr)+
//! block      := '{' item* '}' | '@' '{' item* '}'
//! ```

use super::lexing::Token;
use super::{CompileError, CompileErrorKind};
use std::ops::Range;

/// Top-level or block member.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// `name = "value";`
    Assign {
        name: String,
        value: String,
        span: Range<usize>,
    },
    Statement(Statement),
}

/// One command declaration, possibly with a nested block.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub terms: Vec<Term>,
    pub attrs: Vec<Attr>,
    /// Written with `;`: the command may end here.
    pub terminated: bool,
    pub block: Option<Block>,
    /// Offset of the `;`, or of the block when there is none.
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Written `@{`.
    pub sets: bool,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub element: Element,
    pub help: Option<String>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Keyword(String),
    Variable(VarDecl),
    Reference(String),
    Group { alts: Vec<Vec<Term>>, optional: bool },
}

/// `<name:type qualifiers>`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    /// `None` for `<int32>`, where the name doubles as the type.
    pub type_name: Option<String>,
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Range,
    Length,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Qualifier {
    Range {
        kind: RangeKind,
        low: Option<String>,
        high: String,
        span: Range<usize>,
    },
    Show(String),
    Regexp {
        pattern: String,
        span: Range<usize>,
    },
    Translate {
        name: String,
        span: Range<usize>,
    },
    Choice(Vec<String>),
    FractionDigits {
        digits: String,
        span: Range<usize>,
    },
    Expand {
        name: String,
        args: Vec<String>,
        span: Range<usize>,
    },
}

/// What follows `,` after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Hide,
    HideDatabase,
    HideDatabaseAutoCompletion,
    Callback {
        name: String,
        args: Vec<String>,
        span: Range<usize>,
    },
}

/// Parse a token stream into items.
pub fn parse(source: &str, tokens: &[(Token, logos::Span)]) -> Result<Vec<Item>, CompileError> {
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let items = parser.items(false)?;
    Ok(items)
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [(Token, logos::Span)],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    /// Byte offset of the next token, or the end of the source.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |(_, span)| span.start)
    }

    fn span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len()..self.source.len(), |(_, span)| span.clone())
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: String) -> CompileError {
        CompileError::at(self.source, self.offset(), CompileErrorKind::Syntax(message))
    }

    fn unexpected(&self, wanted: &str) -> CompileError {
        match self.peek() {
            Some(token) => self.error(format!("expected {}, found {}", wanted, token)),
            None => self.error(format!("expected {}, found end of input", wanted)),
        }
    }

    fn expect(&mut self, token: &Token, wanted: &str) -> Result<(), CompileError> {
        if self.peek() == Some(token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(wanted))
        }
    }

    fn word(&mut self, wanted: &str) -> Result<String, CompileError> {
        match self.peek() {
            Some(Token::Word(w)) => {
                self.pos += 1;
                Ok(w.clone())
            }
            _ => Err(self.unexpected(wanted)),
        }
    }

    /// A word or a quoted string.
    fn value(&mut self, wanted: &str) -> Result<String, CompileError> {
        match self.peek() {
            Some(Token::Word(w)) | Some(Token::Str(w)) => {
                self.pos += 1;
                Ok(w.clone())
            }
            _ => Err(self.unexpected(wanted)),
        }
    }

    fn string(&mut self, wanted: &str) -> Result<String, CompileError> {
        match self.peek() {
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(s.clone())
            }
            _ => Err(self.unexpected(wanted)),
        }
    }

    fn items(&mut self, in_block: bool) -> Result<Vec<Item>, CompileError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None if in_block => return Err(self.unexpected("`}`")),
                None => return Ok(items),
                Some(Token::CloseBrace) if in_block => return Ok(items),
                Some(Token::CloseBrace) => return Err(self.error("unmatched `}`".to_string())),
                Some(Token::Word(_)) if self.peek_at(1) == Some(&Token::Equals) => {
                    items.push(self.assignment()?);
                }
                Some(_) => items.push(Item::Statement(self.statement()?)),
            }
        }
    }

    fn assignment(&mut self) -> Result<Item, CompileError> {
        let start = self.offset();
        let name = self.word("a name")?;
        self.expect(&Token::Equals, "`=`")?;
        let value = self.value("a value")?;
        let end = self.offset();
        self.expect(&Token::Semicolon, "`;`")?;
        Ok(Item::Assign {
            name,
            value,
            span: start..end,
        })
    }

    fn statement(&mut self) -> Result<Statement, CompileError> {
        let terms = self.sequence()?;
        let attrs = self.attrs()?;
        let end = self.offset();
        let terminated = self.peek() == Some(&Token::Semicolon);
        if terminated {
            self.pos += 1;
        }
        let block = if self.at_block() {
            Some(self.block()?)
        } else if terminated {
            None
        } else {
            return Err(self.unexpected("`;` or `{`"));
        };
        Ok(Statement {
            terms,
            attrs,
            terminated,
            block,
            end,
        })
    }

    fn at_block(&self) -> bool {
        match self.peek() {
            Some(Token::OpenBrace) => true,
            Some(Token::At) => self.peek_at(1) == Some(&Token::OpenBrace),
            _ => false,
        }
    }

    fn block(&mut self) -> Result<Block, CompileError> {
        let sets = self.peek() == Some(&Token::At);
        if sets {
            self.pos += 1;
        }
        self.expect(&Token::OpenBrace, "`{`")?;
        let items = self.items(true)?;
        self.expect(&Token::CloseBrace, "`}`")?;
        Ok(Block { sets, items })
    }

    fn sequence(&mut self) -> Result<Vec<Term>, CompileError> {
        let mut terms = Vec::new();
        while self.at_element() {
            terms.push(self.term()?);
        }
        if terms.is_empty() {
            return Err(self.unexpected("a keyword, variable, reference or group"));
        }
        Ok(terms)
    }

    fn at_element(&self) -> bool {
        match self.peek() {
            Some(Token::Word(_))
            | Some(Token::LessThan)
            | Some(Token::OpenParen)
            | Some(Token::OpenBracket) => true,
            Some(Token::At) => matches!(self.peek_at(1), Some(Token::Word(_))),
            _ => false,
        }
    }

    fn term(&mut self) -> Result<Term, CompileError> {
        let start = self.offset();
        let element = match self.peek() {
            Some(Token::Word(w)) => {
                self.pos += 1;
                Element::Keyword(w.clone())
            }
            Some(Token::LessThan) => Element::Variable(self.variable()?),
            Some(Token::At) => {
                self.pos += 1;
                Element::Reference(self.word("a tree name")?)
            }
            Some(Token::OpenParen) => self.group(Token::CloseParen, false)?,
            Some(Token::OpenBracket) => self.group(Token::CloseBracket, true)?,
            _ => return Err(self.unexpected("a keyword, variable, reference or group")),
        };
        let end = self.tokens.get(self.pos.saturating_sub(1)).map_or(start, |(_, s)| s.end);

        let help = if self.peek() == Some(&Token::OpenParen)
            && matches!(self.peek_at(1), Some(Token::Str(_)))
        {
            if matches!(element, Element::Group { .. }) {
                return Err(self.error("help text must follow a keyword, variable or reference".to_string()));
            }
            self.pos += 1;
            let help = self.string("help text")?;
            self.expect(&Token::CloseParen, "`)`")?;
            Some(help)
        } else {
            None
        };

        Ok(Term {
            element,
            help,
            span: start..end,
        })
    }

    fn group(&mut self, close: Token, optional: bool) -> Result<Element, CompileError> {
        self.pos += 1;
        let mut alts = vec![self.sequence()?];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            alts.push(self.sequence()?);
        }
        let wanted = if optional { "`|` or `]`" } else { "`|` or `)`" };
        self.expect(&close, wanted)?;
        Ok(Element::Group { alts, optional })
    }

    fn variable(&mut self) -> Result<VarDecl, CompileError> {
        self.expect(&Token::LessThan, "`<`")?;
        let name = self.word("a variable name")?;
        let type_name = if self.peek() == Some(&Token::Colon) {
            self.pos += 1;
            Some(self.word("a type name")?)
        } else {
            None
        };
        let mut qualifiers = Vec::new();
        while self.peek() != Some(&Token::GreaterThan) {
            qualifiers.push(self.qualifier()?);
        }
        self.pos += 1;
        Ok(VarDecl {
            name,
            type_name,
            qualifiers,
        })
    }

    fn qualifier(&mut self) -> Result<Qualifier, CompileError> {
        let span = self.span();
        let keyword = self.word("a variable qualifier or `>`")?;
        let next = self.peek();
        match (keyword.as_str(), next) {
            ("range", Some(Token::OpenBracket)) | ("length", Some(Token::OpenBracket)) => {
                let kind = if keyword == "range" {
                    RangeKind::Range
                } else {
                    RangeKind::Length
                };
                self.pos += 1;
                let first = self.value("a bound")?;
                let (low, high) = if self.peek() == Some(&Token::Colon) {
                    self.pos += 1;
                    (Some(first), self.value("an upper bound")?)
                } else {
                    (None, first)
                };
                self.expect(&Token::CloseBracket, "`]`")?;
                Ok(Qualifier::Range {
                    kind,
                    low,
                    high,
                    span,
                })
            }
            ("show", Some(Token::Colon)) => {
                self.pos += 1;
                Ok(Qualifier::Show(self.value("the show text")?))
            }
            ("regexp", Some(Token::Colon)) => {
                self.pos += 1;
                Ok(Qualifier::Regexp {
                    pattern: self.string("a quoted regular expression")?,
                    span,
                })
            }
            ("translate", Some(Token::Colon)) => {
                self.pos += 1;
                let name = self.word("a translate function name")?;
                self.expect(&Token::OpenParen, "`(`")?;
                self.expect(&Token::CloseParen, "`)`")?;
                Ok(Qualifier::Translate { name, span })
            }
            ("choice", Some(Token::Colon)) => {
                self.pos += 1;
                let mut choices = vec![self.value("a choice")?];
                while self.peek() == Some(&Token::Pipe) {
                    self.pos += 1;
                    choices.push(self.value("a choice")?);
                }
                Ok(Qualifier::Choice(choices))
            }
            ("fraction-digits", Some(Token::Colon)) => {
                self.pos += 1;
                Ok(Qualifier::FractionDigits {
                    digits: self.word("a number of digits")?,
                    span,
                })
            }
            (_, Some(Token::OpenParen)) => {
                let args = self.args()?;
                Ok(Qualifier::Expand {
                    name: keyword,
                    args,
                    span,
                })
            }
            _ => Err(CompileError::at(
                self.source,
                span.start,
                CompileErrorKind::Syntax(format!("unknown variable qualifier `{}`", keyword)),
            )),
        }
    }

    /// `( [value (, value)*] )`
    fn args(&mut self) -> Result<Vec<String>, CompileError> {
        self.expect(&Token::OpenParen, "`(`")?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::CloseParen) {
            args.push(self.value("an argument")?);
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                args.push(self.value("an argument")?);
            }
        }
        self.expect(&Token::CloseParen, "`,` or `)`")?;
        Ok(args)
    }

    fn attrs(&mut self) -> Result<Vec<Attr>, CompileError> {
        let mut attrs = Vec::new();
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            let span = self.span();
            let name = self.word("`hide`, `hide-database` or a callback")?;
            if self.peek() == Some(&Token::OpenParen) {
                let args = self.args()?;
                attrs.push(Attr::Callback { name, args, span });
                continue;
            }
            attrs.push(match name.as_str() {
                "hide" => Attr::Hide,
                "hide-database" => Attr::HideDatabase,
                "hide-database-auto-completion" => Attr::HideDatabaseAutoCompletion,
                _ => {
                    return Err(CompileError::at(
                        self.source,
                        span.start,
                        CompileErrorKind::Syntax(format!(
                            "unknown attribute `{}`; callbacks need parentheses",
                            name
                        )),
                    ))
                }
            });
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexing::tokenize;
    use super::*;

    fn parse_str(source: &str) -> Result<Vec<Item>, CompileError> {
        parse(source, &tokenize(source)?)
    }

    fn statement(source: &str) -> Statement {
        match parse_str(source).unwrap().remove(0) {
            Item::Statement(s) => s,
            other => panic!("not a statement: {:?}", other),
        }
    }

    #[test]
    fn test_simple_statement() {
        let s = statement("show version;");
        assert!(s.terminated);
        assert!(s.block.is_none());
        assert_eq!(s.terms.len(), 2);
        assert_eq!(s.terms[1].element, Element::Keyword("version".into()));
        assert_eq!(s.terms[1].span, 5..12);
        assert_eq!(s.end, 12);
    }

    #[test]
    fn test_help_and_callbacks() {
        let s = statement(r#"show("Show things") version, hide, cb("a", b);"#);
        assert_eq!(s.terms[0].help.as_deref(), Some("Show things"));
        assert_eq!(s.attrs[0], Attr::Hide);
        assert!(matches!(
            &s.attrs[1],
            Attr::Callback { name, args, .. } if name == "cb" && args == &["a", "b"]
        ));
    }

    #[test]
    fn test_groups() {
        let s = statement("(a|b c) [d];");
        match &s.terms[0].element {
            Element::Group { alts, optional } => {
                assert!(!optional);
                assert_eq!(alts.len(), 2);
                assert_eq!(alts[1].len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(s.terms[1].element, Element::Group { optional: true, .. }));
    }

    #[test]
    fn test_variable_qualifiers() {
        let s = statement(
            r#"<x:int32 range[1:10] range[20] show:"num" regexp:"[0-9]+" translate:t() list("a","b")>;"#,
        );
        let Element::Variable(decl) = &s.terms[0].element else {
            panic!("not a variable");
        };
        assert_eq!(decl.name, "x");
        assert_eq!(decl.type_name.as_deref(), Some("int32"));
        assert_eq!(decl.qualifiers.len(), 6);
        assert!(matches!(
            &decl.qualifiers[1],
            Qualifier::Range { kind: RangeKind::Range, low: None, high, .. } if high == "20"
        ));
        assert_eq!(decl.qualifiers[2], Qualifier::Show("num".into()));
        assert!(matches!(
            &decl.qualifiers[5],
            Qualifier::Expand { name, args, .. } if name == "list" && args.len() == 2
        ));
    }

    #[test]
    fn test_choice_and_bare_type() {
        let s = statement("<color:string choice:red|green> <int32>;");
        let Element::Variable(color) = &s.terms[0].element else {
            panic!("not a variable");
        };
        assert_eq!(
            color.qualifiers[0],
            Qualifier::Choice(vec!["red".into(), "green".into()])
        );
        let Element::Variable(bare) = &s.terms[1].element else {
            panic!("not a variable");
        };
        assert_eq!(bare.type_name, None);
    }

    #[test]
    fn test_blocks_and_assignments() {
        let items = parse_str("prompt=\"x> \";\nset @{ a; b; }\nshow { version; }").unwrap();
        assert_eq!(
            items[0],
            Item::Assign {
                name: "prompt".into(),
                value: "x> ".into(),
                span: 0..12
            }
        );
        let Item::Statement(set) = &items[1] else {
            panic!("not a statement");
        };
        assert!(!set.terminated);
        assert!(set.block.as_ref().unwrap().sets);
        assert_eq!(set.block.as_ref().unwrap().items.len(), 2);
        let Item::Statement(show) = &items[2] else {
            panic!("not a statement");
        };
        assert!(!show.block.as_ref().unwrap().sets);
    }

    #[test]
    fn test_reference_element() {
        let s = statement("interface @ifs;");
        assert_eq!(s.terms[1].element, Element::Reference("ifs".into()));
    }

    #[rstest::rstest]
    #[case("show version", "expected `;` or `{`, found end of input")]
    #[case("show (a|b;", "expected `|` or `)`, found `;`")]
    #[case("show <x:int32 bogus>;", "unknown variable qualifier `bogus`")]
    #[case("show, frobnicate;", "unknown attribute `frobnicate`; callbacks need parentheses")]
    #[case("}", "unmatched `}`")]
    #[case("show { a;", "expected `}`, found end of input")]
    #[case(";", "expected a keyword, variable, reference or group, found `;`")]
    #[case("(\"help\") a;", "expected a keyword, variable, reference or group, found string \"help\"")]
    fn test_syntax_errors(#[case] source: &str, #[case] message: &str) {
        let err = parse_str(source).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax(message.to_string()));
    }
}
