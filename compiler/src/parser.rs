use pbgen_schema::{Cardinality, Header, HeaderKind};

use crate::{
    tokenizer::{SyntaxError, Token, TokenKind},
    utils::{error, quote},
};

/// Unresolved type as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(String),
    Map(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAst {
    pub name:        String,
    pub number:      i32,
    /// `None` for enum constants.
    pub ty:          Option<TypeExpr>,
    pub cardinality: Cardinality,
    pub comment:     Option<String>,
    pub ignored:     bool,
    pub line:        usize,
    pub column:      usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionAst {
    pub name:    String,
    pub comment: Option<String>,
    pub ignored: bool,
    pub fields:  Vec<FieldAst>,
    pub line:    usize,
    pub column:  usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct FileAst {
    pub headers:  Vec<Header>,
    pub messages: Vec<DefinitionAst>,
    pub enums:    Vec<DefinitionAst>,
}

impl FileAst {
    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(|h| h.kind == HeaderKind::Import)
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DefinitionKind {
    Message,
    Enum,
}

struct Parser<'a> {
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.index.min(last)]
    }

    fn previous_line(&self) -> usize {
        self.index
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.line)
    }

    fn advance(&mut self) -> &'a Token {
        let tok = self.current();
        if tok.kind != TokenKind::Eof {
            self.index += 1;
        }
        tok
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.current().is(text) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<(), SyntaxError> {
        if !self.eat(text) {
            return Err(self.unexpected(&quote(text)));
        }
        Ok(())
    }

    fn expect_kind(&mut self, kind: TokenKind, expected: &str) -> Result<&'a Token, SyntaxError> {
        if self.current().kind != kind {
            return Err(self.unexpected(expected));
        }
        Ok(self.advance())
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let tok = self.current();
        let found = if tok.kind == TokenKind::Eof {
            "end of file".to_string()
        } else {
            quote(&tok.text)
        };
        error(&format!("Expected {} but found {}", expected, found), tok.line, tok.column)
    }

    /// Consumes consecutive comment tokens.
    fn leading_comments(&mut self) -> Vec<String> {
        let mut comments = Vec::new();
        while self.current().kind == TokenKind::Comment {
            comments.push(comment_text(&self.advance().text));
        }
        comments
    }

    /// A comment starting on the line the previous token ended on.
    fn trailing_comment(&mut self, line: usize) -> Option<String> {
        let tok = self.current();
        if tok.kind == TokenKind::Comment && tok.line == line {
            self.advance();
            return Some(comment_text(&tok.text));
        }
        None
    }

    fn integer(&mut self) -> Result<i32, SyntaxError> {
        let tok = self.expect_kind(TokenKind::Integer, "integer")?;
        tok.text
            .parse::<i32>()
            .map_err(|_| error(&format!("Invalid integer {}", quote(&tok.text)), tok.line, tok.column))
    }

    fn identifier(&mut self) -> Result<&'a Token, SyntaxError> {
        self.expect_kind(TokenKind::Ident, "identifier")
    }

    /// Option value: string, identifier, integer or boolean.
    fn option_value(&mut self) -> Result<String, SyntaxError> {
        let tok = self.current();
        match tok.kind {
            TokenKind::Str => {
                self.advance();
                Ok(unquote(&tok.text))
            }
            TokenKind::Ident | TokenKind::Integer => {
                self.advance();
                Ok(tok.text.clone())
            }
            _ => Err(self.unexpected("option value")),
        }
    }

    fn string(&mut self) -> Result<String, SyntaxError> {
        let tok = self.expect_kind(TokenKind::Str, "string")?;
        Ok(unquote(&tok.text))
    }

    fn skip_statement(&mut self) -> Result<(), SyntaxError> {
        while !self.eat(";") {
            if self.current().kind == TokenKind::Eof {
                return Err(self.unexpected("\";\""));
            }
            self.advance();
        }
        Ok(())
    }

    fn parse_file(&mut self) -> Result<FileAst, SyntaxError> {
        let mut file = FileAst::default();

        loop {
            let comments = self.leading_comments();
            if self.current().kind == TokenKind::Eof {
                break;
            }

            if self.eat("syntax") {
                self.expect("=")?;
                let value = self.string()?;
                self.expect(";")?;
                file.headers.push(Header::new(HeaderKind::Syntax, "syntax", value));
            } else if self.eat("package") {
                let name = self.identifier()?.text.trim_start_matches('.').to_string();
                self.expect(";")?;
                file.headers.push(Header::new(HeaderKind::Package, "package", name));
            } else if self.eat("import") {
                if !self.eat("public") {
                    self.eat("weak");
                }
                let path = self.string()?;
                self.expect(";")?;
                file.headers.push(Header::new(HeaderKind::Import, path.clone(), path));
            } else if self.eat("option") {
                let name = self.identifier()?.text.clone();
                self.expect("=")?;
                let value = self.option_value()?;
                self.expect(";")?;
                file.headers.push(Header::new(HeaderKind::Option, name, value));
            } else if self.eat("message") {
                let def = self.parse_definition(DefinitionKind::Message, comments)?;
                file.messages.push(def);
            } else if self.eat("enum") {
                let def = self.parse_definition(DefinitionKind::Enum, comments)?;
                file.enums.push(def);
            } else {
                let tok = self.current();
                return Err(error(&format!("Unexpected token {}", quote(&tok.text)), tok.line, tok.column));
            }
        }

        Ok(file)
    }

    fn parse_definition(
        &mut self,
        kind: DefinitionKind,
        mut comments: Vec<String>,
    ) -> Result<DefinitionAst, SyntaxError> {
        let name_tok = self.identifier()?;
        self.expect("{")?;
        comments.extend(self.trailing_comment(self.previous_line()));

        let mut def = DefinitionAst {
            name:    name_tok.text.clone(),
            comment: None,
            ignored: false,
            fields:  Vec::new(),
            line:    name_tok.line,
            column:  name_tok.column,
        };

        loop {
            let field_comments = self.leading_comments();
            if self.eat("}") {
                break;
            }

            if self.eat("option") {
                let name = self.identifier()?.text.clone();
                self.expect("=")?;
                let value = self.option_value()?;
                self.expect(";")?;
                if name == "ignore" && value == "true" {
                    def.ignored = true;
                }
                continue;
            }
            if self.eat("reserved") {
                self.skip_statement()?;
                continue;
            }
            if ["message", "enum", "oneof", "extensions", "extend", "group"]
                .iter()
                .any(|kw| self.current().is(kw))
            {
                let tok = self.current();
                return Err(error(
                    &format!("Nested {} is not supported", quote(&tok.text)),
                    tok.line,
                    tok.column,
                ));
            }

            let field = match kind {
                DefinitionKind::Message => self.parse_message_field(field_comments)?,
                DefinitionKind::Enum    => self.parse_enum_field(field_comments)?,
            };
            def.fields.push(field);
        }

        def.comment = join_comments(comments);
        Ok(def)
    }

    fn parse_message_field(&mut self, mut comments: Vec<String>) -> Result<FieldAst, SyntaxError> {
        let mut cardinality = Cardinality::Singular;
        if self.eat("repeated") {
            cardinality = Cardinality::Repeated;
        } else if !self.eat("optional") {
            self.eat("required");
        }

        let ty = if self.eat("map") {
            self.expect("<")?;
            let key = self.identifier()?.text.clone();
            self.expect(",")?;
            let value = self.identifier()?.text.clone();
            self.expect(">")?;
            if cardinality == Cardinality::Repeated {
                let tok = self.current();
                return Err(error("Map fields cannot be repeated", tok.line, tok.column));
            }
            TypeExpr::Map(key, value)
        } else {
            TypeExpr::Named(self.identifier()?.text.clone())
        };

        let name_tok = self.identifier()?;
        self.expect("=")?;
        let number = self.integer()?;
        let ignored = self.field_options()?;
        self.expect(";")?;
        comments.extend(self.trailing_comment(self.previous_line()));

        Ok(FieldAst {
            name: name_tok.text.clone(),
            number,
            ty: Some(ty),
            cardinality,
            comment: join_comments(comments),
            ignored,
            line: name_tok.line,
            column: name_tok.column,
        })
    }

    fn parse_enum_field(&mut self, mut comments: Vec<String>) -> Result<FieldAst, SyntaxError> {
        let name_tok = self.identifier()?;
        self.expect("=")?;
        let number = self.integer()?;
        let ignored = self.field_options()?;
        self.expect(";")?;
        comments.extend(self.trailing_comment(self.previous_line()));

        Ok(FieldAst {
            name: name_tok.text.clone(),
            number,
            ty: None,
            cardinality: Cardinality::Singular,
            comment: join_comments(comments),
            ignored,
            line: name_tok.line,
            column: name_tok.column,
        })
    }

    /// `[name = value, ...]`; returns whether `ignore = true` was present.
    fn field_options(&mut self) -> Result<bool, SyntaxError> {
        let mut ignored = false;
        if !self.eat("[") {
            return Ok(false);
        }
        loop {
            let name = self.identifier()?.text.clone();
            self.expect("=")?;
            let value = self.option_value()?;
            if name == "ignore" && value == "true" {
                ignored = true;
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect("]")?;
        Ok(ignored)
    }
}

fn unquote(text: &str) -> String {
    serde_json::from_str::<String>(text)
        .unwrap_or_else(|_| text.trim_matches('"').to_string())
}

fn comment_text(raw: &str) -> String {
    if let Some(body) = raw.strip_prefix("/*") {
        body.trim_end_matches("*/")
            .lines()
            .map(|l| l.trim().trim_start_matches('*').trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        raw.trim_start_matches('/').trim().to_string()
    }
}

fn join_comments(comments: Vec<String>) -> Option<String> {
    let parts: Vec<String> = comments.into_iter().filter(|c| !c.is_empty()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Parses the tokens of one schema file.
pub fn parse_schema(tokens: &[Token]) -> Result<FileAst, SyntaxError> {
    if tokens.is_empty() {
        return Err(error("Expected end of file token", 0, 0));
    }
    Parser { tokens, index: 0 }.parse_file()
}
