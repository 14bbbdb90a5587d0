//! Declaration and annotation grammar.

use super::{ParseResult, Parser};
use crate::ast::{
    Annotation, AnnotationKind, CapabilityDecl, ContractDecl, Decl, DeclKind, EffectDecl,
    EnumDecl, FieldDecl, FunctionDecl, GenericParam, ImplDecl, ImportDecl, ImportItems,
    IntentDecl, Param, StructDecl, TraitDecl, VariantDecl,
};
use crate::diagnostics::Phase;
use crate::intern::Symbol;
use crate::options::VerifyLevel;
use crate::suggest::find_similar;
use crate::token::{LiteralValue, TokenKind};

const ANNOTATION_KEYWORDS: &[&str] = &[
    "requires", "ensures", "invariant", "effect", "capability", "contract", "intent", "verify",
];

impl<'a, 'i, 's> Parser<'a, 'i, 's> {
    pub(super) fn parse_declaration(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::Export => {
                self.advance();
                let inner = self.parse_declaration()?;
                Ok(self.ctx.decl(DeclKind::Export(inner), start.to(inner.span)))
            }
            TokenKind::Import => self.parse_import(),
            TokenKind::Let => self.parse_top_level_variable(),
            TokenKind::Type => self.parse_type_alias(),
            TokenKind::Struct => self.parse_struct(),
            TokenKind::Enum => self.parse_enum(),
            TokenKind::Trait => self.parse_trait(),
            TokenKind::Impl => self.parse_impl(),
            TokenKind::Contract => self.parse_contract(),
            TokenKind::Intent => self.parse_intent(),
            TokenKind::Effect => self.parse_effect(),
            TokenKind::Capability => self.parse_capability(),
            TokenKind::Fn | TokenKind::Pure | TokenKind::Extern => {
                let is_pure = self.eat(TokenKind::Pure);
                let is_extern = self.eat(TokenKind::Extern);
                let func = self.parse_function(is_pure, is_extern)?;
                Ok(self
                    .ctx
                    .decl(DeclKind::Function(func), start.to(self.previous_span())))
            }
            _ => {
                let found = self.peek().kind.describe();
                Err(self.error_here(format!("expected declaration, found {}", found)))
            }
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    pub(super) fn parse_function(
        &mut self,
        is_pure: bool,
        is_extern: bool,
    ) -> ParseResult<FunctionDecl<'a>> {
        self.expect(TokenKind::Fn, "to begin function")?;
        let name = self.expect_ident("as function name")?;
        let generics = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        let params = self.parse_params()?;
        let return_type = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let annotations = self.parse_annotations()?;
        let body = if self.check(TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            self.expect(TokenKind::Semicolon, "after function signature")?;
            None
        };
        Ok(FunctionDecl {
            name,
            generics,
            params,
            return_type,
            annotations,
            body,
            is_pure,
            is_extern,
        })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param<'a>>> {
        self.expect(TokenKind::LParen, "to open parameters")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let start = self.peek().span;
                if self.check(TokenKind::SelfValue) {
                    let token = self.advance();
                    params.push(Param {
                        name: token.lexeme,
                        ty: None,
                        mutable: false,
                        span: token.span,
                    });
                } else {
                    // `mut` may precede the name or sit in type position:
                    // `mut x: Int` and `x: mut Int` both mark the parameter.
                    let mut mutable = self.eat(TokenKind::Mut);
                    let name = self.expect_ident("as parameter name")?;
                    self.expect(TokenKind::Colon, "after parameter name")?;
                    if self.eat(TokenKind::Mut) {
                        mutable = true;
                    }
                    let ty = self.parse_type()?;
                    params.push(Param {
                        name,
                        ty: Some(ty),
                        mutable,
                        span: start.to(ty.span),
                    });
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "to close parameters")?;
        Ok(params)
    }

    fn parse_generic_params(&mut self) -> ParseResult<Vec<GenericParam<'a>>> {
        self.expect(TokenKind::Lt, "to open generic parameters")?;
        let mut generics = Vec::new();
        loop {
            let start = self.peek().span;
            let name = self.expect_ident("as generic parameter")?;
            let mut bounds = Vec::new();
            if self.eat(TokenKind::Colon) {
                loop {
                    bounds.push(self.parse_type()?);
                    if !self.eat(TokenKind::Plus) {
                        break;
                    }
                }
            }
            let default = if self.eat(TokenKind::Assign) {
                Some(self.parse_type()?)
            } else {
                None
            };
            generics.push(GenericParam {
                name,
                bounds,
                default,
                span: start.to(self.previous_span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_generic_close()?;
        Ok(generics)
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    pub(super) fn parse_annotations(&mut self) -> ParseResult<Vec<Annotation<'a>>> {
        let mut annotations = Vec::new();
        while self.check(TokenKind::At) {
            if let Some(annotation) = self.parse_annotation()? {
                annotations.push(annotation);
            }
        }
        Ok(annotations)
    }

    /// Returns `None` for an unknown annotation, which is reported and
    /// skipped rather than failing the enclosing declaration.
    fn parse_annotation(&mut self) -> ParseResult<Option<Annotation<'a>>> {
        let start = self.expect(TokenKind::At, "to begin annotation")?.span;
        let verify = self.verify_symbol();
        let kind = match self.peek_kind() {
            TokenKind::Requires => {
                self.advance();
                let cond = self.without_struct_literal(|p| p.parse_expr())?;
                AnnotationKind::Requires(cond)
            }
            TokenKind::Ensures => {
                self.advance();
                let cond = self.without_struct_literal(|p| p.parse_expr())?;
                AnnotationKind::Ensures(cond)
            }
            TokenKind::Invariant => {
                self.advance();
                let cond = self.without_struct_literal(|p| p.parse_expr())?;
                AnnotationKind::Invariant(cond)
            }
            TokenKind::Effect => {
                self.advance();
                self.expect(TokenKind::LBracket, "after '@effect'")?;
                let mut names = Vec::new();
                loop {
                    names.push(self.expect_ident("as effect name")?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "to close effect list")?;
                AnnotationKind::Effects(names)
            }
            TokenKind::Capability => {
                self.advance();
                let name = self.expect_ident("as capability name")?;
                self.expect(TokenKind::LBrace, "to open capability fields")?;
                let mut fields = Vec::new();
                while !self.check(TokenKind::RBrace) {
                    let field = self.expect_ident("as capability field")?;
                    self.expect(TokenKind::Colon, "after capability field name")?;
                    let value = self.parse_expr()?;
                    fields.push((field, value));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "to close capability fields")?;
                AnnotationKind::Capability { name, fields }
            }
            TokenKind::Contract => {
                self.advance();
                let name = self.expect_ident("as contract name")?;
                let generics = if self.check(TokenKind::Lt) {
                    self.parse_generic_args()?
                } else {
                    Vec::new()
                };
                AnnotationKind::ContractRef { name, generics }
            }
            TokenKind::Intent => {
                self.advance();
                let name = self.expect_ident("as intent name")?;
                let generics = if self.check(TokenKind::Lt) {
                    self.parse_generic_args()?
                } else {
                    Vec::new()
                };
                AnnotationKind::IntentRef { name, generics }
            }
            TokenKind::Ident if self.peek().lexeme == verify => {
                self.advance();
                self.expect(TokenKind::LParen, "after '@verify'")?;
                let key = self.expect_ident("as verify option")?;
                if self.interner.resolve(key) != "level" {
                    self.sink.error(
                        Phase::Parser,
                        self.previous_span(),
                        "expected 'level' in @verify",
                    );
                }
                self.expect(TokenKind::Colon, "after 'level'")?;
                let token = self.expect(TokenKind::Str, "as verify level")?;
                let level = match token.value {
                    Some(LiteralValue::Str(s)) => {
                        match self.interner.resolve(s).parse::<VerifyLevel>() {
                            Ok(level) => level,
                            Err(_) => {
                                self.sink.error(
                                    Phase::Parser,
                                    token.span,
                                    "verify level must be \"full\", \"runtime\", or \"trusted\"",
                                );
                                VerifyLevel::Runtime
                            }
                        }
                    }
                    _ => VerifyLevel::Runtime,
                };
                self.expect(TokenKind::RParen, "to close '@verify'")?;
                AnnotationKind::Verify(level)
            }
            _ => {
                let token = *self.peek();
                let name = self.interner.resolve(token.lexeme).to_string();
                let mut message = format!("unknown annotation '@{}'", name);
                if let Some(suggestion) =
                    find_similar(&name, ANNOTATION_KEYWORDS.iter().copied(), 2)
                {
                    message.push_str(&format!("; did you mean '@{}'?", suggestion));
                }
                self.sink.error(Phase::Parser, token.span, message);
                self.advance();
                self.skip_annotation_payload();
                return Ok(None);
            }
        };
        Ok(Some(Annotation { kind, span: start.to(self.previous_span()) }))
    }

    /// After an unknown annotation name, discard one balanced bracket group
    /// if it directly follows, so parsing resumes at something sensible.
    fn skip_annotation_payload(&mut self) {
        let open = self.peek_kind();
        let close = match open {
            TokenKind::LParen => TokenKind::RParen,
            TokenKind::LBracket => TokenKind::RBracket,
            TokenKind::LBrace => TokenKind::RBrace,
            _ => return,
        };
        let mut depth = 0usize;
        while !self.at_end() {
            let kind = self.peek_kind();
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
                self.advance();
                if depth == 0 {
                    return;
                }
                continue;
            }
            self.advance();
        }
    }

    fn verify_symbol(&mut self) -> Symbol {
        self.interner.intern("verify")
    }

    // ------------------------------------------------------------------
    // Type-introducing declarations
    // ------------------------------------------------------------------

    fn parse_struct(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Struct, "to begin struct")?.span;
        let name = self.expect_ident("as struct name")?;
        let generics = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::LBrace, "to open struct body")?;

        let mut fields = Vec::new();
        let mut annotations = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            if self.check(TokenKind::At) {
                // Struct-level clause, typically `@invariant`.
                if let Some(a) = self.parse_annotation()? {
                    annotations.push(a);
                }
                self.eat(TokenKind::Comma);
                continue;
            }
            let field_start = self.peek().span;
            let field_name = self.expect_ident("as field name")?;
            self.expect(TokenKind::Colon, "after field name")?;
            let ty = self.parse_type()?;
            let default = if self.eat(TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            // Field-level annotations sit between the field and its comma.
            let mut field_annotations = Vec::new();
            while self.check(TokenKind::At) && self.peek_next_kind() != TokenKind::Invariant {
                if let Some(a) = self.parse_annotation()? {
                    field_annotations.push(a);
                }
            }
            fields.push(FieldDecl {
                name: field_name,
                ty,
                default,
                annotations: field_annotations,
                span: field_start.to(self.previous_span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::RBrace, "to close struct body")?;
        Ok(self.ctx.decl(
            DeclKind::Struct(StructDecl { name, generics, fields, annotations }),
            start.to(close.span),
        ))
    }

    fn parse_enum(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Enum, "to begin enum")?.span;
        let name = self.expect_ident("as enum name")?;
        let generics = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::LBrace, "to open enum body")?;
        let mut variants = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            let v_start = self.peek().span;
            let v_name = self.expect_ident("as variant name")?;
            let mut field_types = Vec::new();
            if self.eat(TokenKind::LParen) {
                if !self.check(TokenKind::RParen) {
                    loop {
                        field_types.push(self.parse_type()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "to close variant fields")?;
            }
            variants.push(VariantDecl {
                name: v_name,
                fields: field_types,
                span: v_start.to(self.previous_span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::RBrace, "to close enum body")?;
        Ok(self.ctx.decl(
            DeclKind::Enum(EnumDecl { name, generics, variants }),
            start.to(close.span),
        ))
    }

    fn parse_trait(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Trait, "to begin trait")?.span;
        let name = self.expect_ident("as trait name")?;
        let generics = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        let mut supertraits = Vec::new();
        if self.eat(TokenKind::Colon) {
            loop {
                supertraits.push(self.expect_ident("as supertrait name")?);
                if !self.eat(TokenKind::Plus) {
                    break;
                }
            }
        }
        self.expect(TokenKind::LBrace, "to open trait body")?;
        let methods = self.parse_method_list()?;
        let close = self.expect(TokenKind::RBrace, "to close trait body")?;
        Ok(self.ctx.decl(
            DeclKind::Trait(TraitDecl { name, generics, supertraits, methods }),
            start.to(close.span),
        ))
    }

    fn parse_impl(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Impl, "to begin impl")?.span;
        let first = self.parse_type()?;
        let (trait_name, target) = if self.eat(TokenKind::For) {
            let target = self.parse_type()?;
            (first.head_name(), target)
        } else {
            (None, first)
        };
        self.expect(TokenKind::LBrace, "to open impl body")?;
        let methods = self.parse_method_list()?;
        let close = self.expect(TokenKind::RBrace, "to close impl body")?;
        Ok(self.ctx.decl(
            DeclKind::Impl(ImplDecl { trait_name, target, methods }),
            start.to(close.span),
        ))
    }

    fn parse_method_list(&mut self) -> ParseResult<Vec<FunctionDecl<'a>>> {
        let mut methods = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            let is_pure = self.eat(TokenKind::Pure);
            if !self.check(TokenKind::Fn) {
                let found = self.peek().kind.describe();
                return Err(self.error_here(format!("expected method, found {}", found)));
            }
            methods.push(self.parse_function(is_pure, false)?);
        }
        Ok(methods)
    }

    // ------------------------------------------------------------------
    // Contract-layer declarations
    // ------------------------------------------------------------------

    fn parse_contract(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Contract, "to begin contract")?.span;
        let name = self.expect_ident("as contract name")?;
        let generics = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::LBrace, "to open contract body")?;
        let clauses = self.parse_annotations()?;
        let close = self.expect(TokenKind::RBrace, "to close contract body")?;
        Ok(self.ctx.decl(
            DeclKind::Contract(ContractDecl { name, generics, clauses }),
            start.to(close.span),
        ))
    }

    fn parse_intent(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Intent, "to begin intent")?.span;
        let name = self.expect_ident("as intent name")?;
        let generics = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::LBrace, "to open intent body")?;
        let clauses = self.parse_annotations()?;
        let close = self.expect(TokenKind::RBrace, "to close intent body")?;
        Ok(self.ctx.decl(
            DeclKind::Intent(IntentDecl { name, generics, clauses }),
            start.to(close.span),
        ))
    }

    fn parse_effect(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Effect, "to begin effect")?.span;
        let name = self.expect_ident("as effect name")?;
        let generics = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::LBrace, "to open effect body")?;
        let methods = self.parse_method_list()?;
        let close = self.expect(TokenKind::RBrace, "to close effect body")?;
        Ok(self.ctx.decl(
            DeclKind::Effect(EffectDecl { name, generics, methods }),
            start.to(close.span),
        ))
    }

    fn parse_capability(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Capability, "to begin capability")?.span;
        let name = self.expect_ident("as capability name")?;
        self.expect(TokenKind::LBrace, "to open capability body")?;
        let mut permissions = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            let perm = self.expect_ident("as permission name")?;
            self.expect(TokenKind::Colon, "after permission name")?;
            let ty = self.parse_type()?;
            permissions.push((perm, ty));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::RBrace, "to close capability body")?;
        Ok(self.ctx.decl(
            DeclKind::Capability(CapabilityDecl { name, permissions }),
            start.to(close.span),
        ))
    }

    // ------------------------------------------------------------------
    // Imports, variables, aliases
    // ------------------------------------------------------------------

    fn parse_import(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Import, "to begin import")?.span;
        let mut path = vec![self.expect_ident("as module path")?];
        let mut items = ImportItems::Module;
        while self.eat(TokenKind::Dot) {
            if self.check(TokenKind::LBrace) {
                self.advance();
                let mut list = Vec::new();
                while !self.check(TokenKind::RBrace) && !self.at_end() {
                    let item = self.expect_ident("as imported name")?;
                    let alias = if self.eat(TokenKind::As) {
                        Some(self.expect_ident("as import alias")?)
                    } else {
                        None
                    };
                    list.push((item, alias));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "to close import list")?;
                items = ImportItems::List(list);
                break;
            }
            if self.eat(TokenKind::Star) {
                items = ImportItems::Wildcard;
                break;
            }
            path.push(self.expect_ident("in module path")?);
        }
        let end = self.expect(TokenKind::Semicolon, "after import")?.span;
        Ok(self.ctx.decl(
            DeclKind::Import(ImportDecl { path, items }),
            start.to(end),
        ))
    }

    fn parse_top_level_variable(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Let, "to begin variable")?.span;
        let mutable = self.eat(TokenKind::Mut);
        let name = self.expect_ident("as variable name")?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.eat(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.expect(TokenKind::Semicolon, "after variable declaration")?.span;
        Ok(self.ctx.decl(
            DeclKind::Variable { name, mutable, ty, init },
            start.to(end),
        ))
    }

    fn parse_type_alias(&mut self) -> ParseResult<&'a Decl<'a>> {
        let start = self.expect(TokenKind::Type, "to begin type alias")?.span;
        let name = self.expect_ident("as type alias name")?;
        let generics = if self.check(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::Assign, "in type alias")?;
        let ty = self.parse_type()?;
        let end = self.expect(TokenKind::Semicolon, "after type alias")?.span;
        Ok(self.ctx.decl(
            DeclKind::TypeAlias { name, generics, ty },
            start.to(end),
        ))
    }
}
