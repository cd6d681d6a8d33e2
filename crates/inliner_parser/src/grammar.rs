use chumsky::{BoxedParser, Stream};
use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use chumsky::recursive::Recursive;
use thiserror::Error;

use inliner_ast::nodes::{
    Annotation, AnnotationElement, AssignOp, BinaryOp, Block, CatchClause, CompilationUnit,
    DelegationKind, ElementValue, Expr, FieldDecl, Import, LambdaBody, Literal, Member,
    MethodDecl, Modifier, Modifiers, Node, Param, PostfixOp, Stmt, Type, TypeDecl, TypeKind,
    UnaryOp, Visibility,
};
use inliner_lexer::token::{Token, TokenKind};
use inliner_lexer::{LexerError, tokenize};
use inliner_span::Span;
use inliner_utils::errors::{Diagnostic, DiagnosticSeverity};
use std::ops::Range;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ParserError {
    pub message: String,
    pub span: Span,
}

impl ParserError {
    pub fn to_diagnostic(&self, source_id: &str) -> Diagnostic {
        let mut diag = Diagnostic::new(
            DiagnosticSeverity::Error,
            source_id,
            self.span,
            self.message.clone(),
        )
        .with_code("parse");

        if self.message.starts_with("unexpected token") {
            diag = diag
                .with_suggestion("Check for missing or extra tokens")
                .with_help("Ensure statements end with `;` and brackets are balanced.");
        } else if self.message.starts_with("unexpected end of input") {
            diag = diag
                .with_suggestion("Check for missing closing brackets, parentheses, or quotes")
                .with_help("The parser reached the end of the input while expecting more tokens.");
        }

        diag
    }
}

impl From<Simple<TokenKind>> for ParserError {
    fn from(value: Simple<TokenKind>) -> Self {
        let span = Span::from(value.span());
        let mut message = match (value.reason(), value.found()) {
            (SimpleReason::Custom(message), _) => return Self {
                message: message.clone(),
                span,
            },
            (_, None | Some(TokenKind::Eof)) => "unexpected end of input".to_string(),
            (_, Some(found)) => format!("unexpected token {found}"),
        };

        let mut expected: Vec<String> = value
            .expected()
            .flatten()
            .filter(|kind| !kind.is_eof())
            .map(ToString::to_string)
            .collect();
        expected.sort();
        expected.dedup();
        if !expected.is_empty() && expected.len() <= 6 {
            message.push_str(&format!(", expected {}", expected.join(" or ")));
        }

        Self { message, span }
    }
}

/// Lexing or parsing failure for a piece of source text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{} lexical error(s)", .0.len())]
    Lex(Vec<LexerError>),
    #[error("{} syntax error(s)", .0.len())]
    Parse(Vec<ParserError>),
}

impl SourceError {
    pub fn to_diagnostics(&self, source_id: &str) -> Vec<Diagnostic> {
        match self {
            SourceError::Lex(errors) => errors
                .iter()
                .map(|error| error.to_diagnostic(source_id))
                .collect(),
            SourceError::Parse(errors) => errors
                .iter()
                .map(|error| error.to_diagnostic(source_id))
                .collect(),
        }
    }

    /// First error message, for one-line reports.
    pub fn first_message(&self) -> String {
        match self {
            SourceError::Lex(errors) => errors.first().map(ToString::to_string),
            SourceError::Parse(errors) => errors.first().map(ToString::to_string),
        }
        .unwrap_or_else(|| self.to_string())
    }
}

type TokenParser<O> = BoxedParser<'static, TokenKind, O, Simple<TokenKind>>;
type ExprRef = Recursive<'static, TokenKind, Node<Expr>, Simple<TokenKind>>;
type StmtRef = Recursive<'static, TokenKind, Node<Stmt>, Simple<TokenKind>>;

/// Expression and statement grammars refer to each other (lambda bodies are
/// blocks), so both are declared first and defined afterwards. One grammar is
/// built per thread and reused.
struct Grammar {
    expr: ExprRef,
    stmt: StmtRef,
    unit: TokenParser<CompilationUnit>,
    replacement: TokenParser<Node<Stmt>>,
}

impl Grammar {
    fn new() -> Self {
        let mut expr: ExprRef = Recursive::declare();
        let mut stmt: StmtRef = Recursive::declare();
        expr.define(expr_parser(expr.clone(), stmt.clone()));
        stmt.define(stmt_parser(expr.clone(), stmt.clone()));
        let unit = unit_parser(expr.clone(), stmt.clone());
        let replacement = replacement_parser(expr.clone());
        Self {
            expr,
            stmt,
            unit,
            replacement,
        }
    }
}

thread_local! {
    static GRAMMAR: Grammar = Grammar::new();
}

fn parse_with<O, P>(parser: &P, tokens: &[Token]) -> Result<O, Vec<ParserError>>
where
    P: Parser<TokenKind, O, Error = Simple<TokenKind>>,
{
    let end = tokens.last().map_or(0, |token| token.span().end());
    let stream = Stream::from_iter(
        end..end + 1,
        tokens
            .iter()
            .map(|token| (token.kind().clone(), token.span().into())),
    );

    parser
        .parse(stream)
        .map_err(|errors| errors.into_iter().map(ParserError::from).collect())
}

pub fn parse_compilation_unit(tokens: &[Token]) -> Result<CompilationUnit, Vec<ParserError>> {
    GRAMMAR.with(|grammar| parse_with(&grammar.unit, tokens))
}

pub fn parse_expression(tokens: &[Token]) -> Result<Node<Expr>, Vec<ParserError>> {
    GRAMMAR.with(|grammar| {
        let parser = grammar.expr.clone().then_ignore(just(TokenKind::Eof));
        parse_with(&parser, tokens)
    })
}

pub fn parse_statement(tokens: &[Token]) -> Result<Node<Stmt>, Vec<ParserError>> {
    GRAMMAR.with(|grammar| {
        let parser = grammar.stmt.clone().then_ignore(just(TokenKind::Eof));
        parse_with(&parser, tokens)
    })
}

/// Parse the text of a replacement attribute: a single expression, `throw`
/// or `this(...)`/`super(...)` delegation, with an optional trailing `;`.
pub fn parse_replacement(tokens: &[Token]) -> Result<Node<Stmt>, Vec<ParserError>> {
    GRAMMAR.with(|grammar| parse_with(&grammar.replacement, tokens))
}

/// Lex and parse a whole source file.
pub fn parse_source(source: &str) -> Result<CompilationUnit, SourceError> {
    let tokens = tokenize(source).map_err(SourceError::Lex)?;
    parse_compilation_unit(&tokens).map_err(SourceError::Parse)
}

/// Lex and parse replacement text.
pub fn parse_replacement_source(source: &str) -> Result<Node<Stmt>, SourceError> {
    let tokens = tokenize(source).map_err(SourceError::Lex)?;
    parse_replacement(&tokens).map_err(SourceError::Parse)
}

/// Lex and parse a standalone expression.
pub fn parse_expression_source(source: &str) -> Result<Node<Expr>, SourceError> {
    let tokens = tokenize(source).map_err(SourceError::Lex)?;
    parse_expression(&tokens).map_err(SourceError::Parse)
}

fn identifier_parser() -> impl Parser<TokenKind, String, Error = Simple<TokenKind>> + Clone {
    select! { TokenKind::Identifier(name) => name }
}

fn spanned_identifier() -> impl Parser<TokenKind, Node<String>, Error = Simple<TokenKind>> + Clone
{
    identifier_parser().map_with_span(Node::new)
}

/// `a.b.c`; a trailing `.` that is not followed by an identifier is left
/// unconsumed (`import a.b.*`).
fn qualified_name_parser() -> impl Parser<TokenKind, String, Error = Simple<TokenKind>> + Clone {
    identifier_parser()
        .then(
            just(TokenKind::Dot)
                .ignore_then(identifier_parser())
                .repeated(),
        )
        .map(|(first, rest)| {
            let mut name = first;
            for segment in rest {
                name.push('.');
                name.push_str(&segment);
            }
            name
        })
}

fn dims_parser() -> impl Parser<TokenKind, usize, Error = Simple<TokenKind>> + Clone {
    just(TokenKind::LBracket)
        .then(just(TokenKind::RBracket))
        .repeated()
        .map(|pairs| pairs.len())
}

fn type_parser() -> TokenParser<Node<Type>> {
    recursive(|ty| {
        let wildcard = just(TokenKind::Question)
            .ignore_then(
                choice((
                    just(TokenKind::Extends).to("? extends"),
                    just(TokenKind::Super).to("? super"),
                ))
                .then(ty.clone())
                .or_not(),
            )
            .map_with_span(|bound, span| {
                let ty = match bound {
                    Some((name, bound)) => Type {
                        name: name.to_string(),
                        args: vec![bound],
                        dims: 0,
                    },
                    None => Type::simple("?"),
                };
                Node::new(ty, span)
            });

        // A diamond keeps one empty argument so it prints back as `<>`.
        let type_args = just(TokenKind::Lt)
            .ignore_then(choice((wildcard, ty)).separated_by(just(TokenKind::Comma)))
            .then_ignore(just(TokenKind::Gt))
            .map_with_span(|args: Vec<Node<Type>>, span: Range<usize>| {
                if args.is_empty() {
                    vec![Node::new(Type::simple(""), span)]
                } else {
                    args
                }
            });

        qualified_name_parser()
            .then(type_args.or_not())
            .then(dims_parser())
            .map_with_span(|((name, args), dims), span| {
                Node::new(
                    Type {
                        name,
                        args: args.unwrap_or_default(),
                        dims,
                    },
                    span,
                )
            })
    })
    .boxed()
}

fn call_args(expr: ExprRef) -> TokenParser<Vec<Node<Expr>>> {
    expr.separated_by(just(TokenKind::Comma))
        .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
        .boxed()
}

fn array_init(expr: ExprRef) -> TokenParser<Vec<Node<Expr>>> {
    expr.separated_by(just(TokenKind::Comma))
        .allow_trailing()
        .delimited_by(just(TokenKind::LBrace), just(TokenKind::RBrace))
        .boxed()
}

fn block_parser(stmt: StmtRef) -> TokenParser<Node<Block>> {
    stmt.repeated()
        .delimited_by(just(TokenKind::LBrace), just(TokenKind::RBrace))
        .map_with_span(|statements, span| Node::new(Block::new(statements), span))
        .boxed()
}

fn binary_node(left: Node<Expr>, op: BinaryOp, right: Node<Expr>) -> Node<Expr> {
    let span = left.span().merge(right.span());
    Node::new(
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

/// Left-associative binary level over `operand`.
fn binary_level<P, O>(operand: P, op: O) -> TokenParser<Node<Expr>>
where
    P: Parser<TokenKind, Node<Expr>, Error = Simple<TokenKind>> + Clone + 'static,
    O: Parser<TokenKind, BinaryOp, Error = Simple<TokenKind>> + 'static,
{
    operand
        .clone()
        .then(op.then(operand).repeated())
        .foldl(|left, (op, right)| binary_node(left, op, right))
        .boxed()
}

/// `<<`, and `>>`/`>>>` assembled from adjacent `>` tokens (the lexer never
/// merges them so that nested generics close properly).
fn shift_op_parser() -> TokenParser<BinaryOp> {
    let gt = just(TokenKind::Gt).map_with_span(|_, span: Range<usize>| span);
    let unsigned = gt
        .clone()
        .then(gt.clone())
        .then(gt.clone())
        .try_map(|((first, second), third), span| {
            if first.end == second.start && second.end == third.start {
                Ok(BinaryOp::UShr)
            } else {
                Err(Simple::custom(span, "expected `>>>`"))
            }
        });
    let signed = gt.clone().then(gt).try_map(|(first, second), span| {
        if first.end == second.start {
            Ok(BinaryOp::Shr)
        } else {
            Err(Simple::custom(span, "expected `>>`"))
        }
    });

    choice((just(TokenKind::Shl).to(BinaryOp::Shl), unsigned, signed)).boxed()
}

#[derive(Debug, Clone)]
enum Suffix {
    Member {
        name: String,
        args: Option<Vec<Node<Expr>>>,
    },
    Index(Node<Expr>),
    MethodRef(String),
}

#[derive(Debug, Clone)]
enum NewTail {
    Object(Vec<Node<Expr>>),
    Sized(Vec<Node<Expr>>, usize),
    Init(Vec<Node<Expr>>),
}

#[derive(Debug, Clone)]
enum RelationalTail {
    Compare(BinaryOp, Node<Expr>),
    InstanceOf(Node<Type>),
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Name(_) | Expr::Field { .. } | Expr::Index { .. }
    )
}

fn expr_parser(expr: ExprRef, stmt: StmtRef) -> TokenParser<Node<Expr>> {
    let args = call_args(expr.clone());
    let block = block_parser(stmt);

    let literal = select! {
        TokenKind::Number(raw) => Literal::Number(raw),
        TokenKind::StringLiteral(raw) => Literal::String(raw),
        TokenKind::CharLiteral(raw) => Literal::Char(raw),
        TokenKind::True => Literal::Bool(true),
        TokenKind::False => Literal::Bool(false),
        TokenKind::Null => Literal::Null,
    }
    .map_with_span(|literal, span| Node::new(Expr::Literal(literal), span))
    .boxed();

    let lambda_param = choice((
        just(TokenKind::Final)
            .or_not()
            .ignore_then(type_parser())
            .ignore_then(spanned_identifier()),
        spanned_identifier(),
    ));
    let lambda_params = choice((
        spanned_identifier().map(|name| vec![name]),
        lambda_param
            .separated_by(just(TokenKind::Comma))
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen)),
    ));
    let lambda = lambda_params
        .then_ignore(just(TokenKind::Arrow))
        .then(choice((
            block.map(LambdaBody::Block),
            expr.clone().map(|body| LambdaBody::Expr(Box::new(body))),
        )))
        .map_with_span(|(params, body), span| Node::new(Expr::Lambda { params, body }, span))
        .boxed();

    let new_expr = just(TokenKind::New)
        .ignore_then(type_parser())
        .then(choice((
            args.clone().map(NewTail::Object),
            expr.clone()
                .delimited_by(just(TokenKind::LBracket), just(TokenKind::RBracket))
                .repeated()
                .at_least(1)
                .then(dims_parser())
                .map(|(dims, extra)| NewTail::Sized(dims, extra)),
            array_init(expr.clone()).map(NewTail::Init),
        )))
        .try_map(|(ty, tail), span: Range<usize>| {
            let (ty, ty_span) = ty.into_parts();
            let expr = match tail {
                NewTail::Object(args) if ty.dims == 0 => Expr::New {
                    ty: Node::new(ty, ty_span),
                    args,
                },
                NewTail::Sized(dims, extra_dims) if ty.dims == 0 => Expr::NewArray {
                    element: Node::new(ty, ty_span),
                    dims,
                    extra_dims,
                    init: None,
                },
                NewTail::Init(items) if ty.dims > 0 => {
                    let extra_dims = ty.dims;
                    Expr::NewArray {
                        element: Node::new(Type { dims: 0, ..ty }, ty_span),
                        dims: Vec::new(),
                        extra_dims,
                        init: Some(items),
                    }
                }
                _ => return Err(Simple::custom(span, "malformed `new` expression")),
            };
            Ok(Node::new(expr, span))
        })
        .boxed();

    let atom = choice((
        literal,
        new_expr,
        just(TokenKind::This).map_with_span(|_, span| Node::new(Expr::This, span)),
        just(TokenKind::Super).map_with_span(|_, span| Node::new(Expr::Super, span)),
        identifier_parser()
            .then(args.clone())
            .map_with_span(|(name, args), span| Node::new(Expr::call(None, name, args), span)),
        identifier_parser().map_with_span(|name, span| Node::new(Expr::Name(name), span)),
        // Parentheses are dropped from the tree but kept in the span, so an
        // edit over `(x).m()` starts at the opening parenthesis.
        expr.clone()
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
            .map_with_span(|inner: Node<Expr>, span| Node::new(inner.into_inner(), span)),
    ))
    .boxed();

    let member_name = choice((
        identifier_parser(),
        just(TokenKind::Class).to("class".to_string()),
    ));
    let member = just(TokenKind::Dot)
        .ignore_then(member_name)
        .then(args.or_not())
        .map(|(name, args)| Suffix::Member { name, args });
    let index = expr
        .clone()
        .delimited_by(just(TokenKind::LBracket), just(TokenKind::RBracket))
        .map(Suffix::Index);
    let method_ref = just(TokenKind::ColonColon)
        .ignore_then(choice((
            identifier_parser(),
            just(TokenKind::New).to("new".to_string()),
        )))
        .map(Suffix::MethodRef);

    let chain = atom
        .then(
            choice((member, index, method_ref))
                .map_with_span(|suffix, span: Range<usize>| (suffix, Span::from(span)))
                .repeated(),
        )
        .foldl(|target, (suffix, suffix_span)| {
            let span = target.span().merge(&suffix_span);
            let target = Box::new(target);
            let expr = match suffix {
                Suffix::Member {
                    name,
                    args: Some(args),
                } => Expr::Call {
                    target: Some(target),
                    name,
                    args,
                },
                Suffix::Member { name, args: None } => Expr::Field { target, name },
                Suffix::Index(index) => Expr::Index {
                    target,
                    index: Box::new(index),
                },
                Suffix::MethodRef(name) => Expr::MethodRef { target, name },
            };
            Node::new(expr, span)
        })
        .boxed();

    let postfix = chain
        .then(
            choice((
                just(TokenKind::PlusPlus).to(PostfixOp::Inc),
                just(TokenKind::MinusMinus).to(PostfixOp::Dec),
            ))
            .map_with_span(|op, span: Range<usize>| (op, Span::from(span)))
            .repeated(),
        )
        .foldl(|operand, (op, op_span)| {
            let span = operand.span().merge(&op_span);
            Node::new(
                Expr::Postfix {
                    op,
                    expr: Box::new(operand),
                },
                span,
            )
        })
        .boxed();

    let unary = recursive(|unary| {
        let prefix = choice((
            just(TokenKind::Minus).to(UnaryOp::Neg),
            just(TokenKind::Plus).to(UnaryOp::Plus),
            just(TokenKind::Bang).to(UnaryOp::Not),
            just(TokenKind::Tilde).to(UnaryOp::BitNot),
            just(TokenKind::PlusPlus).to(UnaryOp::PreInc),
            just(TokenKind::MinusMinus).to(UnaryOp::PreDec),
        ))
        .then(unary.clone())
        .map_with_span(|(op, operand), span| {
            Node::new(
                Expr::Unary {
                    op,
                    expr: Box::new(operand),
                },
                span,
            )
        });

        // `(Name) -x` is a subtraction unless `Name` is a primitive type.
        let cast = type_parser()
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
            .then(unary)
            .try_map(|(ty, operand): (Node<Type>, Node<Expr>), span: Range<usize>| {
                let signed = matches!(
                    operand.as_ref(),
                    Expr::Unary {
                        op: UnaryOp::Neg | UnaryOp::Plus | UnaryOp::PreInc | UnaryOp::PreDec,
                        ..
                    }
                );
                if signed && !ty.as_ref().is_primitive() {
                    return Err(Simple::custom(span, "not a cast"));
                }
                Ok(Node::new(
                    Expr::Cast {
                        ty,
                        expr: Box::new(operand),
                    },
                    span,
                ))
            });

        choice((prefix, cast, postfix.clone()))
    })
    .boxed();

    let multiplicative = binary_level(
        unary,
        choice((
            just(TokenKind::Star).to(BinaryOp::Mul),
            just(TokenKind::Slash).to(BinaryOp::Div),
            just(TokenKind::Percent).to(BinaryOp::Rem),
        )),
    );
    let additive = binary_level(
        multiplicative,
        choice((
            just(TokenKind::Plus).to(BinaryOp::Add),
            just(TokenKind::Minus).to(BinaryOp::Sub),
        )),
    );
    let shift = binary_level(additive, shift_op_parser());

    let relational = shift
        .clone()
        .then(
            choice((
                choice((
                    just(TokenKind::LtEq).to(BinaryOp::Le),
                    just(TokenKind::GtEq).to(BinaryOp::Ge),
                    just(TokenKind::Lt).to(BinaryOp::Lt),
                    just(TokenKind::Gt).to(BinaryOp::Gt),
                ))
                .then(shift)
                .map(|(op, right)| RelationalTail::Compare(op, right)),
                just(TokenKind::Instanceof)
                    .ignore_then(type_parser())
                    .map(RelationalTail::InstanceOf),
            ))
            .repeated(),
        )
        .foldl(|left, tail| match tail {
            RelationalTail::Compare(op, right) => binary_node(left, op, right),
            RelationalTail::InstanceOf(ty) => {
                let span = left.span().merge(ty.span());
                Node::new(
                    Expr::InstanceOf {
                        expr: Box::new(left),
                        ty,
                    },
                    span,
                )
            }
        })
        .boxed();

    let equality = binary_level(
        relational,
        choice((
            just(TokenKind::EqEq).to(BinaryOp::Eq),
            just(TokenKind::Neq).to(BinaryOp::Ne),
        )),
    );
    let bit_and = binary_level(equality, just(TokenKind::Amp).to(BinaryOp::BitAnd));
    let bit_xor = binary_level(bit_and, just(TokenKind::Caret).to(BinaryOp::BitXor));
    let bit_or = binary_level(bit_xor, just(TokenKind::Pipe).to(BinaryOp::BitOr));
    let logical_and = binary_level(bit_or, just(TokenKind::AndAnd).to(BinaryOp::And));
    let logical_or = binary_level(logical_and, just(TokenKind::OrOr).to(BinaryOp::Or));

    let lambda_for_else = lambda.clone();
    let branch_expr = expr.clone();
    let conditional = recursive(move |conditional| {
        logical_or
            .then(
                just(TokenKind::Question)
                    .ignore_then(branch_expr)
                    .then_ignore(just(TokenKind::Colon))
                    .then(choice((lambda_for_else, conditional)))
                    .or_not(),
            )
            .map_with_span(|(cond, branches), span| match branches {
                Some((then_expr, else_expr)) => Node::new(
                    Expr::Conditional {
                        cond: Box::new(cond),
                        then_expr: Box::new(then_expr),
                        else_expr: Box::new(else_expr),
                    },
                    span,
                ),
                None => cond,
            })
    })
    .boxed();

    let assign_op = choice((
        just(TokenKind::Equals).to(AssignOp::Assign),
        just(TokenKind::PlusEq).to(AssignOp::Add),
        just(TokenKind::MinusEq).to(AssignOp::Sub),
        just(TokenKind::StarEq).to(AssignOp::Mul),
        just(TokenKind::SlashEq).to(AssignOp::Div),
        just(TokenKind::PercentEq).to(AssignOp::Rem),
        just(TokenKind::AmpEq).to(AssignOp::BitAnd),
        just(TokenKind::PipeEq).to(AssignOp::BitOr),
        just(TokenKind::CaretEq).to(AssignOp::BitXor),
    ));

    // Parsed as `conditional (op expr)?` so the left side is read only once.
    let assignment = conditional
        .then(assign_op.then(expr).or_not())
        .try_map(|(target, value), span: Range<usize>| match value {
            None => Ok(target),
            Some((op, value)) if is_assignable(target.as_ref()) => Ok(Node::new(
                Expr::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                },
                span,
            )),
            Some(_) => Err(Simple::custom(
                span,
                "left-hand side of an assignment must be a variable",
            )),
        });

    choice((lambda, assignment)).boxed()
}

fn local_parser(expr: ExprRef) -> TokenParser<Node<Stmt>> {
    just(TokenKind::Final)
        .or_not()
        .ignore_then(type_parser())
        .then(spanned_identifier())
        .then(dims_parser())
        .then(
            just(TokenKind::Equals)
                .ignore_then(choice((
                    array_init(expr.clone()).map(Err),
                    expr.map(Ok),
                )))
                .or_not(),
        )
        .map_with_span(|(((ty, name), extra_dims), init), span| {
            let (mut declared, ty_span) = ty.into_parts();
            declared.dims += extra_dims;
            let init = init.map(|init| match init {
                Ok(expr) => expr,
                Err(items) => {
                    let span: Span = span.clone().into();
                    Node::new(
                        Expr::NewArray {
                            element: Node::new(
                                Type {
                                    dims: 0,
                                    ..declared.clone()
                                },
                                ty_span,
                            ),
                            dims: Vec::new(),
                            extra_dims: declared.dims,
                            init: Some(items),
                        },
                        span,
                    )
                }
            });
            Node::new(
                Stmt::Local {
                    ty: Node::new(declared, ty_span),
                    name,
                    init,
                },
                span,
            )
        })
        .boxed()
}

fn stmt_parser(expr: ExprRef, stmt: StmtRef) -> TokenParser<Node<Stmt>> {
    let block = block_parser(stmt.clone());
    let local = local_parser(expr.clone());
    let semi = just(TokenKind::Semicolon);
    let paren_expr = expr
        .clone()
        .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
        .boxed();

    let block_stmt = block
        .clone()
        .map_with_span(|block, span| Node::new(Stmt::Block(block), span));

    let empty_stmt = semi
        .clone()
        .map_with_span(|_, span| Node::new(Stmt::Empty, span));

    let return_stmt = just(TokenKind::Return)
        .ignore_then(expr.clone().or_not())
        .then_ignore(semi.clone())
        .map_with_span(|value, span| Node::new(Stmt::Return(value), span));

    let throw_stmt = just(TokenKind::Throw)
        .ignore_then(expr.clone())
        .then_ignore(semi.clone())
        .map_with_span(|value, span| Node::new(Stmt::Throw(value), span));

    let delegation = delegation_parser(expr.clone())
        .then_ignore(semi.clone())
        .map_with_span(|stmt, span| {
            let (stmt, _) = stmt.into_parts();
            Node::new(stmt, span)
        });

    let if_stmt = just(TokenKind::If)
        .ignore_then(paren_expr.clone())
        .then(stmt.clone())
        .then(just(TokenKind::Else).ignore_then(stmt.clone()).or_not())
        .map_with_span(|((cond, then_branch), else_branch), span| {
            Node::new(
                Stmt::If {
                    cond,
                    then_branch: Box::new(then_branch),
                    else_branch: else_branch.map(Box::new),
                },
                span,
            )
        });

    let while_stmt = just(TokenKind::While)
        .ignore_then(paren_expr.clone())
        .then(stmt.clone())
        .map_with_span(|(cond, body), span| {
            Node::new(
                Stmt::While {
                    cond,
                    body: Box::new(body),
                },
                span,
            )
        });

    let do_while = just(TokenKind::Do)
        .ignore_then(stmt.clone())
        .then_ignore(just(TokenKind::While))
        .then(paren_expr)
        .then_ignore(semi.clone())
        .map_with_span(|(body, cond), span| {
            Node::new(
                Stmt::DoWhile {
                    body: Box::new(body),
                    cond,
                },
                span,
            )
        });

    let for_each = just(TokenKind::For)
        .ignore_then(
            just(TokenKind::Final)
                .or_not()
                .ignore_then(type_parser())
                .then(spanned_identifier())
                .then_ignore(just(TokenKind::Colon))
                .then(expr.clone())
                .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen)),
        )
        .then(stmt.clone())
        .map_with_span(|(((ty, name), iterable), body), span| {
            Node::new(
                Stmt::ForEach {
                    ty,
                    name,
                    iterable,
                    body: Box::new(body),
                },
                span,
            )
        });

    let for_init = choice((
        local.clone().map(|local| vec![local]),
        expr.clone()
            .map_with_span(|expr, span| Node::new(Stmt::Expr(expr), span))
            .separated_by(just(TokenKind::Comma)),
    ));
    let for_stmt = just(TokenKind::For)
        .ignore_then(
            for_init
                .then_ignore(semi.clone())
                .then(expr.clone().or_not())
                .then_ignore(semi.clone())
                .then(expr.clone().separated_by(just(TokenKind::Comma)))
                .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen)),
        )
        .then(stmt.clone())
        .map_with_span(|(((init, cond), update), body), span| {
            Node::new(
                Stmt::For {
                    init,
                    cond,
                    update,
                    body: Box::new(body),
                },
                span,
            )
        });

    let catch_clause = just(TokenKind::Catch)
        .ignore_then(
            just(TokenKind::Final)
                .or_not()
                .ignore_then(
                    type_parser()
                        .separated_by(just(TokenKind::Pipe))
                        .at_least(1),
                )
                .then(spanned_identifier())
                .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen)),
        )
        .then(block.clone())
        .map_with_span(|((types, name), body), span| {
            Node::new(CatchClause { types, name, body }, span)
        });

    let try_stmt = just(TokenKind::Try)
        .ignore_then(
            local
                .clone()
                .separated_by(semi.clone())
                .allow_trailing()
                .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
                .or_not(),
        )
        .then(block.clone())
        .then(catch_clause.repeated())
        .then(just(TokenKind::Finally).ignore_then(block).or_not())
        .map_with_span(|(((resources, body), catches), finally), span| {
            Node::new(
                Stmt::Try {
                    resources: resources.unwrap_or_default(),
                    body,
                    catches,
                    finally,
                },
                span,
            )
        });

    let break_stmt = just(TokenKind::Break)
        .then(identifier_parser().or_not())
        .then_ignore(semi.clone())
        .map_with_span(|_, span| Node::new(Stmt::Break, span));

    let continue_stmt = just(TokenKind::Continue)
        .then(identifier_parser().or_not())
        .then_ignore(semi.clone())
        .map_with_span(|_, span| Node::new(Stmt::Continue, span));

    let local_stmt = local
        .then_ignore(semi.clone())
        .map_with_span(|local, span: Range<usize>| {
            let mut local = local;
            local.set_span(span.into());
            local
        });

    let expr_stmt = expr
        .then_ignore(semi)
        .map_with_span(|expr, span| Node::new(Stmt::Expr(expr), span));

    choice((
        block_stmt,
        empty_stmt,
        return_stmt,
        throw_stmt,
        if_stmt,
        while_stmt,
        do_while,
        for_each,
        for_stmt,
        try_stmt,
        break_stmt,
        continue_stmt,
        delegation,
        local_stmt,
        expr_stmt,
    ))
    .boxed()
}

/// `this(args)` or `super(args)` without the terminating `;`.
fn delegation_parser(expr: ExprRef) -> TokenParser<Node<Stmt>> {
    choice((
        just(TokenKind::This).to(DelegationKind::This),
        just(TokenKind::Super).to(DelegationKind::Super),
    ))
    .then(call_args(expr))
    .map_with_span(|(kind, args), span| Node::new(Stmt::Delegate { kind, args }, span))
    .boxed()
}

fn replacement_parser(expr: ExprRef) -> TokenParser<Node<Stmt>> {
    let throw = just(TokenKind::Throw)
        .ignore_then(expr.clone())
        .map_with_span(|value, span| Node::new(Stmt::Throw(value), span));
    let expression = expr
        .clone()
        .map_with_span(|value, span| Node::new(Stmt::Expr(value), span));

    choice((delegation_parser(expr), throw, expression))
        .then_ignore(just(TokenKind::Semicolon).or_not())
        .then_ignore(just(TokenKind::Eof))
        .boxed()
}

fn annotation_parser(expr: ExprRef) -> TokenParser<Node<Annotation>> {
    let value = recursive(move |value| {
        choice((
            value
                .separated_by(just(TokenKind::Comma))
                .allow_trailing()
                .delimited_by(just(TokenKind::LBrace), just(TokenKind::RBrace))
                .map(ElementValue::Array),
            expr.map(|expr| ElementValue::Expr(expr.into_inner())),
        ))
        .map_with_span(Node::new)
    })
    .boxed();

    let pair = identifier_parser()
        .then_ignore(just(TokenKind::Equals))
        .then(value.clone())
        .map(|(name, value)| AnnotationElement { name, value });

    // `name = value` pairs are tried first: a lone value would otherwise
    // parse `name = value` as an assignment expression.
    let elements = choice((
        pair.separated_by(just(TokenKind::Comma)).at_least(1),
        value.map(|value| {
            vec![AnnotationElement {
                name: "value".to_string(),
                value,
            }]
        }),
    ))
    .or_not()
    .map(Option::unwrap_or_default)
    .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
    .or_not()
    .map(Option::unwrap_or_default);

    just(TokenKind::At)
        .ignore_then(qualified_name_parser())
        .then(elements)
        .map_with_span(|(name, elements), span| Node::new(Annotation::new(name, elements), span))
        .boxed()
}

#[derive(Debug, Clone)]
enum ModifierItem {
    Annotation(Node<Annotation>),
    Keyword(Modifier),
}

fn modifiers_parser(expr: ExprRef) -> TokenParser<(Vec<Node<Annotation>>, Modifiers)> {
    let keyword = select! {
        TokenKind::Public => Modifier::Public,
        TokenKind::Protected => Modifier::Protected,
        TokenKind::Private => Modifier::Private,
        TokenKind::Static => Modifier::Static,
        TokenKind::Final => Modifier::Final,
        TokenKind::Abstract => Modifier::Abstract,
        TokenKind::Default => Modifier::Default,
        TokenKind::Synchronized => Modifier::Synchronized,
    };

    choice((
        annotation_parser(expr).map(ModifierItem::Annotation),
        keyword.map(ModifierItem::Keyword),
    ))
    .repeated()
    .map(|items| {
        let mut annotations = Vec::new();
        let mut keywords = Vec::new();
        for item in items {
            match item {
                ModifierItem::Annotation(annotation) => annotations.push(annotation),
                ModifierItem::Keyword(keyword) => keywords.push(keyword),
            }
        }
        (annotations, Modifiers::from_list(&keywords))
    })
    .boxed()
}

fn type_params_parser() -> TokenParser<Vec<String>> {
    identifier_parser()
        .then_ignore(
            just(TokenKind::Extends)
                .ignore_then(type_parser().separated_by(just(TokenKind::Amp)).at_least(1))
                .or_not(),
        )
        .separated_by(just(TokenKind::Comma))
        .at_least(1)
        .delimited_by(just(TokenKind::Lt), just(TokenKind::Gt))
        .or_not()
        .map(Option::unwrap_or_default)
        .boxed()
}

fn params_parser(expr: ExprRef) -> TokenParser<Vec<Node<Param>>> {
    let param_prefix = choice((
        annotation_parser(expr).map(Some),
        just(TokenKind::Final).to(None),
    ))
    .repeated()
    .map(|items| {
        let is_final = items.iter().any(Option::is_none);
        let annotations: Vec<_> = items.into_iter().flatten().collect();
        (annotations, is_final)
    });

    param_prefix
        .then(type_parser())
        .then(just(TokenKind::Ellipsis).or_not())
        .then(spanned_identifier())
        .then(dims_parser())
        .map_with_span(|((((prefix, ty), ellipsis), name), extra_dims), span| {
            let (annotations, is_final) = prefix;
            let ty = if extra_dims == 0 {
                ty
            } else {
                ty.map(|mut ty| {
                    ty.dims += extra_dims;
                    ty
                })
            };
            Node::new(
                Param {
                    annotations,
                    is_final,
                    ty,
                    varargs: ellipsis.is_some(),
                    name,
                },
                span,
            )
        })
        .separated_by(just(TokenKind::Comma))
        .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
        .boxed()
}

fn member_parser(expr: ExprRef, stmt: StmtRef) -> TokenParser<Member> {
    let modifiers = modifiers_parser(expr.clone());
    let block = block_parser(stmt);
    let params = params_parser(expr.clone());
    let throws = just(TokenKind::Throws)
        .ignore_then(
            type_parser()
                .separated_by(just(TokenKind::Comma))
                .at_least(1),
        )
        .or_not()
        .map(Option::unwrap_or_default)
        .boxed();

    let method = modifiers
        .clone()
        .then(type_params_parser())
        .then(choice((
            just(TokenKind::Void).to(None),
            type_parser().map(Some),
        )))
        .then(spanned_identifier())
        .then(params.clone())
        .then_ignore(dims_parser())
        .then(throws.clone())
        .then(choice((
            block.clone().map(Some),
            just(TokenKind::Semicolon).to(None),
        )))
        .map_with_span(
            |((((((annotations_and_modifiers, type_params), return_type), name), params), throws), body),
             span| {
                let (annotations, modifiers) = annotations_and_modifiers;
                Member::Method(Node::new(
                    MethodDecl {
                        annotations,
                        modifiers,
                        type_params,
                        return_type,
                        is_constructor: false,
                        name,
                        params,
                        throws,
                        body,
                    },
                    span,
                ))
            },
        );

    let constructor = modifiers
        .clone()
        .then(type_params_parser())
        .then(spanned_identifier())
        .then(params)
        .then(throws)
        .then(block)
        .map_with_span(
            |(((((annotations_and_modifiers, type_params), name), params), throws), body), span| {
                let (annotations, modifiers) = annotations_and_modifiers;
                Member::Method(Node::new(
                    MethodDecl {
                        annotations,
                        modifiers,
                        type_params,
                        return_type: None,
                        is_constructor: true,
                        name,
                        params,
                        throws,
                        body: Some(body),
                    },
                    span,
                ))
            },
        );

    let field = modifiers
        .then(type_parser())
        .then(spanned_identifier())
        .then(dims_parser())
        .then(
            just(TokenKind::Equals)
                .ignore_then(choice((
                    array_init(expr.clone()).map(Err),
                    expr.map(Ok),
                )))
                .or_not(),
        )
        .then_ignore(just(TokenKind::Semicolon))
        .map_with_span(
            |((((annotations_and_modifiers, ty), name), extra_dims), init), span: Range<usize>| {
                let (annotations, modifiers) = annotations_and_modifiers;
                let ty = ty.map(|mut ty| {
                    ty.dims += extra_dims;
                    ty
                });
                let init = init.map(|init| match init {
                    Ok(expr) => expr,
                    Err(items) => Node::new(
                        Expr::NewArray {
                            element: ty.clone().map(|ty| Type { dims: 0, ..ty }),
                            dims: Vec::new(),
                            extra_dims: ty.as_ref().dims,
                            init: Some(items),
                        },
                        span.clone(),
                    ),
                });
                Member::Field(Node::new(
                    FieldDecl {
                        annotations,
                        modifiers,
                        ty,
                        name,
                        init,
                    },
                    span,
                ))
            },
        );

    choice((method, constructor, field)).boxed()
}

fn type_decl_parser(expr: ExprRef, stmt: StmtRef) -> TokenParser<Node<TypeDecl>> {
    let type_list = type_parser()
        .separated_by(just(TokenKind::Comma))
        .at_least(1)
        .boxed();
    let members = choice((
        member_parser(expr.clone(), stmt).map(Some),
        just(TokenKind::Semicolon).to(None),
    ))
    .repeated()
    .map(|members| members.into_iter().flatten().collect::<Vec<_>>())
    .delimited_by(just(TokenKind::LBrace), just(TokenKind::RBrace));

    modifiers_parser(expr)
        .then(choice((
            just(TokenKind::Class).to(TypeKind::Class),
            just(TokenKind::Interface).to(TypeKind::Interface),
        )))
        .then(spanned_identifier())
        .then(type_params_parser())
        .then(just(TokenKind::Extends).ignore_then(type_list.clone()).or_not())
        .then(just(TokenKind::Implements).ignore_then(type_list).or_not())
        .then(members)
        .map_with_span(
            |((((((annotations_and_modifiers, kind), name), type_params), extends), implements), members),
             span| {
                let (annotations, modifiers) = annotations_and_modifiers;
                let members = if kind == TypeKind::Interface {
                    members.into_iter().map(interface_member).collect()
                } else {
                    members
                };
                Node::new(
                    TypeDecl {
                        annotations,
                        modifiers,
                        kind,
                        name,
                        type_params,
                        extends: extends.unwrap_or_default(),
                        implements: implements.unwrap_or_default(),
                        members,
                    },
                    span,
                )
            },
        )
        .boxed()
}

/// Interface members are implicitly public; fields are also static and
/// final, and bodiless non-static methods are abstract.
fn interface_member(member: Member) -> Member {
    match member {
        Member::Method(method) => Member::Method(method.map(|mut method| {
            if method.modifiers.visibility == Visibility::Package {
                method.modifiers.visibility = Visibility::Public;
            }
            if method.body.is_none() && !method.modifiers.is_static {
                method.modifiers.is_abstract = true;
            }
            method
        })),
        Member::Field(field) => Member::Field(field.map(|mut field| {
            if field.modifiers.visibility == Visibility::Package {
                field.modifiers.visibility = Visibility::Public;
            }
            field.modifiers.is_static = true;
            field.modifiers.is_final = true;
            field
        })),
    }
}

fn unit_parser(expr: ExprRef, stmt: StmtRef) -> TokenParser<CompilationUnit> {
    let semi = just(TokenKind::Semicolon);

    let package = just(TokenKind::Package)
        .ignore_then(qualified_name_parser().map_with_span(Node::new))
        .then_ignore(semi.clone());

    let import = just(TokenKind::Import)
        .ignore_then(just(TokenKind::Static).or_not().map(|s| s.is_some()))
        .then(qualified_name_parser())
        .then(
            just(TokenKind::Dot)
                .then(just(TokenKind::Star))
                .or_not()
                .map(|star| star.is_some()),
        )
        .then_ignore(semi)
        .map_with_span(|((is_static, path), on_demand), span| {
            Node::new(Import::new(path, is_static, on_demand), span)
        });

    package
        .or_not()
        .then(import.repeated())
        .then(type_decl_parser(expr, stmt).repeated())
        .then_ignore(just(TokenKind::Eof))
        .map(|((package, imports), types)| CompilationUnit::new(package, imports, types))
        .boxed()
}
