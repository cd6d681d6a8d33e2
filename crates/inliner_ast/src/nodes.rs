use std::convert::{AsMut, AsRef};
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};

use inliner_span::Span;

/// A node in the AST with an associated span.
///
/// Equality and hashing ignore the span, so two trees printed from different
/// places compare equal when their structure does.
#[derive(Debug, Clone)]
pub struct Node<T> {
    value: T,
    span: Span,
}

impl<T> Node<T> {
    pub fn new(value: T, span: impl Into<Span>) -> Self {
        Self {
            value,
            span: span.into(),
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, Span) {
        (self.value, self.span)
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn map<U, F>(self, f: F) -> Node<U>
    where
        F: FnOnce(T) -> U,
    {
        Node {
            value: f(self.value),
            span: self.span,
        }
    }
}

impl<T> AsRef<T> for Node<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T> AsMut<T> for Node<T> {
    fn as_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> PartialEq for Node<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Node<T> where T: Eq {}

impl<T> Hash for Node<T>
where
    T: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> Display for Node<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub package: Option<Node<String>>,
    pub imports: Vec<Node<Import>>,
    pub types: Vec<Node<TypeDecl>>,
}

impl CompilationUnit {
    pub fn new(
        package: Option<Node<String>>,
        imports: Vec<Node<Import>>,
        types: Vec<Node<TypeDecl>>,
    ) -> Self {
        Self {
            package,
            imports,
            types,
        }
    }

    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().map(|p| p.as_ref().as_str())
    }

    /// All methods and constructors of every type in the unit, with their owner.
    pub fn methods(&self) -> impl Iterator<Item = (&Node<TypeDecl>, &Node<MethodDecl>)> {
        self.types.iter().flat_map(|ty| {
            ty.as_ref()
                .members
                .iter()
                .filter_map(move |member| match member {
                    Member::Method(method) => Some((ty, method)),
                    Member::Field(_) => None,
                })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    pub path: String,
    pub is_static: bool,
    pub on_demand: bool,
}

impl Import {
    pub fn new(path: impl Into<String>, is_static: bool, on_demand: bool) -> Self {
        Self {
            path: path.into(),
            is_static,
            on_demand,
        }
    }

    /// Last dotted segment: the simple name a single-name import binds.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.path)
    }
}

/// Last segment of a dotted name.
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Everything before the last dot, if any.
pub fn qualifier(qualified: &str) -> Option<&str> {
    qualified.rsplit_once('.').map(|(head, _)| head)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    Private,
    Package,
    Protected,
    Public,
}

impl Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Visibility::Private => "private",
            Visibility::Package => "package-private",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_default: bool,
    pub is_synchronized: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            visibility: Visibility::Package,
            is_static: false,
            is_final: false,
            is_abstract: false,
            is_default: false,
            is_synchronized: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Default,
    Synchronized,
}

impl Modifiers {
    pub fn from_list(list: &[Modifier]) -> Self {
        let mut modifiers = Modifiers::default();
        for modifier in list {
            match modifier {
                Modifier::Public => modifiers.visibility = Visibility::Public,
                Modifier::Protected => modifiers.visibility = Visibility::Protected,
                Modifier::Private => modifiers.visibility = Visibility::Private,
                Modifier::Static => modifiers.is_static = true,
                Modifier::Final => modifiers.is_final = true,
                Modifier::Abstract => modifiers.is_abstract = true,
                Modifier::Default => modifiers.is_default = true,
                Modifier::Synchronized => modifiers.is_synchronized = true,
            }
        }
        modifiers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Name as written, possibly qualified (`Deprecated`, `com.x.InlineMe`).
    pub name: String,
    pub elements: Vec<AnnotationElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationElement {
    pub name: String,
    pub value: Node<ElementValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    Expr(Expr),
    Array(Vec<Node<ElementValue>>),
}

impl Annotation {
    pub fn new(name: impl Into<String>, elements: Vec<AnnotationElement>) -> Self {
        Self {
            name: name.into(),
            elements,
        }
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn element(&self, name: &str) -> Option<&Node<ElementValue>> {
        self.elements
            .iter()
            .find(|element| element.name == name)
            .map(|element| &element.value)
    }

    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|element| element.name.as_str())
    }
}

impl ElementValue {
    /// Constant string value; supports `"a" + "b"` concatenation.
    pub fn as_string(&self) -> Option<String> {
        match self {
            ElementValue::Expr(expr) => expr.constant_string(),
            ElementValue::Array(items) if items.len() == 1 => items[0].as_ref().as_string(),
            ElementValue::Array(_) => None,
        }
    }

    /// A string array, where a single string counts as a one-element array.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            ElementValue::Array(items) => items.iter().map(|item| item.as_ref().as_string()).collect(),
            ElementValue::Expr(_) => self.as_string().map(|single| vec![single]),
        }
    }
}

/// True when one of the annotations is `@Deprecated` (qualified or not).
pub fn has_deprecated(annotations: &[Node<Annotation>]) -> bool {
    annotations
        .iter()
        .any(|annotation| annotation.as_ref().simple_name() == "Deprecated")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub annotations: Vec<Node<Annotation>>,
    pub modifiers: Modifiers,
    pub kind: TypeKind,
    pub name: Node<String>,
    pub type_params: Vec<String>,
    pub extends: Vec<Node<Type>>,
    pub implements: Vec<Node<Type>>,
    pub members: Vec<Member>,
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn fields(&self) -> impl Iterator<Item = &Node<FieldDecl>> {
        self.members.iter().filter_map(|member| match member {
            Member::Field(field) => Some(field),
            Member::Method(_) => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &Node<MethodDecl>> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            Member::Field(_) => None,
        })
    }

    /// Supertypes in declaration order (`extends` first).
    pub fn supertypes(&self) -> impl Iterator<Item = &Node<Type>> {
        self.extends.iter().chain(self.implements.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Field(Node<FieldDecl>),
    Method(Node<MethodDecl>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub annotations: Vec<Node<Annotation>>,
    pub modifiers: Modifiers,
    pub ty: Node<Type>,
    pub name: Node<String>,
    pub init: Option<Node<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub annotations: Vec<Node<Annotation>>,
    pub modifiers: Modifiers,
    pub type_params: Vec<String>,
    /// `None` for `void` methods and for constructors.
    pub return_type: Option<Node<Type>>,
    pub is_constructor: bool,
    pub name: Node<String>,
    pub params: Vec<Node<Param>>,
    pub throws: Vec<Node<Type>>,
    pub body: Option<Node<Block>>,
}

impl MethodDecl {
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    pub fn is_void(&self) -> bool {
        self.return_type.is_none()
    }

    pub fn is_varargs(&self) -> bool {
        self.params.last().is_some_and(|param| param.as_ref().varargs)
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|param| param.as_ref().name.as_ref().clone())
            .collect()
    }

    pub fn is_deprecated(&self) -> bool {
        has_deprecated(&self.annotations)
    }

    pub fn annotation(&self, simple: &str) -> Option<&Node<Annotation>> {
        self.annotations
            .iter()
            .find(|annotation| annotation.as_ref().simple_name() == simple)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub annotations: Vec<Node<Annotation>>,
    pub is_final: bool,
    pub ty: Node<Type>,
    pub varargs: bool,
    pub name: Node<String>,
}

/// A (possibly generic, possibly array) type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    /// Name as written, possibly qualified.
    pub name: String,
    pub args: Vec<Node<Type>>,
    pub dims: usize,
}

impl Type {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            dims: 0,
        }
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn is_primitive(&self) -> bool {
        self.dims == 0
            && matches!(
                self.name.as_str(),
                "boolean" | "byte" | "char" | "short" | "int" | "long" | "float" | "double"
            )
    }

    /// First segment of the written name, the one resolved in scope.
    pub fn head_name(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub statements: Vec<Node<Stmt>>,
}

impl Block {
    pub fn new(statements: Vec<Node<Stmt>>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelegationKind {
    This,
    Super,
}

impl DelegationKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DelegationKind::This => "this",
            DelegationKind::Super => "super",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchClause {
    pub types: Vec<Node<Type>>,
    pub name: Node<String>,
    pub body: Node<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Expr(Node<Expr>),
    Return(Option<Node<Expr>>),
    Throw(Node<Expr>),
    /// `this(...)` / `super(...)` constructor delegation.
    Delegate {
        kind: DelegationKind,
        args: Vec<Node<Expr>>,
    },
    Local {
        ty: Node<Type>,
        name: Node<String>,
        init: Option<Node<Expr>>,
    },
    Block(Node<Block>),
    If {
        cond: Node<Expr>,
        then_branch: Box<Node<Stmt>>,
        else_branch: Option<Box<Node<Stmt>>>,
    },
    While {
        cond: Node<Expr>,
        body: Box<Node<Stmt>>,
    },
    DoWhile {
        body: Box<Node<Stmt>>,
        cond: Node<Expr>,
    },
    For {
        init: Vec<Node<Stmt>>,
        cond: Option<Node<Expr>>,
        update: Vec<Node<Expr>>,
        body: Box<Node<Stmt>>,
    },
    ForEach {
        ty: Node<Type>,
        name: Node<String>,
        iterable: Node<Expr>,
        body: Box<Node<Stmt>>,
    },
    Try {
        resources: Vec<Node<Stmt>>,
        body: Node<Block>,
        catches: Vec<Node<CatchClause>>,
        finally: Option<Node<Block>>,
    },
    Break,
    Continue,
    Empty,
}

impl Stmt {
    /// Human-readable kind, used in extraction diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Stmt::Expr(_) => "expression statement",
            Stmt::Return(_) => "return statement",
            Stmt::Throw(_) => "throw statement",
            Stmt::Delegate { .. } => "constructor delegation",
            Stmt::Local { .. } => "local variable declaration",
            Stmt::Block(_) => "block",
            Stmt::If { .. } => "if statement",
            Stmt::While { .. } => "while loop",
            Stmt::DoWhile { .. } => "do-while loop",
            Stmt::For { .. } => "for loop",
            Stmt::ForEach { .. } => "for-each loop",
            Stmt::Try { .. } => "try statement",
            Stmt::Break => "break statement",
            Stmt::Continue => "continue statement",
            Stmt::Empty => "empty statement",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// Raw numeric text, suffix included.
    Number(String),
    /// Raw text including the quotes.
    String(String),
    /// Raw text including the quotes.
    Char(String),
    Bool(bool),
    Null,
}

impl Literal {
    /// Unescaped contents of a string literal.
    pub fn string_value(&self) -> Option<String> {
        let Literal::String(raw) = self else {
            return None;
        };
        let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        Some(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    UShr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// `&&` and `||` skip their right operand.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc => "++",
            UnaryOp::PreDec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    Inc,
    Dec,
}

impl PostfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PostfixOp::Inc => "++",
            PostfixOp::Dec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
        }
    }
}

/// Template slot. Only appears in template bodies, never in parsed source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// A formal parameter, by declaration index.
    Param { name: String, index: usize },
    /// The call receiver: `explicit` for a written `this`, otherwise the
    /// implicit qualifier of an unqualified member reference.
    Receiver { explicit: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LambdaBody {
    Expr(Box<Node<Expr>>),
    Block(Node<Block>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Literal),
    /// Simple or dotted name that could not be split further by the parser.
    Name(String),
    This,
    Super,
    Field {
        target: Box<Node<Expr>>,
        name: String,
    },
    Call {
        target: Option<Box<Node<Expr>>>,
        name: String,
        args: Vec<Node<Expr>>,
    },
    New {
        ty: Node<Type>,
        args: Vec<Node<Expr>>,
    },
    NewArray {
        element: Node<Type>,
        dims: Vec<Node<Expr>>,
        /// Number of `[]` pairs written without a dimension expression.
        extra_dims: usize,
        init: Option<Vec<Node<Expr>>>,
    },
    Index {
        target: Box<Node<Expr>>,
        index: Box<Node<Expr>>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Node<Expr>>,
    },
    Postfix {
        op: PostfixOp,
        expr: Box<Node<Expr>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node<Expr>>,
        right: Box<Node<Expr>>,
    },
    Conditional {
        cond: Box<Node<Expr>>,
        then_expr: Box<Node<Expr>>,
        else_expr: Box<Node<Expr>>,
    },
    Assign {
        op: AssignOp,
        target: Box<Node<Expr>>,
        value: Box<Node<Expr>>,
    },
    Lambda {
        params: Vec<Node<String>>,
        body: LambdaBody,
    },
    MethodRef {
        target: Box<Node<Expr>>,
        name: String,
    },
    Cast {
        ty: Node<Type>,
        expr: Box<Node<Expr>>,
    },
    InstanceOf {
        expr: Box<Node<Expr>>,
        ty: Node<Type>,
    },
    Placeholder(Placeholder),
}

impl Expr {
    pub fn call(target: Option<Node<Expr>>, name: impl Into<String>, args: Vec<Node<Expr>>) -> Self {
        Expr::Call {
            target: target.map(Box::new),
            name: name.into(),
            args,
        }
    }

    /// Compile-time string constant (literal or `+` of constants).
    pub fn constant_string(&self) -> Option<String> {
        match self {
            Expr::Literal(literal) => literal.string_value(),
            Expr::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => {
                let mut text = left.as_ref().as_ref().constant_string()?;
                text.push_str(&right.as_ref().as_ref().constant_string()?);
                Some(text)
            }
            _ => None,
        }
    }

    pub fn bool_constant(&self) -> Option<bool> {
        match self {
            Expr::Literal(Literal::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Whether evaluating this expression as a statement does something.
    pub fn is_effectful(&self) -> bool {
        match self {
            Expr::Call { .. }
            | Expr::New { .. }
            | Expr::NewArray { .. }
            | Expr::Assign { .. }
            | Expr::Postfix { .. } => true,
            Expr::Unary { op, .. } => matches!(op, UnaryOp::PreInc | UnaryOp::PreDec),
            _ => false,
        }
    }

    pub fn is_receiver_placeholder(&self) -> bool {
        matches!(self, Expr::Placeholder(Placeholder::Receiver { .. }))
    }

    pub fn is_implicit_receiver(&self) -> bool {
        matches!(self, Expr::Placeholder(Placeholder::Receiver { explicit: false }))
    }

    /// Name of the placeholder parameter, if this is a parameter slot.
    pub fn param_placeholder(&self) -> Option<&str> {
        match self {
            Expr::Placeholder(Placeholder::Param { name, .. }) => Some(name),
            _ => None,
        }
    }

    /// A side-effect free receiver that is safe to re-evaluate.
    pub fn is_simple_reference(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::This | Expr::Super => true,
            Expr::Field { target, .. } => target.as_ref().as_ref().is_simple_reference(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(raw: &str) -> Node<Expr> {
        Node::new(Expr::Literal(Literal::String(raw.into())), Span::default())
    }

    #[test]
    fn unescapes_string_literals() {
        let literal = Literal::String("\"a\\\"b\\n\"".into());
        assert_eq!(literal.string_value().as_deref(), Some("a\"b\n"));
    }

    #[test]
    fn concatenated_constants_fold() {
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(lit("\"this.\"")),
            right: Box::new(lit("\"after(x)\"")),
        };
        assert_eq!(expr.constant_string().as_deref(), Some("this.after(x)"));
    }

    #[test]
    fn node_equality_ignores_spans() {
        let a = Node::new(Expr::Name("x".into()), Span::new(0, 1));
        let b = Node::new(Expr::Name("x".into()), Span::new(10, 11));
        assert_eq!(a, b);
    }

    #[test]
    fn visibility_orders_from_private_to_public() {
        assert!(Visibility::Private < Visibility::Package);
        assert!(Visibility::Protected < Visibility::Public);
    }

    #[test]
    fn import_simple_names() {
        assert_eq!(Import::new("java.util.List", false, false).simple_name(), "List");
        assert_eq!(qualifier("a.b.C"), Some("a.b"));
        assert_eq!(qualifier("C"), None);
    }
}
