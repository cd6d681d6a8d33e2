//! In-memory [`SymbolService`] over parsed compilation units.
//!
//! Building happens in two passes: type declarations first, so that member
//! and variable types can be resolved against every indexed type in the
//! second pass.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use inliner_ast::nodes::{
    Block, CompilationUnit, Expr, Import, LambdaBody, Member, MethodDecl, Modifiers, Node, Stmt,
    Type, TypeDecl, TypeKind, Visibility, has_deprecated, qualifier,
};
use inliner_ast::visit::children;
use inliner_parser::{SourceError, parse_source};
use inliner_span::{FileId, Span};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::decl::{DeclId, DeclKind, Declaration};
use crate::service::{
    Binding, ImportKind, ImportRequirement, ImportState, ResolutionContext, SymbolService,
};

/// Types of `java.lang` that every file sees without an import.
static JAVA_LANG: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "AutoCloseable",
        "Boolean",
        "Byte",
        "CharSequence",
        "Character",
        "Class",
        "Comparable",
        "Deprecated",
        "Double",
        "Enum",
        "Error",
        "Exception",
        "Float",
        "FunctionalInterface",
        "IllegalArgumentException",
        "IllegalStateException",
        "IndexOutOfBoundsException",
        "Integer",
        "Iterable",
        "Long",
        "Math",
        "NullPointerException",
        "Number",
        "Object",
        "Override",
        "Runnable",
        "RuntimeException",
        "Short",
        "String",
        "StringBuilder",
        "SuppressWarnings",
        "System",
        "Thread",
        "Throwable",
        "UnsupportedOperationException",
        "Void",
    ]
    .into_iter()
    .collect()
});

pub fn is_java_lang(simple: &str) -> bool {
    JAVA_LANG.contains(simple)
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
    pub unit: CompilationUnit,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>, unit: CompilationUnit) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            unit,
        }
    }

    pub fn parse(path: impl Into<String>, text: impl Into<String>) -> Result<Self, SourceError> {
        let text = text.into();
        let unit = parse_source(&text)?;
        Ok(Self::new(path, text, unit))
    }

    pub fn package(&self) -> Option<&str> {
        self.unit.package_name()
    }
}

#[derive(Debug, Clone)]
struct ScopeEntry {
    name: String,
    visible: Span,
    decl: DeclId,
}

#[derive(Debug)]
struct FileEntry {
    source: SourceFile,
    types: Vec<DeclId>,
    scopes: Vec<ScopeEntry>,
}

/// Location of a callable's AST: (file, type, member) indices.
#[derive(Debug, Clone, Copy)]
struct MemberPath {
    file: usize,
    ty: usize,
    member: usize,
}

/// What a written type name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeRef {
    Indexed(DeclId, String),
    External(String),
}

impl TypeRef {
    fn qualified(&self) -> &str {
        match self {
            TypeRef::Indexed(_, name) | TypeRef::External(name) => name,
        }
    }

    fn decl(&self) -> Option<DeclId> {
        match self {
            TypeRef::Indexed(id, _) => Some(*id),
            TypeRef::External(_) => None,
        }
    }
}

fn qualify(package: Option<&str>, name: &str) -> String {
    match package {
        Some(package) => format!("{package}.{name}"),
        None => name.to_string(),
    }
}

/// Resolve a type name as written in `file`: declared types, single-type
/// imports, same package, on-demand imports, then `java.lang`.
fn resolve_type_in(
    types: &AHashMap<String, DeclId>,
    file: &SourceFile,
    name: &str,
) -> Option<TypeRef> {
    let indexed = |qualified: &str| {
        types
            .get(qualified)
            .map(|id| TypeRef::Indexed(*id, qualified.to_string()))
    };
    if name.contains('.') {
        return indexed(name).or_else(|| Some(TypeRef::External(name.to_string())));
    }
    if file.unit.types.iter().any(|ty| ty.as_ref().name() == name) {
        return indexed(&qualify(file.package(), name));
    }
    let single = file
        .unit
        .imports
        .iter()
        .map(AsRef::as_ref)
        .find(|import| !import.is_static && !import.on_demand && import.simple_name() == name);
    if let Some(import) = single {
        return indexed(&import.path).or_else(|| Some(TypeRef::External(import.path.clone())));
    }
    if let Some(found) = indexed(&qualify(file.package(), name)) {
        return Some(found);
    }
    let on_demand = file
        .unit
        .imports
        .iter()
        .map(AsRef::as_ref)
        .filter(|import| !import.is_static && import.on_demand)
        .find_map(|import| indexed(&format!("{}.{name}", import.path)));
    if on_demand.is_some() {
        return on_demand;
    }
    if is_java_lang(name) {
        return Some(TypeRef::External(format!("java.lang.{name}")));
    }
    None
}

/// Symbol index over a fixed set of files.
#[derive(Debug, Default)]
pub struct SourceIndex {
    files: Vec<FileEntry>,
    decls: Vec<Declaration>,
    types: AHashMap<String, DeclId>,
    members: AHashMap<DeclId, Vec<DeclId>>,
    supertypes: AHashMap<DeclId, Vec<DeclId>>,
    callables: AHashMap<DeclId, MemberPath>,
}

impl SourceIndex {
    pub fn build(sources: Vec<SourceFile>) -> Self {
        let mut index = SourceIndex::default();
        index.files = sources
            .into_iter()
            .map(|source| FileEntry {
                source,
                types: Vec::new(),
                scopes: Vec::new(),
            })
            .collect();
        index.collect_types();
        for file in 0..index.files.len() {
            index.collect_members(file);
        }
        debug!(
            files = index.files.len(),
            declarations = index.decls.len(),
            "built source index"
        );
        index
    }

    fn push(&mut self, mut decl: Declaration) -> DeclId {
        let id = DeclId::new(self.decls.len() as u32);
        decl.id = id;
        self.decls.push(decl);
        id
    }

    fn collect_types(&mut self) {
        for file_index in 0..self.files.len() {
            let file_id = FileId::new(file_index as u32);
            let mut pending = Vec::new();
            {
                let source = &self.files[file_index].source;
                for ty in &source.unit.types {
                    let decl = ty.as_ref();
                    pending.push(Declaration {
                        id: DeclId::new(0),
                        kind: match decl.kind {
                            TypeKind::Class => DeclKind::Class,
                            TypeKind::Interface => DeclKind::Interface,
                        },
                        name: decl.name().to_string(),
                        owner: None,
                        file: file_id,
                        span: *ty.span(),
                        visibility: decl.modifiers.visibility,
                        is_static: true,
                        deprecated: has_deprecated(&decl.annotations),
                        ty: None,
                        ty_decl: None,
                        params: Vec::new(),
                        varargs: false,
                        qualified_name: Some(qualify(source.package(), decl.name())),
                    });
                }
            }
            for decl in pending {
                let qualified = decl.qualified_name.clone().unwrap_or_default();
                let id = self.push(decl);
                self.types.insert(qualified, id);
                self.files[file_index].types.push(id);
            }
        }
    }

    fn collect_members(&mut self, file_index: usize) {
        let file_id = FileId::new(file_index as u32);
        let type_ids = self.files[file_index].types.clone();
        let mut builder = MemberBuilder {
            file: file_id,
            source: &self.files[file_index].source,
            types: &self.types,
            decls: Vec::new(),
            scopes: Vec::new(),
            members: Vec::new(),
            supertypes: Vec::new(),
            callables: Vec::new(),
            next_id: self.decls.len() as u32,
        };
        let source = builder.source;
        for (ty_index, (ty, owner)) in source
            .unit
            .types
            .iter()
            .zip(type_ids.iter().copied())
            .enumerate()
        {
            builder.type_members(file_index, ty_index, ty.as_ref(), owner);
        }
        let MemberBuilder {
            decls,
            scopes,
            members,
            supertypes,
            callables,
            ..
        } = builder;
        self.decls.extend(decls);
        self.files[file_index].scopes = scopes;
        for (owner, member) in members {
            self.members.entry(owner).or_default().push(member);
        }
        for (sub, sup) in supertypes {
            self.supertypes.entry(sub).or_default().push(sup);
        }
        self.callables.extend(callables);
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        (0..self.files.len()).map(|index| FileId::new(index as u32))
    }

    pub fn file(&self, file: FileId) -> Option<&SourceFile> {
        self.files.get(file.index()).map(|entry| &entry.source)
    }

    pub fn file_by_path(&self, path: &str) -> Option<FileId> {
        self.files
            .iter()
            .position(|entry| entry.source.path == path)
            .map(|index| FileId::new(index as u32))
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    pub fn members_of(&self, owner: DeclId) -> &[DeclId] {
        self.members.get(&owner).map_or(&[], Vec::as_slice)
    }

    /// Declaring type and AST of a method or constructor.
    pub fn callable_ast(&self, id: DeclId) -> Option<(&TypeDecl, &MethodDecl)> {
        let path = self.callables.get(&id)?;
        let ty = self.files.get(path.file)?.source.unit.types.get(path.ty)?.as_ref();
        match ty.members.get(path.member)? {
            Member::Method(method) => Some((ty, method.as_ref())),
            Member::Field(_) => None,
        }
    }

    /// Every method and constructor of the type `qualified_type` called `name`.
    pub fn callables_named(&self, qualified_type: &str, name: &str) -> Vec<DeclId> {
        let Some(owner) = self.types.get(qualified_type) else {
            return Vec::new();
        };
        self.members_of(*owner)
            .iter()
            .copied()
            .filter(|id| {
                self.decls
                    .get(id.index())
                    .is_some_and(|decl| decl.kind.is_callable() && decl.name == name)
            })
            .collect()
    }

    fn entry(&self, file: FileId) -> Option<&FileEntry> {
        self.files.get(file.index())
    }

    fn local_at(&self, cx: &ResolutionContext, name: &str) -> Option<DeclId> {
        self.entry(cx.file)?
            .scopes
            .iter()
            .filter(|scope| scope.name == name && scope.visible.contains(cx.position))
            .max_by_key(|scope| scope.visible.start())
            .map(|scope| scope.decl)
    }

    /// Breadth-first walk over `start` and its supertypes.
    fn hierarchy(&self, start: DeclId) -> Vec<DeclId> {
        let mut seen = AHashSet::new();
        let mut queue = VecDeque::from([start]);
        let mut order = Vec::new();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            if let Some(supers) = self.supertypes.get(&current) {
                queue.extend(supers.iter().copied());
            }
        }
        order
    }

    fn find_in_type(&self, owner: DeclId, name: &str, arity: Option<usize>) -> Option<DeclId> {
        let candidates = self.members_of(owner).iter().filter_map(|id| self.decls.get(id.index()));
        match arity {
            None => candidates
                .filter(|decl| decl.kind == DeclKind::Field && decl.name == name)
                .map(|decl| decl.id)
                .next(),
            Some(count) => {
                let methods: Vec<&Declaration> = candidates
                    .filter(|decl| decl.kind == DeclKind::Method && decl.name == name)
                    .collect();
                methods
                    .iter()
                    .find(|decl| !decl.varargs && decl.arity() == count)
                    .or_else(|| methods.iter().find(|decl| decl.accepts_arity(count)))
                    .map(|decl| decl.id)
            }
        }
    }

    fn has_member_named(&self, owner: DeclId, name: &str) -> Option<DeclId> {
        self.hierarchy(owner).into_iter().find_map(|ty| {
            self.members_of(ty).iter().copied().find(|id| {
                self.decls.get(id.index()).is_some_and(|decl| {
                    decl.name == name && matches!(decl.kind, DeclKind::Field | DeclKind::Method)
                })
            })
        })
    }

    fn static_imports<'a>(&'a self, file: FileId) -> impl Iterator<Item = &'a Import> + 'a {
        self.entry(file)
            .into_iter()
            .flat_map(|entry| entry.source.unit.imports.iter())
            .map(AsRef::as_ref)
            .filter(|import| import.is_static)
    }
}

/// Collects the members, parameters and locals of one file.
struct MemberBuilder<'a> {
    file: FileId,
    source: &'a SourceFile,
    types: &'a AHashMap<String, DeclId>,
    decls: Vec<Declaration>,
    scopes: Vec<ScopeEntry>,
    members: Vec<(DeclId, DeclId)>,
    supertypes: Vec<(DeclId, DeclId)>,
    callables: Vec<(DeclId, MemberPath)>,
    next_id: u32,
}

impl MemberBuilder<'_> {
    fn resolve(&self, ty: &Type) -> Option<DeclId> {
        if ty.dims > 0 || ty.is_primitive() {
            return None;
        }
        resolve_type_in(self.types, self.source, &ty.name).and_then(|found| found.decl())
    }

    #[expect(clippy::too_many_arguments, reason = "plain record constructor")]
    fn declare(
        &mut self,
        kind: DeclKind,
        name: &str,
        owner: Option<DeclId>,
        span: Span,
        modifiers: Modifiers,
        deprecated: bool,
        ty: Option<Type>,
        qualified_name: Option<String>,
    ) -> DeclId {
        let id = DeclId::new(self.next_id);
        self.next_id += 1;
        let ty_decl = ty.as_ref().and_then(|ty| self.resolve(ty));
        self.decls.push(Declaration {
            id,
            kind,
            name: name.to_string(),
            owner,
            file: self.file,
            span,
            visibility: modifiers.visibility,
            is_static: modifiers.is_static,
            deprecated,
            ty,
            ty_decl,
            params: Vec::new(),
            varargs: false,
            qualified_name,
        });
        id
    }

    fn bind(&mut self, name: &str, ty: Option<Type>, kind: DeclKind, decl_span: Span, visible: Span) {
        let id = self.declare(kind, name, None, decl_span, Modifiers::default(), false, ty, None);
        self.scopes.push(ScopeEntry {
            name: name.to_string(),
            visible,
            decl: id,
        });
    }

    fn type_members(&mut self, file: usize, ty_index: usize, ty: &TypeDecl, owner: DeclId) {
        for sup in ty.supertypes() {
            if let Some(sup) = self.resolve(sup.as_ref()) {
                self.supertypes.push((owner, sup));
            }
        }
        let owner_name = qualify(self.source.package(), ty.name());
        for (member_index, member) in ty.members.iter().enumerate() {
            match member {
                Member::Field(field) => {
                    let decl = field.as_ref();
                    let id = self.declare(
                        DeclKind::Field,
                        decl.name.as_ref(),
                        Some(owner),
                        *field.span(),
                        decl.modifiers,
                        has_deprecated(&decl.annotations),
                        Some(decl.ty.as_ref().clone()),
                        Some(format!("{owner_name}.{}", decl.name.as_ref())),
                    );
                    self.members.push((owner, id));
                    if let Some(init) = &decl.init {
                        self.scope_expr(init);
                    }
                }
                Member::Method(method) => {
                    let decl = method.as_ref();
                    let kind = if decl.is_constructor {
                        DeclKind::Constructor
                    } else {
                        DeclKind::Method
                    };
                    let id = self.declare(
                        kind,
                        decl.name(),
                        Some(owner),
                        *method.span(),
                        decl.modifiers,
                        decl.is_deprecated(),
                        decl.return_type.as_ref().map(|ty| ty.as_ref().clone()),
                        Some(format!("{owner_name}.{}", decl.name())),
                    );
                    if let Some(record) = self.decls.last_mut() {
                        record.params = decl
                            .params
                            .iter()
                            .map(|param| param.as_ref().ty.as_ref().clone())
                            .collect();
                        record.varargs = decl.is_varargs();
                    }
                    self.members.push((owner, id));
                    self.callables.push((
                        id,
                        MemberPath {
                            file,
                            ty: ty_index,
                            member: member_index,
                        },
                    ));
                    for param in &decl.params {
                        let param_decl = param.as_ref();
                        let mut ty = param_decl.ty.as_ref().clone();
                        if param_decl.varargs {
                            ty.dims += 1;
                        }
                        self.bind(
                            param_decl.name.as_ref(),
                            Some(ty),
                            DeclKind::Param,
                            *param.span(),
                            *method.span(),
                        );
                    }
                    if let Some(body) = &decl.body {
                        self.scope_block(body);
                    }
                }
            }
        }
    }

    fn scope_block(&mut self, block: &Node<Block>) {
        self.scope_stmts(&block.as_ref().statements, *block.span());
    }

    fn scope_stmts(&mut self, statements: &[Node<Stmt>], enclosing: Span) {
        for stmt in statements {
            self.scope_stmt(stmt, enclosing);
        }
    }

    /// Record the bindings a statement introduces. Locals declared directly
    /// in a block are visible until the end of that block.
    fn scope_stmt(&mut self, stmt: &Node<Stmt>, enclosing: Span) {
        let span = *stmt.span();
        match stmt.as_ref() {
            Stmt::Local { ty, name, init } => {
                if let Some(init) = init {
                    self.scope_expr(init);
                }
                let visible = Span::new(span.start(), enclosing.end());
                self.bind(name.as_ref(), Some(ty.as_ref().clone()), DeclKind::Local, span, visible);
            }
            Stmt::Expr(expr) | Stmt::Throw(expr) => self.scope_expr(expr),
            Stmt::Return(expr) => {
                if let Some(expr) = expr {
                    self.scope_expr(expr);
                }
            }
            Stmt::Delegate { args, .. } => {
                for arg in args {
                    self.scope_expr(arg);
                }
            }
            Stmt::Block(block) => self.scope_block(block),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.scope_expr(cond);
                self.scope_stmt(then_branch, *then_branch.span());
                if let Some(else_branch) = else_branch {
                    self.scope_stmt(else_branch, *else_branch.span());
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                self.scope_expr(cond);
                self.scope_stmt(body, *body.span());
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                for stmt in init {
                    self.scope_stmt(stmt, span);
                }
                if let Some(cond) = cond {
                    self.scope_expr(cond);
                }
                for expr in update {
                    self.scope_expr(expr);
                }
                self.scope_stmt(body, *body.span());
            }
            Stmt::ForEach {
                ty,
                name,
                iterable,
                body,
            } => {
                self.scope_expr(iterable);
                self.bind(name.as_ref(), Some(ty.as_ref().clone()), DeclKind::Local, *name.span(), span);
                self.scope_stmt(body, *body.span());
            }
            Stmt::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                for resource in resources {
                    self.scope_stmt(resource, span);
                }
                self.scope_block(body);
                for catch in catches {
                    let clause = catch.as_ref();
                    let ty = clause.types.first().map(|ty| ty.as_ref().clone());
                    self.bind(clause.name.as_ref(), ty, DeclKind::Local, *clause.name.span(), *catch.span());
                    self.scope_block(&clause.body);
                }
                if let Some(finally) = finally {
                    self.scope_block(finally);
                }
            }
            Stmt::Break | Stmt::Continue | Stmt::Empty => {}
        }
    }

    fn scope_expr(&mut self, expr: &Node<Expr>) {
        if let Expr::Lambda { params, body } = expr.as_ref() {
            for param in params {
                self.bind(param.as_ref(), None, DeclKind::Param, *param.span(), *expr.span());
            }
            match body {
                LambdaBody::Expr(body) => self.scope_expr(body),
                LambdaBody::Block(block) => self.scope_block(block),
            }
            return;
        }
        for (_, child) in children(expr.as_ref()) {
            self.scope_expr(child);
        }
    }
}

impl SymbolService for SourceIndex {
    fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.index())
    }

    fn resolve_name(&self, cx: &ResolutionContext, name: &str) -> Option<Binding> {
        if let Some(local) = self.local_at(cx, name) {
            return Some(Binding::Local(local));
        }
        if let Some(owner) = self.enclosing_type(cx)
            && let Some(field) = self.resolve_member(owner, name, None)
        {
            return Some(Binding::Field(field));
        }
        let file = self.file(cx.file)?;
        match resolve_type_in(&self.types, file, name)? {
            TypeRef::Indexed(id, _) => Some(Binding::Type(id)),
            TypeRef::External(qualified) => Some(Binding::ExternalType(qualified)),
        }
    }

    fn resolve_method(&self, cx: &ResolutionContext, name: &str, arity: usize) -> Option<DeclId> {
        if let Some(owner) = self.enclosing_type(cx)
            && let Some(found) = self.resolve_member(owner, name, Some(arity))
        {
            return Some(found);
        }
        self.static_imports(cx.file).find_map(|import| {
            let owner_name = if import.on_demand {
                import.path.as_str()
            } else if import.simple_name() == name {
                qualifier(&import.path)?
            } else {
                return None;
            };
            let owner = self.type_by_name(owner_name)?;
            self.resolve_member(owner, name, Some(arity))
        })
    }

    fn resolve_member(&self, owner: DeclId, name: &str, arity: Option<usize>) -> Option<DeclId> {
        self.hierarchy(owner)
            .into_iter()
            .find_map(|ty| self.find_in_type(ty, name, arity))
    }

    fn constructor(&self, owner: DeclId, arity: usize) -> Option<DeclId> {
        self.members_of(owner).iter().copied().find(|id| {
            self.decls
                .get(id.index())
                .is_some_and(|decl| decl.kind == DeclKind::Constructor && decl.accepts_arity(arity))
        })
    }

    fn methods_named(&self, owner: DeclId, name: &str) -> Vec<DeclId> {
        self.hierarchy(owner)
            .into_iter()
            .flat_map(|ty| self.members_of(ty).iter().copied())
            .filter(|id| {
                self.decls
                    .get(id.index())
                    .is_some_and(|decl| decl.kind == DeclKind::Method && decl.name == name)
            })
            .collect()
    }

    fn qualify_type(&self, cx: &ResolutionContext, name: &str) -> Option<String> {
        let file = self.file(cx.file)?;
        resolve_type_in(&self.types, file, name).map(|found| found.qualified().to_string())
    }

    fn qualify_static(&self, cx: &ResolutionContext, name: &str) -> Option<String> {
        self.static_imports(cx.file).find_map(|import| {
            if !import.on_demand {
                return (import.simple_name() == name).then(|| import.path.clone());
            }
            let owner = self.type_by_name(&import.path)?;
            self.has_member_named(owner, name)
                .map(|_| format!("{}.{name}", import.path))
        })
    }

    fn import_state(&self, cx: &ResolutionContext, requirement: &ImportRequirement) -> ImportState {
        let Some(file) = self.file(cx.file) else {
            return ImportState::Free;
        };
        let qualified = requirement.qualified_name();
        let simple = requirement.simple_name();
        let conflict = |bound_to: &str| ImportState::Conflict {
            bound_to: bound_to.to_string(),
        };
        match requirement.kind() {
            ImportKind::Type => {
                if let Some(binding) = self.local_at(cx, simple) {
                    return conflict(&self.decls[binding.index()].name);
                }
                match resolve_type_in(&self.types, file, simple) {
                    Some(found) if found.qualified() == qualified => ImportState::Visible,
                    Some(found) => conflict(found.qualified()),
                    None => ImportState::Free,
                }
            }
            ImportKind::StaticMember => {
                let owner_name = qualifier(qualified).unwrap_or_default();
                if let Some(owner) = self.enclosing_type(cx)
                    && let Some(member) = self.has_member_named(owner, simple)
                {
                    let member = &self.decls[member.index()];
                    return if member.qualified_name.as_deref() == Some(qualified) {
                        ImportState::Visible
                    } else {
                        conflict(member.qualified_name.as_deref().unwrap_or(&member.name))
                    };
                }
                for import in self.static_imports(cx.file) {
                    if import.on_demand && import.path == owner_name {
                        return ImportState::Visible;
                    }
                    if !import.on_demand && import.simple_name() == simple {
                        return if import.path == qualified {
                            ImportState::Visible
                        } else {
                            conflict(&import.path)
                        };
                    }
                }
                ImportState::Free
            }
        }
    }

    fn enclosing_type(&self, cx: &ResolutionContext) -> Option<DeclId> {
        self.entry(cx.file)?
            .types
            .iter()
            .copied()
            .filter(|id| {
                self.decls
                    .get(id.index())
                    .is_some_and(|decl| decl.span.contains(cx.position))
            })
            .max_by_key(|id| self.decls[id.index()].span.start())
    }

    fn is_subtype(&self, sub: DeclId, sup: DeclId) -> bool {
        self.hierarchy(sub).contains(&sup)
    }

    fn type_by_name(&self, qualified: &str) -> Option<DeclId> {
        self.types.get(qualified).copied()
    }

    fn package_of(&self, file: FileId) -> Option<&str> {
        self.file(file)?.package()
    }

    fn source_text(&self, file: FileId, span: Span) -> Option<&str> {
        self.file(file)?.text.get(span.start()..span.end())
    }
}

/// Whether `visibility` is at least as open as `required`.
pub fn at_least_as_visible(visibility: Visibility, required: Visibility) -> bool {
    visibility >= required
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: &str = "package com.acme;\n\
        import java.util.List;\n\
        import static com.acme.Util.helper;\n\
        public class Client extends Base {\n\
            private int count;\n\
            public Client self() { return this; }\n\
            public void run(int times) { int local = times; helper(local); }\n\
            public static int timesTwo(int x) { return x * 2; }\n\
        }\n";
    const BASE: &str = "package com.acme;\n\
        public class Base { protected String name; public void inherited() {} }\n";
    const UTIL: &str = "package com.acme;\n\
        public class Util { public static void helper(int v) {} }\n";

    fn index() -> SourceIndex {
        SourceIndex::build(vec![
            SourceFile::parse("Client.java", CLIENT).expect("parse client"),
            SourceFile::parse("Base.java", BASE).expect("parse base"),
            SourceFile::parse("Util.java", UTIL).expect("parse util"),
        ])
    }

    fn position_of(needle: &str) -> usize {
        CLIENT.find(needle).expect("needle in source")
    }

    fn cx(needle: &str) -> ResolutionContext {
        ResolutionContext::new(FileId::new(0), position_of(needle))
    }

    #[test]
    fn locals_shadow_fields_and_types() {
        let index = index();
        let at_call = cx("helper(local)");
        match index.resolve_name(&at_call, "local") {
            Some(Binding::Local(id)) => {
                let decl = index.declaration(id).expect("local decl");
                assert_eq!(decl.kind, DeclKind::Local);
            }
            other => panic!("expected local, got {other:?}"),
        }
        assert!(matches!(index.resolve_name(&at_call, "times"), Some(Binding::Local(_))));
        assert!(matches!(index.resolve_name(&at_call, "count"), Some(Binding::Field(_))));
        assert!(matches!(index.resolve_name(&at_call, "name"), Some(Binding::Field(_))));
        assert_eq!(
            index.resolve_name(&at_call, "List"),
            Some(Binding::ExternalType("java.util.List".into()))
        );
    }

    #[test]
    fn members_resolve_through_supertypes() {
        let index = index();
        let client = index.type_by_name("com.acme.Client").expect("client type");
        let base = index.type_by_name("com.acme.Base").expect("base type");
        assert!(index.is_subtype(client, base));
        assert!(!index.is_subtype(base, client));
        let inherited = index.resolve_member(client, "inherited", Some(0)).expect("inherited");
        assert_eq!(index.declaration(inherited).map(|d| d.owner), Some(Some(base)));
    }

    #[test]
    fn static_imports_resolve_unqualified_calls() {
        let index = index();
        let at_call = cx("helper(local)");
        let helper = index.resolve_method(&at_call, "helper", 1).expect("helper");
        assert_eq!(
            index.declaration(helper).and_then(|d| d.qualified_name.clone()),
            Some("com.acme.Util.helper".into())
        );
        assert_eq!(
            index.qualify_static(&at_call, "helper"),
            Some("com.acme.Util.helper".into())
        );
    }

    #[test]
    fn import_states() {
        let index = index();
        let at = cx("helper(local)");
        let visible = ImportRequirement::type_import("java.util.List");
        assert_eq!(index.import_state(&at, &visible), ImportState::Visible);
        let same_package = ImportRequirement::type_import("com.acme.Util");
        assert_eq!(index.import_state(&at, &same_package), ImportState::Visible);
        let free = ImportRequirement::type_import("java.util.Map");
        assert_eq!(index.import_state(&at, &free), ImportState::Free);
        let clash = ImportRequirement::type_import("java.awt.List");
        assert!(matches!(index.import_state(&at, &clash), ImportState::Conflict { .. }));
        let shadowed = ImportRequirement::type_import("org.other.String");
        assert!(matches!(index.import_state(&at, &shadowed), ImportState::Conflict { .. }));
    }

    #[test]
    fn callable_ast_round_trips() {
        let index = index();
        let ids = index.callables_named("com.acme.Client", "timesTwo");
        assert_eq!(ids.len(), 1);
        let (owner, method) = index.callable_ast(ids[0]).expect("ast");
        assert_eq!(owner.name(), "Client");
        assert_eq!(method.param_names(), vec!["x".to_string()]);
        assert_eq!(index.source_text(FileId::new(0), Span::new(0, 7)), Some("package"));
    }
}
