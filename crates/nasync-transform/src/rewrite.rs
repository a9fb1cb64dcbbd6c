//! The auto-await rewrite.
//!
//! A single recursive descent over the wrapped cell. Every node decides on
//! its own edits before its children are visited, which is the order the
//! edit list needs for nesting insertions at shared offsets.

use crate::edit::Edits;
use nasync_parser::{ParsedScript, Spanned};
use swc_ecma_ast as ast;

/// Why awaiting is not possible inside a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker {
    Constructor,
    Getter,
    Setter,
    FieldInitializer,
    StaticBlock,
    Parameters,
}

impl Blocker {
    pub fn describe(&self) -> &'static str {
        match self {
            Blocker::Constructor => "a constructor",
            Blocker::Getter => "a getter",
            Blocker::Setter => "a setter",
            Blocker::FieldInitializer => "a class field initializer",
            Blocker::StaticBlock => "a static block",
            Blocker::Parameters => "a parameter list",
        }
    }
}

/// A region where at least one expression was left unawaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    pub blocker: Blocker,
    pub lo: u32,
    pub hi: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Anywhere an assignment expression fits: `await x`
    Standalone,
    /// Operand of a tighter-binding construct: `(await x)`
    Operand,
}

#[derive(Debug, Clone, Copy)]
struct Ctx {
    blocked: Option<Hint>,
    slot: Slot,
    /// Direct operand of an await, or a side of an assignment
    suppress: bool,
    /// Intermediate link of an optional chain
    chain_link: bool,
}

impl Ctx {
    fn top() -> Self {
        Self {
            blocked: None,
            slot: Slot::Standalone,
            suppress: false,
            chain_link: false,
        }
    }

    fn standalone(self) -> Self {
        Self {
            slot: Slot::Standalone,
            suppress: false,
            chain_link: false,
            ..self
        }
    }

    fn operand(self) -> Self {
        Self {
            slot: Slot::Operand,
            suppress: false,
            chain_link: false,
            ..self
        }
    }

    fn suppressed(self) -> Self {
        Self {
            slot: Slot::Standalone,
            suppress: true,
            chain_link: false,
            ..self
        }
    }

    fn link(self) -> Self {
        Self {
            slot: Slot::Operand,
            suppress: false,
            chain_link: true,
            ..self
        }
    }

    /// Parentheses hand their flags to the inner expression.
    fn parenthesized(self) -> Self {
        Self {
            slot: Slot::Standalone,
            ..self
        }
    }

    fn blocked_by(self, blocker: Blocker, lo: u32, hi: u32) -> Self {
        Self {
            blocked: Some(Hint { blocker, lo, hi }),
            ..self.standalone()
        }
    }

    /// Inside the body of a function that is (or will be) async.
    fn async_body(self) -> Self {
        Self {
            blocked: None,
            ..self.standalone()
        }
    }
}

/// What one pass produced.
#[derive(Debug)]
pub(crate) struct Rewrite {
    pub edits: Edits,
    pub hints: Vec<Hint>,
    pub returns_value: bool,
}

pub(crate) struct Rewriter<'a> {
    src: &'a str,
    parsed: &'a ParsedScript,
    edits: Edits,
    hints: Vec<Hint>,
    rewrote_last: bool,
    returns_value: bool,
}

impl<'a> Rewriter<'a> {
    pub fn new(src: &'a str, parsed: &'a ParsedScript) -> Self {
        Self {
            src,
            parsed,
            edits: Edits::default(),
            hints: Vec::new(),
            rewrote_last: false,
            returns_value: false,
        }
    }

    /// Rewrite the statements of the wrapper arrow.
    pub fn run(mut self, top: &ast::BlockStmt) -> Rewrite {
        let ctx = Ctx::top();
        let last = top.stmts.len().checked_sub(1);

        for (i, stmt) in top.stmts.iter().enumerate() {
            self.mark_statement_start(i, stmt);
            if Some(i) == last {
                self.last_statement(stmt, ctx);
            } else {
                self.stmt(stmt, ctx);
            }
        }

        log::debug!(
            "rewrite: last expression {}, {} unawaited region(s)",
            if self.rewrote_last { "returned" } else { "kept" },
            self.hints.len()
        );

        Rewrite {
            edits: self.edits,
            hints: self.hints,
            returns_value: self.returns_value,
        }
    }

    fn offsets(&self, span: swc_common::Span) -> (u32, u32) {
        self.parsed.offsets(span)
    }

    fn last_statement(&mut self, stmt: &ast::Stmt, ctx: Ctx) {
        match stmt {
            ast::Stmt::Expr(expr_stmt) if !self.rewrote_last => {
                let (lo, hi) = self.offsets(expr_stmt.expr.span());
                if followed_by_semicolon(self.src, hi as usize) {
                    self.expr(&expr_stmt.expr, ctx.standalone());
                    return;
                }
                self.edits.wrap(lo, hi, "return {cellReturnValue: ", "}");
                self.rewrote_last = true;
                self.returns_value = true;
                self.expr(&expr_stmt.expr, ctx.standalone());
            }
            // Returning from the cell is the author's explicit result.
            ast::Stmt::Return(ret) => {
                if let Some(arg) = &ret.arg {
                    self.returns_value = true;
                    self.expr(arg, ctx.suppressed());
                }
            }
            _ => self.stmt(stmt, ctx),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn mark_statement_start(&mut self, index: usize, stmt: &ast::Stmt) {
        if index > 0 {
            if let ast::Stmt::Expr(expr_stmt) = stmt {
                let (lo, _) = self.offsets(expr_stmt.span);
                self.edits.statement_start(lo);
            }
        }
    }

    fn stmts(&mut self, stmts: &[ast::Stmt], ctx: Ctx) {
        for (i, stmt) in stmts.iter().enumerate() {
            self.mark_statement_start(i, stmt);
            self.stmt(stmt, ctx);
        }
    }

    fn stmt(&mut self, stmt: &ast::Stmt, ctx: Ctx) {
        match stmt {
            ast::Stmt::Block(block) => self.stmts(&block.stmts, ctx),
            ast::Stmt::Empty(_)
            | ast::Stmt::Debugger(_)
            | ast::Stmt::Break(_)
            | ast::Stmt::Continue(_) => {}
            ast::Stmt::With(with) => {
                self.expr(&with.obj, ctx.standalone());
                self.stmt(&with.body, ctx);
            }
            ast::Stmt::Return(ret) => {
                if let Some(arg) = &ret.arg {
                    self.expr(arg, ctx.standalone());
                }
            }
            ast::Stmt::Labeled(labeled) => self.stmt(&labeled.body, ctx),
            ast::Stmt::If(if_stmt) => {
                self.expr(&if_stmt.test, ctx.standalone());
                self.stmt(&if_stmt.cons, ctx);
                if let Some(alt) = &if_stmt.alt {
                    self.stmt(alt, ctx);
                }
            }
            ast::Stmt::Switch(switch) => {
                self.expr(&switch.discriminant, ctx.standalone());
                for case in &switch.cases {
                    if let Some(test) = &case.test {
                        self.expr(test, ctx.standalone());
                    }
                    self.stmts(&case.cons, ctx);
                }
            }
            ast::Stmt::Throw(throw) => self.expr(&throw.arg, ctx.standalone()),
            ast::Stmt::Try(try_stmt) => {
                self.stmts(&try_stmt.block.stmts, ctx);
                if let Some(handler) = &try_stmt.handler {
                    if let Some(param) = &handler.param {
                        self.pat(param, ctx);
                    }
                    self.stmts(&handler.body.stmts, ctx);
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    self.stmts(&finalizer.stmts, ctx);
                }
            }
            ast::Stmt::While(while_stmt) => {
                self.expr(&while_stmt.test, ctx.standalone());
                self.stmt(&while_stmt.body, ctx);
            }
            ast::Stmt::DoWhile(do_while) => {
                self.stmt(&do_while.body, ctx);
                self.expr(&do_while.test, ctx.standalone());
            }
            ast::Stmt::For(for_stmt) => {
                match &for_stmt.init {
                    Some(ast::VarDeclOrExpr::VarDecl(var)) => self.var_decl(var, ctx),
                    Some(ast::VarDeclOrExpr::Expr(expr)) => self.expr(expr, ctx.standalone()),
                    None => {}
                }
                if let Some(test) = &for_stmt.test {
                    self.expr(test, ctx.standalone());
                }
                if let Some(update) = &for_stmt.update {
                    self.expr(update, ctx.standalone());
                }
                self.stmt(&for_stmt.body, ctx);
            }
            ast::Stmt::ForIn(for_in) => {
                self.for_head(&for_in.left, ctx);
                self.expr(&for_in.right, ctx.standalone());
                self.stmt(&for_in.body, ctx);
            }
            ast::Stmt::ForOf(for_of) => {
                self.for_head(&for_of.left, ctx);
                self.expr(&for_of.right, ctx.standalone());
                self.stmt(&for_of.body, ctx);
            }
            ast::Stmt::Decl(decl) => self.decl(decl, ctx),
            ast::Stmt::Expr(expr_stmt) => self.expr(&expr_stmt.expr, ctx.standalone()),
        }
    }

    fn for_head(&mut self, head: &ast::ForHead, ctx: Ctx) {
        match head {
            ast::ForHead::VarDecl(var) => self.var_decl(var, ctx),
            ast::ForHead::UsingDecl(using) => {
                for decl in &using.decls {
                    self.declarator(decl, ctx);
                }
            }
            ast::ForHead::Pat(pat) => self.pat(pat, ctx),
        }
    }

    fn decl(&mut self, decl: &ast::Decl, ctx: Ctx) {
        match decl {
            ast::Decl::Class(class_decl) => self.class(&class_decl.class, ctx),
            ast::Decl::Fn(fn_decl) => {
                let (ident_lo, _) = self.offsets(fn_decl.ident.span);
                let marker = self.function_keyword(&fn_decl.function, ident_lo);
                self.function(&fn_decl.function, marker, ctx);
            }
            ast::Decl::Var(var) => self.var_decl(var, ctx),
            ast::Decl::Using(using) => {
                for decl in &using.decls {
                    self.declarator(decl, ctx);
                }
            }
            _ => {}
        }
    }

    fn var_decl(&mut self, var: &ast::VarDecl, ctx: Ctx) {
        for decl in &var.decls {
            self.declarator(decl, ctx);
        }
    }

    fn declarator(&mut self, decl: &ast::VarDeclarator, ctx: Ctx) {
        self.pat(&decl.name, ctx);
        if let Some(init) = &decl.init {
            self.expr(init, ctx.standalone());
        }
    }

    // =========================================================================
    // Patterns
    // =========================================================================

    /// Binding and assignment patterns: only defaults and computed keys
    /// hold expressions that may be awaited.
    fn pat(&mut self, pat: &ast::Pat, ctx: Ctx) {
        match pat {
            ast::Pat::Ident(_) | ast::Pat::Invalid(_) => {}
            ast::Pat::Array(array) => self.array_pat(array, ctx),
            ast::Pat::Object(object) => self.object_pat(object, ctx),
            ast::Pat::Rest(rest) => self.pat(&rest.arg, ctx),
            ast::Pat::Assign(assign) => {
                self.pat(&assign.left, ctx);
                self.expr(&assign.right, ctx.standalone());
            }
            ast::Pat::Expr(expr) => self.expr(expr, ctx.suppressed()),
        }
    }

    fn array_pat(&mut self, array: &ast::ArrayPat, ctx: Ctx) {
        for elem in array.elems.iter().flatten() {
            self.pat(elem, ctx);
        }
    }

    fn object_pat(&mut self, object: &ast::ObjectPat, ctx: Ctx) {
        for prop in &object.props {
            match prop {
                ast::ObjectPatProp::KeyValue(kv) => {
                    self.prop_name(&kv.key, ctx);
                    self.pat(&kv.value, ctx);
                }
                ast::ObjectPatProp::Assign(assign) => {
                    if let Some(value) = &assign.value {
                        self.expr(value, ctx.standalone());
                    }
                }
                ast::ObjectPatProp::Rest(rest) => self.pat(&rest.arg, ctx),
            }
        }
    }

    fn assign_target(&mut self, target: &ast::AssignTarget, ctx: Ctx) {
        match target {
            ast::AssignTarget::Simple(simple) => match simple {
                ast::SimpleAssignTarget::Member(member) => self.member(member, ctx),
                ast::SimpleAssignTarget::SuperProp(super_prop) => {
                    if let ast::SuperProp::Computed(computed) = &super_prop.prop {
                        self.expr(&computed.expr, ctx.standalone());
                    }
                }
                ast::SimpleAssignTarget::Paren(paren) => self.expr(&paren.expr, ctx.suppressed()),
                _ => {}
            },
            ast::AssignTarget::Pat(pat) => match pat {
                ast::AssignTargetPat::Array(array) => self.array_pat(array, ctx),
                ast::AssignTargetPat::Object(object) => self.object_pat(object, ctx),
                ast::AssignTargetPat::Invalid(_) => {}
            },
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expr(&mut self, expr: &ast::Expr, ctx: Ctx) {
        self.maybe_await(expr, ctx);

        match expr {
            ast::Expr::This(_)
            | ast::Expr::Lit(_)
            | ast::Expr::Ident(_)
            | ast::Expr::MetaProp(_)
            | ast::Expr::PrivateName(_)
            | ast::Expr::Invalid(_) => {}

            ast::Expr::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.expr(&elem.expr, ctx.standalone());
                }
            }
            ast::Expr::Object(object) => {
                for prop in &object.props {
                    self.prop_or_spread(prop, ctx);
                }
            }
            ast::Expr::Fn(fn_expr) => {
                let (_, hi) = self.offsets(fn_expr.function.span);
                let marker = self.function_keyword(&fn_expr.function, hi);
                self.function(&fn_expr.function, marker, ctx);
            }
            ast::Expr::Arrow(arrow) => self.arrow(arrow, ctx),
            ast::Expr::Class(class_expr) => self.class(&class_expr.class, ctx),

            ast::Expr::Unary(unary) => {
                let operand = match (unary.op, unary.arg.as_ref()) {
                    (ast::UnaryOp::Delete, _) => ctx.suppressed(),
                    // typeof must not throw on undeclared names
                    (ast::UnaryOp::TypeOf, ast::Expr::Ident(_)) => ctx.suppressed(),
                    _ => ctx.operand(),
                };
                self.expr(&unary.arg, operand);
            }
            ast::Expr::Update(update) => self.expr(&update.arg, ctx.suppressed()),
            ast::Expr::Bin(bin) => {
                self.expr(&bin.left, ctx.operand());
                self.expr(&bin.right, ctx.operand());
            }
            ast::Expr::Assign(assign) => {
                self.assign_target(&assign.left, ctx);
                self.expr(&assign.right, ctx.suppressed());
            }
            ast::Expr::Member(member) => self.member(member, ctx),
            ast::Expr::SuperProp(super_prop) => {
                if let ast::SuperProp::Computed(computed) = &super_prop.prop {
                    self.expr(&computed.expr, ctx.standalone());
                }
            }
            ast::Expr::Cond(cond) => {
                self.expr(&cond.test, ctx.operand());
                self.expr(&cond.cons, ctx.standalone());
                self.expr(&cond.alt, ctx.standalone());
            }
            ast::Expr::Call(call) => {
                if let ast::Callee::Expr(callee) = &call.callee {
                    self.expr(callee, ctx.operand());
                }
                self.args(&call.args, ctx);
            }
            ast::Expr::New(new) => {
                self.expr(&new.callee, ctx.operand());
                if let Some(args) = &new.args {
                    self.args(args, ctx);
                }
            }
            ast::Expr::Seq(seq) => {
                for expr in &seq.exprs {
                    self.expr(expr, ctx.standalone());
                }
            }
            ast::Expr::Tpl(tpl) => self.tpl(tpl, ctx),
            ast::Expr::TaggedTpl(tagged) => {
                self.expr(&tagged.tag, ctx.operand());
                self.tpl(&tagged.tpl, ctx);
            }
            ast::Expr::Yield(yield_expr) => {
                if let Some(arg) = &yield_expr.arg {
                    self.expr(arg, ctx.standalone());
                }
            }
            ast::Expr::Await(await_expr) => self.expr(&await_expr.arg, ctx.suppressed()),
            ast::Expr::Paren(paren) => self.expr(&paren.expr, ctx.parenthesized()),
            ast::Expr::OptChain(chain) => match chain.base.as_ref() {
                ast::OptChainBase::Member(member) => self.member(member, ctx),
                ast::OptChainBase::Call(call) => {
                    self.expr(&call.callee, chain_ctx(&call.callee, ctx));
                    self.args(&call.args, ctx);
                }
            },

            // JSX and TypeScript nodes are never produced for plain scripts
            _ => {}
        }
    }

    fn member(&mut self, member: &ast::MemberExpr, ctx: Ctx) {
        self.expr(&member.obj, chain_ctx(&member.obj, ctx));
        if let ast::MemberProp::Computed(computed) = &member.prop {
            self.expr(&computed.expr, ctx.standalone());
        }
    }

    fn args(&mut self, args: &[ast::ExprOrSpread], ctx: Ctx) {
        for arg in args {
            self.expr(&arg.expr, ctx.standalone());
        }
    }

    fn tpl(&mut self, tpl: &ast::Tpl, ctx: Ctx) {
        for expr in &tpl.exprs {
            self.expr(expr, ctx.standalone());
        }
    }

    fn maybe_await(&mut self, expr: &ast::Expr, ctx: Ctx) {
        if ctx.suppress || ctx.chain_link || !is_awaitable(expr) {
            return;
        }
        if let Some(region) = ctx.blocked {
            self.note_blocked(region);
            return;
        }

        let (lo, hi) = self.offsets(expr.span());
        let (open, close) = match (ctx.slot, needs_inner_parens(expr)) {
            (Slot::Standalone, false) => ("await ", ""),
            (Slot::Standalone, true) => ("await (", ")"),
            (Slot::Operand, false) => ("(await ", ")"),
            (Slot::Operand, true) => ("(await (", "))"),
        };
        self.edits.wrap(lo, hi, open, close);
    }

    fn note_blocked(&mut self, region: Hint) {
        if !self.hints.contains(&region) {
            log::debug!(
                "cannot await inside {} at {}..{}",
                region.blocker.describe(),
                region.lo,
                region.hi
            );
            self.hints.push(region);
        }
    }

    // =========================================================================
    // Object literals and classes
    // =========================================================================

    fn prop_or_spread(&mut self, prop: &ast::PropOrSpread, ctx: Ctx) {
        let prop = match prop {
            ast::PropOrSpread::Spread(spread) => {
                self.expr(&spread.expr, ctx.standalone());
                return;
            }
            ast::PropOrSpread::Prop(prop) => prop.as_ref(),
        };

        match prop {
            ast::Prop::Shorthand(ident) => self.shorthand(ident, ctx),
            ast::Prop::KeyValue(kv) => {
                self.prop_name(&kv.key, ctx);
                self.expr(&kv.value, ctx.standalone());
            }
            ast::Prop::Assign(assign) => self.expr(&assign.value, ctx.standalone()),
            ast::Prop::Getter(getter) => {
                self.prop_name(&getter.key, ctx);
                if let Some(body) = &getter.body {
                    let (lo, hi) = self.offsets(getter.span);
                    self.stmts(&body.stmts, ctx.blocked_by(Blocker::Getter, lo, hi));
                }
            }
            ast::Prop::Setter(setter) => {
                self.prop_name(&setter.key, ctx);
                let (lo, hi) = self.offsets(setter.span);
                self.pat(&setter.param, ctx.blocked_by(Blocker::Parameters, lo, hi));
                if let Some(body) = &setter.body {
                    self.stmts(&body.stmts, ctx.blocked_by(Blocker::Setter, lo, hi));
                }
            }
            ast::Prop::Method(method) => {
                let (key_lo, _) = self.offsets(method.key.span());
                let marker = self.method_keyword(key_lo);
                self.prop_name(&method.key, ctx);
                self.function(&method.function, marker, ctx);
            }
        }
    }

    /// `{a}` becomes `{a: await a}`.
    fn shorthand(&mut self, ident: &ast::Ident, ctx: Ctx) {
        if let Some(region) = ctx.blocked {
            self.note_blocked(region);
            return;
        }
        let (lo, hi) = self.offsets(ident.span);
        let name = &self.src[lo as usize..hi as usize];
        self.edits.insert(hi, format!(": await {}", name));
    }

    fn prop_name(&mut self, key: &ast::PropName, ctx: Ctx) {
        if let ast::PropName::Computed(computed) = key {
            self.expr(&computed.expr, ctx.standalone());
        }
    }

    fn class(&mut self, class: &ast::Class, ctx: Ctx) {
        if let Some(super_class) = &class.super_class {
            self.expr(super_class, ctx.operand());
        }

        for member in &class.body {
            match member {
                ast::ClassMember::Constructor(ctor) => {
                    let (lo, hi) = self.offsets(ctor.span);
                    for param in &ctor.params {
                        if let ast::ParamOrTsParamProp::Param(param) = param {
                            self.pat(&param.pat, ctx.blocked_by(Blocker::Parameters, lo, hi));
                        }
                    }
                    if let Some(body) = &ctor.body {
                        self.stmts(&body.stmts, ctx.blocked_by(Blocker::Constructor, lo, hi));
                    }
                }
                ast::ClassMember::Method(method) => {
                    self.prop_name(&method.key, ctx);
                    let (key_lo, _) = self.offsets(method.key.span());
                    self.class_method(&method.function, method.kind, key_lo, ctx);
                }
                ast::ClassMember::PrivateMethod(method) => {
                    let (key_lo, _) = self.offsets(method.key.span);
                    self.class_method(&method.function, method.kind, key_lo, ctx);
                }
                ast::ClassMember::ClassProp(prop) => {
                    self.prop_name(&prop.key, ctx);
                    if let Some(value) = &prop.value {
                        let (lo, hi) = self.offsets(prop.span);
                        self.expr(value, ctx.blocked_by(Blocker::FieldInitializer, lo, hi));
                    }
                }
                ast::ClassMember::PrivateProp(prop) => {
                    if let Some(value) = &prop.value {
                        let (lo, hi) = self.offsets(prop.span);
                        self.expr(value, ctx.blocked_by(Blocker::FieldInitializer, lo, hi));
                    }
                }
                ast::ClassMember::AutoAccessor(accessor) => {
                    if let ast::Key::Public(key) = &accessor.key {
                        self.prop_name(key, ctx);
                    }
                    if let Some(value) = &accessor.value {
                        let (lo, hi) = self.offsets(accessor.span);
                        self.expr(value, ctx.blocked_by(Blocker::FieldInitializer, lo, hi));
                    }
                }
                ast::ClassMember::StaticBlock(block) => {
                    let (lo, hi) = self.offsets(block.span);
                    self.stmts(&block.body.stmts, ctx.blocked_by(Blocker::StaticBlock, lo, hi));
                }
                ast::ClassMember::Empty(_) | ast::ClassMember::TsIndexSignature(_) => {}
            }
        }
    }

    fn class_method(&mut self, function: &ast::Function, kind: ast::MethodKind, key_lo: u32, ctx: Ctx) {
        let (lo, hi) = self.offsets(function.span);
        let blocker = match kind {
            ast::MethodKind::Method => {
                let marker = self.method_keyword(key_lo);
                self.function(function, marker, ctx);
                return;
            }
            ast::MethodKind::Getter => Blocker::Getter,
            ast::MethodKind::Setter => Blocker::Setter,
        };

        for param in &function.params {
            self.pat(&param.pat, ctx.blocked_by(Blocker::Parameters, lo, hi));
        }
        if let Some(body) = &function.body {
            self.stmts(&body.stmts, ctx.blocked_by(blocker, lo, hi));
        }
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Mark a function async at `marker` and rewrite its body.
    fn function(&mut self, function: &ast::Function, marker: u32, ctx: Ctx) {
        if !function.is_async {
            self.edits.insert(marker, "async ");
        }

        let (lo, hi) = self.offsets(function.span);
        for param in &function.params {
            self.pat(&param.pat, ctx.blocked_by(Blocker::Parameters, lo, hi));
        }
        if let Some(body) = &function.body {
            self.stmts(&body.stmts, ctx.async_body());
        }
    }

    fn arrow(&mut self, arrow: &ast::ArrowExpr, ctx: Ctx) {
        let (lo, hi) = self.offsets(arrow.span);
        if !arrow.is_async {
            self.edits.insert(lo, "async ");
        }

        for param in &arrow.params {
            self.pat(param, ctx.blocked_by(Blocker::Parameters, lo, hi));
        }
        match arrow.body.as_ref() {
            ast::BlockStmtOrExpr::BlockStmt(block) => self.stmts(&block.stmts, ctx.async_body()),
            ast::BlockStmtOrExpr::Expr(body) => self.expr(body, ctx.async_body()),
        }
    }

    /// Offset of the `function` keyword of a declaration or expression.
    fn function_keyword(&self, function: &ast::Function, limit: u32) -> u32 {
        let (lo, hi) = self.offsets(function.span);
        let lo = lo as usize;
        if self.src[lo..].starts_with("function") {
            return lo as u32;
        }
        let end = (limit.max(lo as u32).min(hi) as usize).min(self.src.len());
        match self.src[lo..end].find("function") {
            Some(found) => (lo + found) as u32,
            None => self.src[..lo].rfind("function").map_or(lo as u32, |at| at as u32),
        }
    }

    /// Offset where `async` goes for a method: before the key, or before
    /// the `*` of a generator method.
    fn method_keyword(&self, key_lo: u32) -> u32 {
        let before = self.src[..key_lo as usize].trim_end();
        if before.ends_with('*') {
            (before.len() - 1) as u32
        } else {
            key_lo
        }
    }
}

/// An optional chain nested in another chain is a link of the same chain;
/// awaiting it would break short-circuiting.
fn chain_ctx(inner: &ast::Expr, ctx: Ctx) -> Ctx {
    if matches!(inner, ast::Expr::OptChain(_)) {
        ctx.link()
    } else {
        ctx.operand()
    }
}

fn is_awaitable(expr: &ast::Expr) -> bool {
    match expr {
        ast::Expr::Lit(_)
        | ast::Expr::Tpl(_)
        | ast::Expr::Object(_)
        | ast::Expr::Array(_)
        | ast::Expr::Fn(_)
        | ast::Expr::Arrow(_)
        | ast::Expr::Class(_)
        | ast::Expr::Member(_)
        | ast::Expr::SuperProp(_)
        | ast::Expr::Await(_)
        | ast::Expr::Paren(_)
        | ast::Expr::PrivateName(_)
        | ast::Expr::This(_)
        | ast::Expr::MetaProp(_)
        | ast::Expr::Invalid(_) => false,
        ast::Expr::OptChain(chain) => !matches!(chain.base.as_ref(), ast::OptChainBase::Member(_)),
        _ => true,
    }
}

/// Expressions that bind looser than `await` need their own parentheses.
fn needs_inner_parens(expr: &ast::Expr) -> bool {
    matches!(
        expr,
        ast::Expr::Assign(_)
            | ast::Expr::Bin(_)
            | ast::Expr::Cond(_)
            | ast::Expr::Seq(_)
            | ast::Expr::Yield(_)
            | ast::Expr::Arrow(_)
    )
}

/// Whether the next significant character after `at` is a `;`.
pub(crate) fn followed_by_semicolon(src: &str, at: usize) -> bool {
    let mut rest = &src[at.min(src.len())..];
    loop {
        rest = rest.trim_start();
        if let Some(line_comment) = rest.strip_prefix("//") {
            rest = line_comment.find('\n').map_or("", |end| &line_comment[end..]);
        } else if let Some(block_comment) = rest.strip_prefix("/*") {
            rest = block_comment.find("*/").map_or("", |end| &block_comment[end + 2..]);
        } else {
            return rest.starts_with(';');
        }
    }
}
