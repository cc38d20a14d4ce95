//! A syntactic approximation of static types.
//!
//! There is no name resolution or trait solving here. Types come from what the source
//! spells out: parameter and `let` annotations, struct fields, statics, function return
//! types, and a few constructor conventions. Anything else resolves to `None`.

use super::names::{looks_like_type, to_upper_camel};
use crate::facts::InstrumentationApi;
use crate::facts::instrumentation_api::strip_indirection;
use ra_ap_syntax::ast::{self, HasName};
use ra_ap_syntax::{AstNode, SourceFile, SyntaxNode, TextRange};
use std::collections::HashMap;

/// Inference gives up past this many nested lookups.
const MAX_DEPTH: usize = 16;

/// Declarations gathered across every file of a source unit.
#[derive(Debug, Default)]
pub struct UnitTypes {
    /// Struct name to its record fields, in declaration order.
    fields: HashMap<String, Vec<(String, String)>>,

    /// Struct names in declaration order, for field lookups on an unknown base type.
    struct_order: Vec<String>,

    /// Free functions by name, associated functions by `Type::name`.
    returns: HashMap<String, String>,

    /// Statics and consts by name.
    globals: HashMap<String, String>,
}

impl UnitTypes {
    pub fn collect<'a>(files: impl IntoIterator<Item = &'a SourceFile>) -> Self {
        let mut types = Self::default();
        for file in files {
            types.add_file(file);
        }
        types
    }

    fn add_file(&mut self, file: &SourceFile) {
        for node in file.syntax().descendants() {
            if let Some(strukt) = ast::Struct::cast(node.clone()) {
                self.add_struct(&strukt);
            } else if let Some(func) = ast::Fn::cast(node.clone()) {
                self.add_fn(&func);
            } else if let Some(item) = ast::Static::cast(node.clone()) {
                if let (Some(name), Some(ty)) = (item.name(), item.ty()) {
                    let _ = self.globals.insert(name.text().to_string(), render_type(&ty));
                }
            } else if let Some(item) = ast::Const::cast(node)
                && let (Some(name), Some(ty)) = (item.name(), item.ty())
            {
                let _ = self.globals.insert(name.text().to_string(), render_type(&ty));
            }
        }
    }

    fn add_struct(&mut self, strukt: &ast::Struct) {
        let Some(name) = strukt.name() else {
            return;
        };
        let Some(ast::FieldList::RecordFieldList(list)) = strukt.field_list() else {
            return;
        };

        let fields: Vec<_> = list
            .fields()
            .filter_map(|field| Some((field.name()?.text().to_string(), render_type(&field.ty()?))))
            .collect();

        let name = name.text().to_string();
        if !self.fields.contains_key(&name) {
            self.struct_order.push(name.clone());
        }
        let _ = self.fields.insert(name, fields);
    }

    fn add_fn(&mut self, func: &ast::Fn) {
        let (Some(name), Some(ret)) = (func.name(), func.ret_type().and_then(|r| r.ty())) else {
            return;
        };

        let name = name.text().to_string();
        match enclosing_impl_type(func.syntax()) {
            Some(self_ty) => {
                let ret = replace_self(&render_type(&ret), &self_ty);
                let _ = self.returns.insert(format!("{}::{name}", type_key(&self_ty)), ret);
            }
            None => {
                let _ = self.returns.insert(name, render_type(&ret));
            }
        }
    }

    fn field_type(&self, owner: Option<&str>, field: &str) -> Option<&str> {
        let lookup = |owner: &str| {
            self.fields
                .get(owner)?
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, ty)| ty.as_str())
        };

        if let Some(owner) = owner
            && let Some(ty) = lookup(owner)
        {
            return Some(ty);
        }

        self.struct_order.iter().find_map(|owner| lookup(owner))
    }
}

/// Resolves expression types within one file.
#[derive(Debug)]
pub struct Resolver<'a> {
    unit: &'a UnitTypes,
    api: &'a InstrumentationApi,
}

impl<'a> Resolver<'a> {
    pub const fn new(unit: &'a UnitTypes, api: &'a InstrumentationApi) -> Self {
        Self { unit, api }
    }

    /// Static type of `expr`, as written in source.
    pub fn type_of(&self, expr: &ast::Expr) -> Option<String> {
        self.infer(expr, 0)
    }

    /// Result type of a call to a path such as `Type::build(..)` or `module::new_metrics(..)`.
    pub fn path_call_type(&self, path: &ast::Path) -> Option<String> {
        let func = path.segment()?.name_ref()?.text().to_string();

        match path.qualifier() {
            Some(qualifier) => {
                let qualifier_text = qualifier.syntax().text().to_string();
                let last = qualifier.segment().map(|s| s.syntax().text().to_string()).unwrap_or_default();

                if looks_like_type(&last) {
                    let owner = if last == "Self" {
                        enclosing_impl_type(path.syntax()).unwrap_or(qualifier_text)
                    } else {
                        qualifier_text
                    };

                    if let Some(ret) = self.unit.returns.get(&format!("{}::{func}", type_key(&owner))) {
                        return Some(ret.clone());
                    }

                    if self.api.is_constructor(&to_upper_camel(&func)) || func == "new" || func == "default" {
                        return Some(owner);
                    }

                    None
                } else {
                    self.free_call_type(&func)
                }
            }
            None => self.free_call_type(&func),
        }
    }

    fn free_call_type(&self, func: &str) -> Option<String> {
        if let Some(ret) = self.unit.returns.get(func) {
            return Some(ret.clone());
        }

        self.api.is_constructor(&to_upper_camel(func)).then(|| self.api.type_path.clone())
    }

    fn infer(&self, expr: &ast::Expr, depth: usize) -> Option<String> {
        if depth > MAX_DEPTH {
            return None;
        }

        match expr {
            ast::Expr::PathExpr(path_expr) => {
                let path = path_expr.path()?;
                if path.qualifier().is_some() {
                    let name = path.segment()?.name_ref()?.text().to_string();
                    return self.unit.globals.get(&name).cloned();
                }

                let name = path.segment()?.syntax().text().to_string();
                if name == "self" {
                    return self_type(path_expr.syntax());
                }

                self.local_type(&name, path_expr.syntax(), depth)
                    .or_else(|| self.unit.globals.get(&name).cloned())
            }
            ast::Expr::FieldExpr(field_expr) => {
                let field = field_expr.name_ref()?.text().to_string();
                let base = field_expr.expr().and_then(|base| self.infer(&base, depth + 1));
                let owner = base.as_deref().map(type_key);
                self.unit.field_type(owner.as_deref(), &field).map(str::to_string)
            }
            ast::Expr::RefExpr(ref_expr) => {
                let inner = self.infer(&ref_expr.expr()?, depth + 1)?;
                Some(format!("&{inner}"))
            }
            ast::Expr::ParenExpr(paren) => self.infer(&paren.expr()?, depth + 1),
            ast::Expr::RecordExpr(record) => Some(record.path()?.syntax().text().to_string()),
            ast::Expr::CallExpr(call) => match call.expr()? {
                ast::Expr::PathExpr(callee) => self.path_call_type(&callee.path()?),
                _ => None,
            },
            ast::Expr::MethodCallExpr(call) => {
                let method = call.name_ref()?.text().to_string();
                let receiver = self.infer(&call.receiver()?, depth + 1)?;
                if method == "clone" {
                    return Some(receiver);
                }
                self.unit.returns.get(&format!("{}::{method}", type_key(&receiver))).cloned()
            }
            _ => None,
        }
    }

    /// Type of the innermost binding of `name` visible at `usage`.
    fn local_type(&self, name: &str, usage: &SyntaxNode, depth: usize) -> Option<String> {
        let at = usage.text_range();
        let mut best: Option<(TextRange, Binding)> = None;

        for scope in usage.ancestors() {
            if let Some(func) = ast::Fn::cast(scope.clone()) {
                if let Some(params) = func.param_list() {
                    consider_params(params.params(), name, &mut best);
                }
                for let_stmt in func.syntax().descendants().filter_map(ast::LetStmt::cast) {
                    consider_let(&let_stmt, name, at, &mut best);
                }
                break;
            }

            if let Some(closure) = ast::ClosureExpr::cast(scope)
                && let Some(params) = closure.param_list()
            {
                consider_params(params.params(), name, &mut best);
            }
        }

        match best?.1 {
            Binding::Annotated(ty) => Some(render_type(&ty)),
            Binding::Inferred(init) => self.infer(&init, depth + 1),
        }
    }
}

enum Binding {
    Annotated(ast::Type),
    Inferred(ast::Expr),
}

fn consider_params(params: impl Iterator<Item = ast::Param>, name: &str, best: &mut Option<(TextRange, Binding)>) {
    for param in params {
        if binds(param.pat(), name)
            && let Some(ty) = param.ty()
        {
            let range = param.syntax().text_range();
            if best.as_ref().is_none_or(|(r, _)| r.start() < range.start()) {
                *best = Some((range, Binding::Annotated(ty)));
            }
        }
    }
}

fn consider_let(let_stmt: &ast::LetStmt, name: &str, at: TextRange, best: &mut Option<(TextRange, Binding)>) {
    let range = let_stmt.syntax().text_range();
    if range.end() > at.start() || !binds(let_stmt.pat(), name) {
        return;
    }

    // the binding is only visible inside the block that declares it
    let Some(block) = let_stmt.syntax().parent() else {
        return;
    };
    if !block.text_range().contains_range(at) {
        return;
    }

    if best.as_ref().is_some_and(|(r, _)| r.start() > range.start()) {
        return;
    }

    if let Some(ty) = let_stmt.ty() {
        *best = Some((range, Binding::Annotated(ty)));
    } else if let Some(init) = let_stmt.initializer() {
        *best = Some((range, Binding::Inferred(init)));
    }
}

fn binds(pat: Option<ast::Pat>, name: &str) -> bool {
    match pat {
        Some(ast::Pat::IdentPat(ident)) => ident.name().is_some_and(|n| n.text() == name),
        _ => false,
    }
}

fn enclosing_impl_type(node: &SyntaxNode) -> Option<String> {
    node.ancestors()
        .find_map(ast::Impl::cast)
        .and_then(|imp| imp.self_ty())
        .map(|ty| render_type(&ty))
}

fn self_type(node: &SyntaxNode) -> Option<String> {
    enclosing_impl_type(node)
}

fn replace_self(ty: &str, self_ty: &str) -> String {
    if ty == "Self" {
        return self_ty.to_string();
    }

    ty.strip_prefix("&Self").map_or_else(|| ty.to_string(), |rest| format!("&{self_ty}{rest}"))
}

/// The bare type name used to key struct and impl tables: no indirection, no generics, no path.
pub fn type_key(ty: &str) -> String {
    let ty = strip_indirection(ty);
    let ty = ty.split('<').next().unwrap_or(ty);
    ty.rsplit("::").next().unwrap_or(ty).trim().to_string()
}

/// Type text with whitespace runs collapsed.
pub fn render_type(ty: &ast::Type) -> String {
    let text = ty.syntax().text().to_string();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
