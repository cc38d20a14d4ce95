use super::LOG_TARGET;
use super::names::to_upper_camel;
use super::type_env::Resolver;
use crate::facts::{ArgExpr, CallSite, CompositeEntry, ReceiverShape};
use ra_ap_syntax::ast::{self, HasArgList, HasAttrs};
use ra_ap_syntax::{AstNode, AstToken, NodeOrToken, SourceFile, SyntaxKind, SyntaxNode, SyntaxToken};

/// Standard trait methods that hand back the receiver itself rather than emit anything.
const PASS_THROUGH_METHODS: &[&str] = &[
    "as_mut",
    "as_ref",
    "borrow",
    "borrow_mut",
    "clone",
    "deref",
    "get_or_init",
    "into",
    "lock",
    "read",
    "to_owned",
    "write",
];

/// Extracts call sites from one parsed file, in source order.
pub struct CallExtractor<'a> {
    resolver: &'a Resolver<'a>,
    file_label: &'a str,
    line_starts: Vec<usize>,
    sites: Vec<CallSite>,
}

impl<'a> CallExtractor<'a> {
    pub fn new(resolver: &'a Resolver<'a>, file_label: &'a str, text: &str) -> Self {
        let line_starts: Vec<usize> = core::iter::once(0)
            .chain(text.char_indices().filter_map(|(i, c)| (c == '\n').then_some(i + 1)))
            .collect();

        Self {
            resolver,
            file_label,
            line_starts,
            sites: Vec::new(),
        }
    }

    pub fn extract(mut self, file: &SourceFile) -> Vec<CallSite> {
        self.visit(file.syntax());
        self.sites
    }

    fn visit(&mut self, node: &SyntaxNode) {
        if is_test_context(node) {
            return;
        }

        if let Some(call) = ast::MethodCallExpr::cast(node.clone()) {
            self.method_call(&call);
        } else if let Some(call) = ast::CallExpr::cast(node.clone()) {
            self.path_call(&call);
        }

        for child in node.children() {
            self.visit(&child);
        }
    }

    fn method_call(&mut self, call: &ast::MethodCallExpr) {
        let (Some(name), Some(receiver)) = (call.name_ref(), call.receiver()) else {
            return;
        };

        let shape = match peel(receiver.clone()) {
            ast::Expr::PathExpr(_) => ReceiverShape::Direct,
            ast::Expr::FieldExpr(_) => ReceiverShape::Member,
            _ => return,
        };

        if PASS_THROUGH_METHODS.contains(&name.text().as_str()) {
            log::debug!(target: LOG_TARGET, "Skipping '{}' at {}", name.text(), self.location(call.syntax()));
            return;
        }

        let mut site = CallSite::new(to_upper_camel(name.text().as_str())).at(self.location(call.syntax()));
        if let Some(ty) = self.resolver.type_of(&receiver) {
            site = site.receiver(ty, shape);
        } else {
            site.receiver_shape = shape;
        }

        self.push(site, call.arg_list());
    }

    fn path_call(&mut self, call: &ast::CallExpr) {
        let Some(ast::Expr::PathExpr(callee)) = call.expr() else {
            return;
        };
        let Some(path) = callee.path() else {
            return;
        };
        let Some(name) = path.segment().and_then(|s| s.name_ref()) else {
            return;
        };

        let mut site = CallSite::new(to_upper_camel(name.text().as_str())).at(self.location(call.syntax()));
        if let Some(ty) = self.resolver.path_call_type(&path) {
            site = site.returning(ty);
        }

        self.push(site, call.arg_list());
    }

    fn push(&mut self, mut site: CallSite, args: Option<ast::ArgList>) {
        if let Some(args) = args {
            site.args = args.args().map(|arg| convert_arg(&arg)).collect();
        }
        self.sites.push(site);
    }

    fn location(&self, node: &SyntaxNode) -> String {
        let offset = usize::from(node.text_range().start());
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|line| line.saturating_sub(1));
        format!("{}:{}", self.file_label, line + 1)
    }
}

/// Strip grouping and borrows that don't change what the receiver refers to.
fn peel(expr: ast::Expr) -> ast::Expr {
    let inner = match &expr {
        ast::Expr::ParenExpr(paren) => paren.expr(),
        ast::Expr::RefExpr(r) => r.expr(),
        _ => None,
    };
    inner.map_or(expr, peel)
}

fn convert_arg(expr: &ast::Expr) -> ArgExpr {
    match expr {
        ast::Expr::Literal(lit) => {
            let token = lit.token();
            if token.kind() == SyntaxKind::STRING {
                string_value(token)
            } else {
                ArgExpr::Other
            }
        }
        ast::Expr::ParenExpr(paren) => paren.expr().map_or(ArgExpr::Other, |e| convert_arg(&e)),
        ast::Expr::RefExpr(r) => r.expr().map_or(ArgExpr::Other, |e| convert_arg(&e)),
        ast::Expr::ArrayExpr(array) => ArgExpr::Composite {
            entries: array
                .exprs()
                .map(|e| CompositeEntry {
                    key: None,
                    value: convert_arg(&e),
                })
                .collect(),
        },
        ast::Expr::RecordExpr(record) => {
            let entries = record
                .record_expr_field_list()
                .map(|list| {
                    list.fields()
                        .map(|field| CompositeEntry {
                            key: field.field_name().map(|n| to_upper_camel(n.text().as_str())),
                            value: field.expr().map_or(ArgExpr::Other, |e| convert_arg(&e)),
                        })
                        .collect()
                })
                .unwrap_or_default();
            ArgExpr::Composite { entries }
        }
        // "x".to_string(), "x".into(), "x".to_owned()
        ast::Expr::MethodCallExpr(call)
            if call
                .name_ref()
                .is_some_and(|n| matches!(n.text().as_str(), "to_string" | "to_owned" | "into")) =>
        {
            match call.receiver() {
                Some(receiver @ ast::Expr::Literal(_)) => convert_arg(&receiver),
                _ => ArgExpr::Other,
            }
        }
        // String::from("x")
        ast::Expr::CallExpr(call) if is_string_from(call) => call
            .arg_list()
            .and_then(|args| args.args().next())
            .map_or(ArgExpr::Other, |arg| convert_arg(&arg)),
        ast::Expr::MacroExpr(mac) => mac.macro_call().map_or(ArgExpr::Other, |m| convert_vec_macro(&m)),
        _ => ArgExpr::Other,
    }
}

/// The decoded contents of a string literal, escapes and raw forms included.
fn string_value(token: SyntaxToken) -> ArgExpr {
    ast::String::cast(token)
        .and_then(|s| s.value().ok().map(|value| ArgExpr::string(value.into_owned())))
        .unwrap_or(ArgExpr::Other)
}

fn is_string_from(call: &ast::CallExpr) -> bool {
    match call.expr() {
        Some(ast::Expr::PathExpr(callee)) => callee
            .path()
            .is_some_and(|p| matches!(p.syntax().text().to_string().as_str(), "String::from" | "std::string::String::from")),
        _ => false,
    }
}

/// `vec!["a", "b"]` is a list literal; any other macro is opaque.
fn convert_vec_macro(mac: &ast::MacroCall) -> ArgExpr {
    let is_vec = mac
        .path()
        .and_then(|p| p.segment())
        .and_then(|s| s.name_ref())
        .is_some_and(|n| n.text() == "vec");
    let Some(tree) = mac.token_tree().filter(|_| is_vec) else {
        return ArgExpr::Other;
    };

    let mut entries = Vec::new();
    let mut current: Vec<NodeOrToken<SyntaxNode, SyntaxToken>> = Vec::new();

    let mut flush = |current: &mut Vec<NodeOrToken<SyntaxNode, SyntaxToken>>| {
        if current.is_empty() {
            return;
        }
        let value = match current.as_slice() {
            [NodeOrToken::Token(token)] if token.kind() == SyntaxKind::STRING => string_value(token.clone()),
            _ => ArgExpr::Other,
        };
        entries.push(CompositeEntry { key: None, value });
        current.clear();
    };

    for element in tree.syntax().children_with_tokens() {
        match &element {
            NodeOrToken::Token(token) => match token.kind() {
                SyntaxKind::WHITESPACE | SyntaxKind::COMMENT | SyntaxKind::L_BRACK | SyntaxKind::R_BRACK => {}
                SyntaxKind::L_PAREN | SyntaxKind::R_PAREN | SyntaxKind::L_CURLY | SyntaxKind::R_CURLY => {}
                SyntaxKind::COMMA => flush(&mut current),
                _ => current.push(element.clone()),
            },
            NodeOrToken::Node(_) => current.push(element.clone()),
        }
    }
    flush(&mut current);

    ArgExpr::Composite { entries }
}

/// Test modules and test functions never contribute metrics.
fn is_test_context(node: &SyntaxNode) -> bool {
    match node.kind() {
        SyntaxKind::MODULE => ast::Module::cast(node.clone()).is_some_and(|m| has_test_attribute(&m)),
        SyntaxKind::FN => ast::Fn::cast(node.clone()).is_some_and(|f| has_test_attribute(&f)),
        _ => false,
    }
}

/// `#[test]`, `#[tokio::test]` and friends, or a `#[cfg(..)]` that requires `test`.
fn has_test_attribute<T: HasAttrs>(node: &T) -> bool {
    node.attrs().any(|attr| {
        let Some(meta) = attr.meta() else {
            return false;
        };
        let Some(path) = meta.path() else {
            return false;
        };

        let path: String = path.syntax().text().to_string().split_whitespace().collect();
        if path == "test" || path.ends_with("::test") {
            return true;
        }

        path == "cfg" && meta.token_tree().is_some_and(|tree| cfg_requires_test(&tree))
    })
}

/// Whether a cfg predicate mentions `test` outside of a `not(..)`.
fn cfg_requires_test(tree: &ast::TokenTree) -> bool {
    let mut negated = false;
    for element in tree.syntax().children_with_tokens() {
        match element {
            NodeOrToken::Token(token) => match token.kind() {
                SyntaxKind::WHITESPACE | SyntaxKind::COMMENT => {}
                SyntaxKind::IDENT if token.text() == "test" => return true,
                SyntaxKind::IDENT => negated = token.text() == "not",
                _ => negated = false,
            },
            NodeOrToken::Node(node) => {
                let nested = ast::TokenTree::cast(node).is_some_and(|t| cfg_requires_test(&t));
                if nested && !negated {
                    return true;
                }
                negated = false;
            }
        }
    }
    false
}
