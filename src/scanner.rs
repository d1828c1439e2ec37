//! Candidate discovery
//!
//! Walks a parsed file and collects the expressions inside `if` and `while`
//! conditions that the swap operator knows how to mutate.
//!
//! Every `syn::Expr` reached through `visit_expr` is numbered in pre-order.
//! That number is the candidate's identity: the mutator walks the tree with
//! the same numbering to find the node again, so nothing outside the mutated
//! node may change shape between scanning and reverting.

use std::fmt;

use quote::ToTokens;
use syn::visit::Visit;
use syn::{BinOp, Expr, UnOp};

/// Syntactic position a candidate was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateContext {
    /// Root of a `while` condition
    LoopCondition,
    /// Root of an `if` condition
    BranchCondition,
    /// Operand of a `&&` / `||` inside a condition
    LogicalOperand,
}

impl fmt::Display for CandidateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CandidateContext::LoopCondition => "loop condition",
            CandidateContext::BranchCondition => "branch condition",
            CandidateContext::LogicalOperand => "logical operand",
        };
        f.write_str(label)
    }
}

/// Shape of the node a candidate points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Binary,
    Unary,
}

/// A mutable expression site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Pre-order index of the expression in the file
    pub id: usize,
    pub context: CandidateContext,
    pub kind: CandidateKind,
    /// Operator token as written, e.g. `>=` or `!`
    pub operator: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Token text of the expression, for display
    pub snippet: String,
}

/// Candidates of one source unit, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Find every mutable site in a file
pub fn scan(ast: &syn::File) -> CandidateSet {
    let mut scanner = Scanner::default();
    scanner.visit_file(ast);
    CandidateSet {
        candidates: scanner.candidates,
    }
}

/// Whether a binary operator is relational, equality or logical
pub fn is_condition_operator(op: &BinOp) -> bool {
    matches!(
        op,
        BinOp::And(_)
            | BinOp::Or(_)
            | BinOp::Eq(_)
            | BinOp::Ne(_)
            | BinOp::Lt(_)
            | BinOp::Le(_)
            | BinOp::Gt(_)
            | BinOp::Ge(_)
    )
}

fn is_logical(op: &BinOp) -> bool {
    matches!(op, BinOp::And(_) | BinOp::Or(_))
}

/// What the parent expects of the expression about to be visited
#[derive(Debug, Clone, Copy)]
enum Role {
    Condition(CandidateContext),
    Operand,
}

impl Role {
    fn context(self) -> CandidateContext {
        match self {
            Role::Condition(context) => context,
            Role::Operand => CandidateContext::LogicalOperand,
        }
    }
}

/// What to do with an expression found in a condition position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Keep the role and look at the parenthesized expression
    LookThrough,
    /// Candidate; its operands are conditions too
    ExpandOperands,
    Candidate(CandidateKind),
    Skip,
}

fn classify(role: Role, expr: &Expr) -> Action {
    match (role, expr) {
        (_, Expr::Paren(_)) => Action::LookThrough,
        (_, Expr::Binary(bin)) if is_logical(&bin.op) => Action::ExpandOperands,
        (_, Expr::Binary(bin)) if is_condition_operator(&bin.op) => {
            Action::Candidate(CandidateKind::Binary)
        }
        (Role::Condition(CandidateContext::LoopCondition), Expr::Unary(_)) => {
            Action::Candidate(CandidateKind::Unary)
        }
        (_, Expr::Unary(unary)) if matches!(unary.op, UnOp::Not(_)) => {
            Action::Candidate(CandidateKind::Unary)
        }
        _ => Action::Skip,
    }
}

#[derive(Default)]
struct Scanner {
    next_id: usize,
    pending: Option<Role>,
    candidates: Vec<Candidate>,
}

impl Scanner {
    fn push(&mut self, id: usize, role: Role, kind: CandidateKind, expr: &Expr) {
        // Pre-order ids only grow, so no node is pushed twice
        debug_assert!(self.candidates.iter().all(|c| c.id != id));

        let operator = match expr {
            Expr::Binary(bin) => bin.op.to_token_stream().to_string(),
            Expr::Unary(unary) => unary.op.to_token_stream().to_string(),
            _ => String::new(),
        };
        let span = get_span(expr);

        self.candidates.push(Candidate {
            id,
            context: role.context(),
            kind,
            operator,
            line: span.start().line,
            column: span.start().column + 1, // 1-indexed
            snippet: expr.to_token_stream().to_string(),
        });
    }

    /// Visit `expr` knowing it sits in a condition position
    fn visit_in_role(&mut self, id: usize, role: Role, expr: &Expr) {
        // Child visits below mirror syn's field order so ids stay in sync
        // with `syn::visit_mut`.
        match (classify(role, expr), expr) {
            (Action::LookThrough, Expr::Paren(paren)) => {
                for attr in &paren.attrs {
                    self.visit_attribute(attr);
                }
                self.pending = Some(role);
                self.visit_expr(&paren.expr);
            }
            (Action::ExpandOperands, Expr::Binary(bin)) => {
                for attr in &bin.attrs {
                    self.visit_attribute(attr);
                }
                self.pending = Some(Role::Operand);
                self.visit_expr(&bin.left);
                self.pending = Some(Role::Operand);
                self.visit_expr(&bin.right);
                self.push(id, role, CandidateKind::Binary, expr);
            }
            (Action::Candidate(kind), _) => {
                syn::visit::visit_expr(self, expr);
                self.push(id, role, kind, expr);
            }
            _ => syn::visit::visit_expr(self, expr),
        }
    }
}

impl<'ast> Visit<'ast> for Scanner {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        let id = self.next_id;
        self.next_id += 1;

        match self.pending.take() {
            Some(role) => self.visit_in_role(id, role, expr),
            None => syn::visit::visit_expr(self, expr),
        }
    }

    fn visit_expr_if(&mut self, node: &'ast syn::ExprIf) {
        for attr in &node.attrs {
            self.visit_attribute(attr);
        }
        self.pending = Some(Role::Condition(CandidateContext::BranchCondition));
        self.visit_expr(&node.cond);
        self.visit_block(&node.then_branch);
        if let Some((_, else_branch)) = &node.else_branch {
            self.visit_expr(else_branch);
        }
    }

    fn visit_expr_while(&mut self, node: &'ast syn::ExprWhile) {
        for attr in &node.attrs {
            self.visit_attribute(attr);
        }
        if let Some(label) = &node.label {
            self.visit_label(label);
        }
        self.pending = Some(Role::Condition(CandidateContext::LoopCondition));
        self.visit_expr(&node.cond);
        self.visit_block(&node.body);
    }
}

/// Get the span of an expression
fn get_span(expr: &Expr) -> proc_macro2::Span {
    expr.to_token_stream()
        .into_iter()
        .next()
        .map(|t| t.span())
        .unwrap_or_else(proc_macro2::Span::call_site)
}
