//! AST mutation application
//!
//! Operators mutate one candidate in place and revert it afterwards. Nodes are
//! found again through the same pre-order expression numbering the scanner
//! uses.

use quote::ToTokens;
use syn::visit_mut::VisitMut;
use syn::{BinOp, Expr, ExprUnary, UnOp};

use crate::error::{MutationError, Result};
use crate::scanner::{Candidate, CandidateKind};

/// Before/after descriptors of one applied mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub candidate: usize,
    pub before: String,
    pub after: String,
}

/// A family of mutations
///
/// `unmutate` must be the exact inverse of `mutate`: after both, the file
/// renders byte-identically to how it rendered before.
pub trait MutationOperator {
    fn name(&self) -> &str;

    fn mutate(&self, ast: &mut syn::File, candidate: &Candidate) -> Result<MutationRecord>;

    fn unmutate(&self, ast: &mut syn::File, candidate: &Candidate) -> Result<()>;
}

/// Relational/logical operator swap, plus negation wrapping for unary sites
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapOperator;

impl SwapOperator {
    pub const NAME: &'static str = "swap";

    fn unsupported(candidate: &Candidate, op: &BinOp) -> MutationError {
        MutationError::UnsupportedOperator {
            operator: Self::NAME.to_string(),
            found: op.to_token_stream().to_string(),
            candidate: candidate.id,
        }
    }
}

/// The closed swap table. Every pair is its own inverse.
pub fn swap(op: &BinOp) -> Option<BinOp> {
    let swapped = match op {
        BinOp::And(_) => BinOp::Or(Default::default()),
        BinOp::Or(_) => BinOp::And(Default::default()),
        BinOp::Eq(_) => BinOp::Ne(Default::default()),
        BinOp::Ne(_) => BinOp::Eq(Default::default()),
        BinOp::Ge(_) => BinOp::Lt(Default::default()),
        BinOp::Lt(_) => BinOp::Ge(Default::default()),
        BinOp::Le(_) => BinOp::Gt(Default::default()),
        BinOp::Gt(_) => BinOp::Le(Default::default()),
        _ => return None,
    };
    Some(swapped)
}

impl MutationOperator for SwapOperator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn mutate(&self, ast: &mut syn::File, candidate: &Candidate) -> Result<MutationRecord> {
        let apply = |expr: &mut Expr| -> Result<MutationRecord> {
            match (candidate.kind, expr) {
                (CandidateKind::Binary, Expr::Binary(bin)) => {
                    let swapped =
                        swap(&bin.op).ok_or_else(|| Self::unsupported(candidate, &bin.op))?;
                    let before = bin.op.to_token_stream().to_string();
                    let after = swapped.to_token_stream().to_string();
                    bin.op = swapped;
                    Ok(MutationRecord {
                        candidate: candidate.id,
                        before,
                        after,
                    })
                }
                (CandidateKind::Unary, Expr::Unary(unary)) => {
                    let before = unary.op.to_token_stream().to_string();
                    let operand = std::mem::replace(&mut *unary.expr, placeholder());
                    *unary.expr = Expr::Unary(ExprUnary {
                        attrs: Vec::new(),
                        op: UnOp::Not(Default::default()),
                        expr: Box::new(operand),
                    });
                    Ok(MutationRecord {
                        candidate: candidate.id,
                        after: format!("{}!", before),
                        before,
                    })
                }
                _ => Err(shape_mismatch(candidate)),
            }
        };
        with_expr_mut(ast, candidate.id, apply)?
    }

    fn unmutate(&self, ast: &mut syn::File, candidate: &Candidate) -> Result<()> {
        let revert = |expr: &mut Expr| -> Result<()> {
            match (candidate.kind, expr) {
                (CandidateKind::Binary, Expr::Binary(bin)) => {
                    bin.op = swap(&bin.op).ok_or_else(|| Self::unsupported(candidate, &bin.op))?;
                    Ok(())
                }
                (CandidateKind::Unary, Expr::Unary(unary)) => {
                    // Strip the layer `mutate` inserted
                    let operand = match &mut *unary.expr {
                        Expr::Unary(inserted) if matches!(inserted.op, UnOp::Not(_)) => {
                            std::mem::replace(&mut *inserted.expr, placeholder())
                        }
                        _ => return Err(shape_mismatch(candidate)),
                    };
                    *unary.expr = operand;
                    Ok(())
                }
                _ => Err(shape_mismatch(candidate)),
            }
        };
        with_expr_mut(ast, candidate.id, revert)?
    }
}

fn placeholder() -> Expr {
    Expr::Verbatim(proc_macro2::TokenStream::new())
}

fn shape_mismatch(candidate: &Candidate) -> MutationError {
    MutationError::FailedToApply {
        reason: format!(
            "candidate #{} at line {} is not a {:?} expression in the expected state",
            candidate.id, candidate.line, candidate.kind
        ),
    }
}

/// Run `f` on the expression with pre-order index `id`
pub fn with_expr_mut<T>(
    ast: &mut syn::File,
    id: usize,
    f: impl FnOnce(&mut Expr) -> T,
) -> Result<T> {
    let mut locator = Locator {
        target: id,
        next_id: 0,
        apply: Some(f),
        result: None,
    };
    locator.visit_file_mut(ast);

    locator.result.ok_or_else(|| MutationError::FailedToApply {
        reason: format!("expression #{} not found", id),
    })
}

struct Locator<F, T> {
    target: usize,
    next_id: usize,
    apply: Option<F>,
    result: Option<T>,
}

impl<F, T> VisitMut for Locator<F, T>
where
    F: FnOnce(&mut Expr) -> T,
{
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if self.apply.is_none() {
            return; // Already applied, skip
        }

        let id = self.next_id;
        self.next_id += 1;

        if id == self.target {
            if let Some(apply) = self.apply.take() {
                self.result = Some(apply(expr));
            }
            return;
        }

        syn::visit_mut::visit_expr_mut(self, expr);
    }
}
