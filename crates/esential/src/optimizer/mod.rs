//! IR optimization passes.
//!
//! Each pass is a self-contained sub-module working on the expression arena
//! and the statement lists of every function body (plus the start body that
//! initialises globals). [`optimize`] runs them in order.

use crate::error::Result;
use crate::ir::{ExprArena, ExprId};
use crate::module::{Esential, FuncKind};

// ── Passes ───────────────────────────────────────────────────────────────────
mod const_fold;
mod dead_code;
mod flatten_blocks;

/// What the passes changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptStats {
    pub folded: usize,
    pub removed: usize,
    pub flattened: usize,
}

/// Run every pass over the whole build.
pub fn optimize(esen: &mut Esential) -> Result<OptStats> {
    let mut stats = OptStats {
        folded: const_fold::fold(&mut esen.exprs)?,
        ..OptStats::default()
    };
    for body in bodies(&mut esen.funcs, &mut esen.start_body) {
        stats.flattened += flatten_blocks::flatten(&esen.exprs, body)?;
        stats.removed += dead_code::eliminate(&mut esen.exprs, body)?;
    }
    Ok(stats)
}

fn bodies<'a>(
    funcs: &'a mut [crate::module::FuncEntry],
    start: &'a mut Vec<ExprId>,
) -> impl Iterator<Item = &'a mut Vec<ExprId>> {
    funcs
        .iter_mut()
        .filter_map(|func| match &mut func.kind {
            FuncKind::Defined { body, .. } => Some(body),
            FuncKind::Imported { .. } => None,
        })
        .chain(std::iter::once(start))
}

/// Statement lists nested directly inside `id`, when their values are never
/// consumed.
fn nested_statement_lists(exprs: &ExprArena, id: ExprId) -> Result<Vec<Vec<ExprId>>> {
    use crate::ir::ExprKind;
    use crate::types::TypeDef;
    Ok(match exprs.kind(id)? {
        ExprKind::Block {
            items,
            ty: TypeDef::None,
        } => vec![items.clone()],
        ExprKind::If {
            then,
            otherwise,
            ty: TypeDef::None,
            ..
        } => vec![then.clone(), otherwise.clone()],
        ExprKind::For { body, step, .. } => vec![body.clone(), step.clone()],
        _ => Vec::new(),
    })
}

// ── optimize integration tests ───────────────────────────────────────────────
