//! Statement block flattening.
//!
//! A block sitting directly in a function body that leaves nothing on the
//! stack (such as the grouping produced by a bulk assignment) is spliced into
//! the body in place of itself.

use crate::error::Result;
use crate::ir::{ExprArena, ExprId, ExprKind};
use crate::types::TypeDef;

/// Splice value-less blocks into `body`, repeatedly, so nested groupings
/// collapse too. Returns the number of blocks removed.
pub fn flatten(exprs: &ExprArena, body: &mut Vec<ExprId>) -> Result<usize> {
    let mut flattened = 0;
    let mut out = Vec::with_capacity(body.len());
    let mut work: Vec<ExprId> = body.iter().rev().copied().collect();
    while let Some(id) = work.pop() {
        let statement = exprs.result_types(id)?.is_empty();
        match exprs.kind(id)? {
            ExprKind::Block { items, ty }
                if statement && matches!(ty, TypeDef::None | TypeDef::Auto) =>
            {
                flattened += 1;
                work.extend(items.iter().rev());
            }
            _ => out.push(id),
        }
    }
    *body = out;
    Ok(flattened)
}
