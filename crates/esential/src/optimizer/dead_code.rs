//! Unreachable statement elimination.
//!
//! Anything after an unconditional `return` in a statement list never runs.
//! The pass truncates the function body and every nested statement list
//! whose value is not consumed (untyped blocks and ifs, loop bodies).

use super::nested_statement_lists;
use crate::error::Result;
use crate::ir::{ExprArena, ExprId, ExprKind};

/// Truncate `body` and its nested statement lists after their first return.
/// Returns the number of statements removed.
pub fn eliminate(exprs: &mut ExprArena, body: &mut Vec<ExprId>) -> Result<usize> {
    let mut removed = truncate(exprs, body)?;
    let mut pending: Vec<ExprId> = body.clone();
    while let Some(id) = pending.pop() {
        for mut list in nested_statement_lists(exprs, id)? {
            let cut = truncate(exprs, &mut list)?;
            if cut > 0 {
                removed += cut;
                rewrite_list(exprs, id, &list)?;
            }
            pending.extend(list);
        }
    }
    Ok(removed)
}

fn truncate(exprs: &ExprArena, list: &mut Vec<ExprId>) -> Result<usize> {
    for (pos, id) in list.iter().enumerate() {
        if matches!(exprs.kind(*id)?, ExprKind::Return(_)) {
            let removed = list.len() - pos - 1;
            list.truncate(pos + 1);
            return Ok(removed);
        }
    }
    Ok(0)
}

/// Put a truncated list back into whichever slot of `id` it came from.
fn rewrite_list(exprs: &mut ExprArena, id: ExprId, list: &[ExprId]) -> Result<()> {
    let same_prefix = |old: &[ExprId]| old.len() > list.len() && old.starts_with(list);
    let mut kind = exprs.kind(id)?.clone();
    match &mut kind {
        ExprKind::Block { items, .. } => *items = list.to_vec(),
        ExprKind::If {
            then, otherwise, ..
        } => {
            if same_prefix(then) {
                *then = list.to_vec();
            } else if same_prefix(otherwise) {
                *otherwise = list.to_vec();
            }
        }
        ExprKind::For { body, step, .. } => {
            if same_prefix(body) {
                *body = list.to_vec();
            } else if same_prefix(step) {
                *step = list.to_vec();
            }
        }
        _ => return Ok(()),
    }
    exprs.replace(id, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Literal, TypeDef};

    #[test]
    fn drops_statements_after_return() {
        let mut arena = ExprArena::new();
        let v = arena.alloc(ExprKind::Const(Literal::I32(1)));
        let ret = arena.alloc(ExprKind::Return(Some(v)));
        let dead = arena.alloc(ExprKind::Nop);
        let mut body = vec![ret, dead, dead];
        assert_eq!(eliminate(&mut arena, &mut body).unwrap(), 2);
        assert_eq!(body, vec![ret]);
    }

    #[test]
    fn trims_untyped_if_arms() {
        let mut arena = ExprArena::new();
        let cond = arena.alloc(ExprKind::Const(Literal::I32(1)));
        let ret = arena.alloc(ExprKind::Return(None));
        let dead = arena.alloc(ExprKind::Nop);
        let branch = arena.alloc(ExprKind::If {
            cond,
            then: vec![ret, dead],
            otherwise: vec![dead],
            ty: TypeDef::None,
        });
        let mut body = vec![branch];
        assert_eq!(eliminate(&mut arena, &mut body).unwrap(), 1);
        match arena.kind(branch).unwrap() {
            ExprKind::If {
                then, otherwise, ..
            } => {
                assert_eq!(then, &vec![ret]);
                assert_eq!(otherwise, &vec![dead]);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn typed_blocks_are_untouched() {
        let mut arena = ExprArena::new();
        let ret = arena.alloc(ExprKind::Return(None));
        let v = arena.alloc(ExprKind::Const(Literal::I32(1)));
        let block = arena.alloc(ExprKind::Block {
            items: vec![ret, v],
            ty: TypeDef::I32,
        });
        let mut body = vec![block];
        assert_eq!(eliminate(&mut arena, &mut body).unwrap(), 0);
    }
}
