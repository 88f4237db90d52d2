//! Scoped-lock lowering
//!
//! `synchronized` blocks become [`Stmt::Locked`] regions. A locked region
//! acquires its lock on entry and releases it on every exit from the body:
//! fall-through, `return`, and a failure raised anywhere inside it.
//! [`exit_paths`] enumerates those exits with the lock events seen along
//! each one, which is how the release guarantee is checked.

use serde::Serialize;
use trama_ast::ast::*;
use trama_ast::NodeId;

/// Rewrites source-level synchronization into locked regions
#[derive(Debug, Default)]
pub struct SyncLowering {
    lowered: usize,
}

impl SyncLowering {
    /// Lower every synchronized block in `unit`, returning how many were lowered
    pub fn lower(mut self, unit: &mut CompilationUnit) -> usize {
        self.visit_unit_mut(unit);
        self.lowered
    }
}

impl VisitorMut for SyncLowering {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
        if !matches!(stmt, Stmt::Synchronized { .. }) {
            return;
        }
        let taken = std::mem::replace(stmt, Stmt::Block(Block::default()));
        *stmt = match taken {
            Stmt::Synchronized { lock, body } => {
                self.lowered += 1;
                Stmt::Locked { lock, body }
            }
            other => other,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LockEvent {
    /// Lock whose expression is the given node was acquired
    Acquire(NodeId),
    Release(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitKind {
    /// Control reached the end of the block
    Fallthrough,
    Return,
    /// An explicit throw or a failure raised by an expression
    Throw,
}

/// One way out of a block and the lock events along it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitPath {
    pub kind: ExitKind,
    pub events: Vec<LockEvent>,
}

impl ExitPath {
    /// Every acquired lock is released, innermost first
    pub fn releases_all(&self) -> bool {
        let mut held = Vec::new();
        for event in &self.events {
            match *event {
                LockEvent::Acquire(lock) => held.push(lock),
                LockEvent::Release(lock) => {
                    if held.pop() != Some(lock) {
                        return false;
                    }
                }
            }
        }
        held.is_empty()
    }
}

/// Enumerate every exit from `block`
///
/// Loops are taken zero or one time; that is enough to see every distinct
/// lock nesting on the way out.
pub fn exit_paths(block: &Block) -> Vec<ExitPath> {
    let mut exits = Vec::new();
    let open = simulate(block, vec![Vec::new()], &mut exits);
    exits.extend(open.into_iter().map(|events| ExitPath {
        kind: ExitKind::Fallthrough,
        events,
    }));
    exits
}

/// Run `block` from each state in `states`; returns the states that fall through
fn simulate(
    block: &Block,
    mut states: Vec<Vec<LockEvent>>,
    exits: &mut Vec<ExitPath>,
) -> Vec<Vec<LockEvent>> {
    for stmt in &block.stmts {
        if states.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for events in states {
            step(stmt, events, &mut next, exits);
        }
        states = next;
    }
    states
}

fn step(
    stmt: &Stmt,
    events: Vec<LockEvent>,
    next: &mut Vec<Vec<LockEvent>>,
    exits: &mut Vec<ExitPath>,
) {
    let throw = |events: &Vec<LockEvent>, exits: &mut Vec<ExitPath>| {
        exits.push(ExitPath {
            kind: ExitKind::Throw,
            events: events.clone(),
        })
    };

    match stmt {
        Stmt::Return(value) => {
            if value.as_ref().is_some_and(may_fail) {
                throw(&events, exits);
            }
            exits.push(ExitPath {
                kind: ExitKind::Return,
                events,
            });
        }
        Stmt::Throw(_) => exits.push(ExitPath {
            kind: ExitKind::Throw,
            events,
        }),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if may_fail(cond) {
                throw(&events, exits);
            }
            next.extend(simulate(then_branch, vec![events.clone()], exits));
            match else_branch {
                Some(else_branch) => next.extend(simulate(else_branch, vec![events], exits)),
                None => next.push(events),
            }
        }
        Stmt::While { cond, body } => {
            if may_fail(cond) {
                throw(&events, exits);
            }
            next.extend(simulate(body, vec![events.clone()], exits));
            next.push(events);
        }
        Stmt::Block(block) => next.extend(simulate(block, vec![events], exits)),
        Stmt::Locked { lock, body } | Stmt::Synchronized { lock, body } => {
            if may_fail(lock) {
                throw(&events, exits);
            }
            let mut held = events;
            held.push(LockEvent::Acquire(lock.id));

            let mut inner = Vec::new();
            let open = simulate(body, vec![held], &mut inner);
            for mut exit in inner {
                exit.events.push(LockEvent::Release(lock.id));
                exits.push(exit);
            }
            for mut state in open {
                state.push(LockEvent::Release(lock.id));
                next.push(state);
            }
        }
        Stmt::Expr(expr) => {
            if may_fail(expr) {
                throw(&events, exits);
            }
            next.push(events);
        }
        Stmt::Local(local) => {
            if local.init.as_ref().is_some_and(may_fail) {
                throw(&events, exits);
            }
            next.push(events);
        }
        Stmt::SuperConstructor { args } => {
            if args.iter().any(may_fail) {
                throw(&events, exits);
            }
            next.push(events);
        }
        Stmt::InitializeType(_) => {
            throw(&events, exits);
            next.push(events);
        }
        Stmt::LocalType(_) => next.push(events),
    }
}

/// Whether evaluating `expr` can raise a failure
fn may_fail(expr: &Expr) -> bool {
    let mut finder = FailureFinder { found: false };
    finder.visit_expr(expr);
    finder.found
}

struct FailureFinder {
    found: bool,
}

impl Visitor for FailureFinder {
    fn visit_type_decl(&mut self, _decl: &TypeDecl) {}

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Call(_)
            | ExprKind::SuperCall { .. }
            | ExprKind::FunctionCall { .. }
            | ExprKind::NilCheck(_)
            | ExprKind::New(_) => self.found = true,
            _ => walk_expr(self, expr),
        }
    }
}
