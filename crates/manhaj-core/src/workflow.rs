//! # Workflow Engine
//!
//! The status state machine and every authorization rule that depends on it.
//!
//! Edges:
//!
//! ```text
//! draft ──► pending ──► published
//!   ▲  ╲       │            │
//!   │   ╲──────┼────────────┘ (draft → published, admin)
//!   └──────────┴────────────┘ (back to draft, admin)
//! ```
//!
//! All status changes go through [`WorkflowEngine::can_transition`]. The other
//! checks here cover deletion, content edits, and the status a new node starts
//! in.

use crate::{Actor, ManhajError, Node, NodeKind, Status};

/// Stateless policy for status transitions and ownership rules.
pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Whether `from -> to` is an edge of the state machine at all.
    #[must_use]
    pub fn is_edge(from: Status, to: Status) -> bool {
        use Status::{Draft, Pending, Published};
        matches!(
            (from, to),
            (Draft, Pending)
                | (Pending, Published)
                | (Pending, Draft)
                | (Published, Draft)
                | (Draft, Published)
        )
    }

    /// Authorize `actor` to move `node` from `from` to `to`.
    ///
    /// Returns `Validation` when the pair is not an edge (same-state and
    /// `published -> pending` included) and `Forbidden` when the edge exists
    /// but this actor may not take it.
    pub fn can_transition(
        actor: &Actor,
        node: &Node,
        from: Status,
        to: Status,
    ) -> Result<(), ManhajError> {
        if !Self::is_edge(from, to) {
            return Err(ManhajError::invalid(format!(
                "cannot move a node from {from} to {to}"
            )));
        }

        match (from, to) {
            (Status::Draft, Status::Pending) => {
                if node.is_authored_by(&actor.user_id) {
                    Ok(())
                } else {
                    Err(ManhajError::forbidden(
                        "only the author can submit a draft for review",
                    ))
                }
            }
            _ if actor.is_admin() => Ok(()),
            _ => Err(ManhajError::forbidden(format!(
                "only an admin can move a node from {from} to {to}"
            ))),
        }
    }

    /// Admins may delete anything; authors may delete their own drafts.
    pub fn can_delete(actor: &Actor, node: &Node) -> Result<(), ManhajError> {
        if actor.is_admin() || (node.is_authored_by(&actor.user_id) && node.status == Status::Draft)
        {
            Ok(())
        } else {
            Err(ManhajError::forbidden(
                "only an admin or the author of a draft can delete it",
            ))
        }
    }

    /// Authors may edit the content of their own nodes until publication.
    pub fn can_edit(actor: &Actor, node: &Node) -> Result<(), ManhajError> {
        if !node.is_authored_by(&actor.user_id) {
            return Err(ManhajError::forbidden("only the author can edit a node"));
        }
        if node.status == Status::Published {
            return Err(ManhajError::forbidden(
                "published nodes cannot be edited; move it back to draft first",
            ));
        }
        Ok(())
    }

    /// Status a node of `kind` starts in when `actor` creates it.
    ///
    /// Topics are admin-only and default to published. Contributors may start
    /// content as draft or pending only. Admins may pick any status. Everything
    /// else defaults to draft.
    pub fn initial_status(
        actor: &Actor,
        kind: NodeKind,
        requested: Option<Status>,
    ) -> Result<Status, ManhajError> {
        if kind == NodeKind::Topic && !actor.is_admin() {
            return Err(ManhajError::forbidden("only an admin can create topics"));
        }

        let default = match kind {
            NodeKind::Topic => Status::Published,
            _ => Status::Draft,
        };
        let status = requested.unwrap_or(default);

        if status == Status::Published && !actor.is_admin() {
            return Err(ManhajError::forbidden(
                "contributors can create content only as draft or pending",
            ));
        }
        Ok(status)
    }
}

// =============================================================================
// TESTS
// =============================================================================
