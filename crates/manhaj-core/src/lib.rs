//! # manhaj-core
//!
//! The content graph and workflow engine for Manhaj - THE LOGIC.
//!
//! This crate holds everything that decides what the platform stores and who
//! may change it:
//! - content nodes and the parent→child taxonomy between them
//! - breadcrumb resolution over that taxonomy
//! - the draft → pending → published moderation workflow
//! - curriculum tags and the user directory
//!
//! ## Architectural Constraints
//!
//! - Synchronous, no network dependencies (pure Rust)
//! - Content documents are opaque blobs; the engine never parses them
//! - Every multi-record mutation commits as one unit
//! - Authorization decisions take an explicit [`Actor`]; nothing is ambient

// =============================================================================
// MODULES
// =============================================================================

pub mod ancestry;
pub mod catalog;
pub mod nodes;
pub mod primitives;
pub mod seed;
pub mod store;
pub mod tags;
pub mod taxonomy;
pub mod types;
pub mod users;
pub mod validation;
pub mod workflow;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Actor, Credential, CurriculumTag, ErrorKind, ManhajError, Node, NodeId, NodeKind, Role,
    Status, TaxonomyLink, User, UserId,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use ancestry::AncestryResolver;
pub use catalog::{Catalog, CatalogMetrics, NodeDraft, OutlineEntry, StatusCounts};
pub use nodes::{ContentEdit, NodeStore};
pub use seed::{SeedManifest, SeedReport, Seeder};
pub use store::{ContentStore, MemoryStore, RedbStore, StorageBackend, StoreCounts};
pub use tags::{CurriculumTagIndex, TagQuery};
pub use taxonomy::TaxonomyGraph;
pub use users::{NewUser, UserDirectory, UserSummary};
pub use workflow::WorkflowEngine;
