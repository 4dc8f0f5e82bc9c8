//! Solver tree data: wire records, the id index and synthetic fixtures.

pub mod index;
pub mod node;
pub mod synthetic;

pub use index::{IndexOptions, ScaleDomain, StructuralError, TreeIndex, TreeStats};
pub use node::{Core, FromServerNode, Node, NodeId, ROOT_ID};
