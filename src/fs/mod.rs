//! Filesystem side of the browser: the node tree, directory scanning, line
//! counting, aggregation and the flattened view.

pub mod ignore;
pub mod line_count;
pub mod projection;
pub mod reconcile;
pub mod scan;
pub mod stats;
pub mod tree;
