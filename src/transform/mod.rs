//! Derived-signal transforms.
//!
//! A derived signal is a named function of one *linked* series plus any number
//! of auxiliary series referenced as `$$name$$` inside its expression. The
//! transform keeps its output series in step with the linked series as it grows.
//!
//! # Pipeline
//!
//! ```text
//! Definition ──► macros::rewrite_channels ──► ScriptRuntime (globals + bind)
//!                                                  │
//!                          introspection call ◄────┘
//!                                  │
//!                                  ▼
//!                  OutputShape + output names ──► CompiledTransform
//!                                                      │ update / rebuild
//!                                                      ▼
//!                         SeriesMap (linked + aux in, outputs out)
//! ```
//!
//! # Design
//!
//! - **Names, not handles** - definitions and transforms refer to series by
//!   name and resolve them through the registry on every pass.
//! - **Fixed shape** - the output layout is decided once by introspection.
//! - **Staged passes** - a pass computes every point before touching the
//!   registry, so a failure never leaves half-written outputs.

pub mod align;
pub mod compiled;
pub mod definition;
pub mod macros;
pub mod set;
pub mod shape;

pub use align::SampleAligner;
pub use compiled::CompiledTransform;
pub use definition::Definition;
pub use macros::{channels_in_expression, rewrite_channels, RewrittenExpression};
pub use set::TransformSet;
pub use shape::OutputShape;
