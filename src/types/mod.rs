//! Native-type to attribute-type mapping.
//!
//! This module turns the type strings a catalog reports (`VARCHAR(80)`,
//! `double precision`, `MULTIPOLYGON`) into semantic attribute types:
//!
//! ```text
//! ┌──────────────┐  parse   ┌────────────┐  resolve  ┌──────────────────┐
//! │ "NUMERIC(10,2)" ───────▶ │ NativeType │ ────────▶ │ Arc<TypeMapping> │
//! └──────────────┘          └────────────┘  registry └──────────────────┘
//! ```
//!
//! The [`TypeRegistry`] is the one piece of process-wide shared state in the
//! crate. It is read concurrently by synthesis runs and written only while
//! extensions are registered.

mod defaults;
mod mapping;
mod native;
mod registry;

pub use mapping::{AttributeType, PrimitiveKind, TypeMapping};
pub use native::NativeType;
pub use registry::{TypeKey, TypeRegistry};
