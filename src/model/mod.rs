//! Model synthesis: schema snapshots become typed model descriptors.

mod descriptor;
mod naming;
mod synthesizer;

pub use descriptor::{
    AttributeDescriptor, ModelDescriptor, ModelReference, ReferenceState, ResolvedType,
};
pub use naming::NamingStrategy;
pub use synthesizer::{Synthesis, Synthesizer};
