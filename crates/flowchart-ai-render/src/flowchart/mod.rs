mod layout;
mod node;

pub use layout::layout_flowchart;
pub(crate) use node::cylinder_ry;
