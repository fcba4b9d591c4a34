pub mod conditions;
pub mod crd;
pub mod defaults;
pub mod labels;
pub mod refs;
