//! Test scenarios

pub mod navigation_tree;
pub mod step_collection;
pub mod variable_resolution;
