pub mod status_bar;
pub mod tree;
pub mod viewer;
