pub mod dispatch;
pub mod export;
pub mod reference;
pub mod tree;
