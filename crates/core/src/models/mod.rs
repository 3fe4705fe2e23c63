pub mod alert;
pub mod coin;
pub mod market;
pub mod sort;
pub mod theme;
