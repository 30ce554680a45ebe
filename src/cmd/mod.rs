pub mod evaluate;
pub mod fit;
pub mod optimize;
