pub mod candles;
pub mod indicators;


pub use candles::*;
pub use indicators::*;
