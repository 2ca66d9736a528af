mod arcref;
pub use arcref::ArcRef;

mod logger;
#[allow(unused_imports)]
pub use logger::*;
