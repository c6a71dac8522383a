pub mod filter;
pub mod layer1;
pub mod layer2;
pub mod verdict;

pub use filter::GuardrailFilter;
pub use layer1::{screen as layer1_screen, Layer1Block};
pub use verdict::GuardrailVerdict;
