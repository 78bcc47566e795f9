pub mod clock;
pub mod error;
pub mod parser;
pub mod record;
pub mod script;
pub mod session;
pub mod stimulus;
pub mod vectors;

pub use clock::Clock;
pub use error::{GenError, Result, Stream};
pub use record::{
    ExpectedOutcome, Half, MemoryPatch, RegPair, Registers, SpecialRegisters, TestCase,
};
pub use script::Hierarchy;
pub use session::{generate, run, Config, Count, Generated, Selection};
pub use stimulus::{emit_test, Op, Signal, Stimulus};
pub use vectors::VectorCursor;
