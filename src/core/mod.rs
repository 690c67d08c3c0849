pub mod runtime_context;
pub mod session_id;

pub use runtime_context::{
    FakeIdGenerator, FakeTimeProvider, IdGenerator, RealIdGenerator, RealTimeProvider,
    RuntimeContext, TimeProvider,
};
pub use session_id::{new_session_id, SessionIdStore};
