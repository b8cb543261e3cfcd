pub mod student_ctx;
pub mod student_flow;

pub use student_ctx::{student_id_from_key, StudentCtx};
pub use student_flow::StudentFlow;
