//! TeoVM invocation scripts: building them from typed parameters and
//! replaying them back into stack values.

mod builder;
mod opcode;
mod param;
mod stack;

pub use builder::{
    NATIVE_INVOKE_NAME, ScriptBuilder, build_native_invoke_code, build_teovm_invoke_code,
};
pub use opcode::OpCode;
pub use param::InvokeParam;
pub use stack::{CallTarget, ReplayedScript, StackItem, replay};
