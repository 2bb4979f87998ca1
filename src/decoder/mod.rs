//! Script decoding: opcodes, OP_RETURN protocol detection and SLP/ALP
//! token payloads.

pub mod alp;
pub mod lokad;
pub mod op_return;
pub mod script;
pub mod slp;
pub mod token;

pub use lokad::AppLokad;
pub use op_return::{decode_op_return, EmppPush, OpReturn};
pub use script::{parse_script, parse_script_hex, stack_array, Op};
pub use token::{TokenProtocol, TokenSection, TokenTxType};
