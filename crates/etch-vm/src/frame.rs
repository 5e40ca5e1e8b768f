//! Call frame (spec.md §4.6: "Each frame has a local-variable map and a
//! return program-counter").

use rustc_hash::FxHashMap;

use crate::value::Value;

#[derive(Debug)]
pub struct CallFrame {
    pub function_name: String,
    pub return_pc: usize,
    pub locals: FxHashMap<String, Value>,
}

impl CallFrame {
    pub fn new(function_name: String, return_pc: usize) -> CallFrame {
        CallFrame {
            function_name,
            return_pc,
            locals: FxHashMap::default(),
        }
    }
}
