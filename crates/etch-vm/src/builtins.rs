//! Built-in functions dispatched inside `Call`, before user-function lookup
//! (spec.md §4.6, §6 "Built-in function surface").
//!
//! `inject` is not handled here: it is a comptime-only pseudo-builtin that
//! the comptime folder intercepts directly in its own ephemeral VM pass and
//! never reaches a compiled `Call` instruction.

use std::io::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{VmError, VmResult};
use crate::heap::{Heap, HeapObject};
use crate::value::Value;

/// Names recognized by [`call`], for use by callers that need to decide
/// "builtin or user function" before doing any work (e.g. the purity
/// analysis in the comptime folder, which classifies the same name set
/// minus `inject`).
pub const BUILTIN_NAMES: &[&str] = &[
    "print",
    "println",
    "readFile",
    "rand",
    "seed",
    "new",
    "deref",
    "toString",
    "parseInt",
    "assumeNonZero",
    "assumeNonNil",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Dispatch a builtin call. Returns `None` if `name` does not name one, so
/// callers can fall through to user-function resolution.
pub fn call(
    name: &str,
    args: Vec<Value>,
    heap: &mut Heap,
    rng: &mut StdRng,
) -> Option<VmResult<Value>> {
    Some(match name {
        "print" => print_value(&args, false),
        "println" => print_value(&args, true),
        "readFile" => read_file(&args),
        "rand" => rand_value(&args, rng),
        "seed" => seed_rng(&args, rng),
        "new" => new_ref(args, heap),
        "deref" => deref_ref(&args, heap),
        "toString" => to_string(&args),
        "parseInt" => parse_int(&args),
        "assumeNonZero" | "assumeNonNil" => identity(args),
        _ => return None,
    })
}

fn print_value(args: &[Value], newline: bool) -> VmResult<Value> {
    let text = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    if newline {
        let _ = writeln!(lock, "{text}");
    } else {
        let _ = write!(lock, "{text}");
    }
    Ok(Value::Void)
}

fn read_file(args: &[Value]) -> VmResult<Value> {
    let path = match args.first() {
        Some(Value::Str(s)) => s.to_string(),
        other => return Err(VmError::TypeError(format!("readFile expects a string path, got {other:?}"))),
    };
    std::fs::read_to_string(&path)
        .map(|s| Value::Str(s.into()))
        .map_err(|e| VmError::Io(format!("{path}: {e}")))
}

fn rand_value(args: &[Value], rng: &mut StdRng) -> VmResult<Value> {
    match args {
        [Value::Int(max)] => {
            if *max <= 0 {
                return Err(VmError::TypeError("rand(max) requires max > 0".to_string()));
            }
            Ok(Value::Int(rng.gen_range(0..*max)))
        }
        [Value::Int(max), Value::Int(min)] => {
            if min >= max {
                return Err(VmError::TypeError("rand(max, min) requires min < max".to_string()));
            }
            Ok(Value::Int(rng.gen_range(*min..*max)))
        }
        other => Err(VmError::TypeError(format!(
            "rand expects (int) or (int, int), got {other:?}"
        ))),
    }
}

fn seed_rng(args: &[Value], rng: &mut StdRng) -> VmResult<Value> {
    match args.first() {
        Some(Value::Int(n)) => {
            *rng = StdRng::seed_from_u64(*n as u64);
            Ok(Value::Void)
        }
        other => Err(VmError::TypeError(format!("seed(n) expects an int, got {other:?}"))),
    }
}

fn new_ref(mut args: Vec<Value>, heap: &mut Heap) -> VmResult<Value> {
    let value = args.pop().ok_or_else(|| VmError::TypeError("new(value) requires one argument".to_string()))?;
    let idx = heap.alloc(HeapObject::Cell(value));
    Ok(Value::Ref(idx))
}

fn deref_ref(args: &[Value], heap: &mut Heap) -> VmResult<Value> {
    match args.first() {
        Some(Value::Ref(idx)) => match heap.get(*idx)? {
            HeapObject::Cell(v) => Ok(v.clone()),
            HeapObject::Array(_) => Err(VmError::TypeError("deref of an array reference".to_string())),
        },
        Some(Value::Nil) => Err(VmError::DanglingReference),
        other => Err(VmError::TypeError(format!("deref(ref) expects a ref, got {other:?}"))),
    }
}

fn to_string(args: &[Value]) -> VmResult<Value> {
    match args.first() {
        Some(Value::Int(i)) => Ok(Value::Str(i.to_string().into())),
        other => Err(VmError::TypeError(format!("toString(int) expects an int, got {other:?}"))),
    }
}

fn parse_int(args: &[Value]) -> VmResult<Value> {
    match args.first() {
        Some(Value::Str(s)) => s
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| VmError::TypeError(format!("parseInt: '{s}' is not an integer"))),
        other => Err(VmError::TypeError(format!("parseInt(string) expects a string, got {other:?}"))),
    }
}

fn identity(mut args: Vec<Value>) -> VmResult<Value> {
    args.pop().ok_or_else(|| VmError::TypeError("expected one argument".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn rand_respects_bounds() {
        let mut r = rng();
        for _ in 0..50 {
            let v = call("rand", vec![Value::Int(10)], &mut Heap::new(), &mut r).unwrap().unwrap();
            match v {
                Value::Int(n) => assert!((0..10).contains(&n)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn seed_makes_rand_deterministic() {
        let mut heap = Heap::new();
        let mut r1 = rng();
        call("seed", vec![Value::Int(42)], &mut heap, &mut r1);
        let a = call("rand", vec![Value::Int(1000)], &mut heap, &mut r1).unwrap().unwrap();

        let mut r2 = rng();
        call("seed", vec![Value::Int(42)], &mut heap, &mut r2);
        let b = call("rand", vec![Value::Int(1000)], &mut heap, &mut r2).unwrap().unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn new_and_deref_round_trip() {
        let mut heap = Heap::new();
        let mut r = rng();
        let reference = call("new", vec![Value::Int(7)], &mut heap, &mut r).unwrap().unwrap();
        let back = call("deref", vec![reference], &mut heap, &mut r).unwrap().unwrap();
        assert_eq!(back, Value::Int(7));
    }

    #[test]
    fn to_string_and_parse_int_round_trip() {
        let mut heap = Heap::new();
        let mut r = rng();
        let s = call("toString", vec![Value::Int(42)], &mut heap, &mut r).unwrap().unwrap();
        assert_eq!(s, Value::Str("42".into()));
        let back = call("parseInt", vec![s], &mut heap, &mut r).unwrap().unwrap();
        assert_eq!(back, Value::Int(42));
    }

    #[test]
    fn parse_int_rejects_non_numeric() {
        let mut heap = Heap::new();
        let mut r = rng();
        let result = call("parseInt", vec![Value::Str("nope".into())], &mut heap, &mut r).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn unknown_name_is_not_a_builtin() {
        let mut heap = Heap::new();
        let mut r = rng();
        assert!(call("userDefined", vec![], &mut heap, &mut r).is_none());
    }
}
