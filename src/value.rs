use crate::entrypoint::EntryPoint;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One argument or return value as captured by the trampoline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Void,
    Int(i64),
    UInt(u64),
    Float(f64),
    Ptr(u64),
    Str(String),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(v) => Some(v as u64),
            Value::UInt(v) | Value::Ptr(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) | Value::Ptr(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Non-zero integers and non-null pointers.
    pub fn is_truthy(&self) -> bool {
        self.as_u64().map_or(false, |v| v != 0)
    }
}

/// One logged invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub entry_point: EntryPoint,
    pub args: Vec<Value>,
    pub ret: Option<Value>,
    pub error: Option<u32>,
    pub debug_output: Option<String>,
    pub seq: u64,
}

impl CallRecord {
    pub fn new(entry_point: EntryPoint, args: Vec<Value>) -> Self {
        Self {
            entry_point,
            args,
            ret: None,
            error: None,
            debug_output: None,
            seq: 0,
        }
    }

    fn arg(&self, index: usize) -> Result<&Value> {
        self.args.get(index).ok_or_else(|| {
            Error::Internal(format!(
                "{} called with {} arguments, expected at least {}",
                self.entry_point,
                self.args.len(),
                index + 1
            ))
        })
    }

    pub fn arg_u64(&self, index: usize) -> Result<u64> {
        let value = self.arg(index)?;
        value.as_u64().ok_or_else(|| {
            Error::Internal(format!(
                "{} argument {} is not an integer: {:?}",
                self.entry_point, index, value
            ))
        })
    }

    pub fn arg_u32(&self, index: usize) -> Result<u32> {
        Ok(self.arg_u64(index)? as u32)
    }

    pub fn arg_i64(&self, index: usize) -> Result<i64> {
        let value = self.arg(index)?;
        value.as_i64().ok_or_else(|| {
            Error::Internal(format!(
                "{} argument {} is not an integer: {:?}",
                self.entry_point, index, value
            ))
        })
    }

    /// Name arguments may arrive either as a decoded string or as a raw `char*`.
    pub fn arg_string(&self, index: usize) -> Result<Option<String>> {
        match self.arg(index)? {
            Value::Str(s) => Ok(Some(s.clone())),
            // SAFETY: the trampoline forwards the application's own pointer,
            // which the API contract requires to be a NUL-terminated string.
            other => Ok(other
                .as_u64()
                .and_then(|ptr| unsafe { memory::read_c_str(ptr) })),
        }
    }
}

/// Helpers for reading application memory referenced by pointer arguments.
/// Null pointers read as empty.
pub mod memory {
    use std::ffi::CStr;
    use std::os::raw::c_char;

    /// # Safety
    /// `ptr` must be null or point to `count` readable, initialized `T`.
    pub unsafe fn read_array<T: Copy>(ptr: u64, count: usize) -> Vec<T> {
        if ptr == 0 || count == 0 {
            return Vec::new();
        }
        std::slice::from_raw_parts(ptr as usize as *const T, count).to_vec()
    }

    /// # Safety
    /// `ptr` must be null or point to a NUL-terminated string.
    pub unsafe fn read_c_str(ptr: u64) -> Option<String> {
        if ptr == 0 {
            return None;
        }
        Some(
            CStr::from_ptr(ptr as usize as *const c_char)
                .to_string_lossy()
                .into_owned(),
        )
    }

    /// Reads `key, value` pairs until `terminator` appears in key position.
    ///
    /// # Safety
    /// `ptr` must be null or point to a terminated attribute list.
    pub unsafe fn read_attrib_list(ptr: u64, terminator: i32) -> Vec<(i32, i32)> {
        let mut pairs = Vec::new();
        if ptr == 0 {
            return pairs;
        }
        let mut cursor = ptr as usize as *const i32;
        loop {
            let key = *cursor;
            if key == terminator {
                break;
            }
            let value = *cursor.add(1);
            pairs.push((key, value));
            cursor = cursor.add(2);
        }
        pairs
    }

    /// Concatenates a `glShaderSource` style string array. A null `lengths`
    /// or a negative length means the string is NUL-terminated.
    ///
    /// # Safety
    /// `strings` must point to `count` string pointers and `lengths`, when
    /// non-null, to `count` lengths.
    pub unsafe fn read_sources(strings: u64, count: usize, lengths: u64) -> String {
        let pointers: Vec<usize> = read_array(strings, count);
        let lengths: Vec<i32> = read_array(lengths, count);
        let mut source = String::new();
        for (i, &ptr) in pointers.iter().enumerate() {
            if ptr == 0 {
                continue;
            }
            match lengths.get(i) {
                Some(&len) if len >= 0 => {
                    let bytes = std::slice::from_raw_parts(ptr as *const u8, len as usize);
                    source.push_str(&String::from_utf8_lossy(bytes));
                }
                _ => {
                    if let Some(s) = read_c_str(ptr as u64) {
                        source.push_str(&s);
                    }
                }
            }
        }
        source
    }
}
